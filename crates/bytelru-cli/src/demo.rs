//! Built-in demonstration: a string cache and a float cache, both holding two entries

use anyhow::Result;
use bytelru::SharedCache;
use std::fmt::Display;
use std::io::Write;

/// Run both demo caches, writing a transcript to `out`
pub fn run<W: Write>(out: &mut W) -> Result<()> {
    let strings = SharedCache::new(2)?;
    fill_and_read(out, &strings, ["foo".to_string(), "bar".to_string()])?;
    dump(out, &strings)?;

    let floats = SharedCache::new(2)?;
    fill_and_read(out, &floats, [0.4f32, 1.2f32])?;
    // A miss leaves the cache usable
    show_get(out, &floats, 2)?;
    dump(out, &floats)?;

    Ok(())
}

/// Put keys 1 and 2, read both back, then read the missing key 5
fn fill_and_read<T, W>(out: &mut W, cache: &SharedCache<T>, values: [T; 2]) -> Result<()>
where
    T: Clone + Display,
    W: Write,
{
    for (key, value) in (1i64..).zip(values) {
        cache.put(key, value)?;
    }

    show_get(out, cache, 1)?;
    show_get(out, cache, 2)?;
    show_get(out, cache, 5)
}

fn show_get<T, W>(out: &mut W, cache: &SharedCache<T>, key: i64) -> Result<()>
where
    T: Clone + Display,
    W: Write,
{
    match cache.get(key) {
        Ok(value) => writeln!(out, "get({}) {}", key, value)?,
        Err(e) => writeln!(out, "get({}) {}", key, e)?,
    }
    Ok(())
}

fn dump<T, W>(out: &mut W, cache: &SharedCache<T>) -> Result<()>
where
    T: Clone + Display,
    W: Write,
{
    for (key, value) in cache.dump_sequence() {
        writeln!(out, "dump: key {} value {}", key, value)?;
    }
    Ok(())
}
