//! Operation scripts
//!
//! One operation per line in a file, or comma-separated on the command line:
//!
//! ```text
//! put 1 foo
//! get 1        # comments start a word and run to end of line
//! dump
//! ```

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// A single cache operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put { key: i64, value: String },
    Get { key: i64 },
    Remove { key: i64 },
    Pop,
    Clear,
    Dump,
    Keys,
    Stats,
}

impl Command {
    /// Parse one operation, e.g. `put 3 hello world`
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let verb = tokens
            .next()
            .ok_or_else(|| anyhow!("empty operation"))?
            .to_lowercase();

        let command = match verb.as_str() {
            "put" | "set" => {
                let key = parse_key(tokens.next(), &verb)?;
                let value = tokens.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    bail!("'put' needs a value");
                }
                return Ok(Command::Put { key, value });
            }
            "get" => Command::Get {
                key: parse_key(tokens.next(), &verb)?,
            },
            "remove" | "del" => Command::Remove {
                key: parse_key(tokens.next(), &verb)?,
            },
            "pop" => Command::Pop,
            "clear" => Command::Clear,
            "dump" => Command::Dump,
            "keys" => Command::Keys,
            "stats" => Command::Stats,
            other => bail!("unknown operation '{}'", other),
        };

        if let Some(extra) = tokens.next() {
            bail!("unexpected argument '{}' for '{}'", extra, verb);
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Put { key, value } => write!(f, "put({}, {})", key, value),
            Command::Get { key } => write!(f, "get({})", key),
            Command::Remove { key } => write!(f, "remove({})", key),
            Command::Pop => f.write_str("pop()"),
            Command::Clear => f.write_str("clear()"),
            Command::Dump => f.write_str("dump()"),
            Command::Keys => f.write_str("keys()"),
            Command::Stats => f.write_str("stats()"),
        }
    }
}

fn parse_key(token: Option<&str>, verb: &str) -> Result<i64> {
    let token = token.ok_or_else(|| anyhow!("'{}' needs a key", verb))?;
    token
        .parse()
        .with_context(|| format!("invalid key '{}' for '{}'", token, verb))
}

/// Parse command-line operations separated by `,`
pub fn parse_args(args: &[String]) -> Result<Vec<Command>> {
    args.join(" ")
        .split(',')
        .map(str::trim)
        .filter(|op| !op.is_empty())
        .map(Command::parse)
        .collect()
}

/// Parse script text, skipping blank lines and `#` comments
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    text.lines()
        .enumerate()
        .filter_map(|(n, line)| {
            let line = strip_comment(line).trim();
            (!line.is_empty()).then_some((n + 1, line))
        })
        .map(|(n, line)| Command::parse(line).with_context(|| format!("line {}", n)))
        .collect()
}

/// Cut a trailing comment; `#` only counts at the start of a word, so
/// values like `a#b` survive
fn strip_comment(line: &str) -> &str {
    let mut after_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && after_space {
            return &line[..i];
        }
        after_space = c.is_whitespace();
    }
    line
}

/// Load a script file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Command>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {:?}", path))?;
    parse_script(&text).with_context(|| format!("in script {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("put 1 foo").unwrap(),
            Command::Put {
                key: 1,
                value: "foo".to_string()
            }
        );
        assert_eq!(
            Command::parse("PUT 2 hello world").unwrap(),
            Command::Put {
                key: 2,
                value: "hello world".to_string()
            }
        );
        assert_eq!(Command::parse("get -1").unwrap(), Command::Get { key: -1 });
        assert_eq!(Command::parse("del 4").unwrap(), Command::Remove { key: 4 });
        assert_eq!(Command::parse("  dump ").unwrap(), Command::Dump);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("put 1").is_err());
        assert!(Command::parse("get").is_err());
        assert!(Command::parse("get abc").is_err());
        assert!(Command::parse("clear now").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[test]
    fn test_parse_args() {
        let args: Vec<String> = ["put", "1", "foo", ",", "put", "2", "bar,", "get 1", ",", "dump"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let commands = parse_args(&args).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Put {
                    key: 1,
                    value: "foo".to_string()
                },
                Command::Put {
                    key: 2,
                    value: "bar".to_string()
                },
                Command::Get { key: 1 },
                Command::Dump,
            ]
        );
        assert!(parse_args(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_load_script() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# warm up").unwrap();
        writeln!(file, "put 1 foo").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "get 1   # hit").unwrap();
        writeln!(file, "clear").unwrap();

        let commands = load(file.path()).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1], Command::Get { key: 1 });
        assert_eq!(commands[2], Command::Clear);
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let commands = parse_script("put 1 a#b\nput 2 c # note\n#put 3 d\n").unwrap();

        assert_eq!(
            commands,
            vec![
                Command::Put {
                    key: 1,
                    value: "a#b".to_string()
                },
                Command::Put {
                    key: 2,
                    value: "c".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_load_script_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "put 1 foo").unwrap();
        writeln!(file, "get x").unwrap();

        let err = load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load("/nonexistent/bytelru/script.txt").is_err());
    }
}
