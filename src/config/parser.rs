// Config file parser
// One `key value...` directive per line; `#` starts a comment line

use super::ConfigError;

/// A parsed directive with the line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive {
    pub(crate) line: usize,
    pub(crate) key: String,
    pub(crate) args: Vec<String>,
}

pub(crate) struct ConfigParser<'a> {
    content: &'a str,
}

impl<'a> ConfigParser<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        Self { content }
    }

    /// Parse every directive; keys are lowercased
    pub(crate) fn parse(&self) -> Result<Vec<Directive>, ConfigError> {
        let mut directives = Vec::new();

        for (index, raw) in self.content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens =
                split_args(line).ok_or(ConfigError::UnterminatedQuote { line: index + 1 })?;
            let key = tokens.remove(0).to_lowercase();
            directives.push(Directive {
                line: index + 1,
                key,
                args: tokens,
            });
        }

        Ok(directives)
    }
}

/// Split a directive line on whitespace. Double-quoted arguments may contain
/// spaces and the escapes `\n`, `\t`, `\"` and `\\`.
///
/// Returns `None` on an unterminated quote.
fn split_args(line: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut arg = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next()? {
                    '"' => break,
                    '\\' => match chars.next()? {
                        'n' => arg.push('\n'),
                        't' => arg.push('\t'),
                        other => arg.push(other),
                    },
                    c => arg.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                arg.push(c);
                chars.next();
            }
        }
        args.push(arg);
    }

    Some(args)
}
