// CSV tokenizer for single policy lines
//
// Leading whitespace after each comma is trimmed. Fields may be wrapped in
// double quotes, with `""` standing for a literal quote inside them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("bare \" in non-quoted field at column {column}: {line:?}")]
    BareQuote { line: String, column: usize },

    #[error("extraneous or missing \" in quoted field at column {column}: {line:?}")]
    ExtraneousQuote { line: String, column: usize },

    #[error("unterminated quoted field starting at column {column}: {line:?}")]
    UnterminatedQuote { line: String, column: usize },
}

/// Split one line into its comma-separated fields
pub fn parse_csv_line(line: &str) -> Result<Vec<String>, ParseError> {
    let mut fields = Vec::new();
    let mut chars = line.char_indices().peekable();

    loop {
        while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            chars.next();
        }

        let mut field = String::new();
        match chars.peek().copied() {
            Some((start, '"')) => {
                chars.next();
                loop {
                    match chars.next() {
                        Some((_, '"')) => match chars.peek().copied() {
                            Some((_, '"')) => {
                                chars.next();
                                field.push('"');
                            }
                            Some((_, ',')) | None => break,
                            Some((pos, _)) => {
                                return Err(ParseError::ExtraneousQuote {
                                    line: line.to_string(),
                                    column: column(line, pos),
                                })
                            }
                        },
                        Some((_, c)) => field.push(c),
                        None => {
                            return Err(ParseError::UnterminatedQuote {
                                line: line.to_string(),
                                column: column(line, start),
                            })
                        }
                    }
                }
            }
            _ => {
                while let Some(&(pos, c)) = chars.peek() {
                    match c {
                        ',' => break,
                        '"' => {
                            return Err(ParseError::BareQuote {
                                line: line.to_string(),
                                column: column(line, pos),
                            })
                        }
                        _ => {
                            field.push(c);
                            chars.next();
                        }
                    }
                }
            }
        }
        fields.push(field);

        // Either a separator or end of input remains
        if chars.next().is_none() {
            break;
        }
    }

    Ok(fields)
}

fn column(line: &str, byte_pos: usize) -> usize {
    line[..byte_pos].chars().count() + 1
}
