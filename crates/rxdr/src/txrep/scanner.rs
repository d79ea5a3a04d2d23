//! Split txrep text into `key -> value` records.

use std::collections::BTreeMap;

use super::{TxrepHelp, TxrepLineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TxrepField {
    pub key_line: usize,
    pub value_line: usize,
    pub value: String,
}

#[derive(Debug, Default)]
pub(crate) struct Scanned {
    pub fields: BTreeMap<String, TxrepField>,
    pub help: TxrepHelp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Quote,
    Escape,
    Comment,
}

/// Character-level pass. `#` and `;` start a comment running to the end
/// of the line unless they appear inside a quoted string or, for `#`,
/// right after an identifier character; a quoted string
/// may only continue onto the next line through a backslash-newline.
fn records(input: &str, errors: &mut Vec<TxrepLineError>) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut line = 1;
    let mut start = 1;

    for c in input.chars() {
        match (state, c) {
            (State::Quote, '\n') => {
                errors.push(TxrepLineError {
                    line,
                    message: "unterminated string".to_string(),
                });
                current.clear();
                state = State::Normal;
                line += 1;
                start = line;
            }
            (State::Normal | State::Comment, '\n') => {
                records.push((start, std::mem::take(&mut current)));
                state = State::Normal;
                line += 1;
                start = line;
            }
            (State::Comment, _) => {}
            // `E#7` is an enum value without a tag, not a comment.
            (State::Normal, '#') if current.ends_with(|p: char| p.is_alphanumeric() || p == '_') => {
                current.push(c)
            }
            (State::Normal, '#' | ';') => state = State::Comment,
            (State::Normal, '"') => {
                current.push(c);
                state = State::Quote;
            }
            (State::Normal, _) => current.push(c),
            (State::Quote, '\\') => {
                current.push(c);
                state = State::Escape;
            }
            (State::Quote, '"') => {
                current.push(c);
                state = State::Normal;
            }
            (State::Quote, _) => current.push(c),
            (State::Escape, _) => {
                if c == '\n' {
                    line += 1;
                }
                current.push(c);
                state = State::Quote;
            }
        }
    }

    match state {
        State::Quote | State::Escape => errors.push(TxrepLineError {
            line,
            message: "unterminated string".to_string(),
        }),
        State::Normal | State::Comment => records.push((start, current)),
    }
    records
}

pub(crate) fn scan(input: &str) -> Result<Scanned, Vec<TxrepLineError>> {
    let mut errors = Vec::new();
    let mut scanned = Scanned::default();

    for (line, text) in records(input, &mut errors) {
        if text.trim().is_empty() {
            continue;
        }
        let Some(colon) = text.find(':') else {
            errors.push(TxrepLineError {
                line,
                message: format!("syntax error: expected \"key: value\", found {:?}", text.trim()),
            });
            continue;
        };
        let (key, rest) = (text[..colon].trim(), &text[colon + 1..]);
        if key.is_empty() || key.contains(char::is_whitespace) {
            errors.push(TxrepLineError {
                line,
                message: format!("invalid key {:?}", key),
            });
            continue;
        }

        let lead = rest.len() - rest.trim_start().len();
        let value_line = line + text[..colon + 1 + lead].matches('\n').count();
        let mut value = rest.trim();
        if let Some(stripped) = value.strip_suffix('?') {
            scanned.help.insert(key);
            value = stripped.trim_end();
        }

        if scanned.fields.contains_key(key) {
            errors.push(TxrepLineError {
                line,
                message: format!("duplicate key {}", key),
            });
            continue;
        }
        scanned.fields.insert(
            key.to_string(),
            TxrepField {
                key_line: line,
                value_line,
                value: value.to_string(),
            },
        );
    }

    if errors.is_empty() {
        Ok(scanned)
    } else {
        errors.sort_by_key(|e| e.line);
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_help() {
        let scanned = scan(
            "# header\n\
             tx.fee: 100 ; trailing\n\
             tx.memo.type: MEMO_TEXT?\n\
             tx.memo.text: \"a # b ; c\"\n",
        )
        .unwrap();
        assert_eq!(scanned.fields.len(), 3);
        assert_eq!(scanned.fields["tx.fee"].value, "100");
        assert_eq!(scanned.fields["tx.fee"].key_line, 2);
        assert_eq!(scanned.fields["tx.memo.type"].value, "MEMO_TEXT");
        assert_eq!(scanned.fields["tx.memo.text"].value, "\"a # b ; c\"");
        assert!(scanned.help.contains("tx.memo.type"));
        assert!(!scanned.help.contains("tx.fee"));
    }

    #[test]
    fn test_untagged_enum_value_is_not_a_comment() {
        let scanned = scan("e: E#7\nf: 3 #7\n").unwrap();
        assert_eq!(scanned.fields["e"].value, "E#7");
        assert_eq!(scanned.fields["f"].value, "3");
    }

    #[test]
    fn test_escaped_newline_continues_string() {
        let scanned = scan("a: \"one\\\ntwo\"\nb: 2\n").unwrap();
        assert_eq!(scanned.fields["a"].value, "\"one\\\ntwo\"");
        assert_eq!(scanned.fields["b"].key_line, 3);
    }

    #[test]
    fn test_errors_carry_lines() {
        let errors = scan("a: 1\nnot a pair\nb: \"open\nc: 1\nc: 2\n").unwrap_err();
        let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 5]);
        assert!(errors[0].message.contains("syntax error"));
        assert!(errors[1].message.contains("unterminated"));
        assert!(errors[2].message.contains("duplicate"));
    }
}
