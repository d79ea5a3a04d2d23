//! Tokenizer for XDR interface files.
//!
//! Comments are not thrown away: they become documentation of the
//! declarations they belong to.
//!
//! * A block comment, or a run of `//` lines starting in the same column,
//!   attaches to the next token as its `comment`.
//! * A `//` or block comment after a token on the same line attaches to
//!   that token as its `line_comment`.
//! * A blank line between a comment and the next token drops the comment.
//! * Lines starting with `%` in the first column are passed through by
//!   `rpcgen` to C and ignored here.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{digit1, hex_digit1, one_of},
    combinator::{opt, recognize},
    sequence::pair,
    IResult,
};

use crate::error::Diagnostic;

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Bool,
    Case,
    Const,
    Default,
    Double,
    Enum,
    Float,
    Hyper,
    Int,
    Namespace,
    Opaque,
    Program,
    Quadruple,
    String,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Version,
    Void,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        Some(match word {
            "bool" => Keyword::Bool,
            "case" => Keyword::Case,
            "const" => Keyword::Const,
            "default" => Keyword::Default,
            "double" => Keyword::Double,
            "enum" => Keyword::Enum,
            "float" => Keyword::Float,
            "hyper" => Keyword::Hyper,
            "int" => Keyword::Int,
            "namespace" => Keyword::Namespace,
            "opaque" => Keyword::Opaque,
            "program" => Keyword::Program,
            "quadruple" => Keyword::Quadruple,
            "string" => Keyword::String,
            "struct" => Keyword::Struct,
            "switch" => Keyword::Switch,
            "typedef" => Keyword::Typedef,
            "union" => Keyword::Union,
            "unsigned" => Keyword::Unsigned,
            "version" => Keyword::Version,
            "void" => Keyword::Void,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(String),
    /// Integer literal as written.
    Number(String),
    Punct(char),
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "{}", format!("{:?}", k).to_lowercase()),
            TokenKind::Ident(s) | TokenKind::Number(s) => f.write_str(s),
            TokenKind::Punct(c) => write!(f, "'{}'", c),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub comment: Option<String>,
    pub line_comment: Option<String>,
}

// Helper parsers

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(one_of("+-")),
        alt((
            recognize(pair(alt((tag("0x"), tag("0X"))), hex_digit1)),
            digit1,
        )),
    ))(input)
}

/// Value of an integer literal: decimal, `0x` hex or `0`-prefixed octal.
pub fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i128::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i128::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };
    let value = if negative { -magnitude } else { magnitude };
    // Unsigned hyper constants may use the full 64 bits.
    i64::try_from(value)
        .ok()
        .or_else(|| u64::try_from(value).ok().map(|v| v as i64))
}

struct Pending {
    text: String,
    col: usize,
    last_line: usize,
    block: bool,
}

struct Lexer<'a> {
    file: &'a str,
    src: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    newlines: usize,
    pending: Option<Pending>,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Consume `n` bytes, tracking line and visual column.
    fn bump(&mut self, n: usize) {
        for c in self.src[self.pos..self.pos + n].chars() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.col = 0;
                }
                '\t' => self.col = (self.col / TAB_WIDTH + 1) * TAB_WIDTH,
                _ => self.col += 1,
            }
        }
        self.pos += n;
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let comment = self.pending.take().map(|p| p.text);
        self.tokens.push(Token {
            kind,
            line: self.line,
            comment,
            line_comment: None,
        });
        self.bump(len);
        self.newlines = 0;
    }

    /// The last token, if it sits on `line`.
    fn token_on_line(&mut self, line: usize) -> Option<&mut Token> {
        self.tokens.last_mut().filter(|t| t.line == line)
    }

    fn line_comment(&mut self) {
        let (line, col) = (self.line, self.col);
        let rest = self.rest();
        let len = rest.find('\n').unwrap_or(rest.len());
        let text = rest[..len].trim_end().to_string();
        self.bump(len);
        self.newlines = 0;

        if let Some(token) = self.token_on_line(line) {
            token.line_comment = Some(text);
            return;
        }
        match &mut self.pending {
            Some(p) if !p.block && p.col == col && p.last_line + 1 == line => {
                p.text.push('\n');
                p.text.push_str(&text);
                p.last_line = line;
            }
            _ => {
                self.pending = Some(Pending {
                    text,
                    col,
                    last_line: line,
                    block: false,
                })
            }
        }
    }

    fn block_comment(&mut self) {
        let (line, col) = (self.line, self.col);
        let rest = self.rest();
        let Some(end) = rest.find("*/") else {
            self.diagnostics.push(Diagnostic::new(
                self.file,
                line,
                "unterminated comment",
            ));
            self.bump(rest.len());
            return;
        };
        let text = normalize_block(&rest[..end + 2], col);
        self.bump(end + 2);
        self.newlines = 0;

        if let Some(token) = self.token_on_line(line) {
            token.line_comment = Some(text);
            return;
        }
        // Only a comment standing alone on its line documents what follows.
        let rest = self.rest();
        let tail = &rest[..rest.find('\n').unwrap_or(rest.len())];
        if !tail.trim().is_empty() {
            return;
        }
        self.pending = Some(Pending {
            text,
            col,
            last_line: self.line,
            block: true,
        });
    }

    fn run(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            let rest = self.rest();
            match c {
                '\n' => {
                    self.bump(1);
                    self.newlines += 1;
                    if self.newlines >= 2 {
                        self.pending = None;
                    }
                }
                '%' if self.col == 0 => {
                    let len = rest.find('\n').unwrap_or(rest.len());
                    self.bump(len);
                }
                c if c.is_whitespace() => self.bump(c.len_utf8()),
                '/' if rest.starts_with("//") => self.line_comment(),
                '/' if rest.starts_with("/*") => self.block_comment(),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    if let Ok((_, word)) = identifier(rest) {
                        let kind = match Keyword::lookup(word) {
                            Some(k) => TokenKind::Keyword(k),
                            None => TokenKind::Ident(word.to_string()),
                        };
                        self.push(kind, word.len());
                    }
                }
                c if c.is_ascii_digit() || c == '-' || c == '+' => match number(rest) {
                    Ok((_, text)) => self.push(TokenKind::Number(text.to_string()), text.len()),
                    Err(_) => self.unexpected(c),
                },
                '{' | '}' | '(' | ')' | '[' | ']' | '<' | '>' | ';' | ':' | ',' | '=' | '*' => {
                    self.push(TokenKind::Punct(c), 1)
                }
                c => self.unexpected(c),
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
            comment: None,
            line_comment: None,
        });
    }

    fn unexpected(&mut self, c: char) {
        self.diagnostics.push(Diagnostic::new(
            self.file,
            self.line,
            format!("unexpected character {:?}", c),
        ));
        self.bump(c.len_utf8());
    }
}

/// Strip the indentation of continuation lines up to the column where the
/// comment started, so the text reads as if it started in column 0.
fn normalize_block(raw: &str, col: usize) -> String {
    let mut lines = raw.split('\n');
    let mut out = lines.next().unwrap_or_default().trim_end().to_string();
    for line in lines {
        out.push('\n');
        out.push_str(strip_indent(line, col).trim_end());
    }
    out
}

fn strip_indent(line: &str, col: usize) -> &str {
    let mut visual = 0;
    for (i, c) in line.char_indices() {
        if visual >= col || !(c == ' ' || c == '\t') {
            return &line[i..];
        }
        visual = if c == '\t' {
            (visual / TAB_WIDTH + 1) * TAB_WIDTH
        } else {
            visual + 1
        };
    }
    ""
}

/// Tokenize one file. The token list always ends with [`TokenKind::Eof`].
pub fn tokenize(file: &str, src: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        file,
        src,
        pos: 0,
        line: 1,
        col: 0,
        newlines: 0,
        pending: None,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

/// Turn a raw comment into documentation lines.
pub fn comment_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = if let Some(body) = raw.strip_prefix("/*") {
        let body = body.strip_suffix("*/").unwrap_or(body);
        let body = body.trim_start_matches('*');
        body.lines()
            .map(|l| {
                let l = l.trim();
                let l = l.strip_prefix('*').unwrap_or(l);
                l.strip_prefix(' ').unwrap_or(l).to_string()
            })
            .collect()
    } else {
        raw.lines()
            .map(|l| {
                let l = l.trim_start();
                let l = l.trim_start_matches('/');
                l.strip_prefix(' ').unwrap_or(l).to_string()
            })
            .collect()
    };
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize("t.x", src).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("foo_bar123 rest"), Ok((" rest", "foo_bar123")));
        assert_eq!(identifier("_private"), Ok(("", "_private")));
    }

    #[test]
    fn test_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-42"), Some(-42));
        assert_eq!(parse_integer("0x2A"), Some(42));
        assert_eq!(parse_integer("010"), Some(8));
        assert_eq!(parse_integer("0xffffffffffffffff"), Some(-1));
        assert_eq!(number("-0x10;"), Ok((";", "-0x10")));
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            kinds("const X = -1;\n%#include <x.h>\nunsigned hyper"),
            vec![
                TokenKind::Keyword(Keyword::Const),
                TokenKind::Ident("X".into()),
                TokenKind::Punct('='),
                TokenKind::Number("-1".into()),
                TokenKind::Punct(';'),
                TokenKind::Keyword(Keyword::Unsigned),
                TokenKind::Keyword(Keyword::Hyper),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let (_, diags) = tokenize("a.x", "const A = 1;\nconst B = @;\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].to_string(), "a.x:2: unexpected character '@'");
    }

    #[test]
    fn test_block_comment_attaches_to_next_token() {
        let (tokens, _) = tokenize("t.x", "  /* Doc\n   * more\n   */\n  struct");
        assert_eq!(tokens[0].comment.as_deref(), Some("/* Doc\n * more\n */"));
    }

    #[test]
    fn test_line_comment_groups() {
        let src = "// one\n// two\nint\n    // indented\n// other column\nint\n";
        let (tokens, _) = tokenize("t.x", src);
        assert_eq!(tokens[0].comment.as_deref(), Some("// one\n// two"));
        assert_eq!(tokens[1].comment.as_deref(), Some("// other column"));
    }

    #[test]
    fn test_blank_line_drops_comment() {
        let (tokens, _) = tokenize("t.x", "// stray\n\nint x;");
        assert_eq!(tokens[0].comment, None);
    }

    #[test]
    fn test_trailing_comment_is_line_comment() {
        let (tokens, _) = tokenize("t.x", "A = 1, // first\nB = 2 /* second */\n");
        assert_eq!(tokens[3].line_comment.as_deref(), Some("// first"));
        assert_eq!(tokens[4].comment, None);
        assert_eq!(tokens[6].line_comment.as_deref(), Some("/* second */"));
    }

    #[test]
    fn test_block_comment_before_code_is_dropped() {
        let (tokens, _) = tokenize("t.x", "/* inline */ int x;\n/* alone */\nint y;");
        assert_eq!(tokens[0].comment, None);
        assert_eq!(tokens[3].comment.as_deref(), Some("/* alone */"));
    }

    #[test]
    fn test_tabs_count_as_eight_columns() {
        let (tokens, _) = tokenize("t.x", "\t/* a\n\t   b */\nint");
        assert_eq!(tokens[0].comment.as_deref(), Some("/* a\n   b */"));
    }

    #[test]
    fn test_comment_lines() {
        assert_eq!(comment_lines("/* Doc\n * more\n */"), vec!["Doc", "more"]);
        assert_eq!(comment_lines("/** Doc */"), vec!["Doc"]);
        assert_eq!(comment_lines("// one\n//two"), vec!["one", "two"]);
    }
}
