//! Line lexer for the text IR.
//!
//! The format is line-oriented: every top-level entity, label and
//! instruction sits on its own line, so the reader tokenizes one line at a
//! time. A `;` outside a string starts a comment that runs to end of line.

use anyhow::{bail, Result};
use std::fmt;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `%name` / `%12` / `%"quoted"` (sigil stripped).
    Local(String),
    /// `@name` (sigil stripped).
    Global(String),
    /// Bare word: keywords, types, opcodes, predicates.
    Word(String),
    /// `name:` or `12:` at the start of a line.
    Label(String),
    Int(i64),
    Str(String),
    /// `#0`
    AttrRef(String),
    /// `!dbg`, `!12`
    Metadata(String),
    Punct(char),
    /// `...` in a parameter list.
    Ellipsis,
}

impl Token {
    pub fn is_word(&self, w: &str) -> bool {
        matches!(self, Token::Word(s) if s == w)
    }

    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Local(n) => write!(f, "%{}", n),
            Token::Global(n) => write!(f, "@{}", n),
            Token::Word(w) => write!(f, "{}", w),
            Token::Label(l) => write!(f, "{}:", l),
            Token::Int(v) => write!(f, "{}", v),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::AttrRef(a) => write!(f, "#{}", a),
            Token::Metadata(m) => write!(f, "!{}", m),
            Token::Punct(c) => write!(f, "{}", c),
            Token::Ellipsis => write!(f, "..."),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-')
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$')
}

/// Parse a decimal literal that fits either `i64` or `u64`; the latter is
/// reinterpreted as two's complement (`18446744073709551615` is `-1`).
fn parse_int(text: &str) -> Result<i64> {
    match text.parse::<i128>() {
        Ok(v) if v >= i64::MIN as i128 && v <= u64::MAX as i128 => Ok(v as i64),
        _ => bail!("integer literal '{}' does not fit in 64 bits", text),
    }
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    line: &'a str,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&f) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn quoted(&mut self) -> Result<String> {
        // Opening quote already consumed.
        let start = self.pos;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '"' {
                return Ok(self.chars[start..self.pos - 1].iter().collect());
            }
        }
        bail!("unterminated string in '{}'", self.line.trim())
    }

    fn name_after_sigil(&mut self, sigil: char) -> Result<String> {
        if self.peek() == Some('"') {
            self.pos += 1;
            return self.quoted();
        }
        let name = self.take_while(is_ident_char);
        if name.is_empty() {
            bail!("expected a name after '{}'", sigil);
        }
        Ok(name)
    }
}

/// The name defined by a module-level `@name = ...` line. Only the part up
/// to `=` is read; initializers such as `c"hi\00"` are left alone.
pub fn global_definition_name(line: &str) -> Result<String> {
    let mut cur = Cursor {
        chars: line.trim_start().chars().collect(),
        pos: 0,
        line,
    };
    if cur.peek() != Some('@') {
        bail!("expected a global definition in '{}'", line.trim());
    }
    cur.pos += 1;
    let name = cur.name_after_sigil('@')?;
    cur.take_while(char::is_whitespace);
    if cur.peek() != Some('=') {
        bail!("expected '=' after @{}", name);
    }
    Ok(name)
}

/// Split one source line into tokens, dropping any trailing comment.
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut cur = Cursor {
        chars: line.chars().collect(),
        pos: 0,
        line,
    };
    let mut tokens = Vec::new();

    while let Some(c) = cur.peek() {
        if c.is_whitespace() {
            cur.pos += 1;
            continue;
        }
        if c == ';' {
            break;
        }
        let token = match c {
            '%' | '@' => {
                cur.pos += 1;
                let name = cur.name_after_sigil(c)?;
                if c == '%' {
                    Token::Local(name)
                } else {
                    Token::Global(name)
                }
            }
            '#' => {
                cur.pos += 1;
                Token::AttrRef(cur.take_while(|c| c.is_ascii_digit()))
            }
            '!' => {
                cur.pos += 1;
                Token::Metadata(cur.take_while(is_ident_char))
            }
            '"' => {
                cur.pos += 1;
                Token::Str(cur.quoted()?)
            }
            '.' if cur.peek_at(1) == Some('.') && cur.peek_at(2) == Some('.') => {
                cur.pos += 3;
                Token::Ellipsis
            }
            '-' | '0'..='9' => {
                let start = cur.pos;
                if c == '-' {
                    cur.pos += 1;
                }
                let digits = cur.take_while(|c| c.is_ascii_digit());
                if digits.is_empty() {
                    bail!("stray '-' in '{}'", line.trim());
                }
                if c != '-' && cur.peek() == Some(':') && tokens.is_empty() {
                    cur.pos += 1;
                    Token::Label(digits)
                } else {
                    let text: String = cur.chars[start..cur.pos].iter().collect();
                    Token::Int(parse_int(&text)?)
                }
            }
            c if is_word_start(c) => {
                let word = cur.take_while(is_ident_char);
                if cur.peek() == Some(':') && tokens.is_empty() {
                    cur.pos += 1;
                    Token::Label(word)
                } else {
                    Token::Word(word)
                }
            }
            '=' | ',' | '(' | ')' | '[' | ']' | '{' | '}' => {
                cur.pos += 1;
                Token::Punct(c)
            }
            other => bail!("unexpected character '{}' in '{}'", other, line.trim()),
        };
        tokens.push(token);
    }
    Ok(tokens)
}
