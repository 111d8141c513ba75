//! Field selectors.
//!
//! A selector addresses a field or array element relative to an object
//! root using dot and bracket navigation:
//!
//! ```text
//! amount                   property
//! borrower.address.city    nested properties
//! payments[0]              array index (negative counts from the end)
//! borrowers['b-17'].email  quoted key: object property, or array element by id
//! fees[type="late"]        array element whose `type` equals "late"
//! ```
//!
//! Selectors are parsed once into [`SelectorSegment`]s and never re-parsed
//! while being resolved.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;

/// One navigation step of a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorSegment {
    /// `.name` or a leading `name`.
    Property(String),
    /// `[n]`; negative values index from the end.
    Index(i64),
    /// `["key"]`; a property on objects, the element with a matching `id`
    /// on arrays.
    Key(String),
    /// `[key="value"]`; the array element whose `key` equals `value`.
    Match {
        /// Property compared on each element.
        key: String,
        /// Required string value.
        value: String,
    },
}

/// A parsed field selector.
///
/// # Example
///
/// ```rust
/// use loansync_protocol::{Selector, SelectorSegment};
///
/// let selector: Selector = "borrowers['b1'].phones[0]".parse().unwrap();
/// assert_eq!(
///     selector.segments(),
///     &[
///         SelectorSegment::Property("borrowers".into()),
///         SelectorSegment::Key("b1".into()),
///         SelectorSegment::Property("phones".into()),
///         SelectorSegment::Index(0),
///     ]
/// );
/// assert_eq!(selector.to_string(), "borrowers[\"b1\"].phones[0]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    segments: Vec<SelectorSegment>,
}

impl Selector {
    /// Parses selector text.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidSelector`] describing the first
    /// offending position.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        Parser::new(text).parse()
    }

    /// Builds a selector from already-parsed segments.
    #[must_use]
    pub fn from_segments(segments: Vec<SelectorSegment>) -> Self {
        Self { segments }
    }

    /// Returns the navigation steps.
    #[must_use]
    pub fn segments(&self) -> &[SelectorSegment] {
        &self.segments
    }

    /// Formats the first `len` segments, for naming an unresolved prefix.
    #[must_use]
    pub fn prefix(&self, len: usize) -> String {
        let end = len.min(self.segments.len());
        format_segments(&self.segments[..end])
    }
}

impl FromStr for Selector {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_segments(&self.segments))
    }
}

fn format_segments(segments: &[SelectorSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            SelectorSegment::Property(name) if is_identifier(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            SelectorSegment::Property(name) | SelectorSegment::Key(name) => {
                out.push('[');
                push_quoted(&mut out, name);
                out.push(']');
            }
            SelectorSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
            SelectorSegment::Match { key, value } => {
                out.push('[');
                out.push_str(key);
                out.push('=');
                push_quoted(&mut out, value);
                out.push(']');
            }
        }
    }
    out
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if is_identifier_start(c)) && chars.all(is_identifier_part)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> ProtocolError {
        ProtocolError::InvalidSelector {
            selector: self.text.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> ProtocolResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse(mut self) -> ProtocolResult<Selector> {
        let mut segments = Vec::new();

        match self.peek() {
            None => return Err(self.error("empty selector")),
            Some('[') => {}
            Some(_) => segments.push(SelectorSegment::Property(self.identifier()?)),
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.bump();
                    segments.push(SelectorSegment::Property(self.identifier()?));
                }
                '[' => {
                    self.bump();
                    segments.push(self.bracket()?);
                }
                other => return Err(self.error(format!("unexpected character '{other}'"))),
            }
        }

        Ok(Selector { segments })
    }

    fn identifier(&mut self) -> ProtocolResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_identifier_start(c) => {
                self.bump();
            }
            _ => return Err(self.error("expected field name")),
        }
        while matches!(self.peek(), Some(c) if is_identifier_part(c)) {
            self.bump();
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn bracket(&mut self) -> ProtocolResult<SelectorSegment> {
        self.skip_whitespace();
        let segment = match self.peek() {
            Some('"') | Some('\'') => SelectorSegment::Key(self.string()?),
            Some(c) if c == '-' || c.is_ascii_digit() => SelectorSegment::Index(self.integer()?),
            Some(c) if is_identifier_start(c) => {
                let key = self.identifier()?;
                self.skip_whitespace();
                self.expect('=')?;
                self.skip_whitespace();
                let value = self.string()?;
                SelectorSegment::Match { key, value }
            }
            Some(c) => return Err(self.error(format!("unexpected character '{c}' in brackets"))),
            None => return Err(self.error("unterminated brackets")),
        };
        self.skip_whitespace();
        self.expect(']')?;
        Ok(segment)
    }

    fn integer(&mut self) -> ProtocolResult<i64> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|_| self.error("invalid array index"))
    }

    fn string(&mut self) -> ProtocolResult<String> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}
