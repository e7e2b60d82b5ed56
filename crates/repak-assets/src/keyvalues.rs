//! Legacy KeyValues text format used by material definition files.
//!
//! ```text
//! // comment
//! "type"     "skn"
//! width      512
//! "textures"
//! {
//!     "0" "texture/models/crate_col"
//! }
//! ```
//!
//! Keys and values are quoted strings or bare tokens ending at whitespace.
//! A key followed by `{` opens a nested block. Each key holds one value;
//! which value survives a repeated key is not part of the format.

use crate::error::KeyValuesError;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Parsed block of key/value pairs and nested blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    values: HashMap<String, String>,
    nested: HashMap<String, KeyValues>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Next token with the line it starts on
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, KeyValuesError> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok(None);
            };
            let line = self.line;

            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '{' => {
                    self.bump();
                    return Ok(Some((Token::Open, line)));
                }
                '}' => {
                    self.bump();
                    return Ok(Some((Token::Close, line)));
                }
                '"' => {
                    self.bump();
                    let mut text = String::new();
                    loop {
                        match self.bump() {
                            Some('"') => return Ok(Some((Token::Text(text), line))),
                            Some(c) => text.push(c),
                            None => return Err(KeyValuesError::UnterminatedString { line }),
                        }
                    }
                }
                '/' if self.is_comment() => {
                    while self.chars.peek().is_some_and(|c| *c != '\n') {
                        self.bump();
                    }
                }
                _ => {
                    let mut text = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        text.push(c);
                        self.bump();
                    }
                    return Ok(Some((Token::Text(text), line)));
                }
            }
        }
    }

    fn is_comment(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.peek() == Some(&'/')
    }
}

impl KeyValues {
    /// Parse a KeyValues document
    pub fn parse(text: &str) -> Result<Self, KeyValuesError> {
        let mut lexer = Lexer::new(text);
        Self::parse_block(&mut lexer, None)
    }

    fn parse_block(lexer: &mut Lexer<'_>, opened_on: Option<usize>) -> Result<Self, KeyValuesError> {
        let mut block = Self::default();
        let mut pending: Option<(String, usize)> = None;

        loop {
            let Some((token, line)) = lexer.next_token()? else {
                if let Some(line) = opened_on {
                    return Err(KeyValuesError::UnclosedBlock { line });
                }
                break;
            };

            match token {
                Token::Text(text) => match pending.take() {
                    Some((key, _)) => {
                        block.values.entry(key).or_insert(text);
                    }
                    None => pending = Some((text, line)),
                },
                Token::Open => {
                    let Some((key, _)) = pending.take() else {
                        return Err(KeyValuesError::MissingKey { line });
                    };
                    let child = Self::parse_block(lexer, Some(line))?;
                    block.nested.entry(key).or_insert(child);
                }
                Token::Close => {
                    if opened_on.is_none() {
                        return Err(KeyValuesError::UnexpectedClose { line });
                    }
                    break;
                }
            }
        }

        match pending {
            Some((key, line)) => Err(KeyValuesError::MissingValue { key, line }),
            None => Ok(block),
        }
    }

    /// Check if `key` holds a value or a nested block
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.nested.contains_key(key)
    }

    /// Check if `key` holds a nested block
    pub fn is_nested(&self, key: &str) -> bool {
        self.nested.contains_key(key)
    }

    /// Value stored under `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Nested block stored under `key`
    pub fn nested(&self, key: &str) -> Option<&Self> {
        self.nested.get(key)
    }

    /// Plain key/value pairs, in no particular order
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of keys in this block
    pub fn len(&self) -> usize {
        self.values.len() + self.nested.len()
    }

    /// Check if the block has no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.nested.is_empty()
    }
}
