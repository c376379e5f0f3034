//! # Declaration Sources
//!
//! Parsers for the files strings are imported from. A declaration source is a
//! flat mapping of string identifiers to raw text; the parsers here read it
//! without ever evaluating the file as code.
//!
//! ## Formats
//!
//! - **PHP declarations** (`.php`): the language pack format, one
//!   `$string['id'] = 'text';` assignment per statement. Only this statement
//!   shape is accepted. Comments, open/close tags and the
//!   `defined('MOODLE_INTERNAL') || die();` guard are skipped; string literals
//!   follow PHP quoting rules and may be concatenated with `.`. Double-quoted
//!   literals may not interpolate variables.
//! - **JSON** (`.json`): a flat object of string values.
//! - **YAML** (`.yaml`, `.yml`): a flat mapping of string values.
//!
//! An identifier that is declared twice keeps the last value, matching how
//! the pack format behaves when it is loaded by the product itself.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Supported declaration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Php,
    Json,
    Yaml,
}

impl SourceFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "php" => Some(SourceFormat::Php),
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            _ => None,
        }
    }
}

/// Identifier to raw text declarations, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `id`, replacing any earlier value in place.
    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let text = text.into();
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = text,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, text));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, text)| (id.as_str(), text.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Declarations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut decls = Declarations::new();
        for (id, text) in iter {
            decls.insert(id, text);
        }
        decls
    }
}

/// Read and parse a declaration file. The format is taken from the file
/// extension and defaults to PHP declarations.
pub fn read(path: &Path) -> Result<Declarations> {
    let content = fs::read_to_string(path).map_err(|e| Error::UnreadableSource {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let format = SourceFormat::from_path(path).unwrap_or(SourceFormat::Php);
    parse(&content, format, path)
}

/// Parse declarations from `content`. `path` is only used in error messages.
pub fn parse(content: &str, format: SourceFormat, path: &Path) -> Result<Declarations> {
    match format {
        SourceFormat::Php => PhpParser::new(content, path).parse(),
        SourceFormat::Json => {
            let map: BTreeMap<String, String> =
                serde_json::from_str(content).map_err(|e| Error::SourceSyntax {
                    path: path.to_path_buf(),
                    line: e.line(),
                    message: e.to_string(),
                })?;
            Ok(map.into_iter().collect())
        }
        SourceFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(Declarations::new());
            }
            let map: BTreeMap<String, String> =
                serde_yaml::from_str(content).map_err(|e| Error::SourceSyntax {
                    path: path.to_path_buf(),
                    line: e.location().map_or(0, |l| l.line()),
                    message: e.to_string(),
                })?;
            Ok(map.into_iter().collect())
        }
    }
}

/// Hand-written scanner for `$string['id'] = '...';` statements.
struct PhpParser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    path: &'a Path,
}

impl<'a> PhpParser<'a> {
    fn new(content: &str, path: &'a Path) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
            line: 1,
            path,
        }
    }

    fn parse(mut self) -> Result<Declarations> {
        let mut decls = Declarations::new();
        loop {
            self.skip_trivia()?;
            if self.peek().is_none() {
                break;
            }
            if self.eat("<?php") || self.eat("?>") {
                continue;
            }
            if self.eat("defined") {
                self.skip_guard()?;
                continue;
            }
            if self.peek() == Some('$') {
                let (id, text) = self.assignment()?;
                decls.insert(id, text);
                continue;
            }
            let found = self.peek().unwrap_or_default();
            return Err(self.error(format!("unexpected '{}'", found)));
        }
        Ok(decls)
    }

    fn assignment(&mut self) -> Result<(String, String)> {
        if !self.eat("$string") {
            return Err(self.error("only $string[...] assignments are allowed"));
        }
        self.skip_trivia()?;
        self.expect('[')?;
        self.skip_trivia()?;
        let id = self.literal()?;
        self.skip_trivia()?;
        self.expect(']')?;
        self.skip_trivia()?;
        self.expect('=')?;
        self.skip_trivia()?;
        let mut text = self.literal()?;
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('.') {
                self.bump();
                self.skip_trivia()?;
                text.push_str(&self.literal()?);
            } else {
                break;
            }
        }
        self.expect(';')?;
        Ok((id, text))
    }

    fn literal(&mut self) -> Result<String> {
        match self.peek() {
            Some('\'') => {
                self.bump();
                self.single_quoted()
            }
            Some('"') => {
                self.bump();
                self.double_quoted()
            }
            _ => Err(self.error("expected a quoted string literal")),
        }
    }

    fn single_quoted(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\'') => return Ok(out),
                Some('\\') => match self.peek() {
                    Some(c @ ('\\' | '\'')) => {
                        self.bump();
                        out.push(c);
                    }
                    _ => out.push('\\'),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\\') => match self.peek() {
                    Some(c @ ('\\' | '"' | '$')) => {
                        self.bump();
                        out.push(c);
                    }
                    Some('n') => {
                        self.bump();
                        out.push('\n');
                    }
                    Some('t') => {
                        self.bump();
                        out.push('\t');
                    }
                    Some('r') => {
                        self.bump();
                        out.push('\r');
                    }
                    _ => out.push('\\'),
                },
                Some('$')
                    if self
                        .peek()
                        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '{') =>
                {
                    return Err(self.error("variable interpolation is not supported"));
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Skip `('MOODLE_INTERNAL') || die();` after the `defined` keyword.
    fn skip_guard(&mut self) -> Result<()> {
        while let Some(c) = self.bump() {
            if c == ';' {
                return Ok(());
            }
        }
        Err(self.error("unterminated guard statement"))
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_at(1) == Some('/') => self.skip_line(),
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    loop {
                        match self.bump() {
                            None => return Err(self.error("unterminated comment")),
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn eat(&mut self, keyword: &str) -> bool {
        let matches = keyword
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        if matches {
            self.pos += keyword.chars().count();
        }
        matches
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::SourceSyntax {
            path: self.path.to_path_buf(),
            line: self.line,
            message: message.into(),
        }
    }
}
