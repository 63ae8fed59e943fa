//! Line-oriented model of `project.godot`
//!
//! The host format has no formal grammar, so the document is kept as the
//! original lines and only the lines that change are rewritten. Line-ending
//! style and trailing-newline presence are detected once and reapplied.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fsutil;

/// A complete quoted string literal with backslash escapes
pub(crate) static STRING_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).expect("string literal pattern is valid"));

/// A section's extent: header line plus every line up to the next header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub header: usize,
    /// Exclusive end line
    pub end: usize,
}

impl Section {
    /// Line indices of the section body
    pub fn body(&self) -> std::ops::Range<usize> {
        self.header + 1..self.end
    }
}

/// Parsed project configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    lines: Vec<String>,
    crlf: bool,
    trailing_newline: bool,
}

impl ProjectConfig {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            crlf: text.contains("\r\n"),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Serialize back with the original line endings
    pub fn render(&self) -> String {
        let sep = if self.crlf { "\r\n" } else { "\n" };
        let mut out = self.lines.join(sep);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(sep);
        }
        out
    }

    /// Read `path`, or `None` when the project has no config file
    pub fn read_optional(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(&text))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io("read", path, err)),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fsutil::write_atomic(path, self.render().as_bytes())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Locate the first section called `name`
    pub fn find_section(&self, name: &str) -> Option<Section> {
        let header = self
            .lines
            .iter()
            .position(|line| section_name(line) == Some(name))?;
        let end = self.lines[header + 1..]
            .iter()
            .position(|line| section_name(line).is_some())
            .map_or(self.lines.len(), |offset| header + 1 + offset);
        Some(Section { header, end })
    }

    /// Locate `key` inside `section`
    pub fn find_key(&self, section: Section, key: &str) -> Option<usize> {
        section
            .body()
            .find(|&idx| split_key_value(&self.lines[idx]).is_some_and(|(k, _)| k == key))
    }

    pub fn replace_line(&mut self, idx: usize, line: String) {
        self.lines[idx] = line;
    }

    pub fn insert_line(&mut self, idx: usize, line: String) {
        self.lines.insert(idx, line);
    }

    /// Append a new section at end of file, separated by a blank line
    pub fn append_section(&mut self, name: &str, body: Vec<String>) {
        if self.lines.last().is_some_and(|line| !line.trim().is_empty()) {
            self.lines.push(String::new());
        }
        self.lines.push(format!("[{name}]"));
        self.lines.extend(body);
    }

    /// `config_version` from the preamble before the first section
    pub fn config_version(&self) -> Option<u32> {
        self.lines
            .iter()
            .take_while(|line| section_name(line).is_none())
            .find_map(|line| match split_key_value(line) {
                Some(("config_version", value)) => value.trim().parse().ok(),
                _ => None,
            })
    }
}

/// Name of a `[section]` header line
pub fn section_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('[')?
        .strip_suffix(']')
        .map(str::trim)
}

/// Split a `key=value` line; comments and headers yield `None`
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
        return None;
    }
    if section_name(line).is_some() {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value))
}

/// Escape a raw string for use inside a quoted literal
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
