//! `[editor_plugins] enabled=...` array editing

use super::config::{quote, split_key_value, ProjectConfig, STRING_LITERAL_RE};
use crate::error::{Error, Result};

const SECTION: &str = "editor_plugins";
const KEY: &str = "enabled";

/// Last `config_version` that still uses the older collection token
const POOL_ARRAY_MAX_CONFIG_VERSION: u32 = 4;

/// Typed string array literal, e.g. `PackedStringArray("a", "b")`.
///
/// Elements are kept in their escaped (literal) form so untouched entries
/// are written back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StringArray {
    token: String,
    items: Vec<String>,
}

impl StringArray {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let open = value.find('(')?;
        let inner = value[open + 1..].strip_suffix(')')?;
        let token = value[..open].trim();
        if token.is_empty() {
            return None;
        }

        let items: Vec<String> = STRING_LITERAL_RE
            .find_iter(inner)
            .map(|m| m.as_str()[1..m.as_str().len() - 1].to_string())
            .collect();

        // Anything besides literals and separators means we do not understand it
        let leftover = STRING_LITERAL_RE.replace_all(inner, "");
        if leftover.chars().any(|c| c != ',' && !c.is_whitespace()) {
            return None;
        }

        Some(Self {
            token: token.to_string(),
            items,
        })
    }

    fn render(&self) -> String {
        let items: Vec<String> = self.items.iter().map(|item| format!("\"{item}\"")).collect();
        format!("{}({})", self.token, items.join(", "))
    }
}

/// Escaped literal body of `raw`, as it appears between the quotes
fn literal_body(raw: &str) -> String {
    let quoted = quote(raw);
    quoted[1..quoted.len() - 1].to_string()
}

impl ProjectConfig {
    /// Collection token for new arrays, inferred from `config_version`
    pub fn array_token(&self) -> &'static str {
        match self.config_version() {
            Some(v) if v <= POOL_ARRAY_MAX_CONFIG_VERSION => "PoolStringArray",
            _ => "PackedStringArray",
        }
    }

    /// Add or remove `resource` from the enabled editor plugins.
    ///
    /// Returns whether the document changed. Disabling an entry that is not
    /// present is a no-op.
    pub fn set_editor_plugin_enabled(&mut self, resource: &str, enable: bool) -> Result<bool> {
        let body = literal_body(resource);

        let Some(section) = self.find_section(SECTION) else {
            if !enable {
                return Ok(false);
            }
            let array = StringArray {
                token: self.array_token().to_string(),
                items: vec![body],
            };
            self.append_section(SECTION, vec![format!("{KEY}={}", array.render())]);
            return Ok(true);
        };

        let Some(idx) = self.find_key(section, KEY) else {
            if !enable {
                return Ok(false);
            }
            let array = StringArray {
                token: self.array_token().to_string(),
                items: vec![body],
            };
            self.insert_line(section.header + 1, format!("{KEY}={}", array.render()));
            return Ok(true);
        };

        let line = &self.lines()[idx];
        let (_, value) = split_key_value(line).ok_or_else(|| Error::ProjectConfig {
            reason: format!("unreadable [{SECTION}] {KEY} line"),
        })?;
        let mut array = StringArray::parse(value).ok_or_else(|| Error::ProjectConfig {
            reason: format!("[{SECTION}] {KEY} is not a string array: {}", value.trim()),
        })?;

        let present = array.items.contains(&body);
        match (enable, present) {
            (true, false) => array.items.push(body),
            (false, true) => array.items.retain(|item| item != &body),
            _ => return Ok(false),
        }

        let key_part = &line[..line.find('=').unwrap_or(line.len())];
        let new_line = format!("{key_part}={}", array.render());
        self.replace_line(idx, new_line);
        Ok(true)
    }

    /// Whether `resource` is currently enabled
    pub fn is_editor_plugin_enabled(&self, resource: &str) -> bool {
        let body = literal_body(resource);
        self.find_section(SECTION)
            .and_then(|section| self.find_key(section, KEY))
            .and_then(|idx| split_key_value(&self.lines()[idx]))
            .and_then(|(_, value)| StringArray::parse(value))
            .is_some_and(|array| array.items.contains(&body))
    }
}
