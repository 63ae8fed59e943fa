//! `[autoload]` path rewriting

use super::config::{split_key_value, ProjectConfig, STRING_LITERAL_RE};
use crate::addon::ADDONS_DIR;

const SECTION: &str = "autoload";

/// Activation marker that may lead an autoload path inside the quotes
const ACTIVE_MARKER: char = '*';

impl ProjectConfig {
    /// Rewrite autoload paths under `addons/<from>/` to `addons/<to>/`.
    ///
    /// Only whole quoted-string values are touched; everything else in the
    /// section is left as is. Returns whether any line changed.
    pub fn replace_autoload_prefix(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        let Some(section) = self.find_section(SECTION) else {
            return false;
        };

        let old_prefix = format!("res://{ADDONS_DIR}/{from}/");
        let new_prefix = format!("res://{ADDONS_DIR}/{to}/");

        let mut changed = false;
        for idx in section.body() {
            let line = &self.lines()[idx];
            if let Some(rewritten) = rewrite_line(line, &old_prefix, &new_prefix) {
                tracing::debug!("autoload: {} -> {}", line.trim(), rewritten.trim());
                self.replace_line(idx, rewritten);
                changed = true;
            }
        }
        changed
    }
}

fn rewrite_line(line: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    split_key_value(line)?;
    let eq = line.find('=')?;
    let value = &line[eq + 1..];
    let literal = value.trim();

    let whole = STRING_LITERAL_RE.find(literal)?;
    if whole.start() != 0 || whole.end() != literal.len() {
        return None;
    }

    let body = &literal[1..literal.len() - 1];
    let (marker, path) = match body.strip_prefix(ACTIVE_MARKER) {
        Some(rest) => (Some(ACTIVE_MARKER), rest),
        None => (None, body),
    };
    let rest = path.strip_prefix(old_prefix)?;

    let lead = &value[..value.len() - value.trim_start().len()];
    let trail = &value[value.trim_end().len()..];
    let marker = marker.map(String::from).unwrap_or_default();
    Some(format!(
        "{}{lead}\"{marker}{new_prefix}{rest}\"{trail}",
        &line[..=eq]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"[autoload]

Bus="*res://addons/@widget/bus.gd"
Audio="res://addons/@widget/audio/mixer.gd"
Other="*res://addons/@widget_extra/x.gd"
Broken=res://addons/@widget/raw.gd

[editor_plugins]

enabled=PackedStringArray("res://addons/@widget/plugin.cfg")
"#;

    #[test]
    fn test_rewrites_autoload_prefix() {
        let mut doc = ProjectConfig::parse(DOC);
        assert!(doc.replace_autoload_prefix("@widget", "@acme_widget"));
        insta::assert_snapshot!(doc.render(), @r#"
        [autoload]

        Bus="*res://addons/@acme_widget/bus.gd"
        Audio="res://addons/@acme_widget/audio/mixer.gd"
        Other="*res://addons/@widget_extra/x.gd"
        Broken=res://addons/@widget/raw.gd

        [editor_plugins]

        enabled=PackedStringArray("res://addons/@widget/plugin.cfg")
        "#);

        // Second pass finds nothing left to rewrite
        assert!(!doc.replace_autoload_prefix("@widget", "@acme_widget"));
    }

    #[test]
    fn test_outside_autoload_untouched() {
        let text = "[application]\nrun/main_scene=\"res://addons/@widget/main.tscn\"\n";
        let mut doc = ProjectConfig::parse(text);
        assert!(!doc.replace_autoload_prefix("@widget", "@acme_widget"));
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn test_preserves_spacing_and_crlf() {
        let text = "[autoload]\r\nBus = \"res://addons/@w/bus.gd\" \r\n";
        let mut doc = ProjectConfig::parse(text);
        assert!(doc.replace_autoload_prefix("@w", "@a_w"));
        assert_eq!(doc.render(), "[autoload]\r\nBus = \"res://addons/@a_w/bus.gd\" \r\n");
    }
}
