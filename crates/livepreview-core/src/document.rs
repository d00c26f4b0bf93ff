//! The merged configuration document and typed views into it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::frame::FrameError;

/// Key of the full-screen flag.
pub const KEY_ENABLE_FULL_SCREEN: &str = "enableFullScreen";
/// Key of the link-handling rule list.
pub const KEY_LINK_RULES: &str = "internalExternalLinks";
/// Key of the header configuration holding icon tabs.
pub const KEY_HEADER: &str = "w2nHeader";
/// Key of the live preview add-on configuration.
pub const KEY_LIVE_PREVIEW: &str = "LIVE_PREVIEW";

/// Baseline document used for a preview before any snapshot arrives.
pub const PREVIEW_BASELINE_JSON: &str = r#"{"websiteLink":"https://webtonative.com"}"#;

/// Keyed configuration mirroring the production config schema.
///
/// Only top-level keys are merged; nested values are replaced wholesale.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument(Map<String, Value>);

impl ConfigDocument {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// The built-in preview baseline (`websiteLink` only).
    pub fn preview_baseline() -> Self {
        Self::from_json_bytes(PREVIEW_BASELINE_JSON.as_bytes()).unwrap_or_default()
    }

    /// Parse a JSON object into a document.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| FrameError::Malformed(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(FrameError::NotAnObject),
        }
    }

    /// Top-level overwrite: every key in `patch` replaces the existing value.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Full-screen flag; absent means off.
    pub fn enable_full_screen(&self) -> bool {
        self.0
            .get(KEY_ENABLE_FULL_SCREEN)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Link-handling rules as a set; absent means empty.
    pub fn link_rules(&self) -> HashSet<LinkRule> {
        self.0
            .get(KEY_LINK_RULES)
            .and_then(LinkRule::set_from_value)
            .unwrap_or_default()
    }

    /// `LIVE_PREVIEW.data.enable` gate for the whole subsystem.
    pub fn live_preview_enabled(&self) -> bool {
        self.0
            .get(KEY_LIVE_PREVIEW)
            .and_then(|v| v.get("data"))
            .and_then(|v| v.get("enable"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl From<Map<String, Value>> for ConfigDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ─── Link rules ───────────────────────────────────────────────────

/// One link-handling rule, compared as a `(type, pattern, pageType)` triple.
///
/// Missing fields compare as empty strings so a rule read back from the
/// active config matches the same rule arriving on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRule {
    #[serde(rename = "type", default)]
    pub rule_type: String,
    #[serde(rename = "regex", default)]
    pub pattern: String,
    #[serde(default)]
    pub page_type: String,
}

impl LinkRule {
    pub fn new(
        rule_type: impl Into<String>,
        pattern: impl Into<String>,
        page_type: impl Into<String>,
    ) -> Self {
        Self {
            rule_type: rule_type.into(),
            pattern: pattern.into(),
            page_type: page_type.into(),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.rule_type.eq_ignore_ascii_case("custom")
    }

    /// Decode a JSON array of rule objects. Returns `None` when the value
    /// is not an array of objects.
    pub fn set_from_value(value: &Value) -> Option<HashSet<LinkRule>> {
        let items = value.as_array()?;
        let mut out = HashSet::with_capacity(items.len());
        for item in items {
            let obj = item.as_object()?;
            out.insert(LinkRule {
                rule_type: string_field(obj, "type"),
                pattern: string_field(obj, "regex"),
                page_type: string_field(obj, "pageType"),
            });
        }
        Some(out)
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
