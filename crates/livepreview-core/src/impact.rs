//! Patch impact classification.
//!
//! - Any **reload key** present forces [`ImpactDecision::Reload`].
//! - **Refresh keys** contribute individually:
//!   - `enableFullScreen`: Refresh when the new value differs from the
//!     currently *active* value.
//!   - `internalExternalLinks`: compare rule sets. Equal sets contribute
//!     nothing. A symmetric difference made only of `custom` rules is a
//!     Refresh. Any other change is a Reload.
//! - The batch result is the maximum contribution.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::document::{ConfigDocument, KEY_ENABLE_FULL_SCREEN, KEY_LINK_RULES, LinkRule};
use crate::types::ImpactDecision;

/// Keys whose change requires reinitializing the hosted content.
pub const RELOAD_KEYS: [&str; 4] = [
    "customUserAgent",
    "globalCssString",
    "globalJsString",
    "DISABLE_SCREENSHOT",
];

/// Keys that may require a lighter re-render.
pub const REFRESH_KEYS: [&str; 2] = [KEY_ENABLE_FULL_SCREEN, KEY_LINK_RULES];

/// Classify the UI impact of `patch` against the currently rendered config.
pub fn classify_impact(patch: &Map<String, Value>, active: &ConfigDocument) -> ImpactDecision {
    if patch.keys().any(|k| RELOAD_KEYS.contains(&k.as_str())) {
        return ImpactDecision::Reload;
    }

    patch
        .iter()
        .map(|(key, value)| match key.as_str() {
            KEY_ENABLE_FULL_SCREEN => full_screen_impact(value, active),
            KEY_LINK_RULES => link_rules_impact(value, active),
            _ => ImpactDecision::None,
        })
        .max()
        .unwrap_or_default()
}

fn full_screen_impact(value: &Value, active: &ConfigDocument) -> ImpactDecision {
    match value.as_bool() {
        Some(next) if next != active.enable_full_screen() => ImpactDecision::Refresh,
        _ => ImpactDecision::None,
    }
}

fn link_rules_impact(value: &Value, active: &ConfigDocument) -> ImpactDecision {
    let Some(next) = LinkRule::set_from_value(value) else {
        tracing::debug!("ignoring {KEY_LINK_RULES}: not an array of rule objects");
        return ImpactDecision::None;
    };
    compare_link_rules(&active.link_rules(), &next)
}

/// Decide the contribution of a link-rule set change.
pub fn compare_link_rules(previous: &HashSet<LinkRule>, next: &HashSet<LinkRule>) -> ImpactDecision {
    if previous == next {
        return ImpactDecision::None;
    }
    let only_custom = previous
        .symmetric_difference(next)
        .all(LinkRule::is_custom);
    if only_custom {
        ImpactDecision::Refresh
    } else {
        ImpactDecision::Reload
    }
}
