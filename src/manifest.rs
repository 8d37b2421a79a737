//! # Project Manifest Merging
//!
//! The project manifest (`package.json`) is the one file merged structurally
//! instead of overridden when several layers ship it. The merge is
//! deliberately asymmetric:
//!
//! - Inside the three designated sections - `dependencies`,
//!   `devDependencies`, `scripts` - keys merge key-wise and the **incoming**
//!   layer wins on same-named keys. A later layer upgrading a dependency or
//!   redefining a script must take effect.
//! - For every other top-level key the **existing** value wins; incoming
//!   keys are adopted only when the existing manifest does not define them.
//!   The base layer's `name`, `version`, and metadata stay put no matter
//!   how many layers come after it.
//!
//! This asymmetry is a contract, not an accident; tests pin the exact
//! behavior.

use serde_json::{Map, Value};

/// Top-level manifest sections merged key-wise with incoming-wins
/// precedence.
pub const MERGED_SECTIONS: &[&str] = &["dependencies", "devDependencies", "scripts"];

/// Merge an incoming layer's manifest into the existing one, returning the
/// combined manifest.
///
/// Non-object inputs are treated as empty manifests: a missing target file
/// reads as `{}`, and nothing else is a valid manifest shape for this
/// merge.
pub fn merge_manifest(existing: &Value, incoming: &Value) -> Value {
    let existing_map = as_object(existing);
    let incoming_map = as_object(incoming);

    let mut result = existing_map.clone();

    for section in MERGED_SECTIONS {
        let merged = merge_section(existing_map.get(*section), incoming_map.get(*section));
        if let Some(value) = merged {
            result.insert((*section).to_string(), value);
        }
    }

    for (key, value) in incoming_map {
        if MERGED_SECTIONS.contains(&key.as_str()) {
            continue;
        }
        result.entry(key.clone()).or_insert_with(|| value.clone());
    }

    Value::Object(result)
}

fn as_object(value: &Value) -> &Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    value
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

/// Key-wise union of one designated section, incoming winning on same-named
/// keys. Returns `None` when neither side has the section.
fn merge_section(existing: Option<&Value>, incoming: Option<&Value>) -> Option<Value> {
    match (existing, incoming) {
        (None, None) => None,
        (Some(e), None) => Some(e.clone()),
        (None, Some(i)) => Some(i.clone()),
        (Some(e), Some(i)) => match (e.as_object(), i.as_object()) {
            (Some(e_map), Some(i_map)) => {
                let mut merged = e_map.clone();
                for (key, value) in i_map {
                    merged.insert(key.clone(), value.clone());
                }
                Some(Value::Object(merged))
            }
            // incoming wins inside designated sections, shape included
            _ => Some(i.clone()),
        },
    }
}
