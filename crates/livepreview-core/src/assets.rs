//! Embedded header-icon resolution.
//!
//! Logo tabs under `w2nHeader.data[i].tabs[j].icon` may carry an image
//! identifier instead of inline data. The same patch ships the images in
//! `w2nHeader.images`, keyed by identifier.

use serde_json::{Map, Value};

use crate::document::{ConfigDocument, KEY_HEADER};

const LOGO_TAB_TYPE: &str = "logo";

/// Splice images referenced by logo-tab icons into `document`.
///
/// The `images` map is read from `patch`, tabs are addressed positionally in
/// `document` (after the patch has been merged). Returns the number of
/// `(header, tab)` slots that were resolved.
pub fn extract_embedded_assets(document: &mut ConfigDocument, patch: &Map<String, Value>) -> usize {
    let Some(images) = patch
        .get(KEY_HEADER)
        .and_then(|h| h.get("images"))
        .and_then(Value::as_object)
    else {
        return 0;
    };

    let Some(headers) = document
        .as_map_mut()
        .get_mut(KEY_HEADER)
        .and_then(|h| h.get_mut("data"))
        .and_then(Value::as_array_mut)
    else {
        return 0;
    };

    let mut resolved = 0;
    for (header_idx, header) in headers.iter_mut().enumerate() {
        let Some(tabs) = header.get_mut("tabs").and_then(Value::as_array_mut) else {
            continue;
        };
        for (tab_idx, tab) in tabs.iter_mut().enumerate() {
            if tab.get("type").and_then(Value::as_str) != Some(LOGO_TAB_TYPE) {
                continue;
            }
            let Some(image) = tab
                .get("icon")
                .and_then(Value::as_str)
                .and_then(|id| images.get(id))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let image = Value::String(image.to_string());
            if let Some(slot) = tab.as_object_mut() {
                slot.insert("icon".to_string(), image);
                resolved += 1;
                tracing::debug!(header_idx, tab_idx, "resolved embedded header icon");
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    fn header_patch() -> Map<String, Value> {
        obj(json!({
            "w2nHeader": {
                "data": [
                    {"tabs": [
                        {"type": "logo", "icon": "img-1"},
                        {"type": "icon", "icon": "img-1"},
                    ]},
                    {"tabs": [
                        {"type": "title", "label": "x"},
                        {"type": "logo", "icon": "img-2"},
                    ]},
                ],
                "images": {"img-1": "data:image/png;base64,AAA", "img-2": "https://cdn/x.png"}
            }
        }))
    }

    #[test]
    fn resolves_logo_tabs_positionally() {
        let patch = header_patch();
        let mut doc = ConfigDocument::default();
        doc.merge(&patch);

        assert_eq!(extract_embedded_assets(&mut doc, &patch), 2);

        let data = &doc.get("w2nHeader").expect("header")["data"];
        assert_eq!(data[0]["tabs"][0]["icon"], json!("data:image/png;base64,AAA"));
        // non-logo tab keeps its identifier
        assert_eq!(data[0]["tabs"][1]["icon"], json!("img-1"));
        assert_eq!(data[1]["tabs"][1]["icon"], json!("https://cdn/x.png"));
    }

    #[test]
    fn unknown_identifier_is_left_alone() {
        let patch = obj(json!({
            "w2nHeader": {
                "data": [{"tabs": [{"type": "logo", "icon": "missing"}]}],
                "images": {"other": "x"}
            }
        }));
        let mut doc = ConfigDocument::default();
        doc.merge(&patch);
        assert_eq!(extract_embedded_assets(&mut doc, &patch), 0);
        assert_eq!(
            doc.get("w2nHeader").expect("header")["data"][0]["tabs"][0]["icon"],
            json!("missing")
        );
    }

    #[test]
    fn no_images_map_is_noop() {
        let patch = obj(json!({"w2nHeader": {"data": [{"tabs": [{"type": "logo", "icon": "a"}]}]}}));
        let mut doc = ConfigDocument::default();
        doc.merge(&patch);
        let before = doc.clone();
        assert_eq!(extract_embedded_assets(&mut doc, &patch), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn reapplying_same_patch_is_stable() {
        let patch = header_patch();
        let mut doc = ConfigDocument::default();
        doc.merge(&patch);
        extract_embedded_assets(&mut doc, &patch);
        let once = doc.clone();

        doc.merge(&patch);
        extract_embedded_assets(&mut doc, &patch);
        assert_eq!(doc, once);
    }
}
