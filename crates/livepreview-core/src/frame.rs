//! Inbound realtime frame decoding.
//!
//! Frames are decoded into a closed set of variants at the boundary so the
//! store matches exhaustively instead of comparing `type`/`os` strings.
//!
//! ```json
//! {"type":"ACTIVE_USERS","browserConnectionIds":["a","b"]}
//! {"type":"CHANGE_IN_DATA","os":"ios","data":{"enableFullScreen":true}}
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::Platform;

/// Screen name that also carries a loader animation change.
pub const LOADING_SCREEN: &str = "loadingScreen";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed json: {0}")]
    Malformed(String),

    #[error("frame is not a json object")]
    NotAnObject,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Roster of connected peers, no content.
    Presence { peers: Vec<String> },
    /// Content patch tagged with its origin platform.
    Content(ContentFrame),
    /// Valid JSON object of no known shape.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentFrame {
    /// `None` when the frame carries no `os` tag.
    pub origin: Option<Platform>,
    pub patch: Map<String, Value>,
    pub navigate: Option<NavigateDirective>,
}

/// Optional "go to screen" instruction riding on a content frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateDirective {
    pub screen: String,
    pub closed_current_screen: bool,
}

impl NavigateDirective {
    pub fn is_loading_screen(&self) -> bool {
        self.screen == LOADING_SCREEN
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawFrame {
    #[serde(rename = "ACTIVE_USERS")]
    ActiveUsers {
        #[serde(rename = "browserConnectionIds")]
        browser_connection_ids: Vec<String>,
    },
    #[serde(rename = "CHANGE_IN_DATA")]
    ChangeInData {
        #[serde(default)]
        os: Option<Platform>,
        data: Map<String, Value>,
        #[serde(rename = "livePreviewNavigateScreen", default)]
        navigate_screen: Option<String>,
        #[serde(rename = "closedCurrentScreen", default)]
        closed_current_screen: Option<bool>,
    },
    #[serde(other)]
    Other,
}

/// Decode raw frame bytes.
///
/// Errors only when the bytes are not a JSON object. A well-formed object
/// that matches no known frame shape decodes to [`InboundFrame::Unrecognized`].
pub fn decode(bytes: &[u8]) -> Result<InboundFrame, FrameError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| FrameError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(FrameError::NotAnObject);
    }

    let raw = match serde_json::from_value::<RawFrame>(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("frame matches no known shape: {e}");
            return Ok(InboundFrame::Unrecognized);
        }
    };

    Ok(match raw {
        RawFrame::ActiveUsers {
            browser_connection_ids,
        } => InboundFrame::Presence {
            peers: browser_connection_ids,
        },
        RawFrame::ChangeInData {
            os,
            data,
            navigate_screen,
            closed_current_screen,
        } => InboundFrame::Content(ContentFrame {
            origin: os,
            patch: data,
            navigate: navigate_screen.map(|screen| NavigateDirective {
                screen,
                closed_current_screen: closed_current_screen.unwrap_or(false),
            }),
        }),
        RawFrame::Other => InboundFrame::Unrecognized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_presence() {
        let frame = decode(br#"{"type":"ACTIVE_USERS","browserConnectionIds":["a","b"]}"#)
            .expect("decodes");
        assert_eq!(
            frame,
            InboundFrame::Presence {
                peers: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn decodes_empty_presence() {
        let frame = decode(br#"{"type":"ACTIVE_USERS","browserConnectionIds":[]}"#).expect("ok");
        assert_eq!(frame, InboundFrame::Presence { peers: vec![] });
    }

    #[test]
    fn presence_without_roster_is_unrecognized() {
        assert_eq!(
            decode(br#"{"type":"ACTIVE_USERS"}"#).expect("ok"),
            InboundFrame::Unrecognized
        );
        assert_eq!(
            decode(br#"{"type":"ACTIVE_USERS","browserConnectionIds":null}"#).expect("ok"),
            InboundFrame::Unrecognized
        );
    }

    #[test]
    fn decodes_content_with_navigation() {
        let frame = decode(
            br#"{"type":"CHANGE_IN_DATA","os":"ios","data":{"enableFullScreen":true},
                 "livePreviewNavigateScreen":"loadingScreen","closedCurrentScreen":true}"#,
        )
        .expect("decodes");
        let InboundFrame::Content(content) = frame else {
            panic!("expected content frame");
        };
        assert_eq!(content.origin, Some(Platform::Ios));
        assert_eq!(content.patch.get("enableFullScreen"), Some(&json!(true)));
        let nav = content.navigate.expect("navigation directive");
        assert!(nav.is_loading_screen());
        assert!(nav.closed_current_screen);
    }

    #[test]
    fn content_closed_screen_defaults_false() {
        let frame = decode(
            br#"{"type":"CHANGE_IN_DATA","os":"android","data":{},"livePreviewNavigateScreen":"home"}"#,
        )
        .expect("decodes");
        let InboundFrame::Content(content) = frame else {
            panic!("expected content frame");
        };
        assert_eq!(content.origin, Some(Platform::Android));
        assert_eq!(
            content.navigate,
            Some(NavigateDirective {
                screen: "home".into(),
                closed_current_screen: false
            })
        );
    }

    #[test]
    fn unknown_os_tag_is_unknown_platform() {
        let frame =
            decode(br#"{"type":"CHANGE_IN_DATA","os":"web","data":{}}"#).expect("decodes");
        let InboundFrame::Content(content) = frame else {
            panic!("expected content frame");
        };
        assert_eq!(content.origin, Some(Platform::Unknown));
    }

    #[test]
    fn unknown_type_is_unrecognized() {
        assert_eq!(
            decode(br#"{"type":"HEARTBEAT"}"#).expect("ok"),
            InboundFrame::Unrecognized
        );
        assert_eq!(
            decode(br#"{"hello":"world"}"#).expect("ok"),
            InboundFrame::Unrecognized
        );
        // data must be an object
        assert_eq!(
            decode(br#"{"type":"CHANGE_IN_DATA","os":"ios","data":[1]}"#).expect("ok"),
            InboundFrame::Unrecognized
        );
    }

    #[test]
    fn malformed_and_non_object_are_errors() {
        assert!(matches!(decode(b"not json"), Err(FrameError::Malformed(_))));
        assert_eq!(decode(b"42"), Err(FrameError::NotAnObject));
    }
}
