//! Tagged messages exchanged with the UI core
//!
//! Both directions use `{tag, data}` objects. Inbound commands are parsed by
//! hand from a `serde_json::Value` so that unit tags tolerate an absent or
//! `null` payload; outbound events are plain serde derives.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request to build a player inside `element_id` showing `video_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    #[serde(rename = "playerID", alias = "targetElementId")]
    pub element_id: String,
    #[serde(rename = "youTubeID", alias = "videoId")]
    pub video_id: String,
}

impl LoadRequest {
    pub fn new(element_id: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            video_id: video_id.into(),
        }
    }
}

/// Commands issued by the UI core
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Build (or rebuild) the player
    LoadVideo(LoadRequest),
    Play,
    Pause,
    Stop,
    /// Jump to an absolute position in seconds
    Seek { seconds: f64 },
    /// Ask for the playback position; answered by a `PlayerCurrentTime` event
    QueryCurrentTime,
}

impl Command {
    /// Wire tag for this command
    pub fn tag(&self) -> &'static str {
        match self {
            Command::LoadVideo(_) => "LoadVideo",
            Command::Play => "PlayVideo",
            Command::Pause => "PauseVideo",
            Command::Stop => "StopVideo",
            Command::Seek { .. } => "SeekTo",
            Command::QueryCurrentTime => "GetPlayerCurrTime",
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: serde_json::Value) -> Result<Self> {
        let tag = value
            .get("tag")
            .and_then(|v| v.as_str())
            .ok_or(BridgeError::MissingTag)?
            .to_string();
        let data = value
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);

        let payload = |source| BridgeError::MalformedPayload {
            tag: tag.clone(),
            source,
        };

        let command = match tag.as_str() {
            "LoadVideo" => Command::LoadVideo(serde_json::from_value(data).map_err(payload)?),
            "PlayVideo" => Command::Play,
            "PauseVideo" => Command::Pause,
            "StopVideo" => Command::Stop,
            "SeekTo" => Command::Seek {
                seconds: serde_json::from_value(data).map_err(payload)?,
            },
            "GetPlayerCurrTime" => Command::QueryCurrentTime,
            _ => return Err(BridgeError::UnknownTag(tag.clone())),
        };
        Ok(command)
    }
}

/// Raw status code reported by the external player.
///
/// The bridge forwards it untouched; the named constants only exist for logs
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerStateCode(pub i32);

impl PlayerStateCode {
    pub const UNSTARTED: Self = Self(-1);
    pub const ENDED: Self = Self(0);
    pub const PLAYING: Self = Self(1);
    pub const PAUSED: Self = Self(2);
    pub const BUFFERING: Self = Self(3);
    pub const CUED_VIDEO: Self = Self(5);

    /// Human readable name for known codes
    pub fn known(self) -> Option<&'static str> {
        match self.0 {
            -1 => Some("unstarted"),
            0 => Some("ended"),
            1 => Some("playing"),
            2 => Some("paused"),
            3 => Some("buffering"),
            5 => Some("cued"),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerStateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Events sent back to the UI core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data")]
pub enum Event {
    /// `None` is the startup announcement sent before any player exists
    #[serde(rename = "JSPlayerStatus")]
    PlayerStatus(Option<PlayerStateCode>),
    #[serde(rename = "JSPlayerCurrTime")]
    PlayerCurrentTime(f64),
}

impl Event {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_load_video() {
        let cmd = Command::from_value(json!({
            "tag": "LoadVideo",
            "data": {"playerID": "player", "youTubeID": "abc123"}
        }))
        .unwrap();
        assert_eq!(cmd, Command::LoadVideo(LoadRequest::new("player", "abc123")));

        let cmd = Command::from_value(json!({
            "tag": "LoadVideo",
            "data": {"targetElementId": "p1", "videoId": "v1"}
        }))
        .unwrap();
        assert_eq!(cmd, Command::LoadVideo(LoadRequest::new("p1", "v1")));
    }

    #[test]
    fn test_parse_unit_tags_ignore_data() {
        assert_eq!(Command::from_json(r#"{"tag":"PlayVideo"}"#).unwrap(), Command::Play);
        assert_eq!(
            Command::from_json(r#"{"tag":"PauseVideo","data":null}"#).unwrap(),
            Command::Pause
        );
        assert_eq!(Command::from_json(r#"{"tag":"StopVideo"}"#).unwrap(), Command::Stop);
        assert_eq!(
            Command::from_json(r#"{"tag":"GetPlayerCurrTime"}"#).unwrap(),
            Command::QueryCurrentTime
        );
    }

    #[test]
    fn test_parse_seek_accepts_int_and_float() {
        assert_eq!(
            Command::from_json(r#"{"tag":"SeekTo","data":30}"#).unwrap(),
            Command::Seek { seconds: 30.0 }
        );
        assert_eq!(
            Command::from_json(r#"{"tag":"SeekTo","data":12.5}"#).unwrap(),
            Command::Seek { seconds: 12.5 }
        );
    }

    #[test]
    fn test_parse_errors() {
        match Command::from_json(r#"{"tag":"Rewind"}"#) {
            Err(BridgeError::UnknownTag(tag)) => assert_eq!(tag, "Rewind"),
            other => panic!("Unexpected result: {:?}", other),
        }
        match Command::from_json(r#"{"tag":"SeekTo","data":"soon"}"#) {
            Err(BridgeError::MalformedPayload { tag, .. }) => assert_eq!(tag, "SeekTo"),
            other => panic!("Unexpected result: {:?}", other),
        }
        match Command::from_json(r#"{"tag":"LoadVideo","data":{"playerID":"p"}}"#) {
            Err(BridgeError::MalformedPayload { tag, .. }) => assert_eq!(tag, "LoadVideo"),
            other => panic!("Unexpected result: {:?}", other),
        }
        assert!(matches!(
            Command::from_json(r#"{"data":1}"#),
            Err(BridgeError::MissingTag)
        ));
        assert!(matches!(
            Command::from_json(r#"{"tag":7}"#),
            Err(BridgeError::MissingTag)
        ));
        assert_eq!(BridgeError::MissingTag.to_string(), "command has no tag");
        assert!(matches!(Command::from_json("not json"), Err(BridgeError::Json(_))));
    }

    #[test]
    fn test_event_wire_format() {
        let status = Event::PlayerStatus(Some(PlayerStateCode::PLAYING));
        let parsed: serde_json::Value = serde_json::from_str(&status.to_json().unwrap()).unwrap();
        assert_eq!(parsed, json!({"tag": "JSPlayerStatus", "data": 1}));

        let time = Event::PlayerCurrentTime(42.5);
        let parsed: serde_json::Value = serde_json::from_str(&time.to_json().unwrap()).unwrap();
        assert_eq!(parsed, json!({"tag": "JSPlayerCurrTime", "data": 42.5}));
    }

    #[test]
    fn test_startup_status_is_null() {
        let startup = Event::PlayerStatus(None);
        assert_eq!(startup.to_json().unwrap(), r#"{"tag":"JSPlayerStatus","data":null}"#);

        let event: Event =
            serde_json::from_value(json!({"tag": "JSPlayerStatus", "data": null})).unwrap();
        assert_eq!(event, startup);
    }

    #[test]
    fn test_unknown_state_code_passes_through() {
        let event: Event =
            serde_json::from_value(json!({"tag": "JSPlayerStatus", "data": 42})).unwrap();
        assert_eq!(event, Event::PlayerStatus(Some(PlayerStateCode(42))));
        assert_eq!(PlayerStateCode(42).known(), None);
        assert_eq!(PlayerStateCode::CUED_VIDEO.to_string(), "5 (cued)");
    }
}
