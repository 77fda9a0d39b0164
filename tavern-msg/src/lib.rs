// Wire message types pushed by the server over the live connection.
//
// Frames are JSON objects of the shape `{"type": "...", "data": ...}`.
// Decoding is deliberately lenient on optional payload fields so that
// older or newer servers never take the client down over a field they
// encode differently.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum MsgError {
    #[error("Failed to decode frame, cause: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Payload-free discriminant of [`Message`], used as the dispatch key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Invalid,
    InsertPost,
    DeletePost,
    Redirect,
    SmilesUpdate,
    Unknown,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Message {
    Invalid(String),
    InsertPost(PostData),
    DeletePost(u64),
    Redirect(String),
    SmilesUpdate(SmilesUpdate),
    // Legacy and forward-compatible message types decode here and are
    // dropped by the dispatcher.
    #[serde(other)]
    Unknown,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Invalid(_) => MessageKind::Invalid,
            Message::InsertPost(_) => MessageKind::InsertPost,
            Message::DeletePost(_) => MessageKind::DeletePost,
            Message::Redirect(_) => MessageKind::Redirect,
            Message::SmilesUpdate(_) => MessageKind::SmilesUpdate,
            Message::Unknown => MessageKind::Unknown,
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PostData {
    pub id: u64,
    // op and board may be omitted by the server; the client stamps them
    // from page context on insertion.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub op: Option<u64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub board: Option<String>,
    #[serde(alias = "timestamp")]
    pub time: f64,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: String,
    /// Pairs of (linked post id, that post's thread id).
    #[serde(default)]
    pub links: Vec<(u64, u64)>,
    #[serde(default)]
    pub reacts: Vec<SmileReact>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmileReact {
    pub smile_name: String,
    pub count: u32,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SmilesUpdate {
    pub board: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub rename: bool,
    #[serde(default)]
    pub added: bool,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub smile: Option<Smile>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Smile {
    pub name: String,
}

pub fn decode_frame(bytes: &[u8]) -> Result<Message, MsgError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_insert_post() {
        let frame = r###"
        {
            "type": "insertPost",
            "data": {
                "id": 12,
                "op": 1,
                "board": "b",
                "time": 1683000000,
                "name": "rustacean",
                "body": "see >>11",
                "links": [[11, 1]],
                "reacts": [{"smileName": "heart", "count": 2}]
            }
        }
        "###;

        let msg = decode_frame(frame.as_bytes()).unwrap();
        assert_eq!(msg.kind(), MessageKind::InsertPost);
        match msg {
            Message::InsertPost(data) => {
                assert_eq!(data.id, 12);
                assert_eq!(data.op, Some(1));
                assert_eq!(data.board.as_deref(), Some("b"));
                assert_eq!(data.links, vec![(11, 1)]);
                assert_eq!(data.reacts[0].smile_name, "heart");
                assert_eq!(data.reacts[0].count, 2);
            }
            other => panic!("expected InsertPost, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_minimal_insert_post() {
        // op, board, name, links and reacts may all be omitted
        let frame = r###"{"type": "insertPost", "data": {"id": 3, "time": 0}}"###;

        match decode_frame(frame.as_bytes()).unwrap() {
            Message::InsertPost(data) => {
                assert_eq!(data.id, 3);
                assert_eq!(data.op, None);
                assert_eq!(data.board, None);
                assert!(data.body.is_empty());
                assert!(data.reacts.is_empty());
            }
            other => panic!("expected InsertPost, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_tolerates_malformed_optionals() {
        // op is garbage, name is a number: both fall back to None
        let frame = r###"
        {"type": "insertPost", "data": {"id": 4, "time": 0, "op": "not-a-number", "name": 42}}
        "###;

        match decode_frame(frame.as_bytes()).unwrap() {
            Message::InsertPost(data) => {
                assert_eq!(data.op, None);
                assert_eq!(data.name, None);
            }
            other => panic!("expected InsertPost, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_delete_post() {
        let frame = r###"{"type": "deletePost", "data": 55}"###;
        match decode_frame(frame.as_bytes()).unwrap() {
            Message::DeletePost(id) => assert_eq!(id, 55),
            other => panic!("expected DeletePost, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_type() {
        let frame = r###"{"type": "spliceText", "data": [1, 2, 3]}"###;
        let msg = decode_frame(frame.as_bytes()).unwrap();
        assert_eq!(msg.kind(), MessageKind::Unknown);
    }

    #[test]
    fn test_decode_smiles_update() {
        let frame = r###"
        {"type": "smilesUpdate", "data": {"board": "b", "added": true, "smile": {"name": "heart"}}}
        "###;
        match decode_frame(frame.as_bytes()).unwrap() {
            Message::SmilesUpdate(update) => {
                assert_eq!(update.board, "b");
                assert!(update.added);
                assert!(!update.deleted);
                assert_eq!(update.smile.unwrap().name, "heart");
            }
            other => panic!("expected SmilesUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_frame_is_an_error() {
        assert!(decode_frame(b"not json").is_err());
    }
}
