//! Conversation messages.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry of a conversation.
///
/// Fields other than `content`, `sensitive` and `encrypted` (a `role`, a
/// timestamp, ...) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message text, replaced by ciphertext once encrypted
    pub content: String,
    /// Whether the caller marked this message for encryption
    #[serde(default, deserialize_with = "only_true")]
    pub sensitive: bool,
    /// Set by the encryption policy after the content was replaced
    #[serde(default, deserialize_with = "only_true")]
    pub encrypted: bool,
    /// Any other fields supplied by the caller
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Create a message with no extra fields
    pub fn new(content: impl Into<String>, sensitive: bool) -> Self {
        Self {
            content: content.into(),
            sensitive,
            encrypted: false,
            extra: Map::new(),
        }
    }
}

/// A flag is set only by a literal JSON `true`; `null`, strings, numbers and
/// anything else read as unset
fn only_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}
