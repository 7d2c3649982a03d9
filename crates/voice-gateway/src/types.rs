use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Outgoing messages

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    Start(StartCall),
    Stop,
}

/// Assistant settings for a new call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCall {
    pub name: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_message: Option<String>,
    /// Values substituted into `{{name}}` placeholders by the provider.
    pub variable_values: BTreeMap<String, String>,
}

// Incoming messages

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    Partial,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    CallStart,
    CallEnd,
    #[serde(rename_all = "camelCase")]
    Transcript {
        role: Role,
        transcript_type: TranscriptType,
        transcript: String,
    },
    SpeechStart,
    SpeechEnd,
    Error {
        #[serde(default)]
        message: String,
    },
    /// Emitted locally when the socket closes.
    #[serde(skip)]
    Close { reason: Option<String> },
    /// Provider events this client does not use (function calls, status
    /// updates and so on).
    #[serde(other)]
    Unknown,
}
