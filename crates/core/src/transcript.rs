use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("user"),
            Speaker::Assistant => f.write_str("assistant"),
        }
    }
}

/// Whether a streamed speech-to-text fragment can still be revised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Partial,
    Final,
}

/// A message event as it arrives from the voice transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub speaker: Speaker,
    pub text: String,
    pub finality: Finality,
}

impl TranscriptMessage {
    pub fn new(speaker: Speaker, text: impl Into<String>, finality: Finality) -> Self {
        Self {
            speaker,
            text: text.into(),
            finality,
        }
    }
}

/// One attributed line of the interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(rename = "role")]
    speaker: Speaker,
    #[serde(rename = "content")]
    text: String,
}

impl Utterance {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only record of what was said during one call.
///
/// Assistant messages are kept as they arrive because the voice assistant never
/// revises its output. User messages are kept only once the transcriber marks
/// them final, which keeps incremental fragments out of the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    utterances: Vec<Utterance>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the message was appended.
    pub fn accept(&mut self, message: TranscriptMessage) -> bool {
        let keep = match message.speaker {
            Speaker::Assistant => true,
            Speaker::User => message.finality == Finality::Final,
        };
        if keep {
            self.utterances
                .push(Utterance::new(message.speaker, message.text));
        }
        keep
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Text of the most recent utterance, shown as the live caption.
    pub fn last_text(&self) -> Option<&str> {
        self.utterances.last().map(Utterance::text)
    }

    /// Renders the transcript as the bullet list the evaluation prompt expects.
    pub fn format_for_evaluation(&self) -> String {
        self.utterances
            .iter()
            .map(|u| format!("- {}: {}\n", u.speaker, u.text))
            .collect()
    }
}

impl From<Vec<Utterance>> for Transcript {
    fn from(utterances: Vec<Utterance>) -> Self {
        Self { utterances }
    }
}
