use crate::transcript::TranscriptMessage;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events any voice transport can emit back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    Message(TranscriptMessage),
    SpeechStart,
    SpeechEnd,
    Error(String),
}

/// What the transport needs to place a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConfig {
    pub assistant_name: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_message: Option<String>,
    pub variable_values: BTreeMap<String, String>,
}

impl CallConfig {
    pub fn with_variable(mut self, key: &str, value: impl Into<String>) -> Self {
        self.variable_values.insert(key.to_string(), value.into());
        self
    }
}

/// An owned registration for transport events.
///
/// The registration lasts exactly as long as this value: dropping it closes the
/// channel and aborts the task forwarding events into it.
pub struct Subscription {
    rx: mpsc::Receiver<VoiceEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<VoiceEvent>) -> Self {
        Self { rx, task: None }
    }

    pub fn with_task(rx: mpsc::Receiver<VoiceEvent>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    pub async fn recv(&mut self) -> Option<VoiceEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("voice subscription released");
        }
    }
}

/// A real-time voice call provider.
#[async_trait]
pub trait VoiceTransport: Send {
    /// Registers for call events. Only one live subscription is expected per call.
    async fn subscribe(&mut self) -> Result<Subscription>;

    async fn start(&mut self, config: CallConfig) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_dropping_subscription_aborts_forwarder() {
        let (tx, rx) = mpsc::channel(4);
        let (guard_tx, guard_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let _guard = guard_tx;
            loop {
                if tx.send(VoiceEvent::SpeechStart).await.is_err() {
                    // Keep running; only an abort should end this task.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        });

        let mut subscription = Subscription::with_task(rx, task);
        assert_eq!(subscription.recv().await, Some(VoiceEvent::SpeechStart));
        drop(subscription);

        let released = tokio::time::timeout(Duration::from_secs(1), guard_rx).await;
        assert!(released.is_ok(), "forwarding task should have been aborted");
    }

    #[test]
    fn test_call_config_serializes_variables() {
        let config = CallConfig {
            assistant_name: "Interviewer".to_string(),
            ..Default::default()
        }
        .with_variable("username", "Ada");

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["assistantName"], "Interviewer");
        assert_eq!(json["variableValues"]["username"], "Ada");
        assert!(json.get("firstMessage").is_none());
    }
}
