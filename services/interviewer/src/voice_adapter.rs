use anyhow::{Context, Result};
use async_trait::async_trait;
use interview_core::transcript::{Finality, Speaker, TranscriptMessage};
use interview_core::voice::{CallConfig, Subscription, VoiceEvent, VoiceTransport};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast::error::RecvError;
use voice_gateway::types::{Role, ServerEvent, StartCall, TranscriptType};

/// The slice of the gateway client the adapter needs, so tests can stand in a mock.
#[async_trait]
pub trait GatewayClient: Send {
    fn server_events(&self) -> Result<voice_gateway::ServerRx>;
    async fn start_call(&mut self, call: StartCall) -> Result<()>;
    async fn stop_call(&mut self) -> Result<()>;
}

#[async_trait]
impl GatewayClient for voice_gateway::Client {
    fn server_events(&self) -> Result<voice_gateway::ServerRx> {
        voice_gateway::Client::server_events(self)
    }

    async fn start_call(&mut self, call: StartCall) -> Result<()> {
        voice_gateway::Client::start_call(self, call).await
    }

    async fn stop_call(&mut self) -> Result<()> {
        voice_gateway::Client::stop_call(self).await
    }
}

/// An adapter that implements the `VoiceTransport` trait over the voice gateway.
pub struct GatewayTransport<C: GatewayClient> {
    client: C,
}

impl GatewayTransport<voice_gateway::Client> {
    pub async fn connect(url: &str, api_key: &SecretString) -> Result<Self> {
        let config = voice_gateway::Config::builder()
            .with_url(url)
            .with_api_key(SecretString::from(api_key.expose_secret().to_owned()))
            .build();
        let client = voice_gateway::connect_with_config(256, config)
            .await
            .context("Failed to connect to the voice gateway")?;
        Ok(Self { client })
    }
}

impl<C: GatewayClient> GatewayTransport<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

fn to_voice_event(event: ServerEvent) -> Option<VoiceEvent> {
    match event {
        ServerEvent::CallStart => Some(VoiceEvent::CallStart),
        ServerEvent::CallEnd => Some(VoiceEvent::CallEnd),
        ServerEvent::Transcript {
            role,
            transcript_type,
            transcript,
        } => {
            let speaker = match role {
                Role::User => Speaker::User,
                Role::Assistant => Speaker::Assistant,
            };
            let finality = match transcript_type {
                TranscriptType::Partial => Finality::Partial,
                TranscriptType::Final => Finality::Final,
            };
            Some(VoiceEvent::Message(TranscriptMessage::new(
                speaker, transcript, finality,
            )))
        }
        ServerEvent::SpeechStart => Some(VoiceEvent::SpeechStart),
        ServerEvent::SpeechEnd => Some(VoiceEvent::SpeechEnd),
        ServerEvent::Error { message } => Some(VoiceEvent::Error(message)),
        // A dropped socket ends the call.
        ServerEvent::Close { reason } => {
            tracing::info!("Voice gateway closed: {:?}", reason);
            Some(VoiceEvent::CallEnd)
        }
        ServerEvent::Unknown => None,
    }
}

#[async_trait]
impl<C: GatewayClient> VoiceTransport for GatewayTransport<C> {
    async fn subscribe(&mut self) -> Result<Subscription> {
        let mut gateway_rx = self.client.server_events()?;
        let (tx, rx) = tokio::sync::mpsc::channel(128);

        let task = tokio::spawn(async move {
            loop {
                let event = match gateway_rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Voice event receiver lagged, {} events skipped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Some(voice_event) = to_voice_event(event) {
                    if tx.send(voice_event).await.is_err() {
                        tracing::debug!("Voice event receiver dropped, stopping adapter task.");
                        break;
                    }
                }
            }
        });

        Ok(Subscription::with_task(rx, task))
    }

    async fn start(&mut self, config: CallConfig) -> Result<()> {
        let call = StartCall {
            name: config.assistant_name,
            instructions: config.instructions,
            first_message: config.first_message,
            variable_values: config.variable_values,
        };
        self.client
            .start_call(call)
            .await
            .context("Adapter failed to start the call")
    }

    async fn stop(&mut self) -> Result<()> {
        self.client
            .stop_call()
            .await
            .context("Adapter failed to stop the call")
    }
}
