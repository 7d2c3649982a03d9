use crate::types::{ClientEvent, ServerEvent, StartCall};
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

pub(crate) mod config;
mod consts;
mod utils;

pub type ClientTx = tokio::sync::mpsc::Sender<ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<ServerEvent>;

/// A connection to the voice gateway. Outgoing events go through an mpsc
/// channel to a writer task; incoming events are broadcast to every receiver
/// obtained from [`Client::server_events`].
pub struct Client {
    capacity: usize,
    config: config::Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
}

impl Client {
    fn new(capacity: usize, config: config::Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let request = utils::build_request(&self.config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        tracing::info!("Connected to voice gateway at {}", self.config.url());

        let (mut write, mut read) = ws_stream.split();
        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<ClientEvent>(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx);
        self.s_tx = Some(s_tx.clone());

        // Writer: serializes client events onto the socket.
        tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("failed to close socket: {}", e);
            }
        });

        // Reader: decodes server messages and broadcasts them.
        // Every exit path ends with exactly one `Close` event.
        tokio::spawn(async move {
            let mut close_reason = None;
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        close_reason = Some(e.to_string());
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(ServerEvent::Unknown) => {
                            tracing::debug!("ignoring event: {}", text);
                        }
                        Ok(event) => {
                            tracing::debug!("received event: {:?}", event);
                            if let Err(e) = s_tx.send(event) {
                                tracing::debug!("no receivers for event: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("failed to deserialize event: {}, text=> {:?}", e, text);
                        }
                    },
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message ({} bytes)", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        close_reason = reason.map(|v| v.reason.to_string());
                        break;
                    }
                    _ => {}
                }
            }
            if let Err(e) = s_tx.send(ServerEvent::Close {
                reason: close_reason,
            }) {
                tracing::debug!("failed to send close event: {}", e);
            }
        });
        Ok(())
    }

    /// A new receiver for server events. Events sent before this call are not
    /// replayed.
    pub fn server_events(&self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    async fn send_client_event(&mut self, event: ClientEvent) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(event).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    pub async fn start_call(&mut self, call: StartCall) -> Result<()> {
        self.send_client_event(ClientEvent::Start(call)).await
    }

    pub async fn stop_call(&mut self) -> Result<()> {
        self.send_client_event(ClientEvent::Stop).await
    }
}

pub async fn connect_with_config(capacity: usize, config: config::Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

/// Connects using [`config::Config::new`], which reads the environment.
pub async fn connect() -> Result<Client> {
    connect_with_config(consts::DEFAULT_CAPACITY, config::Config::new()).await
}
