use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::decoder::EventDecoder;
use crate::error::WatchError;
use crate::reporter::Reporter;
use crate::types::{Acknowledgement, StreamKind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Frame = Option<Result<Message, tungstenite::Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
    Subscribed,
    Streaming,
    Closing,
    Closed,
    Failed,
}

/// One subscription over one WebSocket connection. Not restartable: once
/// `Closed` or `Failed`, build a new session.
pub struct StreamSession {
    config: StreamConfig,
    decoder: EventDecoder,
    ws_stream: Option<WsStream>,
    state: SessionState,
}

impl StreamSession {
    pub fn new(config: StreamConfig) -> Self {
        let decoder = EventDecoder::new(config.kind);
        Self {
            config,
            decoder,
            ws_stream: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn kind(&self) -> StreamKind {
        self.config.kind
    }

    /// Connect, subscribe, report the acknowledgement once, then stream
    /// until `cancel` fires or something fails. `cancel` is honoured at
    /// every step that waits on the node.
    pub async fn run<R: Reporter>(
        &mut self,
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> Result<(), WatchError> {
        if !self.connect(cancel).await? {
            return Ok(());
        }
        self.subscribe().await?;
        let Some(ack) = self.receive_ack(cancel).await? else {
            return Ok(());
        };
        reporter.acknowledged(&ack);
        self.stream(reporter, cancel).await
    }

    /// Open the socket. Returns `false` if `cancel` fired before the
    /// handshake finished, leaving the session `Closed`.
    pub async fn connect(&mut self, cancel: &CancellationToken) -> Result<bool, WatchError> {
        info!("Connecting to {}", self.config.endpoint);
        let dialed = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = connect_async(self.config.endpoint.as_str()) => Some(result),
        };

        let Some(result) = dialed else {
            info!("Interrupt received while connecting to {}", self.config.endpoint);
            self.state = SessionState::Closed;
            return Ok(false);
        };

        let result = result.map_err(|source| WatchError::Connect {
            endpoint: self.config.endpoint.clone(),
            source,
        });
        let (ws_stream, _) = self.settle(result)?;

        info!("Connected to WebSocket: {}", self.config.endpoint);
        self.ws_stream = Some(ws_stream);
        self.state = SessionState::Connected;
        Ok(true)
    }

    /// Send the subscribe directive. Called exactly once per session.
    pub async fn subscribe(&mut self) -> Result<(), WatchError> {
        let result = self.send_directive().await;
        self.settle(result)?;

        info!("Subscribed to {} stream", self.config.kind);
        self.state = SessionState::Subscribed;
        Ok(())
    }

    /// Wait for the acknowledgement. `None` means `cancel` fired first and
    /// the connection has been closed.
    pub async fn receive_ack(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Acknowledgement>, WatchError> {
        let result = self.read_ack(cancel).await;
        self.settle(result)
    }

    /// Decode and report frames in arrival order until cancelled.
    pub async fn stream<R: Reporter>(
        &mut self,
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> Result<(), WatchError> {
        self.state = SessionState::Streaming;
        let result = self.stream_frames(reporter, cancel).await;
        self.settle(result)
    }

    async fn send_directive(&mut self) -> Result<(), WatchError> {
        let json = serde_json::to_string(&self.config.directive).map_err(|source| {
            WatchError::Encode {
                what: "subscribe directive",
                source,
            }
        })?;

        self.connection()?
            .send(Message::Text(json))
            .await
            .map_err(|source| WatchError::Write {
                what: "subscribe directive",
                source,
            })
    }

    async fn read_ack(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Acknowledgement>, WatchError> {
        loop {
            let Some(frame) = self.next_frame(cancel).await? else {
                info!(
                    "Interrupt received while awaiting {} acknowledgement",
                    self.config.kind
                );
                self.close().await;
                return Ok(None);
            };

            if let Some(payload) = self.handle_frame(frame).await? {
                return self.decoder.decode_ack(&payload).map(Some);
            }
        }
    }

    async fn stream_frames<R: Reporter>(
        &mut self,
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> Result<(), WatchError> {
        loop {
            let Some(frame) = self.next_frame(cancel).await? else {
                info!("Interrupt received, closing {} stream", self.config.kind);
                self.close().await;
                return Ok(());
            };

            let Some(payload) = self.handle_frame(frame).await? else {
                continue;
            };

            debug!("Received {} byte frame", payload.len());
            let event = self.decoder.decode_event(&payload)?;
            reporter.event(&event);
        }
    }

    /// The next frame off the socket, or `None` once `cancel` fires.
    /// Cancellation wins when both are ready.
    async fn next_frame(&mut self, cancel: &CancellationToken) -> Result<Option<Frame>, WatchError> {
        let ws = self.connection()?;
        Ok(tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            frame = ws.next() => Some(frame),
        })
    }

    /// Returns the JSON payload of a data frame, or `None` for control
    /// frames that were handled here.
    async fn handle_frame(&mut self, frame: Frame) -> Result<Option<Vec<u8>>, WatchError> {
        match frame {
            Some(Ok(Message::Text(text))) => Ok(Some(text.into_bytes())),
            Some(Ok(Message::Binary(data))) => Ok(Some(data)),
            Some(Ok(Message::Ping(data))) => {
                self.connection()?
                    .send(Message::Pong(data))
                    .await
                    .map_err(|source| WatchError::Write { what: "pong", source })?;
                Ok(None)
            }
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "no reason".to_string());
                Err(WatchError::TransportRead(format!(
                    "connection closed by server ({})",
                    reason.trim()
                )))
            }
            Some(Ok(_)) => Ok(None),
            Some(Err(e)) => Err(WatchError::TransportRead(e.to_string())),
            None => Err(WatchError::TransportRead("connection closed".to_string())),
        }
    }

    /// Best-effort close handshake. A failed close write is only logged.
    async fn close(&mut self) {
        self.state = SessionState::Closing;
        if let Some(ws) = self.ws_stream.as_mut() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: Cow::Borrowed(""),
            };
            if let Err(e) = ws.send(Message::Close(Some(frame))).await {
                warn!("Failed to send close frame: {}", e);
            }
        }
        self.ws_stream = None;
        self.state = SessionState::Closed;
    }

    fn connection(&mut self) -> Result<&mut WsStream, WatchError> {
        self.ws_stream
            .as_mut()
            .ok_or_else(|| WatchError::TransportRead("not connected".to_string()))
    }

    fn settle<T>(&mut self, result: Result<T, WatchError>) -> Result<T, WatchError> {
        if let Err(e) = &result {
            error!("{} stream session failed: {}", self.config.kind, e);
            self.state = SessionState::Failed;
            self.ws_stream = None;
        }
        result
    }
}
