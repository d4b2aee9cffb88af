//! Websocket transport speaking Socket.IO to the dice server.
//!
//! [`connect`] spawns one task that owns the socket. The app loop publishes
//! [`ClientEvent`]s through an unbounded sender and receives
//! [`TransportEvent`]s from a bounded channel.
use crate::{
    Error,
    Result,
    protocol::{
        ClientEvent,
        ServerEvent,
    },
    socketio::Frame,
};
use futures::{
    SinkExt,
    StreamExt,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::Message,
};
use tracing::{
    debug,
    error,
    info,
    trace,
    warn,
};
use url::Url;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Publish side of the realtime channel.
pub trait Publisher {
    fn publish(&self, event: ClientEvent) -> Result<()>;
}

impl Publisher for mpsc::UnboundedSender<ClientEvent> {
    fn publish(&self, event: ClientEvent) -> Result<()> {
        self.send(event).map_err(|_| Error::ConnectionClosed)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The default namespace accepted the connection.
    Connected,
    Server(ServerEvent),
    Disconnected(Option<String>),
}

pub struct Connection {
    publisher: mpsc::UnboundedSender<ClientEvent>,
    events: mpsc::Receiver<TransportEvent>,
    handle: JoinHandle<()>,
}

impl Connection {
    pub fn publisher(&self) -> mpsc::UnboundedSender<ClientEvent> {
        self.publisher.clone()
    }

    /// Next transport event; `None` once the socket task has exited.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Treats the server URL as a directory so relative joins keep any path prefix.
pub fn base_url(server: &Url) -> Url {
    let mut base = server.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

/// Builds the Engine.IO websocket endpoint for an `http(s)` server URL.
pub fn socket_url(server: &Url) -> Result<Url> {
    let scheme = match server.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(Error::InvalidScheme(other.to_string())),
    };
    let mut url = base_url(server).join("socket.io/")?;
    url.set_scheme(scheme)
        .map_err(|_| Error::InvalidScheme(scheme.to_string()))?;
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

pub async fn connect(server: &Url) -> Result<Connection> {
    let url = socket_url(server)?;
    info!(%url, "connecting to dice server");
    let (ws, _response) = connect_async(url.as_str()).await?;
    let (publisher, outbound) = mpsc::unbounded_channel();
    let (events_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let handle = tokio::spawn(async move {
        let reason = match run_socket(ws, outbound, &events_tx).await {
            Ok(()) => None,
            Err(err) => {
                error!(error = %err, "realtime connection failed");
                Some(err.to_string())
            }
        };
        let _ = events_tx.send(TransportEvent::Disconnected(reason)).await;
    });
    Ok(Connection {
        publisher,
        events,
        handle,
    })
}

async fn run_socket<S>(
    ws: S,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    events: &mpsc::Sender<TransportEvent>,
) -> Result<()>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    let mut connected = false;
    loop {
        tokio::select! {
            msg = stream.next() => {
                let Some(msg) = msg else {
                    return Ok(());
                };
                let text = match msg? {
                    Message::Text(text) => text,
                    Message::Close(_) => {
                        debug!("websocket closed by server");
                        return Ok(());
                    }
                    _ => continue,
                };
                trace!(frame = %text.as_str(), "received frame");
                let frame = match Frame::decode(text.as_str()) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(error = %err, "dropping undecodable frame");
                        continue;
                    }
                };
                match frame {
                    Frame::Open(info) => {
                        debug!(sid = %info.sid, ping_interval = info.ping_interval, "engine.io open");
                        sink.send(Message::text(Frame::Connect(None).encode())).await?;
                    }
                    Frame::Ping => sink.send(Message::text(Frame::Pong.encode())).await?,
                    Frame::Connect(_) => {
                        connected = true;
                        info!("socket.io namespace connected");
                        if events.send(TransportEvent::Connected).await.is_err() {
                            return Ok(());
                        }
                    }
                    Frame::ConnectError(data) => return Err(Error::ConnectRefused(data.to_string())),
                    Frame::Close | Frame::Disconnect => return Ok(()),
                    Frame::Event { name, data } => match ServerEvent::decode(&name, data) {
                        Ok(event) => {
                            if events.send(TransportEvent::Server(event)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Err(err) => warn!(event = %name, error = %err, "dropping undecodable event"),
                    },
                    Frame::Pong | Frame::Noop | Frame::Ack => {}
                }
            }
            event = outbound.recv(), if connected => {
                let Some(event) = event else {
                    sink.send(Message::text(Frame::Disconnect.encode())).await?;
                    return Ok(());
                };
                let frame = Frame::event(event.name(), event.payload());
                debug!(event = event.name(), "publishing event");
                sink.send(Message::text(frame.encode())).await?;
            }
        }
    }
}
