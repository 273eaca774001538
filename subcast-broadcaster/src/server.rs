use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::channel::BroadcastChannel;
use crate::error::{BroadcasterError, Result};

/// How long a closing viewer gets to accept the close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket listener that keeps a [`BroadcastChannel`]'s viewer set current
pub struct BroadcastServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    channel: BroadcastChannel,
}

impl BroadcastServer {
    /// Bind the listener
    ///
    /// Binding happens here rather than in [`BroadcastServer::run`] so that a
    /// port already in use is reported to the caller at startup.
    pub async fn bind(addr: &str, channel: BroadcastChannel) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BroadcasterError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Broadcast server started at ws://{}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            channel,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    /// Run the accept loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Accept viewers forever, one task per connection
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!("New viewer connection from {}", peer);
                    let channel = self.channel.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_viewer(stream, peer, channel).await {
                            tracing::warn!("Viewer {} closed with error: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept viewer: {}", e);
                }
            }
        }
    }
}

/// Drive one viewer connection until it closes
///
/// Once the handshake completes the registration guard lives until the end of
/// this function, so the viewer leaves the channel on every exit path,
/// errors and panics included. Writes are raced against the viewer's
/// eviction request, so a peer that stops reading cannot pin its task.
async fn serve_viewer(
    stream: TcpStream,
    peer: SocketAddr,
    channel: BroadcastChannel,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (registration, mut inbox) = channel.register();
    let id = registration.id();
    tracing::info!("Viewer {} connected from {}", id, peer);

    let (mut outgoing, mut incoming) = ws.split();

    let outcome: Result<()> = loop {
        tokio::select! {
            payload = inbox.recv() => match payload {
                Some(payload) => {
                    // A viewer that stopped reading blocks this write forever
                    tokio::select! {
                        sent = outgoing.send(Message::Text(payload.to_string())) => {
                            if let Err(e) = sent {
                                break Err(e.into());
                            }
                        }
                        _ = inbox.evicted() => {
                            tracing::warn!("Dropping viewer {} after it fell behind", id);
                            break Ok(());
                        }
                    }
                }
                None if inbox.is_evicted() => {
                    tracing::warn!("Dropping viewer {} after it fell behind", id);
                    break Ok(());
                }
                None => {
                    let close = outgoing.send(Message::Close(None));
                    if tokio::time::timeout(CLOSE_TIMEOUT, close).await.is_err() {
                        tracing::debug!("Viewer {} did not take the close frame", id);
                    }
                    break Ok(());
                }
            },
            frame = incoming.next() => match frame {
                None | Some(Ok(Message::Close(_))) => break Ok(()),
                // Viewers have nothing to say; reading only detects close
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
        }
    };

    tracing::info!("Viewer {} disconnected", id);
    drop(registration);
    outcome
}
