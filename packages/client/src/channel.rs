//! # Session Channel
//!
//! One bidirectional text channel per (document id, ticket). The transport is
//! pluggable through [`Connector`]; a [`LoopbackConnector`] wires the client
//! to an in-process peer over tokio mpsc channels.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::ChannelError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoint {
    pub server_url: String,
    pub document_id: String,
    pub ticket: String,
}

impl ChannelEndpoint {
    pub fn new(
        server_url: impl Into<String>,
        document_id: impl Into<String>,
        ticket: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            document_id: document_id.into(),
            ticket: ticket.into(),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}/ws/document/{}/?{}",
            self.server_url.trim_end_matches('/'),
            self.document_id,
            self.ticket
        )
    }
}

/// Both halves of an open transport
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

pub trait Connector: Send + Sync {
    fn connect(
        &self,
        endpoint: &ChannelEndpoint,
    ) -> impl Future<Output = Result<Connection, ChannelError>> + Send;
}

/// An open channel bound to one endpoint
pub struct Channel {
    endpoint: ChannelEndpoint,
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl Channel {
    pub fn endpoint(&self) -> &ChannelEndpoint {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub fn send(&self, frame: String) -> Result<(), ChannelError> {
        self.outbound.send(frame).map_err(|_| ChannelError::Closed)
    }
}

/// Keeps at most one channel open, reopening when the endpoint changes
pub struct ChannelLifecycle<C: Connector> {
    connector: C,
    current: Option<Channel>,
}

impl<C: Connector> ChannelLifecycle<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            current: None,
        }
    }

    /// Open a channel for `endpoint` unless one is already open for it
    pub async fn ensure(&mut self, endpoint: &ChannelEndpoint) -> Result<(), ChannelError> {
        if let Some(channel) = &self.current {
            if channel.endpoint() == endpoint && channel.is_open() {
                return Ok(());
            }
        }
        self.close();

        let connection = self.connector.connect(endpoint).await?;
        info!("[Channel] Opened {}", endpoint.url());
        self.current = Some(Channel {
            endpoint: endpoint.clone(),
            outbound: connection.outbound,
            inbound: connection.inbound,
        });
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(channel) = self.current.take() {
            info!("[Channel] Closed {}", channel.endpoint().url());
        }
    }

    /// The channel, if it is open
    pub fn channel(&self) -> Option<&Channel> {
        self.current.as_ref().filter(|c| c.is_open())
    }

    pub fn is_open(&self) -> bool {
        self.channel().is_some()
    }

    /// Next inbound frame. Pends forever while no channel is open and
    /// drops the channel once the peer hangs up.
    pub async fn recv(&mut self) -> Option<String> {
        let Some(channel) = self.current.as_mut() else {
            return std::future::pending().await;
        };

        match channel.inbound.recv().await {
            Some(frame) => Some(frame),
            None => {
                debug!("[Channel] Peer hung up on {}", channel.endpoint().url());
                self.current = None;
                None
            }
        }
    }
}

/// Server side of a loopback connection
pub struct LoopbackPeer {
    pub endpoint: ChannelEndpoint,
    pub from_client: mpsc::UnboundedReceiver<String>,
    pub to_client: mpsc::UnboundedSender<String>,
}

/// In-process transport. Each connect hands a [`LoopbackPeer`] to the
/// receiver returned by [`LoopbackConnector::new`].
#[derive(Clone)]
pub struct LoopbackConnector {
    peers: mpsc::UnboundedSender<LoopbackPeer>,
    available: Arc<AtomicBool>,
}

impl LoopbackConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoopbackPeer>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        let connector = Self {
            peers,
            available: Arc::new(AtomicBool::new(true)),
        };
        (connector, accepted)
    }

    /// Refuse (or accept again) subsequent connection attempts
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Connector for LoopbackConnector {
    async fn connect(&self, endpoint: &ChannelEndpoint) -> Result<Connection, ChannelError> {
        let refused = |reason: &str| ChannelError::Connect {
            url: endpoint.url(),
            reason: reason.to_string(),
        };

        if !self.available.load(Ordering::SeqCst) {
            return Err(refused("connection refused"));
        }

        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        self.peers
            .send(LoopbackPeer {
                endpoint: endpoint.clone(),
                from_client: server_rx,
                to_client: server_tx,
            })
            .map_err(|_| refused("no listener"))?;

        Ok(Connection {
            outbound: client_tx,
            inbound: client_rx,
        })
    }
}
