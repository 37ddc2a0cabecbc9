//! # Scribe Client
//!
//! Keeps one open document in sync with the document service.
//!
//! ```text
//! UI input ──Command──┐
//! flush tick ─────────┼──> scheduler::run ──> DocumentSession ──> session channel
//! inbound frame ──────┘                          │
//!                                                └──> EditSession (scribe-editor)
//! ```
//!
//! Local edits are captured into the pending queue and sent as one
//! `update_document_content` message per tick. Inbound batches replay in
//! order through the remote applier.

mod auth;
mod channel;
mod config;
mod error;
mod messages;
mod scheduler;
mod session;

pub use auth::{AuthProvider, SessionContext, Tokens};
pub use channel::{
    Channel, ChannelEndpoint, ChannelLifecycle, Connection, Connector, LoopbackConnector,
    LoopbackPeer,
};
pub use config::{SessionConfig, DEFAULT_CONFIG_NAME};
pub use error::{AuthError, ChannelError, SessionError};
pub use messages::{
    Collaborator, CollaboratorBody, ContentBody, DocumentSnapshot, InboundMessage,
    OutboundMessage, TitleBody, UserId,
};
pub use scheduler::{run, spawn, Command, SchedulerHandle};
pub use session::{DocumentSession, FlushReport, SessionEvent};
