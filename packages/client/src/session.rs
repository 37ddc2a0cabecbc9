//! # Document Session
//!
//! Glue between one open document's [`EditSession`], its session channel and
//! the auth context: loading and switching documents, flushing pending
//! operations and title changes, and dispatching inbound frames.

use chrono::Utc;
use scribe_editor::{Document, EditEvent, EditOutcome, EditSession, EditorError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, SessionContext};
use crate::channel::{ChannelEndpoint, ChannelLifecycle, Connector};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::messages::{Collaborator, DocumentSnapshot, InboundMessage, OutboundMessage, UserId};

const EVENT_BUFFER: usize = 64;

/// Notifications for the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The document changed and should be re-rendered
    ContentChanged { version: u64 },
    TitleChanged(String),
    CollaboratorAdded(Collaborator),
    Flushed(FlushReport),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub operations: usize,
    pub title_sent: bool,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.operations == 0 && !self.title_sent
    }
}

struct OpenDocument {
    id: String,
    endpoint: ChannelEndpoint,
    editor: EditSession,
    title: String,
    last_sent_title: String,
    collaborators: Vec<Collaborator>,
}

pub struct DocumentSession<C: Connector, A: AuthProvider> {
    config: SessionConfig,
    context: SessionContext,
    auth: A,
    channel: ChannelLifecycle<C>,
    open: Option<OpenDocument>,
    events: broadcast::Sender<SessionEvent>,
}

impl<C: Connector, A: AuthProvider> DocumentSession<C, A> {
    pub fn new(config: SessionConfig, context: SessionContext, connector: C, auth: A) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            context,
            auth,
            channel: ChannelLifecycle::new(connector),
            open: None,
            events,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn document_id(&self) -> Option<&str> {
        self.open.as_ref().map(|d| d.id.as_str())
    }

    pub fn editor(&self) -> Option<&EditSession> {
        self.open.as_ref().map(|d| &d.editor)
    }

    pub fn title(&self) -> Option<&str> {
        self.open.as_ref().map(|d| d.title.as_str())
    }

    pub fn collaborators(&self) -> &[Collaborator] {
        self.open
            .as_ref()
            .map(|d| d.collaborators.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_open()
    }

    /// Open `document_id` from its snapshot. Pending work of a previously
    /// open document is flushed before its channel is closed.
    pub async fn load(
        &mut self,
        document_id: &str,
        ticket: &str,
        snapshot: DocumentSnapshot,
    ) -> Result<(), SessionError> {
        let document = Document::try_from(snapshot.editor_content)
            .map_err(|e| SessionError::Editor(EditorError::Model(e)))?;

        if self.open.is_some() {
            self.leave_current().await?;
        }

        let permission = snapshot.permission;
        info!(
            "[Session] Opening {} as {} ({} blocks)",
            document_id,
            permission.label(),
            document.blocks().len()
        );
        let endpoint = ChannelEndpoint::new(&self.config.server_url, document_id, ticket);
        self.context.permission = permission;
        self.open = Some(OpenDocument {
            id: document_id.to_string(),
            endpoint: endpoint.clone(),
            editor: EditSession::new(document, permission),
            title: snapshot.title.clone(),
            last_sent_title: snapshot.title,
            collaborators: snapshot.collaborators,
        });

        if let Err(e) = self.channel.ensure(&endpoint).await {
            warn!("[Session] {}", e);
        }
        Ok(())
    }

    /// Re-key the channel of the open document with a fresh ticket
    pub async fn reconnect(&mut self, ticket: &str) -> Result<(), SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoDocument)?;
        open.endpoint.ticket = ticket.to_string();
        let endpoint = open.endpoint.clone();

        self.channel.ensure(&endpoint).await?;
        Ok(())
    }

    /// Reopen the channel of the open document if it dropped
    async fn ensure_connected(&mut self) -> Result<(), SessionError> {
        if self.channel.is_open() {
            return Ok(());
        }
        let Some(endpoint) = self.open.as_ref().map(|d| d.endpoint.clone()) else {
            return Err(SessionError::NoDocument);
        };

        match self.channel.ensure(&endpoint).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("[Session] Reconnect failed: {}", e);
                Err(SessionError::ChannelUnavailable)
            }
        }
    }

    /// Flush, close the channel and drop the open document
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if self.open.is_some() {
            self.leave_current().await?;
        }
        Ok(())
    }

    async fn leave_current(&mut self) -> Result<(), SessionError> {
        match self.flush().await {
            Ok(_) | Err(SessionError::ChannelUnavailable) => {}
            Err(e) => return Err(e),
        }
        self.channel.close();

        if let Some(previous) = self.open.take() {
            let lost = previous.editor.pending_count();
            if lost > 0 {
                warn!(
                    "[Session] Discarding {} unsent operations for {}",
                    lost, previous.id
                );
            }
        }
        Ok(())
    }

    /// Route one input event through the capture engine
    pub async fn handle(&mut self, event: EditEvent) -> Result<EditOutcome, SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoDocument)?;
        let outcome = open.editor.handle(event)?;

        if !outcome.operations.is_empty() {
            let version = open.editor.document().version();
            self.emit(SessionEvent::ContentChanged { version });
        }
        if outcome.flush_requested {
            match self.flush().await {
                Ok(_) | Err(SessionError::ChannelUnavailable) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    /// Replace the title. Line breaks are not allowed in titles and are dropped.
    /// Only owners and admins may rename.
    pub fn set_title(&mut self, title: &str) -> Result<(), SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoDocument)?;
        if !open.editor.permission().can_manage() {
            return Err(EditorError::ReadOnly.into());
        }

        let title: String = title.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        if title != open.title {
            open.title = title.clone();
            self.emit(SessionEvent::TitleChanged(title));
        }
        Ok(())
    }

    /// Send pending operations as one content message, then the title if it
    /// changed since it was last sent.
    pub async fn flush(&mut self) -> Result<FlushReport, SessionError> {
        let Some(open) = self.open.as_ref() else {
            return Ok(FlushReport::default());
        };
        let has_content = open.editor.pending_count() > 0;
        let has_title = open.title != open.last_sent_title;
        if !has_content && !has_title {
            return Ok(FlushReport::default());
        }

        if self.ensure_connected().await.is_err() {
            debug!("[Flush] Channel unavailable, keeping queue");
            return Err(SessionError::ChannelUnavailable);
        }
        let access_token = self.authorize().await?;

        let mut report = FlushReport::default();
        let Some(open) = self.open.as_mut() else {
            return Ok(report);
        };

        if has_content {
            let batch = open.editor.drain_pending();
            report.operations = batch.len();
            let frame = serde_json::to_string(&OutboundMessage::content(&access_token, batch))?;
            send(&self.channel, frame, "content");
        }

        if has_title {
            let frame = serde_json::to_string(&OutboundMessage::title(&access_token, &open.title))?;
            open.last_sent_title = open.title.clone();
            report.title_sent = true;
            send(&self.channel, frame, "title");
        }

        debug!(
            "[Flush] Sent {} operations, title: {}",
            report.operations, report.title_sent
        );
        self.emit(SessionEvent::Flushed(report));
        Ok(report)
    }

    /// Ask the service to add `user` to the open document
    pub async fn add_collaborator(&mut self, user: UserId) -> Result<(), SessionError> {
        if self.open.is_none() {
            return Err(SessionError::NoDocument);
        }
        if !self.context.permission.can_manage() {
            return Err(SessionError::PermissionDenied(
                "only owners and admins can add collaborators",
            ));
        }
        self.ensure_connected().await?;

        let access_token = self.authorize().await?;
        info!("[Session] Inviting {}", user);
        let frame = serde_json::to_string(&OutboundMessage::collaborator(&access_token, user))?;
        send(&self.channel, frame, "collaborator");
        Ok(())
    }

    /// Dispatch one inbound frame. Malformed frames are logged and dropped.
    pub fn receive(&mut self, frame: &str) {
        let message: InboundMessage = match serde_json::from_str(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("[Session] Dropping malformed frame: {}", e);
                return;
            }
        };
        let Some(open) = self.open.as_mut() else {
            debug!("[Session] No open document, ignoring frame");
            return;
        };

        match message {
            InboundMessage::UpdateDocumentContent { body } => {
                open.editor.apply_remote(&body.data);
                let version = open.editor.document().version();
                self.emit(SessionEvent::ContentChanged { version });
            }
            InboundMessage::UpdateDocumentTitle { body } => {
                let title = body.title;
                open.last_sent_title = title.clone();
                open.title = title.clone();
                self.emit(SessionEvent::TitleChanged(title));
            }
            InboundMessage::AddNewCollaborators { body } => {
                match open.collaborators.iter_mut().find(|c| c.user == body.user) {
                    Some(existing) => *existing = body.clone(),
                    None => open.collaborators.push(body.clone()),
                }
                self.emit(SessionEvent::CollaboratorAdded(body));
            }
        }
    }

    /// Next inbound frame from the channel, `None` when the peer hung up
    pub async fn next_frame(&mut self) -> Option<String> {
        self.channel.recv().await
    }

    /// Current access token, refreshed once if it has expired
    async fn authorize(&mut self) -> Result<String, SessionError> {
        if !self.context.tokens.is_expired(Utc::now()) {
            return Ok(self.context.tokens.access.clone());
        }

        debug!("[Auth] Access token expired, refreshing");
        let refreshed = self.auth.refresh(&self.context.tokens.refresh).await;
        match refreshed {
            Ok(tokens) => {
                self.context.tokens = tokens;
                Ok(self.context.tokens.access.clone())
            }
            Err(e) => {
                warn!("[Auth] Refresh failed: {}", e);
                Err(SessionError::ReauthenticationRequired)
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn send<C: Connector>(channel: &ChannelLifecycle<C>, frame: String, what: &str) {
    let result = match channel.channel() {
        Some(channel) => channel.send(frame).map_err(SessionError::from),
        None => Err(SessionError::ChannelUnavailable),
    };
    if let Err(e) = result {
        warn!("[Flush] Lost {} message: {}", what, e);
    }
}
