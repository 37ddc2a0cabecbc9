//! # Flush Scheduler
//!
//! Owns a [`DocumentSession`] on one task. Commands from the UI, inbound
//! frames and flush ticks are handled one at a time in a `select!` loop, so
//! an edit never interleaves with a remote batch or a flush.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use scribe_editor::EditEvent;

use crate::auth::AuthProvider;
use crate::channel::Connector;
use crate::error::SessionError;
use crate::messages::{DocumentSnapshot, UserId};
use crate::session::{DocumentSession, FlushReport};

const COMMAND_BUFFER: usize = 100;

pub enum Command {
    Open {
        document_id: String,
        ticket: String,
        snapshot: Box<DocumentSnapshot>,
    },
    /// Re-key the channel with a fresh ticket, keeping the open document
    Reconnect { ticket: String },
    Edit(EditEvent),
    SetTitle(String),
    AddCollaborator(UserId),
    /// Flush now and report what was sent
    Flush(oneshot::Sender<Result<FlushReport, SessionError>>),
    Close,
}

/// Cloneable handle for sending commands to a running scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    pub async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Stopped)
    }

    pub async fn open(
        &self,
        document_id: &str,
        ticket: &str,
        snapshot: DocumentSnapshot,
    ) -> Result<(), SessionError> {
        self.send(Command::Open {
            document_id: document_id.to_string(),
            ticket: ticket.to_string(),
            snapshot: Box::new(snapshot),
        })
        .await
    }

    pub async fn reconnect(&self, ticket: &str) -> Result<(), SessionError> {
        self.send(Command::Reconnect {
            ticket: ticket.to_string(),
        })
        .await
    }

    pub async fn edit(&self, event: EditEvent) -> Result<(), SessionError> {
        self.send(Command::Edit(event)).await
    }

    pub async fn set_title(&self, title: &str) -> Result<(), SessionError> {
        self.send(Command::SetTitle(title.to_string())).await
    }

    pub async fn add_collaborator(&self, user: UserId) -> Result<(), SessionError> {
        self.send(Command::AddCollaborator(user)).await
    }

    pub async fn flush(&self) -> Result<FlushReport, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Flush(reply)).await?;
        response.await.map_err(|_| SessionError::Stopped)?
    }

    pub async fn close(&self) -> Result<(), SessionError> {
        self.send(Command::Close).await
    }
}

/// Run `session` on its own task
pub fn spawn<C, A>(
    session: DocumentSession<C, A>,
) -> (SchedulerHandle, JoinHandle<Result<DocumentSession<C, A>, SessionError>>)
where
    C: Connector + 'static,
    A: AuthProvider + 'static,
{
    let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(session, inbox));
    (SchedulerHandle { commands }, task)
}

/// Drive the session until `Close`, all handles drop, or a fatal error
pub async fn run<C, A>(
    mut session: DocumentSession<C, A>,
    mut commands: mpsc::Receiver<Command>,
) -> Result<DocumentSession<C, A>, SessionError>
where
    C: Connector,
    A: AuthProvider,
{
    let mut ticker = time::interval(session.config().flush_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "[Scheduler] Started, flushing every {}ms",
        session.config().flush_interval_ms
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tolerate(session.flush().await.map(|_| ()))?;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("[Scheduler] All handles dropped");
                    break;
                };
                if let Command::Close = command {
                    break;
                }
                execute(&mut session, command).await?;
            }
            frame = session.next_frame() => {
                match frame {
                    Some(frame) => session.receive(&frame),
                    None => warn!("[Scheduler] Session channel closed by peer"),
                }
            }
        }
    }

    tolerate(session.close().await)?;
    info!("[Scheduler] Stopped");
    Ok(session)
}

async fn execute<C, A>(
    session: &mut DocumentSession<C, A>,
    command: Command,
) -> Result<(), SessionError>
where
    C: Connector,
    A: AuthProvider,
{
    let result = match command {
        Command::Open {
            document_id,
            ticket,
            snapshot,
        } => session.load(&document_id, &ticket, *snapshot).await,
        Command::Reconnect { ticket } => session.reconnect(&ticket).await,
        Command::Edit(event) => session.handle(event).await.map(|_| ()),
        Command::SetTitle(title) => session.set_title(&title),
        Command::AddCollaborator(user) => session.add_collaborator(user).await,
        Command::Flush(reply) => {
            let result = session.flush().await;
            let fatal = matches!(&result, Err(e) if e.is_fatal());
            let _ = reply.send(result);
            if fatal {
                return Err(SessionError::ReauthenticationRequired);
            }
            Ok(())
        }
        Command::Close => session.close().await,
    };
    tolerate(result)
}

/// Keep running through recoverable errors; stop on fatal ones
fn tolerate(result: Result<(), SessionError>) -> Result<(), SessionError> {
    match result {
        Ok(()) => Ok(()),
        Err(SessionError::ChannelUnavailable) => {
            debug!("[Scheduler] Channel unavailable, skipping");
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!("[Scheduler] {}", e);
            Err(e)
        }
        Err(e) => {
            warn!("[Scheduler] {}", e);
            Ok(())
        }
    }
}
