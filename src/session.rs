//! Async driver that owns an [`Engine`] and wires it to its collaborators
//!
//! One task runs the engine. It multiplexes user commands, remote pushes,
//! write outcomes and the engine's next timer deadline. Remote writes run on
//! their own tasks and report back through a channel, so the engine never
//! awaits I/O.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Catalog, CatalogData, MissionIndex};
use crate::engine::{BoardView, Effect, Engine, Interaction, WriteRequest};
use crate::error::BoardError;
use crate::remote::{CatalogLoader, IdentityProvider, RemoteProgressStore};

/// Identifier used when neither the identity provider nor config supply one
pub const FALLBACK_ALUMNO: &str = "alumno";

const COMMAND_BUFFER: usize = 64;

enum Command {
    Tap {
        index: MissionIndex,
        reply: oneshot::Sender<Interaction>,
    },
    View {
        reply: oneshot::Sender<BoardView>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

type WriteOutcome = (WriteRequest, Result<(), BoardError>);

/// Handle to a running board session. Dropping it stops the session.
pub struct Session {
    alumno: String,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl Session {
    /// Resolve identity, load the catalog, hydrate progress and start the loop.
    ///
    /// Collaborator failures degrade instead of aborting: a missing identity
    /// falls back to config, a missing catalog to placeholders, and a failed
    /// read to empty progress.
    pub async fn start(
        config: Config,
        remote: Arc<dyn RemoteProgressStore>,
        catalog: &dyn CatalogLoader,
        identity: &dyn IdentityProvider,
    ) -> Result<Self, BoardError> {
        config.validate()?;

        let alumno = match identity.resolve().await {
            Ok(alumno) if !alumno.trim().is_empty() => alumno,
            Ok(_) => fallback_alumno(&config),
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Identity unavailable, using fallback");
                fallback_alumno(&config)
            }
        };

        let data = catalog.load().await.unwrap_or_else(|err| {
            warn!(kind = err.kind(), error = %err, "Catalog unavailable, using placeholders");
            CatalogData::default()
        });
        let catalog = Catalog::from_data(data, config.board.group_count, &alumno);

        // Subscribe before reading so pushes racing the read are buffered.
        let pushes = remote.subscribe();
        let rows = remote.read_all(&alumno).await.unwrap_or_else(|err| {
            warn!(kind = err.kind(), error = %err, "Initial progress read failed, starting empty");
            Vec::new()
        });

        let mut engine = Engine::new(&config, alumno.clone(), catalog)?;
        engine.hydrate(&rows, Instant::now());
        info!(alumno = %alumno, rows = rows.len(), "Board session started");

        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run(engine, remote, command_rx, pushes));
        Ok(Self {
            alumno,
            commands,
            task,
        })
    }

    pub fn alumno(&self) -> &str {
        &self.alumno
    }

    /// Select the mission, or advance it when it is already selected
    pub async fn advance_or_reset(&self, index: MissionIndex) -> Result<Interaction, BoardError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Tap { index, reply }).await?;
        rx.await.map_err(|_| BoardError::SessionClosed)
    }

    pub async fn view(&self) -> Result<BoardView, BoardError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::View { reply }).await?;
        rx.await.map_err(|_| BoardError::SessionClosed)
    }

    /// Dispose the engine and wait for the loop to exit
    pub async fn shutdown(self) -> Result<(), BoardError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| BoardError::SessionClosed)?;
        if let Err(err) = self.task.await {
            warn!(error = %err, "Session task ended abnormally");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    async fn send(&self, command: Command) -> Result<(), BoardError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BoardError::SessionClosed)
    }
}

fn fallback_alumno(config: &Config) -> String {
    config
        .board
        .alumno
        .clone()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ALUMNO.to_string())
}

async fn run(
    mut engine: Engine,
    remote: Arc<dyn RemoteProgressStore>,
    mut commands: mpsc::Receiver<Command>,
    mut pushes: BoxStream<'static, Value>,
) {
    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<WriteOutcome>();
    let mut pushes_open = true;
    let mut shutdown_reply = None;

    loop {
        dispatch(&mut engine, &remote, &results_tx);
        let deadline = engine.next_deadline();

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Tap { index, reply }) => {
                    let outcome = engine.advance_or_reset(index, Instant::now());
                    debug!(mission = index, ?outcome, "Tap");
                    let _ = reply.send(outcome);
                }
                Some(Command::View { reply }) => {
                    let _ = reply.send(engine.view());
                }
                Some(Command::Shutdown { reply }) => {
                    shutdown_reply = Some(reply);
                    break;
                }
                None => break,
            },
            push = pushes.next(), if pushes_open => match push {
                Some(value) => {
                    engine.apply_push_value(value, Instant::now());
                }
                None => {
                    warn!("Push stream closed, continuing without realtime updates");
                    pushes_open = false;
                }
            },
            Some((request, result)) = results_rx.recv() => {
                engine.on_write_result(request, result, Instant::now());
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                engine.advance_time(Instant::now());
            }
        }
    }

    engine.dispose();
    info!(alumno = %engine.alumno(), "Board session stopped");
    if let Some(reply) = shutdown_reply {
        let _ = reply.send(());
    }
}

fn dispatch(
    engine: &mut Engine,
    remote: &Arc<dyn RemoteProgressStore>,
    results: &mpsc::UnboundedSender<WriteOutcome>,
) {
    for effect in engine.take_effects() {
        let remote = Arc::clone(remote);
        let alumno = engine.alumno().to_string();
        match effect {
            Effect::PersistProgress(request) => {
                let results = results.clone();
                tokio::spawn(async move {
                    let result = remote
                        .write(&alumno, request.index, request.points, request.completed())
                        .await;
                    let _ = results.send((request, result));
                });
            }
            Effect::PersistSelection {
                mission,
                updated_at,
            } => {
                tokio::spawn(async move {
                    if let Err(err) = remote.write_selection(&alumno, mission, updated_at).await {
                        warn!(kind = err.kind(), error = %err, "Failed to persist selection");
                    }
                });
            }
        }
    }
}
