use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::controller::{Action, ControllerError, Guards, ListController, ListView};
use crate::io::settings_io::SettingsStore;
use crate::io::store::DocumentStore;
use crate::model::list::TodoList;

enum Command {
    Dispatch(Action, oneshot::Sender<Result<bool, ControllerError>>),
    External(PathBuf),
    Lists(oneshot::Sender<Vec<TodoList>>),
    Shutdown,
}

/// Handle to a controller running on its own task. Actions are applied one
/// at a time in the order they were sent.
pub struct ControllerHandle<D, S, V> {
    tx: mpsc::UnboundedSender<Command>,
    guards: Guards,
    task: JoinHandle<ListController<D, S, V>>,
}

/// Move a (loaded) controller onto a tokio task and return its handle.
pub fn spawn<D, S, V>(controller: ListController<D, S, V>) -> ControllerHandle<D, S, V>
where
    D: DocumentStore + 'static,
    S: SettingsStore + 'static,
    V: ListView + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let guards = controller.guards().clone();
    let task = tokio::spawn(run(controller, rx));
    ControllerHandle { tx, guards, task }
}

impl<D, S, V> ControllerHandle<D, S, V> {
    pub async fn dispatch(&self, action: Action) -> Result<bool, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Dispatch(action, reply))
            .map_err(|_| ControllerError::Stopped)?;
        response.await.map_err(|_| ControllerError::Stopped)?
    }

    /// Report a change made to a document by someone else. Dropped right
    /// here while a save or drag is in progress.
    pub fn notify_external(&self, path: PathBuf) -> bool {
        if !self.guards.accepts_external() {
            tracing::trace!(path = %path.display(), "external change dropped on arrival");
            return false;
        }
        self.tx.send(Command::External(path)).is_ok()
    }

    /// Open a reorder gesture. Takes effect immediately, ahead of any
    /// queued actions.
    pub fn begin_drag(&self) {
        self.guards.begin_drag();
    }

    pub fn guards(&self) -> &Guards {
        &self.guards
    }

    /// Snapshot of the lists as the controller currently holds them.
    pub async fn lists(&self) -> Result<Vec<TodoList>, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Lists(reply))
            .map_err(|_| ControllerError::Stopped)?;
        response.await.map_err(|_| ControllerError::Stopped)
    }

    /// Stop the loop, cancelling any pending reload, and hand the
    /// controller back.
    pub async fn shutdown(self) -> Result<ListController<D, S, V>, ControllerError> {
        let _ = self.tx.send(Command::Shutdown);
        self.task.await.map_err(|_| ControllerError::Stopped)
    }
}

async fn run<D, S, V>(
    mut controller: ListController<D, S, V>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> ListController<D, S, V>
where
    D: DocumentStore,
    S: SettingsStore,
    V: ListView,
{
    loop {
        let deadline = controller.reload_deadline();
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Dispatch(action, reply)) => {
                    let result = controller.dispatch(action).await;
                    if let Err(ref e) = result {
                        tracing::warn!(error = %e, "action failed");
                    }
                    let _ = reply.send(result);
                }
                Some(Command::External(path)) => {
                    controller.note_external_change(&path);
                }
                Some(Command::Lists(reply)) => {
                    let _ = reply.send(controller.lists().to_vec());
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Err(e) = controller.fire_reload().await {
                    tracing::warn!(error = %e, "reload failed");
                }
            }
        }
    }
    controller.shutdown();
    tracing::debug!("controller stopped");
    controller
}
