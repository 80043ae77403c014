use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{Event, EventSink};

/// Upper bound on events sent in one request.
pub const MAX_BATCH_SIZE: usize = 100;

enum Command {
    Track(Event),
    Flush(oneshot::Sender<()>),
}

/// Delivery task inputs, held until a runtime is available to spawn on.
struct Pending {
    receiver: mpsc::UnboundedReceiver<Command>,
    client_secret: String,
    sink: Arc<dyn EventSink>,
}

/// Hands tracked events to a background task that delivers them in batches.
///
/// `publish` only enqueues, it never waits on the sink. Delivery is best
/// effort: failures are logged and the batch is dropped.
#[derive(Clone)]
pub struct EventPublisher {
    sender: mpsc::UnboundedSender<Command>,
    pending: Arc<Mutex<Option<Pending>>>,
}

impl EventPublisher {
    /// Spawns the delivery task on the current tokio runtime. Outside a
    /// runtime events queue up and the task starts on the first `publish`
    /// or `flush` made from inside one.
    pub fn start(client_secret: String, sink: Arc<dyn EventSink>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let publisher = Self {
            sender,
            pending: Arc::new(Mutex::new(Some(Pending {
                receiver,
                client_secret,
                sink,
            }))),
        };

        if !publisher.ensure_running() {
            debug!("no tokio runtime yet, event delivery starts on first use inside one");
        }

        publisher
    }

    pub fn publish(&self, event: Event) {
        self.ensure_running();
        if self.sender.send(Command::Track(event)).is_err() {
            warn!("event publisher is not running, dropping event");
        }
    }

    /// Waits until every event published before this call was handed to the sink.
    pub async fn flush(&self) {
        if !self.ensure_running() {
            warn!("no tokio runtime available, tracked events stay queued");
            return;
        }

        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Spawns the delivery task if it is not running yet. Returns whether it runs.
    fn ensure_running(&self) -> bool {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.is_none() {
            return true;
        }

        match Handle::try_current() {
            Ok(handle) => {
                if let Some(task) = pending.take() {
                    handle.spawn(run(task.receiver, task.client_secret, task.sink));
                }
                true
            }
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let running = self.pending.lock().map(|p| p.is_none()).unwrap_or(false);
        f.debug_struct("EventPublisher")
            .field("running", &running)
            .finish_non_exhaustive()
    }
}

async fn run(mut receiver: mpsc::UnboundedReceiver<Command>, client_secret: String, sink: Arc<dyn EventSink>) {
    debug!("event publisher started");

    while let Some(command) = receiver.recv().await {
        let mut batch = Vec::new();
        let mut waiters = Vec::new();

        // Step 1: Take whatever is already queued, up to one batch
        let mut next = Some(command);
        while let Some(command) = next.take() {
            match command {
                Command::Track(event) => batch.push(event),
                Command::Flush(done) => waiters.push(done),
            }
            if batch.len() >= MAX_BATCH_SIZE {
                break;
            }
            next = receiver.try_recv().ok();
        }

        // Step 2: Deliver
        if !batch.is_empty() {
            let count = batch.len();
            if let Err(e) = sink.send(&client_secret, batch).await {
                warn!(count, error = %e, "failed to publish events");
            }
        }

        // Step 3: Release anyone waiting on a flush
        for done in waiters {
            let _ = done.send(());
        }
    }

    debug!("event publisher stopped");
}
