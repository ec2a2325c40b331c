//! A gatherer running as a dedicated task fed by a bounded queue.
//!
//! Every clone of a [`GathererHandle`] talks to the same task, which owns the
//! [`EpisodeStatsGatherer`] and applies messages one at a time in arrival
//! order. Arrival order depends on scheduling, so episode numbers assigned to
//! concurrent drivers are not reproducible across runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::GathererConfig;
use crate::error::GathererError;
use crate::gatherer::{EpisodeStatsGatherer, GathererSnapshot};
use crate::record::EpisodeRecord;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

enum Message {
    Begin(EpisodeRecord),
    End(EpisodeRecord),
    Snapshot(oneshot::Sender<GathererSnapshot>),
    Shutdown,
}

type TaskResult = Result<GathererSnapshot, GathererError>;

#[derive(Clone)]
pub struct GathererHandle {
    tx: mpsc::Sender<Message>,
    task: Arc<Mutex<Option<JoinHandle<TaskResult>>>>,
}

impl std::fmt::Debug for GathererHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GathererHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl GathererHandle {
    /// Validate `config` and start the processing task. Must be called from
    /// within a tokio runtime.
    pub fn spawn(config: GathererConfig, queue_capacity: usize) -> Result<Self, GathererError> {
        Self::spawn_with(EpisodeStatsGatherer::new(config)?, queue_capacity)
    }

    pub fn spawn_with(
        gatherer: EpisodeStatsGatherer,
        queue_capacity: usize,
    ) -> Result<Self, GathererError> {
        if queue_capacity == 0 {
            return Err(GathererError::InvalidConfiguration(
                "queue capacity must be positive",
            ));
        }
        let (tx, rx) = mpsc::channel(queue_capacity);
        let task = tokio::spawn(process(gatherer, rx));
        Ok(Self {
            tx,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    /// Fire-and-forget; waits only for queue capacity.
    pub async fn on_episode_begin(&self, record: EpisodeRecord) -> Result<(), GathererError> {
        self.send(Message::Begin(record)).await
    }

    /// Fire-and-forget; waits only for queue capacity. A record the gatherer
    /// refuses is logged and counted in [`GathererSnapshot::rejected_records`];
    /// the task keeps serving every other driver.
    pub async fn on_episode_end(&self, record: EpisodeRecord) -> Result<(), GathererError> {
        self.send(Message::End(record)).await
    }

    /// Counters after every message queued before this call.
    pub async fn snapshot(&self) -> Result<GathererSnapshot, GathererError> {
        let (reply, response) = oneshot::channel();
        self.send(Message::Snapshot(reply)).await?;
        response.await.map_err(|_| GathererError::Closed)
    }

    /// Drain queued messages, close the CSV file and return the final counters,
    /// or the error from closing the file. Only the first caller across all
    /// clones receives the outcome; later callers get `Closed`.
    pub async fn shutdown(&self) -> Result<GathererSnapshot, GathererError> {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(GathererError::Closed)?;
        // A failed send means the task already stopped; its result says why.
        let _ = self.tx.send(Message::Shutdown).await;
        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                error!("gatherer task aborted: {join_err}");
                Err(GathererError::Closed)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, message: Message) -> Result<(), GathererError> {
        self.tx.send(message).await.map_err(|_| GathererError::Closed)
    }
}

async fn process(mut gatherer: EpisodeStatsGatherer, mut rx: mpsc::Receiver<Message>) -> TaskResult {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Begin(record) => gatherer.on_episode_begin(&record),
            Message::End(record) => {
                if let Err(err) = gatherer.on_episode_end(&record) {
                    error!(
                        "episode record rejected after {} episodes ({} rejected so far): {err}",
                        gatherer.episode_counter(),
                        gatherer.rejected_records()
                    );
                }
            }
            Message::Snapshot(reply) => {
                let _ = reply.send(gatherer.snapshot());
            }
            Message::Shutdown => break,
        }
    }
    if let Err(err) = gatherer.close() {
        warn!("closing the episode log failed: {err}");
        return Err(err);
    }
    Ok(gatherer.snapshot())
}

/// Named gatherers shared by every driver that asks for the same name.
#[derive(Debug, Default)]
pub struct GathererRegistry {
    handles: Mutex<HashMap<String, GathererHandle>>,
}

impl GathererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the gatherer registered as `name`, spawning it from `config`
    /// when absent or already shut down. `config` is ignored for a live
    /// gatherer.
    pub fn get_or_spawn(
        &self,
        name: &str,
        config: GathererConfig,
        queue_capacity: usize,
    ) -> Result<GathererHandle, GathererError> {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handles.get(name).filter(|handle| !handle.is_closed()) {
            return Ok(handle.clone());
        }
        let handle = GathererHandle::spawn(config, queue_capacity)?;
        info!("gatherer '{name}' started");
        handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<GathererHandle> {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> Option<GathererHandle> {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }
}
