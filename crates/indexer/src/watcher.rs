use crate::error::{IndexerError, Result};
use crate::indexer::{CorpusIndexer, FileEvent};
use crate::stats::RebuildStats;
use atlas_scanner::{CorpusLayout, FsDocumentProvider};
use log::warn;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{broadcast, mpsc, Mutex as TokioMutex};
use tokio::time;

const FS_EVENT_REASON: &str = "fs_event";

/// One completed index cycle, broadcast to subscribers.
#[derive(Debug, Clone)]
pub struct IndexUpdate {
    pub completed_at: SystemTime,
    pub duration_ms: u64,
    pub stats: Option<RebuildStats>,
    pub success: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub debounce: Duration,
    pub max_batch_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(750),
            max_batch_wait: Duration::from_secs(3),
            poll_interval: Duration::from_secs(2),
        }
    }
}

enum WatcherCommand {
    Trigger { reason: String },
    Shutdown,
}

/// Streaming bridge between filesystem notifications and the indexer.
///
/// The service owns the indexer; readers borrow the store through the shared
/// handle, so the snapshot keeps a single writer.
#[derive(Clone)]
pub struct WatchService {
    inner: Arc<WatchServiceInner>,
}

struct WatchServiceInner {
    command_tx: mpsc::Sender<WatcherCommand>,
    update_tx: broadcast::Sender<IndexUpdate>,
    indexer: Arc<TokioMutex<CorpusIndexer<FsDocumentProvider>>>,
    _watcher: std::sync::Mutex<Option<RecommendedWatcher>>,
}

impl WatchService {
    pub fn start(indexer: CorpusIndexer<FsDocumentProvider>, config: WatchConfig) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (update_tx, _) = broadcast::channel(32);

        let layout = indexer.layout().clone();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default().with_poll_interval(config.poll_interval),
        )
        .map_err(|e| IndexerError::Other(format!("watcher init failed: {e}")))?;
        watcher
            .watch(layout.root(), RecursiveMode::Recursive)
            .map_err(|e| IndexerError::Other(format!("watch failed: {e}")))?;

        let indexer = Arc::new(TokioMutex::new(indexer));
        spawn_watch_loop(
            indexer.clone(),
            layout,
            config,
            event_rx,
            command_rx,
            update_tx.clone(),
        );

        Ok(Self {
            inner: Arc::new(WatchServiceInner {
                command_tx,
                update_tx,
                indexer,
                _watcher: std::sync::Mutex::new(Some(watcher)),
            }),
        })
    }

    /// Force a full rebuild cycle regardless of pending events.
    pub async fn trigger(&self, reason: impl Into<String>) -> Result<()> {
        self.inner
            .command_tx
            .send(WatcherCommand::Trigger {
                reason: reason.into(),
            })
            .await
            .map_err(|e| IndexerError::Other(format!("failed to send trigger: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<IndexUpdate> {
        self.inner.update_tx.subscribe()
    }

    /// Shared handle to the indexer, for read access to the store.
    #[must_use]
    pub fn indexer(&self) -> Arc<TokioMutex<CorpusIndexer<FsDocumentProvider>>> {
        self.inner.indexer.clone()
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(WatcherCommand::Shutdown);
        }
    }
}

fn spawn_watch_loop(
    indexer: Arc<TokioMutex<CorpusIndexer<FsDocumentProvider>>>,
    layout: CorpusLayout,
    config: WatchConfig,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    update_tx: broadcast::Sender<IndexUpdate>,
) {
    tokio::spawn(async move {
        let mut state = DebounceState::new(config.debounce, config.max_batch_wait);

        loop {
            let next_deadline = state.next_deadline();

            tokio::select! {
                Some(event) = event_rx.recv() => {
                    handle_event(&layout, event, &mut state);
                }
                Some(cmd) = command_rx.recv() => {
                    match cmd {
                        WatcherCommand::Trigger { reason } => state.force_run(reason),
                        WatcherCommand::Shutdown => break,
                    }
                }
                () = async {
                    if let Some(deadline) = next_deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if state.should_run() && next_deadline.is_some() => {
                    let cycle = state.take_cycle();
                    let update = run_cycle(&indexer, cycle).await;
                    let _ = update_tx.send(update);
                    state.reset();
                }
            }
        }
    });
}

fn handle_event(layout: &CorpusLayout, event: notify::Result<Event>, state: &mut DebounceState) {
    match event {
        Ok(evt) => {
            for path in evt.paths {
                if layout.is_eligible(&path) {
                    state.record_path(path);
                }
            }
        }
        Err(err) => warn!("Watcher error: {err}"),
    }
}

struct Cycle {
    reason: String,
    paths: Vec<PathBuf>,
    full: bool,
}

async fn run_cycle(
    indexer: &Arc<TokioMutex<CorpusIndexer<FsDocumentProvider>>>,
    cycle: Cycle,
) -> IndexUpdate {
    let started = Instant::now();
    let mut stats = None;
    let mut errors: Vec<String> = Vec::new();

    {
        let mut guard = indexer.lock().await;
        if cycle.full || cycle.paths.is_empty() {
            stats = Some(guard.rebuild_all().await);
        } else {
            for path in &cycle.paths {
                let event = if tokio::fs::metadata(path).await.is_ok() {
                    FileEvent::Changed
                } else {
                    FileEvent::Deleted
                };
                if let Err(err) = guard.apply_event(path, event).await {
                    warn!("Failed to apply event for {}: {err}", path.display());
                    errors.push(err.to_string());
                }
            }
        }
    }

    let success = errors.is_empty() && stats.as_ref().is_none_or(|s| s.errors.is_empty());
    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = started.elapsed().as_millis() as u64;
    IndexUpdate {
        completed_at: SystemTime::now(),
        duration_ms,
        stats,
        success,
        reason: cycle.reason,
    }
}

/// Coalesces bursts of filesystem events into one index cycle.
struct DebounceState {
    debounce: Duration,
    max_batch: Duration,
    dirty: bool,
    pending_paths: HashSet<PathBuf>,
    last_event: Option<Instant>,
    first_event: Option<Instant>,
    reason: Option<String>,
    force_immediate: bool,
    force_full: bool,
}

impl DebounceState {
    fn new(debounce: Duration, max_batch: Duration) -> Self {
        Self {
            debounce,
            max_batch,
            dirty: false,
            pending_paths: HashSet::new(),
            last_event: None,
            first_event: None,
            reason: None,
            force_immediate: false,
            force_full: false,
        }
    }

    fn record_path(&mut self, path: PathBuf) {
        self.pending_paths.insert(path);
        self.reason.get_or_insert_with(|| FS_EVENT_REASON.to_string());
        self.last_event = Some(Instant::now());
        self.first_event.get_or_insert_with(Instant::now);
        self.dirty = true;
    }

    fn force_run(&mut self, reason: String) {
        self.reason = Some(reason);
        self.force_immediate = true;
        self.force_full = true;
        self.dirty = true;
    }

    const fn should_run(&self) -> bool {
        self.dirty
    }

    fn next_deadline(&self) -> Option<time::Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return Some(time::Instant::now());
        }

        let mut deadline = self.last_event.map(|last| last + self.debounce);
        if let Some(first) = self.first_event {
            let forced = first + self.max_batch;
            deadline = Some(match deadline {
                Some(current) if forced < current => forced,
                Some(current) => current,
                None => forced,
            });
        }
        deadline.map(time::Instant::from_std)
    }

    fn take_cycle(&mut self) -> Cycle {
        Cycle {
            reason: self
                .reason
                .take()
                .unwrap_or_else(|| FS_EVENT_REASON.to_string()),
            paths: self.pending_paths.drain().collect(),
            full: self.force_full,
        }
    }

    fn reset(&mut self) {
        self.dirty = false;
        self.pending_paths.clear();
        self.last_event = None;
        self.first_event = None;
        self.reason = None;
        self.force_immediate = false;
        self.force_full = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_generates_deadline() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.record_path(PathBuf::from("a.json"));
        assert!(state.should_run());
        assert!(state.next_deadline().is_some());
    }

    #[test]
    fn force_run_sets_immediate_full_cycle() {
        let mut state = DebounceState::new(Duration::from_secs(5), Duration::from_secs(10));
        state.force_run("manual".to_string());
        assert!(state.should_run());
        assert!(state.next_deadline().is_some());

        let cycle = state.take_cycle();
        assert!(cycle.full);
        assert_eq!(cycle.reason, "manual");
    }

    #[test]
    fn events_coalesce_per_path() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.record_path(PathBuf::from("a.json"));
        state.record_path(PathBuf::from("a.json"));
        state.record_path(PathBuf::from("b.json"));

        let cycle = state.take_cycle();
        assert_eq!(cycle.paths.len(), 2);
        assert!(!cycle.full);
        assert_eq!(cycle.reason, "fs_event");
    }

    #[test]
    fn reset_clears_pending_state() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.record_path(PathBuf::from("a.json"));
        state.reset();
        assert!(!state.should_run());
        assert!(state.next_deadline().is_none());
    }
}
