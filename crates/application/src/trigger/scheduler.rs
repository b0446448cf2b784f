use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::Controller;

use super::DataTrigger;
use crate::batch::{BatchService, BatchTransaction};
use crate::poll::PollGroup;
use crate::tag::GlobalDataItem;

/// Runs the periodic batch sweeps of the runtime: the data exchange of
/// every scheduled trigger and the reads of every poll group.
pub struct TriggerScheduler {
    batch: Arc<BatchService>,
    cancel_token: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TriggerScheduler {
    pub fn new(batch: Arc<BatchService>) -> Self {
        Self {
            batch,
            cancel_token: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the exchange loop of `trigger` over `tags`.
    /// Immediate triggers need no loop and are ignored.
    pub fn start(&self, trigger: DataTrigger, tags: Vec<Arc<GlobalDataItem>>) {
        let Some(interval) = trigger.interval() else {
            debug!(trigger = %trigger.name(), "Immediate trigger - nothing to schedule");
            return;
        };

        let batch = self.batch.clone();
        let cancel_token = self.cancel_token.clone();
        let handle = tokio::spawn(async move {
            info!(trigger = %trigger.name(), interval_ms = interval.as_millis() as u64, tags = tags.len(), "Starting trigger sweep");
            loop {
                let start = Instant::now();
                let writes = Self::exchange_sweep(&batch, &tags).await;
                if writes > 0 {
                    debug!(trigger = %trigger.name(), writes, "Exchange sweep completed");
                }
                let delay = DataTrigger::calculate_next_start_time(start, Instant::now(), interval);
                if Self::wait(&cancel_token, delay).await {
                    info!(trigger = %trigger.name(), "Trigger sweep stopped");
                    break;
                }
            }
        });
        self.handles.lock().push(handle);
    }

    /// Spawns the read loop of a poll group. The interval is re-read on
    /// every cycle so changes apply without a restart.
    pub fn start_poll(&self, group: Arc<PollGroup>, tags: Vec<Arc<GlobalDataItem>>) {
        let batch = self.batch.clone();
        let cancel_token = self.cancel_token.clone();
        let handle = tokio::spawn(async move {
            info!(poll_group = %group.name(), interval_ms = group.interval_ms(), tags = tags.len(), "Starting poll loop");
            loop {
                let start = Instant::now();
                Self::read_sweep(&batch, &tags).await;
                let delay = DataTrigger::calculate_next_start_time(start, Instant::now(), group.interval());
                if Self::wait(&cancel_token, delay).await {
                    info!(poll_group = %group.name(), "Poll loop stopped");
                    break;
                }
            }
        });
        self.handles.lock().push(handle);
    }

    /// Returns true when cancelled before `delay` elapsed.
    async fn wait(cancel_token: &CancellationToken, delay: Duration) -> bool {
        tokio::select! {
            _ = cancel_token.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    /// One exchange: opens a batch on every writable controller in use,
    /// forwards the pending values and commits. Returns the number of
    /// item writes.
    pub async fn exchange_sweep(batch: &BatchService, tags: &[Arc<GlobalDataItem>]) -> usize {
        let controllers = BatchService::writable_controllers_in_use(tags);
        let transactions = Self::open_batches(batch, controllers).await;
        let writes = tags.iter().map(|tag| tag.exchange_pending()).sum();
        Self::commit_batches(batch, transactions).await;
        writes
    }

    /// One batched read of every readable item of `tags`.
    pub async fn read_sweep(batch: &BatchService, tags: &[Arc<GlobalDataItem>]) {
        let controllers = BatchService::controllers_in_use(tags);
        let transactions = Self::open_batches(batch, controllers).await;
        for tag in tags {
            tag.batch_read();
        }
        Self::commit_batches(batch, transactions).await;
    }

    async fn open_batches(
        batch: &BatchService,
        mut controllers: Vec<Arc<dyn Controller>>,
    ) -> Vec<BatchTransaction> {
        // A fixed lock order keeps two sweeps from waiting on each other.
        controllers.sort_by_key(|c| c.name());

        let mut transactions = Vec::with_capacity(controllers.len());
        for controller in &controllers {
            match batch.batch_start(controller).await {
                Ok(tx) => transactions.push(tx),
                Err(e) => {
                    warn!(controller = %controller.name(), error = %e, "Could not open batch")
                }
            }
        }
        transactions
    }

    async fn commit_batches(batch: &BatchService, transactions: Vec<BatchTransaction>) {
        for tx in transactions {
            let name = tx.controller_name();
            if let Err(e) = batch.batch_commit(tx).await {
                warn!(controller = %name, error = %e, "Could not commit batch");
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Stops every loop and waits for them to finish.
    pub async fn stop_all(&self) {
        self.cancel_token.cancel();
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                warn!("Sweep loop did not stop in time");
            }
        }
    }
}
