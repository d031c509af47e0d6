//! services/api/src/jobs/runner.rs
//!
//! An in-process execution backend implementing the `JobRunner` port: a
//! bounded queue feeding a small pool of worker tasks, with a shared status
//! map for handle lookups. The orchestrator only ever sees the port, so a
//! managed external queue could be swapped in without touching it.

use audiopintar_core::domain::{AudioJob, Run, RunStatus};
use audiopintar_core::ports::{JobRunner, PortError, PortResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::worker::{run_audio_job, WorkerContext};

const QUEUE_CAPACITY: usize = 128;

struct QueuedJob {
    run_id: String,
    job: AudioJob,
}

/// The in-process job runner. `start` spawns the worker pool; the returned
/// handle is cheap to clone into anything that dispatches or polls.
pub struct LocalJobRunner {
    queue: mpsc::Sender<QueuedJob>,
    statuses: Arc<RwLock<HashMap<String, RunStatus>>>,
}

impl LocalJobRunner {
    /// Spawns `worker_count` workers draining a shared queue. Each job is
    /// bounded by `job_timeout`; on expiry the run is marked failed and no
    /// audio row is written for that attempt. Workers drain until the
    /// shutdown token fires.
    pub fn start(
        ctx: WorkerContext,
        worker_count: usize,
        job_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<QueuedJob>(QUEUE_CAPACITY);
        let statuses: Arc<RwLock<HashMap<String, RunStatus>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..worker_count.max(1) {
            let ctx = ctx.clone();
            let rx = rx.clone();
            let statuses = statuses.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let queued = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        queued = async { rx.lock().await.recv().await } => match queued {
                            Some(queued) => queued,
                            None => break,
                        },
                    };

                    {
                        let mut map = statuses.write().await;
                        map.insert(queued.run_id.clone(), RunStatus::Executing);
                    }

                    let result = match tokio::time::timeout(
                        job_timeout,
                        run_audio_job(&ctx, &queued.job),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(PortError::Timeout(format!(
                            "audio job exceeded its {}s execution deadline",
                            job_timeout.as_secs()
                        ))),
                    };

                    let final_status = match result {
                        Ok(_) => RunStatus::Completed,
                        Err(e @ PortError::Timeout(_)) => {
                            error!(
                                run_id = %queued.run_id,
                                page_id = %queued.job.page_id,
                                "audio job failed: {e}"
                            );
                            RunStatus::Failed
                        }
                        Err(e) => {
                            warn!(
                                run_id = %queued.run_id,
                                page_id = %queued.job.page_id,
                                "audio job failed: {e}"
                            );
                            RunStatus::Failed
                        }
                    };

                    let mut map = statuses.write().await;
                    map.insert(queued.run_id.clone(), final_status);
                }
                info!(worker_id, "audio worker stopped");
            });
        }

        Arc::new(Self {
            queue: tx,
            statuses,
        })
    }
}

#[async_trait]
impl JobRunner for LocalJobRunner {
    async fn submit(&self, job: AudioJob) -> PortResult<String> {
        let run_id = Uuid::new_v4().to_string();
        {
            let mut map = self.statuses.write().await;
            map.insert(run_id.clone(), RunStatus::Pending);
        }

        self.queue
            .send(QueuedJob {
                run_id: run_id.clone(),
                job,
            })
            .await
            .map_err(|_| PortError::Unexpected("execution backend is not running".to_string()))?;

        Ok(run_id)
    }

    async fn status(&self, run_id: &str) -> PortResult<Run> {
        let map = self.statuses.read().await;
        let status = map
            .get(run_id)
            .copied()
            .ok_or_else(|| PortError::NotFound(format!("Run {} not found", run_id)))?;
        Ok(Run {
            run_id: run_id.to_string(),
            status,
        })
    }
}
