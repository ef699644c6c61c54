//! Run triggers: the background schedule and the on-demand HTTP endpoint.
//!
//! Both go through [`Runner::trigger`], which holds the [`RunGuard`] for the
//! duration of a run and refuses to start a second one.

pub mod routes;
pub mod scheduler;

pub use routes::trigger_routes;
pub use scheduler::spawn_scheduler;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::{Pipeline, RunFailure, RunGuard, RunSummary};

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Schedule,
    Http,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule => write!(f, "schedule"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Result of asking for a run.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Another run was in progress; nothing was done.
    Busy,
    Completed(RunSummary),
    Failed(RunFailure),
}

/// Short record of the most recent finished run.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub run_id: Uuid,
    pub source: TriggerSource,
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub detail: String,
}

/// Serializes access to a [`Pipeline`].
pub struct Runner {
    pipeline: Pipeline,
    guard: RunGuard,
    last: RwLock<Option<LastRun>>,
}

impl Runner {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            guard: RunGuard::new(),
            last: RwLock::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub async fn last_run(&self) -> Option<LastRun> {
        self.last.read().await.clone()
    }

    /// Run the pipeline unless a run is already active.
    pub async fn trigger(&self, source: TriggerSource) -> TriggerOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            warn!(%source, "Run requested while another run is active, skipping");
            return TriggerOutcome::Busy;
        };

        info!(%source, "Starting run");
        let outcome = match self.pipeline.run().await {
            Ok(summary) => {
                info!(
                    %source,
                    run_id = %summary.run_id,
                    outcome = ?summary.outcome,
                    archived = summary.archived.len(),
                    "Run completed"
                );
                TriggerOutcome::Completed(summary)
            }
            Err(failure) => {
                error!(%source, run_id = %failure.run_id, stage = failure.error.stage(), "{failure}");
                TriggerOutcome::Failed(failure)
            }
        };

        let record = match &outcome {
            TriggerOutcome::Completed(summary) => Some(LastRun {
                run_id: summary.run_id,
                source,
                finished_at: summary.finished_at,
                succeeded: true,
                detail: summary.log.last().cloned().unwrap_or_default(),
            }),
            TriggerOutcome::Failed(failure) => Some(LastRun {
                run_id: failure.run_id,
                source,
                finished_at: Utc::now(),
                succeeded: false,
                detail: failure.to_string(),
            }),
            TriggerOutcome::Busy => None,
        };
        if let Some(record) = record {
            *self.last.write().await = Some(record);
        }

        outcome
    }
}
