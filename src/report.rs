//! Reporting seam between the dispatch core and the logging backend.
//!
//! The validator and dispatch loop never touch a global logger; they
//! emit through this trait, so tests can capture events without wiring
//! a subscriber.

use crate::model::{DispatchOutcome, TaskOutcome};
use tracing::{info, warn};

pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn task_outcome(&self, outcome: &TaskOutcome);
}

/// Production reporter backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn task_outcome(&self, outcome: &TaskOutcome) {
        match &outcome.outcome {
            DispatchOutcome::Delivered { parts } => {
                let parts: Vec<&str> = parts.iter().map(|p| p.as_str()).collect();
                info!(
                    index = outcome.index,
                    recipient = %outcome.recipient,
                    parts = %parts.join(","),
                    "task delivered"
                );
            }
            DispatchOutcome::RecipientNotFound => {
                info!(
                    index = outcome.index,
                    recipient = %outcome.recipient,
                    "recipient not found"
                );
            }
            DispatchOutcome::PartialFailure { failed, error, .. } => {
                warn!(
                    index = outcome.index,
                    recipient = %outcome.recipient,
                    failed = failed.as_str(),
                    %error,
                    "task failed partway"
                );
            }
        }
    }
}
