//! Per-object reconciliation state machine.
//!
//! One pass converges a single ShortLink: fetch the current object, validate
//! the declared target, publish or retract its route, and write the observed
//! status back. Passes are idempotent per generation and safe to repeat.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use crate::domain::entities::{LinkCondition, RouteEntry, ShortLink, ShortLinkStatus};
use crate::domain::repositories::{LinkStore, StoreError};
use crate::infrastructure::routing::RoutingTable;
use crate::utils::target_validator::{TargetValidationError, validate_code, validate_target};

/// Immediate retries on a conflicting status write before the pass gives up
/// and is requeued.
const STATUS_WRITE_ATTEMPTS: u32 = 3;

/// What a reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Target validated; route published and status set to `Ready`.
    Published,
    /// Validation failed; route retracted and status set to `Invalid`.
    Invalidated,
    /// Object is gone; route retracted.
    Removed,
    /// Status already reflects this generation; only the (idempotent) route
    /// publish was repeated.
    UpToDate,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Invalidated => "invalidated",
            Self::Removed => "removed",
            Self::UpToDate => "up_to_date",
        }
    }
}

/// Failures that abort a reconcile pass. Both variants are retryable by
/// requeueing; validation failures are not errors (they terminalize into an
/// `Invalid` status instead).
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("status write for '{code}' still conflicting after {attempts} attempts")]
    ConflictExhausted { code: String, attempts: u32 },
}

/// The reconciliation state machine for ShortLink objects.
///
/// Owns no state of its own: reads through the injected store, writes through
/// the injected routing table. Per-code serialization is the caller's job
/// (the controller's work queue); the table's version check backstops any
/// replay that slips through.
pub struct Reconciler<S: LinkStore> {
    store: Arc<S>,
    table: Arc<RoutingTable>,
    allowed_schemes: Vec<String>,
    public_host: Option<String>,
}

impl<S: LinkStore> Reconciler<S> {
    pub fn new(
        store: Arc<S>,
        table: Arc<RoutingTable>,
        allowed_schemes: Vec<String>,
        public_host: Option<String>,
    ) -> Self {
        Self {
            store,
            table,
            allowed_schemes,
            public_host,
        }
    }

    /// Runs one reconcile pass for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] only for store failures worth requeueing;
    /// validation failures resolve to `Ok(ReconcileOutcome::Invalidated)`.
    pub async fn reconcile(&self, code: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let started = Instant::now();
        let span = info_span!("reconcile", code = %code, outcome = tracing::field::Empty);
        let result = self.reconcile_inner(code).instrument(span.clone()).await;

        match &result {
            Ok(outcome) => {
                span.record("outcome", outcome.as_str());
                info!(code, outcome = outcome.as_str(), "reconcile pass complete");
                crate::metrics::record_reconcile(outcome.as_str(), started.elapsed());
            }
            Err(err) => {
                span.record("outcome", "error");
                warn!(code, error = %err, "reconcile pass failed");
                crate::metrics::record_reconcile("error", started.elapsed());
            }
        }

        result
    }

    async fn reconcile_inner(&self, code: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(link) = self.store.get(code).await? else {
            // Deleted (or never existed): retract unconditionally.
            if self.table.remove(code).await {
                info!(code, "route retracted for deleted shortlink");
            }
            return Ok(ReconcileOutcome::Removed);
        };

        match self.validate(&link) {
            Ok(()) => self.publish(link).await,
            Err(reason) => self.invalidate(link, reason).await,
        }
    }

    fn validate(&self, link: &ShortLink) -> Result<(), TargetValidationError> {
        validate_code(&link.spec.code)?;
        validate_target(
            &link.spec.code,
            &link.spec.target,
            &self.allowed_schemes,
            self.public_host.as_deref(),
        )
    }

    /// Pending -> Ready: publish the route, then record the observed state.
    ///
    /// The route goes out before the status write so a `Ready` status never
    /// precedes a servable route. The entry is versioned by the object's
    /// store revision, not its generation, so a re-created code cannot lose
    /// to the stale entry of its deleted predecessor.
    async fn publish(&self, link: ShortLink) -> Result<ReconcileOutcome, ReconcileError> {
        let target = link.spec.target.clone();
        self.table
            .put(RouteEntry::new(
                link.name.clone(),
                target.clone(),
                link.resource_version,
            ))
            .await;

        if link.is_reconciled() && link.status.condition == LinkCondition::Ready {
            return Ok(ReconcileOutcome::UpToDate);
        }

        let status = ShortLinkStatus::ready(target, link.generation);
        self.write_status(link, status).await?;
        Ok(ReconcileOutcome::Published)
    }

    /// Pending -> Invalid: retract any route (fail closed), record the reason.
    async fn invalidate(
        &self,
        link: ShortLink,
        reason: TargetValidationError,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if self.table.remove(&link.name).await {
            warn!(code = %link.name, %reason, "route retracted for invalid shortlink");
        }

        if link.is_reconciled() && link.status.condition == LinkCondition::Invalid {
            return Ok(ReconcileOutcome::UpToDate);
        }

        let status = ShortLinkStatus::invalid(reason.to_string(), link.generation);
        self.write_status(link, status).await?;
        Ok(ReconcileOutcome::Invalidated)
    }

    /// Writes status with bounded immediate retries on optimistic-concurrency
    /// conflicts, re-fetching between attempts.
    async fn write_status(
        &self,
        mut link: ShortLink,
        status: ShortLinkStatus,
    ) -> Result<(), ReconcileError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            link.status = status.clone();
            match self.store.update_status(&link).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict { .. }) => {
                    crate::metrics::record_reconcile_retry("conflict");
                    if attempt >= STATUS_WRITE_ATTEMPTS {
                        return Err(ReconcileError::ConflictExhausted {
                            code: link.name.clone(),
                            attempts: attempt,
                        });
                    }
                    warn!(code = %link.name, attempt, "status write conflict, re-fetching");
                    match self.store.get(&link.name).await? {
                        Some(current) if current.generation == link.generation => link = current,
                        // The spec moved on (or the object vanished) since
                        // this pass started; the pending watch event owns
                        // the newer state.
                        _ => return Ok(()),
                    }
                }
                Err(StoreError::NotFound(_)) => {
                    // Deleted mid-pass; the tombstone event will retract.
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
