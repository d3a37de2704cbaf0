//! [`DecisionExecutor`] – the execution-mode state machine.
//!
//! A decision starts in `NotExecuted` and is mutated exactly once, according
//! to its execution mode at call time:
//!
//! | mode | transition |
//! |---|---|
//! | `Auto` | run through the Action Catalog now → `Executed`, result stored |
//! | `UserApproval` | → `PendingApproval`, no catalog call |
//! | `Deferred` | → `Deferred`, no catalog call |
//!
//! No error handling is layered on top of the dispatch: the catalog's
//! graceful-degradation contract already absorbs handler failures, so an
//! `Auto` execution always ends `Executed` with a populated result.
//!
//! Decisions parked in `PendingApproval` or `Deferred` are resolved through
//! the explicit [`resolve_pending`][DecisionExecutor::resolve_pending] and
//! [`resume_deferred`][DecisionExecutor::resume_deferred] operations; calling
//! either from the wrong state is a fail-fast [`CoreError::Validation`].

use tracing::{debug, warn};
use volition_catalog::{ActionCatalog, ExecutionContext};
use volition_types::{ActionOutcome, CoreError, Decision, DecisionStatus, ExecutionMode};

/// Drives decisions through their one status transition.
#[derive(Debug, Default)]
pub struct DecisionExecutor;

impl DecisionExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Dispatch a freshly synthesized decision according to its execution
    /// mode.  Re-submitting a decision that already left `NotExecuted` is a
    /// warn-logged no-op: decisions are mutated exactly once.
    pub async fn execute(
        &self,
        decision: &mut Decision,
        catalog: &ActionCatalog,
        ctx: &ExecutionContext,
    ) {
        if decision.status != DecisionStatus::NotExecuted {
            warn!(
                decision = %decision.id,
                status = ?decision.status,
                "decision has already been dispatched; ignoring"
            );
            return;
        }

        match decision.execution_mode {
            ExecutionMode::Auto => {
                self.run(decision, catalog, ctx).await;
            }
            ExecutionMode::UserApproval => {
                debug!(decision = %decision.id, action = %decision.action, "awaiting operator approval");
                decision.status = DecisionStatus::PendingApproval;
            }
            ExecutionMode::Deferred => {
                debug!(decision = %decision.id, action = %decision.action, "deferred to the external scheduler");
                decision.status = DecisionStatus::Deferred;
            }
        }
    }

    /// Resolve a decision parked in `PendingApproval`.
    ///
    /// Approval executes the action now; rejection marks the decision
    /// `Executed` with a structured rejection outcome so the history shows
    /// what happened without any handler having run.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when the decision is not `PendingApproval`.
    pub async fn resolve_pending(
        &self,
        decision: &mut Decision,
        approved: bool,
        catalog: &ActionCatalog,
        ctx: &ExecutionContext,
    ) -> Result<(), CoreError> {
        if decision.status != DecisionStatus::PendingApproval {
            return Err(CoreError::Validation(format!(
                "decision {} is {:?}, not pending approval",
                decision.id, decision.status
            )));
        }
        if approved {
            self.run(decision, catalog, ctx).await;
        } else {
            debug!(decision = %decision.id, "operator rejected the decision");
            decision.result = Some(ActionOutcome::failure("rejected by operator"));
            decision.status = DecisionStatus::Executed;
        }
        Ok(())
    }

    /// Resume a decision parked in `Deferred`, executing it now.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when the decision is not `Deferred`.
    pub async fn resume_deferred(
        &self,
        decision: &mut Decision,
        catalog: &ActionCatalog,
        ctx: &ExecutionContext,
    ) -> Result<(), CoreError> {
        if decision.status != DecisionStatus::Deferred {
            return Err(CoreError::Validation(format!(
                "decision {} is {:?}, not deferred",
                decision.id, decision.status
            )));
        }
        self.run(decision, catalog, ctx).await;
        Ok(())
    }

    async fn run(&self, decision: &mut Decision, catalog: &ActionCatalog, ctx: &ExecutionContext) {
        debug!(decision = %decision.id, action = %decision.action, "executing decision");
        let outcome = catalog
            .execute(&decision.action, &decision.parameters, ctx)
            .await;
        decision.result = Some(outcome);
        decision.status = DecisionStatus::Executed;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
