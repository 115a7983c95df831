//! # Subscription Lifecycle State Machine
//!
//! ## States
//!
//! ```text
//! Incomplete ──▶ Active ◀──▶ PastDue ──▶ Unpaid ──▶ Active (payment recovered)
//!                  ▲
//! Trialing ────────┘
//!
//! any non-terminal ──▶ Canceled   (terminal)
//! any non-terminal ──▶ Superseded (terminal, plan change)
//! ```
//!
//! The validity window (`current_period_start` / `current_period_end`) is
//! informational. Nothing here expires a subscription when the window
//! passes; status changes only through an explicit transition, for example
//! the administrative lapse sweep in `caboard-store`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use caboard_core::{OrganizationId, PlanId, SubscriptionId, Timestamp, ValidationError};

// ─── Subscription Status ─────────────────────────────────────────────

/// Billing status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Created, first payment not yet confirmed.
    Incomplete,
    /// Free trial of a paid plan.
    Trialing,
    /// Paid and current.
    Active,
    /// Renewal payment failed, grace period.
    PastDue,
    /// Grace period exhausted.
    Unpaid,
    /// Cancelled by the customer or an operator (terminal).
    Canceled,
    /// Replaced by a newer subscription after a plan change (terminal).
    Superseded,
}

impl SubscriptionStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Superseded)
    }

    /// Whether a subscription in this status grants its plan.
    pub fn grants_plan(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// Canonical upper-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "INCOMPLETE",
            Self::Trialing => "TRIALING",
            Self::Active => "ACTIVE",
            Self::PastDue => "PAST_DUE",
            Self::Unpaid => "UNPAID",
            Self::Canceled => "CANCELED",
            Self::Superseded => "SUPERSEDED",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOMPLETE" => Ok(Self::Incomplete),
            "TRIALING" => Ok(Self::Trialing),
            "ACTIVE" => Ok(Self::Active),
            "PAST_DUE" => Ok(Self::PastDue),
            "UNPAID" => Ok(Self::Unpaid),
            "CANCELED" => Ok(Self::Canceled),
            "SUPERSEDED" => Ok(Self::Superseded),
            other => Err(ValidationError::Invalid(format!(
                "unknown subscription status: {other:?}"
            ))),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during subscription transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid subscription transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: SubscriptionStatus,
        /// Attempted target status.
        to: SubscriptionStatus,
    },

    /// Subscription is in a terminal status.
    #[error("subscription is in terminal status {status}")]
    TerminalState {
        /// The terminal status.
        status: SubscriptionStatus,
    },

    /// Period end precedes period start.
    #[error("period end {end} precedes period start {start}")]
    InvertedPeriod {
        /// Period start.
        start: Timestamp,
        /// Period end.
        end: Timestamp,
    },
}

// ─── Transition Evidence ─────────────────────────────────────────────

/// Why a transition happened and who asked for it.
#[derive(Debug, Clone)]
pub struct SubscriptionTransitionEvidence {
    /// Reason for the transition.
    pub reason: String,
    /// Operator or system component that initiated the transition.
    pub actor: Option<String>,
}

impl SubscriptionTransitionEvidence {
    /// Evidence with a reason and no actor.
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            actor: None,
        }
    }
}

/// Record of a subscription status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTransitionRecord {
    /// Status before the transition.
    pub from_state: SubscriptionStatus,
    /// Status after the transition.
    pub to_state: SubscriptionStatus,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Reason for the transition.
    pub reason: String,
    /// Who initiated it, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

// ─── Subscription ────────────────────────────────────────────────────

/// An organization's binding to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Row identifier.
    pub id: SubscriptionId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Referenced plan.
    pub plan_id: PlanId,
    /// Current billing status.
    pub status: SubscriptionStatus,
    /// Start of the current billing period.
    pub current_period_start: Timestamp,
    /// End of the current billing period, if bounded.
    pub current_period_end: Option<Timestamp>,
    /// When the subscription row was created.
    pub created_at: Timestamp,
    /// Ordered log of all status transitions.
    pub transitions: Vec<SubscriptionTransitionRecord>,
}

impl Subscription {
    /// Create a subscription in the given initial status.
    ///
    /// Only `Incomplete`, `Trialing` and `Active` are valid starting points.
    pub fn start(
        organization_id: OrganizationId,
        plan_id: PlanId,
        initial: SubscriptionStatus,
        current_period_start: Timestamp,
        current_period_end: Option<Timestamp>,
    ) -> Result<Self, SubscriptionError> {
        if !matches!(
            initial,
            SubscriptionStatus::Incomplete
                | SubscriptionStatus::Trialing
                | SubscriptionStatus::Active
        ) {
            return Err(SubscriptionError::InvalidTransition {
                from: SubscriptionStatus::Incomplete,
                to: initial,
            });
        }
        check_period(current_period_start, current_period_end)?;
        Ok(Self {
            id: SubscriptionId::new(),
            organization_id,
            plan_id,
            status: initial,
            current_period_start,
            current_period_end,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        })
    }

    /// Activate (INCOMPLETE, TRIALING, PAST_DUE or UNPAID → ACTIVE).
    pub fn activate(
        &mut self,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<(), SubscriptionError> {
        self.require_one_of(
            &[
                SubscriptionStatus::Incomplete,
                SubscriptionStatus::Trialing,
                SubscriptionStatus::PastDue,
                SubscriptionStatus::Unpaid,
            ],
            SubscriptionStatus::Active,
        )?;
        self.do_transition(SubscriptionStatus::Active, evidence);
        Ok(())
    }

    /// Renewal payment failed (ACTIVE or TRIALING → PAST_DUE).
    pub fn mark_past_due(
        &mut self,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<(), SubscriptionError> {
        self.require_one_of(
            &[SubscriptionStatus::Active, SubscriptionStatus::Trialing],
            SubscriptionStatus::PastDue,
        )?;
        self.do_transition(SubscriptionStatus::PastDue, evidence);
        Ok(())
    }

    /// Grace period exhausted (PAST_DUE → UNPAID).
    pub fn mark_unpaid(
        &mut self,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<(), SubscriptionError> {
        self.require_one_of(&[SubscriptionStatus::PastDue], SubscriptionStatus::Unpaid)?;
        self.do_transition(SubscriptionStatus::Unpaid, evidence);
        Ok(())
    }

    /// Cancel (any non-terminal → CANCELED).
    pub fn cancel(
        &mut self,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<(), SubscriptionError> {
        self.require_live()?;
        self.do_transition(SubscriptionStatus::Canceled, evidence);
        Ok(())
    }

    /// Replaced by a newer subscription (any non-terminal → SUPERSEDED).
    pub fn supersede(
        &mut self,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<(), SubscriptionError> {
        self.require_live()?;
        self.do_transition(SubscriptionStatus::Superseded, evidence);
        Ok(())
    }

    /// Move the billing window forward. Status is unchanged.
    pub fn renew(
        &mut self,
        start: Timestamp,
        end: Option<Timestamp>,
    ) -> Result<(), SubscriptionError> {
        self.require_live()?;
        check_period(start, end)?;
        self.current_period_start = start;
        self.current_period_end = end;
        Ok(())
    }

    /// Whether this subscription currently grants its plan.
    pub fn grants_plan(&self) -> bool {
        self.status.grants_plan()
    }

    /// Whether the subscription is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the billing window ended strictly before `now`.
    pub fn has_lapsed(&self, now: Timestamp) -> bool {
        matches!(self.current_period_end, Some(end) if end < now)
    }

    fn require_live(&self) -> Result<(), SubscriptionError> {
        if self.status.is_terminal() {
            return Err(SubscriptionError::TerminalState {
                status: self.status,
            });
        }
        Ok(())
    }

    fn require_one_of(
        &self,
        allowed: &[SubscriptionStatus],
        target: SubscriptionStatus,
    ) -> Result<(), SubscriptionError> {
        self.require_live()?;
        if !allowed.contains(&self.status) {
            return Err(SubscriptionError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: SubscriptionStatus, evidence: SubscriptionTransitionEvidence) {
        self.transitions.push(SubscriptionTransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: Timestamp::now(),
            reason: evidence.reason,
            actor: evidence.actor,
        });
        self.status = to;
    }
}

fn check_period(start: Timestamp, end: Option<Timestamp>) -> Result<(), SubscriptionError> {
    match end {
        Some(end) if end < start => Err(SubscriptionError::InvertedPeriod { start, end }),
        _ => Ok(()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
