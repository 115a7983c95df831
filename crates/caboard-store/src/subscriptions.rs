//! Subscription lifecycle operations.
//!
//! An organization has at most one non-terminal subscription. Plan changes
//! supersede it and start a new ACTIVE one in the same write section.
//! Nothing here runs on a timer: [`Ledger::expire_lapsed`] is an explicit
//! administrative action.

use serde::{Deserialize, Serialize};

use caboard_core::{OrganizationId, PlanId, PlanTier, SubscriptionId, Timestamp};
use caboard_state::{Subscription, SubscriptionStatus, SubscriptionTransitionEvidence};

use crate::change::{ChangeSet, Row};
use crate::error::StoreError;
use crate::ledger::{Ledger, Writer};

/// Administrative status change applied to the live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Activate,
    MarkPastDue,
    MarkUnpaid,
    Cancel,
}

impl Writer<'_> {
    fn live_subscription(&self, org: OrganizationId) -> Option<Subscription> {
        self.tables()
            .subscriptions
            .values()
            .find(|s| s.organization_id == org && !s.is_terminal())
            .cloned()
    }
}

impl Ledger {
    /// Start an organization's first (or next, after cancellation)
    /// subscription. Fails if a live one exists; use
    /// [`change_plan`](Self::change_plan) instead.
    pub fn subscribe(
        &self,
        org: OrganizationId,
        plan: PlanId,
        initial: SubscriptionStatus,
        period_start: Timestamp,
        period_end: Option<Timestamp>,
    ) -> Result<(Subscription, ChangeSet), StoreError> {
        self.write(|w| {
            w.tables().organization(org)?;
            if w.tables().catalog.by_id(plan).is_none() {
                return Err(StoreError::not_found("plan", plan));
            }
            if let Some(live) = w.live_subscription(org) {
                return Err(StoreError::Conflict(format!(
                    "organization {org} already has live subscription {}",
                    live.id
                )));
            }
            let sub = Subscription::start(org, plan, initial, period_start, period_end)?;
            w.put(Row::Subscription(sub.clone()));
            Ok(sub)
        })
    }

    /// Move the organization to the catalog plan of `tier`.
    ///
    /// The live subscription, if any, becomes SUPERSEDED and a new ACTIVE
    /// subscription starts. Both rows change together.
    pub fn change_plan(
        &self,
        org: OrganizationId,
        tier: PlanTier,
        period_start: Timestamp,
        period_end: Option<Timestamp>,
        actor: Option<String>,
    ) -> Result<(Subscription, ChangeSet), StoreError> {
        self.write(|w| {
            w.tables().organization(org)?;
            let plan = w
                .tables()
                .catalog
                .by_tier(tier)
                .map(|p| p.id)
                .ok_or_else(|| StoreError::Configuration(format!("no {tier} plan in catalog")))?;

            if let Some(mut previous) = w.live_subscription(org) {
                previous.supersede(SubscriptionTransitionEvidence {
                    reason: format!("plan changed to {tier}"),
                    actor: actor.clone(),
                })?;
                w.put(Row::Subscription(previous));
            }
            let sub = Subscription::start(
                org,
                plan,
                SubscriptionStatus::Active,
                period_start,
                period_end,
            )?;
            w.put(Row::Subscription(sub.clone()));
            tracing::info!(organization = %org, tier = %tier, subscription = %sub.id, "plan changed");
            Ok(sub)
        })
    }

    /// Apply `action` to the organization's live subscription.
    pub fn transition_subscription(
        &self,
        org: OrganizationId,
        action: SubscriptionAction,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<(Subscription, ChangeSet), StoreError> {
        self.write(|w| {
            let mut sub = w
                .live_subscription(org)
                .ok_or_else(|| StoreError::not_found("live subscription for organization", org))?;
            match action {
                SubscriptionAction::Activate => sub.activate(evidence)?,
                SubscriptionAction::MarkPastDue => sub.mark_past_due(evidence)?,
                SubscriptionAction::MarkUnpaid => sub.mark_unpaid(evidence)?,
                SubscriptionAction::Cancel => sub.cancel(evidence)?,
            }
            w.put(Row::Subscription(sub.clone()));
            Ok(sub)
        })
    }

    /// Cancel every ACTIVE or TRIALING subscription whose billing window
    /// ended before `now`.
    pub fn expire_lapsed(
        &self,
        now: Timestamp,
    ) -> Result<(Vec<SubscriptionId>, ChangeSet), StoreError> {
        self.write(|w| {
            let mut lapsed: Vec<Subscription> = w
                .tables()
                .subscriptions
                .values()
                .filter(|s| s.grants_plan() && s.has_lapsed(now))
                .cloned()
                .collect();
            lapsed.sort_by_key(|s| s.id);
            let mut expired = Vec::with_capacity(lapsed.len());
            for mut sub in lapsed {
                sub.cancel(SubscriptionTransitionEvidence::because(format!(
                    "billing period ended before {now}"
                )))?;
                expired.push(sub.id);
                w.put(Row::Subscription(sub));
            }
            if !expired.is_empty() {
                tracing::info!(count = expired.len(), "lapsed subscriptions canceled");
            }
            Ok(expired)
        })
    }
}
