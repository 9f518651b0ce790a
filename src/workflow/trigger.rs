// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Trigger evaluation against a lead's current state.

use chrono::{DateTime, Utc};

use super::{Trigger, WorkflowRule};
use crate::error::Result;
use crate::model::{Activity, Lead};
use crate::provider::LeadHistoryProvider;

/// Evaluates a trigger over already-fetched activities.
///
/// Inactivity is measured from the latest `completed_at`. Activities that
/// were never completed do not count, so a lead with only open activities is
/// measured from its creation time.
pub fn trigger_fires(
    trigger: &Trigger,
    lead: &Lead,
    activities: &[Activity],
    now: DateTime<Utc>,
) -> bool {
    match trigger {
        Trigger::Inactivity(config) => {
            let last_activity = activities
                .iter()
                .filter_map(|activity| activity.completed_at)
                .max()
                .unwrap_or(lead.created_at);
            (now - last_activity).num_days() >= i64::from(config.days)
        }
        Trigger::StatusChange(config) => lead.status == config.to_status,
        Trigger::TimeBased(_) => true,
    }
}

/// Checks whether `rule` fires for `lead` right now.
///
/// Only inactivity triggers read the lead's activity history.
pub async fn check_trigger_condition(
    provider: &dyn LeadHistoryProvider,
    rule: &WorkflowRule,
    lead: &Lead,
    now: DateTime<Utc>,
) -> Result<bool> {
    let activities = match rule.trigger {
        Trigger::Inactivity(_) => provider.get_activities_by_lead_id(lead.id).await?,
        _ => Vec::new(),
    };
    let fired = trigger_fires(&rule.trigger, lead, &activities, now);

    tracing::debug!(
        rule_id = rule.id,
        lead_id = lead.id,
        trigger = rule.trigger.kind(),
        fired,
        "Checked trigger condition"
    );

    Ok(fired)
}
