// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Action execution for fired workflow rules.
//!
//! Actions only record what should happen. `send_email` and `make_call` log
//! an activity; the email and voice services dispatch the real outreach.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Action, WorkflowRule};
use crate::error::Result;
use crate::model::{Lead, LeadId, LeadStatus, LeadUpdate, NewActivity, UserId};
use crate::provider::LeadHistoryProvider;

/// The user that automated activities are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationPrincipal {
    pub user_id: UserId,
    pub name: String,
}

/// The single log entry or mutation an action produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    ActivityLogged {
        activity_id: i64,
        activity_type: String,
    },
    StatusUpdated {
        from: LeadStatus,
        to: LeadStatus,
    },
    OwnerNotified {
        message: String,
    },
}

impl ActionOutcome {
    /// The status the lead is in after this outcome, if it changed.
    pub fn new_status(&self) -> Option<LeadStatus> {
        match self {
            ActionOutcome::StatusUpdated { to, .. } => Some(*to),
            _ => None,
        }
    }
}

fn automated_activity(
    lead_id: LeadId,
    principal: &AutomationPrincipal,
    activity_type: &str,
    description: String,
    now: DateTime<Utc>,
) -> NewActivity {
    NewActivity {
        lead_id,
        user_id: Some(principal.user_id),
        activity_type: activity_type.to_string(),
        description: Some(description),
        created_at: now,
        completed_at: Some(now),
    }
}

/// Runs the action of `rule` for `lead`, producing exactly one outcome.
pub async fn execute_action(
    provider: &dyn LeadHistoryProvider,
    rule: &WorkflowRule,
    lead: &Lead,
    principal: &AutomationPrincipal,
    now: DateTime<Utc>,
) -> Result<ActionOutcome> {
    let label = rule.label();

    let outcome = match &rule.action {
        Action::SendEmail(config) => {
            let detail = config
                .template
                .as_deref()
                .or(config.subject.as_deref())
                .map(|t| format!(" ({t})"))
                .unwrap_or_default();
            let activity = provider
                .create_activity(automated_activity(
                    lead.id,
                    principal,
                    "email",
                    format!("Automated email queued by workflow '{label}'{detail}"),
                    now,
                ))
                .await?;
            ActionOutcome::ActivityLogged {
                activity_id: activity.id,
                activity_type: activity.activity_type,
            }
        }
        Action::MakeCall(config) => {
            let detail = config
                .script
                .as_deref()
                .map(|s| format!(" ({s})"))
                .unwrap_or_default();
            let activity = provider
                .create_activity(automated_activity(
                    lead.id,
                    principal,
                    "call",
                    format!("Automated call queued by workflow '{label}'{detail}"),
                    now,
                ))
                .await?;
            ActionOutcome::ActivityLogged {
                activity_id: activity.id,
                activity_type: activity.activity_type,
            }
        }
        Action::UpdateStatus(config) => {
            provider
                .update_lead(lead.id, LeadUpdate::status(config.new_status))
                .await?;
            ActionOutcome::StatusUpdated {
                from: lead.status,
                to: config.new_status,
            }
        }
        Action::NotifyOwner(config) => {
            // Delivery belongs to the notification service.
            let message = config.message.clone().unwrap_or_else(|| {
                format!(
                    "Workflow '{label}' fired for {} (lead {})",
                    lead.company_name, lead.id
                )
            });
            ActionOutcome::OwnerNotified { message }
        }
    };

    tracing::info!(
        rule_id = rule.id,
        lead_id = lead.id,
        action = rule.action.kind(),
        principal = principal.user_id,
        "Workflow action executed"
    );

    Ok(outcome)
}
