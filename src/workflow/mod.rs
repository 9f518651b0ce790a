// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Nurturing workflows: declarative trigger → action rules over a campaign.
//!
//! A [`WorkflowRule`] pairs a [`Trigger`] with an [`Action`]. Rules keep no
//! state between ticks; an external scheduler calls
//! [`WorkflowEngine::tick`] periodically and every active rule is checked
//! against every lead of its campaign from scratch.
//!
//! ```json
//! {
//!   "id": 1,
//!   "campaignId": 7,
//!   "name": "Nudge quiet leads",
//!   "trigger": { "type": "inactivity", "config": { "days": 7 } },
//!   "action": { "type": "send_email", "config": { "template": "nudge" } },
//!   "isActive": true
//! }
//! ```
//!
//! Status-change triggers are level-triggered: a lead sitting in the target
//! status fires the rule on every tick until the status or the rule changes.

pub mod action;
pub mod engine;
pub mod trigger;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{CampaignId, LeadStatus, RuleId};

pub use action::{ActionOutcome, AutomationPrincipal, execute_action};
pub use engine::{RuleExecution, SweepReport, TickReport, WorkflowEngine};
pub use trigger::{check_trigger_condition, trigger_fires};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRule {
    pub id: RuleId,
    pub campaign_id: CampaignId,
    #[serde(default)]
    pub name: Option<String>,
    pub trigger: Trigger,
    pub action: Action,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum Trigger {
    Inactivity(InactivityTrigger),
    StatusChange(StatusChangeTrigger),
    TimeBased(TimeBasedTrigger),
}

impl Trigger {
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Inactivity(_) => "inactivity",
            Trigger::StatusChange(_) => "status_change",
            Trigger::TimeBased(_) => "time_based",
        }
    }
}

/// Fires once a lead has gone `days` days without a completed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityTrigger {
    pub days: u32,
}

/// Fires while a lead is in `to_status`. `from_status` is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeTrigger {
    #[serde(default)]
    pub from_status: Option<LeadStatus>,
    #[serde(alias = "targetStatus")]
    pub to_status: LeadStatus,
}

/// Fires whenever evaluated; the external scheduler owns the timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBasedTrigger {
    /// Cron expression, five (minute-first) or six/seven (second-first) fields.
    pub schedule: String,
}

impl TimeBasedTrigger {
    pub fn parse_schedule(&self) -> std::result::Result<cron::Schedule, cron::error::Error> {
        let expression = self.schedule.trim();
        if expression.split_whitespace().count() == 5 {
            cron::Schedule::from_str(&format!("0 {expression}"))
        } else {
            cron::Schedule::from_str(expression)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum Action {
    SendEmail(EmailAction),
    MakeCall(CallAction),
    UpdateStatus(StatusAction),
    NotifyOwner(NotifyAction),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SendEmail(_) => "send_email",
            Action::MakeCall(_) => "make_call",
            Action::UpdateStatus(_) => "update_status",
            Action::NotifyOwner(_) => "notify_owner",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAction {
    pub subject: Option<String>,
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallAction {
    pub script: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAction {
    pub new_status: LeadStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyAction {
    pub message: Option<String>,
}

impl WorkflowRule {
    /// Display label: the rule name, or `rule <id>`.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("rule {}", self.id))
    }

    /// Rejects configurations that can never evaluate meaningfully.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidRule {
            rule_id: self.id,
            reason,
        };

        match &self.trigger {
            Trigger::Inactivity(config) if config.days == 0 => {
                return Err(invalid("inactivity days must be at least 1".into()));
            }
            Trigger::TimeBased(config) => {
                config
                    .parse_schedule()
                    .map_err(|e| invalid(format!("bad schedule '{}': {e}", config.schedule)))?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn rule(id: RuleId, trigger: Trigger, action: Action) -> WorkflowRule {
        WorkflowRule {
            id,
            campaign_id: 1,
            name: None,
            trigger,
            action,
            is_active: true,
        }
    }

    #[test]
    fn parses_rule_json() {
        let json = r#"{
            "id": 4,
            "campaignId": 2,
            "name": "Nudge",
            "trigger": { "type": "inactivity", "config": { "days": 7 } },
            "action": { "type": "send_email", "config": { "template": "nudge" } }
        }"#;
        let rule: WorkflowRule = serde_json::from_str(json).unwrap();
        assert!(rule.is_active);
        assert_eq!(rule.trigger, Trigger::Inactivity(InactivityTrigger { days: 7 }));
        assert_eq!(
            rule.action,
            Action::SendEmail(EmailAction {
                subject: None,
                template: Some("nudge".into()),
            })
        );
        assert_eq!(rule.label(), "Nudge");
    }

    #[test]
    fn status_change_accepts_target_status_alias() {
        let json = r#"{ "type": "status_change", "config": { "targetStatus": "qualified" } }"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(
            trigger,
            Trigger::StatusChange(StatusChangeTrigger {
                from_status: None,
                to_status: LeadStatus::Qualified,
            })
        );

        let json = r#"{ "type": "status_change",
                        "config": { "fromStatus": "contacted", "toStatus": "responded" } }"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.kind(), "status_change");
    }

    #[test]
    fn update_status_action_parses_new_status() {
        let json = r#"{ "type": "update_status", "config": { "newStatus": "contacted" } }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(
            action,
            Action::UpdateStatus(StatusAction {
                new_status: LeadStatus::Contacted
            })
        );
    }

    #[test]
    fn validate_rejects_zero_day_inactivity() {
        let r = rule(
            9,
            Trigger::Inactivity(InactivityTrigger { days: 0 }),
            Action::NotifyOwner(NotifyAction::default()),
        );
        let err = r.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRule { rule_id: 9, .. }));
    }

    #[test]
    fn validate_accepts_five_and_six_field_cron() {
        for schedule in ["0 9 * * Mon-Fri", "0 0 9 * * *"] {
            let r = rule(
                1,
                Trigger::TimeBased(TimeBasedTrigger {
                    schedule: schedule.into(),
                }),
                Action::NotifyOwner(NotifyAction::default()),
            );
            assert!(r.validate().is_ok(), "schedule {schedule} should parse");
        }

        let r = rule(
            2,
            Trigger::TimeBased(TimeBasedTrigger {
                schedule: "every morning".into(),
            }),
            Action::NotifyOwner(NotifyAction::default()),
        );
        assert!(r.validate().is_err());
    }
}
