// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Campaign sweeps: every active rule against every lead, once per tick.
//!
//! Each lead is one unit of work. Its rules are checked and executed in rule
//! order, and the lead is re-read after a status change so later rules see
//! the new status. Leads run with bounded parallelism and never share state.
//! A failing lead is logged and reported without stopping the sweep.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkflowRule;
use super::action::{ActionOutcome, AutomationPrincipal, execute_action};
use super::trigger::check_trigger_condition;
use crate::error::Result;
use crate::model::{CampaignId, Lead, LeadId, RuleId};
use crate::provider::{LeadHistoryProvider, require_campaign, require_lead};

/// One rule that fired for one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExecution {
    pub rule_id: RuleId,
    pub lead_id: LeadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleExecution {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub run_id: Uuid,
    pub campaign_id: CampaignId,
    pub leads_evaluated: usize,
    /// Rule/lead pairs checked.
    pub checks: usize,
    pub fired: usize,
    pub failed: usize,
    /// Invalid rules left out of the sweep.
    pub skipped_rules: Vec<RuleId>,
    pub executions: Vec<RuleExecution>,
}

/// The result of one scheduler tick across campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub run_id: Uuid,
    pub sweeps: Vec<SweepReport>,
    /// Campaigns whose sweep could not start, with the reason.
    pub failed_campaigns: Vec<(CampaignId, String)>,
}

#[derive(Debug, Default)]
struct LeadSweep {
    checks: usize,
    executions: Vec<RuleExecution>,
}

/// Evaluates workflow rules and runs their actions.
pub struct WorkflowEngine {
    provider: Arc<dyn LeadHistoryProvider>,
    principal: AutomationPrincipal,
    concurrency: usize,
}

impl WorkflowEngine {
    pub fn new(
        provider: Arc<dyn LeadHistoryProvider>,
        principal: AutomationPrincipal,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            principal,
            concurrency: concurrency.max(1),
        }
    }

    pub fn principal(&self) -> &AutomationPrincipal {
        &self.principal
    }

    /// Checks one rule against one lead without acting on it.
    pub async fn check(
        &self,
        rule: &WorkflowRule,
        lead_id: LeadId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        rule.validate()?;
        let lead = require_lead(self.provider.as_ref(), lead_id).await?;
        check_trigger_condition(self.provider.as_ref(), rule, &lead, now).await
    }

    /// Runs one rule's action for a lead the caller has already checked.
    pub async fn execute(
        &self,
        rule: &WorkflowRule,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome> {
        execute_action(self.provider.as_ref(), rule, lead, &self.principal, now).await
    }

    /// Sweeps the active rules of one campaign over all its leads.
    ///
    /// Rules for other campaigns and inactive rules are ignored.
    pub async fn sweep(
        &self,
        campaign_id: CampaignId,
        rules: &[WorkflowRule],
        now: DateTime<Utc>,
    ) -> Result<SweepReport> {
        self.sweep_with_run_id(Uuid::new_v4(), campaign_id, rules, now)
            .await
    }

    async fn sweep_with_run_id(
        &self,
        run_id: Uuid,
        campaign_id: CampaignId,
        rules: &[WorkflowRule],
        now: DateTime<Utc>,
    ) -> Result<SweepReport> {
        require_campaign(self.provider.as_ref(), campaign_id).await?;

        let mut skipped_rules = Vec::new();
        let active: Vec<&WorkflowRule> = rules
            .iter()
            .filter(|rule| rule.is_active && rule.campaign_id == campaign_id)
            .filter(|rule| match rule.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(rule_id = rule.id, error = %e, "Skipping invalid workflow rule");
                    skipped_rules.push(rule.id);
                    false
                }
            })
            .collect();

        let leads = self
            .provider
            .get_leads_by_campaign_id(campaign_id)
            .await?;

        tracing::info!(
            run_id = %run_id,
            campaign_id,
            rules = active.len(),
            leads = leads.len(),
            "Starting workflow sweep"
        );

        let per_lead: Vec<LeadSweep> = stream::iter(leads)
            .map(|lead| self.sweep_lead(&active, lead, now))
            .buffered(self.concurrency)
            .collect()
            .await;

        let leads_evaluated = per_lead.len();
        let checks = per_lead.iter().map(|l| l.checks).sum();
        let executions: Vec<RuleExecution> =
            per_lead.into_iter().flat_map(|l| l.executions).collect();
        let failed = executions.iter().filter(|e| !e.succeeded()).count();

        let report = SweepReport {
            run_id,
            campaign_id,
            leads_evaluated,
            checks,
            fired: executions.len() - failed,
            failed,
            skipped_rules,
            executions,
        };

        tracing::info!(
            run_id = %run_id,
            campaign_id,
            checks = report.checks,
            fired = report.fired,
            failed = report.failed,
            "Workflow sweep completed"
        );

        Ok(report)
    }

    async fn sweep_lead(
        &self,
        rules: &[&WorkflowRule],
        mut lead: Lead,
        now: DateTime<Utc>,
    ) -> LeadSweep {
        let provider = self.provider.as_ref();
        let mut sweep = LeadSweep::default();

        for rule in rules {
            sweep.checks += 1;

            let result = match check_trigger_condition(provider, rule, &lead, now).await {
                Ok(false) => continue,
                Ok(true) => execute_action(provider, rule, &lead, &self.principal, now).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) => {
                    if let Some(status) = outcome.new_status() {
                        lead = match provider.get_lead_by_id(lead.id).await {
                            Ok(Some(fresh)) => fresh,
                            Ok(None) => Lead { status, ..lead },
                            Err(e) => {
                                tracing::warn!(
                                    lead_id = lead.id,
                                    error = %e,
                                    "Lead re-read failed after status change, keeping new status"
                                );
                                Lead { status, ..lead }
                            }
                        };
                    }
                    sweep.executions.push(RuleExecution {
                        rule_id: rule.id,
                        lead_id: lead.id,
                        outcome: Some(outcome),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        rule_id = rule.id,
                        lead_id = lead.id,
                        error = %e,
                        "Workflow rule failed for lead"
                    );
                    sweep.executions.push(RuleExecution {
                        rule_id: rule.id,
                        lead_id: lead.id,
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        sweep
    }

    /// Runs one scheduler tick: sweeps every campaign that has an active rule.
    pub async fn tick(&self, rules: &[WorkflowRule], now: DateTime<Utc>) -> TickReport {
        let run_id = Uuid::new_v4();

        let mut by_campaign: BTreeMap<CampaignId, Vec<WorkflowRule>> = BTreeMap::new();
        for rule in rules.iter().filter(|r| r.is_active) {
            by_campaign
                .entry(rule.campaign_id)
                .or_default()
                .push(rule.clone());
        }

        let mut sweeps = Vec::new();
        let mut failed_campaigns = Vec::new();
        for (campaign_id, campaign_rules) in by_campaign {
            match self
                .sweep_with_run_id(run_id, campaign_id, &campaign_rules, now)
                .await
            {
                Ok(report) => sweeps.push(report),
                Err(e) => {
                    tracing::warn!(run_id = %run_id, campaign_id, error = %e, "Campaign sweep failed");
                    failed_campaigns.push((campaign_id, e.to_string()));
                }
            }
        }

        TickReport {
            run_id,
            sweeps,
            failed_campaigns,
        }
    }
}
