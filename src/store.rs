// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Snapshot-backed lead history store.
//!
//! A snapshot is one JSON document holding everything the engine reads:
//!
//! ```json
//! {
//!   "campaigns": [{ "id": 1, "clientId": 1, "name": "Q3 Nordics" }],
//!   "leads": [...],
//!   "communicationLogs": [...],
//!   "activities": [...],
//!   "scrapedData": [...],
//!   "workflowRules": [...]
//! }
//! ```
//!
//! Writes made by workflow actions are applied to the in-memory copy only.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    Activity, Campaign, CampaignId, CommunicationLog, Lead, LeadId, LeadUpdate, NewActivity,
    NewCommunicationLog, RuleId, ScrapedData,
};
use crate::provider::LeadHistoryProvider;
use crate::workflow::WorkflowRule;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub campaigns: Vec<Campaign>,
    pub leads: Vec<Lead>,
    pub communication_logs: Vec<CommunicationLog>,
    pub activities: Vec<Activity>,
    pub scraped_data: Vec<ScrapedData>,
    pub workflow_rules: Vec<WorkflowRule>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Snapshot(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Snapshot(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }
}

/// An in-process [`LeadHistoryProvider`] over a [`Snapshot`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Snapshot>,
}

impl InMemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = Snapshot::load(path)?;
        tracing::info!(
            path = %path.display(),
            campaigns = snapshot.campaigns.len(),
            leads = snapshot.leads.len(),
            rules = snapshot.workflow_rules.len(),
            "Loaded lead snapshot"
        );
        Ok(Self::new(snapshot))
    }

    /// A copy of the current state, including writes.
    pub async fn snapshot(&self) -> Snapshot {
        self.data.read().await.clone()
    }

    /// Workflow rules, optionally limited to one campaign.
    pub async fn workflow_rules(&self, campaign_id: Option<CampaignId>) -> Vec<WorkflowRule> {
        self.data
            .read()
            .await
            .workflow_rules
            .iter()
            .filter(|rule| campaign_id.is_none_or(|id| rule.campaign_id == id))
            .cloned()
            .collect()
    }

    pub async fn workflow_rule(&self, id: RuleId) -> Result<WorkflowRule> {
        self.data
            .read()
            .await
            .workflow_rules
            .iter()
            .find(|rule| rule.id == id)
            .cloned()
            .ok_or(Error::RuleNotFound(id))
    }
}

#[async_trait]
impl LeadHistoryProvider for InMemoryStore {
    async fn get_campaign_by_id(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let data = self.data.read().await;
        Ok(data.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn get_lead_by_id(&self, id: LeadId) -> Result<Option<Lead>> {
        let data = self.data.read().await;
        Ok(data.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn get_leads_by_campaign_id(&self, campaign_id: CampaignId) -> Result<Vec<Lead>> {
        let data = self.data.read().await;
        Ok(data
            .leads
            .iter()
            .filter(|l| l.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn get_communication_logs_by_lead_id(
        &self,
        lead_id: LeadId,
    ) -> Result<Vec<CommunicationLog>> {
        let data = self.data.read().await;
        Ok(data
            .communication_logs
            .iter()
            .filter(|c| c.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn get_activities_by_lead_id(&self, lead_id: LeadId) -> Result<Vec<Activity>> {
        let data = self.data.read().await;
        Ok(data
            .activities
            .iter()
            .filter(|a| a.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn get_scraped_data_by_lead_id(&self, lead_id: LeadId) -> Result<Vec<ScrapedData>> {
        let data = self.data.read().await;
        let mut rows: Vec<ScrapedData> = data
            .scraped_data
            .iter()
            .filter(|s| s.lead_id == lead_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        Ok(rows)
    }

    async fn update_lead(&self, id: LeadId, update: LeadUpdate) -> Result<()> {
        let mut data = self.data.write().await;
        let lead = data
            .leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(Error::LeadNotFound(id))?;
        if let Some(status) = update.status {
            lead.status = status;
        }
        if let Some(at) = update.last_contacted_at {
            lead.last_contacted_at = Some(at);
        }
        Ok(())
    }

    async fn create_activity(&self, activity: NewActivity) -> Result<Activity> {
        let mut data = self.data.write().await;
        let id = data.activities.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let activity = Activity {
            id,
            lead_id: activity.lead_id,
            user_id: activity.user_id,
            activity_type: activity.activity_type,
            description: activity.description,
            created_at: activity.created_at,
            completed_at: activity.completed_at,
        };
        data.activities.push(activity.clone());
        Ok(activity)
    }

    async fn create_communication_log(
        &self,
        log: NewCommunicationLog,
    ) -> Result<CommunicationLog> {
        let mut data = self.data.write().await;
        let id = data
            .communication_logs
            .iter()
            .map(|c| c.id)
            .max()
            .unwrap_or(0)
            + 1;
        let log = CommunicationLog {
            id,
            lead_id: log.lead_id,
            channel: log.channel,
            direction: log.direction,
            status: log.status,
            subject: log.subject,
            content: log.content,
            sent_at: log.sent_at,
            created_at: log.created_at,
        };
        data.communication_logs.push(log.clone());
        Ok(log)
    }
}
