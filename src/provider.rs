// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The lead history store seen from the analytics engine.
//!
//! Implement [`LeadHistoryProvider`] to plug the engine into a CRM database
//! or API. [`crate::store::InMemoryStore`] implements it over a JSON snapshot.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{
    Activity, Campaign, CampaignId, CommunicationLog, Lead, LeadId, LeadUpdate, NewActivity,
    NewCommunicationLog, ScrapedData,
};

/// Read access to lead history plus the few writes workflow actions need.
#[async_trait]
pub trait LeadHistoryProvider: Send + Sync {
    async fn get_campaign_by_id(&self, id: CampaignId) -> Result<Option<Campaign>>;

    async fn get_lead_by_id(&self, id: LeadId) -> Result<Option<Lead>>;

    async fn get_leads_by_campaign_id(&self, campaign_id: CampaignId) -> Result<Vec<Lead>>;

    async fn get_communication_logs_by_lead_id(
        &self,
        lead_id: LeadId,
    ) -> Result<Vec<CommunicationLog>>;

    async fn get_activities_by_lead_id(&self, lead_id: LeadId) -> Result<Vec<Activity>>;

    /// Newest first: index 0 is the latest snapshot.
    async fn get_scraped_data_by_lead_id(&self, lead_id: LeadId) -> Result<Vec<ScrapedData>>;

    async fn update_lead(&self, id: LeadId, update: LeadUpdate) -> Result<()>;

    async fn create_activity(&self, activity: NewActivity) -> Result<Activity>;

    async fn create_communication_log(&self, log: NewCommunicationLog)
    -> Result<CommunicationLog>;
}

/// Fetches a lead or fails with [`Error::LeadNotFound`].
pub async fn require_lead(provider: &dyn LeadHistoryProvider, id: LeadId) -> Result<Lead> {
    provider
        .get_lead_by_id(id)
        .await?
        .ok_or(Error::LeadNotFound(id))
}

/// Fetches a campaign or fails with [`Error::CampaignNotFound`].
pub async fn require_campaign(
    provider: &dyn LeadHistoryProvider,
    id: CampaignId,
) -> Result<Campaign> {
    provider
        .get_campaign_by_id(id)
        .await?
        .ok_or(Error::CampaignNotFound(id))
}
