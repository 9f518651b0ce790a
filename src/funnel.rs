// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Campaign funnel and per-channel outreach performance.
//!
//! Funnel stages count leads whose status is exactly the stage's status, not
//! leads that got at least that far. A campaign with 3 qualified and 2
//! converted leads reports 3 at the `Qualified` stage.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::error::Result;
use crate::model::{CampaignId, Channel, CommunicationLog, DeliveryStatus, Lead, LeadStatus};
use crate::provider::{LeadHistoryProvider, require_campaign};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Stage {
    #[strum(to_string = "Total Leads")]
    #[serde(rename = "Total Leads")]
    TotalLeads,
    Contacted,
    Responded,
    Qualified,
    Converted,
}

impl Stage {
    /// The status a lead must currently have to be counted in this stage.
    pub fn status(self) -> Option<LeadStatus> {
        match self {
            Stage::TotalLeads => None,
            Stage::Contacted => Some(LeadStatus::Contacted),
            Stage::Responded => Some(LeadStatus::Responded),
            Stage::Qualified => Some(LeadStatus::Qualified),
            Stage::Converted => Some(LeadStatus::Converted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub stage: Stage,
    pub count: usize,
    /// Share of all campaign leads, 0-100.
    pub percentage: f64,
    /// Previous stage count minus this stage count. Negative when a later
    /// stage holds more leads than the one before it.
    pub dropoff: i64,
}

/// Counts leads per stage in declared order.
pub fn conversion_funnel(leads: &[Lead]) -> Vec<FunnelStage> {
    let total = leads.len();
    let mut previous = total;

    Stage::iter()
        .map(|stage| {
            let count = match stage.status() {
                None => total,
                Some(status) => leads.iter().filter(|l| l.status == status).count(),
            };
            let percentage = percent(count, total);
            let dropoff = previous as i64 - count as i64;
            previous = count;
            FunnelStage {
                stage,
                count,
                percentage,
                dropoff,
            }
        })
        .collect()
}

/// How a channel's conversion rate is counted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversionBasis {
    /// Share of the channel's communications that belong to a won lead.
    /// A won lead with five emails weighs five times as much as one with one.
    #[default]
    Communication,
    /// Share of distinct leads touched on the channel that are won.
    Lead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPerformance {
    pub channel: Channel,
    pub total_sent: usize,
    pub total_opened: usize,
    pub total_clicked: usize,
    pub total_replied: usize,
    pub open_rate: f64,
    pub click_rate: f64,
    pub reply_rate: f64,
    pub conversion_rate: f64,
    /// Mean hours from send to reply over replied communications.
    pub avg_time_to_response: f64,
}

/// Aggregates email, call and SMS performance for a set of leads.
///
/// `logs` are the communication logs of `leads`; logs for other leads count
/// as non-converting.
pub fn channel_performance(
    leads: &[Lead],
    logs: &[CommunicationLog],
    basis: ConversionBasis,
) -> Vec<ChannelPerformance> {
    let status_by_lead: HashMap<_, _> = leads.iter().map(|l| (l.id, l.status)).collect();
    let is_won = |log: &CommunicationLog| {
        status_by_lead
            .get(&log.lead_id)
            .is_some_and(|status| status.is_won())
    };

    Channel::OUTREACH
        .iter()
        .map(|&channel| {
            let sent: Vec<&CommunicationLog> =
                logs.iter().filter(|log| log.channel == channel).collect();
            let with_status = |status: DeliveryStatus| {
                sent.iter()
                    .filter(|log| log.status == Some(status))
                    .count()
            };

            let total_sent = sent.len();
            let total_opened = with_status(DeliveryStatus::Opened);
            let total_clicked = with_status(DeliveryStatus::Clicked);
            let total_replied = with_status(DeliveryStatus::Replied);

            let conversion_rate = match basis {
                ConversionBasis::Communication => {
                    percent(sent.iter().filter(|log| is_won(**log)).count(), total_sent)
                }
                ConversionBasis::Lead => {
                    let touched: HashSet<_> = sent.iter().map(|log| log.lead_id).collect();
                    let won = touched
                        .iter()
                        .filter(|id| status_by_lead.get(*id).is_some_and(|s| s.is_won()))
                        .count();
                    percent(won, touched.len())
                }
            };

            ChannelPerformance {
                channel,
                total_sent,
                total_opened,
                total_clicked,
                total_replied,
                open_rate: percent(total_opened, total_sent),
                click_rate: percent(total_clicked, total_sent),
                reply_rate: percent(total_replied, total_sent),
                conversion_rate,
                avg_time_to_response: average_response_hours(&sent),
            }
        })
        .collect()
}

fn average_response_hours(logs: &[&CommunicationLog]) -> f64 {
    let hours: Vec<f64> = logs
        .iter()
        .filter(|log| log.status == Some(DeliveryStatus::Replied))
        .filter_map(|log| {
            let sent_at = log.sent_at?;
            Some((log.created_at - sent_at).num_milliseconds() as f64 / MILLIS_PER_HOUR)
        })
        .collect();

    if hours.is_empty() {
        0.0
    } else {
        hours.iter().sum::<f64>() / hours.len() as f64
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Computes the stage funnel for a campaign.
pub async fn get_conversion_funnel(
    provider: &dyn LeadHistoryProvider,
    campaign_id: CampaignId,
) -> Result<Vec<FunnelStage>> {
    require_campaign(provider, campaign_id).await?;
    let leads = provider.get_leads_by_campaign_id(campaign_id).await?;
    Ok(conversion_funnel(&leads))
}

/// Computes per-channel performance for a campaign.
pub async fn get_channel_performance(
    provider: &dyn LeadHistoryProvider,
    campaign_id: CampaignId,
    basis: ConversionBasis,
    concurrency: usize,
) -> Result<Vec<ChannelPerformance>> {
    require_campaign(provider, campaign_id).await?;
    let leads = provider.get_leads_by_campaign_id(campaign_id).await?;

    let per_lead: Vec<Vec<CommunicationLog>> = stream::iter(&leads)
        .map(|lead| provider.get_communication_logs_by_lead_id(lead.id))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    let logs: Vec<CommunicationLog> = per_lead.into_iter().flatten().collect();

    tracing::debug!(
        campaign_id,
        leads = leads.len(),
        communications = logs.len(),
        basis = %basis,
        "Aggregating channel performance"
    );

    Ok(channel_performance(&leads, &logs, basis))
}
