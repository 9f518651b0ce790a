// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Lead prioritization: who should sales reach out to next, and how.
//!
//! The score is additive. Every rule below adds (or removes) points from one
//! running total, which is clamped to `0..=100` at the end:
//!
//! | Signal | Points |
//! |---|---|
//! | ICP fit | `confidence × 0.4` |
//! | Email reply / else email open | +30 / +15 |
//! | Any call | +10 |
//! | Hiring signals in latest scrape | +20 |
//! | Funding language in latest scrape | +10 |
//! | Growth language in latest scrape | +5 |
//! | Contacted less than a day ago | −10 |
//! | Last contact 3 to 7 days ago | +10 |
//! | Last contact over 14 days ago | +5 |
//! | Responded / qualified | +15 / +20 |
//!
//! Unqualified and rejected leads always score zero.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Result;
use crate::journey::{LeadJourney, journey_for_lead};
use crate::model::{CampaignId, Channel, DeliveryStatus, Lead, LeadId, LeadStatus, ScrapedData};
use crate::provider::{LeadHistoryProvider, require_campaign, require_lead};

/// Reported in place of a day count for leads that were never contacted.
pub const NEVER_CONTACTED_DAYS: i64 = 999;

const FUNDING_TERMS: [&str; 3] = ["funding", "series", "investment"];
const GROWTH_TERMS: [&str; 2] = ["expanding", "growth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Urgency::High
        } else if score >= 40.0 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// The single next step suggested for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum RecommendedAction {
    #[strum(to_string = "Make a phone call")]
    #[serde(rename = "Make a phone call")]
    MakePhoneCall,
    #[strum(to_string = "Send follow-up email")]
    #[serde(rename = "Send follow-up email")]
    SendFollowUpEmail,
    #[strum(to_string = "Re-engage with new approach")]
    #[serde(rename = "Re-engage with new approach")]
    Reengage,
    #[strum(to_string = "Send initial outreach email")]
    #[serde(rename = "Send initial outreach email")]
    SendInitialOutreach,
    #[strum(to_string = "Schedule demo or meeting")]
    #[serde(rename = "Schedule demo or meeting")]
    ScheduleMeeting,
    #[strum(to_string = "Review lead")]
    #[serde(rename = "Review lead")]
    ReviewLead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityScore {
    /// 0-100.
    pub priority_score: f64,
    pub reasons: Vec<String>,
    pub recommended_action: RecommendedAction,
    pub urgency: Urgency,
    /// Whole days since the last contact, or [`NEVER_CONTACTED_DAYS`].
    pub days_since_last_contact: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedLead {
    pub lead_id: LeadId,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub status: LeadStatus,
    #[serde(flatten)]
    pub priority: PriorityScore,
}

/// Engagement counts the score and the recommendation both read.
#[derive(Debug, Clone, Copy, Default)]
struct Engagement {
    email_replies: usize,
    email_opens: usize,
    calls: usize,
}

impl Engagement {
    fn from_journey(journey: &LeadJourney) -> Self {
        Self {
            email_replies: journey.count_with_status(Channel::Email, DeliveryStatus::Replied),
            email_opens: journey.count_with_status(Channel::Email, DeliveryStatus::Opened),
            calls: journey.count_channel(Channel::Call),
        }
    }
}

fn days_since_last_contact(lead: &Lead, now: DateTime<Utc>) -> i64 {
    lead.last_contacted_at
        .map_or(NEVER_CONTACTED_DAYS, |at| (now - at).num_days())
}

fn mentions_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}

/// Scores a lead from already-fetched history.
///
/// `latest_scrape` is the most recent scraped-data row, if any.
pub fn score_lead(
    lead: &Lead,
    journey: &LeadJourney,
    latest_scrape: Option<&ScrapedData>,
    now: DateTime<Utc>,
) -> PriorityScore {
    let mut score = lead.confidence_score * 0.4;
    let mut reasons = Vec::new();

    if lead.confidence_score >= 80.0 {
        reasons.push(format!(
            "Strong ICP fit ({:.0}% confidence)",
            lead.confidence_score
        ));
    }

    let engagement = Engagement::from_journey(journey);
    if engagement.email_replies > 0 {
        score += 30.0;
        reasons.push(format!("Replied to {} email(s)", engagement.email_replies));
    } else if engagement.email_opens > 0 {
        score += 15.0;
        reasons.push(format!("Opened {} email(s)", engagement.email_opens));
    }
    if engagement.calls > 0 {
        score += 10.0;
        reasons.push(format!("{} call(s) on record", engagement.calls));
    }

    if let Some(scrape) = latest_scrape {
        if !scrape.hiring_signals.is_empty() {
            score += 20.0;
            reasons.push(format!(
                "Actively hiring ({} signal(s))",
                scrape.hiring_signals.len()
            ));
        }
        let content = scrape.raw.to_string().to_lowercase();
        if mentions_any(&content, &FUNDING_TERMS) {
            score += 10.0;
            reasons.push("Recent funding or investment news".to_string());
        }
        if mentions_any(&content, &GROWTH_TERMS) {
            score += 5.0;
            reasons.push("Company is expanding".to_string());
        }
    }

    let days = days_since_last_contact(lead, now);
    if days < 1 {
        score -= 10.0;
        reasons.push("Contacted in the last day, give them space".to_string());
    } else if (3..=7).contains(&days) {
        score += 10.0;
        reasons.push(format!("In the follow-up window ({days} days since contact)"));
    } else if days > 14 {
        score += 5.0;
        if lead.last_contacted_at.is_some() {
            reasons.push(format!("No contact for {days} days, time to re-engage"));
        } else {
            reasons.push("Never contacted".to_string());
        }
    }

    match lead.status {
        LeadStatus::Responded => {
            score += 15.0;
            reasons.push("Lead has responded".to_string());
        }
        LeadStatus::Qualified => {
            score += 20.0;
            reasons.push("Lead is qualified".to_string());
        }
        _ => {}
    }

    score = score.clamp(0.0, 100.0);
    if lead.status.is_disqualified() {
        score = 0.0;
        reasons.push(format!("Lead is {}", lead.status));
    }

    PriorityScore {
        priority_score: score,
        reasons,
        recommended_action: recommend(lead, engagement, days),
        urgency: Urgency::from_score(score),
        days_since_last_contact: days,
    }
}

// First matching rule wins. A new lead nobody has contacted yet gets its
// first outreach, not a re-engagement.
fn recommend(lead: &Lead, engagement: Engagement, days: i64) -> RecommendedAction {
    let awaiting_first_contact = lead.status == LeadStatus::New && lead.last_contacted_at.is_none();

    if engagement.email_replies > 0 && engagement.calls == 0 {
        RecommendedAction::MakePhoneCall
    } else if engagement.email_opens > 0 && engagement.email_replies == 0 && days >= 3 {
        RecommendedAction::SendFollowUpEmail
    } else if days > 14 && !awaiting_first_contact {
        RecommendedAction::Reengage
    } else if lead.status == LeadStatus::New {
        RecommendedAction::SendInitialOutreach
    } else if lead.status == LeadStatus::Qualified {
        RecommendedAction::ScheduleMeeting
    } else {
        RecommendedAction::ReviewLead
    }
}

async fn prioritize(
    provider: &dyn LeadHistoryProvider,
    lead: &Lead,
    now: DateTime<Utc>,
) -> Result<PrioritizedLead> {
    let journey = journey_for_lead(provider, lead, now).await?;
    let scraped = provider.get_scraped_data_by_lead_id(lead.id).await?;
    let priority = score_lead(lead, &journey, scraped.first(), now);

    tracing::debug!(
        lead_id = lead.id,
        score = priority.priority_score,
        urgency = %priority.urgency,
        "Scored lead"
    );

    Ok(PrioritizedLead {
        lead_id: lead.id,
        company_name: lead.company_name.clone(),
        contact_name: lead.contact_name.clone(),
        contact_email: lead.contact_email.clone(),
        status: lead.status,
        priority,
    })
}

/// Scores a single lead by id.
pub async fn calculate_priority_score(
    provider: &dyn LeadHistoryProvider,
    lead_id: LeadId,
    now: DateTime<Utc>,
) -> Result<PriorityScore> {
    let lead = require_lead(provider, lead_id).await?;
    Ok(prioritize(provider, &lead, now).await?.priority)
}

/// Ranks the open leads of a campaign, highest score first.
///
/// Unqualified, rejected and converted leads are left out. Ties keep the
/// campaign's lead order.
pub async fn get_prioritized_leads(
    provider: &dyn LeadHistoryProvider,
    campaign_id: CampaignId,
    limit: usize,
    now: DateTime<Utc>,
    concurrency: usize,
) -> Result<Vec<PrioritizedLead>> {
    require_campaign(provider, campaign_id).await?;

    let open: Vec<Lead> = provider
        .get_leads_by_campaign_id(campaign_id)
        .await?
        .into_iter()
        .filter(|lead| !lead.status.is_disqualified() && lead.status != LeadStatus::Converted)
        .collect();

    let mut ranked: Vec<PrioritizedLead> = stream::iter(&open)
        .map(|lead| prioritize(provider, lead, now))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    ranked.sort_by(|a, b| b.priority.priority_score.total_cmp(&a.priority.priority_score));
    ranked.truncate(limit);

    tracing::info!(
        campaign_id,
        candidates = open.len(),
        returned = ranked.len(),
        "Prioritized campaign leads"
    );

    Ok(ranked)
}
