// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Channel attribution over a campaign's converted leads.
//!
//! Each qualified or converted lead hands out one unit of credit across the
//! channels of its journey, according to the selected [`AttributionModel`].
//! Credits from all contributing leads are summed per channel.
//!
//! | Model | Credit for touchpoint `i` of `N` |
//! |---|---|
//! | `first_touch` | 1.0 for `i = 0` |
//! | `last_touch` | 1.0 for `i = N - 1` |
//! | `multi_touch` | `1 / N` |
//! | `time_decay` | `(i + 1) / (1 + 2 + ... + N)` |
//!
//! A converted lead without touchpoints contributes nothing under any model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::Result;
use crate::journey::{LeadJourney, Touchpoint, build_journeys};
use crate::model::{CampaignId, Channel};
use crate::provider::{LeadHistoryProvider, require_campaign};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    #[default]
    MultiTouch,
    TimeDecay,
}

/// Accumulated channel credit for one campaign under one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionReport {
    pub model: AttributionModel,
    /// Channel name to credit. Always contains `email`, `call`, `sms` and `other`.
    pub credits: BTreeMap<String, f64>,
    /// Qualified or converted leads that handed out credit.
    pub contributing_leads: usize,
    /// Qualified or converted leads skipped for having no touchpoints.
    pub skipped_leads: usize,
}

impl AttributionReport {
    fn seeded(model: AttributionModel) -> Self {
        let credits = [Channel::Email, Channel::Call, Channel::Sms, Channel::Other]
            .iter()
            .map(|c| (c.to_string(), 0.0))
            .collect();
        Self {
            model,
            credits,
            contributing_leads: 0,
            skipped_leads: 0,
        }
    }

    pub fn credit(&self, channel: Channel) -> f64 {
        self.credits.get(channel.as_ref()).copied().unwrap_or(0.0)
    }

    pub fn total_credit(&self) -> f64 {
        self.credits.values().sum()
    }
}

/// Splits one unit of credit across a single journey's touchpoints.
///
/// Returns an empty list when there are no touchpoints.
pub fn touchpoint_credits(
    model: AttributionModel,
    touchpoints: &[Touchpoint],
) -> Vec<(Channel, f64)> {
    let (Some(first), Some(last)) = (touchpoints.first(), touchpoints.last()) else {
        return Vec::new();
    };
    let n = touchpoints.len() as f64;

    match model {
        AttributionModel::FirstTouch => vec![(first.channel, 1.0)],
        AttributionModel::LastTouch => vec![(last.channel, 1.0)],
        AttributionModel::MultiTouch => touchpoints.iter().map(|t| (t.channel, 1.0 / n)).collect(),
        AttributionModel::TimeDecay => {
            let total_weight = n * (n + 1.0) / 2.0;
            touchpoints
                .iter()
                .enumerate()
                .map(|(i, t)| (t.channel, (i as f64 + 1.0) / total_weight))
                .collect()
        }
    }
}

/// Attributes credit over already-built journeys.
///
/// Journeys of leads that are not qualified or converted are ignored.
pub fn attribute(model: AttributionModel, journeys: &[LeadJourney]) -> AttributionReport {
    let mut report = AttributionReport::seeded(model);

    for journey in journeys.iter().filter(|j| j.status.is_won()) {
        let credits = touchpoint_credits(model, &journey.touchpoints);
        if credits.is_empty() {
            tracing::warn!(
                lead_id = journey.lead_id,
                "Converted lead has no touchpoints, skipping attribution"
            );
            report.skipped_leads += 1;
            continue;
        }

        for (channel, credit) in credits {
            *report.credits.entry(channel.to_string()).or_insert(0.0) += credit;
        }
        report.contributing_leads += 1;
    }

    report
}

/// Computes channel attribution for a campaign.
pub async fn calculate_attribution(
    provider: &dyn LeadHistoryProvider,
    campaign_id: CampaignId,
    model: AttributionModel,
    now: DateTime<Utc>,
    concurrency: usize,
) -> Result<AttributionReport> {
    require_campaign(provider, campaign_id).await?;

    let converted: Vec<_> = provider
        .get_leads_by_campaign_id(campaign_id)
        .await?
        .into_iter()
        .filter(|lead| lead.status.is_won())
        .collect();

    let journeys = build_journeys(provider, &converted, now, concurrency).await?;
    let report = attribute(model, &journeys);

    tracing::info!(
        campaign_id,
        model = %model,
        contributing = report.contributing_leads,
        skipped = report.skipped_leads,
        "Attribution calculated"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::assemble_journey;
    use crate::journey::tests::{activity, at, comm, lead};
    use crate::model::{Direction, LeadStatus};
    use chrono::Duration;
    use strum::IntoEnumIterator;

    const EPS: f64 = 1e-9;

    fn journey_with(status: LeadStatus, channels: &[Channel]) -> LeadJourney {
        let start = at("2025-04-01T08:00:00Z");
        let comms: Vec<_> = channels
            .iter()
            .enumerate()
            .map(|(i, &channel)| {
                comm(
                    i as i64,
                    1,
                    channel,
                    Direction::Outbound,
                    None,
                    start + Duration::hours(i as i64),
                )
            })
            .collect();
        assemble_journey(&lead(1, status, start), &comms, &[], start + Duration::days(30))
    }

    #[test]
    fn first_and_last_touch_give_full_credit() {
        let journey = journey_with(
            LeadStatus::Converted,
            &[Channel::Sms, Channel::Email, Channel::Call],
        );

        let first = attribute(AttributionModel::FirstTouch, std::slice::from_ref(&journey));
        assert!((first.credit(Channel::Sms) - 1.0).abs() < EPS);
        assert!(first.credit(Channel::Call).abs() < EPS);

        let last = attribute(AttributionModel::LastTouch, &[journey]);
        assert!((last.credit(Channel::Call) - 1.0).abs() < EPS);
    }

    #[test]
    fn multi_touch_credit_per_lead_sums_to_one() {
        let journey = journey_with(
            LeadStatus::Qualified,
            &[Channel::Email, Channel::Email, Channel::Call],
        );
        let report = attribute(AttributionModel::MultiTouch, &[journey]);

        assert!((report.total_credit() - 1.0).abs() < EPS);
        assert!((report.credit(Channel::Email) - 2.0 / 3.0).abs() < EPS);
        assert!((report.credit(Channel::Call) - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn time_decay_favours_later_touchpoints() {
        let journey = journey_with(
            LeadStatus::Converted,
            &[Channel::Email, Channel::Sms, Channel::Call],
        );
        let report = attribute(AttributionModel::TimeDecay, &[journey]);

        assert!((report.credit(Channel::Email) - 1.0 / 6.0).abs() < EPS);
        assert!((report.credit(Channel::Sms) - 2.0 / 6.0).abs() < EPS);
        assert!((report.credit(Channel::Call) - 3.0 / 6.0).abs() < EPS);
        assert!((report.total_credit() - 1.0).abs() < EPS);
    }

    #[test]
    fn converted_lead_without_touchpoints_contributes_nothing() {
        let empty = journey_with(LeadStatus::Converted, &[]);
        for model in AttributionModel::iter() {
            let report = attribute(model, std::slice::from_ref(&empty));
            assert!(report.credits.values().all(|c| c.is_finite() && c.abs() < EPS));
            assert_eq!(report.contributing_leads, 0);
            assert_eq!(report.skipped_leads, 1);
        }
    }

    #[test]
    fn non_converted_leads_are_excluded() {
        let contacted = journey_with(LeadStatus::Contacted, &[Channel::Email]);
        let report = attribute(AttributionModel::FirstTouch, &[contacted]);
        assert!(report.total_credit().abs() < EPS);
        assert_eq!(report.skipped_leads, 0);
    }

    #[test]
    fn credits_accumulate_across_leads_and_seed_channels() {
        let a = journey_with(LeadStatus::Converted, &[Channel::Email]);
        let b = journey_with(LeadStatus::Qualified, &[Channel::Email, Channel::Web]);
        let report = attribute(AttributionModel::MultiTouch, &[a, b]);

        assert!((report.credit(Channel::Email) - 1.5).abs() < EPS);
        assert!((report.credits["web"] - 0.5).abs() < EPS);
        for key in ["email", "call", "sms", "other"] {
            assert!(report.credits.contains_key(key));
        }
        assert_eq!(report.contributing_leads, 2);
    }

    #[test]
    fn activities_attribute_to_call_or_other() {
        let start = at("2025-04-01T08:00:00Z");
        let journey = assemble_journey(
            &lead(1, LeadStatus::Converted, start),
            &[],
            &[activity(1, 1, "call", start), activity(2, 1, "meeting", start)],
            start,
        );
        let report = attribute(AttributionModel::MultiTouch, &[journey]);
        assert!((report.credit(Channel::Call) - 0.5).abs() < EPS);
        assert!((report.credit(Channel::Other) - 0.5).abs() < EPS);
    }

    #[tokio::test]
    async fn demo_campaign_multi_touch_credits() {
        let store = crate::store::tests::demo_store();
        let report = calculate_attribution(
            &store,
            1,
            AttributionModel::MultiTouch,
            at("2025-06-15T12:00:00Z"),
            4,
        )
        .await
        .unwrap();

        assert!((report.credit(Channel::Email) - 1.0).abs() < 1e-9);
        assert!((report.credit(Channel::Call) - 0.5).abs() < 1e-9);
        assert!((report.credit(Channel::Sms) - 0.25).abs() < 1e-9);
        assert!((report.credit(Channel::Other) - 0.25).abs() < 1e-9);
        assert_eq!(report.contributing_leads, 2);
        assert_eq!(report.skipped_leads, 1);
        assert!((report.total_credit() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn demo_campaign_first_touch_credits() {
        let store = crate::store::tests::demo_store();
        let report = calculate_attribution(
            &store,
            1,
            AttributionModel::FirstTouch,
            at("2025-06-15T12:00:00Z"),
            1,
        )
        .await
        .unwrap();

        assert!((report.credit(Channel::Email) - 1.0).abs() < 1e-9);
        assert!((report.credit(Channel::Sms) - 1.0).abs() < 1e-9);
        assert!(report.credit(Channel::Call).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_campaign_is_not_found() {
        let store = crate::store::tests::demo_store();
        let err = calculate_attribution(
            &store,
            42,
            AttributionModel::default(),
            at("2025-06-15T12:00:00Z"),
            4,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, crate::error::Error::CampaignNotFound(42)));
    }

    #[test]
    fn skipped_lead_is_logged_as_warning() {
        let (_guard, logs) = crate::testing::capture_logs();
        let created = at("2025-05-01T09:00:00Z");
        let silent = assemble_journey(
            &lead(9, LeadStatus::Converted, created),
            &[],
            &[],
            created + Duration::days(3),
        );

        let report = attribute(AttributionModel::LastTouch, &[silent]);

        assert_eq!(report.skipped_leads, 1);
        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("skipping attribution"));
        assert!(output.contains("lead_id=9"));
    }
}
