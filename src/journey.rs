// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Lead journeys: every interaction with a lead as one ordered timeline.
//!
//! A journey merges two stored sources into [`Touchpoint`]s:
//!
//! ```text
//! CommunicationLog ──► channel = log channel, type = outreach | response
//!                                              ├──► stable sort by time ──► LeadJourney
//! Activity ─────────► channel = call | other, type = activity type
//! ```
//!
//! Journeys are never cached; every call re-reads the store.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    Activity, Channel, CommunicationLog, DeliveryStatus, Direction, Lead, LeadId, LeadStatus,
    capitalize,
};
use crate::provider::{LeadHistoryProvider, require_lead};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A single timestamped interaction with a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Touchpoint {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub channel: Channel,
    /// `outreach`, `response`, or the activity type verbatim.
    #[serde(rename = "type")]
    pub touch_type: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Touchpoint {
    fn from_communication(log: &CommunicationLog) -> Self {
        let touch_type = match log.direction {
            Direction::Outbound => "outreach",
            Direction::Inbound => "response",
        };
        Self {
            id: format!("comm-{}", log.id),
            timestamp: log.timestamp(),
            channel: log.channel,
            touch_type: touch_type.to_string(),
            status: log.status.unwrap_or_default(),
            content: log.content.clone().or_else(|| log.subject.clone()),
        }
    }

    // Activities carry no channel or status; calls are the only type we can map.
    fn from_activity(activity: &Activity) -> Self {
        let channel = if activity.is_call() {
            Channel::Call
        } else {
            Channel::Other
        };
        Self {
            id: format!("activity-{}", activity.id),
            timestamp: activity.created_at,
            channel,
            touch_type: activity.activity_type.clone(),
            status: DeliveryStatus::Completed,
            content: activity.description.clone(),
        }
    }
}

/// The full ordered touchpoint history of one lead plus summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadJourney {
    pub lead_id: LeadId,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub status: LeadStatus,
    pub touchpoints: Vec<Touchpoint>,
    pub first_touch: DateTime<Utc>,
    pub last_touch: DateTime<Utc>,
    pub total_touchpoints: usize,
    pub email_count: usize,
    pub call_count: usize,
    pub sms_count: usize,
    pub days_since_first_touch: f64,
    /// Collapsed channel sequence ending in the current status,
    /// e.g. `Email → Call → Email → Qualified`.
    pub conversion_path: String,
}

impl LeadJourney {
    pub fn count_channel(&self, channel: Channel) -> usize {
        self.touchpoints.iter().filter(|t| t.channel == channel).count()
    }

    pub fn count_with_status(&self, channel: Channel, status: DeliveryStatus) -> usize {
        self.touchpoints
            .iter()
            .filter(|t| t.channel == channel && t.status == status)
            .count()
    }
}

/// Merges communications and activities into one timeline.
///
/// Communications come before activities in the input, and the sort is stable,
/// so equal timestamps keep communications first.
pub fn merge_touchpoints(
    communications: &[CommunicationLog],
    activities: &[Activity],
) -> Vec<Touchpoint> {
    let mut touchpoints: Vec<Touchpoint> = communications
        .iter()
        .map(Touchpoint::from_communication)
        .chain(activities.iter().map(Touchpoint::from_activity))
        .collect();
    touchpoints.sort_by_key(|t| t.timestamp);
    touchpoints
}

/// Builds the `Email → Call → Qualified` label for an ordered timeline.
pub fn conversion_path(touchpoints: &[Touchpoint], status: LeadStatus) -> String {
    let mut segments: Vec<String> = Vec::new();
    for touchpoint in touchpoints {
        let label = capitalize(touchpoint.channel.as_ref());
        if segments.last() != Some(&label) {
            segments.push(label);
        }
    }
    segments.push(capitalize(status.as_ref()));
    segments.join(" → ")
}

/// Derives a journey from already-fetched history.
pub fn assemble_journey(
    lead: &Lead,
    communications: &[CommunicationLog],
    activities: &[Activity],
    now: DateTime<Utc>,
) -> LeadJourney {
    let touchpoints = merge_touchpoints(communications, activities);

    // A lead nobody has touched yet starts and ends at its creation time.
    let first_touch = touchpoints.first().map_or(lead.created_at, |t| t.timestamp);
    let last_touch = touchpoints.last().map_or(lead.created_at, |t| t.timestamp);

    let days_since_first_touch =
        ((now - first_touch).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0);

    let count = |channel: Channel| touchpoints.iter().filter(|t| t.channel == channel).count();

    LeadJourney {
        lead_id: lead.id,
        company_name: lead.company_name.clone(),
        contact_name: lead.contact_name.clone(),
        contact_email: lead.contact_email.clone(),
        status: lead.status,
        first_touch,
        last_touch,
        total_touchpoints: touchpoints.len(),
        email_count: count(Channel::Email),
        call_count: count(Channel::Call),
        sms_count: count(Channel::Sms),
        days_since_first_touch,
        conversion_path: conversion_path(&touchpoints, lead.status),
        touchpoints,
    }
}

/// Fetches the history of an already-loaded lead and derives its journey.
pub async fn journey_for_lead(
    provider: &dyn LeadHistoryProvider,
    lead: &Lead,
    now: DateTime<Utc>,
) -> Result<LeadJourney> {
    let communications = provider.get_communication_logs_by_lead_id(lead.id).await?;
    let activities = provider.get_activities_by_lead_id(lead.id).await?;
    tracing::debug!(
        lead_id = lead.id,
        communications = communications.len(),
        activities = activities.len(),
        "Building lead journey"
    );
    Ok(assemble_journey(lead, &communications, &activities, now))
}

/// Builds the journey of a lead by id.
pub async fn build_journey(
    provider: &dyn LeadHistoryProvider,
    lead_id: LeadId,
    now: DateTime<Utc>,
) -> Result<LeadJourney> {
    let lead = require_lead(provider, lead_id).await?;
    journey_for_lead(provider, &lead, now).await
}

/// Builds journeys for many leads with at most `concurrency` fetches in flight.
///
/// The output order matches `leads`.
pub async fn build_journeys(
    provider: &dyn LeadHistoryProvider,
    leads: &[Lead],
    now: DateTime<Utc>,
    concurrency: usize,
) -> Result<Vec<LeadJourney>> {
    stream::iter(leads)
        .map(|lead| journey_for_lead(provider, lead, now))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    pub(crate) fn lead(id: LeadId, status: LeadStatus, created_at: DateTime<Utc>) -> Lead {
        Lead {
            id,
            campaign_id: 1,
            company_name: format!("Company {id}"),
            contact_name: Some("Alex Doe".into()),
            contact_email: Some(format!("alex@company{id}.test")),
            contact_phone: None,
            contact_title: None,
            industry: None,
            company_size: None,
            location: None,
            revenue: None,
            status,
            confidence_score: 50.0,
            created_at,
            last_contacted_at: None,
        }
    }

    pub(crate) fn comm(
        id: i64,
        lead_id: LeadId,
        channel: Channel,
        direction: Direction,
        status: Option<DeliveryStatus>,
        sent_at: DateTime<Utc>,
    ) -> CommunicationLog {
        CommunicationLog {
            id,
            lead_id,
            channel,
            direction,
            status,
            subject: None,
            content: None,
            sent_at: Some(sent_at),
            created_at: sent_at,
        }
    }

    pub(crate) fn activity(
        id: i64,
        lead_id: LeadId,
        activity_type: &str,
        created_at: DateTime<Utc>,
    ) -> Activity {
        Activity {
            id,
            lead_id,
            user_id: Some(5),
            activity_type: activity_type.into(),
            description: None,
            created_at,
            completed_at: Some(created_at),
        }
    }

    #[test]
    fn empty_history_defaults_to_creation_time() {
        let created = at("2025-03-01T09:00:00Z");
        let now = created + Duration::hours(36);
        let journey = assemble_journey(&lead(1, LeadStatus::New, created), &[], &[], now);

        assert_eq!(journey.first_touch, created);
        assert_eq!(journey.last_touch, created);
        assert_eq!(journey.total_touchpoints, 0);
        assert!((journey.days_since_first_touch - 1.5).abs() < 1e-9);
        assert_eq!(journey.conversion_path, "New");
    }

    #[test]
    fn lead_created_now_has_zero_days() {
        let created = at("2025-03-01T09:00:00Z");
        let journey = assemble_journey(&lead(1, LeadStatus::New, created), &[], &[], created);
        assert!(journey.days_since_first_touch.abs() < f64::EPSILON);
    }

    #[test]
    fn touchpoints_are_sorted_and_mapped() {
        let created = at("2025-03-01T09:00:00Z");
        let comms = vec![
            comm(
                1,
                1,
                Channel::Email,
                Direction::Outbound,
                Some(DeliveryStatus::Opened),
                at("2025-03-03T09:00:00Z"),
            ),
            comm(2, 1, Channel::Email, Direction::Inbound, None, at("2025-03-05T09:00:00Z")),
        ];
        let activities = vec![
            activity(10, 1, "call", at("2025-03-04T09:00:00Z")),
            activity(11, 1, "note", at("2025-03-02T09:00:00Z")),
        ];

        let journey = assemble_journey(
            &lead(1, LeadStatus::Qualified, created),
            &comms,
            &activities,
            at("2025-03-10T09:00:00Z"),
        );

        let ids: Vec<_> = journey.touchpoints.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["activity-11", "comm-1", "activity-10", "comm-2"]);
        assert!(
            journey
                .touchpoints
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );

        let outreach = &journey.touchpoints[1];
        assert_eq!(outreach.touch_type, "outreach");
        assert_eq!(outreach.status, DeliveryStatus::Opened);

        let response = &journey.touchpoints[3];
        assert_eq!(response.touch_type, "response");
        assert_eq!(response.status, DeliveryStatus::Unknown);

        let note = &journey.touchpoints[0];
        assert_eq!(note.channel, Channel::Other);
        assert_eq!(note.touch_type, "note");
        assert_eq!(note.status, DeliveryStatus::Completed);

        assert_eq!(journey.first_touch, at("2025-03-02T09:00:00Z"));
        assert_eq!(journey.last_touch, at("2025-03-05T09:00:00Z"));
        assert_eq!(journey.email_count, 2);
        assert_eq!(journey.call_count, 1);
        assert_eq!(journey.sms_count, 0);
        assert_eq!(journey.conversion_path, "Other → Email → Call → Email → Qualified");
    }

    #[test]
    fn ties_keep_communications_before_activities() {
        let t = at("2025-03-02T09:00:00Z");
        let touchpoints = merge_touchpoints(
            &[comm(1, 1, Channel::Sms, Direction::Outbound, None, t)],
            &[activity(9, 1, "call", t)],
        );
        assert_eq!(touchpoints[0].id, "comm-1");
        assert_eq!(touchpoints[1].id, "activity-9");
    }

    #[test]
    fn conversion_path_collapses_consecutive_channels() {
        let t = at("2025-03-02T09:00:00Z");
        let comms: Vec<_> = [Channel::Email, Channel::Email, Channel::Call, Channel::Email]
            .into_iter()
            .enumerate()
            .map(|(i, channel)| {
                comm(
                    i as i64,
                    1,
                    channel,
                    Direction::Outbound,
                    None,
                    t + Duration::hours(i as i64),
                )
            })
            .collect();
        let touchpoints = merge_touchpoints(&comms, &[]);
        assert_eq!(
            conversion_path(&touchpoints, LeadStatus::Qualified),
            "Email → Call → Email → Qualified"
        );
    }

    #[tokio::test]
    async fn builds_demo_journey_from_store() {
        let store = crate::store::tests::demo_store();
        let journey = build_journey(&store, 1, at("2025-06-15T12:00:00Z"))
            .await
            .unwrap();

        assert_eq!(journey.total_touchpoints, 4);
        assert_eq!(journey.email_count, 2);
        assert_eq!(journey.call_count, 2);
        assert_eq!(journey.conversion_path, "Email → Call → Qualified");
        assert_eq!(journey.first_touch, at("2025-05-02T09:00:00Z"));
        assert_eq!(journey.touchpoints[3].id, "activity-1001");
    }

    #[tokio::test]
    async fn unknown_lead_is_not_found() {
        let store = crate::store::tests::demo_store();
        let err = build_journey(&store, 404, at("2025-06-15T12:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::LeadNotFound(404)));
    }

    #[tokio::test]
    async fn build_journeys_keeps_input_order() {
        let store = crate::store::tests::demo_store();
        let leads = store.get_leads_by_campaign_id(1).await.unwrap();
        let journeys = build_journeys(&store, &leads, at("2025-06-15T12:00:00Z"), 3)
            .await
            .unwrap();
        let ids: Vec<LeadId> = journeys.iter().map(|j| j.lead_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
