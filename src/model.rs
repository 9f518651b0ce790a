// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Record types read from (and written back to) the lead history store.
//!
//! These mirror the rows of the external CRM store. Nothing here is derived;
//! journeys, scores and reports are built from these in the analytics modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub type LeadId = i64;
pub type CampaignId = i64;
pub type ClientId = i64;
pub type UserId = i64;
pub type RuleId = i64;

/// A client campaign that owns a set of leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub client_id: ClientId,
    pub name: String,
}

/// Lifecycle status of a lead.
///
/// ```text
/// new → contacted → responded → qualified | unqualified → converted | rejected
/// ```
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
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Responded,
    Qualified,
    Unqualified,
    Converted,
    Rejected,
}

impl LeadStatus {
    /// Qualified and converted leads count as conversions for attribution
    /// and channel performance.
    pub fn is_won(self) -> bool {
        matches!(self, LeadStatus::Qualified | LeadStatus::Converted)
    }

    /// Leads in these states are never scored above zero.
    pub fn is_disqualified(self) -> bool {
        matches!(self, LeadStatus::Unqualified | LeadStatus::Rejected)
    }
}

/// A prospect company and its primary contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub campaign_id: CampaignId,
    pub company_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_title: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub revenue: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    /// ICP fit, 0-100.
    #[serde(default)]
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_contacted_at: Option<DateTime<Utc>>,
}

/// Outreach channel of a communication or touchpoint.
///
/// The set is closed. A channel name this enum does not know, such as
/// `linkedin`, deserializes as [`Channel::Other`], so attribution credits it
/// under `other` rather than under its own key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    Email,
    Call,
    Sms,
    Web,
    #[serde(other)]
    Other,
}

impl Channel {
    /// Channels tracked by the channel performance report.
    pub const OUTREACH: [Channel; 3] = [Channel::Email, Channel::Call, Channel::Sms];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
}

/// Delivery state of a communication, or `Completed` for activities.
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
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Replied,
    Bounced,
    Failed,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One email, call or SMS sent to or received from a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationLog {
    pub id: i64,
    pub lead_id: LeadId,
    pub channel: Channel,
    pub direction: Direction,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CommunicationLog {
    /// When the communication happened, for ordering purposes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.sent_at.unwrap_or(self.created_at)
    }
}

/// A free-form activity record (call, note, meeting, automated email...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub lead_id: LeadId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Activity {
    pub fn is_call(&self) -> bool {
        self.activity_type == "call"
    }
}

/// Web intelligence gathered about the lead's company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedData {
    pub id: i64,
    pub lead_id: LeadId,
    #[serde(default)]
    pub hiring_signals: Vec<String>,
    #[serde(default)]
    pub raw: serde_json::Value,
    pub scraped_at: DateTime<Utc>,
}

/// Partial update applied to a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

impl LeadUpdate {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// An activity to be appended to the log; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub lead_id: LeadId,
    pub user_id: Option<UserId>,
    pub activity_type: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A communication to be appended to the log; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommunicationLog {
    pub lead_id: LeadId,
    pub channel: Channel,
    pub direction: Direction,
    pub status: Option<DeliveryStatus>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Capitalizes the first character, as used in conversion path labels.
pub(crate) fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lead_status_round_trips_through_strum_and_serde() {
        assert_eq!(LeadStatus::from_str("qualified").unwrap(), LeadStatus::Qualified);
        assert_eq!(LeadStatus::Unqualified.to_string(), "unqualified");

        let status: LeadStatus = serde_json::from_str("\"converted\"").unwrap();
        assert_eq!(status, LeadStatus::Converted);
    }

    #[test]
    fn unknown_delivery_status_falls_back_to_unknown() {
        let status: DeliveryStatus = serde_json::from_str("\"soft_bounce\"").unwrap();
        assert_eq!(status, DeliveryStatus::Unknown);
    }

    #[test]
    fn unknown_channel_maps_to_other() {
        let channel: Channel = serde_json::from_str("\"linkedin\"").unwrap();
        assert_eq!(channel, Channel::Other);
    }

    #[test]
    fn communication_timestamp_prefers_sent_at() {
        let created = "2025-03-01T10:00:00Z".parse().unwrap();
        let sent = "2025-03-01T12:00:00Z".parse().unwrap();
        let mut log = CommunicationLog {
            id: 1,
            lead_id: 1,
            channel: Channel::Email,
            direction: Direction::Outbound,
            status: None,
            subject: None,
            content: None,
            sent_at: Some(sent),
            created_at: created,
        };
        assert_eq!(log.timestamp(), sent);

        log.sent_at = None;
        assert_eq!(log.timestamp(), created);
    }

    #[test]
    fn capitalize_handles_empty_and_ascii() {
        assert_eq!(capitalize("email"), "Email");
        assert_eq!(capitalize("sms"), "Sms");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn activity_parses_type_field() {
        let json = r#"{
            "id": 7,
            "leadId": 3,
            "type": "call",
            "description": "Discovery call",
            "createdAt": "2025-03-01T10:00:00Z"
        }"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert!(activity.is_call());
        assert_eq!(activity.completed_at, None);
        assert_eq!(activity.user_id, None);
    }
}
