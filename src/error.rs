// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Error types for the lead analytics engine.
//!
//! Missing history (no touchpoints, no scraped data) is never an error; those
//! cases resolve to empty or zero values where they are computed.

use crate::model::{CampaignId, LeadId, RuleId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),

    #[error("campaign {0} not found")]
    CampaignNotFound(CampaignId),

    #[error("workflow rule {0} not found")]
    RuleNotFound(RuleId),

    #[error("invalid workflow rule {rule_id}: {reason}")]
    InvalidRule { rule_id: RuleId, reason: String },

    #[error("history provider error: {0}")]
    Provider(String),

    #[error("failed to load snapshot: {0}")]
    Snapshot(String),
}

impl Error {
    /// True for lookups that did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::LeadNotFound(_) | Error::CampaignNotFound(_) | Error::RuleNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_classified() {
        assert!(Error::LeadNotFound(4).is_not_found());
        assert!(Error::CampaignNotFound(1).is_not_found());
        assert!(!Error::Provider("timeout".into()).is_not_found());
    }

    #[test]
    fn messages_name_the_missing_id() {
        assert_eq!(Error::LeadNotFound(42).to_string(), "lead 42 not found");
        let err = Error::InvalidRule {
            rule_id: 3,
            reason: "days must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid workflow rule 3: days must be positive"
        );
    }
}
