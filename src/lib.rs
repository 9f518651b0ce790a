// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Leadflow - lead analytics and nurturing engine for B2B campaigns.
//!
//! The engine reads lead history through a [`LeadHistoryProvider`] and
//! derives everything else on demand. Nothing computed here is persisted:
//!
//! - [`journey`]: every interaction with a lead as one ordered timeline
//! - [`attribution`]: channel credit over qualified and converted leads
//! - [`funnel`]: stage counts and per-channel outreach performance
//! - [`priority`]: who to contact next, and how
//! - [`workflow`]: trigger/action rules swept over a campaign
//!
//! # Architecture Role
//!
//! > `leadflow` owns **derivation**, not **storage**.
//!
//! The CRM database, email and voice delivery, and notification fan-out all
//! live behind the provider. [`store::InMemoryStore`] implements it over a
//! JSON snapshot for the CLI and tests.

pub mod attribution;
pub mod config;
pub mod error;
pub mod funnel;
pub mod journey;
pub mod model;
pub mod priority;
pub mod provider;
pub mod report;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use attribution::{AttributionModel, AttributionReport, calculate_attribution};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use funnel::{
    ChannelPerformance, ConversionBasis, FunnelStage, get_channel_performance,
    get_conversion_funnel,
};
pub use journey::{LeadJourney, Touchpoint, build_journey};
pub use priority::{
    PrioritizedLead, PriorityScore, RecommendedAction, Urgency, calculate_priority_score,
    get_prioritized_leads,
};
pub use provider::LeadHistoryProvider;
pub use store::InMemoryStore;
pub use workflow::{WorkflowEngine, WorkflowRule};
