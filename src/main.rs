// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Leadflow CLI - campaign analytics over a lead snapshot
//!
//! # Usage
//!
//! ```bash
//! # Journey of one lead
//! leadflow --snapshot fixtures/demo_campaign.json journey 1
//!
//! # Channel attribution for a campaign
//! leadflow --snapshot fixtures/demo_campaign.json attribution 1 --model time_decay
//!
//! # Who to call next, as JSON
//! leadflow --format json prioritized 1 --limit 5
//!
//! # Run every active workflow rule once
//! leadflow sweep
//! ```
//!
//! The snapshot path can also come from `LEADFLOW_SNAPSHOT`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadflow::attribution::{AttributionModel, calculate_attribution};
use leadflow::config::AppConfig;
use leadflow::funnel::{get_channel_performance, get_conversion_funnel};
use leadflow::journey::build_journey;
use leadflow::model::{CampaignId, LeadId, RuleId};
use leadflow::priority::{calculate_priority_score, get_prioritized_leads};
use leadflow::report::{OutputFormat, Printer, TriggerCheck};
use leadflow::store::InMemoryStore;
use leadflow::workflow::WorkflowEngine;

/// Leadflow - lead journeys, attribution, prioritization and nurturing workflows
#[derive(Parser)]
#[command(name = "leadflow")]
#[command(about = "Lead analytics and nurturing workflows for B2B campaigns")]
#[command(version)]
struct Cli {
    /// Lead snapshot (JSON)
    #[arg(short, long, env = "LEADFLOW_SNAPSHOT", global = true)]
    snapshot: Option<PathBuf>,

    /// Configuration file (defaults to ./leadflow.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the ordered touchpoint journey of a lead
    Journey {
        lead_id: LeadId,
    },

    /// Attribute conversion credit to channels
    Attribution {
        campaign_id: CampaignId,

        /// first_touch, last_touch, multi_touch or time_decay
        #[arg(short, long)]
        model: Option<AttributionModel>,
    },

    /// Count leads per funnel stage
    Funnel {
        campaign_id: CampaignId,
    },

    /// Show email, call and SMS performance
    Channels {
        campaign_id: CampaignId,
    },

    /// Score a single lead
    Priority {
        lead_id: LeadId,
    },

    /// Rank the open leads of a campaign
    Prioritized {
        campaign_id: CampaignId,

        /// Maximum number of leads (defaults to priority.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Inspect workflow rules
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },

    /// Run active workflow rules once
    Sweep {
        /// Only sweep this campaign
        #[arg(long)]
        campaign: Option<CampaignId>,
    },
}

#[derive(Subcommand)]
enum RulesCommands {
    /// List workflow rules
    List {
        /// Only rules of this campaign
        #[arg(long)]
        campaign: Option<CampaignId>,
    },
    /// Check whether a rule fires for a lead, without acting
    Check {
        rule_id: RuleId,
        lead_id: LeadId,
    },
}

fn init_tracing(json: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let snapshot = cli
        .snapshot
        .context("No snapshot given; pass --snapshot or set LEADFLOW_SNAPSHOT")?;
    let store = Arc::new(
        InMemoryStore::load(&snapshot)
            .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?,
    );

    let now = Utc::now();
    let concurrency = config.analytics.fetch_concurrency;
    let mut printer = Printer::stdout(cli.format);

    match cli.command {
        Commands::Journey { lead_id } => {
            let journey = build_journey(store.as_ref(), lead_id, now).await?;
            printer.emit(&journey)?;
        }

        Commands::Attribution { campaign_id, model } => {
            let model = model.unwrap_or(config.analytics.default_model);
            let report =
                calculate_attribution(store.as_ref(), campaign_id, model, now, concurrency).await?;
            printer.emit(&report)?;
        }

        Commands::Funnel { campaign_id } => {
            let funnel = get_conversion_funnel(store.as_ref(), campaign_id).await?;
            printer.emit(funnel.as_slice())?;
        }

        Commands::Channels { campaign_id } => {
            let channels = get_channel_performance(
                store.as_ref(),
                campaign_id,
                config.analytics.conversion_basis,
                concurrency,
            )
            .await?;
            printer.emit(channels.as_slice())?;
        }

        Commands::Priority { lead_id } => {
            let score = calculate_priority_score(store.as_ref(), lead_id, now).await?;
            printer.emit(&score)?;
        }

        Commands::Prioritized { campaign_id, limit } => {
            let limit = limit.unwrap_or(config.priority.default_limit);
            let ranked =
                get_prioritized_leads(store.as_ref(), campaign_id, limit, now, concurrency)
                    .await?;
            printer.emit(ranked.as_slice())?;
        }

        Commands::Rules { command } => match command {
            RulesCommands::List { campaign } => {
                let rules = store.workflow_rules(campaign).await;
                printer.emit(rules.as_slice())?;
            }
            RulesCommands::Check { rule_id, lead_id } => {
                let rule = store.workflow_rule(rule_id).await?;
                let engine = WorkflowEngine::new(
                    store.clone(),
                    config.principal(),
                    config.workflow.sweep_concurrency,
                );
                let fires = engine.check(&rule, lead_id, now).await?;
                printer.emit(&TriggerCheck {
                    rule_id,
                    lead_id,
                    trigger: rule.trigger.kind().to_string(),
                    fires,
                })?;
            }
        },

        Commands::Sweep { campaign } => {
            let rules = store.workflow_rules(campaign).await;
            let engine = WorkflowEngine::new(
                store.clone(),
                config.principal(),
                config.workflow.sweep_concurrency,
            );
            info!(
                rules = rules.len(),
                principal = %engine.principal().name,
                "Running workflow rules against snapshot"
            );

            match campaign {
                Some(campaign_id) => {
                    let report = engine.sweep(campaign_id, &rules, now).await?;
                    printer.emit(&report)?;
                }
                None => {
                    let report = engine.tick(&rules, now).await;
                    printer.emit(&report)?;
                }
            }
        }
    }

    Ok(())
}
