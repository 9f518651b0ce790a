// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Application configuration for the leadflow engine.
//!
//! Values are layered, later layers winning:
//! - Built-in defaults
//! - `leadflow.toml` in the working directory, or the file given with `--config`
//! - Environment variables, e.g. `LEADFLOW__ANALYTICS__FETCH_CONCURRENCY=16`
//!
//! Note: This is **wiring configuration**, not scoring semantics. Score
//! weights and thresholds are fixed in code.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attribution::AttributionModel;
use crate::funnel::ConversionBasis;
use crate::model::UserId;
use crate::workflow::AutomationPrincipal;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "LEADFLOW";

const DEFAULT_FILE: &str = "leadflow";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Who automated activities are recorded as.
    pub automation: AutomationConfig,

    /// Campaign-wide analytics.
    pub analytics: AnalyticsConfig,

    /// Lead prioritization.
    pub priority: PriorityConfig,

    /// Workflow sweeps.
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub principal_id: UserId,
    pub principal_name: String,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            principal_id: 1,
            principal_name: "leadflow-automation".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Used when a command does not name a model.
    pub default_model: AttributionModel,

    pub conversion_basis: ConversionBasis,

    /// Per-lead history fetches in flight at once.
    pub fetch_concurrency: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_model: AttributionModel::MultiTouch,
            conversion_basis: ConversionBasis::Communication,
            fetch_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub default_limit: usize,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self { default_limit: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Leads swept in parallel.
    pub sweep_concurrency: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sweep_concurrency: 4,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the config file, then `LEADFLOW__*` variables.
    ///
    /// An explicit `path` must exist; the default `leadflow.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(
            path,
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_FILE).required(false)),
        };
        builder = builder.add_source(env);

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            model = %config.analytics.default_model,
            fetch_concurrency = config.analytics.fetch_concurrency,
            sweep_concurrency = config.workflow.sweep_concurrency,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &str, value: usize| {
            if value == 0 {
                Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "must be at least 1".to_string(),
                })
            } else {
                Ok(())
            }
        };

        positive("analytics.fetch_concurrency", self.analytics.fetch_concurrency)?;
        positive("workflow.sweep_concurrency", self.workflow.sweep_concurrency)?;

        if self.automation.principal_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "automation.principal_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn principal(&self) -> AutomationPrincipal {
        AutomationPrincipal {
            user_id: self.automation.principal_id,
            name: self.automation.principal_name.clone(),
        }
    }
}
