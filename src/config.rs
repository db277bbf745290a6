use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::topology::{
    parse_router_name, Shape, TreeOptions, DEFAULT_MEMORY_NAME, DEFAULT_NETWORK_NAME,
};
use crate::utils::latency::Latency;

/// Log levels accepted in `general.log_level`
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Top-level configuration structure that mirrors the YAML configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub network: NetworkConfig,
    /// Parameters applied to every router of the tree
    #[serde(default)]
    pub router: RouterParams,
}

/// Errors found while validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid router configuration: {0}")]
    InvalidRouter(String),
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ValidationError::InvalidGeneral(format!(
                    "unknown log_level '{}', expected one of {:?}",
                    level, LOG_LEVELS
                )));
            }
        }

        self.network.validate()?;
        self.router.validate()?;

        Ok(())
    }

    /// Log level for the run, "info" when unset
    pub fn log_level(&self) -> &str {
        self.general.log_level.as_deref().unwrap_or("info")
    }

    /// `log_level` as a filter for the `log` facade
    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level().parse().unwrap_or(LevelFilter::Info)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.general.output_format.unwrap_or_default()
    }
}

/// Shared general configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
}

/// File format the netlist is written in
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Tree interconnect configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_network_name")]
    pub name: String,
    /// Fan-out per level, e.g. "2x4"
    pub shape: String,
    pub total_hosts: usize,
    /// Host endpoint names in host order; defaults to host0..hostN-1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_names: Option<Vec<String>>,
    #[serde(default = "default_memory_name")]
    pub memory_name: String,
    /// Latency of router-router and root-memory links
    #[serde(default = "default_link_latency")]
    pub link_latency: Latency,
    /// Latency of host-router links, `link_latency` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_link_latency: Option<Latency>,
}

impl NetworkConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidNetwork(
                "network name cannot be empty".to_string(),
            ));
        }
        if self.memory_name.trim().is_empty() {
            return Err(ValidationError::InvalidNetwork(
                "memory_name cannot be empty".to_string(),
            ));
        }

        let shape = self.shape()?;
        let layout = shape
            .layout(self.total_hosts)
            .map_err(|e| ValidationError::InvalidNetwork(e.to_string()))?;
        let is_router = |name: &str| {
            parse_router_name(name).is_some_and(|id| id < layout.total_routers())
        };

        if is_router(&self.memory_name) {
            return Err(ValidationError::InvalidNetwork(format!(
                "memory_name '{}' collides with a router name",
                self.memory_name
            )));
        }

        if let Some(names) = &self.host_names {
            if names.len() != self.total_hosts {
                return Err(ValidationError::InvalidNetwork(format!(
                    "host_names lists {} hosts but total_hosts is {}",
                    names.len(),
                    self.total_hosts
                )));
            }
            let mut seen = HashSet::new();
            for name in names {
                if name.trim().is_empty() {
                    return Err(ValidationError::InvalidNetwork(
                        "host_names cannot contain empty names".to_string(),
                    ));
                }
                if *name == self.memory_name || is_router(name) {
                    return Err(ValidationError::InvalidNetwork(format!(
                        "host name '{}' collides with a router or memory name",
                        name
                    )));
                }
                if !seen.insert(name.as_str()) {
                    return Err(ValidationError::InvalidNetwork(format!(
                        "duplicate host name '{}'",
                        name
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn shape(&self) -> Result<Shape, ValidationError> {
        self.shape
            .parse::<Shape>()
            .map_err(|e| ValidationError::InvalidNetwork(e.to_string()))
    }

    /// Host names in host order, generated when the configuration omits them
    pub fn host_names(&self) -> Vec<String> {
        match &self.host_names {
            Some(names) => names.clone(),
            None => (0..self.total_hosts).map(|i| format!("host{}", i)).collect(),
        }
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            network_name: self.name.clone(),
            memory_name: self.memory_name.clone(),
            link_latency: self.link_latency,
            host_link_latency: self.host_link_latency,
        }
    }
}

/// Router parameters shared by every router in the tree
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RouterParams {
    pub link_bw: String,
    pub xbar_bw: String,
    pub flit_size: String,
    pub input_latency: Latency,
    pub output_latency: Latency,
    pub input_buf_size: String,
    pub output_buf_size: String,
    /// Crossbar arbitration component
    pub xbar_arb: String,
}

impl RouterParams {
    fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("link_bw", &self.link_bw),
            ("xbar_bw", &self.xbar_bw),
            ("flit_size", &self.flit_size),
            ("input_buf_size", &self.input_buf_size),
            ("output_buf_size", &self.output_buf_size),
            ("xbar_arb", &self.xbar_arb),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidRouter(format!(
                    "{} cannot be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Default implementations
impl Default for RouterParams {
    fn default() -> Self {
        Self {
            link_bw: "8GB/s".to_string(),
            xbar_bw: "8GB/s".to_string(),
            flit_size: "8B".to_string(),
            input_latency: Latency::from_nanos(1),
            output_latency: Latency::from_nanos(1),
            input_buf_size: "256B".to_string(),
            output_buf_size: "256B".to_string(),
            xbar_arb: "merlin.xbar_arb_lru".to_string(),
        }
    }
}

fn default_network_name() -> String {
    DEFAULT_NETWORK_NAME.to_string()
}

fn default_memory_name() -> String {
    DEFAULT_MEMORY_NAME.to_string()
}

fn default_link_latency() -> Latency {
    Latency::from_nanos(1)
}
