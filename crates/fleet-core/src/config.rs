//! fleet.toml configuration parser.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub fleet: FleetSection,
    pub runtime: RuntimeSection,
    pub health: HealthSection,
    pub api: ApiSection,
    pub staging: StagingSection,
}

/// Fleet membership, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSection {
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Container runtime CLI (e.g. "docker", "podman").
    pub binary: String,
    /// Bound on every lifecycle and file-transfer call.
    pub timeout: String,
    /// Directory inside each node that holds stored files.
    pub storage_path: String,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            timeout: "10s".to_string(),
            storage_path: "/files/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    /// Polling interval between probe sweeps.
    pub interval: String,
    /// Bound on a single status probe.
    pub timeout: String,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            interval: "10s".to_string(),
            timeout: "2s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub port: u16,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self { port: 8443 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSection {
    /// Parent directory for transient staging areas. Defaults to the OS
    /// temp directory.
    pub dir: Option<PathBuf>,
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: FleetConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a fleet.toml for the given node names.
    pub fn scaffold(nodes: &[&str]) -> Self {
        FleetConfig {
            fleet: FleetSection {
                nodes: nodes.iter().map(|n| n.to_string()).collect(),
            },
            ..FleetConfig::default()
        }
    }

    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fleet.nodes.is_empty() {
            bail!("[fleet].nodes must list at least one node");
        }
        let mut seen = HashSet::new();
        for node in &self.fleet.nodes {
            if node.trim().is_empty() {
                bail!("[fleet].nodes contains an empty node id");
            }
            if !seen.insert(node.as_str()) {
                bail!("[fleet].nodes lists {node:?} more than once");
            }
        }
        for (key, value) in [
            ("runtime.timeout", &self.runtime.timeout),
            ("health.interval", &self.health.interval),
            ("health.timeout", &self.health.timeout),
        ] {
            match parse_duration(value) {
                Some(d) if !d.is_zero() => {}
                _ => bail!("{key} must be a positive duration, got {value:?}"),
            }
        }
        Ok(())
    }

    pub fn runtime_timeout(&self) -> Duration {
        parse_duration(&self.runtime.timeout).unwrap_or(Duration::from_secs(10))
    }

    pub fn health_interval(&self) -> Duration {
        parse_duration(&self.health.interval).unwrap_or(Duration::from_secs(10))
    }

    pub fn health_timeout(&self) -> Duration {
        parse_duration(&self.health.timeout).unwrap_or(Duration::from_secs(2))
    }
}
