//! Stored mining configurations as the settings store hands them out.
//!
//! Field names follow the store's serialized form, so a settings snapshot
//! can be read straight from the JSON the store persists.

mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use store::{MemorySettingsStore, SettingsStore};

/// Identifier of a stored configuration.
pub type ConfigurationId = String;

/// How a configuration was authored.
///
/// Unknown mode strings are kept rather than rejected at deserialization so
/// the compiler can report them as an invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConfigurationMode {
    /// Structured fields edited through forms.
    Simple,
    /// Raw worker configuration text.
    Advanced,
    Unrecognized(String),
}

impl From<String> for ConfigurationMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SIMPLE" => ConfigurationMode::Simple,
            "ADVANCE" | "ADVANCED" => ConfigurationMode::Advanced,
            _ => ConfigurationMode::Unrecognized(value),
        }
    }
}

impl From<ConfigurationMode> for String {
    fn from(mode: ConfigurationMode) -> Self {
        match mode {
            ConfigurationMode::Simple => "SIMPLE".to_string(),
            ConfigurationMode::Advanced => "ADVANCE".to_string(),
            ConfigurationMode::Unrecognized(value) => value,
        }
    }
}

impl fmt::Display for ConfigurationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationMode::Simple => write!(f, "SIMPLE"),
            ConfigurationMode::Advanced => write!(f, "ADVANCE"),
            ConfigurationMode::Unrecognized(value) => write!(f, "{value}"),
        }
    }
}

/// A configuration record owned by the settings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfiguration {
    pub id: ConfigurationId,
    pub name: String,
    pub mode: ConfigurationMode,
    /// Which worker build the configuration targets.
    pub xmrig_fork: String,
    /// Structured fields, used in SIMPLE mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SimpleProperties>,
    /// Raw worker configuration text, used in ADVANCE mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuProperties>,
    /// Per-algorithm switches merged into the worker's `cpu` block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algos: Option<Map<String, Value>>,
    /// Per-algorithm performance hints (the worker's `algo-perf` block).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo_perf: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(
        rename = "sslEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ssl_enabled: Option<bool>,
}

/// CPU tuning. Unset fields are left out of the worker configuration so
/// the worker's own defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(rename = "yield", default, skip_serializing_if = "Option::is_none")]
    pub yield_: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_threads_hint: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_x_mode: Option<String>,
}

/// Snapshot of the settings store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(
        rename = "selectedConfiguration",
        alias = "selected_configuration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_configuration: Option<ConfigurationId>,
    #[serde(default)]
    pub configurations: Vec<StoredConfiguration>,
}

impl Settings {
    /// The configuration `selected_configuration` points at, if any.
    pub fn selected(&self) -> Option<&StoredConfiguration> {
        let id = self.selected_configuration.as_ref()?;
        self.configurations.iter().find(|c| &c.id == id)
    }
}
