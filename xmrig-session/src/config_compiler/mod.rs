//! Compiles a stored configuration into the payload that starts the worker.
//!
//! Each call builds its document from scratch, so nothing from one compile
//! can leak into the next. The document itself never leaves this module:
//! callers get a [`CompiledConfiguration`] whose `config` field carries the
//! base64 of the serialized document.
//!
//! SIMPLE configurations are assembled field by field on top of a base
//! template. ADVANCE configurations are the user's own JSON5 text with an
//! operational overlay forced on top. Both end up with the worker's HTTP
//! status endpoint enabled on loopback, which is what the alive poll talks
//! to.

mod document;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::{STATUS_HOST, STATUS_PORT};
use crate::settings::{ConfigurationMode, SimpleProperties, StoredConfiguration};
use document::ConfigDocument;

pub(crate) use document::strip_nulls;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration text does not parse: {0}")]
    ConfigParse(String),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The only value that crosses the process-start boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledConfiguration {
    pub id: String,
    pub name: String,
    pub mode: ConfigurationMode,
    pub xmrig_fork: String,
    /// base64 of the worker configuration JSON.
    pub config: String,
}

impl CompiledConfiguration {
    /// JSON string passed to the process-start call, null keys omitted.
    pub fn to_start_payload(&self) -> Result<String, CompileError> {
        let value = strip_nulls(serde_json::to_value(self)?);
        Ok(serde_json::to_string(&value)?)
    }
}

/// Render `selected` into the worker's runtime configuration.
pub fn compile(selected: &StoredConfiguration) -> Result<CompiledConfiguration, CompileError> {
    let document = match &selected.mode {
        ConfigurationMode::Simple => simple_document(selected)?,
        ConfigurationMode::Advanced => advanced_document(selected)?,
        ConfigurationMode::Unrecognized(mode) => {
            return Err(CompileError::InvalidConfig(format!(
                "unrecognized configuration mode {mode:?}"
            )));
        }
    };

    Ok(CompiledConfiguration {
        id: selected.id.clone(),
        name: selected.name.clone(),
        mode: selected.mode.clone(),
        xmrig_fork: selected.xmrig_fork.clone(),
        config: document.encode()?,
    })
}

/// Unwrap a `json!` object literal.
fn fragment(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Keys the session depends on, applied last in ADVANCE mode so user text
/// can't turn them off.
fn operational_overlay() -> Map<String, Value> {
    fragment(json!({
        "http": {
            "enabled": true,
            "host": STATUS_HOST,
            "port": STATUS_PORT,
            "access-token": null,
            "restricted": true,
        },
        "background": false,
        "colors": false,
    }))
}

fn base_template() -> ConfigDocument {
    let mut document = ConfigDocument::new();
    // autosave makes the worker write back its tuned algo-perf, which the
    // session reconciles into the stored configuration.
    document.merge(fragment(json!({
        "autosave": true,
        "cpu": { "enabled": true },
    })));
    document.merge(operational_overlay());
    document
}

fn simple_document(selected: &StoredConfiguration) -> Result<ConfigDocument, CompileError> {
    let props: &SimpleProperties = selected.properties.as_ref().ok_or_else(|| {
        CompileError::InvalidConfig("SIMPLE configuration has no properties".into())
    })?;
    let pool = props
        .pool
        .as_ref()
        .ok_or_else(|| CompileError::InvalidConfig("SIMPLE configuration has no pool".into()))?;
    let hostname = pool
        .hostname
        .as_deref()
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| CompileError::InvalidConfig("pool hostname is missing".into()))?;
    let port = pool
        .port
        .ok_or_else(|| CompileError::InvalidConfig("pool port is missing".into()))?;

    let mut document = base_template();

    document.merge(fragment(json!({
        "pools": [{
            "user": pool.username,
            "pass": pool.password,
            "url": format!("{hostname}:{port}"),
            "tls": pool.ssl_enabled,
        }],
    })));

    let cpu = props.cpu.clone().unwrap_or_default();
    document.merge(fragment(json!({
        "cpu": {
            "priority": cpu.priority,
            "yield": cpu.yield_,
            "max-threads-hint": cpu.max_threads_hint,
        },
        "randomx": {
            "mode": cpu.random_x_mode,
        },
    })));

    if let Some(algos) = &props.algos {
        document.merge(fragment(json!({ "cpu": algos })));
    }

    document.merge(fragment(json!({ "algo-perf": props.algo_perf })));

    Ok(document)
}

fn advanced_document(selected: &StoredConfiguration) -> Result<ConfigDocument, CompileError> {
    let text = selected
        .config
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or("{}");

    let parsed: Value =
        json5::from_str(text).map_err(|e| CompileError::ConfigParse(e.to_string()))?;
    let Value::Object(root) = parsed else {
        return Err(CompileError::InvalidConfig(
            "ADVANCE configuration must be a JSON object".into(),
        ));
    };

    let mut document = ConfigDocument::from_object(root);
    document.merge(operational_overlay());
    Ok(document)
}
