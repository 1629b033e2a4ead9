//! Scratch worker configuration document.
//!
//! A document is assembled by merging JSON fragments into it. Objects merge
//! key by key at every depth; any other value (including arrays and null)
//! replaces what was there. The last fragment to touch a leaf wins.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_object(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Merge `fragment` into the document.
    pub(super) fn merge(&mut self, fragment: Map<String, Value>) {
        merge_object(&mut self.root, fragment);
    }

    /// Serialize with null-valued keys removed, then base64-encode.
    ///
    /// The worker treats an absent key as "use the default" but a null key
    /// as an explicit value, so nulls must never reach it.
    pub(super) fn encode(&self) -> Result<String, serde_json::Error> {
        let stripped = strip_nulls(Value::Object(self.root.clone()));
        let bytes = serde_json::to_vec(&stripped)?;
        Ok(STANDARD.encode(bytes))
    }

    #[cfg(test)]
    pub(super) fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn merge_object(target: &mut Map<String, Value>, fragment: Map<String, Value>) {
    for (key, incoming) in fragment {
        match incoming {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_object(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            incoming => {
                target.insert(key, incoming);
            }
        }
    }
}

/// Drop every object key whose value is null, at any depth.
///
/// Array elements are kept even when null; only keys can be absent.
pub(crate) fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
