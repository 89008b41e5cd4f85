//! Three-layer default resolution
//!
//! Per field, the highest layer that *defines* the field wins: caller
//! override, then the preference document, then the hardcoded fallback.
//! Absence means the key is not present; an explicitly supplied empty or
//! zero value in a higher layer is a definition and still wins. Values are
//! never coerced across types during the merge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use brewvault_store::{FieldMap, FieldValue};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Two layers define the same field with incompatible types. `higher`
    /// and `lower` are the variant names of the winning and shadowed
    /// values.
    #[error("field `{field}`: layer type mismatch ({higher} vs {lower})")]
    TypeMismatch {
        field: String,
        higher: &'static str,
        lower: &'static str,
    },
}

/// Which layer supplied a resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Override,
    Preference,
    Fallback,
}

/// The merged result: effective values plus, per field, the layer that
/// won. Ephemeral; rebuilt on every resolution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub fields: FieldMap,
    pub sources: BTreeMap<String, Layer>,
}

impl EffectiveConfig {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn source(&self, field: &str) -> Option<Layer> {
        self.sources.get(field).copied()
    }
}

/// Ints and floats both come out of document text, so which one a numeric
/// field coerces to is an accident of formatting; they are mutually
/// compatible. Everything else must agree exactly.
fn compatible(a: &FieldValue, b: &FieldValue) -> bool {
    use FieldValue::*;
    matches!(
        (a, b),
        (Int(_) | Number(_), Int(_) | Number(_)) | (Text(_), Text(_)) | (List(_), List(_))
    )
}

/// Merge the three layers, highest precedence first.
pub fn resolve(
    overrides: &FieldMap,
    preferences: &FieldMap,
    fallback: &FieldMap,
) -> Result<EffectiveConfig, ConfigError> {
    let mut fields = FieldMap::new();
    let mut sources = BTreeMap::new();

    let layers: [(&FieldMap, Layer); 3] = [
        (overrides, Layer::Override),
        (preferences, Layer::Preference),
        (fallback, Layer::Fallback),
    ];

    for (map, layer) in layers {
        for (name, value) in map {
            match fields.get(name) {
                None => {
                    fields.insert(name.clone(), value.clone());
                    sources.insert(name.clone(), layer);
                }
                Some(winner) => {
                    if !compatible(winner, value) {
                        return Err(ConfigError::TypeMismatch {
                            field: name.clone(),
                            higher: winner.type_name(),
                            lower: value.type_name(),
                        });
                    }
                }
            }
        }
    }

    Ok(EffectiveConfig { fields, sources })
}
