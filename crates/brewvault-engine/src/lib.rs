//! Default-resolution cascade and the entity-resolution façade
//!
//! Ties the other crates together: documents load through
//! `brewvault-store`, free-text keys resolve through `brewvault-match`,
//! prices normalize through `brewvault-units`, and every resolved entity
//! carries an [`cascade::EffectiveConfig`] merged from three layers —
//! caller overrides, the preference document, and a versioned hardcoded
//! fallback.

pub mod cascade;
pub mod engine;
pub mod fallback;
pub mod preferences;

pub use cascade::{ConfigError, EffectiveConfig, Layer};
pub use engine::{
    Engine, EngineConfig, EngineError, MutationReceipt, Resolution, ResolvedEntity,
};
pub use fallback::{fallback_layer, FALLBACK_VERSION};
pub use preferences::DefaultPreferenceSet;
