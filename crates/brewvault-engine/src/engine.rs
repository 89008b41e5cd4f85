//! The resolution façade
//!
//! One `Engine` owns a loaded [`DocumentStore`] plus the preference
//! snapshot, rate table and matching threshold. Lookups go exact-id, then
//! exact name (case-insensitive), then fuzzy; mutations resolve the target
//! the same way and delegate to the store writer, reloading afterwards so
//! spans track the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use brewvault_match::{best_match, AliasTable};
use brewvault_store::{
    DocumentStore, Entity, EntityKind, EntityUpdate, FieldMap, FormatError, PersistenceError,
    StoreDocument, StoreError, DEFAULT_LOCK_TIMEOUT,
};
use brewvault_units::{ConversionError, MassUnit, RateTable};

use crate::cascade::{self, ConfigError, EffectiveConfig};
use crate::fallback::fallback_layer;
use crate::preferences::DefaultPreferenceSet;

/// Standard document file names, as shipped by the application. Used when
/// opening a whole library directory.
const LIBRARY_DOCUMENTS: &[&str] = &[
    "Recipe.bsmx",
    "Grain.bsmx",
    "Hops.bsmx",
    "Yeast.bsmx",
    "Misc.bsmx",
    "Equipment.bsmx",
    "Mash.bsmx",
    "Carb.bsmx",
    "Age.bsmx",
    "Water.bsmx",
    "Style.bsmx",
];

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A mutation named an entity no lookup stage could resolve.
    #[error("no {kind} record resolves from `{key}`")]
    Unresolved { kind: String, key: String },
}

/// Everything an engine instance needs, supplied by the hosting layer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Document paths, in load (and therefore shadowing) order.
    pub documents: Vec<PathBuf>,
    /// Document holding the `Options` preference section, if any.
    pub preference_document: Option<PathBuf>,
    /// Backup directory; `None` means a sibling directory per document.
    pub backup_dir: Option<PathBuf>,
    pub rate_table: RateTable,
    /// Minimum fuzzy-match confidence for name resolution.
    pub match_threshold: f64,
    pub lock_timeout: Duration,
}

impl EngineConfig {
    /// Configuration over an explicit document list.
    pub fn new(documents: Vec<PathBuf>) -> Self {
        EngineConfig {
            documents,
            preference_document: None,
            backup_dir: None,
            rate_table: RateTable::new("GBP")
                .with_rate("USD", 0.79)
                .with_rate("EUR", 0.86),
            match_threshold: 0.6,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Configuration over a standard library directory: the shipped
    /// document set, skipping files the installation does not have.
    pub fn for_library_dir(dir: &Path) -> Self {
        let documents = LIBRARY_DOCUMENTS
            .iter()
            .map(|name| dir.join(name))
            .filter(|p| p.is_file())
            .collect();
        EngineConfig::new(documents)
    }

    pub fn with_preference_document(mut self, path: PathBuf) -> Self {
        self.preference_document = Some(path);
        self
    }

    pub fn with_backup_dir(mut self, dir: PathBuf) -> Self {
        self.backup_dir = Some(dir);
        self
    }

    pub fn with_rate_table(mut self, table: RateTable) -> Self {
        self.rate_table = table;
        self
    }

    pub fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }
}

/// A successfully resolved entity with its effective configuration.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub entity: Entity,
    /// 1.0 for exact id/name hits, the match score otherwise.
    pub confidence: f64,
    pub effective: EffectiveConfig,
}

/// Outcome of a lookup. No candidate above threshold is a value, not an
/// error.
#[derive(Debug, Clone)]
pub enum Resolution {
    Match(ResolvedEntity),
    NoMatch,
}

/// What a mutation touched, for the caller to report.
#[derive(Debug, Clone)]
pub struct MutationReceipt {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
    pub document: PathBuf,
    pub backup: PathBuf,
}

pub struct Engine {
    store: DocumentStore,
    preferences: Option<StoreDocument>,
    aliases: AliasTable,
    config: EngineConfig,
}

impl Engine {
    /// Load the document family and preference snapshot.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let mut store = DocumentStore::load(&config.documents)?
            .with_lock_timeout(config.lock_timeout);
        if let Some(dir) = &config.backup_dir {
            store = store.with_backup_dir(dir.clone());
        }

        let preferences = match &config.preference_document {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|source| PersistenceError::Io {
                    path: path.clone(),
                    source,
                })?;
                Some(StoreDocument::parse(path.clone(), usize::MAX, bytes)?)
            }
            None => None,
        };

        info!(
            documents = config.documents.len(),
            preferences = preferences.is_some(),
            "engine opened"
        );
        Ok(Engine {
            store,
            preferences,
            aliases: AliasTable::builtin(),
            config,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The merged configuration for `kind` under the caller's overrides.
    pub fn effective_config(
        &self,
        kind: EntityKind,
        overrides: &FieldMap,
    ) -> Result<EffectiveConfig, EngineError> {
        let prefs = match &self.preferences {
            Some(doc) => DefaultPreferenceSet::from_document(doc, kind)?,
            None => DefaultPreferenceSet::default(),
        };
        let merged = cascade::resolve(overrides, &prefs.fields, &fallback_layer(kind))?;
        Ok(merged)
    }

    /// Resolve a lookup key to a canonical record: exact id first, then
    /// exact name ignoring case, then fuzzy matching over the deduplicated
    /// listing.
    pub fn resolve_entity(&self, kind: EntityKind, key: &str) -> Result<Resolution, EngineError> {
        if let Some(entity) = self.store.find(kind, key) {
            return self.resolved(entity.clone(), 1.0);
        }
        if let Some(entity) = self.store.find_by_name(kind, key) {
            return self.resolved(entity.clone(), 1.0);
        }

        let candidates = self.store.names(kind);
        let Some(hit) = best_match(key, &candidates, self.config.match_threshold, &self.aliases)
        else {
            debug!(kind = %kind, key, "no candidate above threshold");
            return Ok(Resolution::NoMatch);
        };
        let entity = self
            .store
            .find(kind, &hit.id)
            .ok_or_else(|| EngineError::Unresolved {
                kind: kind.to_string(),
                key: key.to_string(),
            })?;
        debug!(kind = %kind, key, matched = %hit.name, confidence = hit.confidence, "fuzzy hit");
        self.resolved(entity.clone(), hit.confidence)
    }

    fn resolved(&self, entity: Entity, confidence: f64) -> Result<Resolution, EngineError> {
        let effective = self.effective_config(entity.kind, &FieldMap::new())?;
        Ok(Resolution::Match(ResolvedEntity {
            entity,
            confidence,
            effective,
        }))
    }

    /// Resolve the target, write the field updates through the store
    /// (backup + atomic replace), and reload so in-memory spans track the
    /// rewritten file.
    pub fn update_entity(
        &mut self,
        kind: EntityKind,
        key: &str,
        updates: FieldMap,
    ) -> Result<MutationReceipt, EngineError> {
        let (id, name) = match self.resolve_entity(kind, key)? {
            Resolution::Match(r) => (r.entity.id, r.entity.name),
            Resolution::NoMatch => {
                return Err(EngineError::Unresolved {
                    kind: kind.to_string(),
                    key: key.to_string(),
                });
            }
        };

        let mut update = EntityUpdate::new(kind, id.clone());
        update.fields = updates;
        let receipt = self.store.write(&[update])?;
        self.store.reload()?;

        info!(kind = %kind, id, name, "entity updated");
        Ok(MutationReceipt {
            kind,
            id,
            name,
            document: receipt.documents[0].clone(),
            backup: receipt.backups[0].clone(),
        })
    }

    /// Per-weight prices persist as price-per-ounce in the store currency;
    /// this is the one sanctioned path into that form.
    pub fn price_to_storage(
        &self,
        price: f64,
        per_unit: MassUnit,
        from_currency: &str,
    ) -> Result<f64, EngineError> {
        let stored = brewvault_units::price_per_storage_ounce(
            price,
            per_unit,
            from_currency,
            &self.config.rate_table.pivot,
            &self.config.rate_table,
        )?;
        Ok(stored)
    }
}
