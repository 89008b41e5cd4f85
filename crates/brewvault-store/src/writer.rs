//! Minimal-diff persistence
//!
//! Writes never re-render a document. Each update splices new field text
//! into the record's byte block and the block back into the original
//! bytes, so every untouched byte — formatting quirks, entities, trailing
//! whitespace, sibling records — survives verbatim. Before any bytes move,
//! the target file is copied to a timestamped backup; the new content then
//! lands via a temp file renamed over the original.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::document::DocumentStore;
use crate::error::PersistenceError;
use crate::model::{Entity, EntityKind};
use crate::value::{FieldMap, FieldValue};

/// One requested mutation: new values for named fields of one record.
#[derive(Debug, Clone)]
pub struct EntityUpdate {
    pub kind: EntityKind,
    pub id: String,
    pub fields: FieldMap,
}

impl EntityUpdate {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        EntityUpdate {
            kind,
            id: id.into(),
            fields: FieldMap::new(),
        }
    }

    pub fn set(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(field.into(), value);
        self
    }
}

/// What a successful write touched.
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    /// Documents rewritten, in store order.
    pub documents: Vec<PathBuf>,
    /// Backup created for each rewritten document, same order.
    pub backups: Vec<PathBuf>,
    /// `(kind, id)` of every mutated record.
    pub mutated: Vec<(EntityKind, String)>,
}

/// Process-wide write locks, one per canonical path. Two stores pointed at
/// the same file still serialize their writes.
fn path_locks() -> &'static Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(crate) fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    path_locks().lock().entry(key).or_default().clone()
}

impl DocumentStore {
    /// Apply a batch of updates, one atomic rewrite per touched document.
    ///
    /// All updates are validated against the in-memory snapshot before any
    /// file is touched, so a bad field name rejects the whole batch.
    /// In-memory spans are stale after a successful write; call
    /// [`DocumentStore::reload`] before the next read or write.
    pub fn write(&self, updates: &[EntityUpdate]) -> Result<WriteReceipt, PersistenceError> {
        // Coalesce updates naming the same record: the record's span may
        // only be spliced once per write, and field spans go stale the
        // moment the block changes length. Later updates win per field.
        let mut merged: Vec<EntityUpdate> = Vec::new();
        for update in updates {
            match merged
                .iter_mut()
                .find(|u| u.kind == update.kind && u.id == update.id)
            {
                Some(existing) => existing.fields.extend(update.fields.clone()),
                None => merged.push(update.clone()),
            }
        }

        // document index -> (entity span, new block bytes)
        let mut per_doc: HashMap<usize, Vec<(std::ops::Range<usize>, Vec<u8>)>> = HashMap::new();
        let mut mutated = Vec::with_capacity(merged.len());

        for update in &merged {
            let entity = self
                .find(update.kind, &update.id)
                .ok_or_else(|| PersistenceError::NoSuchEntity {
                    kind: update.kind.to_string(),
                    id: update.id.clone(),
                })?;
            let doc = &self.documents()[entity.provenance.document];
            let block = render_block(entity, &update.fields, doc.bytes())?;
            per_doc
                .entry(entity.provenance.document)
                .or_default()
                .push((entity.provenance.span.clone(), block));
            mutated.push((update.kind, update.id.clone()));
        }

        let mut receipt = WriteReceipt {
            documents: Vec::new(),
            backups: Vec::new(),
            mutated,
        };

        let mut touched: Vec<usize> = per_doc.keys().copied().collect();
        touched.sort_unstable();

        for doc_index in touched {
            let doc = &self.documents()[doc_index];
            let mut replacements = per_doc.remove(&doc_index).unwrap_or_default();
            // Record spans never nest, so splicing back-to-front keeps
            // earlier spans valid.
            replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));

            let mut bytes = doc.bytes().to_vec();
            for (span, block) in replacements {
                bytes.splice(span, block);
            }

            let lock = lock_for(&doc.path);
            let guard = lock.try_lock_for(self.lock_timeout).ok_or_else(|| {
                warn!(path = %doc.path.display(), "write lock contention");
                PersistenceError::LockTimeout {
                    path: doc.path.clone(),
                    timeout_ms: self.lock_timeout.as_millis() as u64,
                }
            })?;

            let backup = create_backup(&doc.path, self.backup_dir.as_deref(), Local::now())?;
            atomic_replace(&doc.path, &bytes)?;
            drop(guard);

            info!(
                path = %doc.path.display(),
                backup = %backup.display(),
                "document rewritten"
            );
            receipt.documents.push(doc.path.clone());
            receipt.backups.push(backup);
        }

        Ok(receipt)
    }
}

/// Build the record's new byte block by splicing updated field text into
/// the original block. Fields not mentioned keep their exact bytes. A
/// self-closing field has no content span, so its whole element is
/// rewritten as an open/close pair around the new value.
fn render_block(
    entity: &Entity,
    fields: &FieldMap,
    doc_bytes: &[u8],
) -> Result<Vec<u8>, PersistenceError> {
    let mut block = doc_bytes[entity.provenance.span.clone()].to_vec();

    // Resolve every field to its span first; splice in reverse offset
    // order afterwards.
    let mut edits: Vec<(std::ops::Range<usize>, String)> = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        if let FieldValue::List(_) = value {
            return Err(PersistenceError::NestedFieldUpdate {
                field: name.clone(),
            });
        }
        let span = entity
            .field_spans
            .iter()
            .find(|s| s.name == *name)
            .ok_or_else(|| PersistenceError::UnknownField {
                kind: entity.kind.to_string(),
                id: entity.id.clone(),
                field: name.clone(),
            })?;
        if span.is_self_closing() {
            let tag = &span.tag;
            edits.push((
                span.element.clone(),
                format!("<{tag}>{}</{tag}>", value.to_store_text()),
            ));
        } else {
            edits.push((span.content.clone(), value.to_store_text()));
        }
    }
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    for (range, text) in edits {
        block.splice(range, text.into_bytes());
    }
    Ok(block)
}

/// Copy the file about to be touched into a sortable, timestamped backup.
/// A collision (two writes in the same millisecond) gets a numeric suffix.
fn create_backup(
    path: &Path,
    backup_dir: Option<&Path>,
    now: DateTime<Local>,
) -> Result<PathBuf, PersistenceError> {
    let dir = match backup_dir {
        Some(d) => d.to_path_buf(),
        None => path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("brewvault_backups"),
    };
    fs::create_dir_all(&dir).map_err(|source| PersistenceError::Backup {
        path: path.to_path_buf(),
        source,
    })?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bsmx".to_string());
    let stamp = now.format("%Y%m%dT%H%M%S%.3f").to_string();

    let mut candidate = dir.join(format!("{stem}_backup_{stamp}.{ext}"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_backup_{stamp}_{counter}.{ext}"));
        counter += 1;
    }

    fs::copy(path, &candidate).map_err(|source| PersistenceError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(candidate)
}

/// Write `bytes` to a sibling temp file and rename it over `path`. Readers
/// never observe a half-written document.
fn atomic_replace(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.bsmx".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, bytes).map_err(|source| PersistenceError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(())
}
