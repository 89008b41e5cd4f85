//! Document loading and entity extraction
//!
//! A store is an ordered list of physical documents. Records are discovered
//! by walking each fragment tree: an element whose tag names a record kind
//! *and* has no direct `Data` child is a record; a same-tagged element with
//! a `Data` child is a library container and gets descended into. User
//! records appended as later sibling fragments therefore shadow library
//! records of the same name, because lookups scan in document order and
//! keep the last hit.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{FormatError, PersistenceError, StoreError};
use crate::fragment::{parse_fragment, scan_fragments, Fragment, XmlElement};
use crate::model::{Entity, EntityKind, FieldSpan, Provenance};
use crate::value::{decode_text, FieldMap, FieldValue};

/// Default wait for a per-path write lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One physical document: its verbatim bytes plus everything extracted
/// from them.
#[derive(Debug, Clone)]
pub struct StoreDocument {
    pub path: PathBuf,
    bytes: Vec<u8>,
    pub fragments: Vec<Fragment>,
    pub entities: Vec<Entity>,
}

impl StoreDocument {
    /// Parse a document from its raw bytes. `index` is the document's
    /// position in the store, recorded into each entity's provenance.
    pub fn parse(path: PathBuf, index: usize, bytes: Vec<u8>) -> Result<Self, FormatError> {
        let fragments = scan_fragments(&bytes)?;
        let mut entities = Vec::new();
        for frag in &fragments {
            let tree = parse_fragment(&bytes, frag)?;
            collect_records(&tree, &frag.root_tag, index, "/", &mut entities);
        }
        debug!(
            path = %path.display(),
            fragments = fragments.len(),
            entities = entities.len(),
            "parsed document"
        );
        Ok(StoreDocument {
            path,
            bytes,
            fragments,
            entities,
        })
    }

    /// The exact bytes the document was parsed from.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An in-memory store over one or more physical documents.
#[derive(Debug)]
pub struct DocumentStore {
    documents: Vec<StoreDocument>,
    pub(crate) backup_dir: Option<PathBuf>,
    pub(crate) lock_timeout: Duration,
}

impl DocumentStore {
    /// Load documents from disk in the given order. Order matters: later
    /// documents (and later fragments within one) win name collisions.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, StoreError> {
        let mut documents = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref().to_path_buf();
            let bytes = fs::read(&path).map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;
            documents.push(StoreDocument::parse(path, index, bytes)?);
        }
        info!(documents = documents.len(), "store loaded");
        Ok(DocumentStore {
            documents,
            backup_dir: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Place backups in `dir` instead of a sibling directory of each
    /// document.
    pub fn with_backup_dir(mut self, dir: PathBuf) -> Self {
        self.backup_dir = Some(dir);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Re-read every document from disk. Entities handed out earlier stay
    /// valid as owned snapshots but their spans refer to the old bytes.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        for (index, doc) in self.documents.iter_mut().enumerate() {
            let bytes = fs::read(&doc.path).map_err(|source| PersistenceError::Io {
                path: doc.path.clone(),
                source,
            })?;
            *doc = StoreDocument::parse(doc.path.clone(), index, bytes)?;
        }
        Ok(())
    }

    pub fn documents(&self) -> &[StoreDocument] {
        &self.documents
    }

    /// Every record of a kind, in document order, duplicates included.
    pub fn all_records(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.documents
            .iter()
            .flat_map(|d| d.entities.iter())
            .filter(move |e| e.kind == kind)
    }

    /// Records of a kind deduplicated by display name, last occurrence
    /// winning. This is the listing the application itself shows.
    pub fn entities(&self, kind: EntityKind) -> Vec<&Entity> {
        let mut by_name: Vec<&Entity> = Vec::new();
        for entity in self.all_records(kind) {
            if let Some(slot) = by_name
                .iter_mut()
                .find(|e| e.name.eq_ignore_ascii_case(&entity.name))
            {
                *slot = entity;
            } else {
                by_name.push(entity);
            }
        }
        by_name
    }

    /// `(name, id)` pairs for the deduplicated listing, for fuzzy lookup.
    pub fn names(&self, kind: EntityKind) -> Vec<(String, String)> {
        self.entities(kind)
            .into_iter()
            .map(|e| (e.name.clone(), e.id.clone()))
            .collect()
    }

    /// Last record of a kind with the given id.
    pub fn find(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.all_records(kind).filter(|e| e.id == id).last()
    }

    /// Last record of a kind whose name matches case-insensitively.
    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<&Entity> {
        self.all_records(kind)
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .last()
    }
}

/// Walk a fragment tree collecting records. A record element is never
/// descended into: its nested structures (mash steps, recipe ingredients)
/// become `FieldValue::List` fields instead of standalone records.
/// `Table` containers are folders: records inside one carry the
/// accumulated folder path in their provenance.
fn collect_records(
    element: &XmlElement,
    section: &str,
    document: usize,
    folder: &str,
    out: &mut Vec<Entity>,
) {
    if let Some(kind) = EntityKind::for_tag(&element.name) {
        if !element.has_child("Data") {
            out.push(entity_from_element(kind, element, section, document, folder));
            return;
        }
    }
    if element.name == "Table" {
        if let Some(data) = element.child("Data") {
            let name = element
                .child("Name")
                .map(|n| decode_text(&n.raw_text))
                .unwrap_or_default();
            let sub = format!("{folder}{name}/");
            for child in &data.children {
                collect_records(child, section, document, &sub, out);
            }
        }
        return;
    }
    for child in &element.children {
        collect_records(child, section, document, folder, out);
    }
}

fn entity_from_element(
    kind: EntityKind,
    element: &XmlElement,
    section: &str,
    document: usize,
    folder: &str,
) -> Entity {
    let fields = element_to_map(element);
    let id = fields
        .get("_permid_")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "0".to_string());
    let name = fields
        .get(kind.name_field())
        .map(|v| v.to_string())
        .unwrap_or_default();

    let base = element.span.start;
    let field_spans = element
        .children
        .iter()
        .filter(|c| c.is_leaf())
        .map(|c| FieldSpan {
            name: c.name.to_lowercase(),
            tag: c.name.clone(),
            element: c.span.start - base..c.span.end - base,
            content: c.content.start - base..c.content.end - base,
        })
        .collect();

    Entity {
        kind,
        id,
        name,
        fields,
        provenance: Provenance {
            document,
            section: section.to_string(),
            folder: folder.to_string(),
            span: element.span.clone(),
        },
        field_spans,
    }
}

/// Project an element's children into a field map. Leaf children coerce
/// their decoded text; a child with a `Data` wrapper becomes a list of the
/// wrapped records; any other nested child becomes a single-item list.
pub fn element_to_map(element: &XmlElement) -> FieldMap {
    let mut map = FieldMap::new();
    for child in &element.children {
        let key = child.name.to_lowercase();
        let value = if child.is_leaf() {
            FieldValue::coerce(&decode_text(&child.raw_text))
        } else if let Some(data) = child.child("Data") {
            FieldValue::List(data.children.iter().map(element_to_map).collect())
        } else {
            FieldValue::List(vec![element_to_map(child)])
        };
        map.insert(key, value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<?xml version=\"1.0\"?>\n\
<Hops><Data>\
<Hops><_PermID_>1</_PermID_><F_H_NAME>Cascade</F_H_NAME><F_H_ALPHA>5.7500000</F_H_ALPHA></Hops>\
<Hops><_PermID_>2</_PermID_><F_H_NAME>Saaz</F_H_NAME><F_H_ALPHA>3.5000000</F_H_ALPHA></Hops>\
</Data></Hops>\n\
<Hops><_PermID_>9</_PermID_><F_H_NAME>Cascade</F_H_NAME><F_H_ALPHA>6.1000000</F_H_ALPHA></Hops>";

    fn store_from(doc: &str) -> DocumentStore {
        let parsed = StoreDocument::parse(PathBuf::from("mem.bsmx"), 0, doc.as_bytes().to_vec())
            .unwrap();
        DocumentStore {
            documents: vec![parsed],
            backup_dir: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[test]
    fn finds_library_and_appended_records() {
        let store = store_from(DOC);
        assert_eq!(store.all_records(EntityKind::Hop).count(), 3);
    }

    #[test]
    fn listing_dedupes_by_name_last_wins() {
        let store = store_from(DOC);
        let listed = store.entities(EntityKind::Hop);
        assert_eq!(listed.len(), 2);
        let cascade = listed.iter().find(|e| e.name == "Cascade").unwrap();
        assert_eq!(cascade.id, "9");
        assert!((cascade.num("f_h_alpha") - 6.1).abs() < 1e-9);
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let store = store_from(DOC);
        let hit = store.find_by_name(EntityKind::Hop, "saaz").unwrap();
        assert_eq!(hit.id, "2");
    }

    #[test]
    fn nested_data_becomes_a_list_field() {
        let doc = "<Recipe>\
<_PermID_>4</_PermID_><F_R_NAME>House IPA</F_R_NAME>\
<Ingredients><Data>\
<Hops><F_H_NAME>Cascade</F_H_NAME></Hops>\
<Grain><F_G_NAME>Pale Malt</F_G_NAME></Grain>\
</Data></Ingredients>\
</Recipe>";
        let store = store_from(doc);
        // The embedded hop and grain must not surface as standalone records.
        assert_eq!(store.all_records(EntityKind::Hop).count(), 0);
        let recipe = store.find(EntityKind::Recipe, "4").unwrap();
        match recipe.field("ingredients") {
            Some(FieldValue::List(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(
                    items[0].get("f_h_name"),
                    Some(&FieldValue::Text("Cascade".to_string()))
                );
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn field_spans_point_at_writable_content() {
        let store = store_from(DOC);
        let saaz = store.find(EntityKind::Hop, "2").unwrap();
        let span = saaz
            .field_spans
            .iter()
            .find(|s| s.name == "f_h_alpha")
            .unwrap();
        let block = &DOC.as_bytes()[saaz.provenance.span.clone()];
        assert_eq!(&block[span.content.clone()], b"3.5000000");
        assert_eq!(span.tag, "F_H_ALPHA");
    }

    #[test]
    fn entity_text_is_decoded() {
        let doc = "<Hops><_PermID_>3</_PermID_>\
<F_H_NAME>Hallertau Mittelfr&uuml;h</F_H_NAME></Hops>";
        let store = store_from(doc);
        let hop = store.find(EntityKind::Hop, "3").unwrap();
        assert_eq!(hop.name, "Hallertau Mittelfrüh");
    }
}
