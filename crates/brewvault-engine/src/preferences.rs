//! Preference-document reading
//!
//! The application records "last used" selections in an `Options` section
//! of its own document format. Keys are stored with the `F_O_` field
//! prefix; per-kind selections carry the kind's tag as a further prefix
//! (`F_O_RECIPE_EQUIPMENT_PROFILE`). This module projects that section
//! into the cascade's middle layer: plain keys, kind-scoped entries
//! shadowing global ones.

use brewvault_store::fragment::parse_fragment;
use brewvault_store::{
    document::element_to_map, EntityKind, FieldMap, FormatError, StoreDocument,
};

/// Root tag of the preference section.
const OPTIONS_TAG: &str = "Options";

/// The cascade's middle layer for one kind, read once per resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultPreferenceSet {
    pub fields: FieldMap,
}

impl DefaultPreferenceSet {
    /// Read the preference layer for `kind` from a parsed document.
    ///
    /// Later `Options` sections shadow earlier ones field by field, the
    /// same last-wins rule the record store applies to duplicate names.
    pub fn from_document(doc: &StoreDocument, kind: EntityKind) -> Result<Self, FormatError> {
        let mut global = FieldMap::new();
        let mut scoped = FieldMap::new();
        let kind_prefix = format!("{}_", kind.record_tag().to_lowercase());

        for frag in &doc.fragments {
            if frag.root_tag != OPTIONS_TAG {
                continue;
            }
            let tree = parse_fragment(doc.bytes(), frag)?;
            for (raw_key, value) in element_to_map(&tree) {
                let Some(key) = raw_key.strip_prefix("f_o_") else {
                    continue;
                };
                if let Some(field) = key.strip_prefix(&kind_prefix) {
                    scoped.insert(field.to_string(), value);
                } else if !starts_with_other_kind(key) {
                    global.insert(key.to_string(), value);
                }
            }
        }

        // Kind-scoped entries shadow globals of the same field name.
        global.extend(scoped);
        Ok(DefaultPreferenceSet { fields: global })
    }
}

/// True when the key is scoped to some record kind (possibly not ours).
fn starts_with_other_kind(key: &str) -> bool {
    brewvault_store::ALL_KINDS
        .iter()
        .any(|k| key.starts_with(&format!("{}_", k.record_tag().to_lowercase())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewvault_store::FieldValue;
    use std::path::PathBuf;

    const PREFS: &str = "<Options>\
<F_O_CURRENCY>EUR</F_O_CURRENCY>\
<F_O_MATCH_THRESHOLD>0.7</F_O_MATCH_THRESHOLD>\
<F_O_RECIPE_EQUIPMENT_PROFILE>My 30L Rig</F_O_RECIPE_EQUIPMENT_PROFILE>\
<F_O_HOPS_FORM>Leaf</F_O_HOPS_FORM>\
<IgnoredKey>1</IgnoredKey>\
</Options>";

    fn doc(content: &str) -> StoreDocument {
        StoreDocument::parse(PathBuf::from("prefs.bsmx"), 0, content.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn reads_global_and_kind_scoped_keys() {
        let prefs = DefaultPreferenceSet::from_document(&doc(PREFS), EntityKind::Recipe).unwrap();
        assert_eq!(
            prefs.fields.get("currency"),
            Some(&FieldValue::Text("EUR".into()))
        );
        assert_eq!(
            prefs.fields.get("equipment_profile"),
            Some(&FieldValue::Text("My 30L Rig".into()))
        );
        // Another kind's scoped key never leaks into Recipe's layer.
        assert!(!prefs.fields.contains_key("form"));
        assert!(!prefs.fields.contains_key("hops_form"));
        // Non-F_O_ elements are not preferences.
        assert!(!prefs.fields.contains_key("ignoredkey"));
    }

    #[test]
    fn kind_scoped_shadows_global() {
        let content = "<Options>\
<F_O_CURRENCY>GBP</F_O_CURRENCY>\
<F_O_HOPS_CURRENCY>USD</F_O_HOPS_CURRENCY>\
</Options>";
        let prefs = DefaultPreferenceSet::from_document(&doc(content), EntityKind::Hop).unwrap();
        assert_eq!(
            prefs.fields.get("currency"),
            Some(&FieldValue::Text("USD".into()))
        );
    }

    #[test]
    fn later_options_sections_win() {
        let content = "<Options><F_O_CURRENCY>GBP</F_O_CURRENCY></Options>\
<Options><F_O_CURRENCY>EUR</F_O_CURRENCY></Options>";
        let prefs = DefaultPreferenceSet::from_document(&doc(content), EntityKind::Grain).unwrap();
        assert_eq!(
            prefs.fields.get("currency"),
            Some(&FieldValue::Text("EUR".into()))
        );
    }

    #[test]
    fn document_without_options_yields_an_empty_layer() {
        let content = "<Hops><Data/></Hops>";
        let prefs = DefaultPreferenceSet::from_document(&doc(content), EntityKind::Hop).unwrap();
        assert!(prefs.fields.is_empty());
    }
}
