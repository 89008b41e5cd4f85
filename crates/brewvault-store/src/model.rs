//! Entity model: a closed set of record kinds over a generic field map
//!
//! Field sets overlap heavily across kinds and the matcher/cascade operate
//! generically, so kinds are a tagged enum plus a field map rather than a
//! type per kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::value::{FieldMap, FieldValue};

/// Every record kind the document family can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Recipe,
    Grain,
    Hop,
    Yeast,
    MiscIngredient,
    EquipmentProfile,
    MashProfile,
    CarbonationProfile,
    AgeProfile,
    WaterProfile,
    StyleGuideline,
}

pub const ALL_KINDS: [EntityKind; 11] = [
    EntityKind::Recipe,
    EntityKind::Grain,
    EntityKind::Hop,
    EntityKind::Yeast,
    EntityKind::MiscIngredient,
    EntityKind::EquipmentProfile,
    EntityKind::MashProfile,
    EntityKind::CarbonationProfile,
    EntityKind::AgeProfile,
    EntityKind::WaterProfile,
    EntityKind::StyleGuideline,
];

impl EntityKind {
    /// The physical element tag this kind is stored under.
    pub fn record_tag(self) -> &'static str {
        match self {
            EntityKind::Recipe => "Recipe",
            EntityKind::Grain => "Grain",
            EntityKind::Hop => "Hops",
            EntityKind::Yeast => "Yeast",
            EntityKind::MiscIngredient => "Misc",
            EntityKind::EquipmentProfile => "Equipment",
            EntityKind::MashProfile => "Mash",
            EntityKind::CarbonationProfile => "Carbonation",
            EntityKind::AgeProfile => "Age",
            EntityKind::WaterProfile => "Water",
            EntityKind::StyleGuideline => "Style",
        }
    }

    /// The lowercased field carrying the record's display name.
    pub fn name_field(self) -> &'static str {
        match self {
            EntityKind::Recipe => "f_r_name",
            EntityKind::Grain => "f_g_name",
            EntityKind::Hop => "f_h_name",
            EntityKind::Yeast => "f_y_name",
            EntityKind::MiscIngredient => "f_m_name",
            EntityKind::EquipmentProfile => "f_e_name",
            EntityKind::MashProfile => "f_mh_name",
            EntityKind::CarbonationProfile => "f_c_name",
            EntityKind::AgeProfile => "f_a_name",
            EntityKind::WaterProfile => "f_w_name",
            EntityKind::StyleGuideline => "f_s_name",
        }
    }

    /// Kind for a physical record tag, if the tag names one.
    pub fn for_tag(tag: &str) -> Option<EntityKind> {
        ALL_KINDS.iter().copied().find(|k| k.record_tag() == tag)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_tag())
    }
}

/// Where a record physically lives: exactly one (document, section,
/// byte-span) triple, so a later write can replace just that block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Index into the store's document list.
    pub document: usize,
    /// Root tag of the fragment the record was found in.
    pub section: String,
    /// Folder path accumulated from enclosing `Table` containers,
    /// `"/"` at the top level, `"/Ales/"` one folder deep.
    pub folder: String,
    /// Byte span of the record element within its document.
    pub span: Range<usize>,
}

/// One leaf field's writable location inside its record block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpan {
    /// Lowercased field name.
    pub name: String,
    /// The element tag exactly as written (case preserved).
    pub tag: String,
    /// Full element span, open tag through close tag, relative to the
    /// record block's first byte.
    pub element: Range<usize>,
    /// Content span between the tags. Zero-width at the element end for a
    /// self-closing element, which has no content bytes to splice into.
    pub content: Range<usize>,
}

impl FieldSpan {
    /// Whether the field was written as a self-closing element
    /// (`<F_H_NOTES/>`). Updates must then rewrite the whole element, not
    /// splice the (nonexistent) content.
    pub fn is_self_closing(&self) -> bool {
        self.content.start == self.content.end && self.content.end == self.element.end
    }
}

/// One normalized record. An owned projection: it never aliases mutable
/// store state and stays valid across reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Stable identifier, unique per kind within a document. Sentinel "0"
    /// when the record carries none.
    pub id: String,
    /// Display name. NOT unique; disambiguate by id.
    pub name: String,
    pub fields: FieldMap,
    pub provenance: Provenance,
    /// Writable leaf-field locations, in document order.
    pub field_spans: Vec<FieldSpan>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Numeric field with the documented sentinel 0.0 when absent.
    pub fn num(&self, name: &str) -> f64 {
        self.fields.get(name).map(FieldValue::as_f64).unwrap_or(0.0)
    }

    /// Integer field with the documented sentinel 0 when absent.
    pub fn int(&self, name: &str) -> i64 {
        self.fields.get(name).map(FieldValue::as_i64).unwrap_or(0)
    }

    /// Text field, empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(FieldValue::as_text).unwrap_or("")
    }
}
