//! Hop substitute suggestions
//!
//! Like the alias table this is data, keyed by canonical token. Lookups go
//! through [`crate::normalize`] first so "Cascade (US)" finds the cascade
//! entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::AliasTable;

/// Known substitutions, canonical token → substitute display names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstituteTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl SubstituteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, canonical: impl Into<String>, subs: &[&str]) {
        self.entries.insert(
            canonical.into().to_lowercase(),
            subs.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Substitutes for a (possibly un-normalised) hop name. Empty when the
    /// hop is unknown.
    pub fn substitutes_for(&self, name: &str, aliases: &AliasTable) -> &[String] {
        let token = crate::normalize(name, aliases);
        self.entries.get(&token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Common hop substitutions carried by the built-in data set.
    pub fn builtin() -> Self {
        let mut t = SubstituteTable::new();

        // American
        t.insert("cascade", &["Centennial", "Amarillo", "Citra", "Ahtanum"]);
        t.insert("centennial", &["Cascade", "Chinook", "Columbus", "Simcoe"]);
        t.insert("chinook", &["Columbus", "Centennial", "Simcoe", "Nugget"]);
        t.insert("columbus", &["Chinook", "Centennial", "CTZ", "Tomahawk", "Zeus"]);
        t.insert("simcoe", &["Chinook", "Columbus", "Amarillo"]);
        t.insert("amarillo", &["Cascade", "Centennial", "Citra", "Simcoe"]);
        t.insert("citra", &["Amarillo", "Mosaic", "Simcoe", "Galaxy"]);
        t.insert("mosaic", &["Citra", "Simcoe", "Amarillo", "El Dorado"]);
        t.insert("nugget", &["Chinook", "Columbus", "Magnum", "Galena"]);
        t.insert("warrior", &["Columbus", "Simcoe", "Magnum"]);
        t.insert("el dorado", &["Citra", "Mosaic", "Simcoe"]);

        // English
        t.insert(
            "east kent goldings",
            &["Fuggle", "UK Goldings", "Styrian Goldings", "First Gold"],
        );
        t.insert("fuggle", &["East Kent Goldings", "Willamette", "Styrian Goldings"]);
        t.insert("challenger", &["Target", "Admiral", "Northern Brewer"]);
        t.insert("target", &["Challenger", "Admiral", "Fuggle"]);

        // German
        t.insert("hallertau", &["Hallertauer Mittelfruh", "Liberty", "Mt. Hood", "Tettnang"]);
        t.insert("hersbrucker", &["Hallertau", "Tettnang", "Spalt"]);
        t.insert("tettnang", &["Saaz", "Spalt", "Hallertau", "Santiam"]);
        t.insert("spalt", &["Tettnang", "Saaz", "Hallertau"]);
        t.insert("magnum", &["Nugget", "Horizon", "Columbus"]);
        t.insert("perle", &["Northern Brewer", "Hallertau", "Mt. Hood"]);
        t.insert("northern brewer", &["Perle", "Chinook", "Cluster"]);

        // Czech
        t.insert("saaz", &["Tettnang", "Spalt", "Sterling", "Styrian Goldings"]);

        // American noble-style
        t.insert("liberty", &["Hallertau", "Mt. Hood", "Crystal"]);
        t.insert("mt. hood", &["Hallertau", "Liberty", "Crystal"]);
        t.insert("sterling", &["Saaz", "Tettnang"]);
        t.insert("willamette", &["Fuggle", "Tettnang", "Styrian Goldings"]);

        // Slovenian
        t.insert("styrian goldings", &["Fuggle", "Willamette", "UK Goldings"]);

        // Australia / NZ
        t.insert("galaxy", &["Citra", "Simcoe", "Amarillo"]);
        t.insert("nelson sauvin", &["Galaxy", "Motueka", "Hallertau Blanc"]);
        t.insert("motueka", &["Saaz", "Nelson Sauvin", "Sterling"]);
        t.insert("vic secret", &["Galaxy", "Citra"]);

        t
    }
}
