//! Alias table: many spellings, one canonical token
//!
//! The table is plain data. It can be deserialized from JSON, extended at
//! runtime, or replaced wholesale; the matcher never special-cases any
//! entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Many-to-one mapping from spelling variants to canonical tokens.
///
/// Both keys and canonical tokens are stored lowercase. Lookup happens on
/// the already-collapsed (lowercased, whitespace-normalised) form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasTable {
    /// canonical token → variant spellings
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical token and its variant spellings.
    pub fn insert(&mut self, canonical: impl Into<String>, variants: &[&str]) {
        let canonical = canonical.into().to_lowercase();
        let list = self.entries.entry(canonical).or_default();
        for v in variants {
            list.push(v.to_lowercase());
        }
    }

    /// Resolve a collapsed name to its canonical token, or return it as-is.
    pub fn resolve(&self, collapsed: &str) -> String {
        if self.entries.contains_key(collapsed) {
            return collapsed.to_string();
        }
        for (canonical, variants) in &self.entries {
            if variants.iter().any(|v| v == collapsed) {
                return canonical.clone();
            }
        }
        collapsed.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The built-in ingredient alias set: common grain, hop, yeast, and
    /// misc spellings seen in homebrew recipe exports.
    pub fn builtin() -> Self {
        let mut t = AliasTable::new();

        // Grains
        t.insert(
            "2-row",
            &[
                "two-row",
                "2 row",
                "pale malt 2-row",
                "2-row pale",
                "2-row pale malt",
                "american 2-row",
                "us 2-row",
            ],
        );
        t.insert(
            "pilsner",
            &[
                "pils",
                "pilsner malt",
                "pilsen",
                "pils malt",
                "german pilsner",
                "bohemian pilsner",
            ],
        );
        t.insert(
            "munich",
            &["munich malt", "münchner", "munchner", "munich i", "munich ii"],
        );
        t.insert("vienna", &["vienna malt", "wiener"]);
        t.insert("maris otter", &["maris otter pale", "mo", "marris otter"]);
        t.insert("crystal 60", &["caramel 60", "c60", "crystal 60l", "caramel 60l"]);
        t.insert("crystal 40", &["caramel 40", "c40", "crystal 40l", "caramel 40l"]);
        t.insert("crystal 20", &["caramel 20", "c20", "crystal 20l", "caramel 20l"]);
        t.insert("chocolate malt", &["chocolate", "choc malt"]);
        t.insert("black malt", &["black patent", "black patent malt"]);
        t.insert("roasted barley", &["roast barley"]);
        t.insert("wheat malt", &["wheat", "malted wheat"]);
        t.insert("flaked oats", &["oats", "oat flakes"]);
        t.insert("flaked wheat", &["wheat flakes"]);

        // Hops
        t.insert("cascade", &["cascade hops", "cascade (us)", "us cascade"]);
        t.insert("centennial", &["centennial hops", "centennial (us)"]);
        t.insert("citra", &["citra hops", "citra (us)"]);
        t.insert("mosaic", &["mosaic hops", "mosaic (us)"]);
        t.insert("simcoe", &["simcoe hops", "simcoe (us)"]);
        t.insert("amarillo", &["amarillo hops", "amarillo (us)"]);
        t.insert("galaxy", &["galaxy hops", "galaxy (au)", "australian galaxy"]);
        t.insert("nelson sauvin", &["nelson", "nelson sauvin (nz)"]);
        t.insert("saaz", &["saaz hops", "czech saaz"]);
        t.insert(
            "hallertau",
            &["hallertauer", "hallertau mittelfrüh", "hallertauer mittelfruh"],
        );
        t.insert("east kent goldings", &["ekg", "kent goldings", "goldings"]);
        t.insert("fuggle", &["fuggles", "fuggle hops"]);

        // Yeasts
        t.insert(
            "us-05",
            &[
                "safale us-05",
                "us05",
                "american ale yeast",
                "us-05 american ale",
                "fermentis us-05",
            ],
        );
        t.insert(
            "s-04",
            &[
                "safale s-04",
                "s04",
                "english ale yeast",
                "s-04 english ale",
                "fermentis s-04",
            ],
        );
        t.insert("s-33", &["safale s-33", "s33"]);
        t.insert(
            "w-34/70",
            &["saflager w-34/70", "w34/70", "34/70", "german lager yeast"],
        );
        t.insert("nottingham", &["danstar nottingham", "lallemand nottingham"]);
        t.insert("london ale iii", &["wyeast 1318", "1318"]);
        t.insert("california ale", &["wlp001", "wyeast 1056", "1056", "american ale"]);

        // Misc
        t.insert("irish moss", &["carrageenan", "whirlfloc"]);
        t.insert("gypsum", &["calcium sulfate", "caso4"]);
        t.insert("calcium chloride", &["cacl2"]);

        t
    }
}
