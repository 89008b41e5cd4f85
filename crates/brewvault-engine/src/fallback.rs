//! Hardcoded fallback layer
//!
//! The lowest cascade layer: the values used when neither the caller nor
//! the preference document says anything. Versioned so that a future change
//! to a shipped default is visible in diagnostics rather than silent.

use brewvault_store::{EntityKind, FieldMap, FieldValue};

pub const FALLBACK_VERSION: &str = "v1";

/// Defaults applying to every kind.
fn global_defaults(map: &mut FieldMap) {
    map.insert("currency".into(), FieldValue::Text("GBP".into()));
    map.insert("weight_unit".into(), FieldValue::Text("kg".into()));
    map.insert("volume_unit".into(), FieldValue::Text("l".into()));
    map.insert("match_threshold".into(), FieldValue::Number(0.6));
}

/// The `FALLBACK_VERSION` fallback table for one kind.
pub fn fallback_layer(kind: EntityKind) -> FieldMap {
    let mut map = FieldMap::new();
    global_defaults(&mut map);
    match kind {
        EntityKind::Recipe => {
            map.insert(
                "equipment_profile".into(),
                FieldValue::Text("Brew Pot (5 Gal) and Cooler".into()),
            );
            map.insert(
                "mash_profile".into(),
                FieldValue::Text("Single Infusion, Medium Body".into()),
            );
            map.insert(
                "age_profile".into(),
                FieldValue::Text("Ale, Two Stage".into()),
            );
            map.insert(
                "carbonation_profile".into(),
                FieldValue::Text("Bottle".into()),
            );
            map.insert("batch_volume_l".into(), FieldValue::Number(19.0));
            map.insert("boil_time_min".into(), FieldValue::Int(60));
        }
        EntityKind::Hop => {
            map.insert("form".into(), FieldValue::Text("Pellet".into()));
        }
        EntityKind::Grain => {
            map.insert("origin".into(), FieldValue::Text("UK".into()));
        }
        EntityKind::MashProfile => {
            map.insert("mash_thickness_l_per_kg".into(), FieldValue::Number(2.6));
        }
        EntityKind::CarbonationProfile => {
            map.insert("volumes_co2".into(), FieldValue::Number(2.4));
        }
        _ => {}
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_the_global_defaults() {
        for kind in brewvault_store::ALL_KINDS {
            let layer = fallback_layer(kind);
            assert_eq!(layer.get("currency"), Some(&FieldValue::Text("GBP".into())));
            assert!(layer.contains_key("weight_unit"));
            assert!(layer.contains_key("match_threshold"));
        }
    }

    #[test]
    fn recipe_fallback_names_all_four_profiles() {
        let layer = fallback_layer(EntityKind::Recipe);
        for field in [
            "equipment_profile",
            "mash_profile",
            "age_profile",
            "carbonation_profile",
        ] {
            assert!(layer.contains_key(field), "missing {field}");
        }
    }
}
