//! Unit conversions for brewing measurements
//!
//! Every quantity family has a single designated base unit and all
//! conversions are base-normalized (value → base → target), so conversions
//! compose associatively and A→B→A round-trips within [`EPSILON`]:
//!
//! - Mass: grams
//! - Volume: litres
//! - Temperature: Celsius
//! - Colour: EBC
//!
//! Unknown unit tokens are a hard [`ConversionError`]; there is no unit
//! inference. Currency conversion lives in [`currency`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod currency;

pub use currency::{convert_currency, price_per_storage_ounce, RateTable};

/// Relative tolerance guaranteed for A→B→A round-trips.
pub const EPSILON: f64 = 1e-9;

/// Conversion failures. The offending token is always carried verbatim so
/// callers can surface it without re-deriving anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    #[error("no exchange rate for currency: {0}")]
    MissingRate(String),
}

// ============================================================================
// Unit enums
// ============================================================================

/// Mass units. Base unit: grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassUnit {
    Kg,
    G,
    Mg,
    Lb,
    Oz,
}

/// Volume units. Base unit: litres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeUnit {
    L,
    Ml,
    GalUs,
    GalUk,
    Qt,
    PtUs,
    PtUk,
    FlOzUs,
    FlOzUk,
    /// US barrel (31 US gallons).
    Bbl,
}

/// Temperature units. Base unit: Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    C,
    F,
    K,
}

/// Beer colour units. Base unit: EBC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorUnit {
    Ebc,
    Srm,
    Lovibond,
}

impl MassUnit {
    /// Grams per one of this unit.
    fn to_grams(self) -> f64 {
        match self {
            MassUnit::Kg => 1000.0,
            MassUnit::G => 1.0,
            MassUnit::Mg => 0.001,
            MassUnit::Lb => 453.592_37,
            MassUnit::Oz => 28.349_523_125,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            MassUnit::Kg => "kg",
            MassUnit::G => "g",
            MassUnit::Mg => "mg",
            MassUnit::Lb => "lb",
            MassUnit::Oz => "oz",
        }
    }
}

impl VolumeUnit {
    /// Litres per one of this unit.
    fn to_litres(self) -> f64 {
        match self {
            VolumeUnit::L => 1.0,
            VolumeUnit::Ml => 0.001,
            VolumeUnit::GalUs => 3.785_411_784,
            VolumeUnit::GalUk => 4.546_09,
            VolumeUnit::Qt => 0.946_352_946,
            VolumeUnit::PtUs => 0.473_176_473,
            VolumeUnit::PtUk => 0.568_261_25,
            VolumeUnit::FlOzUs => 0.029_573_529_562_5,
            VolumeUnit::FlOzUk => 0.028_413_062_5,
            VolumeUnit::Bbl => 117.347_765,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            VolumeUnit::L => "l",
            VolumeUnit::Ml => "ml",
            VolumeUnit::GalUs => "gal_us",
            VolumeUnit::GalUk => "gal_uk",
            VolumeUnit::Qt => "qt",
            VolumeUnit::PtUs => "pt_us",
            VolumeUnit::PtUk => "pt_uk",
            VolumeUnit::FlOzUs => "fl_oz_us",
            VolumeUnit::FlOzUk => "fl_oz_uk",
            VolumeUnit::Bbl => "bbl",
        }
    }
}

impl TemperatureUnit {
    pub fn token(self) -> &'static str {
        match self {
            TemperatureUnit::C => "c",
            TemperatureUnit::F => "f",
            TemperatureUnit::K => "k",
        }
    }
}

impl ColorUnit {
    pub fn token(self) -> &'static str {
        match self {
            ColorUnit::Ebc => "ebc",
            ColorUnit::Srm => "srm",
            ColorUnit::Lovibond => "lovibond",
        }
    }
}

impl FromStr for MassUnit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Ok(MassUnit::Kg),
            "g" => Ok(MassUnit::G),
            "mg" => Ok(MassUnit::Mg),
            "lb" => Ok(MassUnit::Lb),
            "oz" => Ok(MassUnit::Oz),
            other => Err(ConversionError::UnknownUnit(other.to_string())),
        }
    }
}

impl FromStr for VolumeUnit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" => Ok(VolumeUnit::L),
            "ml" => Ok(VolumeUnit::Ml),
            "gal_us" => Ok(VolumeUnit::GalUs),
            "gal_uk" => Ok(VolumeUnit::GalUk),
            "qt" => Ok(VolumeUnit::Qt),
            "pt_us" => Ok(VolumeUnit::PtUs),
            "pt_uk" => Ok(VolumeUnit::PtUk),
            "fl_oz_us" => Ok(VolumeUnit::FlOzUs),
            "fl_oz_uk" => Ok(VolumeUnit::FlOzUk),
            "bbl" => Ok(VolumeUnit::Bbl),
            other => Err(ConversionError::UnknownUnit(other.to_string())),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" => Ok(TemperatureUnit::C),
            "f" => Ok(TemperatureUnit::F),
            "k" => Ok(TemperatureUnit::K),
            other => Err(ConversionError::UnknownUnit(other.to_string())),
        }
    }
}

impl FromStr for ColorUnit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ebc" => Ok(ColorUnit::Ebc),
            "srm" => Ok(ColorUnit::Srm),
            "lovibond" | "l" => Ok(ColorUnit::Lovibond),
            other => Err(ConversionError::UnknownUnit(other.to_string())),
        }
    }
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for ColorUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// One conversion step, with enough context for audit/debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub original: f64,
    pub from: String,
    pub to: String,
    /// Multiplicative factor applied (`value = original * factor`).
    /// Temperature has an affine offset, so the factor there is reported
    /// as `value / original` only when `original` is non-zero.
    pub factor: f64,
    pub value: f64,
}

impl ConversionResult {
    fn new(original: f64, from: impl fmt::Display, to: impl fmt::Display, value: f64) -> Self {
        let factor = if original != 0.0 { value / original } else { 1.0 };
        ConversionResult {
            original,
            from: from.to_string(),
            to: to.to_string(),
            factor,
            value,
        }
    }
}

/// Convert a mass value between units via grams.
pub fn convert_mass(value: f64, from: MassUnit, to: MassUnit) -> f64 {
    value * from.to_grams() / to.to_grams()
}

/// Convert a volume value between units via litres.
pub fn convert_volume(value: f64, from: VolumeUnit, to: VolumeUnit) -> f64 {
    value * from.to_litres() / to.to_litres()
}

/// Convert a temperature between units via Celsius.
pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    let celsius = match from {
        TemperatureUnit::C => value,
        TemperatureUnit::F => (value - 32.0) * 5.0 / 9.0,
        TemperatureUnit::K => value - 273.15,
    };
    match to {
        TemperatureUnit::C => celsius,
        TemperatureUnit::F => celsius * 9.0 / 5.0 + 32.0,
        TemperatureUnit::K => celsius + 273.15,
    }
}

/// EBC per SRM.
const EBC_PER_SRM: f64 = 1.97;
/// SRM = LOVIBOND_SLOPE * °L + LOVIBOND_OFFSET.
const LOVIBOND_SLOPE: f64 = 1.3546;
const LOVIBOND_OFFSET: f64 = -0.76;

/// Convert a beer colour between scales via EBC.
///
/// The Lovibond↔SRM relation is affine (SRM = 1.3546·°L − 0.76), so the
/// round-trip is exact up to float noise; negative SRM from tiny Lovibond
/// inputs is clamped to zero on the way in, matching the reference tables.
pub fn convert_color(value: f64, from: ColorUnit, to: ColorUnit) -> f64 {
    let ebc = match from {
        ColorUnit::Ebc => value,
        ColorUnit::Srm => value * EBC_PER_SRM,
        ColorUnit::Lovibond => {
            let srm = LOVIBOND_SLOPE * value + LOVIBOND_OFFSET;
            srm.max(0.0) * EBC_PER_SRM
        }
    };
    match to {
        ColorUnit::Ebc => ebc,
        ColorUnit::Srm => ebc / EBC_PER_SRM,
        ColorUnit::Lovibond => (ebc / EBC_PER_SRM - LOVIBOND_OFFSET) / LOVIBOND_SLOPE,
    }
}

/// [`convert_mass`] with an audit record.
pub fn convert_mass_detailed(value: f64, from: MassUnit, to: MassUnit) -> ConversionResult {
    ConversionResult::new(value, from, to, convert_mass(value, from, to))
}

/// [`convert_volume`] with an audit record.
pub fn convert_volume_detailed(value: f64, from: VolumeUnit, to: VolumeUnit) -> ConversionResult {
    ConversionResult::new(value, from, to, convert_volume(value, from, to))
}

/// [`convert_temperature`] with an audit record.
pub fn convert_temperature_detailed(
    value: f64,
    from: TemperatureUnit,
    to: TemperatureUnit,
) -> ConversionResult {
    ConversionResult::new(value, from, to, convert_temperature(value, from, to))
}

/// [`convert_color`] with an audit record.
pub fn convert_color_detailed(value: f64, from: ColorUnit, to: ColorUnit) -> ConversionResult {
    ConversionResult::new(value, from, to, convert_color(value, from, to))
}

// ============================================================================
// Gravity scales
// ============================================================================

/// Specific gravity to degrees Plato (Plato = 259 − 259/SG).
pub fn sg_to_plato(sg: f64) -> f64 {
    259.0 - (259.0 / sg)
}

/// Degrees Plato to specific gravity.
pub fn plato_to_sg(plato: f64) -> f64 {
    259.0 / (259.0 - plato)
}

/// Specific gravity to Brix. Only accurate for unfermented wort.
pub fn sg_to_brix(sg: f64) -> f64 {
    ((182.4601 * sg - 775.6821) * sg + 1262.7794) * sg - 669.5622
}

/// Brix to specific gravity. Only accurate for unfermented wort.
pub fn brix_to_sg(brix: f64) -> f64 {
    (brix / (258.6 - ((brix / 258.2) * 227.1))) + 1.0
}
