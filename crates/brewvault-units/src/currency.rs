//! Currency conversion through a pivot rate table
//!
//! Rates are defined as "multiply a value in currency C by `to_pivot[C]` to
//! get the table's pivot currency". Converting between two non-pivot
//! currencies composes two applications through the pivot. A missing rate is
//! always a [`ConversionError::MissingRate`] — never an assumed 1:1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{convert_mass, ConversionError, ConversionResult, MassUnit};

/// Exchange rates relative to one pivot currency.
///
/// Supplied read-only by the configuration layer; the pivot itself carries
/// an implicit rate of 1.0 and does not need an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub pivot: String,
    pub to_pivot: BTreeMap<String, f64>,
}

impl RateTable {
    pub fn new(pivot: impl Into<String>) -> Self {
        RateTable {
            pivot: pivot.into(),
            to_pivot: BTreeMap::new(),
        }
    }

    pub fn with_rate(mut self, code: impl Into<String>, rate: f64) -> Self {
        self.to_pivot.insert(code.into(), rate);
        self
    }

    /// Rate that converts `code` into the pivot currency.
    fn rate_to_pivot(&self, code: &str) -> Result<f64, ConversionError> {
        if code == self.pivot {
            return Ok(1.0);
        }
        self.to_pivot
            .get(code)
            .copied()
            .ok_or_else(|| ConversionError::MissingRate(code.to_string()))
    }
}

/// Convert a monetary value between currencies, composing through the pivot.
pub fn convert_currency(
    value: f64,
    from: &str,
    to: &str,
    table: &RateTable,
) -> Result<f64, ConversionError> {
    let into_pivot = table.rate_to_pivot(from)?;
    let out_of_pivot = table.rate_to_pivot(to)?;
    Ok(value * into_pivot / out_of_pivot)
}

/// [`convert_currency`] with an audit record.
pub fn convert_currency_detailed(
    value: f64,
    from: &str,
    to: &str,
    table: &RateTable,
) -> Result<ConversionResult, ConversionError> {
    let converted = convert_currency(value, from, to, table)?;
    Ok(ConversionResult::new(value, from, to, converted))
}

/// Convert a per-weight price into the store's fixed persistence form:
/// **price per ounce**, in the store's currency.
///
/// The persisted format keeps every per-weight price in ounces no matter
/// what the display preference is, so any price write-back must pass through
/// this function first. Per-unit prices divide by the mass factor: a price
/// per kilogram becomes a price per ounce by dividing by oz-per-kg.
pub fn price_per_storage_ounce(
    price: f64,
    per_unit: MassUnit,
    from_currency: &str,
    store_currency: &str,
    table: &RateTable,
) -> Result<f64, ConversionError> {
    let in_store_currency = convert_currency(price, from_currency, store_currency, table)?;
    let ounces_per_unit = convert_mass(1.0, per_unit, MassUnit::Oz);
    Ok(in_store_currency / ounces_per_unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> RateTable {
        RateTable::new("GBP")
            .with_rate("USD", 0.79)
            .with_rate("EUR", 0.86)
    }

    #[test]
    fn pivot_rate_is_identity() {
        let t = table();
        assert_relative_eq!(convert_currency(10.0, "GBP", "GBP", &t).unwrap(), 10.0);
    }

    #[test]
    fn converts_into_and_out_of_pivot() {
        let t = table();
        assert_relative_eq!(convert_currency(100.0, "USD", "GBP", &t).unwrap(), 79.0);
        assert_relative_eq!(convert_currency(79.0, "GBP", "USD", &t).unwrap(), 100.0);
    }

    #[test]
    fn cross_rates_compose_through_pivot() {
        let t = table();
        let direct = convert_currency(50.0, "USD", "EUR", &t).unwrap();
        let via = convert_currency(
            convert_currency(50.0, "USD", "GBP", &t).unwrap(),
            "GBP",
            "EUR",
            &t,
        )
        .unwrap();
        assert_relative_eq!(direct, via, epsilon = 1e-9);
        assert_relative_eq!(direct, 50.0 * 0.79 / 0.86, epsilon = 1e-9);
    }

    #[test]
    fn missing_rate_names_the_currency() {
        let t = table();
        let err = convert_currency(1.0, "JPY", "GBP", &t).unwrap_err();
        assert_eq!(err, ConversionError::MissingRate("JPY".to_string()));
        let err = convert_currency(1.0, "GBP", "CHF", &t).unwrap_err();
        assert_eq!(err, ConversionError::MissingRate("CHF".to_string()));
    }

    #[test]
    fn storage_price_is_per_ounce() {
        let t = table();
        // £3.75/kg → £/oz: divide by 35.2739…
        let p = price_per_storage_ounce(3.75, MassUnit::Kg, "GBP", "GBP", &t).unwrap();
        assert_relative_eq!(p, 3.75 / 35.273_961_949_580_414, epsilon = 1e-9);

        // €25/kg hops to GBP storage
        let p = price_per_storage_ounce(25.0, MassUnit::Kg, "EUR", "GBP", &t).unwrap();
        assert_relative_eq!(p, 25.0 * 0.86 / 35.273_961_949_580_414, epsilon = 1e-9);

        // already per ounce: only the currency moves
        let p = price_per_storage_ounce(0.10, MassUnit::Oz, "USD", "GBP", &t).unwrap();
        assert_relative_eq!(p, 0.079, epsilon = 1e-9);
    }

    #[test]
    fn storage_price_round_trips_back_to_display_unit() {
        let t = table();
        let stored = price_per_storage_ounce(3.75, MassUnit::Kg, "GBP", "GBP", &t).unwrap();
        let display = stored * convert_mass(1.0, MassUnit::Kg, MassUnit::Oz);
        assert_relative_eq!(display, 3.75, epsilon = 1e-9);
    }
}
