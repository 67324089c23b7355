//! Units, quantities and unit conversion

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

use super::CalcError;

/// A unit of measure, normalised to its short symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Unit(String);

impl Unit {
    pub const KG: &'static str = "kg";
    pub const M3: &'static str = "m3";
    pub const KWH: &'static str = "kWh";
    pub const TKM: &'static str = "tkm";
    pub const PIECE: &'static str = "piece";

    pub fn new(symbol: impl AsRef<str>) -> Self {
        let symbol = symbol.as_ref().trim();
        let normalized = match symbol {
            "m²" | "qm" => "m2",
            "m³" | "cbm" => "m3",
            "Stück" | "Stk" | "pcs" | "pce" | "pc" => Self::PIECE,
            "kwh" | "KWH" | "kWH" => Self::KWH,
            "KG" | "Kg" => Self::KG,
            other => other,
        };
        Self(normalized.to_string())
    }

    pub fn kg() -> Self {
        Self(Self::KG.to_string())
    }

    pub fn m3() -> Self {
        Self(Self::M3.to_string())
    }

    pub fn kwh() -> Self {
        Self(Self::KWH.to_string())
    }

    pub fn tkm() -> Self {
        Self(Self::TKM.to_string())
    }

    pub fn piece() -> Self {
        Self(Self::PIECE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Unit {
    fn from(value: String) -> Self {
        Unit::new(value)
    }
}

impl From<&str> for Unit {
    fn from(value: &str) -> Self {
        Unit::new(value)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.0
    }
}

/// A value with a unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Same unit, value scaled by `factor`
    pub fn times(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            unit: self.unit.clone(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Conversion factor between two units: `1 from == factor to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: Unit,
    pub to: Unit,
    pub factor: f64,
}

/// Converts values using the conversions of one process configuration
#[derive(Debug, Clone, Default)]
pub struct Converter {
    context: String,
    conversions: Vec<Conversion>,
}

impl Converter {
    /// `context` names the owner of the conversions in error messages
    pub fn new(context: impl Into<String>, conversions: Vec<Conversion>) -> Self {
        Self {
            context: context.into(),
            conversions,
        }
    }

    /// Convert `value` from one unit into another
    ///
    /// Uses the direct conversion if one exists, otherwise the inverse of the
    /// reverse conversion.
    pub fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, CalcError> {
        if from == to {
            return Ok(value);
        }

        if let Some(conversion) = self.find(from, to) {
            return Ok(value * conversion.factor);
        }

        if let Some(conversion) = self.find(to, from) {
            if conversion.factor != 0.0 {
                return Ok(value / conversion.factor);
            }
        }

        error!(context = %self.context, %from, %to, "no conversion available");
        Err(CalcError::ConversionNotFound {
            context: self.context.clone(),
            from: from.clone(),
            to: to.clone(),
        })
    }

    pub fn convert_quantity(&self, quantity: &Quantity, to: &Unit) -> Result<Quantity, CalcError> {
        let value = self.convert(quantity.value(), quantity.unit(), to)?;
        Ok(Quantity::new(value, to.clone()))
    }

    fn find(&self, from: &Unit, to: &Unit) -> Option<&Conversion> {
        self.conversions
            .iter()
            .find(|c| &c.from == from && &c.to == to)
    }
}
