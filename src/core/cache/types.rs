//! Cache type definitions
//!
//! Item kinds of the result tree and the rows returned by cache queries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

// =========================================================================
// Item Types
// =========================================================================

/// Kind of a node in the result tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    ProjectVariant,
    ElementType,
    Element,
    ElementComponent,
    FinalEnergyDemand,
    FinalEnergySupply,
    FinalEnergyRefModel,
    TransportMean,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::ProjectVariant => "project_variant",
            ItemType::ElementType => "element_type",
            ItemType::Element => "element",
            ItemType::ElementComponent => "element_component",
            ItemType::FinalEnergyDemand => "final_energy_demand",
            ItemType::FinalEnergySupply => "final_energy_supply",
            ItemType::FinalEnergyRefModel => "final_energy_ref_model",
            ItemType::TransportMean => "transport_mean",
        }
    }

    /// Leaf items carry raw indicator values; all others aggregate
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            ItemType::ProjectVariant | ItemType::ElementType | ItemType::Element
        )
    }

    /// Typed table and model id column of leaf items holding a quantity
    pub(super) fn leaf_table(&self) -> Option<(&'static str, &'static str)> {
        match self {
            ItemType::FinalEnergyDemand => Some(("final_energy_demands", "demand_id")),
            ItemType::FinalEnergySupply => Some(("final_energy_supplies", "supply_id")),
            ItemType::FinalEnergyRefModel => Some(("final_energy_ref_models", "ref_model_id")),
            ItemType::TransportMean => Some(("transport_means", "transport_mean_id")),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_variant" => Ok(ItemType::ProjectVariant),
            "element_type" => Ok(ItemType::ElementType),
            "element" => Ok(ItemType::Element),
            "element_component" => Ok(ItemType::ElementComponent),
            "final_energy_demand" => Ok(ItemType::FinalEnergyDemand),
            "final_energy_supply" => Ok(ItemType::FinalEnergySupply),
            "final_energy_ref_model" => Ok(ItemType::FinalEnergyRefModel),
            "transport_mean" => Ok(ItemType::TransportMean),
            _ => Err(format!("unknown item type: {}", s)),
        }
    }
}

/// Project and variant a store operation works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScope {
    pub project_id: String,
    pub variant_id: String,
}

impl CacheScope {
    pub fn new(project_id: impl Into<String>, variant_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            variant_id: variant_id.into(),
        }
    }
}

// =========================================================================
// Aggregation
// =========================================================================

/// Outcome of an aggregation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateStats {
    pub items_updated: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// One raw indicator value as input to leaf totals
#[derive(Debug, Clone, PartialEq)]
pub struct RawIndicatorValue {
    pub life_cycle_ident: String,
    pub indicator_ident: String,
    pub value: Option<f64>,
    pub is_partial: bool,
}

/// Totals keyed by (life cycle ident, indicator ident)
pub type Totals = BTreeMap<(String, String), f64>;

// =========================================================================
// Query Results
// =========================================================================

/// An indicator from the cached catalog
#[derive(Debug, Clone, Serialize)]
pub struct CachedIndicator {
    pub ident: String,
    pub name: String,
    pub unit: String,
}

/// Aggregated value of one indicator
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorTotal {
    pub indicator: String,
    pub name: String,
    pub unit: String,
    pub value: f64,
}

/// Aggregated value of one indicator in one life cycle module or phase
#[derive(Debug, Clone, Serialize)]
pub struct LifeCycleEffect {
    pub life_cycle: String,
    /// `module` or `phase`
    pub kind: String,
    pub indicator: String,
    pub value: f64,
}

/// Totals of an element type node
#[derive(Debug, Clone, Serialize)]
pub struct ElementTypeEffect {
    pub code: String,
    pub level: u8,
    pub mass: f64,
    pub indicator: String,
    pub value: f64,
}

/// A cached component of an element
#[derive(Debug, Clone, Serialize)]
pub struct CachedComponent {
    pub component_id: String,
    pub quantity: f64,
    pub ref_unit: String,
    pub mass: f64,
    pub num_replacements: u32,
    pub is_outdated: bool,
}

/// Everything cached for one element
#[derive(Debug, Clone, Serialize)]
pub struct ElementEffects {
    pub element_id: String,
    pub item_id: i64,
    pub element_type: String,
    pub is_virtual: bool,
    pub is_outdated: bool,
    pub composite: Option<String>,
    pub quantity: f64,
    pub ref_unit: String,
    pub mass: f64,
    pub effects: Vec<LifeCycleEffect>,
    pub components: Vec<CachedComponent>,
}

/// Raw results of a final energy or transport item
#[derive(Debug, Clone, Serialize)]
pub struct LeafEffect {
    pub item_type: ItemType,
    pub id: String,
    pub quantity: f64,
    pub ref_unit: String,
    pub is_virtual: bool,
    pub life_cycle: String,
    pub indicator: String,
    pub value: f64,
}

/// An element ranked by one indicator
#[derive(Debug, Clone, Serialize)]
pub struct ElementRanking {
    pub element_id: String,
    pub element_type: String,
    pub mass: f64,
    pub value: f64,
}

/// Cache state of one variant
#[derive(Debug, Clone, Serialize)]
pub struct VariantStatus {
    pub variant_id: String,
    pub project_id: String,
    pub items: usize,
    pub outdated_items: usize,
    pub source_hash: Option<String>,
    pub computed_at: Option<String>,
}

/// Inconsistency found by [`super::ResultCache::check`]
#[derive(Debug, Clone, Serialize)]
pub struct CheckIssue {
    pub item_id: i64,
    pub item_type: String,
    pub message: String,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_items: usize,
    pub outdated_items: usize,
    pub indicator_values: usize,
    pub variants: usize,
    pub by_type: BTreeMap<String, usize>,
    pub db_size_bytes: u64,
}
