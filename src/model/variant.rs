//! Project variant documents: the building model that gets assessed

use serde::{Deserialize, Serialize};

use super::ElementTypeCode;
use crate::lca::{Quantity, Unit};

/// `kind: variant` - one design variant of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,

    /// Project this variant belongs to
    pub project: String,

    #[serde(default)]
    pub name: String,

    /// Net floor area according to EnEV in m2
    #[serde(default)]
    pub ngf_en_ev: f64,

    #[serde(default)]
    pub elements: Vec<Element>,

    #[serde(default)]
    pub final_energy_demands: Vec<FinalEnergyDemand>,

    #[serde(default)]
    pub final_energy_supplies: Vec<FinalEnergySupply>,

    #[serde(default)]
    pub final_energy_ref_models: Vec<FinalEnergyRefModel>,

    #[serde(default)]
    pub transports: Vec<Transport>,
}

impl Variant {
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Composite element that lists `id` as one of its sub-elements
    pub fn composite_of(&self, id: &str) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| e.elements.iter().any(|sub| sub == id))
    }

    /// Elements not contained in any composite
    pub fn top_level_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(move |e| self.composite_of(&e.id).is_none())
    }
}

/// A building element (wall, slab, ...) of a given element type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub element_type: ElementTypeCode,

    pub quantity: f64,

    pub ref_unit: Unit,

    /// Sub-element ids; non-empty makes this a composite element
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<String>,

    #[serde(default)]
    pub components: Vec<Component>,
}

impl Element {
    pub fn is_composite(&self) -> bool {
        !self.elements.is_empty()
    }
}

/// Geometry of a layer component per element reference unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Thickness in m
    pub size: f64,

    #[serde(default = "default_one")]
    pub area_ratio: f64,

    #[serde(default = "default_one")]
    pub length: f64,

    #[serde(default = "default_one")]
    pub width: f64,
}

impl Layer {
    /// Volume in m3 per element reference unit
    pub fn volume(&self) -> f64 {
        self.size * self.length * self.width * self.area_ratio
    }
}

fn default_one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// A material layer or single component of an element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,

    pub process_config: String,

    /// Quantity per element reference unit (non-layer components)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<Layer>,

    /// Service life in years
    pub life_time: u32,

    /// Years before the first replacement of extant components
    #[serde(default)]
    pub life_time_delay: u32,

    #[serde(default = "default_true")]
    pub calc_lca: bool,

    /// Already exists in the building (no production impact)
    #[serde(default)]
    pub extant: bool,
}

impl Component {
    pub fn is_layer(&self) -> bool {
        self.layer.is_some()
    }

    /// Total quantity of this component within `element`
    ///
    /// Layers yield their volume in m3, other components their quantity in
    /// their own unit. `None` when neither is given.
    pub fn quantity_in(&self, element: &Element) -> Option<Quantity> {
        if let Some(layer) = &self.layer {
            return Some(Quantity::new(layer.volume() * element.quantity, Unit::m3()));
        }

        let quantity = self.quantity?;
        let unit = self.unit.clone().unwrap_or_else(|| element.ref_unit.clone());
        Some(Quantity::new(quantity * element.quantity, unit))
    }
}

/// Annual final energy demand per m2 NGF, split by use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEnergyDemand {
    pub id: String,

    pub process_config: String,

    #[serde(default)]
    pub heating: f64,

    #[serde(default)]
    pub water: f64,

    #[serde(default)]
    pub lighting: f64,

    #[serde(default)]
    pub ventilation: f64,

    #[serde(default)]
    pub cooling: f64,
}

impl FinalEnergyDemand {
    /// qE in kWh/(m2*a)
    pub fn total(&self) -> f64 {
        self.heating + self.water + self.lighting + self.ventilation + self.cooling
    }
}

/// Annual energy supplied by the building (e.g. photovoltaics)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEnergySupply {
    pub id: String,

    pub process_config: String,

    /// kWh/a
    pub quantity: f64,

    /// Share already accounted for in the EnEV balance
    #[serde(default)]
    pub en_ev_ratio: f64,
}

impl FinalEnergySupply {
    /// qE in kWh/a
    pub fn total(&self) -> f64 {
        self.quantity * (1.0 - self.en_ev_ratio)
    }
}

/// Demand of the reference building for one energy use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEnergyRefModel {
    pub id: String,

    /// heating, water, lighting, ventilation or cooling
    pub ident: String,

    #[serde(default)]
    pub heating: f64,

    #[serde(default)]
    pub water: f64,

    #[serde(default)]
    pub lighting: f64,

    #[serde(default)]
    pub ventilation: f64,

    #[serde(default)]
    pub cooling: f64,
}

impl FinalEnergyRefModel {
    pub fn total(&self) -> f64 {
        self.heating + self.water + self.lighting + self.ventilation + self.cooling
    }
}

/// Transport of a load, made up of one or more transport means
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Load in t
    pub quantity: f64,

    #[serde(default = "default_true")]
    pub calc_lca: bool,

    #[serde(default)]
    pub means: Vec<TransportMean>,
}

/// One leg of a transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMean {
    pub id: String,

    pub process_config: String,

    /// km
    pub distance: f64,

    #[serde(default = "default_one")]
    pub efficiency: f64,
}

impl TransportMean {
    /// Transport performance in tkm
    pub fn quantity(&self, transport: &Transport) -> Quantity {
        Quantity::new(transport.quantity * self.distance * self.efficiency, Unit::tkm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant() -> Variant {
        serde_yml::from_str(
            r#"
id: v1
project: office
elements:
  - id: facade
    element_type: "330"
    quantity: 100
    ref_unit: m2
    elements: [wall]
  - id: wall
    element_type: "331"
    quantity: 100
    ref_unit: m2
    components:
      - id: concrete
        process_config: concrete
        layer: { size: 0.2 }
        life_time: 80
      - id: anchors
        process_config: steel
        quantity: 0.5
        unit: kg
        life_time: 50
  - id: roof
    element_type: "361"
    quantity: 80
    ref_unit: m2
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_top_level_elements_skip_sub_elements() {
        let v = variant();
        let ids: Vec<&str> = v.top_level_elements().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["facade", "roof"]);
        assert_eq!(v.composite_of("wall").map(|e| e.id.as_str()), Some("facade"));
        assert!(v.element("facade").unwrap().is_composite());
    }

    #[test]
    fn test_component_quantities() {
        let v = variant();
        let wall = v.element("wall").unwrap();

        let layer = wall.components[0].quantity_in(wall).unwrap();
        assert_eq!(layer.unit(), &Unit::m3());
        assert!((layer.value() - 20.0).abs() < 1e-9);

        let anchors = wall.components[1].quantity_in(wall).unwrap();
        assert_eq!(anchors.unit(), &Unit::kg());
        assert_eq!(anchors.value(), 50.0);
    }

    #[test]
    fn test_energy_totals() {
        let demand = FinalEnergyDemand {
            id: "d".into(),
            process_config: "gas".into(),
            heating: 40.0,
            water: 10.0,
            lighting: 0.0,
            ventilation: 2.0,
            cooling: 0.0,
        };
        assert_eq!(demand.total(), 52.0);

        let supply = FinalEnergySupply {
            id: "pv".into(),
            process_config: "pv".into(),
            quantity: 1000.0,
            en_ev_ratio: 0.25,
        };
        assert_eq!(supply.total(), 750.0);
    }

    #[test]
    fn test_transport_mean_quantity() {
        let transport = Transport {
            id: "t".into(),
            name: String::new(),
            quantity: 48.0,
            calc_lca: true,
            means: vec![],
        };
        let mean = TransportMean {
            id: "truck".into(),
            process_config: "truck".into(),
            distance: 100.0,
            efficiency: 1.0,
        };
        let q = mean.quantity(&transport);
        assert_eq!(q.value(), 4800.0);
        assert_eq!(q.unit(), &Unit::tkm());
    }
}
