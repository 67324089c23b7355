//! Project documents

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lca::{LifeCycleUsage, LifeCycleUsages};

/// `kind: project` - a building project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Reference study period in years
    pub life_time: u32,

    /// Process database used for all variants
    pub process_db: String,

    /// Usages replacing the defaults for their module
    #[serde(default)]
    pub life_cycle_usages: Vec<LifeCycleUsage>,

    /// Reference model ident (heating, water, ...) -> process config id
    #[serde(default)]
    pub ref_model_processes: BTreeMap<String, String>,
}

impl ProjectSpec {
    pub fn usages(&self) -> LifeCycleUsages {
        LifeCycleUsages::default().with_overrides(self.life_cycle_usages.iter().copied())
    }
}
