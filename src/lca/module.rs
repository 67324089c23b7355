//! Life cycle modules and the stages they roll up into
//!
//! Modules follow EN 15804 (`A1` .. `D`). Older process databases only know
//! the coarse stage idents (`prod`, `op`, `eol`, ...), which are accepted as
//! "legacy" modules that map onto themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Broad life cycle stage (phase) of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Prod,
    Op,
    Eol,
    Rec,
    Maint,
    Total,
}

impl Stage {
    /// Stages in reporting order
    pub const ALL: [Stage; 6] = [
        Stage::Prod,
        Stage::Op,
        Stage::Eol,
        Stage::Rec,
        Stage::Maint,
        Stage::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prod => "prod",
            Stage::Op => "op",
            Stage::Eol => "eol",
            Stage::Rec => "rec",
            Stage::Maint => "maint",
            Stage::Total => "total",
        }
    }

    pub fn is_one_of(&self, stages: &[Stage]) -> bool {
        stages.contains(self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prod" => Ok(Stage::Prod),
            "op" | "use" => Ok(Stage::Op),
            "eol" => Ok(Stage::Eol),
            "rec" => Ok(Stage::Rec),
            "maint" => Ok(Stage::Maint),
            "total" => Ok(Stage::Total),
            _ => Err(format!("Invalid life cycle stage: {}", s)),
        }
    }
}

/// A life cycle ident such as `A1-3`, `B6` or `D`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Module {
    A1,
    A2,
    A3,
    A13,
    A4,
    A5,
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    C1,
    C2,
    C3,
    C4,
    D,
    /// Coarse stage ident used by older process databases and for aggregates
    Legacy(Stage),
}

impl Module {
    /// All module idents in reporting order
    pub const ALL: [Module; 24] = [
        Module::A1,
        Module::A2,
        Module::A3,
        Module::A13,
        Module::A4,
        Module::A5,
        Module::B1,
        Module::B2,
        Module::B3,
        Module::B4,
        Module::B5,
        Module::B6,
        Module::B7,
        Module::C1,
        Module::C2,
        Module::C3,
        Module::C4,
        Module::D,
        Module::Legacy(Stage::Prod),
        Module::Legacy(Stage::Op),
        Module::Legacy(Stage::Eol),
        Module::Legacy(Stage::Rec),
        Module::Legacy(Stage::Maint),
        Module::Legacy(Stage::Total),
    ];

    pub fn maintenance() -> Self {
        Module::Legacy(Stage::Maint)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::A1 => "A1",
            Module::A2 => "A2",
            Module::A3 => "A3",
            Module::A13 => "A1-3",
            Module::A4 => "A4",
            Module::A5 => "A5",
            Module::B1 => "B1",
            Module::B2 => "B2",
            Module::B3 => "B3",
            Module::B4 => "B4",
            Module::B5 => "B5",
            Module::B6 => "B6",
            Module::B7 => "B7",
            Module::C1 => "C1",
            Module::C2 => "C2",
            Module::C3 => "C3",
            Module::C4 => "C4",
            Module::D => "D",
            Module::Legacy(stage) => stage.as_str(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Module::A1 | Module::A2 | Module::A3 | Module::A13 | Module::A4 | Module::A5 => {
                Stage::Prod
            }
            Module::B1
            | Module::B2
            | Module::B3
            | Module::B4
            | Module::B5
            | Module::B6
            | Module::B7 => Stage::Op,
            Module::C1 | Module::C2 | Module::C3 | Module::C4 => Stage::Eol,
            Module::D => Stage::Rec,
            Module::Legacy(stage) => *stage,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Module::Legacy(_))
    }

    pub fn is_a13(&self) -> bool {
        *self == Module::A13
    }

    pub fn is_a1_a2_or_a3(&self) -> bool {
        matches!(self, Module::A1 | Module::A2 | Module::A3)
    }

    pub fn is_a4(&self) -> bool {
        *self == Module::A4
    }

    pub fn is_maintenance(&self) -> bool {
        *self == Module::Legacy(Stage::Maint)
    }

    /// Usage stage module (`B1`..`B7` or legacy `op`)
    pub fn is_usage(&self) -> bool {
        self.stage() == Stage::Op
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = match trimmed.to_uppercase().as_str() {
            "A13" => "A1-3".to_string(),
            other => other.to_string(),
        };

        if let Some(module) = Module::ALL
            .iter()
            .find(|m| !m.is_legacy() && m.as_str() == normalized)
        {
            return Ok(*module);
        }

        trimmed
            .parse::<Stage>()
            .map(Module::Legacy)
            .map_err(|_| format!("Invalid life cycle module: {}", s))
    }
}

impl TryFrom<String> for Module {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Module> for String {
    fn from(module: Module) -> Self {
        module.as_str().to_string()
    }
}
