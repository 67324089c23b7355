//! Element type codes (DIN 276 cost groups)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A three digit DIN 276 cost group such as `331`
///
/// Codes form a three level hierarchy: `300` > `330` > `331`. Level 2 codes
/// hold composite elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementTypeCode(String);

impl ElementTypeCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 1 for `x00`, 2 for `xy0`, 3 for `xyz`
    pub fn level(&self) -> u8 {
        let bytes = self.0.as_bytes();
        if bytes[1] == b'0' && bytes[2] == b'0' {
            1
        } else if bytes[2] == b'0' {
            2
        } else {
            3
        }
    }

    pub fn parent(&self) -> Option<Self> {
        match self.level() {
            1 => None,
            2 => Some(Self(format!("{}00", &self.0[..1]))),
            _ => Some(Self(format!("{}0", &self.0[..2]))),
        }
    }

    pub fn is_composite_level(&self) -> bool {
        self.level() == 2
    }

    /// This code followed by all of its ancestors, root last
    pub fn lineage(&self) -> Vec<Self> {
        let mut lineage = vec![self.clone()];
        let mut current = self.parent();
        while let Some(code) = current {
            current = code.parent();
            lineage.push(code);
        }
        lineage
    }
}

impl fmt::Display for ElementTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ElementTypeCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = s.len() == 3
            && s.bytes().all(|b| b.is_ascii_digit())
            && !s.starts_with('0')
            && !(s.as_bytes()[1] == b'0' && s.as_bytes()[2] != b'0');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("Invalid element type code: '{}' (expected a DIN 276 code like 331)", s))
        }
    }
}

impl TryFrom<String> for ElementTypeCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ElementTypeCode> for String {
    fn from(code: ElementTypeCode) -> Self {
        code.0
    }
}
