//! Static per-hazard tables: keyword dictionary, heatmap multiplier and the
//! region compatibility table. None of this is runtime-extensible.

use crate::error::EngineError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    LineBreak,
    PoleDamage,
    TransformerFault,
    Sparking,
    VegetationContact,
    PowerSurge,
}

impl HazardType {
    pub const ALL: [HazardType; 6] = [
        HazardType::LineBreak,
        HazardType::PoleDamage,
        HazardType::TransformerFault,
        HazardType::Sparking,
        HazardType::VegetationContact,
        HazardType::PowerSurge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::LineBreak => "line_break",
            HazardType::PoleDamage => "pole_damage",
            HazardType::TransformerFault => "transformer_fault",
            HazardType::Sparking => "sparking",
            HazardType::VegetationContact => "vegetation_contact",
            HazardType::PowerSurge => "power_surge",
        }
    }

    /// Lowercase substrings matched against report descriptions.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            HazardType::LineBreak => &[
                "line break",
                "snapped",
                "severed",
                "fallen line",
                "cable cut",
                "broken conductor",
            ],
            HazardType::PoleDamage => &["pole", "tilted", "leaning", "cracked", "collapsed"],
            HazardType::TransformerFault => &[
                "transformer",
                "oil leak",
                "humming",
                "smoke",
                "explosion",
            ],
            HazardType::Sparking => &["spark", "arcing", "flash", "fire", "burning smell"],
            HazardType::VegetationContact => &[
                "tree",
                "branch",
                "vegetation",
                "overgrown",
                "touching",
            ],
            HazardType::PowerSurge => &["surge", "voltage", "fluctuat", "flicker", "appliance"],
        }
    }

    /// Heatmap risk weight, always within 0.6..=1.0.
    pub fn heatmap_multiplier(&self) -> f64 {
        match self {
            HazardType::LineBreak => 1.0,
            HazardType::PoleDamage => 0.9,
            HazardType::TransformerFault => 0.85,
            HazardType::Sparking => 0.8,
            HazardType::VegetationContact => 0.7,
            HazardType::PowerSurge => 0.6,
        }
    }
}

impl std::fmt::Display for HazardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HazardType {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        HazardType::ALL
            .into_iter()
            .find(|hazard| hazard.as_str() == value)
            .ok_or_else(|| EngineError::InvalidReport(format!("unknown hazard type: {value}")))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub name: &'static str,
    pub allowed: &'static [HazardType],
}

/// Lookup order matters: the first region whose name appears in a location wins.
pub const REGIONS: &[Region] = &[
    Region {
        name: "Kochi",
        allowed: &[
            HazardType::LineBreak,
            HazardType::PoleDamage,
            HazardType::TransformerFault,
            HazardType::Sparking,
            HazardType::VegetationContact,
            HazardType::PowerSurge,
        ],
    },
    Region {
        name: "Thiruvananthapuram",
        allowed: &[
            HazardType::LineBreak,
            HazardType::PoleDamage,
            HazardType::TransformerFault,
            HazardType::Sparking,
            HazardType::PowerSurge,
        ],
    },
    Region {
        name: "Kozhikode",
        allowed: &[
            HazardType::LineBreak,
            HazardType::PoleDamage,
            HazardType::TransformerFault,
            HazardType::Sparking,
            HazardType::VegetationContact,
        ],
    },
    Region {
        name: "Thrissur",
        allowed: &[
            HazardType::LineBreak,
            HazardType::PoleDamage,
            HazardType::Sparking,
            HazardType::VegetationContact,
            HazardType::PowerSurge,
        ],
    },
    Region {
        name: "Alappuzha",
        allowed: &[
            HazardType::LineBreak,
            HazardType::PoleDamage,
            HazardType::TransformerFault,
            HazardType::VegetationContact,
        ],
    },
    Region {
        name: "Munnar",
        allowed: &[
            HazardType::LineBreak,
            HazardType::PoleDamage,
            HazardType::VegetationContact,
        ],
    },
    Region {
        name: "Palakkad",
        allowed: &[
            HazardType::LineBreak,
            HazardType::TransformerFault,
            HazardType::Sparking,
            HazardType::PowerSurge,
        ],
    },
];
