use crate::{
    Error,
    dice::DieKind,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dnd,
    #[default]
    Warhammer,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dnd => "dnd",
            Theme::Warhammer => "warhammer",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Dnd => Theme::Warhammer,
            Theme::Warhammer => Theme::Dnd,
        }
    }

    /// Quick-roll presets offered for this game system, in menu order.
    pub fn presets(self) -> &'static [Preset] {
        match self {
            Theme::Dnd => &DND_PRESETS,
            Theme::Warhammer => &WARHAMMER_PRESETS,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Dnd => "D&D",
            Theme::Warhammer => "Warhammer",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dnd" | "d&d" => Ok(Theme::Dnd),
            "warhammer" => Ok(Theme::Warhammer),
            other => Err(Error::UnknownTheme(other.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Preset {
    pub label: &'static str,
    pub die: DieKind,
    pub count: u32,
}

const fn preset(label: &'static str, die: DieKind, count: u32) -> Preset {
    Preset { label, die, count }
}

const DND_PRESETS: [Preset; 5] = [
    preset("Attack Roll", DieKind::D20, 1),
    preset("Damage Roll", DieKind::D6, 2),
    preset("Saving Throw", DieKind::D20, 1),
    preset("Skill Check", DieKind::D20, 1),
    preset("Initiative", DieKind::D20, 1),
];

const WARHAMMER_PRESETS: [Preset; 5] = [
    preset("Characteristics Test", DieKind::D100, 1),
    preset("Hit Location", DieKind::D10, 1),
    preset("Wound Roll", DieKind::D10, 1),
    preset("Damage", DieKind::D10, 1),
    preset("Casting Roll", DieKind::D10, 2),
];
