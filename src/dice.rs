use crate::Error;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

/// The face-count family of a die as it appears on the wire (`"d20"`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DieKind {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

/// How a die is drawn, animated and revealed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DieSpec {
    /// A single die showing `1..=faces`.
    Simple { faces: u8 },
    /// A tens die and a ones die, each showing a digit.
    Percentile,
}

impl DieKind {
    pub const ALL: [DieKind; 7] = [
        DieKind::D4,
        DieKind::D6,
        DieKind::D8,
        DieKind::D10,
        DieKind::D12,
        DieKind::D20,
        DieKind::D100,
    ];

    pub fn spec(self) -> DieSpec {
        match self {
            DieKind::D4 => DieSpec::Simple { faces: 4 },
            DieKind::D6 => DieSpec::Simple { faces: 6 },
            DieKind::D8 => DieSpec::Simple { faces: 8 },
            DieKind::D10 => DieSpec::Simple { faces: 10 },
            DieKind::D12 => DieSpec::Simple { faces: 12 },
            DieKind::D20 => DieSpec::Simple { faces: 20 },
            DieKind::D100 => DieSpec::Percentile,
        }
    }

    /// Highest value a single roll of this kind can produce.
    pub fn max_face(self) -> u32 {
        match self.spec() {
            DieSpec::Simple { faces } => faces as u32,
            DieSpec::Percentile => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DieKind::D4 => "d4",
            DieKind::D6 => "d6",
            DieKind::D8 => "d8",
            DieKind::D10 => "d10",
            DieKind::D12 => "d12",
            DieKind::D20 => "d20",
            DieKind::D100 => "d100",
        }
    }

    pub fn next(self) -> DieKind {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> DieKind {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for DieKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DieKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DieKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownDie(s.to_string()))
    }
}

impl TryFrom<String> for DieKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DieKind> for String {
    fn from(kind: DieKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Tens and ones digits of a percentile roll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PercentileRoll {
    pub tens: u8,
    pub ones: u8,
}

impl PercentileRoll {
    /// Returns `None` if either digit is outside `0..=9`.
    pub fn new(tens: u8, ones: u8) -> Option<Self> {
        (tens <= 9 && ones <= 9).then_some(Self { tens, ones })
    }

    /// Splits a percentile value back into digits; `100` reads as `00`.
    pub fn from_value(value: u32) -> Self {
        let value = value % 100;
        Self {
            tens: (value / 10) as u8,
            ones: (value % 10) as u8,
        }
    }

    pub fn value(self) -> u32 {
        self.tens as u32 * 10 + self.ones as u32
    }

    /// Face label of the tens die: `00`, `10`, ..., `90`.
    pub fn tens_label(self) -> String {
        format!("{:02}", self.tens as u32 * 10)
    }

    pub fn ones_label(self) -> String {
        self.ones.to_string()
    }
}
