//! Typed events exchanged with the dice server over the realtime channel.
//!
//! Client events are serialized into Socket.IO event frames by the transport;
//! server events are decoded from `(name, payload)` pairs.
use crate::{
    Error,
    Result,
    dice::{
        DieKind,
        PercentileRoll,
    },
    theme::Theme,
};
use chrono::{
    DateTime,
    Local,
    NaiveDateTime,
    TimeZone,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use serde_json::Value;
use std::fmt;
use tracing::warn;

pub const ROLL_DICE: &str = "roll_dice";
pub const REQUEST_HISTORY: &str = "request_history";
pub const CLEAR_HISTORY: &str = "clear_history";
pub const JOIN_GM_ROOM: &str = "join_gm_room";
pub const DICE_RESULT: &str = "dice_result";
pub const ROLL_HISTORY: &str = "roll_history";
pub const DICE_ERROR: &str = "dice_error";
pub const GM_STATUS: &str = "gm_status";

/// Client-generated token correlating a roll request with its result.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RollId(String);

impl RollId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RollId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RollId(s),
            Raw::Int(n) => RollId(n.to_string()),
            Raw::Float(n) => RollId(format!("{n}")),
        })
    }
}

/// Payload of `roll_dice`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RollRequest {
    pub dice_type: DieKind,
    pub character: String,
    pub roll_type: Option<String>,
    pub theme: Theme,
    pub roll_id: RollId,
    pub count: u32,
    pub is_gm_roll: bool,
    pub is_hidden: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientEvent {
    RollDice(RollRequest),
    RequestHistory { is_gm: bool },
    ClearHistory { is_gm: bool },
    JoinGmRoom,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RollDice(_) => ROLL_DICE,
            ClientEvent::RequestHistory { .. } => REQUEST_HISTORY,
            ClientEvent::ClearHistory { .. } => CLEAR_HISTORY,
            ClientEvent::JoinGmRoom => JOIN_GM_ROOM,
        }
    }

    /// The event argument, or `None` for argument-less events.
    pub fn payload(&self) -> Option<Value> {
        match self {
            ClientEvent::RollDice(req) => serde_json::to_value(req).ok(),
            ClientEvent::RequestHistory { is_gm } | ClientEvent::ClearHistory { is_gm } => {
                Some(serde_json::json!({ "is_gm": is_gm }))
            }
            ClientEvent::JoinGmRoom => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct DieOutcome {
    pub result: u32,
}

/// Authoritative roll outcome broadcast by the server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RollResult {
    #[serde(default)]
    pub roll_id: Option<RollId>,
    pub dice_type: DieKind,
    pub result: u32,
    #[serde(default)]
    pub tens_die: Option<u8>,
    #[serde(default)]
    pub ones_die: Option<u8>,
    #[serde(default)]
    pub dice_results: Option<Vec<DieOutcome>>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default = "anonymous")]
    pub character: String,
    #[serde(default)]
    pub roll_type: Option<String>,
    #[serde(default)]
    pub is_gm_roll: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Local>>,
}

fn anonymous() -> String {
    String::from("Anonymous")
}

impl RollResult {
    /// Tens/ones digits of a d100 result, when the server supplied valid ones.
    pub fn percentile(&self) -> Option<PercentileRoll> {
        if self.dice_type != DieKind::D100 {
            return None;
        }
        PercentileRoll::new(self.tens_die?, self.ones_die?)
    }

    /// Per-die values, in die order. Empty when the server sent only `result`.
    pub fn individual_results(&self) -> Vec<u32> {
        self.dice_results
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|d| d.result)
            .collect()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct RollError {
    #[serde(default)]
    pub roll_id: Option<RollId>,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    DiceResult(RollResult),
    RollHistory(Vec<RollResult>),
    DiceError(RollError),
    GmStatus(String),
    Unknown(String),
}

impl ServerEvent {
    pub fn decode(name: &str, data: Option<Value>) -> Result<Self> {
        let data = data.unwrap_or(Value::Null);
        let payload_err = |source| Error::Payload {
            event: name.to_string(),
            source,
        };
        Ok(match name {
            DICE_RESULT => {
                ServerEvent::DiceResult(serde_json::from_value(data).map_err(payload_err)?)
            }
            ROLL_HISTORY => {
                let entries: Vec<Value> = match data {
                    Value::Null => Vec::new(),
                    other => serde_json::from_value(other).map_err(payload_err)?,
                };
                ServerEvent::RollHistory(decode_history(entries))
            }
            DICE_ERROR => {
                ServerEvent::DiceError(serde_json::from_value(data).map_err(payload_err)?)
            }
            GM_STATUS => {
                let status = data
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                ServerEvent::GmStatus(status)
            }
            other => ServerEvent::Unknown(other.to_string()),
        })
    }
}

/// A single bad entry must not hide the rest of the shared history.
fn decode_history(entries: Vec<Value>) -> Vec<RollResult> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RollResult>(entry) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(error = %err, "dropping undecodable history entry");
                None
            }
        })
        .collect()
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parses ISO-8601 timestamps; values without an offset are read as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}
