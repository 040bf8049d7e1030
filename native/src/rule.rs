use serde::{Deserialize, Deserializer, Serialize};

use crate::replay::script::MatchScript;
use crate::state::wall::DealerPolicy;

/// Built-in ways of picking the initial dealer seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealerRule {
    /// Always the given seat.
    Fixed(u8),
    /// `round_index mod 4`, seat 0 when the script has no round index.
    RoundIndex,
}

impl Default for DealerRule {
    fn default() -> Self {
        DealerRule::Fixed(0)
    }
}

impl DealerPolicy for DealerRule {
    fn dealer_seat(&self, script: &MatchScript) -> u8 {
        match *self {
            DealerRule::Fixed(seat) => seat % 4,
            DealerRule::RoundIndex => script.round_index.map_or(0, |i| (i % 4) as u8),
        }
    }
}

/// Replay-time configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayRule {
    pub dealer: DealerRule,
    /// Treat a logged draw that differs from the simulated wall as an
    /// inconsistency instead of a warning.
    pub strict_wall: bool,
}

impl Default for ReplayRule {
    fn default() -> Self {
        Self::default_tziakcha()
    }
}

impl ReplayRule {
    pub fn default_tziakcha() -> Self {
        Self {
            dealer: DealerRule::Fixed(0),
            strict_wall: false,
        }
    }

    pub fn strict() -> Self {
        Self {
            strict_wall: true,
            ..Self::default_tziakcha()
        }
    }
}

/// The match's own rule settings, the `g` object of a script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Match title.
    #[serde(rename = "t", default)]
    pub title: String,
    /// Number of hands in the match.
    #[serde(rename = "n", default)]
    pub hands: Option<i64>,
    /// Minimum fan to win.
    #[serde(rename = "l", default)]
    pub min_fan: Option<i64>,
    #[serde(rename = "b", default)]
    pub base: Option<serde_json::Value>,
    /// Per-turn and reserve think time, seconds.
    #[serde(rename = "r0", default)]
    pub round_time: Option<i64>,
    #[serde(rename = "r1", default)]
    pub reserve_time: Option<i64>,
    #[serde(rename = "e", default)]
    pub extra_time: Option<i64>,
    /// Heavenly, earthly and human wins are scored.
    #[serde(rename = "bl", default, deserialize_with = "flag")]
    pub blessings: bool,
    /// Tactical calls allowed.
    #[serde(rename = "s", default, deserialize_with = "flag")]
    pub tactical_calls: bool,
    /// Hands are shown openly.
    #[serde(rename = "o", default, deserialize_with = "flag")]
    pub open_hands: bool,
    /// False wins are also penalised on calls.
    #[serde(rename = "d", default, deserialize_with = "flag")]
    pub false_win_on_call: bool,
    /// False-win scoring: -30/+10 when set, -40/+0 otherwise.
    #[serde(rename = "z", default, deserialize_with = "flag")]
    pub false_win_split: bool,
    #[serde(rename = "r", default, deserialize_with = "flag")]
    pub random_seats: bool,
}

// The log writes flags as booleans in some versions and as 0/1 in others.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        serde_json::Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    })
}
