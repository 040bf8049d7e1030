/*
 * replay/mod.rs: Replays a decoded match log and exposes the reconstructed
 * win for scoring checks.
 */
use serde::Serialize;

use crate::error::Result;
use crate::hand_encoder::{self, EncodedHand};
use crate::rule::ReplayRule;
use crate::score::{self, FanEntry, OfficialScore, WinAnalysis};
use crate::state::wall::DealerPolicy;
use crate::state::{MatchState, WinInfo};
use crate::types::{tile_kind, Wind, FLOWER_BASE};

pub mod script;

pub use script::{decode_record, decode_script, ActionRecord, MatchScript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GangKind {
    /// Upgrades the seat's own exposed peng.
    Added,
    Concealed,
    /// Claimed from a discard.
    Melded,
}

/// Packed payload of a chi, peng or gang.
///
/// Bits 0-5 hold the base kind, bits 6-7 the offering-seat offset, bits
/// 10-15 three 2-bit copy offsets for the tiles of a chi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeldCall {
    /// First physical copy of the base kind (the middle kind for a chi).
    pub tile: u8,
    pub offset: u8,
    pub chi_offsets: [u8; 3],
}

impl MeldCall {
    pub fn decode(data: u32) -> Self {
        Self {
            tile: ((data & 0x3F) << 2) as u8,
            offset: ((data >> 6) & 3) as u8,
            chi_offsets: [
                ((data >> 10) & 3) as u8,
                ((data >> 12) & 3) as u8,
                ((data >> 14) & 3) as u8,
            ],
        }
    }

    pub fn kind(&self) -> u8 {
        tile_kind(self.tile)
    }

    pub fn offering_seat(&self, actor: u8) -> u8 {
        (actor + self.offset) % 4
    }

    /// The three tiles of a chi, lowest first.
    ///
    /// Falls back to the offered tile as the middle when the packed base
    /// cannot have a lower neighbour.
    pub fn chi_tiles(&self, offered: u8) -> Option<[u8; 3]> {
        let [o0, o1, o2] = self.chi_offsets.map(i32::from);
        let mut mid = self.tile as i32;
        if mid - 4 + o0 < 0 {
            mid = offered as i32;
        }
        let tiles = [mid - 4 + o0, mid + o1, mid + 4 + o2];
        let mut out = [0u8; 3];
        for (slot, t) in out.iter_mut().zip(tiles) {
            *slot = u8::try_from(t).ok()?;
        }
        Some(out)
    }
}

/// A log action decoded from its type nibble and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    TurnStart,
    Flower {
        flower: u8,
        replacement: u8,
        automatic: bool,
    },
    Discard {
        tile: u8,
        from_hand: bool,
    },
    Chi(MeldCall),
    Peng(MeldCall),
    Gang(MeldCall, GangKind),
    Win {
        automatic: bool,
        declared_fan: u32,
    },
    Draw {
        tile: u8,
        reverse: bool,
    },
    Pass,
    GiveUp,
    /// A meld or win carrying a zero payload.
    Void(u8),
    Unknown(u8),
}

impl Action {
    pub fn decode(record: &ActionRecord) -> Self {
        let data = record.data;
        let (lo, hi) = (record.lo_byte(), record.hi_byte());
        match record.action_type {
            0 => Action::TurnStart,
            1 => Action::Flower {
                flower: FLOWER_BASE + (hi & 15),
                replacement: lo,
                automatic: data & 0x1000 != 0,
            },
            2 => Action::Discard {
                tile: lo,
                from_hand: hi & 1 != 0,
            },
            t @ (3..=6) if data == 0 => Action::Void(t),
            3 => Action::Chi(MeldCall::decode(data)),
            4 => Action::Peng(MeldCall::decode(data)),
            5 => {
                let call = MeldCall::decode(data);
                let kind = if data & 0x0300 == 0x0300 {
                    GangKind::Added
                } else if call.offset == 0 {
                    GangKind::Concealed
                } else {
                    GangKind::Melded
                };
                Action::Gang(call, kind)
            }
            6 => Action::Win {
                automatic: data & 1 != 0,
                declared_fan: data >> 1,
            },
            7 => Action::Draw {
                tile: lo,
                reverse: hi != 0,
            },
            8 => Action::Pass,
            9 => Action::GiveUp,
            t => Action::Unknown(t),
        }
    }
}

/// A fully replayed match.
///
/// Holds the decoded script together with the state left after the last
/// applied action; nothing is shared with other replays.
#[derive(Debug, Clone)]
pub struct MatchReplay {
    pub script: MatchScript,
    pub state: MatchState,
    pub rule: ReplayRule,
}

impl MatchReplay {
    pub fn from_record(record_json: &str, rule: ReplayRule) -> Result<Self> {
        let script = decode_record(record_json)?;
        Self::from_script(script, rule)
    }

    pub fn from_script(script: MatchScript, rule: ReplayRule) -> Result<Self> {
        let policy = rule.dealer;
        Self::with_dealer_policy(script, &policy, rule)
    }

    pub fn with_dealer_policy<P>(script: MatchScript, policy: &P, rule: ReplayRule) -> Result<Self>
    where
        P: DealerPolicy + ?Sized,
    {
        let dealer = policy.dealer_seat(&script) % 4;
        let mut state = MatchState::deal(&script, dealer)?;
        state.run(&script.actions, &rule)?;
        Ok(Self {
            script,
            state,
            rule,
        })
    }

    pub fn win(&self) -> Option<&WinInfo> {
        self.state.win.as_ref()
    }

    pub fn round_wind(&self) -> Wind {
        Wind::for_round(self.script.round_index.unwrap_or(0))
    }

    /// Winner's official scoring, `None` when nobody won.
    pub fn official_score(&self) -> Option<OfficialScore> {
        let win = self.win()?;
        let flowers = self.state.seats[win.winner as usize].flower_count();
        Some(OfficialScore::decode(
            self.script.scores.get(win.winner as usize),
            flowers,
        ))
    }

    pub fn official_fans(&self) -> Vec<FanEntry> {
        self.official_score().map(|s| s.fans).unwrap_or_default()
    }

    pub fn win_analysis(&self) -> Option<WinAnalysis> {
        let win = self.win()?;
        let official = self.official_score()?;
        Some(score::win_analysis(&self.script, &self.state, win, &official))
    }

    /// Canonical hand string for the independent scorer.
    pub fn encode_hand(&self) -> Result<Option<EncodedHand>> {
        match self.win() {
            Some(win) => hand_encoder::encode(&self.state, win, self.round_wind()).map(Some),
            None => Ok(None),
        }
    }
}
