use std::ops::ControlFlow;

use serde::Serialize;

use crate::error::{Result, ScriptError};
use crate::replay::script::{ActionRecord, MatchScript};
use crate::rule::ReplayRule;
use crate::types::{is_flower, is_physical, tile_kind, FLOWER_BASE, FLOWER_COUNT, KIND_COUNT, WALL_SIZE};

pub mod event_handler;
pub mod player;
pub mod wall;

use event_handler::MatchStateEventHandler;
use player::SeatState;
use wall::WallState;

/// The declared win. Recorded once; replay stops right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WinInfo {
    pub winner: u8,
    pub tile: u8,
    pub self_drawn: bool,
    /// Index of the win action in the log.
    pub action_index: usize,
    /// Fan carried in the win payload itself.
    pub declared_fan: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastDiscard {
    pub seat: u8,
    pub tile: u8,
}

/// Everything one replay mutates. Owned by a single replay.
#[derive(Debug, Clone, Serialize)]
pub struct MatchState {
    pub seats: [SeatState; 4],
    pub wall: WallState,
    /// Starts at the dealer policy's seat; a turn start by another seat moves
    /// it. Reported in [`crate::score::WinAnalysis`].
    pub dealer: u8,
    /// Seat that most recently drew, discarded or called.
    pub turn_holder: u8,
    /// Source of a discard-sourced win; an added kong also sets it.
    pub last_discard: Option<LastDiscard>,
    pub last_action_was_kong: bool,
    pub win: Option<WinInfo>,
    /// Number of log actions consumed.
    pub applied: usize,
    /// Logged draws that did not match the simulated wall.
    pub wall_mismatches: usize,
}

impl MatchState {
    /// Builds the wall for `dealer` and deals the initial hands.
    pub fn deal(script: &MatchScript, dealer: u8) -> Result<Self> {
        if script.tiles.len() != WALL_SIZE {
            return Err(ScriptError::WallHex(format!(
                "expected {WALL_SIZE} tiles, got {}",
                script.tiles.len()
            ))
            .into());
        }
        let dealer = dealer % 4;
        let deal = WallState::build(&script.tiles, dealer, script.dice()).deal(dealer);
        let [h0, h1, h2, h3] = deal.hands;
        let mut seats = [
            SeatState::new(h0),
            SeatState::new(h1),
            SeatState::new(h2),
            SeatState::new(h3),
        ];
        // a win before the dealer's first discard is on the dealt 14th tile
        seats[dealer as usize].last_draw = Some(deal.dealer_extra);

        Ok(Self {
            seats,
            wall: deal.wall,
            dealer,
            turn_holder: dealer,
            last_discard: None,
            last_action_was_kong: false,
            win: None,
            applied: 0,
            wall_mismatches: 0,
        })
    }

    /// Applies actions in order until the first genuine win.
    pub fn run(&mut self, actions: &[ActionRecord], rule: &ReplayRule) -> Result<()> {
        for (index, record) in actions.iter().enumerate() {
            if let ControlFlow::Break(()) = self.apply_log_action(index, record, rule)? {
                break;
            }
        }
        Ok(())
    }

    pub fn seat(&self, seat: u8) -> &SeatState {
        &self.seats[seat as usize % 4]
    }

    /// Copies of each kind and each flower across the live wall, hands,
    /// melds, discards and revealed flowers.
    ///
    /// A tile won off a discard (or robbed from a kong) stays counted where it
    /// came from and not in the winner's hand.
    pub fn tile_census(&self) -> ([u8; KIND_COUNT], [u8; FLOWER_COUNT]) {
        let mut kinds = [0u8; KIND_COUNT];
        let mut flowers = [0u8; FLOWER_COUNT];
        let mut add = |t: u8| {
            if is_physical(t) {
                kinds[tile_kind(t) as usize] += 1;
            } else if is_flower(t) {
                flowers[(t - FLOWER_BASE) as usize] += 1;
            }
        };

        self.wall.live_tiles().iter().copied().for_each(&mut add);
        for (i, seat) in self.seats.iter().enumerate() {
            let mut claimed = match self.win {
                Some(w) if !w.self_drawn && w.winner as usize == i => Some(w.tile),
                _ => None,
            };
            for &t in &seat.hand {
                if claimed == Some(t) {
                    claimed = None;
                    continue;
                }
                add(t);
            }
            seat.melds.iter().flat_map(|m| m.tiles.iter().copied()).for_each(&mut add);
            seat.discards.iter().copied().for_each(&mut add);
            seat.flowers.iter().copied().for_each(&mut add);
        }
        (kinds, flowers)
    }

    /// Checks that every kind has four copies and every flower exactly one.
    pub fn check_conservation(&self) -> std::result::Result<(), String> {
        let (kinds, flowers) = self.tile_census();
        if let Some((kind, n)) = kinds.iter().enumerate().find(|(_, n)| **n != 4) {
            return Err(format!("kind {kind} has {n} copies"));
        }
        if let Some((f, n)) = flowers.iter().enumerate().find(|(_, n)| **n != 1) {
            return Err(format!("flower {f} appears {n} times"));
        }
        Ok(())
    }
}
