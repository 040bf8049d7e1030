use std::ops::ControlFlow;

use tracing::{debug, info, warn};

use crate::error::{ReplayError, Result};
use crate::replay::script::ActionRecord;
use crate::replay::{Action, GangKind, MeldCall};
use crate::rule::ReplayRule;
use crate::state::{LastDiscard, MatchState, WinInfo};
use crate::types::{is_flower, tile_kind, tile_to_string, Meld, MeldType, KIND_COUNT};

pub trait MatchStateEventHandler {
    /// Applies one log action. `Break` once the win has been recorded.
    fn apply_log_action(
        &mut self,
        index: usize,
        record: &ActionRecord,
        rule: &ReplayRule,
    ) -> Result<ControlFlow<()>>;
}

fn inconsistent(index: usize, seat: u8, reason: impl Into<String>) -> ReplayError {
    ReplayError::InconsistentState {
        index,
        seat,
        reason: reason.into(),
    }
}

impl MatchStateEventHandler for MatchState {
    fn apply_log_action(
        &mut self,
        index: usize,
        record: &ActionRecord,
        rule: &ReplayRule,
    ) -> Result<ControlFlow<()>> {
        let seat = record.seat;
        let action = Action::decode(record);
        debug!(index, seat, ?action, "apply");

        let flow = match action {
            Action::TurnStart => {
                if self.dealer != seat {
                    self.dealer = seat;
                }
                ControlFlow::Continue(())
            }
            Action::Flower {
                flower,
                replacement,
                ..
            } => {
                self.on_flower(index, seat, flower, replacement, rule)?;
                ControlFlow::Continue(())
            }
            Action::Discard { tile, .. } => {
                self.on_discard(index, seat, tile);
                ControlFlow::Continue(())
            }
            Action::Chi(call) => {
                self.on_chi(index, seat, call)?;
                ControlFlow::Continue(())
            }
            Action::Peng(call) => {
                self.on_peng(index, seat, call)?;
                ControlFlow::Continue(())
            }
            Action::Gang(call, kind) => {
                self.on_gang(index, seat, call, kind)?;
                ControlFlow::Continue(())
            }
            Action::Win { declared_fan, .. } => {
                self.on_win(index, seat, declared_fan)?;
                ControlFlow::Break(())
            }
            Action::Draw { tile, reverse } => {
                self.on_draw(index, seat, tile, reverse, rule)?;
                ControlFlow::Continue(())
            }
            Action::Pass | Action::GiveUp | Action::Void(_) => ControlFlow::Continue(()),
            Action::Unknown(t) => {
                warn!(index, seat, action_type = t, "unknown action type, skipped");
                ControlFlow::Continue(())
            }
        };

        self.seats[seat as usize].hand.sort_unstable();
        self.applied = index + 1;
        Ok(flow)
    }
}

impl MatchState {
    fn on_flower(
        &mut self,
        index: usize,
        seat: u8,
        flower: u8,
        replacement: u8,
        rule: &ReplayRule,
    ) -> Result<()> {
        if !is_flower(flower) {
            return Err(inconsistent(index, seat, format!("{flower} is not a flower tile")));
        }
        let s = &mut self.seats[seat as usize];
        if !s.remove_exact(flower) {
            return Err(inconsistent(
                index,
                seat,
                format!("flower {} not in hand", tile_to_string(flower)),
            ));
        }
        s.flowers.push(flower);
        s.hand.push(replacement);
        s.last_draw = Some(replacement);
        self.consume_wall(index, seat, replacement, true, rule)
    }

    fn on_discard(&mut self, index: usize, seat: u8, tile: u8) {
        let s = &mut self.seats[seat as usize];
        if !s.remove_exact(tile) {
            debug!(index, seat, tile, "discarded tile was not in hand");
        }
        s.discards.push(tile);
        self.turn_holder = seat;
        self.last_discard = Some(LastDiscard { seat, tile });
        self.last_action_was_kong = false;
    }

    fn on_draw(
        &mut self,
        index: usize,
        seat: u8,
        tile: u8,
        reverse: bool,
        rule: &ReplayRule,
    ) -> Result<()> {
        let s = &mut self.seats[seat as usize];
        s.hand.push(tile);
        s.last_draw = Some(tile);
        self.turn_holder = seat;
        self.consume_wall(index, seat, tile, reverse, rule)
    }

    /// Advances the front (or back) cursor and compares the simulated tile
    /// with the logged one.
    fn consume_wall(
        &mut self,
        index: usize,
        seat: u8,
        logged: u8,
        from_back: bool,
        rule: &ReplayRule,
    ) -> Result<()> {
        let simulated = if from_back {
            self.wall.draw_back()
        } else {
            self.wall.draw_front()
        };
        if simulated == Some(logged) {
            return Ok(());
        }
        self.wall_mismatches += 1;
        if rule.strict_wall {
            return Err(inconsistent(
                index,
                seat,
                format!("drew {logged}, wall holds {simulated:?}"),
            ));
        }
        warn!(index, seat, logged, ?simulated, from_back, "draw differs from wall");
        Ok(())
    }

    fn check_kind(index: usize, seat: u8, call: &MeldCall) -> Result<u8> {
        let kind = call.kind();
        if kind as usize >= KIND_COUNT {
            return Err(inconsistent(index, seat, format!("meld kind {kind} out of range")));
        }
        Ok(kind)
    }

    fn take_from_hand(&mut self, index: usize, seat: u8, kind: u8, count: usize) -> Result<Vec<u8>> {
        self.seats[seat as usize]
            .remove_kind(kind, count)
            .ok_or_else(|| {
                inconsistent(
                    index,
                    seat,
                    format!("needs {count} x {} in hand", crate::types::TILE_NAMES[kind as usize]),
                )
            })
    }

    /// Pops the offering seat's latest discard into a meld.
    fn claim_discard(&mut self, index: usize, seat: u8, from: u8) -> Result<u8> {
        self.seats[from as usize]
            .discards
            .pop()
            .ok_or_else(|| inconsistent(index, seat, format!("seat {from} has no discard to claim")))
    }

    fn on_chi(&mut self, index: usize, seat: u8, call: MeldCall) -> Result<()> {
        let offered = self
            .last_discard
            .ok_or_else(|| inconsistent(index, seat, "chi without a discard"))?
            .tile;
        let tiles = call
            .chi_tiles(offered)
            .ok_or_else(|| inconsistent(index, seat, "chi tiles out of range"))?;
        if tiles.iter().any(|&t| tile_kind(t) as usize >= KIND_COUNT) {
            return Err(inconsistent(index, seat, "chi tiles out of range"));
        }

        let shape = tiles
            .iter()
            .position(|&t| tile_kind(t) == tile_kind(offered))
            .ok_or_else(|| inconsistent(index, seat, "chi does not contain the offered tile"))?;
        let mut meld_tiles = Vec::with_capacity(3);
        for (i, &t) in tiles.iter().enumerate() {
            if i != shape {
                meld_tiles.extend(self.take_from_hand(index, seat, tile_kind(t), 1)?);
            }
        }
        let claimed = self.claim_discard(index, seat, call.offering_seat(seat))?;
        meld_tiles.push(claimed);
        meld_tiles.sort_unstable();

        self.seats[seat as usize].melds.push(Meld {
            meld_type: MeldType::Chi,
            kind: tile_kind(tiles[1]),
            tiles: meld_tiles,
            tag: shape as u8 + 1,
            claimed: Some(claimed),
        });
        self.turn_holder = seat;
        Ok(())
    }

    fn on_peng(&mut self, index: usize, seat: u8, call: MeldCall) -> Result<()> {
        let kind = Self::check_kind(index, seat, &call)?;
        let mut meld_tiles = self.take_from_hand(index, seat, kind, 2)?;
        let claimed = self.claim_discard(index, seat, call.offering_seat(seat))?;
        meld_tiles.push(claimed);

        self.seats[seat as usize].melds.push(Meld {
            meld_type: MeldType::Peng,
            kind,
            tiles: meld_tiles,
            tag: call.offset,
            claimed: Some(claimed),
        });
        self.turn_holder = seat;
        Ok(())
    }

    fn on_gang(&mut self, index: usize, seat: u8, call: MeldCall, gang: GangKind) -> Result<()> {
        let kind = Self::check_kind(index, seat, &call)?;
        match gang {
            GangKind::Added => {
                let pos = self.seats[seat as usize]
                    .melds
                    .iter()
                    .position(|m| m.meld_type == MeldType::Peng && m.kind == kind)
                    .ok_or_else(|| inconsistent(index, seat, "added kong without a peng"))?;
                let tile = self.take_from_hand(index, seat, kind, 1)?[0];
                let meld = &mut self.seats[seat as usize].melds[pos];
                meld.meld_type = MeldType::Addgang;
                meld.tiles.push(tile);
                // the added tile can be robbed like a discard
                self.last_discard = Some(LastDiscard { seat, tile });
            }
            GangKind::Concealed => {
                let tiles = self.take_from_hand(index, seat, kind, 4)?;
                self.seats[seat as usize].melds.push(Meld {
                    meld_type: MeldType::Angang,
                    kind,
                    tiles,
                    tag: 0,
                    claimed: None,
                });
            }
            GangKind::Melded => {
                let mut tiles = self.take_from_hand(index, seat, kind, 3)?;
                let claimed = self.claim_discard(index, seat, call.offering_seat(seat))?;
                tiles.push(claimed);
                self.seats[seat as usize].melds.push(Meld {
                    meld_type: MeldType::Gang,
                    kind,
                    tiles,
                    tag: call.offset,
                    claimed: Some(claimed),
                });
            }
        }
        self.turn_holder = seat;
        self.last_action_was_kong = true;
        Ok(())
    }

    fn on_win(&mut self, index: usize, seat: u8, declared_fan: u32) -> Result<()> {
        let self_drawn = self.turn_holder == seat;
        let tile = if self_drawn {
            self.seats[seat as usize]
                .last_draw
                .ok_or_else(|| inconsistent(index, seat, "self-drawn win without a draw"))?
        } else {
            let tile = self
                .last_discard
                .ok_or_else(|| inconsistent(index, seat, "win on discard without a discard"))?
                .tile;
            self.seats[seat as usize].hand.push(tile);
            tile
        };
        info!(
            index,
            winner = seat,
            tile = tile_to_string(tile),
            self_drawn,
            "win recorded"
        );
        self.win = Some(WinInfo {
            winner: seat,
            tile,
            self_drawn,
            action_index: index,
            declared_fan,
        });
        Ok(())
    }
}
