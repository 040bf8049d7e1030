use serde::Serialize;

use crate::replay::script::MatchScript;
use crate::types::WALL_SIZE;

/// Picks the initial dealer seat for a script.
///
/// Implemented by [`crate::rule::DealerRule`] and by any
/// `Fn(&MatchScript) -> u8`.
pub trait DealerPolicy {
    fn dealer_seat(&self, script: &MatchScript) -> u8;
}

impl<F> DealerPolicy for F
where
    F: Fn(&MatchScript) -> u8,
{
    fn dealer_seat(&self, script: &MatchScript) -> u8 {
        self(script) % 4
    }
}

/// The rotated wall and its two draw cursors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WallState {
    pub tiles: Vec<u8>,
    /// Next tile drawn from the front.
    pub front: usize,
    /// Last live tile; reverse draws and flower replacements take it.
    pub back: usize,
}

/// Result of breaking the wall and dealing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub wall: WallState,
    /// Sorted 13-tile hands, 14 for the dealer.
    pub hands: [Vec<u8>; 4],
    /// The dealer's 14th tile.
    pub dealer_extra: u8,
}

/// Seat whose wall segment is broken: `dealer - (die0 + die1 - 1)` counted
/// around the table.
pub fn break_seat(dealer: u8, dice: [u8; 4]) -> u8 {
    let steps = dice[0] as i32 + dice[1] as i32 - 1;
    (dealer as i32 - steps).rem_euclid(4) as u8
}

pub fn start_offset(dealer: u8, dice: [u8; 4]) -> usize {
    let pips: usize = dice.iter().map(|&d| d as usize).sum();
    (break_seat(dealer, dice) as usize * 36 + pips * 2) % WALL_SIZE
}

impl WallState {
    /// Rotates the logged tile sequence left to the break point.
    pub fn build(tiles: &[u8], dealer: u8, dice: [u8; 4]) -> Self {
        let mut rotated = tiles.to_vec();
        if !rotated.is_empty() {
            let offset = start_offset(dealer, dice) % rotated.len();
            rotated.rotate_left(offset);
        }
        let back = rotated.len().saturating_sub(1);
        Self {
            tiles: rotated,
            front: 0,
            back,
        }
    }

    /// Tiles still drawable.
    pub fn live_count(&self) -> usize {
        if self.front > self.back {
            0
        } else {
            self.back - self.front + 1
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.front > self.back
    }

    pub fn live_tiles(&self) -> &[u8] {
        if self.is_exhausted() {
            &[]
        } else {
            &self.tiles[self.front..=self.back]
        }
    }

    pub fn draw_front(&mut self) -> Option<u8> {
        if self.is_exhausted() {
            return None;
        }
        let tile = self.tiles[self.front];
        self.front += 1;
        Some(tile)
    }

    pub fn draw_back(&mut self) -> Option<u8> {
        if self.is_exhausted() {
            return None;
        }
        let tile = self.tiles[self.back];
        // front > back once the last live tile is gone
        if self.back == 0 {
            self.front += 1;
        } else {
            self.back -= 1;
        }
        Some(tile)
    }

    fn take_front(&mut self, n: usize) -> &[u8] {
        let start = self.front;
        self.front += n;
        &self.tiles[start..self.front]
    }

    /// Deals in dealer-first rotation: three passes of four-tile blocks,
    /// one tile per seat, then one more for the dealer.
    pub fn deal(mut self, dealer: u8) -> Deal {
        let mut hands: [Vec<u8>; 4] = Default::default();
        let order = |offset: u8| ((dealer + offset) % 4) as usize;

        for _ in 0..3 {
            for p in 0..4 {
                let block = self.take_front(4).to_vec();
                hands[order(p)].extend(block);
            }
        }
        for p in 0..4 {
            let tile = self.take_front(1)[0];
            hands[order(p)].push(tile);
        }
        let dealer_extra = self.take_front(1)[0];
        hands[dealer as usize].push(dealer_extra);

        for hand in hands.iter_mut() {
            hand.sort_unstable();
        }
        Deal {
            wall: self,
            hands,
            dealer_extra,
        }
    }
}
