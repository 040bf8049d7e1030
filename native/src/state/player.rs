use serde::Serialize;

use crate::types::{tile_kind, tile_to_string, Meld};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeatState {
    pub hand: Vec<u8>,
    pub melds: Vec<Meld>,
    pub discards: Vec<u8>,
    /// Flower tiles revealed by this seat, in order.
    pub flowers: Vec<u8>,
    /// Most recent tile taken from the wall, flower replacements included.
    pub last_draw: Option<u8>,
    pub initial_hand: Vec<u8>,
}

impl SeatState {
    pub fn new(hand: Vec<u8>) -> Self {
        Self {
            initial_hand: hand.clone(),
            hand,
            ..Default::default()
        }
    }

    pub fn flower_count(&self) -> usize {
        self.flowers.len()
    }

    /// Removes the exact tile value, returning whether it was held.
    pub fn remove_exact(&mut self, tile: u8) -> bool {
        match self.hand.iter().position(|&t| t == tile) {
            Some(pos) => {
                self.hand.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes `count` tiles of `kind`, or nothing if fewer are held.
    pub fn remove_kind(&mut self, kind: u8, count: usize) -> Option<Vec<u8>> {
        let held = self.count_kind(kind);
        if held < count {
            return None;
        }
        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(pos) = self.hand.iter().position(|&t| tile_kind(t) == kind) {
                removed.push(self.hand.remove(pos));
            }
        }
        Some(removed)
    }

    pub fn count_kind(&self, kind: u8) -> usize {
        self.hand.iter().filter(|&&t| tile_kind(t) == kind).count()
    }

    pub fn initial_hand_strings(&self) -> Vec<&'static str> {
        self.initial_hand.iter().map(|&t| tile_to_string(t)).collect()
    }

    pub fn flower_strings(&self) -> Vec<&'static str> {
        self.flowers.iter().map(|&t| tile_to_string(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_kind_is_all_or_nothing() {
        let mut seat = SeatState::new(vec![0, 1, 5, 9]);
        assert_eq!(seat.remove_kind(0, 3), None);
        assert_eq!(seat.hand.len(), 4);
        assert_eq!(seat.remove_kind(0, 2), Some(vec![0, 1]));
        assert_eq!(seat.hand, vec![5, 9]);
        assert_eq!(seat.initial_hand.len(), 4);
    }

    #[test]
    fn test_remove_exact() {
        let mut seat = SeatState::new(vec![0, 1, 2]);
        assert!(!seat.remove_exact(3));
        assert!(seat.remove_exact(1));
        assert_eq!(seat.hand, vec![0, 2]);
    }
}
