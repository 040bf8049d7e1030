use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};
use crate::state::{MatchState, WinInfo};
use crate::types::{kind_rank, kind_suit, tile_kind, tile_to_string, Meld, MeldType, Suit, Wind, TILE_NAMES};

/// Situational flags of a win, in the order they appear in the
/// environment suffix `RSDLKG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinFlags {
    pub round_wind: Wind,
    pub seat_wind: Wind,
    pub self_drawn: bool,
    /// Won on the last unseen copy of the kind.
    pub last_copy: bool,
    /// Won after the live wall ran out.
    pub sea_bottom: bool,
    pub robbing_kong: bool,
}

impl fmt::Display for WinFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |b: bool| if b { '1' } else { '0' };
        write!(
            f,
            "{}{}{}{}{}{}",
            self.round_wind.letter(),
            self.seat_wind.letter(),
            bit(self.self_drawn),
            bit(self.last_copy),
            bit(self.sea_bottom),
            bit(self.robbing_kong)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedHand {
    /// Full scorer input: melds, concealed body, environment and flowers.
    pub hand: String,
    /// Environment flag string alone, e.g. `ES1000`.
    pub env_flag: String,
    pub flags: WinFlags,
    pub flower_count: usize,
}

/// Encodes the winner's final hand the way the independent scorer reads it.
pub fn encode(state: &MatchState, win: &WinInfo, round_wind: Wind) -> Result<EncodedHand> {
    let seat = state.seat(win.winner);
    let win_kind = tile_kind(win.tile);

    let mut tiles = seat.hand.clone();
    tiles.sort_unstable();
    let pos = tiles
        .iter()
        .position(|&t| tile_kind(t) == win_kind)
        .ok_or_else(|| ReplayError::InconsistentState {
            index: win.action_index,
            seat: win.winner,
            reason: format!("winning tile {} is not in hand", tile_to_string(win.tile)),
        })?;
    tiles.remove(pos);

    let mut body = String::new();
    let mut suited: [Vec<u8>; 3] = Default::default();
    let mut honors: Vec<&str> = Vec::new();
    for &t in &tiles {
        let kind = tile_kind(t);
        match (kind_suit(kind), kind_rank(kind)) {
            (Some(suit), Some(rank)) => suited[suit_slot(suit)].push(rank),
            _ => honors.push(tile_to_string(t)),
        }
    }
    let mut order = vec![Suit::Characters, Suit::Dots, Suit::Bamboo];
    if let Some(win_suit) = kind_suit(win_kind) {
        order.retain(|&s| s != win_suit);
        order.push(win_suit);
    }
    for suit in order {
        let ranks = &mut suited[suit_slot(suit)];
        if ranks.is_empty() {
            continue;
        }
        ranks.sort_unstable();
        body.extend(ranks.iter().map(|r| char::from(b'0' + r)));
        body.push(suit.letter());
    }
    honors.sort_unstable();
    honors.iter().for_each(|h| body.push_str(h));
    body.push_str(tile_to_string(win.tile));

    let melds: String = seat.melds.iter().map(meld_shorthand).collect();

    let flags = WinFlags {
        round_wind,
        seat_wind: Wind::from(win.winner),
        self_drawn: win.self_drawn,
        last_copy: is_last_copy(state, win),
        sea_bottom: is_sea_bottom(state),
        robbing_kong: is_robbing_kong(state, win),
    };
    let env_flag = flags.to_string();
    let flower_count = seat.flower_count();

    let mut hand = format!("{melds}{body}|{env_flag}");
    if flower_count > 0 {
        hand.push_str(&format!("|{flower_count}"));
    }
    Ok(EncodedHand {
        hand,
        env_flag,
        flags,
        flower_count,
    })
}

fn suit_slot(suit: Suit) -> usize {
    match suit {
        Suit::Characters => 0,
        Suit::Dots => 1,
        Suit::Bamboo => 2,
    }
}

/// `[123m,2]` for a chi, `[555p,1]` / `[EEEE]` for pengs and kongs.
pub fn meld_shorthand(meld: &Meld) -> String {
    let suit = kind_suit(meld.kind).map(Suit::letter);
    let name = TILE_NAMES.get(meld.kind as usize).copied().unwrap_or("?");
    let face = match suit {
        Some(_) => &name[..1],
        None => name,
    };
    let suffix: String = suit.map(String::from).unwrap_or_default();

    match meld.meld_type {
        MeldType::Chi => {
            let mut ranks: Vec<u8> = meld
                .tiles
                .iter()
                .filter_map(|&t| kind_rank(tile_kind(t)))
                .collect();
            ranks.sort_unstable();
            let digits: String = ranks.iter().map(|r| char::from(b'0' + r)).collect();
            format!("[{digits}{suffix},{}]", meld.tag)
        }
        MeldType::Peng | MeldType::Gang | MeldType::Angang | MeldType::Addgang => {
            let copies = if meld.meld_type == MeldType::Peng { 3 } else { 4 };
            let offer = if meld.tag != 0 {
                format!(",{}", meld.tag)
            } else {
                String::new()
            };
            format!("[{}{suffix}{offer}]", face.repeat(copies))
        }
    }
}

/// The winning kind had no unseen copy left besides the winning tile.
///
/// Counts copies in every exposed meld and every discard pile. A tile won
/// off a discard is itself still in a discard pile (or in the robbed kong)
/// and is taken out of the count.
pub fn is_last_copy(state: &MatchState, win: &WinInfo) -> bool {
    let kind = tile_kind(win.tile);
    let seat = state.seat(win.winner);

    if seat
        .melds
        .iter()
        .any(|m| m.is_exposed() && m.count_kind(kind) > 0)
    {
        return false;
    }
    if seat.count_kind(kind) != 1 {
        return false;
    }

    let visible: usize = state
        .seats
        .iter()
        .map(|s| {
            let in_melds: usize = s
                .melds
                .iter()
                .filter(|m| m.is_exposed())
                .map(|m| m.count_kind(kind))
                .sum();
            let in_discards = s.discards.iter().filter(|&&t| tile_kind(t) == kind).count();
            in_melds + in_discards
        })
        .sum();

    if win.self_drawn {
        visible == 3
    } else {
        visible.checked_sub(1) == Some(3)
    }
}

pub fn is_sea_bottom(state: &MatchState) -> bool {
    state.wall.is_exhausted()
}

pub fn is_robbing_kong(state: &MatchState, win: &WinInfo) -> bool {
    !win.self_drawn && state.last_action_was_kong
}
