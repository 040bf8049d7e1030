use serde::{Deserialize, Serialize};

/// Number of physical (non-flower) tiles: 34 kinds x 4 copies.
pub const PHYSICAL_TILE_COUNT: usize = 136;
/// Tiles in the full wall, physical tiles followed by the 8 flowers.
pub const WALL_SIZE: usize = 144;
pub const KIND_COUNT: usize = 34;
pub const FLOWER_BASE: u8 = 136;
pub const FLOWER_COUNT: usize = 8;

/// Display name of every tile kind, indexed by `tile >> 2`.
///
/// The suited blocks are ordered characters, bamboo, dots, which is the
/// order the log format uses. Honors are winds then dragons.
pub const TILE_NAMES: [&str; KIND_COUNT] = [
    "1m", "2m", "3m", "4m", "5m", "6m", "7m", "8m", "9m", //
    "1s", "2s", "3s", "4s", "5s", "6s", "7s", "8s", "9s", //
    "1p", "2p", "3p", "4p", "5p", "6p", "7p", "8p", "9p", //
    "E", "S", "W", "N", "C", "F", "B",
];

pub const FLOWER_NAMES: [&str; FLOWER_COUNT] = ["1f", "2f", "3f", "4f", "5f", "6f", "7f", "8f"];

#[inline]
pub fn tile_kind(tile: u8) -> u8 {
    tile >> 2
}

#[inline]
pub fn is_physical(tile: u8) -> bool {
    (tile as usize) < PHYSICAL_TILE_COUNT
}

#[inline]
pub fn is_flower(tile: u8) -> bool {
    (FLOWER_BASE as usize..WALL_SIZE).contains(&(tile as usize))
}

/// Renders a tile value, `"??"` for values outside the 144-tile range.
pub fn tile_to_string(tile: u8) -> &'static str {
    if is_physical(tile) {
        TILE_NAMES[tile_kind(tile) as usize]
    } else if is_flower(tile) {
        FLOWER_NAMES[(tile - FLOWER_BASE) as usize]
    } else {
        "??"
    }
}

/// Looks a kind up by its display name.
pub fn kind_from_name(name: &str) -> Option<u8> {
    TILE_NAMES.iter().position(|n| *n == name).map(|k| k as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Characters,
    Bamboo,
    Dots,
}

impl Suit {
    pub fn letter(self) -> char {
        match self {
            Suit::Characters => 'm',
            Suit::Bamboo => 's',
            Suit::Dots => 'p',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'm' => Some(Suit::Characters),
            's' => Some(Suit::Bamboo),
            'p' => Some(Suit::Dots),
            _ => None,
        }
    }

    fn offset(self) -> u8 {
        match self {
            Suit::Characters => 0,
            Suit::Bamboo => 9,
            Suit::Dots => 18,
        }
    }

    /// Kind of `rank` (1-9) in this suit.
    pub fn kind(self, rank: u8) -> u8 {
        self.offset() + rank - 1
    }
}

/// Suit of a kind, `None` for honors.
pub fn kind_suit(kind: u8) -> Option<Suit> {
    match kind {
        0..=8 => Some(Suit::Characters),
        9..=17 => Some(Suit::Bamboo),
        18..=26 => Some(Suit::Dots),
        _ => None,
    }
}

/// Rank (1-9) of a suited kind.
pub fn kind_rank(kind: u8) -> Option<u8> {
    kind_suit(kind).map(|_| kind % 9 + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldType {
    Chi = 0,
    Peng = 1,
    /// Kong claimed from a discard.
    Gang = 2,
    Angang = 3,
    /// Kong upgraded from an exposed peng.
    Addgang = 4,
}

impl MeldType {
    pub fn is_kong(self) -> bool {
        matches!(self, MeldType::Gang | MeldType::Angang | MeldType::Addgang)
    }
}

/// Represents wind directions, used both for seats and for the round.
///
/// Seat winds follow the seat index directly: seat 0 is East, seat 1 South,
/// seat 2 West and seat 3 North. The round wind advances every four hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wind {
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl Wind {
    pub fn letter(self) -> char {
        match self {
            Wind::East => 'E',
            Wind::South => 'S',
            Wind::West => 'W',
            Wind::North => 'N',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'E' => Some(Wind::East),
            'S' => Some(Wind::South),
            'W' => Some(Wind::West),
            'N' => Some(Wind::North),
            _ => None,
        }
    }

    /// Round wind for a hand index within the match.
    pub fn for_round(round_index: u32) -> Self {
        Wind::from(((round_index / 4) % 4) as u8)
    }
}

impl From<u8> for Wind {
    fn from(val: u8) -> Self {
        match val % 4 {
            0 => Wind::East,
            1 => Wind::South,
            2 => Wind::West,
            _ => Wind::North,
        }
    }
}

/// An exposed (or concealed-kong) group owned by one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub meld_type: MeldType,
    /// Base kind; the middle kind for a chi.
    pub kind: u8,
    /// Physical tiles that moved into the meld.
    pub tiles: Vec<u8>,
    /// Chi shape index (1-3) for a chi, the offering-seat offset otherwise.
    pub tag: u8,
    /// The tile claimed from another seat, if any.
    pub claimed: Option<u8>,
}

impl Meld {
    pub fn count_kind(&self, kind: u8) -> usize {
        self.tiles.iter().filter(|&&t| tile_kind(t) == kind).count()
    }

    /// Whether the meld is visible to the other seats.
    pub fn is_exposed(&self) -> bool {
        self.meld_type != MeldType::Angang
    }
}
