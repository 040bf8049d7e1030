use std::iter::Peekable;
use std::str::Chars;

use crate::error::HandStringError;
use crate::hand_encoder::WinFlags;
use crate::types::{kind_from_name, kind_rank, kind_suit, tile_kind, Meld, MeldType, Suit, Wind, KIND_COUNT, TILE_NAMES};

/// Hands out physical copies of each kind, lowest free copy first.
struct CopyAllocator {
    used: [[bool; 4]; KIND_COUNT],
}

impl CopyAllocator {
    fn new() -> Self {
        Self {
            used: [[false; 4]; KIND_COUNT],
        }
    }

    fn take(&mut self, kind: u8) -> Result<u8, HandStringError> {
        let copies = &mut self.used[kind as usize];
        let slot = copies
            .iter()
            .position(|used| !used)
            .ok_or(HandStringError::TooManyCopies(TILE_NAMES[kind as usize]))?;
        copies[slot] = true;
        Ok(kind * 4 + slot as u8)
    }
}

/// A canonical hand string read back into tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHand {
    pub melds: Vec<Meld>,
    /// Concealed tiles without the winning tile, in string order.
    pub concealed: Vec<u8>,
    pub winning_tile: u8,
    pub flags: Option<WinFlags>,
    pub flower_count: usize,
}

impl ParsedHand {
    pub fn winning_kind(&self) -> u8 {
        tile_kind(self.winning_tile)
    }
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            pos: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, want: char) -> Result<(), HandStringError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(found) => Err(HandStringError::Unexpected {
                found,
                pos: self.pos - 1,
            }),
            None => Err(HandStringError::UnexpectedEnd),
        }
    }

    fn unexpected(&self, found: char) -> HandStringError {
        HandStringError::Unexpected {
            found,
            pos: self.pos,
        }
    }

    /// Reads tile faces (`123m`, `E`, ...) up to a stop character or the end.
    fn faces(&mut self, stop: &[char]) -> Result<Vec<u8>, HandStringError> {
        let mut kinds = Vec::new();
        let mut pending: Vec<u8> = Vec::new();
        while let Some(c) = self.peek() {
            if stop.contains(&c) {
                break;
            }
            if let Some(d) = c.to_digit(10).filter(|d| (1..=9).contains(d)) {
                pending.push(d as u8);
            } else if let Some(suit) = Suit::from_letter(c) {
                if pending.is_empty() {
                    return Err(self.unexpected(c));
                }
                kinds.extend(pending.drain(..).map(|rank| suit.kind(rank)));
            } else if let Some(kind) = honor_kind(c) {
                if !pending.is_empty() {
                    return Err(HandStringError::DanglingDigits);
                }
                kinds.push(kind);
            } else {
                return Err(self.unexpected(c));
            }
            self.bump();
        }
        if !pending.is_empty() {
            return Err(HandStringError::DanglingDigits);
        }
        Ok(kinds)
    }

    fn number(&mut self) -> Result<u32, HandStringError> {
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.bump();
        }
        match digits.parse() {
            Ok(n) => Ok(n),
            Err(_) => match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(HandStringError::UnexpectedEnd),
            },
        }
    }
}

fn honor_kind(c: char) -> Option<u8> {
    match c {
        'E' | 'S' | 'W' | 'N' | 'C' | 'F' | 'B' => kind_from_name(c.encode_utf8(&mut [0; 4])),
        _ => None,
    }
}

/// Parses `[melds]body|RSDLKG|flowers` as produced by
/// [`crate::hand_encoder::encode`]. The environment and flower parts are
/// optional.
///
/// Added kongs read back as melded kongs, the string does not tell them
/// apart.
pub fn parse_hand_string(text: &str) -> Result<ParsedHand, HandStringError> {
    let mut alloc = CopyAllocator::new();
    let mut cursor = Cursor::new(text.trim());

    let mut melds = Vec::new();
    while cursor.peek() == Some('[') {
        cursor.bump();
        melds.push(parse_meld(&mut cursor, &mut alloc)?);
    }

    let kinds = cursor.faces(&['|'])?;
    let mut concealed = kinds
        .into_iter()
        .map(|k| alloc.take(k))
        .collect::<Result<Vec<_>, _>>()?;
    let winning_tile = concealed.pop().ok_or(HandStringError::Empty)?;

    let mut flags = None;
    let mut flower_count = 0;
    if cursor.peek() == Some('|') {
        cursor.bump();
        let mut env = String::new();
        while let Some(c) = cursor.peek().filter(|&c| c != '|') {
            env.push(c);
            cursor.bump();
        }
        flags = Some(parse_env_flag(&env)?);
        if cursor.peek() == Some('|') {
            cursor.bump();
            flower_count = cursor.number()? as usize;
        }
    }
    if let Some(c) = cursor.peek() {
        return Err(cursor.unexpected(c));
    }

    Ok(ParsedHand {
        melds,
        concealed,
        winning_tile,
        flags,
        flower_count,
    })
}

fn parse_meld(cursor: &mut Cursor, alloc: &mut CopyAllocator) -> Result<Meld, HandStringError> {
    let kinds = cursor.faces(&[',', ']'])?;
    let tag = if cursor.peek() == Some(',') {
        cursor.bump();
        cursor.number()?
    } else {
        0
    };
    cursor.expect(']')?;

    let describe = || {
        let names: String = kinds.iter().map(|&k| TILE_NAMES[k as usize]).collect();
        HandStringError::BadMeld(names)
    };
    let tag = u8::try_from(tag).map_err(|_| describe())?;
    let same = kinds.windows(2).all(|w| w[0] == w[1]);

    let (meld_type, kind) = match kinds.len() {
        3 if same => (MeldType::Peng, kinds[0]),
        4 if same && tag == 0 => (MeldType::Angang, kinds[0]),
        4 if same => (MeldType::Gang, kinds[0]),
        3 if is_run(&kinds) => (MeldType::Chi, kinds[1]),
        _ => return Err(describe()),
    };
    let tiles = kinds
        .iter()
        .map(|&k| alloc.take(k))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Meld {
        meld_type,
        kind,
        tiles,
        tag,
        claimed: None,
    })
}

fn is_run(kinds: &[u8]) -> bool {
    let suit = kind_suit(kinds[0]);
    suit.is_some()
        && kinds.iter().all(|&k| kind_suit(k) == suit)
        && kinds.windows(2).all(|w| kind_rank(w[1]) == kind_rank(w[0]).map(|r| r + 1))
}

/// Reads `RSDLKG`: round wind, seat wind, then four 0/1 flags.
pub fn parse_env_flag(env: &str) -> Result<WinFlags, HandStringError> {
    let bad = || HandStringError::BadEnvFlag(env.to_string());
    let chars: Vec<char> = env.chars().collect();
    let [r, s, d, l, k, g] = chars[..] else {
        return Err(bad());
    };
    let bit = |c: char| match c {
        '0' => Ok(false),
        '1' => Ok(true),
        _ => Err(bad()),
    };
    Ok(WinFlags {
        round_wind: Wind::from_letter(r).ok_or_else(bad)?,
        seat_wind: Wind::from_letter(s).ok_or_else(bad)?,
        self_drawn: bit(d)?,
        last_copy: bit(l)?,
        sea_bottom: bit(k)?,
        robbing_kong: bit(g)?,
    })
}
