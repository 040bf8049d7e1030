use std::io::{Read, Write};

use base64::{engine::general_purpose, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::rule::GameConfig;
use crate::types::WALL_SIZE;

/// One entry of the action array: `(opcode, data, elapsed_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub seat: u8,
    pub action_type: u8,
    /// 16-bit packed payload.
    pub data: u32,
    /// Milliseconds since the match started.
    pub elapsed_ms: u64,
}

impl ActionRecord {
    pub fn from_opcode(opcode: u8, data: u32, elapsed_ms: u64) -> Self {
        Self {
            seat: (opcode >> 4) & 3,
            action_type: opcode & 15,
            data,
            elapsed_ms,
        }
    }

    #[inline]
    pub fn lo_byte(&self) -> u8 {
        (self.data & 0xFF) as u8
    }

    #[inline]
    pub fn hi_byte(&self) -> u8 {
        ((self.data >> 8) & 0xFF) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    #[serde(rename = "n", default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The decoded match descriptor.
///
/// Field names follow the transported document so that serializing a script
/// gives back the document it was decoded from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchScript {
    /// 144 tile identities, two hex digits each.
    #[serde(rename = "w")]
    pub wall_hex: String,
    /// Four 4-bit dice, low nibble first.
    #[serde(rename = "d")]
    pub dice_word: u16,
    #[serde(rename = "p", default)]
    pub players: Vec<PlayerInfo>,
    /// Hand index within the match.
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub round_index: Option<u32>,
    #[serde(rename = "g", default)]
    pub config: GameConfig,
    /// Match start, milliseconds since the Unix epoch.
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<i64>,
    #[serde(rename = "a", default)]
    pub raw_actions: Vec<Vec<i64>>,
    /// Per-seat official scoring, see [`crate::score`].
    #[serde(rename = "y", default)]
    pub scores: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,

    #[serde(skip)]
    pub tiles: Vec<u8>,
    #[serde(skip)]
    pub actions: Vec<ActionRecord>,
}

impl MatchScript {
    pub fn dice(&self) -> [u8; 4] {
        let d = self.dice_word;
        [
            (d & 15) as u8,
            ((d >> 4) & 15) as u8,
            ((d >> 8) & 15) as u8,
            ((d >> 12) & 15) as u8,
        ]
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn player_name(&self, seat: u8) -> &str {
        self.players
            .get(seat as usize)
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }

    /// Start plus the last action's elapsed time.
    pub fn end_ms(&self) -> Option<i64> {
        let last = self.actions.last().map_or(0, |a| a.elapsed_ms as i64);
        self.start_ms.map(|s| s + last)
    }
}

/// Decodes a raw match record: a JSON document with a `script` field.
pub fn decode_record(record_json: &str) -> Result<MatchScript, ScriptError> {
    let record: serde_json::Value =
        serde_json::from_str(record_json).map_err(ScriptError::Record)?;
    let blob = record
        .get("script")
        .and_then(|s| s.as_str())
        .ok_or(ScriptError::MissingScript)?;
    decode_script(blob)
}

/// base64 → zlib inflate → JSON document → wall and action arrays.
pub fn decode_script(blob: &str) -> Result<MatchScript, ScriptError> {
    let compressed = general_purpose::STANDARD.decode(blob.trim())?;
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut buffer = Vec::with_capacity(compressed.len() * 4);
    decoder
        .read_to_end(&mut buffer)
        .map_err(ScriptError::Inflate)?;
    let text = String::from_utf8(buffer)?;

    let mut script: MatchScript = serde_json::from_str(&text).map_err(ScriptError::Document)?;
    script.tiles = parse_wall_hex(&script.wall_hex)?;
    script.actions = parse_actions(&script.raw_actions)?;
    Ok(script)
}

/// Inverse of [`decode_script`] for a script document.
pub fn encode_script(document: &str) -> std::io::Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(general_purpose::STANDARD.encode(compressed))
}

pub fn parse_wall_hex(hex: &str) -> Result<Vec<u8>, ScriptError> {
    if hex.len() != WALL_SIZE * 2 {
        return Err(ScriptError::WallHex(format!(
            "expected {} hex digits, got {}",
            WALL_SIZE * 2,
            hex.len()
        )));
    }
    let mut seen = [false; WALL_SIZE];
    let mut tiles = Vec::with_capacity(WALL_SIZE);
    for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
        let digits = std::str::from_utf8(pair)
            .map_err(|_| ScriptError::WallHex(format!("non-ASCII digit at tile {i}")))?;
        let tile = u8::from_str_radix(digits, 16)
            .map_err(|_| ScriptError::WallHex(format!("bad hex `{digits}` at tile {i}")))?;
        if tile as usize >= WALL_SIZE {
            return Err(ScriptError::WallHex(format!("tile {tile} out of range at {i}")));
        }
        if std::mem::replace(&mut seen[tile as usize], true) {
            return Err(ScriptError::WallHex(format!("tile {tile} appears twice")));
        }
        tiles.push(tile);
    }
    Ok(tiles)
}

fn parse_actions(raw: &[Vec<i64>]) -> Result<Vec<ActionRecord>, ScriptError> {
    raw.iter()
        .enumerate()
        .map(|(index, a)| {
            let bad = |reason: &str| ScriptError::Action {
                index,
                reason: reason.to_string(),
            };
            if a.len() < 3 {
                return Err(bad("expected [opcode, data, elapsed]"));
            }
            let opcode = u8::try_from(a[0]).map_err(|_| bad("opcode is not a byte"))?;
            let data = u16::try_from(a[1]).map_err(|_| bad("data is not a 16-bit word"))?;
            let elapsed = u64::try_from(a[2]).map_err(|_| bad("negative timestamp"))?;
            Ok(ActionRecord::from_opcode(opcode, data as u32, elapsed))
        })
        .collect()
}
