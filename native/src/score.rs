use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::replay::script::MatchScript;
use crate::state::player::SeatState;
use crate::state::{MatchState, WinInfo};
use crate::types::{kind_rank, kind_suit, tile_kind, tile_to_string, MeldType, Suit, TILE_NAMES};

pub const FAN_CATALOG_SIZE: usize = 89;

/// Fan id of the flower bonus. Flowers are counted from the replay, so this
/// entry never appears in the named breakdown.
pub const FLOWER_FAN_ID: usize = 83;

/// Fan category names indexed by official fan id.
pub static FAN_NAMES: [&str; FAN_CATALOG_SIZE] = [
    "无", "大四喜", "大三元", "绿一色", "九莲宝灯", "四杠", "连七对", "十三幺",
    "清幺九", "小四喜", "小三元", "字一色", "四暗刻", "一色双龙会", "一色四同顺", "一色四节高",
    "一色四步高", "一色四连环", "三杠", "混幺九", "七对", "七星不靠", "全双刻", "清一色",
    "一色三同顺", "一色三节高", "全大", "全中", "全小", "清龙", "三色双龙会", "一色三步高",
    "一色三连环", "全带五", "三同刻", "三暗刻", "全不靠", "组合龙", "大于五", "小于五",
    "三风刻", "花龙", "推不倒", "三色三同顺", "三色三节高", "无番和", "妙手回春", "海底捞月",
    "杠上开花", "抢杠和", "碰碰和", "混一色", "三色三步高", "五门齐", "全求人", "双暗杠",
    "双箭刻", "全带幺", "不求人", "双明杠", "和绝张", "箭刻", "圈风刻", "门风刻",
    "门前清", "平和", "四归一", "双同刻", "双暗刻", "暗杠", "断幺", "一般高",
    "喜相逢", "连六", "老少副", "幺九刻", "明杠", "缺一门", "无字", "独听・边张",
    "独听・嵌张", "独听・单钓", "自摸", "花牌", "明暗杠", "\u{203b} 天和", "\u{203b} 地和", "\u{203b} 人和Ⅰ",
    "\u{203b} 人和Ⅱ",
];

pub fn fan_name(id: u32) -> Cow<'static, str> {
    match FAN_NAMES.get(id as usize) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(format!("未知番种({id})")),
    }
}

/// One decoded entry of the official bitfield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanEntry {
    pub id: u32,
    pub name: String,
    /// Points of one occurrence.
    pub score: u32,
    /// Stack count, at least 1.
    pub count: u32,
}

impl FanEntry {
    /// Unpacks `points = value & 0xFF`, `count = (value >> 8) + 1`.
    pub fn unpack(id: u32, value: u32) -> Self {
        Self {
            id,
            name: fan_name(id).into_owned(),
            score: value & 0xFF,
            count: (value >> 8) + 1,
        }
    }

    pub fn points(&self) -> u32 {
        self.score.saturating_mul(self.count)
    }
}

/// The winner's scoring as the match log declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfficialScore {
    /// Named entries ordered by fan id, flower bonus excluded.
    pub fans: Vec<FanEntry>,
    /// The flower-bonus entry, kept only for the fan-count vector.
    pub flower_entry: Option<FanEntry>,
    /// Sum of `points x count` over `fans`.
    pub fan_sum: u32,
    /// Total field of the log, if any.
    pub declared_total: Option<u32>,
    pub base_fan: u32,
    pub total_fan: u32,
    /// Flowers the winner actually revealed during replay.
    pub flower_count: u32,
}

impl OfficialScore {
    /// Decodes one seat's `{f: total, t: {id: packed}}` object.
    ///
    /// Anything that is not an object decodes to an empty breakdown.
    pub fn decode(seat_score: Option<&Value>, flower_count: usize) -> Self {
        let flower_count = flower_count as u32;
        let obj = seat_score.and_then(Value::as_object);

        let declared_total = obj.and_then(|o| o.get("f")).and_then(|f| match f.as_u64() {
            Some(v) => u32::try_from(v).ok(),
            None => {
                if !f.is_null() {
                    warn!(value = %f, "official total is not a non-negative integer, ignored");
                }
                None
            }
        });

        let mut fans = Vec::new();
        let mut flower_entry = None;
        if let Some(table) = obj.and_then(|o| o.get("t")).and_then(Value::as_object) {
            for (key, packed) in table {
                let (Ok(id), Some(value)) = (
                    key.parse::<u32>(),
                    // packed entries are 16-bit words
                    packed.as_u64().and_then(|v| u16::try_from(v).ok()).map(u32::from),
                ) else {
                    warn!(key = %key, value = %packed, "unreadable fan entry skipped");
                    continue;
                };
                let entry = FanEntry::unpack(id, value);
                if id as usize == FLOWER_FAN_ID {
                    flower_entry = Some(entry);
                } else {
                    fans.push(entry);
                }
            }
        }
        fans.sort_by_key(|f| f.id);
        let fan_sum = fans
            .iter()
            .fold(0u32, |sum, f| sum.saturating_add(f.points()));

        let (base_fan, total_fan) = match declared_total {
            Some(total) => {
                let inferred_flowers = total.saturating_sub(fan_sum);
                if inferred_flowers != flower_count {
                    warn!(
                        inferred_flowers,
                        flower_count, "declared total implies a different flower count, using the replayed one"
                    );
                }
                (total.saturating_sub(flower_count), total)
            }
            None => (fan_sum, fan_sum.saturating_add(flower_count)),
        };

        Self {
            fans,
            flower_entry,
            fan_sum,
            declared_total,
            base_fan,
            total_fan,
            flower_count,
        }
    }

    /// Stack counts aligned to [`FAN_NAMES`], flower bonus included.
    pub fn fan_vector(&self) -> Vec<u32> {
        let mut vector = vec![0; FAN_CATALOG_SIZE];
        for entry in self.fans.iter().chain(self.flower_entry.as_ref()) {
            if let Some(slot) = vector.get_mut(entry.id as usize) {
                *slot = entry.count;
            }
        }
        vector
    }
}

/// Per-match summary handed to statistics exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinAnalysis {
    pub winner: u8,
    pub winner_name: String,
    /// Dealer seat at the time of the win; a turn start can move it.
    pub dealer: u8,
    pub base_fan: u32,
    pub flower_count: u32,
    pub total_fan: u32,
    pub formatted_hand: String,
    pub fan_vector: Vec<u32>,
    pub winning_tile: String,
    pub game_title: String,
}

pub fn win_analysis(
    script: &MatchScript,
    state: &MatchState,
    win: &WinInfo,
    official: &OfficialScore,
) -> WinAnalysis {
    WinAnalysis {
        winner: win.winner,
        winner_name: script.player_name(win.winner).to_string(),
        dealer: state.dealer,
        base_fan: official.base_fan,
        flower_count: official.flower_count,
        total_fan: official.total_fan,
        formatted_hand: formatted_hand(state.seat(win.winner)),
        fan_vector: official.fan_vector(),
        winning_tile: tile_to_string(win.tile).to_string(),
        game_title: script.title().to_string(),
    }
}

/// Human-readable hand: `m`, `p`, `s` groups then honors, followed by the
/// melds with the claimed chi tile in parentheses, e.g. `234m 55p E [1s(2s)3s]`.
pub fn formatted_hand(seat: &SeatState) -> String {
    let mut suited: [Vec<u8>; 3] = Default::default();
    let mut honors: Vec<&str> = Vec::new();
    for &t in &seat.hand {
        let kind = tile_kind(t);
        match (kind_suit(kind), kind_rank(kind)) {
            (Some(suit), Some(rank)) => suited[group_index(suit)].push(rank),
            _ => honors.push(tile_to_string(t)),
        }
    }

    let mut parts = Vec::new();
    for suit in [Suit::Characters, Suit::Dots, Suit::Bamboo] {
        let ranks = &mut suited[group_index(suit)];
        if ranks.is_empty() {
            continue;
        }
        ranks.sort_unstable();
        let digits: String = ranks.iter().map(|r| char::from(b'0' + r)).collect();
        parts.push(format!("{digits}{}", suit.letter()));
    }
    if !honors.is_empty() {
        honors.sort_unstable();
        parts.push(honors.concat());
    }

    for meld in &seat.melds {
        let mut tiles = meld.tiles.clone();
        tiles.sort_unstable();
        let body: String = tiles
            .iter()
            .map(|&t| {
                let name = TILE_NAMES[tile_kind(t) as usize];
                if meld.meld_type == MeldType::Chi && meld.claimed == Some(t) {
                    format!("({name})")
                } else {
                    name.to_string()
                }
            })
            .collect();
        parts.push(format!("[{body}]"));
    }
    parts.join(" ")
}

fn group_index(suit: Suit) -> usize {
    match suit {
        Suit::Characters => 0,
        Suit::Dots => 1,
        Suit::Bamboo => 2,
    }
}
