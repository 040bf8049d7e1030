pub mod error;
pub mod hand_encoder;
pub mod parser;
pub mod replay;
pub mod rule;
pub mod score;
pub mod scorer;
pub mod state;
pub mod types;
pub mod verify;

#[cfg(feature = "python")]
mod python;


pub use error::{ReplayError, Result, ScorerError, ScriptError};
pub use hand_encoder::{EncodedHand, WinFlags};
pub use replay::{decode_record, decode_script, Action, MatchReplay, MatchScript};
pub use rule::{DealerRule, GameConfig, ReplayRule};
pub use score::{FanEntry, OfficialScore, WinAnalysis, FAN_NAMES};
pub use scorer::{ProcessScorer, ScoreBreakdown, Scorer, ScorerConfig};
pub use state::wall::DealerPolicy;
pub use state::{MatchState, WinInfo};
pub use verify::{compare, verify_records, ComparisonResult};
