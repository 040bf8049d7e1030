use std::time::Duration;

use thiserror::Error;

/// Failure to turn a transported record into a match script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("record is not valid JSON: {0}")]
    Record(#[source] serde_json::Error),
    #[error("record has no `script` field")]
    MissingScript,
    #[error("script is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to inflate script: {0}")]
    Inflate(#[source] std::io::Error),
    #[error("inflated script is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("script document is malformed: {0}")]
    Document(#[source] serde_json::Error),
    #[error("wall string is malformed: {0}")]
    WallHex(String),
    #[error("action #{index} is malformed: {reason}")]
    Action { index: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("failed to start scorer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("scorer i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("scorer timed out after {0:?}")]
    Timeout(Duration),
    #[error("scorer exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("scorer output is not understood: {0}")]
    Protocol(String),
    #[error("scorer rejected the hand: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("malformed script: {0}")]
    MalformedScript(#[from] ScriptError),
    #[error("inconsistent state at action #{index} (seat {seat}): {reason}")]
    InconsistentState {
        index: usize,
        seat: u8,
        reason: String,
    },
    #[error("scorer unavailable: {0}")]
    ScorerUnavailable(#[from] ScorerError),
}

pub type Result<T, E = ReplayError> = std::result::Result<T, E>;

/// Failure to read a canonical hand string back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandStringError {
    #[error("unexpected `{found}` at {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("digits without a suit letter")]
    DanglingDigits,
    #[error("meld `{0}` is not a chi, peng or kong")]
    BadMeld(String),
    #[error("more than four copies of {0}")]
    TooManyCopies(&'static str),
    #[error("environment flag `{0}` is malformed")]
    BadEnvFlag(String),
    #[error("hand has no tiles")]
    Empty,
}
