use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScorerError;

/// Name the scorer and the official log both use for the flower bonus.
pub const FLOWER_FAN_NAME: &str = "花牌";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Maps the scorer's fan names onto the official catalog's spelling.
pub fn normalize_fan_name(name: &str) -> &str {
    match name {
        "单钓将" => "独听・单钓",
        "边张" => "独听・边张",
        "嵌张" => "独听・嵌张",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredFan {
    pub name: String,
    pub normalized_name: String,
    pub score: u32,
    pub count: u32,
}

/// What an independent scorer says about a hand string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_fan: u32,
    /// Total without the flower bonus.
    pub base_fan: u32,
    pub flowers: u32,
    pub fans: Vec<ScoredFan>,
}

#[derive(Debug, Deserialize)]
struct ReplyFan {
    name: String,
    #[serde(rename = "normalizedName", default)]
    normalized_name: Option<String>,
    score: u32,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct Reply {
    total_fan: Option<u32>,
    base_fan: Option<u32>,
    #[serde(default)]
    flowers: u32,
    #[serde(default)]
    fan_list: Vec<ReplyFan>,
    error: Option<String>,
}

impl ScoreBreakdown {
    /// Reads the scorer's JSON reply (`total_fan`, `base_fan`, `flowers`,
    /// `fan_list`, `error`).
    pub fn from_reply(json: &str) -> Result<Self, ScorerError> {
        let reply: Reply = serde_json::from_str(json.trim())
            .map_err(|e| ScorerError::Protocol(format!("{e}: {}", json.trim())))?;
        if let Some(error) = reply.error {
            return Err(ScorerError::Rejected(error));
        }
        let total_fan = reply
            .total_fan
            .ok_or_else(|| ScorerError::Protocol("reply has no total_fan".into()))?;
        let fans: Vec<ScoredFan> = reply
            .fan_list
            .into_iter()
            .map(|f| ScoredFan {
                normalized_name: f
                    .normalized_name
                    .unwrap_or_else(|| normalize_fan_name(&f.name).to_string()),
                name: f.name,
                score: f.score,
                count: f.count,
            })
            .collect();
        let base_fan = reply.base_fan.unwrap_or_else(|| {
            fans.iter()
                .filter(|f| f.normalized_name != FLOWER_FAN_NAME)
                .fold(0u32, |sum, f| sum.saturating_add(f.score.saturating_mul(f.count)))
        });
        Ok(Self {
            total_fan,
            base_fan,
            flowers: reply.flowers,
            fans,
        })
    }
}

/// Scores a canonical hand string.
///
/// Closures `Fn(&str) -> Result<ScoreBreakdown, ScorerError>` implement it
/// too, which is how in-process engines and test doubles plug in.
pub trait Scorer: Send + Sync {
    fn score(&self, hand: &str) -> Result<ScoreBreakdown, ScorerError>;
}

impl<F> Scorer for F
where
    F: Fn(&str) -> Result<ScoreBreakdown, ScorerError> + Send + Sync,
{
    fn score(&self, hand: &str) -> Result<ScoreBreakdown, ScorerError> {
        self(hand)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    pub working_dir: Option<PathBuf>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["compute_fan.mjs".to_string()],
            timeout_ms: 10_000,
            working_dir: None,
        }
    }
}

impl ScorerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Runs an external scorer once per hand: `{"hand": ...}` on stdin, one
/// JSON reply on stdout. The child is killed when the timeout passes.
#[derive(Debug, Clone, Default)]
pub struct ProcessScorer {
    pub config: ScorerConfig,
}

impl ProcessScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    fn run(&self, request: &str) -> Result<String, ScorerError> {
        let cfg = &self.config;
        let mut command = Command::new(&cfg.program);
        command
            .args(&cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &cfg.working_dir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|source| ScorerError::Spawn {
            program: cfg.program.clone(),
            source,
        })?;
        debug!(program = %cfg.program, pid = child.id(), "scorer started");

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(request.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = thread::spawn(move || read_all(stdout));
        let err_reader = thread::spawn(move || read_all(stderr));

        let timeout = cfg.timeout();
        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ScorerError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let out = join_reader(out_reader)?;
        let err = join_reader(err_reader)?;
        if !status.success() {
            return Err(ScorerError::Exit {
                code: status.code(),
                stderr: err.trim().to_string(),
            });
        }
        Ok(out)
    }
}

fn join_reader(reader: thread::JoinHandle<std::io::Result<String>>) -> Result<String, ScorerError> {
    let output = reader
        .join()
        .map_err(|_| ScorerError::Protocol("output reader panicked".into()))?;
    Ok(output?)
}

fn read_all<R: Read>(source: Option<R>) -> std::io::Result<String> {
    let mut buf = String::new();
    if let Some(mut source) = source {
        source.read_to_string(&mut buf)?;
    }
    Ok(buf)
}

impl Scorer for ProcessScorer {
    fn score(&self, hand: &str) -> Result<ScoreBreakdown, ScorerError> {
        let request = serde_json::json!({ "hand": hand }).to_string();
        let reply = self.run(&request)?;
        ScoreBreakdown::from_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_fan_name("单钓将"), "独听・单钓");
        assert_eq!(normalize_fan_name("嵌张"), "独听・嵌张");
        assert_eq!(normalize_fan_name("平和"), "平和");
    }

    #[test]
    fn test_reply_parsing() {
        let reply = r#"{"hand":"x","total_fan":9,"base_fan":8,"flowers":1,
            "fan_list":[{"id":63,"name":"平和","normalizedName":"平和","score":2,"count":1},
                        {"id":79,"name":"边张","score":1,"count":1}]}"#;
        let b = ScoreBreakdown::from_reply(reply).unwrap();
        assert_eq!((b.total_fan, b.base_fan, b.flowers), (9, 8, 1));
        assert_eq!(b.fans[1].normalized_name, "独听・边张");
    }

    #[test]
    fn test_reply_errors() {
        assert!(matches!(
            ScoreBreakdown::from_reply(r#"{"hand":"x","error":"NOT_HU"}"#),
            Err(ScorerError::Rejected(e)) if e == "NOT_HU"
        ));
        assert!(matches!(
            ScoreBreakdown::from_reply("Segmentation fault"),
            Err(ScorerError::Protocol(_))
        ));
        assert!(matches!(
            ScoreBreakdown::from_reply("{}"),
            Err(ScorerError::Protocol(_))
        ));
    }

    #[test]
    fn test_base_derived_without_flowers() {
        let reply = r#"{"total_fan":10,"fan_list":[
            {"name":"平和","score":2,"count":1},{"name":"花牌","score":1,"count":2},
            {"name":"断幺","score":2,"count":3}]}"#;
        assert_eq!(ScoreBreakdown::from_reply(reply).unwrap().base_fan, 8);
    }

    #[test]
    fn test_base_saturates_on_huge_counts() {
        let reply = r#"{"total_fan":1,"fan_list":[
            {"name":"平和","score":4294967295,"count":4294967295},
            {"name":"断幺","score":2,"count":1}]}"#;
        assert_eq!(ScoreBreakdown::from_reply(reply).unwrap().base_fan, u32::MAX);
    }

    #[test]
    fn test_missing_program() {
        let scorer = ProcessScorer::new(ScorerConfig {
            program: "definitely-not-a-scorer-binary".into(),
            ..Default::default()
        });
        assert!(matches!(
            scorer.score("1m|EE1000"),
            Err(ScorerError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_roundtrip() {
        let scorer = ProcessScorer::new(ScorerConfig {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                r#"cat >/dev/null; echo '{"total_fan":8,"base_fan":8,"fan_list":[]}'"#.into(),
            ],
            ..Default::default()
        });
        let b = scorer.score("123m").unwrap();
        assert_eq!(b.total_fan, 8);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_timeout_and_exit() {
        let slow = ProcessScorer::new(ScorerConfig {
            program: "sh".into(),
            args: vec!["-c".into(), "sleep 5".into()],
            timeout_ms: 50,
            working_dir: None,
        });
        assert!(matches!(slow.score("1m"), Err(ScorerError::Timeout(_))));

        let failing = ProcessScorer::new(ScorerConfig {
            program: "sh".into(),
            args: vec!["-c".into(), "cat >/dev/null; echo boom >&2; exit 3".into()],
            ..Default::default()
        });
        assert!(matches!(
            failing.score("1m"),
            Err(ScorerError::Exit { code: Some(3), ref stderr }) if stderr == "boom"
        ));
    }
}
