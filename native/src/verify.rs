use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, ScorerError};
use crate::hand_encoder::EncodedHand;
use crate::replay::MatchReplay;
use crate::rule::ReplayRule;
use crate::score::{FanEntry, OfficialScore};
use crate::scorer::{normalize_fan_name, ScoreBreakdown, ScoredFan, Scorer, FLOWER_FAN_NAME};

/// Official scoring next to an independent recomputation of the same hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub hand_string: String,
    pub env_flag: String,
    /// Trusted official total, flower bonus included.
    pub official_total: u32,
    /// Sum of the official bitfield without the flower bonus.
    pub official_base: u32,
    pub official_fans: Vec<FanEntry>,
    pub recomputed_total: Option<u32>,
    pub recomputed_base: Option<u32>,
    pub recomputed_fans: Vec<ScoredFan>,
    /// `recomputed_total - official_total`, absent when the scorer failed.
    pub diff: Option<i64>,
    /// Fan names only the official breakdown lists.
    pub only_official: BTreeSet<String>,
    /// Fan names only the recomputation lists.
    pub only_recomputed: BTreeSet<String>,
    pub scorer_error: Option<String>,
}

impl ComparisonResult {
    /// Same total and the same set of fan names on both sides.
    pub fn agrees(&self) -> bool {
        self.diff == Some(0) && self.only_official.is_empty() && self.only_recomputed.is_empty()
    }

    pub fn build(
        encoded: &EncodedHand,
        official: &OfficialScore,
        scored: std::result::Result<ScoreBreakdown, ScorerError>,
    ) -> Self {
        let official_names: BTreeSet<String> = official
            .fans
            .iter()
            .map(|f| normalize_fan_name(&f.name))
            .filter(|name| *name != FLOWER_FAN_NAME)
            .map(str::to_string)
            .collect();

        let mut result = Self {
            hand_string: encoded.hand.clone(),
            env_flag: encoded.env_flag.clone(),
            official_total: official.total_fan,
            official_base: official.fan_sum,
            official_fans: official.fans.clone(),
            recomputed_total: None,
            recomputed_base: None,
            recomputed_fans: Vec::new(),
            diff: None,
            only_official: BTreeSet::new(),
            only_recomputed: BTreeSet::new(),
            scorer_error: None,
        };

        match scored {
            Ok(breakdown) => {
                let recomputed_names: BTreeSet<String> = breakdown
                    .fans
                    .iter()
                    .map(|f| f.normalized_name.as_str())
                    .filter(|name| *name != FLOWER_FAN_NAME)
                    .map(str::to_string)
                    .collect();
                result.only_official = official_names.difference(&recomputed_names).cloned().collect();
                result.only_recomputed = recomputed_names.difference(&official_names).cloned().collect();
                result.diff = Some(breakdown.total_fan as i64 - official.total_fan as i64);
                result.recomputed_total = Some(breakdown.total_fan);
                result.recomputed_base = Some(breakdown.base_fan);
                result.recomputed_fans = breakdown.fans;
            }
            Err(e) => {
                warn!(hand = %encoded.hand, error = %e, "scorer failed");
                result.scorer_error = Some(e.to_string());
            }
        }
        result
    }
}

/// Cross-checks a replayed match against `scorer`. `None` when nobody won.
///
/// A scorer failure is recorded in the result; only replay problems are
/// returned as errors.
pub fn compare<S>(replay: &MatchReplay, scorer: &S) -> Result<Option<ComparisonResult>>
where
    S: Scorer + ?Sized,
{
    let (Some(encoded), Some(official)) = (replay.encode_hand()?, replay.official_score()) else {
        return Ok(None);
    };
    let scored = scorer.score(&encoded.hand);
    let result = ComparisonResult::build(&encoded, &official, scored);
    debug!(
        hand = %result.hand_string,
        official = result.official_total,
        recomputed = ?result.recomputed_total,
        "compared"
    );
    Ok(Some(result))
}

pub fn verify_record<S>(record_json: &str, rule: ReplayRule, scorer: &S) -> Result<Option<ComparisonResult>>
where
    S: Scorer + ?Sized,
{
    let replay = MatchReplay::from_record(record_json, rule)?;
    compare(&replay, scorer)
}

/// Verifies many records in parallel, one result per record in input order.
pub fn verify_records<T, S>(
    records: &[T],
    rule: ReplayRule,
    scorer: &S,
) -> Vec<Result<Option<ComparisonResult>>>
where
    T: AsRef<str> + Sync,
    S: Scorer + ?Sized,
{
    records
        .par_iter()
        .enumerate()
        .map(|(i, record)| {
            let outcome = verify_record(record.as_ref(), rule, scorer);
            if let Err(e) = &outcome {
                warn!(record = i, error = %e, "record skipped");
            }
            outcome
        })
        .collect()
}
