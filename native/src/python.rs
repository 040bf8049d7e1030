use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::ReplayError;
use crate::replay::{self, MatchReplay};
use crate::rule::{DealerRule, ReplayRule};
use crate::score::WinAnalysis;
use crate::scorer::{ProcessScorer, ScorerConfig};
use crate::verify;

fn to_py_err(e: ReplayError) -> PyErr {
    match e {
        ReplayError::MalformedScript(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

#[pyclass(name = "WinAnalysis", get_all)]
#[derive(Debug, Clone)]
pub struct PyWinAnalysis {
    pub winner: u8,
    pub winner_name: String,
    pub dealer: u8,
    pub base_fan: u32,
    pub flower_count: u32,
    pub total_fan: u32,
    pub formatted_hand: String,
    pub fan_vector: Vec<u32>,
    pub winning_tile: String,
    pub game_title: String,
}

impl From<WinAnalysis> for PyWinAnalysis {
    fn from(a: WinAnalysis) -> Self {
        Self {
            winner: a.winner,
            winner_name: a.winner_name,
            dealer: a.dealer,
            base_fan: a.base_fan,
            flower_count: a.flower_count,
            total_fan: a.total_fan,
            formatted_hand: a.formatted_hand,
            fan_vector: a.fan_vector,
            winning_tile: a.winning_tile,
            game_title: a.game_title,
        }
    }
}

#[pyclass(name = "MatchReplay")]
pub struct PyMatchReplay {
    inner: MatchReplay,
}

#[pymethods]
impl PyMatchReplay {
    /// Replays a raw record document (the JSON object holding `script`).
    #[staticmethod]
    #[pyo3(signature = (record_json, dealer=None, strict_wall=false))]
    fn from_record(record_json: &str, dealer: Option<u8>, strict_wall: bool) -> PyResult<Self> {
        let rule = ReplayRule {
            dealer: dealer.map_or(DealerRule::default(), DealerRule::Fixed),
            strict_wall,
        };
        let inner = MatchReplay::from_record(record_json, rule).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[getter]
    fn title(&self) -> String {
        self.inner.script.title().to_string()
    }

    #[getter]
    fn winner(&self) -> Option<u8> {
        self.inner.win().map(|w| w.winner)
    }

    #[getter]
    fn wall_mismatches(&self) -> usize {
        self.inner.state.wall_mismatches
    }

    fn win_analysis(&self) -> Option<PyWinAnalysis> {
        self.inner.win_analysis().map(PyWinAnalysis::from)
    }

    /// Canonical hand string, `None` when nobody won.
    fn hand_string(&self) -> PyResult<Option<String>> {
        let encoded = self.inner.encode_hand().map_err(to_py_err)?;
        Ok(encoded.map(|e| e.hand))
    }

    /// `(id, name, score, count)` per official fan entry.
    fn official_fans(&self) -> Vec<(u32, String, u32, u32)> {
        self.inner
            .official_fans()
            .into_iter()
            .map(|f| (f.id, f.name, f.score, f.count))
            .collect()
    }

    /// Runs the external scorer and returns the comparison as JSON.
    #[pyo3(signature = (program=None, timeout_ms=None))]
    fn compare(
        &self,
        py: Python<'_>,
        program: Option<String>,
        timeout_ms: Option<u64>,
    ) -> PyResult<Option<String>> {
        let defaults = ScorerConfig::default();
        let scorer = ProcessScorer::new(ScorerConfig {
            program: program.unwrap_or(defaults.program),
            timeout_ms: timeout_ms.unwrap_or(defaults.timeout_ms),
            ..ScorerConfig::default()
        });
        let result = py
            .allow_threads(|| verify::compare(&self.inner, &scorer))
            .map_err(to_py_err)?;
        result
            .map(|r| serde_json::to_string(&r))
            .transpose()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }
}

/// Decodes a transported script blob into its JSON document.
#[pyfunction]
fn decode_script(blob: &str) -> PyResult<String> {
    let script = replay::decode_script(blob).map_err(|e| to_py_err(e.into()))?;
    serde_json::to_string(&script).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pymodule]
fn _gb_replay(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMatchReplay>()?;
    m.add_class::<PyWinAnalysis>()?;
    m.add_function(wrap_pyfunction!(decode_script, m)?)?;
    Ok(())
}
