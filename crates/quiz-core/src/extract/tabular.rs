//! Tabular Cutoff-Sum Extractor.
//!
//! Row 1, column 1 is the integer cutoff. Every later row contributes its first column when
//! that value is at or above the cutoff. Rows that are not numbers are skipped.

use super::Extraction;
use crate::error::{QuizError, QuizResult};
use serde_json::Value;

pub const METHOD: &str = "tabular_cutoff_sum";
pub const ERROR_METHOD: &str = "tabular_error";

/// Outcome of a cutoff sum.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoffSum {
    pub cutoff: i64,
    pub total: f64,
    /// Rows at or above the cutoff.
    pub counted: usize,
    /// Rows that were malformed or non-numeric.
    pub skipped: usize,
}

impl CutoffSum {
    /// Integer when the total is exactly integral, float otherwise.
    pub fn answer(&self) -> Value {
        if self.total.fract() == 0.0 && self.total.abs() < 9.0e15 {
            Value::from(self.total as i64)
        } else {
            serde_json::Number::from_f64(self.total)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
    }
}

/// Compute the cutoff sum over CSV-ish content.
pub fn cutoff_sum(content: &str) -> QuizResult<CutoffSum> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let first = records
        .next()
        .ok_or_else(|| QuizError::Parse("no rows".to_string()))?
        .map_err(|e| QuizError::Parse(format!("cutoff row: {}", e)))?;
    let raw = first.get(0).unwrap_or("");
    let cutoff = parse_cutoff(raw)
        .ok_or_else(|| QuizError::Parse(format!("cutoff row is not an integer: {:?}", raw)))?;

    let mut sum = CutoffSum {
        cutoff,
        total: 0.0,
        counted: 0,
        skipped: 0,
    };
    for record in records {
        let value = record
            .ok()
            .and_then(|r| r.get(0).and_then(|f| f.parse::<f64>().ok()))
            .filter(|v| v.is_finite());
        match value {
            Some(v) if v >= cutoff as f64 => {
                sum.total += v;
                sum.counted += 1;
            }
            Some(_) => {}
            None => sum.skipped += 1,
        }
    }
    Ok(sum)
}

fn parse_cutoff(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

/// Extractor wrapper: a parse failure degrades to an empty answer with the error in detail.
pub fn extract_tabular(content: &str) -> Extraction {
    match cutoff_sum(content) {
        Ok(sum) => Extraction::new(sum.answer(), METHOD)
            .with_detail("cutoff", sum.cutoff)
            .with_detail("counted", sum.counted)
            .with_detail("skipped", sum.skipped),
        Err(e) => {
            tracing::warn!(target: "quiz::extract", error = %e, "Cutoff sum failed");
            Extraction::empty(ERROR_METHOD).with_detail("error", e.to_string())
        }
    }
}
