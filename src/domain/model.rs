use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One daily OHLCV aggregate as returned by the market data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub t: DateTime<Utc>,
    #[serde(default)]
    pub o: Option<f64>,
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub l: Option<f64>,
    #[serde(default)]
    pub c: Option<f64>,
    #[serde(default)]
    pub v: Option<f64>,
    #[serde(default)]
    pub n: Option<u64>,
    #[serde(default)]
    pub vw: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendLabel {
    Weak,
    Moderate,
    Strong,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Weak => "WEAK",
            TrendLabel::Moderate => "MODERATE",
            TrendLabel::Strong => "STRONG",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: TrendLabel,
    pub diff_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    pub value: f64,
    /// Number of closes actually averaged; smaller than requested when history is short.
    pub window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSignal {
    pub symbol: String,
    pub window: usize,
    pub ma_value: f64,
    pub last_price: f64,
    pub last_time: DateTime<Utc>,
    pub label: TrendLabel,
    pub diff_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorksheetRef {
    pub spreadsheet_id: String,
    pub title: String,
}

/// How to find the spreadsheet: a known id, or a title looked up in Drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetLocator {
    Id(String),
    Title(String),
}

impl fmt::Display for SpreadsheetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetLocator::Id(id) => write!(f, "id:{}", id),
            SpreadsheetLocator::Title(title) => write!(f, "'{}'", title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub signal: TrendSignal,
    pub worksheet: Option<WorksheetRef>,
    pub cell: String,
    pub previous_value: Option<String>,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Updated(CycleReport),
    Skipped { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_deserializes_alpaca_shape() {
        let bar: Bar = serde_json::from_value(serde_json::json!({
            "t": "2024-01-02T05:00:00Z",
            "o": 160.1, "h": 161.0, "l": 159.5, "c": 160.7,
            "v": 1234567, "n": 9876, "vw": 160.4
        }))
        .unwrap();

        assert_eq!(bar.c, Some(160.7));
        assert_eq!(bar.n, Some(9876));
        assert_eq!(bar.t.to_rfc3339(), "2024-01-02T05:00:00+00:00");
    }

    #[test]
    fn test_bar_without_close() {
        let bar: Bar = serde_json::from_value(serde_json::json!({
            "t": "2024-01-02T05:00:00Z"
        }))
        .unwrap();
        assert_eq!(bar.c, None);
    }

    #[test]
    fn test_label_rendering() {
        assert_eq!(TrendLabel::Weak.to_string(), "WEAK");
        assert_eq!(
            serde_json::to_string(&TrendLabel::Moderate).unwrap(),
            "\"MODERATE\""
        );
    }
}
