use crate::domain::model::{Bar, Classification, MovingAverage, TrendLabel};
use crate::utils::error::{BotError, Result};

pub const DEFAULT_WEAK_THRESHOLD_PCT: f64 = 10.0;

/// Simple moving average over the last `window` closes.
///
/// Bars without a close are ignored. When fewer closes than `window` are
/// available the average is taken over all of them and the returned
/// `MovingAverage::window` reports the effective size.
pub fn compute_moving_average(bars: &[Bar], window: usize) -> Result<MovingAverage> {
    if bars.is_empty() {
        return Err(BotError::processing(
            "No bars available to compute moving average.",
        ));
    }
    if window == 0 {
        return Err(BotError::processing("Moving average window must be at least 1"));
    }

    let closes: Vec<f64> = bars.iter().filter_map(|b| b.c).collect();
    if closes.is_empty() {
        return Err(BotError::processing("None of the bars carry a close price"));
    }

    let mut effective = window;
    if closes.len() < window {
        tracing::warn!(
            "Only {} closes available; requested window is {}. Will compute MA over available closes.",
            closes.len(),
            window
        );
        effective = closes.len();
    }

    let relevant = &closes[closes.len() - effective..];
    let value = relevant.iter().sum::<f64>() / effective as f64;

    Ok(MovingAverage {
        value,
        window: effective,
    })
}

/// Position of the last price relative to the moving average.
///
/// Far above the MA (more than `weak_threshold_pct`) reads as WEAK, above or
/// at the MA as MODERATE, below it as STRONG.
pub fn classify_trend(last_price: f64, ma_value: f64, weak_threshold_pct: f64) -> Result<Classification> {
    if !ma_value.is_finite() || ma_value <= 0.0 {
        return Err(BotError::processing(format!(
            "Cannot classify against a non-positive moving average ({})",
            ma_value
        )));
    }
    if !weak_threshold_pct.is_finite() || weak_threshold_pct < 0.0 {
        return Err(BotError::processing(format!(
            "Weak threshold must be a non-negative number ({})",
            weak_threshold_pct
        )));
    }
    if !last_price.is_finite() {
        return Err(BotError::processing(format!(
            "Last price is not a finite number ({})",
            last_price
        )));
    }

    let diff_pct = (last_price - ma_value) / ma_value * 100.0;

    let label = if last_price > ma_value * (1.0 + weak_threshold_pct / 100.0) {
        TrendLabel::Weak
    } else if last_price >= ma_value {
        TrendLabel::Moderate
    } else {
        TrendLabel::Strong
    };

    Ok(Classification { label, diff_pct })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars_from_closes(closes: &[Option<f64>]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar {
                t: start + Duration::days(i as i64),
                o: None,
                h: None,
                l: None,
                c: *c,
                v: None,
                n: None,
                vw: None,
            })
            .collect()
    }

    #[test]
    fn test_moving_average_uses_last_window_closes() {
        let bars = bars_from_closes(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        let ma = compute_moving_average(&bars, 3).unwrap();
        assert_eq!(ma.window, 3);
        assert!((ma.value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_short_history_uses_all_closes() {
        let bars = bars_from_closes(&[Some(10.0), Some(20.0)]);
        let ma = compute_moving_average(&bars, 960).unwrap();
        assert_eq!(ma.window, 2);
        assert!((ma.value - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_skips_bars_without_close() {
        let bars = bars_from_closes(&[Some(2.0), None, Some(4.0), None]);
        let ma = compute_moving_average(&bars, 2).unwrap();
        assert_eq!(ma.window, 2);
        assert!((ma.value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_rejects_empty_input() {
        let err = compute_moving_average(&[], 10).unwrap_err();
        assert!(err.to_string().contains("No bars available"));
    }

    #[test]
    fn test_moving_average_rejects_bars_without_any_close() {
        let bars = bars_from_closes(&[None, None]);
        assert!(compute_moving_average(&bars, 2).is_err());
    }

    #[test]
    fn test_classify_boundaries() {
        let t = DEFAULT_WEAK_THRESHOLD_PCT;
        assert_eq!(classify_trend(111.0, 100.0, t).unwrap().label, TrendLabel::Weak);
        // exactly 10% above is not "more than" 10%
        assert_eq!(classify_trend(110.0, 100.0, t).unwrap().label, TrendLabel::Moderate);
        assert_eq!(classify_trend(100.0, 100.0, t).unwrap().label, TrendLabel::Moderate);
        assert_eq!(classify_trend(99.99, 100.0, t).unwrap().label, TrendLabel::Strong);
    }

    #[test]
    fn test_classify_diff_pct() {
        let c = classify_trend(95.0, 100.0, DEFAULT_WEAK_THRESHOLD_PCT).unwrap();
        assert!((c.diff_pct - -5.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_custom_threshold() {
        let c = classify_trend(106.0, 100.0, 5.0).unwrap();
        assert_eq!(c.label, TrendLabel::Weak);
    }

    #[test]
    fn test_classify_rejects_zero_ma() {
        assert!(classify_trend(10.0, 0.0, DEFAULT_WEAK_THRESHOLD_PCT).is_err());
        assert!(classify_trend(f64::NAN, 10.0, DEFAULT_WEAK_THRESHOLD_PCT).is_err());
    }

    #[test]
    fn test_classify_rejects_nan_threshold() {
        let err = classify_trend(200.0, 100.0, f64::NAN).unwrap_err();
        assert!(matches!(err, BotError::ProcessingError { .. }));
    }
}
