//! Classical multiplicative decomposition.
//!
//! `value = trend * seasonal * residual`. The trend is a centred moving
//! average (2×m for an even period m); seasonal factors are the per-phase
//! means of `value / trend`, rescaled to average 1. Points without a full
//! trend window at either edge are dropped.

use outage_core::{DecompositionPoint, DecompositionResult, Error, Result};

use crate::input::Observation;

/// Decompose `series` with seasonal `period`.
///
/// Needs at least two full periods and strictly positive values.
pub fn decompose(series: &[Observation], period: usize) -> Result<DecompositionResult> {
    if period < 2 {
        return Err(Error::analytics(format!("seasonal period must be at least 2, got {}", period)));
    }
    let required = 2 * period;
    if series.len() < required {
        return Err(Error::insufficient(required, series.len()));
    }
    if let Some((date, value)) = series.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
        return Err(Error::analytics(format!(
            "multiplicative decomposition needs positive values, got {} on {}",
            value, date
        )));
    }

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let trend = centered_moving_average(&values, period);

    // Per-phase mean of the detrended ratio, phase taken from the input index.
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, t) in trend.iter().enumerate() {
        if let Some(t) = t {
            sums[i % period] += values[i] / t;
            counts[i % period] += 1;
        }
    }
    let mut factors: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 1.0 })
        .collect();
    let mean = factors.iter().sum::<f64>() / period as f64;
    if !(mean.is_finite() && mean > 0.0) {
        return Err(Error::analytics("degenerate seasonal factors"));
    }
    for f in &mut factors {
        *f /= mean;
    }

    let points = series
        .iter()
        .zip(&trend)
        .enumerate()
        .filter_map(|(i, ((period_date, _), t))| {
            t.map(|trend| DecompositionPoint {
                period: *period_date,
                trend,
                seasonal: factors[i % period],
            })
        })
        .collect();

    Ok(DecompositionResult { points })
}

/// Centred moving average; `None` where the window runs off either edge.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let mut out = vec![None; n];
    if n <= 2 * half {
        return out;
    }

    for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
        let avg = if period % 2 == 0 {
            let inner: f64 = values[i + 1 - half..i + half].iter().sum();
            (0.5 * values[i - half] + inner + 0.5 * values[i + half]) / period as f64
        } else {
            values[i - half..=i + half].iter().sum::<f64>() / period as f64
        };
        *slot = Some(avg);
    }
    out
}
