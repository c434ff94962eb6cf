//! One-step-ahead forecast of `percent_outage`.
//!
//! Features are the rolling means of `outage` and `percent_outage`; the
//! target is the day's `percent_outage`. A fresh OLS fit with intercept is
//! made over the whole history on every call.

use chrono::Duration;
use nalgebra::{DMatrix, DVector};
use outage_core::{Error, ForecastOutcome, ForecastResult, HistoryPoint, Result};

use crate::input::ForecastRow;

/// Singular values below this are treated as zero (minimum-norm solution).
const SINGULAR_EPS: f64 = 1e-9;

fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Fit `y = b0 + b·x` by least squares on centred data and return
/// `(intercept, coefficients)`.
///
/// Centring keeps the intercept out of the SVD, so a rank-deficient design
/// (for example constant features) still yields the mean of `y`.
fn fit_ols(features: &DMatrix<f64>, target: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
    let n = features.nrows() as f64;
    let x_mean: Vec<f64> = features.column_iter().map(|c| c.sum() / n).collect();
    let y_mean = target.sum() / n;

    let centred = DMatrix::from_fn(features.nrows(), features.ncols(), |r, c| {
        features[(r, c)] - x_mean[c]
    });
    let y = target.map(|v| v - y_mean);

    let beta = centred
        .svd(true, true)
        .solve(&y, SINGULAR_EPS)
        .map_err(|e| Error::analytics(format!("least squares failed: {}", e)))?;

    let intercept = y_mean - x_mean.iter().zip(beta.iter()).map(|(m, b)| m * b).sum::<f64>();
    Ok((intercept, beta))
}

/// Forecast the day after the last row.
///
/// Fewer than `window` rows is a normal outcome, not an error.
pub fn forecast_next(rows: &[ForecastRow], window: usize) -> Result<ForecastOutcome> {
    let window = window.max(1);
    if rows.len() < window {
        return Ok(ForecastOutcome::InsufficientData {
            required: window,
            actual: rows.len(),
        });
    }

    let outage: Vec<f64> = rows.iter().map(|r| r.outage).collect();
    let percent: Vec<f64> = rows.iter().map(|r| r.percent_outage).collect();
    let outage_roll = rolling_mean(&outage, window);
    let percent_roll = rolling_mean(&percent, window);
    let m = outage_roll.len();

    let features = DMatrix::from_fn(m, 2, |r, c| if c == 0 { outage_roll[r] } else { percent_roll[r] });
    let target = DVector::from_iterator(m, percent[window - 1..].iter().copied());

    let (intercept, beta) = fit_ols(&features, &target)?;
    let predicted = intercept + beta[0] * outage_roll[m - 1] + beta[1] * percent_roll[m - 1];
    if !predicted.is_finite() {
        return Err(Error::analytics("forecast is not finite"));
    }

    let last = rows[rows.len() - 1].period;
    Ok(ForecastOutcome::Ready(ForecastResult {
        predicted_date: last + Duration::days(1),
        predicted_percent_outage: predicted,
        history: rows
            .iter()
            .map(|r| HistoryPoint {
                date: r.period,
                percent_outage: r.percent_outage,
            })
            .collect(),
    }))
}
