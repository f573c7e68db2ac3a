//! Rolling-window primitives shared by the indicators.
//!
//! A window value is computed from the non-missing observations it contains
//! and is missing when fewer than `min_periods` observations are present.

/// Rolling arithmetic mean.
pub fn rolling_mean(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, min_periods, |obs| {
        Some(obs.iter().sum::<f64>() / obs.len() as f64)
    })
}

/// Rolling sum.
pub fn rolling_sum(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, min_periods, |obs| Some(obs.iter().sum()))
}

/// Rolling sample standard deviation (divides by N-1). Needs at least two
/// observations in the window.
pub fn rolling_std(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, min_periods, |obs| {
        if obs.len() < 2 {
            return None;
        }
        let n = obs.len() as f64;
        let mean = obs.iter().sum::<f64>() / n;
        let variance = obs.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    })
}

/// One-step fractional change: x[i] / x[i-1] - 1. The first element is missing.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 || values[i - 1] == 0.0 {
            out.push(None);
        } else {
            out.push(Some(values[i] / values[i - 1] - 1.0));
        }
    }
    out
}

/// One-step difference: x[i] - x[i-1]. The first element is missing.
pub fn diff(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 {
            out.push(None);
        } else {
            out.push(Some(values[i] - values[i - 1]));
        }
    }
    out
}

pub fn present(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

fn rolling_apply<F>(values: &[Option<f64>], window: usize, min_periods: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    let min_periods = min_periods.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut obs: Vec<f64> = Vec::with_capacity(window);

    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        obs.clear();
        obs.extend(values[start..=i].iter().flatten());
        if obs.len() < min_periods {
            out.push(None);
        } else {
            out.push(f(&obs));
        }
    }
    out
}
