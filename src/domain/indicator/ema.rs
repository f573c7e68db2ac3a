//! Exponential Moving Average.
//!
//! alpha = 2/(span+1). The first value seeds at the first observation and each
//! subsequent value is a plain blend: EMA[i] = x[i]*alpha + EMA[i-1]*(1-alpha).
//! No bias correction is applied, so every bar carries a value.

pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);

    for &x in &values[1..] {
        ema = x * alpha + ema * (1.0 - alpha);
        out.push(ema);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_first_observation() {
        let ema = calculate_ema(&[10.0, 20.0, 30.0], 3);
        assert!((ema[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_blend() {
        let ema = calculate_ema(&[10.0, 20.0, 30.0], 3);
        let alpha = 0.5;
        let e1 = 20.0 * alpha + 10.0 * (1.0 - alpha);
        let e2 = 30.0 * alpha + e1 * (1.0 - alpha);
        assert!((ema[1] - e1).abs() < f64::EPSILON);
        assert!((ema[2] - e2).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_span_1_tracks_input() {
        let ema = calculate_ema(&[3.0, 7.0, 1.0], 1);
        assert_eq!(ema, vec![3.0, 7.0, 1.0]);
    }

    #[test]
    fn ema_constant_input() {
        let ema = calculate_ema(&[100.0; 10], 12);
        assert!(ema.iter().all(|v| (v - 100.0).abs() < 1e-12));
    }

    #[test]
    fn ema_empty_or_zero_span() {
        assert!(calculate_ema(&[], 12).is_empty());
        assert!(calculate_ema(&[1.0, 2.0], 0).is_empty());
    }
}
