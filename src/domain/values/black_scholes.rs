//! Black-Scholes delta estimation.
//!
//! Used to pick a starting strike before the empirical search. Only delta
//! is needed:
//! - `d1 = (ln(S/K) + (r + σ²/2)·T) / (σ·√T)`
//! - call delta = `Φ(d1)`
//! - put delta = `−Φ(−d1)`
//!
//! where `Φ` is the standard normal CDF. Inputs that would make `d1`
//! undefined (non-positive `T`, `σ`, `S` or `K`) are rejected instead of
//! producing NaN.

use chrono::Duration;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::domain::error::DomainError;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;

pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Model inputs that are not observed per contract.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PricingInputs {
    /// Annualized volatility. Default: 0.2.
    pub volatility: f64,
    /// Annualized risk-free rate. Default: 0.05.
    pub risk_free_rate: f64,
}

impl Default for PricingInputs {
    fn default() -> Self {
        Self {
            volatility: 0.2,
            risk_free_rate: 0.05,
        }
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DomainError::InvalidParameter(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

/// Black-Scholes delta in `[-1, 1]`.
pub fn estimate_delta(
    spot: f64,
    strike: f64,
    time_to_expiry_years: f64,
    risk_free_rate: f64,
    volatility: f64,
    right: Right,
) -> Result<f64, DomainError> {
    require_positive("spot", spot)?;
    require_positive("strike", strike)?;
    require_positive("time to expiry", time_to_expiry_years)?;
    require_positive("volatility", volatility)?;
    if !risk_free_rate.is_finite() {
        return Err(DomainError::InvalidParameter(format!(
            "risk-free rate must be finite, got {risk_free_rate}"
        )));
    }

    let d1 = ((spot / strike).ln() + (risk_free_rate + 0.5 * volatility.powi(2)) * time_to_expiry_years)
        / (volatility * time_to_expiry_years.sqrt());
    let normal = Normal::new(0.0, 1.0).map_err(|e| DomainError::InvalidParameter(e.to_string()))?;

    Ok(match right {
        Right::Call => normal.cdf(d1),
        Right::Put => -normal.cdf(-d1),
    })
}

pub fn years(time_to_expiry: Duration) -> f64 {
    time_to_expiry.num_seconds() as f64 / SECONDS_PER_YEAR
}

/// Index of the candidate whose model delta magnitude is closest to
/// `|target_delta|`. Ties keep the first candidate.
pub fn closest_strike_index(
    spot: f64,
    time_to_expiry: Duration,
    right: Right,
    target_delta: f64,
    candidates: &[Strike],
    inputs: &PricingInputs,
) -> Result<usize, DomainError> {
    if candidates.is_empty() {
        return Err(DomainError::InvalidParameter("no candidate strikes".into()));
    }
    let t = years(time_to_expiry);
    let target = target_delta.abs();

    let mut best_index = 0;
    let mut best_diff = f64::INFINITY;
    for (i, strike) in candidates.iter().enumerate() {
        let delta = estimate_delta(spot, strike.price(), t, inputs.risk_free_rate, inputs.volatility, right)?;
        let diff = (delta.abs() - target).abs();
        if diff < best_diff {
            best_diff = diff;
            best_index = i;
        }
    }
    Ok(best_index)
}

/// Strike whose model delta is closest to the target, sign-insensitive.
pub fn find_closest_strike(
    spot: f64,
    time_to_expiry: Duration,
    right: Right,
    target_delta: f64,
    candidates: &[Strike],
    inputs: &PricingInputs,
) -> Result<Strike, DomainError> {
    let index = closest_strike_index(spot, time_to_expiry, right, target_delta, candidates, inputs)?;
    Ok(candidates[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strikes(prices: &[f64]) -> Vec<Strike> {
        prices.iter().map(|p| Strike::from_price(*p)).collect()
    }

    #[test]
    fn test_atm_call_delta_near_half() {
        let d = estimate_delta(100.0, 100.0, 30.0 / 365.0, 0.05, 0.2, Right::Call).unwrap();
        assert!(d > 0.5 && d < 0.6, "ATM call delta was {d}");
    }

    #[test]
    fn test_put_call_parity_of_delta() {
        let t = 45.0 / 365.0;
        let call = estimate_delta(100.0, 95.0, t, 0.05, 0.25, Right::Call).unwrap();
        let put = estimate_delta(100.0, 95.0, t, 0.05, 0.25, Right::Put).unwrap();
        assert!(put < 0.0);
        assert!((call - put - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        assert!(matches!(
            estimate_delta(100.0, 100.0, 0.0, 0.05, 0.2, Right::Call),
            Err(DomainError::InvalidParameter(_))
        ));
        assert!(matches!(
            estimate_delta(100.0, 100.0, 0.1, 0.05, 0.0, Right::Call),
            Err(DomainError::InvalidParameter(_))
        ));
        assert!(matches!(
            estimate_delta(100.0, 100.0, -0.1, 0.05, 0.2, Right::Put),
            Err(DomainError::InvalidParameter(_))
        ));
        assert!(matches!(
            estimate_delta(f64::NAN, 100.0, 0.1, 0.05, 0.2, Right::Put),
            Err(DomainError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_closest_strike_atm_example() {
        let candidates = strikes(&[95.0, 100.0, 105.0]);
        let found = find_closest_strike(
            100.0,
            Duration::days(30),
            Right::Call,
            0.5,
            &candidates,
            &PricingInputs::default(),
        )
        .unwrap();
        assert_eq!(found.thousandths(), 100_000);
    }

    #[test]
    fn test_target_sign_is_ignored() {
        let candidates = strikes(&[80.0, 85.0, 90.0, 95.0, 100.0, 105.0, 110.0]);
        let inputs = PricingInputs::default();
        let a = find_closest_strike(100.0, Duration::days(30), Right::Put, 0.25, &candidates, &inputs).unwrap();
        let b = find_closest_strike(100.0, Duration::days(30), Right::Put, -0.25, &candidates, &inputs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_call_and_put_on_opposite_sides() {
        let candidates = strikes(&[80.0, 85.0, 90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0]);
        let inputs = PricingInputs::default();
        let call = find_closest_strike(100.0, Duration::days(30), Right::Call, 0.2, &candidates, &inputs).unwrap();
        let put = find_closest_strike(100.0, Duration::days(30), Right::Put, 0.2, &candidates, &inputs).unwrap();
        assert!(call.price() > 100.0, "0.2 call should be OTM above spot, got {call}");
        assert!(put.price() < 100.0, "0.2 put should be OTM below spot, got {put}");
    }

    #[test]
    fn test_deterministic_and_first_minimum_wins() {
        let candidates = strikes(&[100.0, 100.0, 105.0]);
        let inputs = PricingInputs::default();
        let first = closest_strike_index(100.0, Duration::days(30), Right::Call, 0.5, &candidates, &inputs).unwrap();
        let second = closest_strike_index(100.0, Duration::days(30), Right::Call, 0.5, &candidates, &inputs).unwrap();
        assert_eq!(first, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let result = find_closest_strike(100.0, Duration::days(30), Right::Call, 0.5, &[], &PricingInputs::default());
        assert!(matches!(result, Err(DomainError::InvalidParameter(_))));
    }
}
