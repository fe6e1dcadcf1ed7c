//! Least-squares linear regression over (key, rank) samples
//!
//! Every step runs in exact rational arithmetic. Keys can span the full range
//! of 64-bit (or wider) integers, and with `f64` the centered terms
//! `x - mean(x)` of nearly-equal large keys lose exactly the low bits that
//! order them, which wrecks the fitted slope.

use num::{BigInt, BigRational, Zero};

use crate::error::RegressionError;

/// Coefficients of `rank = slope * key + intercept`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearFit {
    pub intercept: BigRational,
    pub slope: BigRational,
    /// Key at which the line crosses zero (`-intercept / slope`), or zero
    /// for a flat line.
    pub zero_crossing: BigRational,
}

/// Arithmetic mean. An empty slice has mean zero.
pub fn mean(values: &[BigRational]) -> BigRational {
    if values.is_empty() {
        return BigRational::zero();
    }
    let sum = values
        .iter()
        .fold(BigRational::zero(), |acc, value| acc + value);
    sum / BigRational::from_integer(BigInt::from(values.len()))
}

/// Sum of `(x - mean_x) * (y - mean_y)` over paired samples (not divided by n).
pub fn covariance(
    x: &[BigRational],
    y: &[BigRational],
    mean_x: &BigRational,
    mean_y: &BigRational,
) -> BigRational {
    x.iter()
        .zip(y)
        .fold(BigRational::zero(), |acc, (xi, yi)| {
            acc + (xi - mean_x) * (yi - mean_y)
        })
}

/// Sum of squared deviations from `mean_value` (not divided by n).
pub fn variance(values: &[BigRational], mean_value: &BigRational) -> BigRational {
    values.iter().fold(BigRational::zero(), |acc, value| {
        let delta = value - mean_value;
        acc + &delta * &delta
    })
}

/// Fit `ranks ~ slope * keys + intercept` by ordinary least squares.
///
/// Fails when there are fewer than two samples or all keys are equal; the
/// caller is expected to substitute its own fallback model in that case.
pub fn fit(keys: &[BigRational], ranks: &[BigRational]) -> Result<LinearFit, RegressionError> {
    if keys.len() != ranks.len() {
        return Err(RegressionError::LengthMismatch {
            keys: keys.len(),
            ranks: ranks.len(),
        });
    }
    if keys.len() < 2 {
        return Err(RegressionError::TooFewSamples(keys.len()));
    }

    let mean_x = mean(keys);
    let mean_y = mean(ranks);

    let spread = variance(keys, &mean_x);
    if spread.is_zero() {
        return Err(RegressionError::ZeroVariance);
    }

    let slope = covariance(keys, ranks, &mean_x, &mean_y) / spread;
    let intercept = &mean_y - &mean_x * &slope;
    let zero_crossing = if slope.is_zero() {
        BigRational::zero()
    } else {
        -&intercept / &slope
    };

    Ok(LinearFit {
        intercept,
        slope,
        zero_crossing,
    })
}
