use serde::Serialize;

use crate::constants::RATIO_NUMERATOR;
use crate::error::{AppError, Result};

/// Ideal square sized for one ratio candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SquareDimensions {
    pub perimeter_m: f64,
    pub side_length_m: f64,
}

/// Size the ideal square for a target route length.
///
/// The ratio encodes "route length : square perimeter = 10 : r", so
/// `perimeter = r / 10 * target` and `side = perimeter / 4`.
pub fn square_dimensions(target_length_m: f64, ratio_denominator: f64) -> Result<SquareDimensions> {
    if !target_length_m.is_finite() || target_length_m <= 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "Target route length must be positive, got {}",
            target_length_m
        )));
    }
    if !ratio_denominator.is_finite() || ratio_denominator <= 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "Ratio denominator must be positive, got {}",
            ratio_denominator
        )));
    }

    let perimeter_m = (ratio_denominator / RATIO_NUMERATOR) * target_length_m;
    Ok(SquareDimensions {
        perimeter_m,
        side_length_m: perimeter_m / 4.0,
    })
}
