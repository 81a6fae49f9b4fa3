//! Body measurements for made-to-measure orders.
//!
//! All values are centimetres. Validation only checks that each number is
//! physically plausible; fit decisions are left to the tailor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by [`Measurements::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// The value is zero or negative.
    #[error("{field} must be greater than zero")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The value is outside the accepted range for that field.
    #[error("{field} must be between {min} and {max} cm")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Inclusive lower bound.
        min: u32,
        /// Inclusive upper bound.
        max: u32,
    },
}

/// A customer's body measurements in centimetres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    #[serde(with = "rust_decimal::serde::float")]
    pub chest: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub waist: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub hips: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shoulder: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sleeve: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub inseam: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub neck: Option<Decimal>,
}

/// Accepted `(field, min, max)` bounds, in centimetres.
const CHEST: (&str, u32, u32) = ("chest", 50, 200);
const WAIST: (&str, u32, u32) = ("waist", 40, 200);
const HIPS: (&str, u32, u32) = ("hips", 50, 200);
const SHOULDER: (&str, u32, u32) = ("shoulder", 30, 70);
const SLEEVE: (&str, u32, u32) = ("sleeve", 40, 100);
const INSEAM: (&str, u32, u32) = ("inseam", 50, 120);
const NECK: (&str, u32, u32) = ("neck", 25, 60);

impl Measurements {
    /// Check every measurement against its plausible range.
    ///
    /// Fields are checked in declaration order and the first failure is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError::NotPositive`] for zero or negative values
    /// and [`MeasurementError::OutOfRange`] for values outside the bounds.
    pub fn validate(&self) -> Result<(), MeasurementError> {
        check(self.chest, CHEST)?;
        check(self.waist, WAIST)?;
        check(self.hips, HIPS)?;
        check(self.shoulder, SHOULDER)?;
        check(self.sleeve, SLEEVE)?;
        check(self.inseam, INSEAM)?;
        if let Some(neck) = self.neck {
            check(neck, NECK)?;
        }
        Ok(())
    }
}

fn check(value: Decimal, (field, min, max): (&'static str, u32, u32)) -> Result<(), MeasurementError> {
    if value <= Decimal::ZERO {
        return Err(MeasurementError::NotPositive { field });
    }
    if value < Decimal::from(min) || value > Decimal::from(max) {
        return Err(MeasurementError::OutOfRange { field, min, max });
    }
    Ok(())
}
