//! Made-to-measure order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::CustomOrderId;
use super::measurement::{MeasurementError, Measurements};

/// Maximum length of the free-form notes on a custom order.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Lifecycle of a custom order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomOrderStatus {
    #[default]
    Pending,
    InProduction,
    Shipped,
    Cancelled,
}

impl CustomOrderStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProduction => "in_production",
            Self::Shipped => "shipped",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_production" => Some(Self::InProduction),
            "shipped" => Some(Self::Shipped),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Body of `POST /api/custom-orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOrderRequest {
    pub product_id: String,
    pub measurements: Measurements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Reasons a [`CustomOrderRequest`] is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomOrderError {
    #[error("productId cannot be empty")]
    MissingProduct,
    #[error("notes must be at most 2000 characters")]
    NotesTooLong,
    #[error(transparent)]
    Measurement(#[from] MeasurementError),
}

impl CustomOrderRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns the first [`CustomOrderError`] found.
    pub fn validate(&self) -> Result<(), CustomOrderError> {
        if self.product_id.trim().is_empty() {
            return Err(CustomOrderError::MissingProduct);
        }
        if self
            .notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
        {
            return Err(CustomOrderError::NotesTooLong);
        }
        self.measurements.validate()?;
        Ok(())
    }
}

/// A stored custom order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOrder {
    pub id: CustomOrderId,
    pub product_id: String,
    pub measurements: Measurements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: CustomOrderStatus,
    pub created_at: DateTime<Utc>,
}
