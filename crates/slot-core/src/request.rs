//! Client write requests as delivered by the transport.

use serde::{Deserialize, Serialize};

/// Write to a number property: `(field, value)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberRequest {
    /// Addressed device.
    pub device: String,
    /// Addressed property.
    pub property: String,
    /// Field values in the order received.
    pub values: Vec<(String, f64)>,
}

impl NumberRequest {
    /// Single-field request.
    pub fn new(
        device: impl Into<String>,
        property: impl Into<String>,
        field: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            device: device.into(),
            property: property.into(),
            values: vec![(field.into(), value)],
        }
    }
}

/// Write to a text property: `(field, text)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    /// Addressed device.
    pub device: String,
    /// Addressed property.
    pub property: String,
    /// Field texts in the order received.
    pub values: Vec<(String, String)>,
}

impl TextRequest {
    /// Request with the given pairs.
    pub fn new(
        device: impl Into<String>,
        property: impl Into<String>,
        values: Vec<(String, String)>,
    ) -> Self {
        Self {
            device: device.into(),
            property: property.into(),
            values,
        }
    }
}
