//! Tunable parameter descriptors.
//!
//! Each strategy advertises its numeric parameter space through these
//! descriptors. They are consumed only by the external parameter-search
//! optimizer; the simulation core never reads them back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Description of one tunable numeric parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name as it appears in the strategy's config
    pub name: String,
    /// Inclusive lower bound
    pub min: Decimal,
    /// Inclusive upper bound
    pub max: Decimal,
    /// Search step
    pub step: Decimal,
}

impl ParameterDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, min: Decimal, max: Decimal, step: Decimal) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            step,
        }
    }
}
