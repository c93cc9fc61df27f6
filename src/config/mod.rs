// Configuration module for the flight insurance core
// Every economic and quorum constant lives here rather than in the components.

pub mod validation;

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{SuretyError, SuretyResult};
use crate::primitives::{Amount, UNIT};

pub use validation::{ConfigValidationError, ConfigValidator, ValidationResult};

pub const DEFAULT_MIN_AIRLINE_FUNDING: Amount = 10 * UNIT;
pub const DEFAULT_INSURANCE_CAP: Amount = UNIT;
pub const DEFAULT_PAYOUT_NUMERATOR: u64 = 3;
pub const DEFAULT_PAYOUT_DENOMINATOR: u64 = 2;
pub const DEFAULT_VOTING_THRESHOLD: usize = 4;
pub const DEFAULT_ORACLE_REGISTRATION_FEE: Amount = UNIT;
pub const DEFAULT_ORACLE_INDEX_SPACE: u8 = 10;
pub const DEFAULT_ORACLE_INDICES_PER_ORACLE: usize = 3;
pub const DEFAULT_ORACLE_MIN_RESPONSES: usize = 3;

/// Tunable constants of the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuretyConfig {
    /// Minimum contribution before an airline may sponsor, vote or register flights
    pub min_airline_funding: Amount,

    /// Maximum premium per (flight, passenger) policy
    pub insurance_cap: Amount,

    /// Payout multiplier applied to the premium, as a fraction
    pub payout_numerator: u64,
    pub payout_denominator: u64,

    /// Registered-airline count from which admissions need a majority vote
    pub voting_threshold: usize,

    /// Fee an oracle pays to receive its indices
    pub oracle_registration_fee: Amount,

    /// Oracle indices are drawn from `0..oracle_index_space`
    pub oracle_index_space: u8,

    pub oracle_indices_per_oracle: usize,

    /// Agreeing responses needed to resolve a status request
    pub oracle_min_responses: usize,
}

impl Default for SuretyConfig {
    fn default() -> Self {
        SuretyConfig {
            min_airline_funding: DEFAULT_MIN_AIRLINE_FUNDING,
            insurance_cap: DEFAULT_INSURANCE_CAP,
            payout_numerator: DEFAULT_PAYOUT_NUMERATOR,
            payout_denominator: DEFAULT_PAYOUT_DENOMINATOR,
            voting_threshold: DEFAULT_VOTING_THRESHOLD,
            oracle_registration_fee: DEFAULT_ORACLE_REGISTRATION_FEE,
            oracle_index_space: DEFAULT_ORACLE_INDEX_SPACE,
            oracle_indices_per_oracle: DEFAULT_ORACLE_INDICES_PER_ORACLE,
            oracle_min_responses: DEFAULT_ORACLE_MIN_RESPONSES,
        }
    }
}

impl SuretyConfig {
    pub fn from_toml_str(text: &str) -> SuretyResult<Self> {
        toml::from_str(text).map_err(|e| SuretyError::Config(e.to_string()))
    }

    /// Load a TOML file. Missing keys fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> SuretyResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SuretyResult<String> {
        toml::to_string_pretty(self).map_err(|e| SuretyError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ValidationResult {
        ConfigValidator::new().validate(self)
    }

    /// Validate and turn the first error into a `SuretyError::Config`.
    pub fn ensure_valid(&self) -> SuretyResult<()> {
        let result = self.validate();
        match result.errors.into_iter().next() {
            Some(err) => Err(SuretyError::Config(err.to_string())),
            None => Ok(()),
        }
    }
}
