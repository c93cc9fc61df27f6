use log::{debug, warn};
use thiserror::Error;

use crate::config::SuretyConfig;

/// Error type for configuration validation issues
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Incompatible settings: {0}")]
    IncompatibleSettings(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),
}

/// Result of configuration validation
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub is_valid: bool,

    pub errors: Vec<ConfigValidationError>,

    /// Valid but not recommended
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Return a summary of validation issues
    pub fn get_summary(&self) -> String {
        if self.is_valid && self.warnings.is_empty() {
            return "Configuration is valid with no warnings.".to_string();
        }

        let mut result = String::new();

        if !self.is_valid {
            result.push_str(&format!("Configuration has {} errors:\n", self.errors.len()));
            for (i, error) in self.errors.iter().enumerate() {
                result.push_str(&format!("  {}. {}\n", i + 1, error));
            }
        }

        if !self.warnings.is_empty() {
            result.push_str(&format!("Configuration has {} warnings:\n", self.warnings.len()));
            for (i, warning) in self.warnings.iter().enumerate() {
                result.push_str(&format!("  {}. {}\n", i + 1, warning));
            }
        }

        result
    }
}

/// Checks a `SuretyConfig` for values that would break fund safety or quorum rules.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        ConfigValidator
    }

    pub fn validate(&self, config: &SuretyConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        self.validate_amounts(config, &mut result);
        self.validate_payout(config, &mut result);
        self.validate_oracles(config, &mut result);

        if config.voting_threshold == 0 {
            result.add_error(ConfigValidationError::InvalidValue(
                "voting_threshold must be at least 1".to_string(),
            ));
        }

        if result.is_valid {
            debug!("Configuration validated with {} warnings", result.warnings.len());
        } else {
            warn!("Configuration rejected: {} errors", result.errors.len());
        }
        result
    }

    fn validate_amounts(&self, config: &SuretyConfig, result: &mut ValidationResult) {
        if config.min_airline_funding == 0 {
            result.add_error(ConfigValidationError::InvalidValue(
                "min_airline_funding must be greater than zero".to_string(),
            ));
        }
        if config.insurance_cap == 0 {
            result.add_error(ConfigValidationError::InvalidValue(
                "insurance_cap must be greater than zero".to_string(),
            ));
        }
        if config.oracle_registration_fee == 0 {
            result.add_error(ConfigValidationError::InvalidValue(
                "oracle_registration_fee must be greater than zero".to_string(),
            ));
        }
    }

    fn validate_payout(&self, config: &SuretyConfig, result: &mut ValidationResult) {
        if config.payout_denominator == 0 {
            result.add_error(ConfigValidationError::InvalidValue(
                "payout_denominator must be greater than zero".to_string(),
            ));
            return;
        }
        if config.payout_numerator < config.payout_denominator {
            result.add_error(ConfigValidationError::IncompatibleSettings(format!(
                "payout multiplier {}/{} would pay less than the premium",
                config.payout_numerator, config.payout_denominator
            )));
        }
        if config.insurance_cap.checked_mul(config.payout_numerator).is_none() {
            result.add_error(ConfigValidationError::ValueOutOfRange(
                "insurance_cap times payout_numerator overflows".to_string(),
            ));
        }
    }

    fn validate_oracles(&self, config: &SuretyConfig, result: &mut ValidationResult) {
        if config.oracle_index_space == 0 {
            result.add_error(ConfigValidationError::ValueOutOfRange(
                "oracle_index_space must be at least 1".to_string(),
            ));
        }
        if config.oracle_indices_per_oracle == 0
            || config.oracle_indices_per_oracle > config.oracle_index_space as usize
        {
            result.add_error(ConfigValidationError::ValueOutOfRange(format!(
                "oracle_indices_per_oracle must be within 1..={}",
                config.oracle_index_space
            )));
        }
        if config.oracle_min_responses == 0 {
            result.add_error(ConfigValidationError::InvalidValue(
                "oracle_min_responses must be at least 1".to_string(),
            ));
        } else if config.oracle_min_responses == 1 {
            result.add_warning(
                "oracle_min_responses = 1 lets a single oracle decide flight status".to_string(),
            );
        }
    }
}
