use crate::error::{BillError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rates and limits applied to every bill in a run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BillingConfig {
    #[schemars(description = "Tender premium applied to the bill total and to extra items, as a fraction")]
    pub premium_rate: f64,

    pub deductions: DeductionRates,

    #[schemars(description = "Approval-jurisdiction boundary quoted in the note sheet, in percent")]
    pub approval_threshold_percent: f64,

    pub certificate: CertificateDetails,

    pub limits: BatchLimits,
}

/// Statutory deductions, each a fraction of the grand total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeductionRates {
    pub security_deposit: f64,
    pub income_tax: f64,
    pub gst: f64,
    pub labour_cess: f64,
}

/// Names printed on the certificates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CertificateDetails {
    pub measurement_officer: String,
    pub measurement_book_no: String,
    pub measurement_book_page: String,
    pub officer_name: String,
    pub officer_designation: String,
    pub authorising_officer_name: String,
    pub authorising_officer_designation: String,
}

/// Admission-control gates checked before a batch starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BatchLimits {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            premium_rate: 0.04,
            deductions: DeductionRates::default(),
            approval_threshold_percent: 5.0,
            certificate: CertificateDetails::default(),
            limits: BatchLimits::default(),
        }
    }
}

impl Default for DeductionRates {
    fn default() -> Self {
        Self {
            security_deposit: 0.10,
            income_tax: 0.02,
            gst: 0.02,
            labour_cess: 0.01,
        }
    }
}

impl Default for CertificateDetails {
    fn default() -> Self {
        Self {
            measurement_officer: "JEN AC".to_string(),
            measurement_book_no: "887".to_string(),
            measurement_book_page: "04-20".to_string(),
            officer_name: "Premlata Jain".to_string(),
            officer_designation: "AAO - As Auditor".to_string(),
            authorising_officer_name: "Executive Engineer".to_string(),
            authorising_officer_designation: "PWD Udaipur".to_string(),
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_bytes: 50 * 1024 * 1024,
        }
    }
}

impl BillingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BillingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Applies `BILL_PREMIUM_RATE`, `BILL_MAX_FILES` and `BILL_MAX_FILE_BYTES`
    /// when they are set and parse; anything else is left as is.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(rate) = env_parse::<f64>("BILL_PREMIUM_RATE") {
            self.premium_rate = rate;
        }
        if let Some(max_files) = env_parse::<usize>("BILL_MAX_FILES") {
            self.limits.max_files = max_files;
        }
        if let Some(max_bytes) = env_parse::<u64>("BILL_MAX_FILE_BYTES") {
            self.limits.max_file_bytes = max_bytes;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_rate("premium_rate", self.premium_rate)?;
        validate_rate("deductions.security_deposit", self.deductions.security_deposit)?;
        validate_rate("deductions.income_tax", self.deductions.income_tax)?;
        validate_rate("deductions.gst", self.deductions.gst)?;
        validate_rate("deductions.labour_cess", self.deductions.labour_cess)?;

        if !self.approval_threshold_percent.is_finite() || self.approval_threshold_percent < 0.0 {
            return Err(BillError::InvalidConfig(format!(
                "approval_threshold_percent must be a non-negative number, got {}",
                self.approval_threshold_percent
            )));
        }
        if self.limits.max_files == 0 {
            return Err(BillError::InvalidConfig(
                "limits.max_files must be at least 1".to_string(),
            ));
        }
        if self.limits.max_file_bytes == 0 {
            return Err(BillError::InvalidConfig(
                "limits.max_file_bytes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_rate(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(BillError::InvalidRate {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BillingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.premium_rate, 0.04);
        assert_eq!(config.deductions.security_deposit, 0.10);
        assert_eq!(config.limits.max_files, 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BillingConfig::from_json_str(r#"{"premium_rate": 0.05}"#).unwrap();
        assert_eq!(config.premium_rate, 0.05);
        assert_eq!(config.deductions.gst, 0.02);
        assert_eq!(config.certificate.measurement_book_no, "887");
    }

    #[test]
    fn test_rate_out_of_range_is_rejected() {
        let err = BillingConfig::from_json_str(r#"{"deductions": {"gst": 2.0}}"#).unwrap_err();
        match err {
            BillError::InvalidRate { name, value } => {
                assert_eq!(name, "deductions.gst");
                assert_eq!(value, 2.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = BillingConfig::default();
        config.limits.max_files = 0;
        assert!(matches!(
            config.validate(),
            Err(BillError::InvalidConfig(_))
        ));
    }
}
