use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy applied when a quantile distribution has too few distinct edges to
/// form the requested number of buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningPolicy {
    /// Collapse to however many buckets the data supports.
    Lenient,
    /// Raise a `DataError::BinningCollapse` instead.
    Strict,
}

/// Tunables for the analytics pipelines and summarizers.
///
/// Deserializable from TOML so an embedding binary can override defaults per
/// deployment; every field has a production default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Order type excluded from every pipeline (delivery-only parcels carry
    /// no table/customer signal).
    pub excluded_order_type: String,
    /// Item-name terms removed before analysis, matched case-insensitively
    /// as whole words.
    pub banned_item_terms: Vec<String>,
    /// Co-occurrence matrix is restricted to this many globally most
    /// frequent items.
    pub top_n_items: usize,
    /// Percentile defining high-value customers and orders.
    pub high_value_percentile: f64,
    /// An hour is a peak hour when its order count reaches this fraction of
    /// total orders.
    pub peak_hours_threshold: f64,
    /// Requested quantile buckets for each of the R/F/M scores.
    pub rfm_bins: usize,
    pub binning_policy: BinningPolicy,
    /// Fixed k for customer clustering.
    pub cluster_count: usize,
    /// Fixed seed so cluster labels are reproducible across runs.
    pub cluster_seed: u64,
    /// Customers with tenure at or below this many days are "new".
    pub new_customer_tenure_days: i64,
    /// Non-new customers with recency above this many days are "dormant".
    pub dormant_recency_days: i64,
    /// Order count at which a customer counts as high-frequency.
    pub high_frequency_orders: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            excluded_order_type: "Delivery(Parcel)".to_string(),
            banned_item_terms: vec![
                "water".to_string(),
                "water bottle".to_string(),
                "1 ltr".to_string(),
                "cigarette".to_string(),
                "cigarettes".to_string(),
            ],
            top_n_items: 30,
            high_value_percentile: 0.8,
            peak_hours_threshold: 0.10,
            rfm_bins: 5,
            binning_policy: BinningPolicy::Lenient,
            cluster_count: 3,
            cluster_seed: 42,
            new_customer_tenure_days: 30,
            dormant_recency_days: 60,
            high_frequency_orders: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse analysis config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl AnalysisConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.high_value_percentile) {
            return Err(ConfigError::Validation(format!(
                "high_value_percentile must be in [0, 1), got {}",
                self.high_value_percentile
            )));
        }
        if !(0.0..=1.0).contains(&self.peak_hours_threshold) {
            return Err(ConfigError::Validation(format!(
                "peak_hours_threshold must be in [0, 1], got {}",
                self.peak_hours_threshold
            )));
        }
        if self.rfm_bins < 2 {
            return Err(ConfigError::Validation(format!(
                "rfm_bins must be at least 2, got {}",
                self.rfm_bins
            )));
        }
        if self.cluster_count == 0 {
            return Err(ConfigError::Validation("cluster_count must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisConfig, BinningPolicy, ConfigError};

    #[test]
    fn defaults_are_valid() {
        AnalysisConfig::default().validate().expect("default config validates");
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            top_n_items = 10
            binning_policy = "strict"
            "#,
        )
        .expect("parse config");

        assert_eq!(config.top_n_items, 10);
        assert_eq!(config.binning_policy, BinningPolicy::Strict);
        assert_eq!(config.cluster_count, 3);
    }

    #[test]
    fn out_of_range_percentile_is_rejected() {
        let err = AnalysisConfig::from_toml_str("high_value_percentile = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
