//! Forecast payloads and splitting generated output into offers + forecast.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Performance forecast attached to a generated offer batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub target: i64,
    pub budget: i64,
    pub predicted_redemptions: i64,
    pub roi: String,
}

impl Default for Forecast {
    fn default() -> Self {
        Self { target: 0, budget: 0, predicted_redemptions: 0, roi: "0x".to_string() }
    }
}

/// Result of separating a generated payload into offers and forecast.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitOutcome {
    /// The payload with any `forecast` key removed.
    pub offers: Value,
    /// The extracted forecast, or the zero default.
    pub forecast: Value,
    /// True when the payload carried no usable forecast.
    pub forecast_missing: bool,
}

/// Pulls the `forecast` key out of a generated payload.
///
/// A missing, null, or empty-object forecast is replaced by the zero
/// default so downstream consumers always see the full forecast shape, and
/// the outcome is flagged so callers can log the gap.
pub fn split_forecast(mut payload: Value) -> SplitOutcome {
    let extracted = payload.as_object_mut().and_then(|map| map.remove("forecast"));

    let forecast_missing = match &extracted {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    };

    let forecast = if forecast_missing {
        serde_json::to_value(Forecast::default()).unwrap_or(Value::Null)
    } else {
        extracted.unwrap_or(Value::Null)
    };

    SplitOutcome { offers: payload, forecast, forecast_missing }
}
