//! Typed offer variants.
//!
//! Discount mechanics and eligibility rules are closed enums rather than
//! free-form maps, so rendering a human-readable description is an
//! exhaustive match and a new variant cannot be added without also deciding
//! how it reads.

use serde::{Deserialize, Serialize};

/// Which part of the menu a time-based offer applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliesTo {
    FoodOnly,
    BeveragesOnly,
    All,
}

impl AppliesTo {
    fn describe(self) -> &'static str {
        match self {
            AppliesTo::FoodOnly => "food items only",
            AppliesTo::BeveragesOnly => "beverages only",
            AppliesTo::All => "the full menu",
        }
    }
}

/// The discount mechanics of an offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountDetails {
    Percentage {
        discount_percentage: f64,
        max_discount_amount: Option<f64>,
        minimum_purchase_amount: Option<f64>,
    },
    FixedAmount {
        value: f64,
        minimum_purchase_amount: Option<f64>,
        max_discount_amount: Option<f64>,
    },
    Freebie {
        free_item_name: String,
        minimum_purchase_amount: Option<f64>,
        max_redemptions_item: Option<u32>,
    },
}

/// Who qualifies for an offer and under what conditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EligibilityCriteria {
    Standard,
    Winback {
        days_since_last_visit: u32,
        max_redemptions: Option<u32>,
    },
    TimeBased {
        valid_hours_start: u32,
        valid_hours_end: u32,
        valid_days: Vec<String>,
        applies_to: AppliesTo,
        max_redemptions: Option<u32>,
    },
    FirstVisit,
    StampCard {
        required_item: String,
        required_tier: Option<String>,
        threshold_count: u32,
        window_duration_days: u32,
    },
    VisitMilestone {
        visit_count_required: u32,
        max_redemptions: Option<u32>,
    },
}

/// One candidate offer: a discount plus who can redeem it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfferVariant {
    pub discount: DiscountDetails,
    pub eligibility: EligibilityCriteria,
}

/// An offer variant chosen for a campaign, with its display copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedOfferVariant {
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub variant: OfferVariant,
}

impl SelectedOfferVariant {
    /// Short rendering of the discount, e.g. "15% off (up to 100)".
    pub fn discount_text(&self) -> String {
        match &self.variant.discount {
            DiscountDetails::Percentage {
                discount_percentage,
                max_discount_amount,
                minimum_purchase_amount,
            } => {
                let mut text = format!("{discount_percentage}% off");
                if let Some(cap) = max_discount_amount {
                    text.push_str(&format!(" (up to {cap})"));
                }
                if let Some(minimum) = minimum_purchase_amount {
                    text.push_str(&format!(" on orders above {minimum}"));
                }
                text
            }
            DiscountDetails::FixedAmount { value, minimum_purchase_amount, .. } => {
                let mut text = format!("{value} off");
                if let Some(minimum) = minimum_purchase_amount {
                    text.push_str(&format!(" on orders above {minimum}"));
                }
                text
            }
            DiscountDetails::Freebie { free_item_name, minimum_purchase_amount, .. } => {
                let mut text = format!("Free {free_item_name}");
                if let Some(minimum) = minimum_purchase_amount {
                    text.push_str(&format!(" on orders above {minimum}"));
                }
                text
            }
        }
    }

    /// Short rendering of the eligibility rule.
    pub fn eligibility_text(&self) -> String {
        match &self.variant.eligibility {
            EligibilityCriteria::Standard => "All customers".to_string(),
            EligibilityCriteria::Winback { days_since_last_visit, .. } => {
                format!("Customers inactive for {days_since_last_visit}+ days")
            }
            EligibilityCriteria::TimeBased {
                valid_hours_start,
                valid_hours_end,
                valid_days,
                applies_to,
                ..
            } => {
                let days = if valid_days.is_empty() {
                    "every day".to_string()
                } else {
                    valid_days.join(", ")
                };
                format!(
                    "Valid {valid_hours_start}:00-{valid_hours_end}:00 on {days}, {}",
                    applies_to.describe()
                )
            }
            EligibilityCriteria::FirstVisit => "First-time customers".to_string(),
            EligibilityCriteria::StampCard {
                required_item,
                threshold_count,
                window_duration_days,
                ..
            } => format!(
                "Buy {required_item} {threshold_count} times within {window_duration_days} days"
            ),
            EligibilityCriteria::VisitMilestone { visit_count_required, .. } => {
                format!("Customers on their visit number {visit_count_required}")
            }
        }
    }
}
