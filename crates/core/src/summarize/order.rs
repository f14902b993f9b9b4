//! Order-pattern summarization: value/basket distributions, temporal
//! patterns, co-occurrence strength, and derived merchandising insights.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::order::{CoOccurrenceMatrix, InvoiceAggregateRow};
use crate::analysis::stats::{self, Describe};
use crate::config::AnalysisConfig;
use crate::errors::DataError;

/// Strongest pairs reported from the matrix.
const TOP_PAIRS: usize = 15;
/// Pairs turned into bundle suggestions.
const BUNDLE_PAIRS: usize = 5;
/// Pairs turned into cross-sell suggestions.
const CROSS_SELL_PAIRS: usize = 8;
/// Days reported as peak days.
const PEAK_DAYS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub analysis_timestamp: String,
    pub analysis_config: OrderConfigEcho,
    pub invoice_analysis: InvoiceAnalysis,
    pub cooccurrence_analysis: CooccurrenceAnalysis,
    pub business_insights: BusinessInsights,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderConfigEcho {
    pub peak_hours_threshold: f64,
    pub high_value_percentile: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAnalysis {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub total_items_sold: i64,
    pub average_order_value: f64,
    pub average_items_per_order: f64,
    pub order_value_distribution: Describe,
    pub high_value_orders: HighValueOrders,
    pub basket_size_analysis: BasketSizeAnalysis,
    pub temporal_patterns: TemporalPatterns,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighValueOrders {
    pub count: u64,
    pub percentage: f64,
    pub threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasketSizeAnalysis {
    pub avg_unique_items: f64,
    pub min_items: i64,
    pub max_items: i64,
    pub most_common_basket_size: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalPatterns {
    pub day_of_week_distribution: BTreeMap<String, u64>,
    pub peak_days: Vec<String>,
    pub hour_analysis: HourAnalysis,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourAnalysis {
    pub peak_hours: Vec<u32>,
    pub hourly_distribution: BTreeMap<u32, u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CooccurrenceAnalysis {
    pub analysis_scope: String,
    pub items_in_matrix: u64,
    pub strongest_cooccurrences: Vec<CoOccurrencePair>,
    pub matrix_summary: MatrixSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrencePair {
    pub item_1: String,
    pub item_2: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixSummary {
    pub total_possible_pairs: u64,
    pub pairs_with_cooccurrence: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessInsights {
    pub bundle_opportunities: Vec<BundleOpportunity>,
    pub cross_sell_recommendations: Vec<CrossSellRecommendation>,
    pub inventory_insights: Vec<InventoryInsight>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleOpportunity {
    pub bundle_items: Vec<String>,
    pub statistical_strength: String,
    pub frequency: String,
    pub recommendation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossSellRecommendation {
    pub trigger_item: String,
    pub suggest_item: String,
    pub frequency: String,
    pub strategy: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryInsight {
    pub insight_type: String,
    pub description: String,
    pub action: String,
}

pub struct OrderSummarizer {
    config: AnalysisConfig,
}

impl OrderSummarizer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Builds the full order summary document.
    ///
    /// Errors with [`DataError::EmptyDataset`] when there are no invoices;
    /// the distribution statistics are meaningless on an empty table.
    pub fn summarize(
        &self,
        invoices: &[InvoiceAggregateRow],
        matrix: &CoOccurrenceMatrix,
    ) -> Result<OrderSummary, DataError> {
        if invoices.is_empty() {
            return Err(DataError::EmptyDataset { stage: "order summarization" });
        }

        let invoice_analysis = self.analyze_order_patterns(invoices);
        let cooccurrence_analysis = self.analyze_cooccurrence_patterns(matrix);
        let business_insights = self
            .generate_business_insights(&cooccurrence_analysis.strongest_cooccurrences, &invoice_analysis);

        Ok(OrderSummary {
            analysis_timestamp: Utc::now().to_rfc3339(),
            analysis_config: OrderConfigEcho {
                peak_hours_threshold: self.config.peak_hours_threshold,
                high_value_percentile: self.config.high_value_percentile,
            },
            invoice_analysis,
            cooccurrence_analysis,
            business_insights,
        })
    }

    fn analyze_order_patterns(&self, invoices: &[InvoiceAggregateRow]) -> InvoiceAnalysis {
        let total_orders = invoices.len() as u64;
        let values: Vec<f64> = invoices.iter().map(|row| row.net_invoice_value).collect();
        let total_revenue: f64 = values.iter().sum();
        let total_items_sold: f64 = invoices.iter().map(|row| row.total_quantity).sum();

        let threshold = stats::quantile(&values, self.config.high_value_percentile);
        let high_value_count = values.iter().filter(|&&value| value >= threshold).count() as u64;

        let baskets: Vec<f64> = invoices.iter().map(|row| row.basket_size as f64).collect();
        let basket_stats = stats::describe(&baskets);

        InvoiceAnalysis {
            total_orders,
            total_revenue: stats::round2(total_revenue),
            total_items_sold: total_items_sold as i64,
            average_order_value: stats::round2(total_revenue / total_orders as f64),
            average_items_per_order: stats::round2(total_items_sold / total_orders as f64),
            order_value_distribution: stats::describe(&values),
            high_value_orders: HighValueOrders {
                count: high_value_count,
                percentage: stats::round2(high_value_count as f64 / total_orders as f64 * 100.0),
                threshold: stats::round2(threshold),
            },
            basket_size_analysis: BasketSizeAnalysis {
                avg_unique_items: basket_stats.mean,
                min_items: basket_stats.min as i64,
                max_items: basket_stats.max as i64,
                most_common_basket_size: basket_stats.q50 as i64,
            },
            temporal_patterns: self.analyze_temporal_patterns(invoices),
        }
    }

    fn analyze_temporal_patterns(&self, invoices: &[InvoiceAggregateRow]) -> TemporalPatterns {
        let mut day_distribution: BTreeMap<String, u64> = BTreeMap::new();
        let mut hourly_distribution: BTreeMap<u32, u64> = BTreeMap::new();
        for invoice in invoices {
            *day_distribution.entry(invoice.order_day.clone()).or_insert(0) += 1;
            *hourly_distribution.entry(invoice.order_hour).or_insert(0) += 1;
        }

        let mut ranked_days: Vec<(&String, &u64)> = day_distribution.iter().collect();
        ranked_days.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let peak_days: Vec<String> =
            ranked_days.into_iter().take(PEAK_DAYS).map(|(day, _)| day.clone()).collect();

        let minimum = invoices.len() as f64 * self.config.peak_hours_threshold;
        let peak_hours: Vec<u32> = hourly_distribution
            .iter()
            .filter(|(_, &count)| count as f64 >= minimum)
            .map(|(&hour, _)| hour)
            .collect();

        TemporalPatterns {
            day_of_week_distribution: day_distribution,
            peak_days,
            hour_analysis: HourAnalysis { peak_hours, hourly_distribution },
        }
    }

    fn analyze_cooccurrence_patterns(&self, matrix: &CoOccurrenceMatrix) -> CooccurrenceAnalysis {
        let strongest = extract_strongest_pairs(matrix);
        let item_count = matrix.len() as u64;
        CooccurrenceAnalysis {
            analysis_scope: format!("Top {} most popular items", self.config.top_n_items),
            items_in_matrix: item_count,
            matrix_summary: MatrixSummary {
                total_possible_pairs: item_count * item_count.saturating_sub(1) / 2,
                pairs_with_cooccurrence: strongest.len() as u64,
            },
            strongest_cooccurrences: strongest,
        }
    }

    fn generate_business_insights(
        &self,
        pairs: &[CoOccurrencePair],
        invoice_analysis: &InvoiceAnalysis,
    ) -> BusinessInsights {
        let bundle_opportunities = pairs
            .iter()
            .take(BUNDLE_PAIRS)
            .map(|pair| BundleOpportunity {
                bundle_items: vec![pair.item_1.clone(), pair.item_2.clone()],
                statistical_strength: format!("Co-occurrence: {} times", pair.count),
                frequency: format!("Appears together in {} orders", pair.count),
                recommendation: "Strong candidate for bundle pricing or combo offers".to_string(),
            })
            .collect();

        let cross_sell_recommendations = pairs
            .iter()
            .take(CROSS_SELL_PAIRS)
            .map(|pair| CrossSellRecommendation {
                trigger_item: pair.item_1.clone(),
                suggest_item: pair.item_2.clone(),
                frequency: format!("Bought together {} times", pair.count),
                strategy: "Suggest as add-on during ordering".to_string(),
            })
            .collect();

        let mut inventory_insights = vec![
            InventoryInsight {
                insight_type: "high_value_correlation".to_string(),
                description: format!(
                    "Orders above {:.2} represent high-value customers",
                    invoice_analysis.high_value_orders.threshold
                ),
                action: "Ensure availability of items that appear in high-value orders"
                    .to_string(),
            },
            InventoryInsight {
                insight_type: "basket_optimization".to_string(),
                description: format!(
                    "Average order value is {:.2}",
                    invoice_analysis.average_order_value
                ),
                action:
                    "Focus on items that appear in the strongest co-occurrence pairs to drive basket size"
                        .to_string(),
            },
        ];

        if let Some(top_pair) = pairs.first() {
            inventory_insights.push(InventoryInsight {
                insight_type: "top_pair_priority".to_string(),
                description: format!(
                    "'{}' and '{}' are bought together {} times",
                    top_pair.item_1, top_pair.item_2, top_pair.count
                ),
                action: "Maintain optimal stock levels for both items to avoid losing combo sales"
                    .to_string(),
            });
        }

        BusinessInsights { bundle_opportunities, cross_sell_recommendations, inventory_insights }
    }
}

/// Upper-triangle pairs with a positive count, strongest first, capped at
/// [`TOP_PAIRS`]. Ties order by item names for determinism.
fn extract_strongest_pairs(matrix: &CoOccurrenceMatrix) -> Vec<CoOccurrencePair> {
    let items = matrix.items();
    let mut pairs = Vec::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let count = matrix.count_at(i, j);
            if count > 0 {
                pairs.push(CoOccurrencePair {
                    item_1: items[i].clone(),
                    item_2: items[j].clone(),
                    count,
                });
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.item_1.cmp(&b.item_1))
            .then_with(|| a.item_2.cmp(&b.item_2))
    });
    pairs.truncate(TOP_PAIRS);
    pairs
}
