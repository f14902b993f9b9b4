//! Customer segmentation and coupon-strategy insight blocks.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::customer::CustomerKpiRow;
use crate::analysis::stats::{self, Describe};
use crate::config::AnalysisConfig;

/// Assumed gross margin when estimating profit from revenue.
const ESTIMATED_PROFIT_MARGIN: f64 = 0.25;

/// Disjoint, exhaustive customer segmentation. Every customer lands in
/// exactly one segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    New,
    Active,
    Dormant,
}

/// Segment for a single KPI row: new when tenure is short, dormant when the
/// customer is neither new nor recently seen, active otherwise.
pub fn segment_of(row: &CustomerKpiRow, config: &AnalysisConfig) -> Segment {
    if row.tenure_days <= config.new_customer_tenure_days {
        Segment::New
    } else if row.recency_days > config.dormant_recency_days {
        Segment::Dormant
    } else {
        Segment::Active
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub analysis_timestamp: String,
    pub analysis_config: CustomerConfigEcho,
    pub customer_segments: CustomerSegments,
    pub financial_summary: FinancialSummary,
    pub coupon_strategy_insights: CouponStrategyInsights,
    pub additional_insights: AdditionalInsights,
}

/// Config values echoed into the document so a reader can interpret the
/// thresholds without chasing deployment settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerConfigEcho {
    pub high_value_percentile: f64,
    pub new_customer_tenure_days: i64,
    pub dormant_recency_days: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegments {
    pub total_customers: u64,
    pub new_customers: NewSegment,
    pub active_customers: ActiveSegment,
    pub dormant_customers: DormantSegment,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewSegment {
    pub count: u64,
    pub percentage: f64,
    pub avg_first_order_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveSegment {
    pub count: u64,
    pub percentage: f64,
    pub avg_clv: f64,
    pub avg_orders: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DormantSegment {
    pub count: u64,
    pub percentage: f64,
    pub avg_clv_before_dormancy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_revenue: f64,
    pub estimated_total_profit: f64,
    pub overall_aov: f64,
    pub overall_avg_clv: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouponStrategyInsights {
    pub stamp_card: StampCardInsight,
    pub miss_you: MissYouInsight,
    pub joining_bonus: JoiningBonusInsight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StampCardInsight {
    pub target_customer_count: u64,
    pub order_frequency_distribution: Option<Describe>,
    pub suggestion: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissYouInsight {
    pub target_customer_count: u64,
    pub avg_spend_of_dormant_customers: f64,
    pub last_order_recency_distribution: Option<Describe>,
    pub suggestion: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoiningBonusInsight {
    pub target_customer_count: u64,
    pub avg_first_order_value: f64,
    pub suggestion: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdditionalInsights {
    pub high_value_customers: HighValueCustomers,
    pub order_frequency_insights: OrderFrequencyInsights,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighValueCustomers {
    pub count: u64,
    pub threshold: f64,
    pub avg_clv: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderFrequencyInsights {
    pub single_order_customers: u64,
    pub repeat_customers: u64,
    pub high_frequency_customers: u64,
}

pub struct CustomerSummarizer {
    config: AnalysisConfig,
}

impl CustomerSummarizer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Builds the full customer summary document. Empty segments produce
    /// zeroed averages and explicit fallback suggestions rather than
    /// failing; a completely empty KPI table yields an all-zero document.
    pub fn summarize(&self, kpis: &[CustomerKpiRow]) -> CustomerSummary {
        CustomerSummary {
            analysis_timestamp: Utc::now().to_rfc3339(),
            analysis_config: CustomerConfigEcho {
                high_value_percentile: self.config.high_value_percentile,
                new_customer_tenure_days: self.config.new_customer_tenure_days,
                dormant_recency_days: self.config.dormant_recency_days,
            },
            customer_segments: self.segment_customers(kpis),
            financial_summary: self.analyze_financials(kpis),
            coupon_strategy_insights: self.coupon_insights(kpis),
            additional_insights: self.additional_insights(kpis),
        }
    }

    fn segment_customers(&self, kpis: &[CustomerKpiRow]) -> CustomerSegments {
        let total = kpis.len() as u64;
        let new: Vec<&CustomerKpiRow> = self.in_segment(kpis, Segment::New);
        let active: Vec<&CustomerKpiRow> = self.in_segment(kpis, Segment::Active);
        let dormant: Vec<&CustomerKpiRow> = self.in_segment(kpis, Segment::Dormant);

        CustomerSegments {
            total_customers: total,
            new_customers: NewSegment {
                count: new.len() as u64,
                percentage: percentage(new.len(), total),
                avg_first_order_value: guarded_mean(&new, |row| row.avg_spend_per_order),
            },
            active_customers: ActiveSegment {
                count: active.len() as u64,
                percentage: percentage(active.len(), total),
                avg_clv: guarded_mean(&active, |row| row.total_spend),
                avg_orders: guarded_mean(&active, |row| row.orders_placed as f64),
            },
            dormant_customers: DormantSegment {
                count: dormant.len() as u64,
                percentage: percentage(dormant.len(), total),
                avg_clv_before_dormancy: guarded_mean(&dormant, |row| row.total_spend),
            },
        }
    }

    fn analyze_financials(&self, kpis: &[CustomerKpiRow]) -> FinancialSummary {
        let total_revenue: f64 = kpis.iter().map(|row| row.total_spend).sum();
        let total_orders: u64 = kpis.iter().map(|row| row.orders_placed).sum();
        FinancialSummary {
            total_revenue: stats::round2(total_revenue),
            estimated_total_profit: stats::round2(total_revenue * ESTIMATED_PROFIT_MARGIN),
            overall_aov: if total_orders > 0 {
                stats::round2(total_revenue / total_orders as f64)
            } else {
                0.0
            },
            overall_avg_clv: stats::round2(stats::mean(
                &kpis.iter().map(|row| row.total_spend).collect::<Vec<f64>>(),
            )),
        }
    }

    fn coupon_insights(&self, kpis: &[CustomerKpiRow]) -> CouponStrategyInsights {
        let active_multi_order: Vec<&CustomerKpiRow> = kpis
            .iter()
            .filter(|row| {
                row.orders_placed > 1 && segment_of(row, &self.config) == Segment::Active
            })
            .collect();
        let dormant = self.in_segment(kpis, Segment::Dormant);
        let new = self.in_segment(kpis, Segment::New);

        let stamp_card = if active_multi_order.is_empty() {
            StampCardInsight {
                target_customer_count: 0,
                order_frequency_distribution: None,
                suggestion: "No multi-order active customers found.".to_string(),
            }
        } else {
            let orders: Vec<f64> =
                active_multi_order.iter().map(|row| row.orders_placed as f64).collect();
            let distribution = stats::describe(&orders);
            let suggestion = format!(
                "Most active customers place between {} and {} orders. Recommend 5 or 7 stamp card.",
                distribution.q25 as i64, distribution.q75 as i64
            );
            StampCardInsight {
                target_customer_count: active_multi_order.len() as u64,
                order_frequency_distribution: Some(distribution),
                suggestion,
            }
        };

        let miss_you = if dormant.is_empty() {
            MissYouInsight {
                target_customer_count: 0,
                avg_spend_of_dormant_customers: 0.0,
                last_order_recency_distribution: None,
                suggestion: "No dormant customers found.".to_string(),
            }
        } else {
            let all_recency: Vec<f64> = kpis.iter().map(|row| row.recency_days as f64).collect();
            MissYouInsight {
                target_customer_count: dormant.len() as u64,
                avg_spend_of_dormant_customers: guarded_mean(&dormant, |row| {
                    row.avg_spend_per_order
                }),
                last_order_recency_distribution: Some(stats::describe(&all_recency)),
                suggestion: "A win-back offer should be compelling relative to these averages."
                    .to_string(),
            }
        };

        let joining_bonus = if new.is_empty() {
            JoiningBonusInsight {
                target_customer_count: 0,
                avg_first_order_value: 0.0,
                suggestion: "No new customers found.".to_string(),
            }
        } else {
            JoiningBonusInsight {
                target_customer_count: new.len() as u64,
                avg_first_order_value: guarded_mean(&new, |row| row.avg_spend_per_order),
                suggestion: "Offer joining bonuses cautiously to protect margins.".to_string(),
            }
        };

        CouponStrategyInsights { stamp_card, miss_you, joining_bonus }
    }

    fn additional_insights(&self, kpis: &[CustomerKpiRow]) -> AdditionalInsights {
        let spends: Vec<f64> = kpis.iter().map(|row| row.total_spend).collect();
        let threshold = stats::quantile(&spends, self.config.high_value_percentile);
        let high_value: Vec<&CustomerKpiRow> =
            kpis.iter().filter(|row| row.total_spend > threshold).collect();

        AdditionalInsights {
            high_value_customers: HighValueCustomers {
                count: high_value.len() as u64,
                threshold: stats::round2(threshold),
                avg_clv: guarded_mean(&high_value, |row| row.total_spend),
            },
            order_frequency_insights: OrderFrequencyInsights {
                single_order_customers: kpis.iter().filter(|row| row.orders_placed == 1).count()
                    as u64,
                repeat_customers: kpis.iter().filter(|row| row.orders_placed > 1).count() as u64,
                high_frequency_customers: kpis
                    .iter()
                    .filter(|row| row.orders_placed >= self.config.high_frequency_orders)
                    .count() as u64,
            },
        }
    }

    fn in_segment<'a>(
        &self,
        kpis: &'a [CustomerKpiRow],
        segment: Segment,
    ) -> Vec<&'a CustomerKpiRow> {
        kpis.iter().filter(|row| segment_of(row, &self.config) == segment).collect()
    }
}

fn percentage(count: usize, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    stats::round2(count as f64 / total as f64 * 100.0)
}

fn guarded_mean(rows: &[&CustomerKpiRow], metric: impl Fn(&CustomerKpiRow) -> f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let values: Vec<f64> = rows.iter().map(|row| metric(row)).collect();
    stats::round2(stats::mean(&values))
}

#[cfg(test)]
mod tests {
    use crate::analysis::customer::CustomerKpiRow;
    use crate::config::AnalysisConfig;

    use super::{segment_of, CustomerSummarizer, Segment};

    fn kpi(phone: &str, recency: i64, tenure: i64, orders: u64, spend: f64) -> CustomerKpiRow {
        CustomerKpiRow {
            customer_phone: phone.to_string(),
            display_name: "Guest".to_string(),
            total_spend: spend,
            avg_spend_per_order: spend / orders as f64,
            orders_placed: orders,
            items_ordered: orders as f64,
            avg_spend_per_item: spend / orders as f64,
            recency_days: recency,
            tenure_days: tenure,
            rfm_score: None,
            cluster: None,
        }
    }

    #[test]
    fn every_customer_lands_in_exactly_one_segment() {
        let config = AnalysisConfig::default();
        let customers = vec![
            kpi("a", 0, 10, 1, 100.0),    // new
            kpi("b", 5, 200, 8, 4000.0),  // active
            kpi("c", 90, 300, 2, 500.0),  // dormant
            kpi("d", 61, 31, 1, 50.0),    // dormant boundary
            kpi("e", 60, 31, 1, 50.0),    // active boundary
            kpi("f", 90, 30, 1, 50.0),    // new wins over recency
        ];

        let summary = CustomerSummarizer::new(config.clone()).summarize(&customers);
        let segments = &summary.customer_segments;
        assert_eq!(
            segments.new_customers.count
                + segments.active_customers.count
                + segments.dormant_customers.count,
            segments.total_customers
        );
        assert_eq!(segment_of(&customers[3], &config), Segment::Dormant);
        assert_eq!(segment_of(&customers[4], &config), Segment::Active);
        assert_eq!(segment_of(&customers[5], &config), Segment::New);
    }

    #[test]
    fn empty_table_produces_guarded_zero_document() {
        let summary = CustomerSummarizer::new(AnalysisConfig::default()).summarize(&[]);
        assert_eq!(summary.customer_segments.total_customers, 0);
        assert_eq!(summary.customer_segments.new_customers.percentage, 0.0);
        assert_eq!(summary.financial_summary.overall_aov, 0.0);
        assert_eq!(
            summary.coupon_strategy_insights.miss_you.suggestion,
            "No dormant customers found."
        );
        assert_eq!(
            summary.coupon_strategy_insights.stamp_card.suggestion,
            "No multi-order active customers found."
        );
        assert_eq!(
            summary.coupon_strategy_insights.joining_bonus.suggestion,
            "No new customers found."
        );
    }

    #[test]
    fn stamp_card_targets_multi_order_active_customers() {
        let customers = vec![
            kpi("a", 5, 200, 6, 3000.0),
            kpi("b", 10, 400, 17, 9000.0),
            kpi("c", 5, 10, 3, 300.0),  // new, excluded
            kpi("d", 90, 200, 4, 400.0), // dormant, excluded
        ];

        let summary = CustomerSummarizer::new(AnalysisConfig::default()).summarize(&customers);
        let stamp_card = &summary.coupon_strategy_insights.stamp_card;
        assert_eq!(stamp_card.target_customer_count, 2);
        let distribution = stamp_card.order_frequency_distribution.as_ref().unwrap();
        assert_eq!(distribution.count, 2);
        assert!(stamp_card.suggestion.contains("stamp card"));
    }

    #[test]
    fn high_value_threshold_uses_configured_percentile() {
        let customers: Vec<_> =
            (1..=10).map(|i| kpi(&format!("p{i}"), 5, 100, 2, 100.0 * i as f64)).collect();

        let summary = CustomerSummarizer::new(AnalysisConfig::default()).summarize(&customers);
        let high_value = &summary.additional_insights.high_value_customers;
        // 80th percentile of 100..=1000 is 820; two customers exceed it.
        assert_eq!(high_value.threshold, 820.0);
        assert_eq!(high_value.count, 2);
    }

    #[test]
    fn order_frequency_buckets_count_correctly() {
        let customers = vec![
            kpi("a", 5, 100, 1, 100.0),
            kpi("b", 5, 100, 2, 200.0),
            kpi("c", 5, 100, 5, 500.0),
            kpi("d", 5, 100, 9, 900.0),
        ];

        let summary = CustomerSummarizer::new(AnalysisConfig::default()).summarize(&customers);
        let frequency = &summary.additional_insights.order_frequency_insights;
        assert_eq!(frequency.single_order_customers, 1);
        assert_eq!(frequency.repeat_customers, 3);
        assert_eq!(frequency.high_frequency_customers, 2);
    }
}
