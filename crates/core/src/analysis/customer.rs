//! Customer KPI construction and RFM clustering.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};

use crate::analysis::stats;
use crate::config::AnalysisConfig;
use crate::errors::DataError;
use crate::preprocess::OrderLineRow;

/// Display name used when a customer has no unique modal name.
pub const FALLBACK_DISPLAY_NAME: &str = "Valued Customer";

/// One row per distinct customer identifier present in the prepared data.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomerKpiRow {
    pub customer_phone: String,
    pub display_name: String,
    /// Sum of deduplicated invoice totals.
    pub total_spend: f64,
    pub avg_spend_per_order: f64,
    /// Distinct invoice count.
    pub orders_placed: u64,
    /// Sum of item quantities.
    pub items_ordered: f64,
    pub avg_spend_per_item: f64,
    /// Days between the dataset's latest order and this customer's latest.
    pub recency_days: i64,
    /// Days between the dataset's latest order and this customer's first.
    pub tenure_days: i64,
    /// Composite R+F+M bucket score; informational, not used for clustering.
    pub rfm_score: Option<u8>,
    pub cluster: Option<usize>,
}

pub struct CustomerAnalyzer {
    config: AnalysisConfig,
}

impl CustomerAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Restricts to rows with a known customer identifier, drops the
    /// excluded order type again (prepared data may arrive unfiltered), and
    /// normalizes the identifier to a trimmed canonical string.
    pub fn prepare(&self, rows: &[OrderLineRow]) -> Vec<OrderLineRow> {
        rows.iter()
            .filter(|row| {
                row.order_type.as_deref() != Some(self.config.excluded_order_type.as_str())
            })
            .filter_map(|row| {
                let phone = row.customer_phone.as_deref()?.trim();
                if phone.is_empty() {
                    return None;
                }
                let mut prepared = row.clone();
                prepared.customer_phone = Some(phone.to_string());
                Some(prepared)
            })
            .collect()
    }

    /// Builds the per-customer KPI table.
    ///
    /// Invoice totals are deduplicated per (customer, invoice) before
    /// summing so line items never multiply the invoice total.
    pub fn build_customer_kpis(
        &self,
        rows: &[OrderLineRow],
    ) -> Result<Vec<CustomerKpiRow>, DataError> {
        if rows.is_empty() {
            return Err(DataError::EmptyDataset { stage: "customer kpis" });
        }

        let latest_date: NaiveDateTime =
            rows.iter().map(|row| row.date).max().unwrap_or_default();

        // First-seen invoice total per (customer, invoice).
        let mut invoice_totals: BTreeMap<(String, String), f64> = BTreeMap::new();
        let mut per_customer: BTreeMap<String, CustomerAccumulator> = BTreeMap::new();

        for row in rows {
            let Some(phone) = row.customer_phone.clone() else { continue };
            invoice_totals
                .entry((phone.clone(), row.invoice_no.clone()))
                .or_insert_with(|| row.total.unwrap_or(0.0));

            let entry = per_customer.entry(phone).or_default();
            entry.items_ordered += row.item_quantity;
            entry.last_order = entry.last_order.max(Some(row.date));
            entry.first_order_date =
                Some(entry.first_order_date.map_or(row.date_only, |d| d.min(row.date_only)));
            if let Some(name) = row.customer_name.as_deref() {
                *entry.name_counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }

        for ((phone, _), total) in &invoice_totals {
            if let Some(entry) = per_customer.get_mut(phone) {
                entry.invoice_totals.push(*total);
            }
        }

        let kpis = per_customer
            .into_iter()
            .map(|(phone, acc)| {
                let total_spend = acc.invoice_totals.iter().sum::<f64>();
                let orders_placed = acc.invoice_totals.len() as u64;
                let avg_spend_per_order = stats::mean(&acc.invoice_totals);
                let avg_spend_per_item = if acc.items_ordered > 0.0 {
                    total_spend / acc.items_ordered
                } else {
                    0.0
                };
                let last_order = acc.last_order.unwrap_or(latest_date);
                let first_order_date = acc.first_order_date.unwrap_or(latest_date.date());

                CustomerKpiRow {
                    customer_phone: phone,
                    display_name: modal_name(&acc.name_counts),
                    total_spend,
                    avg_spend_per_order,
                    orders_placed,
                    items_ordered: acc.items_ordered,
                    avg_spend_per_item,
                    recency_days: (latest_date - last_order).num_days(),
                    tenure_days: (latest_date.date() - first_order_date).num_days(),
                    rfm_score: None,
                    cluster: None,
                }
            })
            .collect();

        Ok(kpis)
    }

    /// Scores recency/frequency/monetary into quantile buckets (recency
    /// inverted) and clusters the log-transformed, standardized raw values
    /// with seeded k-means. Labels merge back by customer identifier.
    pub fn perform_rfm_clustering(
        &self,
        mut kpis: Vec<CustomerKpiRow>,
    ) -> Result<Vec<CustomerKpiRow>, DataError> {
        if kpis.is_empty() {
            return Err(DataError::EmptyDataset { stage: "rfm clustering" });
        }

        let recency: Vec<f64> = kpis.iter().map(|row| row.recency_days as f64).collect();
        let frequency: Vec<f64> = kpis.iter().map(|row| row.orders_placed as f64).collect();
        let monetary: Vec<f64> = kpis.iter().map(|row| row.total_spend).collect();

        let bins = self.config.rfm_bins;
        let policy = self.config.binning_policy;
        let (recency_buckets, recency_bins) =
            stats::quantile_bins(&recency, bins, policy, "recency")?;
        // Ranking first makes heavily tied order counts still spread over
        // the full set of buckets.
        let (frequency_buckets, _) =
            stats::quantile_bins(&stats::rank_first(&frequency), bins, policy, "frequency")?;
        let (monetary_buckets, _) =
            stats::quantile_bins(&monetary, bins, policy, "monetary")?;

        let features: Vec<Vec<f64>> = {
            let columns = [
                stats::standardize(&stats::log1p(&recency)),
                stats::standardize(&stats::log1p(&frequency)),
                stats::standardize(&stats::log1p(&monetary)),
            ];
            (0..kpis.len())
                .map(|row| columns.iter().map(|column| column[row]).collect())
                .collect()
        };
        let clusters = stats::kmeans(
            &features,
            self.config.cluster_count,
            self.config.cluster_seed,
            100,
        );

        for (index, row) in kpis.iter_mut().enumerate() {
            // Lowest recency earns the highest score.
            let recency_score = (recency_bins as u8 + 1) - recency_buckets[index];
            let frequency_score = frequency_buckets[index];
            let monetary_score = monetary_buckets[index];
            row.rfm_score = Some(recency_score + frequency_score + monetary_score);
            row.cluster = Some(clusters[index]);
        }

        Ok(kpis)
    }
}

#[derive(Default)]
struct CustomerAccumulator {
    invoice_totals: Vec<f64>,
    items_ordered: f64,
    last_order: Option<NaiveDateTime>,
    first_order_date: Option<NaiveDate>,
    name_counts: HashMap<String, u64>,
}

/// Most frequent name, or the fallback when there is no unique mode.
fn modal_name(name_counts: &HashMap<String, u64>) -> String {
    let Some(max_count) = name_counts.values().copied().max() else {
        return FALLBACK_DISPLAY_NAME.to_string();
    };
    let mut modes: Vec<&String> =
        name_counts.iter().filter(|(_, &count)| count == max_count).map(|(name, _)| name).collect();
    if modes.len() == 1 {
        modes.remove(0).clone()
    } else {
        FALLBACK_DISPLAY_NAME.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::config::AnalysisConfig;
    use crate::errors::DataError;
    use crate::preprocess::OrderLineRow;

    use super::{CustomerAnalyzer, FALLBACK_DISPLAY_NAME};

    fn line(
        invoice: &str,
        phone: Option<&str>,
        name: Option<&str>,
        total: f64,
        quantity: f64,
        day: u32,
    ) -> OrderLineRow {
        let date = NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        OrderLineRow {
            invoice_no: invoice.to_string(),
            item_name: "Item".to_string(),
            item_quantity: quantity,
            item_total: total,
            discount: 0.0,
            waived_off: 0.0,
            total: Some(total),
            net_sales: total,
            order_type: Some("Dine In".to_string()),
            customer_phone: phone.map(str::to_string),
            customer_name: name.map(str::to_string),
            date,
            year_month: date.format("%Y-%m").to_string(),
            date_only: date.date(),
            weekday: date.format("%A").to_string(),
            hour: 12,
        }
    }

    fn analyzer() -> CustomerAnalyzer {
        CustomerAnalyzer::new(AnalysisConfig::default())
    }

    #[test]
    fn prepare_keeps_only_known_customers() {
        let rows = vec![
            line("I-1", Some(" 9811111111 "), Some("Asha"), 100.0, 1.0, 1),
            line("I-2", None, None, 50.0, 1.0, 1),
            line("I-3", Some(""), None, 50.0, 1.0, 1),
        ];

        let prepared = analyzer().prepare(&rows);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].customer_phone.as_deref(), Some("9811111111"));
    }

    #[test]
    fn line_items_do_not_multiply_invoice_totals() {
        // Two line items on one invoice with invoice total 300.
        let rows = vec![
            line("I-1", Some("98"), Some("Asha"), 300.0, 1.0, 1),
            line("I-1", Some("98"), Some("Asha"), 300.0, 2.0, 1),
            line("I-2", Some("98"), Some("Asha"), 100.0, 1.0, 10),
        ];

        let kpis = analyzer().build_customer_kpis(&rows).expect("kpis");
        assert_eq!(kpis.len(), 1);
        assert_eq!(kpis[0].total_spend, 400.0);
        assert_eq!(kpis[0].orders_placed, 2);
        assert_eq!(kpis[0].avg_spend_per_order, 200.0);
        assert_eq!(kpis[0].items_ordered, 4.0);
        assert_eq!(kpis[0].avg_spend_per_item, 100.0);
    }

    #[test]
    fn recency_and_tenure_measure_against_dataset_latest() {
        let rows = vec![
            line("I-1", Some("98"), Some("Asha"), 100.0, 1.0, 1),
            line("I-2", Some("98"), Some("Asha"), 100.0, 1.0, 11),
            line("I-3", Some("99"), Some("Ravi"), 100.0, 1.0, 21),
        ];

        let kpis = analyzer().build_customer_kpis(&rows).expect("kpis");
        let asha = kpis.iter().find(|row| row.customer_phone == "98").unwrap();
        assert_eq!(asha.recency_days, 10);
        assert_eq!(asha.tenure_days, 20);
        let ravi = kpis.iter().find(|row| row.customer_phone == "99").unwrap();
        assert_eq!(ravi.recency_days, 0);
        assert_eq!(ravi.tenure_days, 0);
    }

    #[test]
    fn tied_names_fall_back_to_placeholder() {
        let rows = vec![
            line("I-1", Some("98"), Some("Asha"), 100.0, 1.0, 1),
            line("I-2", Some("98"), Some("A. Sharma"), 100.0, 1.0, 2),
            line("I-3", Some("99"), None, 100.0, 1.0, 2),
        ];

        let kpis = analyzer().build_customer_kpis(&rows).expect("kpis");
        assert_eq!(kpis[0].display_name, FALLBACK_DISPLAY_NAME);
        assert_eq!(kpis[1].display_name, FALLBACK_DISPLAY_NAME);
    }

    #[test]
    fn empty_prepared_data_is_a_data_error() {
        let err = analyzer().build_customer_kpis(&[]).unwrap_err();
        assert_eq!(err, DataError::EmptyDataset { stage: "customer kpis" });
    }

    #[test]
    fn recency_scores_are_monotonically_non_increasing() {
        // Ten customers with strictly increasing recency.
        let rows: Vec<OrderLineRow> = (1..=10)
            .map(|i| {
                line(
                    &format!("I-{i}"),
                    Some(&format!("phone-{i:02}")),
                    Some("Guest"),
                    100.0 * i as f64,
                    1.0,
                    i as u32,
                )
            })
            .collect();

        let analyzer = analyzer();
        let kpis = analyzer.build_customer_kpis(&rows).expect("kpis");
        let scored = analyzer.perform_rfm_clustering(kpis).expect("clustering");

        let mut by_recency = scored.clone();
        by_recency.sort_by_key(|row| row.recency_days);
        assert!(by_recency.iter().all(|row| row.rfm_score.is_some()));

        // Strictly increasing recency gets non-increasing scores once the
        // bucket is inverted.
        let recency_values: Vec<f64> =
            by_recency.iter().map(|row| row.recency_days as f64).collect();
        let (buckets, bins) = crate::analysis::stats::quantile_bins(
            &recency_values,
            5,
            crate::config::BinningPolicy::Lenient,
            "recency",
        )
        .expect("bins");
        let scores: Vec<u8> = buckets.iter().map(|b| (bins as u8 + 1) - b).collect();
        assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn clustering_is_deterministic() {
        let rows: Vec<OrderLineRow> = (1..=12)
            .map(|i| {
                line(
                    &format!("I-{i}"),
                    Some(&format!("phone-{i:02}")),
                    Some("Guest"),
                    50.0 * i as f64,
                    1.0,
                    (i % 28) as u32 + 1,
                )
            })
            .collect();

        let analyzer = analyzer();
        let kpis = analyzer.build_customer_kpis(&rows).expect("kpis");
        let first = analyzer.perform_rfm_clustering(kpis.clone()).expect("clustering");
        let second = analyzer.perform_rfm_clustering(kpis).expect("clustering");
        assert_eq!(first, second);
    }
}
