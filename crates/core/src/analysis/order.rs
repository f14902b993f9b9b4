//! Invoice-level aggregation and item co-occurrence analysis.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{NaiveDateTime, Timelike};

use crate::preprocess::OrderLineRow;

/// One row per invoice with aggregate KPIs.
#[derive(Clone, Debug, PartialEq)]
pub struct InvoiceAggregateRow {
    pub invoice_no: String,
    /// Earliest line timestamp on the invoice.
    pub order_date: NaiveDateTime,
    pub total_quantity: f64,
    pub total_discount: f64,
    pub total_waived_off: f64,
    pub net_invoice_value: f64,
    /// Distinct item-name count within the invoice.
    pub basket_size: usize,
    pub order_day: String,
    pub order_hour: u32,
}

/// Square, symmetric matrix counting how often item pairs appear on the
/// same invoice, restricted to the top-N most frequent items. The diagonal
/// is unused and stays zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoOccurrenceMatrix {
    items: Vec<String>,
    index: HashMap<String, usize>,
    counts: Vec<Vec<u64>>,
}

impl CoOccurrenceMatrix {
    fn new(items: Vec<String>) -> Self {
        let index = items.iter().cloned().enumerate().map(|(i, item)| (item, i)).collect();
        let size = items.len();
        Self { items, index, counts: vec![vec![0; size]; size] }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count for a pair of item names; 0 for unknown items.
    pub fn count(&self, a: &str, b: &str) -> u64 {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&i), Some(&j)) => self.counts[i][j],
            _ => 0,
        }
    }

    pub fn count_at(&self, i: usize, j: usize) -> u64 {
        self.counts[i][j]
    }
}

#[derive(Default)]
pub struct OrderAnalyzer;

impl OrderAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Groups line items by invoice and aggregates order-level KPIs.
    pub fn compute_invoice_aggregation(&self, rows: &[OrderLineRow]) -> Vec<InvoiceAggregateRow> {
        let mut per_invoice: BTreeMap<String, InvoiceAccumulator> = BTreeMap::new();

        for row in rows {
            let entry = per_invoice.entry(row.invoice_no.clone()).or_default();
            entry.order_date =
                Some(entry.order_date.map_or(row.date, |current| current.min(row.date)));
            entry.total_quantity += row.item_quantity;
            entry.total_discount += row.discount;
            entry.total_waived_off += row.waived_off;
            entry.net_invoice_value += row.net_sales;
            entry.items.insert(row.item_name.clone());
        }

        per_invoice
            .into_iter()
            .filter_map(|(invoice_no, acc)| {
                let order_date = acc.order_date?;
                Some(InvoiceAggregateRow {
                    invoice_no,
                    order_date,
                    total_quantity: acc.total_quantity,
                    total_discount: acc.total_discount,
                    total_waived_off: acc.total_waived_off,
                    net_invoice_value: acc.net_invoice_value,
                    basket_size: acc.items.len(),
                    order_day: order_date.format("%A").to_string(),
                    order_hour: order_date.hour(),
                })
            })
            .collect()
    }

    /// Builds the symmetric item co-occurrence matrix.
    ///
    /// Pairs are generated from each invoice's *sorted* distinct item set so
    /// (A, B) and (B, A) are never counted separately; invoices with fewer
    /// than two distinct items are skipped. Rows and columns are restricted
    /// to the `top_n` globally most frequent items by raw occurrence count.
    pub fn compute_cooccurrence_matrix(
        &self,
        rows: &[OrderLineRow],
        top_n: usize,
    ) -> CoOccurrenceMatrix {
        let mut invoice_items: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut occurrence_counts: HashMap<&str, u64> = HashMap::new();
        for row in rows {
            invoice_items.entry(&row.invoice_no).or_default().insert(&row.item_name);
            *occurrence_counts.entry(&row.item_name).or_insert(0) += 1;
        }

        let mut pair_counts: HashMap<(&str, &str), u64> = HashMap::new();
        for items in invoice_items.values() {
            if items.len() < 2 {
                continue;
            }
            // BTreeSet iteration is already sorted, giving each pair one
            // canonical representation.
            let sorted: Vec<&str> = items.iter().copied().collect();
            for (position, first) in sorted.iter().enumerate() {
                for second in &sorted[position + 1..] {
                    *pair_counts.entry((first, second)).or_insert(0) += 1;
                }
            }
        }

        // Top-N by raw occurrence count, name-ordered within ties so the
        // matrix layout is deterministic.
        let mut ranked: Vec<(&str, u64)> =
            occurrence_counts.iter().map(|(&item, &count)| (item, count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let top_items: Vec<String> =
            ranked.into_iter().take(top_n).map(|(item, _)| item.to_string()).collect();

        let mut matrix = CoOccurrenceMatrix::new(top_items);
        for ((first, second), count) in &pair_counts {
            let (Some(&i), Some(&j)) =
                (matrix.index.get(*first), matrix.index.get(*second))
            else {
                continue;
            };
            matrix.counts[i][j] += count;
        }

        // Symmetrize: add the transpose so M[i][j] == M[j][i] everywhere.
        for i in 0..matrix.len() {
            for j in (i + 1)..matrix.len() {
                let combined = matrix.counts[i][j] + matrix.counts[j][i];
                matrix.counts[i][j] = combined;
                matrix.counts[j][i] = combined;
            }
        }

        matrix
    }
}

#[derive(Default)]
struct InvoiceAccumulator {
    order_date: Option<NaiveDateTime>,
    total_quantity: f64,
    total_discount: f64,
    total_waived_off: f64,
    net_invoice_value: f64,
    items: BTreeSet<String>,
}
