//! Cleaning of flattened order rows into the typed table shared by every
//! analytics pipeline.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::config::AnalysisConfig;
use crate::errors::DataError;
use crate::ingest::RawLineRow;

/// Timestamp format produced by the POS export.
pub const ORDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REQUIRED_COLUMNS: [&str; 4] = ["invoice_no", "item_name", "item_quantity", "item_total"];

/// A fully cleaned line row. Required fields are non-optional; rows that
/// could not satisfy them were dropped during preprocessing.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLineRow {
    pub invoice_no: String,
    pub item_name: String,
    pub item_quantity: f64,
    pub item_total: f64,
    pub discount: f64,
    pub waived_off: f64,
    /// Order-level invoice total, when the POS supplied one.
    pub total: Option<f64>,
    pub net_sales: f64,
    pub order_type: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_name: Option<String>,
    pub date: NaiveDateTime,
    pub year_month: String,
    pub date_only: NaiveDate,
    pub weekday: String,
    pub hour: u32,
}

/// Cleans a flattened row-per-item table.
///
/// Pure transform: filters the excluded order type and banned item names,
/// fills missing discount/waived amounts with zero, drops rows missing a
/// required field or an unparseable timestamp, computes net sales and the
/// derived time fields. Running it over an already-clean table changes
/// nothing.
///
/// Errors with [`DataError::MissingColumns`] when a required column is
/// absent from every input row, rather than silently returning an empty
/// table.
pub fn preprocess(
    rows: &[RawLineRow],
    config: &AnalysisConfig,
) -> Result<Vec<OrderLineRow>, DataError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let missing = missing_required_columns(rows);
    if !missing.is_empty() {
        return Err(DataError::MissingColumns { columns: missing });
    }

    let mut clean = Vec::with_capacity(rows.len());
    for row in rows {
        if row.order_type.as_deref() == Some(config.excluded_order_type.as_str()) {
            continue;
        }
        if let Some(name) = row.item_name.as_deref() {
            if contains_banned_term(name, &config.banned_item_terms) {
                continue;
            }
        }

        // Hard row-level requirement, not best-effort.
        let (Some(invoice_no), Some(item_name), Some(item_quantity), Some(item_total)) =
            (row.invoice_no.as_ref(), row.item_name.as_ref(), row.item_quantity, row.item_total)
        else {
            continue;
        };

        let Some(date) = row.date.as_deref().and_then(parse_order_timestamp) else {
            continue;
        };

        let discount = row.discount.unwrap_or(0.0);
        let waived_off = row.waived_off.unwrap_or(0.0);

        clean.push(OrderLineRow {
            invoice_no: invoice_no.clone(),
            item_name: item_name.clone(),
            item_quantity,
            item_total,
            discount,
            waived_off,
            total: row.total,
            net_sales: item_total - (discount + waived_off),
            order_type: row.order_type.clone(),
            customer_phone: row.customer_phone.clone(),
            customer_name: row.customer_name.clone(),
            date,
            year_month: date.format("%Y-%m").to_string(),
            date_only: date.date(),
            weekday: date.format("%A").to_string(),
            hour: date.hour(),
        });
    }

    Ok(clean)
}

fn parse_order_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), ORDER_TIMESTAMP_FORMAT).ok()
}

fn missing_required_columns(rows: &[RawLineRow]) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !rows.iter().any(|row| row.invoice_no.is_some()) {
        missing.push(REQUIRED_COLUMNS[0]);
    }
    if !rows.iter().any(|row| row.item_name.is_some()) {
        missing.push(REQUIRED_COLUMNS[1]);
    }
    if !rows.iter().any(|row| row.item_quantity.is_some()) {
        missing.push(REQUIRED_COLUMNS[2]);
    }
    if !rows.iter().any(|row| row.item_total.is_some()) {
        missing.push(REQUIRED_COLUMNS[3]);
    }
    missing
}

/// Case-insensitive whole-word match of any banned term within an item name.
/// Terms may span multiple words ("water bottle").
fn contains_banned_term(item_name: &str, terms: &[String]) -> bool {
    let haystack = item_name.to_lowercase();
    terms.iter().any(|term| {
        let needle = term.to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let mut start = 0;
        while let Some(position) = haystack[start..].find(&needle) {
            let begin = start + position;
            let end = begin + needle.len();
            let boundary_before =
                begin == 0 || !haystack[..begin].chars().next_back().is_some_and(is_word_char);
            let boundary_after =
                end == haystack.len() || !haystack[end..].chars().next().is_some_and(is_word_char);
            if boundary_before && boundary_after {
                return true;
            }
            // Resume after the first character of the failed match; a raw
            // +1 could land mid-character when the term starts non-ASCII.
            let first = haystack[begin..].chars().next().map_or(1, char::len_utf8);
            start = begin + first;
        }
        false
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use crate::config::AnalysisConfig;
    use crate::errors::DataError;
    use crate::ingest::RawLineRow;

    use super::{contains_banned_term, preprocess};

    fn row(invoice: &str, item: &str, quantity: f64, total: f64) -> RawLineRow {
        RawLineRow {
            invoice_no: Some(invoice.to_string()),
            item_name: Some(item.to_string()),
            item_quantity: Some(quantity),
            item_total: Some(total),
            date: Some("2025-06-02 19:15:00".to_string()),
            order_type: Some("Dine In".to_string()),
            ..RawLineRow::default()
        }
    }

    #[test]
    fn computes_net_sales_and_time_fields() {
        let mut input = row("INV-1", "Paneer Tikka", 1.0, 320.0);
        input.discount = Some(20.0);

        let clean = preprocess(&[input], &AnalysisConfig::default()).expect("preprocess");
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].net_sales, 300.0);
        assert_eq!(clean[0].waived_off, 0.0);
        assert_eq!(clean[0].weekday, "Monday");
        assert_eq!(clean[0].hour, 19);
        assert_eq!(clean[0].year_month, "2025-06");
    }

    #[test]
    fn excluded_order_type_and_banned_items_are_dropped() {
        let mut parcel = row("INV-1", "Veg Biryani", 1.0, 250.0);
        parcel.order_type = Some("Delivery(Parcel)".to_string());
        let banned = row("INV-2", "Mineral Water Bottle", 1.0, 20.0);
        let kept = row("INV-3", "Watermelon Juice", 1.0, 90.0);

        let clean =
            preprocess(&[parcel, banned, kept], &AnalysisConfig::default()).expect("preprocess");
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].item_name, "Watermelon Juice");
    }

    #[test]
    fn rows_missing_required_fields_or_timestamps_are_dropped() {
        let mut no_quantity = row("INV-1", "Idli", 1.0, 60.0);
        no_quantity.item_quantity = None;
        let mut bad_date = row("INV-2", "Vada", 1.0, 50.0);
        bad_date.date = Some("02/06/2025".to_string());
        let good = row("INV-3", "Dosa", 1.0, 80.0);

        let clean =
            preprocess(&[no_quantity, bad_date, good], &AnalysisConfig::default()).expect("ok");
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].invoice_no, "INV-3");
    }

    #[test]
    fn entirely_absent_required_column_is_an_error() {
        let mut input = row("INV-1", "Dosa", 1.0, 80.0);
        input.item_total = None;

        let err = preprocess(&[input], &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err, DataError::MissingColumns { columns: vec!["item_total"] });
    }

    #[test]
    fn preprocessing_clean_rows_twice_is_idempotent() {
        let input = vec![row("INV-1", "Dosa", 1.0, 80.0), row("INV-1", "Coffee", 2.0, 60.0)];
        let once = preprocess(&input, &AnalysisConfig::default()).expect("first pass");

        // Re-run over the surviving rows expressed as raw rows again.
        let raw_again: Vec<RawLineRow> = once
            .iter()
            .map(|clean| RawLineRow {
                invoice_no: Some(clean.invoice_no.clone()),
                item_name: Some(clean.item_name.clone()),
                item_quantity: Some(clean.item_quantity),
                item_total: Some(clean.item_total),
                discount: Some(clean.discount),
                waived_off: Some(clean.waived_off),
                total: clean.total,
                order_type: clean.order_type.clone(),
                customer_phone: clean.customer_phone.clone(),
                customer_name: clean.customer_name.clone(),
                date: Some(clean.date.format(super::ORDER_TIMESTAMP_FORMAT).to_string()),
                ..RawLineRow::default()
            })
            .collect();
        let twice = preprocess(&raw_again, &AnalysisConfig::default()).expect("second pass");

        assert_eq!(once, twice);
    }

    #[test]
    fn banned_terms_match_whole_words_only() {
        let terms = AnalysisConfig::default().banned_item_terms;
        assert!(contains_banned_term("Sparkling WATER", &terms));
        assert!(contains_banned_term("water bottle 500ml", &terms));
        assert!(!contains_banned_term("Watermelon Salad", &terms));
        assert!(!contains_banned_term("Underwater Cake", &terms));
    }

    #[test]
    fn non_ascii_banned_terms_scan_on_char_boundaries() {
        let terms = vec!["über".to_string()];
        // First hit fails the word boundary; the rescan must not split 'ü'.
        assert!(contains_banned_term("xüber über", &terms));
        assert!(!contains_banned_term("xüber", &terms));
        assert!(!contains_banned_term("überx café", &terms));
    }
}
