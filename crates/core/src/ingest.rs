//! Flattening of nested POS order blobs into one row per line item.
//!
//! POS exports are loosely typed: numeric fields arrive as numbers or as
//! strings, and any field may be missing. Coercion failures become missing
//! values here; the preprocessor decides which missing values are fatal for
//! a row.

use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;

/// One nested order blob as fetched from the raw order store.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawOrderRecord {
    #[serde(rename = "Restaurant", default)]
    pub restaurant: RestaurantInfo,
    #[serde(rename = "Order", default)]
    pub order: OrderHeader,
    #[serde(rename = "Customer", default)]
    pub customer: CustomerInfo,
    #[serde(rename = "OrderItem", default)]
    pub items: Vec<OrderItemRecord>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RestaurantInfo {
    #[serde(default)]
    pub res_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderHeader {
    #[serde(rename = "orderID", default, deserialize_with = "lenient_string")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub no_of_persons: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tax_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub discount_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub delivery_charges: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub round_off: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub core_total: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CustomerInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderItemRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
}

/// One line item with its order-level fields denormalized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawLineRow {
    pub restaurant_name: Option<String>,
    pub invoice_no: Option<String>,
    pub date: Option<String>,
    pub payment_type: Option<String>,
    pub order_type: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_name: Option<String>,
    pub persons: Option<f64>,
    pub total_tax: Option<f64>,
    pub discount: Option<f64>,
    pub delivery_charge: Option<f64>,
    pub round_off: Option<f64>,
    pub total: Option<f64>,
    pub item_name: Option<String>,
    pub item_price: Option<f64>,
    pub item_quantity: Option<f64>,
    pub item_total: Option<f64>,
    pub waived_off: Option<f64>,
    pub my_amount: Option<f64>,
}

/// Flattens nested order records into one row per line item.
///
/// Orders without line items contribute no rows.
pub fn flatten_orders(orders: &[RawOrderRecord]) -> Vec<RawLineRow> {
    let mut rows = Vec::new();
    for order in orders {
        for item in &order.items {
            rows.push(RawLineRow {
                restaurant_name: order.restaurant.res_name.clone(),
                invoice_no: order.order.order_id.clone(),
                date: order.order.created_on.clone(),
                payment_type: order.order.payment_type.clone(),
                order_type: order.order.order_type.clone(),
                customer_phone: order.customer.phone.clone(),
                customer_name: order.customer.name.clone(),
                persons: order.order.no_of_persons,
                total_tax: order.order.tax_total,
                discount: order.order.discount_total,
                delivery_charge: order.order.delivery_charges,
                round_off: order.order.round_off,
                total: order.order.total,
                item_name: item.name.clone(),
                item_price: item.price,
                item_quantity: item.quantity,
                item_total: item.total,
                // POS exports carry no waived amount; preprocessor fills 0.
                waived_off: None,
                my_amount: order.order.core_total,
            });
        }
    }
    rows
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
