use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use super::stats::round2;
use crate::dataset::models::Order;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetentionWindows {
    pub d30: u64,
    pub d60: u64,
    pub d90: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortEntry {
    /// Calendar month (`YYYY-MM`) of the cohort's first orders.
    pub cohort: String,
    pub customers: u64,
    pub orders: u64,
    pub revenue: f64,
    pub retention: RetentionWindows,
}

/// Cohort = month of each customer's first order. A customer is retained in
/// a window iff they placed at least two orders within that many days of
/// their first order.
pub fn cohorts(orders: &[&Order]) -> Vec<CohortEntry> {
    let mut per_customer: BTreeMap<&str, Vec<&Order>> = BTreeMap::new();
    for order in orders {
        per_customer
            .entry(order.customer_id.as_str())
            .or_default()
            .push(order);
    }

    struct Accum {
        customers: u64,
        orders: u64,
        revenue: f64,
        retention: RetentionWindows,
    }
    let mut per_cohort: BTreeMap<String, Accum> = BTreeMap::new();

    for history in per_customer.values_mut() {
        history.sort_by_key(|o| o.created_at);
        let first = history[0].created_at;
        let cohort = first.format("%Y-%m").to_string();
        let entry = per_cohort.entry(cohort).or_insert(Accum {
            customers: 0,
            orders: 0,
            revenue: 0.0,
            retention: RetentionWindows { d30: 0, d60: 0, d90: 0 },
        });
        entry.customers += 1;
        entry.orders += history.len() as u64;
        entry.revenue += history.iter().map(|o| o.total).sum::<f64>();
        for (days, slot) in [(30, 0), (60, 1), (90, 2)] {
            let limit = first + Duration::days(days);
            let in_window = history.iter().filter(|o| o.created_at <= limit).count();
            if in_window >= 2 {
                match slot {
                    0 => entry.retention.d30 += 1,
                    1 => entry.retention.d60 += 1,
                    _ => entry.retention.d90 += 1,
                }
            }
        }
    }

    per_cohort
        .into_iter()
        .map(|(cohort, accum)| CohortEntry {
            cohort,
            customers: accum.customers,
            orders: accum.orders,
            revenue: round2(accum.revenue),
            retention: accum.retention,
        })
        .collect()
}
