use std::collections::BTreeMap;

use serde::Serialize;
use chrono::Timelike;

use super::stats::{rate, round2};
use super::volume::BreakdownEntry;
use crate::dataset::models::{Order, TemplateStat};

#[derive(Debug, Clone, Serialize)]
pub struct RevenuePoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourPoint {
    pub hour: u32,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemplateReport {
    pub template_id: String,
    pub sent: u64,
    pub replied: u64,
    pub blocked: u64,
    pub ctr: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommerceReport {
    pub total_orders: u64,
    pub avg_order_value: f64,
    pub revenue: Vec<RevenuePoint>,
    pub top_products: Vec<BreakdownEntry>,
    pub conversion: f64,
    pub recurrence: Recurrence,
    pub peak_hours: Vec<HourPoint>,
    pub channels: Vec<BreakdownEntry>,
    pub templates: Vec<TemplateReport>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct Recurrence {
    pub d30: u64,
    pub d60: u64,
    pub d90: u64,
}

impl CommerceReport {
    pub fn empty() -> Self {
        Self {
            total_orders: 0,
            avg_order_value: 0.0,
            revenue: vec![],
            top_products: vec![],
            conversion: 0.0,
            recurrence: Recurrence::default(),
            peak_hours: vec![],
            channels: vec![],
            templates: vec![],
        }
    }
}

/// Response-through rate per template: replied / sent * 100. Templates that
/// never went out report 0 instead of dividing by zero.
pub fn template_reports(stats: &[&TemplateStat]) -> Vec<TemplateReport> {
    stats
        .iter()
        .map(|stat| TemplateReport {
            template_id: stat.template_id.clone(),
            sent: stat.sent,
            replied: stat.replied,
            blocked: stat.blocked,
            ctr: if stat.sent == 0 {
                0.0
            } else {
                round2(stat.replied as f64 / stat.sent as f64 * 100.0)
            },
        })
        .collect()
}

/// Commerce metrics for pyme tenants. `ticket_count` is the conversion base
/// (orders per ticket in the same filtered view).
pub fn commerce_report(
    orders: &[&Order],
    ticket_count: usize,
    template_stats: &[&TemplateStat],
) -> CommerceReport {
    if orders.is_empty() {
        return CommerceReport {
            templates: template_reports(template_stats),
            ..CommerceReport::empty()
        };
    }

    let mut revenue_per_day: BTreeMap<String, f64> = BTreeMap::new();
    let mut product_qty: Vec<BreakdownEntry> = Vec::new();
    let mut channels: Vec<BreakdownEntry> = Vec::new();
    let mut hours: BTreeMap<u32, u64> = BTreeMap::new();
    let mut per_customer: BTreeMap<&str, Vec<chrono::DateTime<chrono::Utc>>> = BTreeMap::new();

    for order in orders {
        let day = order.created_at.format("%Y-%m-%d").to_string();
        *revenue_per_day.entry(day).or_default() += order.total;
        *hours.entry(order.created_at.hour()).or_default() += 1;
        per_customer
            .entry(order.customer_id.as_str())
            .or_default()
            .push(order.created_at);
        for item in &order.items {
            match product_qty.iter_mut().find(|e| e.label == item.sku) {
                Some(entry) => entry.value += item.qty as u64,
                None => product_qty.push(BreakdownEntry {
                    label: item.sku.clone(),
                    value: item.qty as u64,
                }),
            }
        }
        match channels.iter_mut().find(|e| e.label == order.channel) {
            Some(entry) => entry.value += 1,
            None => channels.push(BreakdownEntry {
                label: order.channel.clone(),
                value: 1,
            }),
        }
    }

    let mut recurrence = Recurrence::default();
    for dates in per_customer.values_mut() {
        dates.sort();
        if dates.len() < 2 {
            continue;
        }
        let first = dates[0];
        for (days, counter) in [
            (30, &mut recurrence.d30),
            (60, &mut recurrence.d60),
            (90, &mut recurrence.d90),
        ] {
            let limit = first + chrono::Duration::days(days);
            if dates.iter().filter(|d| **d <= limit).count() >= 2 {
                *counter += 1;
            }
        }
    }

    product_qty.sort_by(|a, b| b.value.cmp(&a.value));
    product_qty.truncate(20);
    channels.sort_by(|a, b| b.value.cmp(&a.value));

    let total: f64 = orders.iter().map(|o| o.total).sum();
    CommerceReport {
        total_orders: orders.len() as u64,
        avg_order_value: round2(total / orders.len() as f64),
        revenue: revenue_per_day
            .into_iter()
            .map(|(date, value)| RevenuePoint {
                date,
                value: round2(value),
            })
            .collect(),
        top_products: product_qty,
        conversion: rate(orders.len(), ticket_count),
        recurrence,
        peak_hours: hours
            .into_iter()
            .map(|(hour, value)| HourPoint { hour, value })
            .collect(),
        channels,
        templates: template_reports(template_stats),
    }
}
