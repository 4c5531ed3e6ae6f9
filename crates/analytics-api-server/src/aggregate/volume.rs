use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::models::Ticket;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreakdownEntry {
    pub label: String,
    pub value: u64,
}

/// Group-count by an arbitrary extractor, descending by count. The sort is
/// stable, so ties keep first-encounter order.
pub fn breakdown<T, F>(items: &[&T], key: F) -> Vec<BreakdownEntry>
where
    F: Fn(&T) -> Option<String>,
{
    let mut counts: Vec<BreakdownEntry> = Vec::new();
    for item in items {
        let Some(label) = key(item) else { continue };
        match counts.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => entry.value += 1,
            None => counts.push(BreakdownEntry { label, value: 1 }),
        }
    }
    counts.sort_by(|a, b| b.value.cmp(&a.value));
    counts
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesPoint {
    pub date: String,
    pub value: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, u64>,
}

/// Ticket extractor for the secondary series dimension and the breakdown /
/// top endpoints. Unknown dimensions fall back to category.
pub fn dimension_key(ticket: &Ticket, dimension: &str) -> Option<String> {
    match dimension {
        "canal" => Some(ticket.channel.clone()),
        "estado" => Some(ticket.status.as_str().to_string()),
        "agente" => Some(
            ticket
                .assigned_agent_id
                .clone()
                .unwrap_or_else(|| "Sin asignar".into()),
        ),
        "zona" => Some(ticket.location.zone.clone()),
        "severidad" => Some(ticket.severity.clone()),
        _ => Some(ticket.category.clone()),
    }
}

/// Bucket tickets per calendar day, optionally splitting each day by a
/// secondary dimension.
pub fn daily_series(tickets: &[&Ticket], group: Option<&str>) -> Vec<SeriesPoint> {
    let mut days: BTreeMap<String, SeriesPoint> = BTreeMap::new();
    for ticket in tickets {
        let date = ticket.created_at.format("%Y-%m-%d").to_string();
        let point = days.entry(date.clone()).or_insert_with(|| SeriesPoint {
            date,
            value: 0,
            breakdown: BTreeMap::new(),
        });
        point.value += 1;
        if let Some(group) = group {
            if let Some(key) = dimension_key(ticket, group) {
                *point.breakdown.entry(key).or_default() += 1;
            }
        }
    }
    days.into_values().collect()
}
