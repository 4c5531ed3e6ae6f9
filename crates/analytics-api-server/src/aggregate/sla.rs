use serde::Serialize;

use super::stats::{percentile, rate, round2};
use crate::dataset::models::Ticket;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PercentileBuckets {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlaReport {
    pub ack: PercentileBuckets,
    pub resolve: PercentileBuckets,
}

fn buckets(samples: &[f64]) -> PercentileBuckets {
    // Clamp below at zero; generated data never goes negative but a loaded
    // snapshot might.
    PercentileBuckets {
        p50: round2(percentile(samples, 50.0).max(0.0)),
        p90: round2(percentile(samples, 90.0).max(0.0)),
        p95: round2(percentile(samples, 95.0).max(0.0)),
    }
}

/// Minutes to first response for every ticket in the view.
pub fn ack_minutes(tickets: &[&Ticket]) -> Vec<f64> {
    tickets
        .iter()
        .map(|t| (t.first_response_at - t.created_at).num_seconds() as f64 / 60.0)
        .collect()
}

/// Minutes to close, only for tickets that actually closed.
pub fn resolve_minutes(tickets: &[&Ticket]) -> Vec<f64> {
    tickets
        .iter()
        .filter_map(|t| {
            t.closed_at
                .map(|closed| (closed - t.created_at).num_seconds() as f64 / 60.0)
        })
        .collect()
}

pub fn sla_report(tickets: &[&Ticket]) -> SlaReport {
    SlaReport {
        ack: buckets(&ack_minutes(tickets)),
        resolve: buckets(&resolve_minutes(tickets)),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyReport {
    pub first_contact: f64,
    pub reopen_rate: f64,
    pub automation_rate: f64,
}

pub fn efficiency(tickets: &[&Ticket]) -> EfficiencyReport {
    let total = tickets.len();
    EfficiencyReport {
        first_contact: rate(
            tickets.iter().filter(|t| t.first_contact_resolved).count(),
            total,
        ),
        reopen_rate: rate(tickets.iter().filter(|t| t.reopen_count > 0).count(), total),
        automation_rate: rate(tickets.iter().filter(|t| t.automated).count(), total),
    }
}
