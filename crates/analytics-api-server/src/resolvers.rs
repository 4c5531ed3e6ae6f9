//! Endpoint payload builders. Each resolver is a pure function from a
//! snapshot plus a validated filter descriptor to a JSON body; the dispatcher
//! owns authorization, caching and execution budgets.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::aggregate::{
    breakdown, chronic_zones, cohorts, commerce_report, daily_series, dimension_key, efficiency,
    heatmap, hotspots, mean, points, quality, rate, round2, sla_report, template_reports,
    BreakdownEntry, POINTS_CAP,
};
use crate::dataset::models::{Dataset, TenantKind, Ticket};
use crate::filters::{self, FilterDescriptor};
use crate::security::AccessContext;
use crate::utils::EngineError;

pub const TOP_LIMIT: usize = 20;
/// An open ticket older than this is backlog.
pub const BACKLOG_HOURS: i64 = 72;
pub const ACK_BREACH_HOURS: i64 = 4;
pub const RESOLVE_BREACH_HOURS: i64 = 48;

/// Everything a resolver may look at for one request.
pub struct ResolverContext {
    pub dataset: Arc<Dataset>,
    pub filters: FilterDescriptor,
    pub access: AccessContext,
    pub now: DateTime<Utc>,
}

pub type ResolverResult = Result<Value, EngineError>;

fn to_value<T: Serialize>(payload: &T) -> ResolverResult {
    serde_json::to_value(payload).map_err(|err| EngineError::Internal(err.to_string()))
}

fn is_pyme(dataset: &Dataset, tenant_id: &str) -> bool {
    dataset
        .tenant(tenant_id)
        .map(|tenant| tenant.kind == TenantKind::Pyme)
        .unwrap_or(false)
}

fn tenant_template_stats<'a>(
    dataset: &'a Dataset,
    tenant_id: &str,
) -> Vec<&'a crate::dataset::models::TemplateStat> {
    dataset
        .template_stats
        .iter()
        .filter(|stat| stat.tenant_id == tenant_id)
        .collect()
}

pub fn summary(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    let open: Vec<&Ticket> = view
        .tickets
        .iter()
        .filter(|t| !t.status.is_closed())
        .copied()
        .collect();
    let backlog_threshold = ctx.now - Duration::hours(BACKLOG_HOURS);
    let backlog = open
        .iter()
        .filter(|t| t.created_at < backlog_threshold)
        .count();
    let attachments: u64 = view
        .tickets
        .iter()
        .map(|t| t.attachment_count as u64)
        .sum();

    let commerce = if is_pyme(&ctx.dataset, &ctx.filters.tenant_id) {
        let stats = tenant_template_stats(&ctx.dataset, &ctx.filters.tenant_id);
        let conversion_base = ctx
            .dataset
            .tickets
            .iter()
            .filter(|t| t.tenant_id == ctx.filters.tenant_id)
            .count();
        commerce_report(&view.orders, conversion_base, &stats)
    } else {
        crate::aggregate::CommerceReport::empty()
    };

    Ok(json!({
        "generated_at": ctx.now.to_rfc3339(),
        "tenant_id": ctx.filters.tenant_id,
        "totals": {
            "tickets": view.tickets.len(),
            "open": open.len(),
            "backlog": backlog,
            "attachments": attachments,
        },
        "sla": to_value(&sla_report(&view.tickets))?,
        "efficiency": to_value(&efficiency(&view.tickets))?,
        "volume": {
            "per_day": to_value(&daily_series(&view.tickets, None))?,
            "by_channel": to_value(&breakdown(&view.tickets, |t: &Ticket| Some(t.channel.clone())))?,
            "by_category": to_value(&breakdown(&view.tickets, |t: &Ticket| Some(t.category.clone())))?,
            "by_zone": to_value(&breakdown(&view.tickets, |t: &Ticket| Some(t.location.zone.clone())))?,
        },
        "quality": to_value(&quality(&view.tickets, &view.surveys, &ctx.dataset))?,
        "commerce": to_value(&commerce)?,
    }))
}

pub fn timeseries(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    Ok(json!({
        "metric": ctx.filters.metric,
        "group": ctx.filters.group,
        "series": to_value(&daily_series(&view.tickets, ctx.filters.group.as_deref()))?,
    }))
}

pub fn breakdown_by_dimension(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    let dimension = ctx.filters.dimension.as_str();
    let items = if dimension == "agente" {
        // Label by display name so the payload matches the filter catalog.
        breakdown(&view.tickets, |t: &Ticket| {
            Some(match &t.assigned_agent_id {
                Some(id) => ctx.dataset.agent_name(id).unwrap_or(id).to_string(),
                None => "Sin asignar".to_string(),
            })
        })
    } else {
        breakdown(&view.tickets, |t: &Ticket| dimension_key(t, dimension))
    };
    Ok(json!({
        "dimension": dimension,
        "items": to_value(&items)?,
    }))
}

pub fn geo_heatmap(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    let cells = heatmap(&view.tickets);
    Ok(json!({
        "cells": to_value(&cells)?,
        "hotspots": to_value(&hotspots(&cells))?,
        "chronic": to_value(&chronic_zones(&view.tickets))?,
    }))
}

pub fn geo_points(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    Ok(json!({
        "points": to_value(&points(&view.tickets, POINTS_CAP))?,
    }))
}

pub fn top(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    let subject = ctx.filters.subject.as_str();
    let mut items: Vec<BreakdownEntry> = match subject {
        "zonas" => breakdown(&view.tickets, |t: &Ticket| Some(t.location.zone.clone())),
        "barrios" => breakdown(&view.tickets, |t: &Ticket| Some(t.location.district.clone())),
        "productos" => {
            let mut by_sku: Vec<BreakdownEntry> = Vec::new();
            for order in &view.orders {
                for item in &order.items {
                    match by_sku.iter_mut().find(|e| e.label == item.sku) {
                        Some(entry) => entry.value += item.qty as u64,
                        None => by_sku.push(BreakdownEntry {
                            label: item.sku.clone(),
                            value: item.qty as u64,
                        }),
                    }
                }
            }
            by_sku.sort_by(|a, b| b.value.cmp(&a.value));
            by_sku
        }
        other => breakdown(&view.tickets, |t: &Ticket| dimension_key(t, other)),
    };
    items.truncate(TOP_LIMIT);
    Ok(json!({
        "subject": subject,
        "items": to_value(&items)?,
    }))
}

#[derive(Serialize)]
struct AgingBuckets {
    #[serde(rename = "0-4h")]
    b0_4h: u64,
    #[serde(rename = "4-24h")]
    b4_24h: u64,
    #[serde(rename = "1-3d")]
    b1_3d: u64,
    #[serde(rename = "3-7d")]
    b3_7d: u64,
    #[serde(rename = "+7d")]
    b7d_plus: u64,
}

#[derive(Serialize)]
struct AgentWorkload {
    agent: String,
    open: u64,
    mean_age_hours: f64,
    satisfaction: f64,
}

pub fn operations(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    let open: Vec<&Ticket> = view
        .tickets
        .iter()
        .filter(|t| !t.status.is_closed())
        .copied()
        .collect();

    let sla_breaches = open
        .iter()
        .filter(|t| {
            let ack_exceeded =
                t.first_response_at - t.created_at > Duration::hours(ACK_BREACH_HOURS);
            let open_exceeded = ctx.now - t.created_at > Duration::hours(RESOLVE_BREACH_HOURS);
            ack_exceeded || open_exceeded
        })
        .count();

    let automated = open.iter().filter(|t| t.automated).count();

    let mut buckets = AgingBuckets {
        b0_4h: 0,
        b4_24h: 0,
        b1_3d: 0,
        b3_7d: 0,
        b7d_plus: 0,
    };
    for ticket in &open {
        let age_hours = (ctx.now - ticket.created_at).num_seconds() as f64 / 3600.0;
        if age_hours <= 4.0 {
            buckets.b0_4h += 1;
        } else if age_hours <= 24.0 {
            buckets.b4_24h += 1;
        } else if age_hours <= 72.0 {
            buckets.b1_3d += 1;
        } else if age_hours <= 168.0 {
            buckets.b3_7d += 1;
        } else {
            buckets.b7d_plus += 1;
        }
    }

    struct AgentAccum {
        open: u64,
        total_age_hours: f64,
        scores: Vec<f64>,
    }
    let mut per_agent: Vec<(String, AgentAccum)> = Vec::new();
    fn accum_for(agents: &mut Vec<(String, AgentAccum)>, id: &str) -> usize {
        match agents.iter().position(|(agent_id, _)| agent_id == id) {
            Some(pos) => pos,
            None => {
                agents.push((
                    id.to_string(),
                    AgentAccum {
                        open: 0,
                        total_age_hours: 0.0,
                        scores: Vec::new(),
                    },
                ));
                agents.len() - 1
            }
        }
    }

    for ticket in &open {
        let id = ticket.assigned_agent_id.as_deref().unwrap_or("sin_asignar");
        let pos = accum_for(&mut per_agent, id);
        per_agent[pos].1.open += 1;
        per_agent[pos].1.total_age_hours +=
            (ctx.now - ticket.created_at).num_seconds() as f64 / 3600.0;
    }

    // Satisfaction comes from every tenant survey whose ticket landed in the
    // filtered view with an assignee.
    let ticket_by_id: HashMap<&str, &Ticket> = view
        .tickets
        .iter()
        .map(|t| (t.id.as_str(), *t))
        .collect();
    for survey in ctx
        .dataset
        .surveys
        .iter()
        .filter(|s| s.tenant_id == ctx.filters.tenant_id)
    {
        let Some(ticket) = ticket_by_id.get(survey.ticket_id.as_str()) else {
            continue;
        };
        let Some(agent_id) = &ticket.assigned_agent_id else {
            continue;
        };
        let pos = accum_for(&mut per_agent, agent_id);
        per_agent[pos].1.scores.push(survey.score as f64);
    }

    let agents: Vec<AgentWorkload> = per_agent
        .into_iter()
        .map(|(agent_id, accum)| AgentWorkload {
            agent: ctx
                .dataset
                .agent_name(&agent_id)
                .unwrap_or(&agent_id)
                .to_string(),
            open: accum.open,
            mean_age_hours: if accum.open > 0 {
                round2(accum.total_age_hours / accum.open as f64)
            } else {
                0.0
            },
            satisfaction: round2(mean(&accum.scores)),
        })
        .collect();

    Ok(json!({
        "open": open.len(),
        "sla_breaches": sla_breaches,
        "automated": automated,
        "automation_rate": rate(automated, open.len()),
        "aging_buckets": to_value(&buckets)?,
        "agents": to_value(&agents)?,
    }))
}

pub fn cohort_retention(ctx: &ResolverContext) -> ResolverResult {
    let view = filters::apply(&ctx.filters, &ctx.dataset);
    Ok(json!({
        "cohorts": to_value(&cohorts(&view.orders))?,
    }))
}

pub fn templates(ctx: &ResolverContext) -> ResolverResult {
    let stats = tenant_template_stats(&ctx.dataset, &ctx.filters.tenant_id);
    Ok(json!({
        "templates": to_value(&template_reports(&stats))?,
    }))
}

fn sorted_distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = values.collect();
    out.sort();
    out.dedup();
    out
}

/// Distinct-value catalogs for filter UI population. Deliberately scoped to
/// the tenant but not the date range, so controls stay stable as the range
/// moves.
pub fn filter_catalog(ctx: &ResolverContext) -> ResolverResult {
    let dataset = &ctx.dataset;
    let tenant_tickets: Vec<&Ticket> = dataset
        .tickets
        .iter()
        .filter(|t| t.tenant_id == ctx.filters.tenant_id)
        .collect();

    let mut agents = sorted_distinct(tenant_tickets.iter().filter_map(|t| {
        t.assigned_agent_id
            .as_deref()
            .map(|id| dataset.agent_name(id).unwrap_or(id).to_string())
    }));
    if tenant_tickets.iter().any(|t| t.assigned_agent_id.is_none()) {
        agents.push("Sin asignar".to_string());
        agents.sort();
    }

    let tenants: Vec<String> = if ctx.access.allowed_tenants.is_empty() {
        dataset.tenants.iter().map(|t| t.id.clone()).collect()
    } else {
        ctx.access.allowed_tenants.clone()
    };
    let tenant = dataset.tenant(&ctx.filters.tenant_id);
    let default_context = match tenant.map(|t| t.kind) {
        Some(TenantKind::Pyme) => "pyme",
        _ => "municipio",
    };

    Ok(json!({
        "channels": sorted_distinct(tenant_tickets.iter().map(|t| t.channel.clone())),
        "categories": sorted_distinct(tenant_tickets.iter().map(|t| t.category.clone())),
        "statuses": sorted_distinct(tenant_tickets.iter().map(|t| t.status.as_str().to_string())),
        "agents": agents,
        "zones": sorted_distinct(tenant_tickets.iter().map(|t| t.location.zone.clone())),
        "tags": sorted_distinct(tenant_tickets.iter().flat_map(|t| t.tags.iter().cloned())),
        "tenants": tenants,
        "default_tenant_id": ctx.access.default_tenant.clone()
            .or_else(|| tenant.map(|t| t.id.clone())),
        "default_context": default_context,
        "contexts": ["municipio", "pyme", "operaciones"],
    }))
}

pub fn dataset_totals(dataset: &Dataset) -> Value {
    json!({
        "tenants": dataset.tenants.len(),
        "tickets": dataset.tickets.len(),
        "orders": dataset.orders.len(),
        "surveys": dataset.surveys.len(),
    })
}
