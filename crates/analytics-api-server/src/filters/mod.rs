use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::dataset::models::{Dataset, Order, Survey, Ticket};
use crate::utils::EngineError;

/// Canonical, validated query filter. Built once at the parse boundary;
/// resolvers only ever see this struct, never raw parameters.
#[derive(Debug, Clone, Serialize)]
pub struct FilterDescriptor {
    pub tenant_id: String,
    /// Day-aligned to 00:00:00.000 UTC.
    pub from: DateTime<Utc>,
    /// Day-aligned to 23:59:59.999 UTC.
    pub to: DateTime<Utc>,
    pub channel: Vec<String>,
    pub category: Vec<String>,
    pub status: Vec<String>,
    pub agent: Vec<String>,
    pub zone: Vec<String>,
    pub tags: Vec<String>,
    pub metric: String,
    pub group: Option<String>,
    pub dimension: String,
    pub subject: String,
    pub bbox: Option<[f64; 4]>,
    pub search: Option<String>,
}

fn parse_date(params: &HashMap<String, String>, field: &str) -> Result<NaiveDate, EngineError> {
    let raw = params
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EngineError::Validation(format!("missing required parameter {field}")))?;
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| EngineError::Validation(format!("parameter {field} is not a valid date")))
}

fn parse_list(params: &HashMap<String, String>, field: &str) -> Vec<String> {
    params
        .get(field)
        .map(|raw| {
            raw.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_bbox(params: &HashMap<String, String>) -> Result<Option<[f64; 4]>, EngineError> {
    let Some(raw) = params.get("bbox").map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| {
            EngineError::Validation(
                "parameter bbox must be four numbers (minLon,minLat,maxLon,maxLat)".into(),
            )
        })?;
    if parts.len() != 4 || parts.iter().any(|n| !n.is_finite()) {
        return Err(EngineError::Validation(
            "parameter bbox must be four finite numbers (minLon,minLat,maxLon,maxLat)".into(),
        ));
    }
    Ok(Some([parts[0], parts[1], parts[2], parts[3]]))
}

fn string_or<'a>(params: &'a HashMap<String, String>, field: &str, fallback: &'a str) -> String {
    params
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

impl FilterDescriptor {
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, EngineError> {
        let tenant_id = params
            .get("tenant_id")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EngineError::Validation("missing required parameter tenant_id".into()))?;

        let from_day = parse_date(params, "from")?;
        let to_day = parse_date(params, "to")?;
        if to_day < from_day {
            return Err(EngineError::Validation(
                "invalid date range: to must be greater than or equal to from".into(),
            ));
        }

        Ok(Self {
            tenant_id,
            from: Utc.from_utc_datetime(&from_day.and_hms_opt(0, 0, 0).expect("valid midnight")),
            to: Utc.from_utc_datetime(
                &to_day
                    .and_hms_milli_opt(23, 59, 59, 999)
                    .expect("valid end of day"),
            ),
            channel: parse_list(params, "canal"),
            category: parse_list(params, "categoria"),
            status: parse_list(params, "estado"),
            agent: parse_list(params, "agente"),
            zone: parse_list(params, "zona"),
            tags: parse_list(params, "etiquetas"),
            metric: string_or(params, "metric", "tickets_total"),
            group: params
                .get("group")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            dimension: string_or(params, "dimension", "categoria"),
            subject: string_or(params, "subject", "zonas"),
            bbox: parse_bbox(params)?,
            search: params
                .get("search")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

/// Empty multi-select means match-all; otherwise OR-match on the listed
/// values.
fn matches_multi(value: &str, selected: &[String]) -> bool {
    selected.is_empty() || selected.iter().any(|s| s == value)
}

/// Tags match on non-empty intersection.
fn matches_tags(ticket_tags: &[String], selected: &[String]) -> bool {
    if selected.is_empty() {
        return true;
    }
    ticket_tags.iter().any(|tag| selected.contains(tag))
}

fn matches_search(ticket: &Ticket, search: Option<&str>) -> bool {
    let Some(search) = search else { return true };
    let needle = search.to_lowercase();
    ticket.id.to_lowercase().contains(&needle)
        || ticket.location.district.to_lowercase().contains(&needle)
        || ticket.location.zone.to_lowercase().contains(&needle)
}

fn within_bbox(lat: f64, lon: f64, bbox: Option<&[f64; 4]>) -> bool {
    let Some([min_lon, min_lat, max_lon, max_lat]) = bbox else {
        return true;
    };
    lon >= *min_lon && lon <= *max_lon && lat >= *min_lat && lat <= *max_lat
}

fn matches_agent(ticket: &Ticket, dataset: &Dataset, selected: &[String]) -> bool {
    if selected.is_empty() {
        return true;
    }
    match &ticket.assigned_agent_id {
        None => selected.iter().any(|s| s == "Sin asignar"),
        Some(agent_id) => {
            let agent_name = dataset.agent_name(agent_id);
            selected
                .iter()
                .any(|s| s == agent_id || Some(s.as_str()) == agent_name)
        }
    }
}

/// Borrowed view over the snapshot: everything that passed the descriptor's
/// predicates for a single tenant.
pub struct FilteredView<'a> {
    pub tickets: Vec<&'a Ticket>,
    pub orders: Vec<&'a Order>,
    pub surveys: Vec<&'a Survey>,
}

pub fn apply<'a>(filters: &FilterDescriptor, dataset: &'a Dataset) -> FilteredView<'a> {
    let tickets: Vec<&Ticket> = dataset
        .tickets
        .iter()
        .filter(|ticket| {
            ticket.tenant_id == filters.tenant_id
                && ticket.created_at >= filters.from
                && ticket.created_at <= filters.to
                && matches_multi(&ticket.channel, &filters.channel)
                && matches_multi(&ticket.category, &filters.category)
                && matches_multi(ticket.status.as_str(), &filters.status)
                && matches_agent(ticket, dataset, &filters.agent)
                && matches_multi(&ticket.location.zone, &filters.zone)
                && matches_tags(&ticket.tags, &filters.tags)
                && matches_search(ticket, filters.search.as_deref())
                && within_bbox(ticket.location.lat, ticket.location.lon, filters.bbox.as_ref())
        })
        .collect();

    let orders: Vec<&Order> = dataset
        .orders
        .iter()
        .filter(|order| {
            order.tenant_id == filters.tenant_id
                && order.created_at >= filters.from
                && order.created_at <= filters.to
                && matches_multi(&order.channel, &filters.channel)
                && matches_multi(&order.zone, &filters.zone)
                && within_bbox(order.lat, order.lon, filters.bbox.as_ref())
        })
        .collect();

    let surveys: Vec<&Survey> = dataset
        .surveys
        .iter()
        .filter(|survey| {
            survey.tenant_id == filters.tenant_id
                && survey.timestamp >= filters.from
                && survey.timestamp <= filters.to
        })
        .collect();

    FilteredView {
        tickets,
        orders,
        surveys,
    }
}
