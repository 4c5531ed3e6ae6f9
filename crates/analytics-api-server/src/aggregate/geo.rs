use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::models::Ticket;

pub const POINTS_CAP: usize = 250;
pub const HOTSPOT_COUNT: usize = 10;
/// A zone is chronic when at least this many distinct weekly buckets each
/// carry at least CHRONIC_MIN_COUNT tickets. Weeks need not be consecutive.
pub const CHRONIC_MIN_WEEKS: usize = 4;
pub const CHRONIC_MIN_COUNT: u64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapCell {
    pub cell_id: String,
    pub count: u64,
    pub centroid: [f64; 2],
    pub breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChronicZone {
    pub zone: String,
    pub weeks: Vec<WeekCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekCount {
    pub week: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoPoint {
    pub cell_id: String,
    pub lat: f64,
    pub lon: f64,
    pub category: String,
    pub status: String,
}

/// Group tickets by geospatial cell; the centroid is the first point seen
/// in the cell.
pub fn heatmap(tickets: &[&Ticket]) -> Vec<HeatmapCell> {
    let mut cells: Vec<HeatmapCell> = Vec::new();
    for ticket in tickets {
        let cell_id = &ticket.location.cell_id;
        let cell = match cells.iter_mut().find(|c| &c.cell_id == cell_id) {
            Some(cell) => cell,
            None => {
                cells.push(HeatmapCell {
                    cell_id: cell_id.clone(),
                    count: 0,
                    centroid: [ticket.location.lat, ticket.location.lon],
                    breakdown: BTreeMap::new(),
                });
                cells.last_mut().expect("just pushed")
            }
        };
        cell.count += 1;
        *cell.breakdown.entry(ticket.category.clone()).or_default() += 1;
    }
    cells
}

/// Top cells by count.
pub fn hotspots(cells: &[HeatmapCell]) -> Vec<HeatmapCell> {
    let mut ranked = cells.to_vec();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(HOTSPOT_COUNT);
    ranked
}

/// Zones with sustained weekly volume. Buckets are ISO year-weeks.
pub fn chronic_zones(tickets: &[&Ticket]) -> Vec<ChronicZone> {
    let mut per_zone: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    for ticket in tickets {
        let week = ticket.created_at.format("%G-W%V").to_string();
        *per_zone
            .entry(ticket.location.zone.clone())
            .or_default()
            .entry(week)
            .or_default() += 1;
    }
    per_zone
        .into_iter()
        .filter_map(|(zone, weeks)| {
            let qualifying: Vec<WeekCount> = weeks
                .into_iter()
                .filter(|(_, count)| *count >= CHRONIC_MIN_COUNT)
                .map(|(week, count)| WeekCount { week, count })
                .collect();
            (qualifying.len() >= CHRONIC_MIN_WEEKS).then_some(ChronicZone {
                zone,
                weeks: qualifying,
            })
        })
        .collect()
}

/// Capped raw-point sample for map rendering.
pub fn points(tickets: &[&Ticket], cap: usize) -> Vec<GeoPoint> {
    tickets
        .iter()
        .take(cap)
        .map(|ticket| GeoPoint {
            cell_id: ticket.location.cell_id.clone(),
            lat: ticket.location.lat,
            lon: ticket.location.lon,
            category: ticket.category.clone(),
            status: ticket.status.as_str().to_string(),
        })
        .collect()
}
