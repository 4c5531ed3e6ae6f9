use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use super::models::*;

/// Tunables for the synthetic snapshot. Defaults match the reference
/// dataset: 6,000 tickets and 180 customers over a 90-day span.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub tickets: usize,
    pub customers: usize,
    pub span_days: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tickets: 6_000,
            customers: 180,
            span_days: 90,
        }
    }
}

/// Weighted random choice via cumulative-weight scan: draw u * totalWeight,
/// walk entries accumulating weight until the running sum covers the draw.
fn weighted_choice<'a, T>(rng: &mut StdRng, entries: &'a [(T, f64)]) -> &'a T {
    let total: f64 = entries.iter().map(|(_, w)| w).sum();
    let target = rng.random::<f64>() * total;
    let mut cursor = 0.0;
    for (value, weight) in entries {
        cursor += weight;
        if target <= cursor {
            return value;
        }
    }
    &entries[entries.len() - 1].0
}

fn choice<'a, T>(rng: &mut StdRng, list: &'a [T]) -> &'a T {
    &list[rng.random_range(0..list.len())]
}

/// Deterministic id suffix drawn from the seeded stream, so snapshots are
/// byte-reproducible for a given seed and anchor instant.
fn id_suffix(rng: &mut StdRng) -> String {
    format!("{:08x}", rng.random::<u32>())
}

fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn tenants() -> Vec<Tenant> {
    vec![
        Tenant {
            id: "muni-centro".into(),
            name: "Municipio Centro".into(),
            kind: TenantKind::Municipio,
            zones: ["Centro", "Norte", "Sur", "Este", "Oeste", "Costanera", "Industrial"]
                .map(String::from)
                .to_vec(),
            districts: ["San Martin", "Belgrano", "Independencia", "Mitre", "Saavedra", "Dorrego"]
                .map(String::from)
                .to_vec(),
        },
        Tenant {
            id: "muni-sur".into(),
            name: "Municipio Sur".into(),
            kind: TenantKind::Municipio,
            zones: ["Rio", "Colinas", "Valle Verde", "Puerto", "Aeropuerto", "Parque"]
                .map(String::from)
                .to_vec(),
            districts: ["Amanecer", "Bosques", "Puente", "Maritimo", "Cordillera"]
                .map(String::from)
                .to_vec(),
        },
        Tenant {
            id: "pyme-tienda".into(),
            name: "PyME Tienda Express".into(),
            kind: TenantKind::Pyme,
            zones: ["Capital", "Interior", "Online", "Noroeste", "Litoral"]
                .map(String::from)
                .to_vec(),
            districts: ["Comercial", "Residencial", "Oficinas", "Mercado", "Universidad"]
                .map(String::from)
                .to_vec(),
        },
    ]
}

fn agents(tenants: &[Tenant]) -> Vec<Agent> {
    vec![
        Agent {
            id: "agente-1".into(),
            name: "Agente Norte".into(),
            role: AgentRole::Operador,
            team: "General".into(),
            tenant_ids: vec!["muni-centro".into()],
        },
        Agent {
            id: "agente-2".into(),
            name: "Agente Sur".into(),
            role: AgentRole::Operador,
            team: "General".into(),
            tenant_ids: vec!["muni-sur".into()],
        },
        Agent {
            id: "agente-3".into(),
            name: "Agente PyME".into(),
            role: AgentRole::Operador,
            team: "Ventas".into(),
            tenant_ids: vec!["pyme-tienda".into()],
        },
        Agent {
            id: "agente-4".into(),
            name: "Super Admin".into(),
            role: AgentRole::Admin,
            team: "Coordinacion".into(),
            tenant_ids: tenants.iter().map(|t| t.id.clone()).collect(),
        },
    ]
}

const CATEGORIES: &[&str] = &[
    "Alumbrado",
    "Recoleccion",
    "Seguridad",
    "Transporte",
    "Salud",
    "Comercio",
    "Atencion",
    "Pedidos",
    "Soporte",
];
const CHANNELS: &[&str] = &["Whatsapp", "Web", "App", "Presencial", "Telefonico"];
const SEVERITIES: &[&str] = &["baja", "media", "alta"];
const TAGS: &[&str] = &["urgente", "vip", "reincidente", "derivado_bot", "prioridad"];
const TEMPLATE_CATALOG: &[&str] = &[
    "whatsapp_aviso_envio",
    "whatsapp_confirmacion_pago",
    "whatsapp_recordatorio",
    "whatsapp_reengagement",
];

const PRODUCTS: &[(&str, f64)] = &[
    ("sku-101", 23_000.0),
    ("sku-102", 43_000.0),
    ("sku-103", 12_000.0),
    ("sku-104", 16_000.0),
    ("sku-105", 8_000.0),
];

fn zone_coordinates(zone: &str) -> (f64, f64) {
    match zone {
        "Centro" => (-34.6037, -58.3816),
        "Norte" => (-34.5306, -58.4799),
        "Sur" => (-34.6815, -58.3712),
        "Este" => (-34.6032, -58.3312),
        "Oeste" => (-34.6045, -58.4505),
        "Costanera" => (-34.598, -58.362),
        "Industrial" => (-34.6905, -58.4605),
        "Rio" => (-34.7001, -58.3611),
        "Colinas" => (-34.7204, -58.4011),
        "Valle Verde" => (-34.735, -58.333),
        "Puerto" => (-34.7033, -58.3201),
        "Aeropuerto" => (-34.8105, -58.5315),
        "Parque" => (-34.7502, -58.4201),
        "Capital" => (-34.6037, -58.3816),
        "Interior" => (-32.8895, -68.8458),
        "Online" => (-34.5201, -58.7001),
        "Noroeste" => (-24.7893, -65.4106),
        "Litoral" => (-27.4515, -58.9865),
        _ => (-34.6, -58.4),
    }
}

/// Coarse lat/lon bucket key. Points in the same ~1km-ish bucket around a
/// zone centroid share a cell.
fn cell_id(zone: &str) -> String {
    let (lat, lon) = zone_coordinates(zone);
    format!(
        "cell-{}-{}-{}",
        zone.replace(' ', "_"),
        (lat * 100.0).round() as i64,
        (lon * 100.0).round() as i64
    )
}

/// Build the full snapshot in one pass. `now` anchors every generated
/// timestamp so tests can pin the clock.
pub fn generate(cfg: &GeneratorConfig, now: DateTime<Utc>) -> Dataset {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let tenants = tenants();
    let agents = agents(&tenants);

    let segment_weights: [(CustomerSegment, f64); 3] = [
        (CustomerSegment::New, 1.6),
        (CustomerSegment::Returning, 1.2),
        (CustomerSegment::Premium, 0.6),
    ];
    let channel_pref_weights: [(&str, f64); 3] = [("Whatsapp", 2.5), ("Web", 1.5), ("App", 1.0)];

    let customers: Vec<Customer> = (0..cfg.customers)
        .map(|i| Customer {
            id: format!("cliente-{}", i + 1),
            segment: *weighted_choice(&mut rng, &segment_weights),
            preferred_channel: weighted_choice(&mut rng, &channel_pref_weights).to_string(),
        })
        .collect();

    let status_weights: [(TicketStatus, f64); 5] = [
        (TicketStatus::Open, 1.0),
        (TicketStatus::InProgress, 2.0),
        (TicketStatus::Escalated, 1.5),
        (TicketStatus::Resolved, 3.0),
        (TicketStatus::Closed, 2.5),
    ];
    let order_status_weights: [(&str, f64); 5] = [
        ("new", 1.5),
        ("processing", 2.0),
        ("shipped", 1.8),
        ("delivered", 2.5),
        ("cancelled", 0.3),
    ];
    let order_channel_weights: [(&str, f64); 4] =
        [("Whatsapp", 2.8), ("Web", 1.5), ("App", 0.9), ("Presencial", 0.8)];

    let span_minutes = cfg.span_days * 24 * 60;
    let mut tickets = Vec::with_capacity(cfg.tickets);
    let mut surveys = Vec::new();
    let mut orders = Vec::new();

    for i in 0..cfg.tickets {
        let tenant = choice(&mut rng, &tenants).clone();
        let created_at = now - Duration::minutes((rng.random::<f64>() * span_minutes as f64) as i64);
        let response_minutes = (rng.random::<f64>() * 360.0) as i64;
        let resolved_minutes = response_minutes + (rng.random::<f64>() * 720.0) as i64;
        let first_response_at = created_at + Duration::minutes(response_minutes);
        let status = *weighted_choice(&mut rng, &status_weights);
        let closed_at = status
            .is_closed()
            .then(|| created_at + Duration::minutes(resolved_minutes));

        let zone = choice(&mut rng, &tenant.zones).clone();
        let district = choice(&mut rng, &tenant.districts).clone();
        let (base_lat, base_lon) = zone_coordinates(&zone);
        let eligible: Vec<&Agent> = agents
            .iter()
            .filter(|a| a.tenant_ids.contains(&tenant.id))
            .collect();
        let assigned = (!eligible.is_empty() && rng.random::<f64>() < 0.9)
            .then(|| choice(&mut rng, &eligible).id.clone());
        let automated = rng.random::<f64>()
            < if tenant.kind == TenantKind::Pyme { 0.35 } else { 0.25 };
        let reopen_count = if rng.random::<f64>() < 0.12 {
            rng.random_range(1..=3u32)
        } else {
            0
        };

        let ticket = Ticket {
            id: format!("ticket-{}-{}", i, id_suffix(&mut rng)),
            tenant_id: tenant.id.clone(),
            channel: choice(&mut rng, CHANNELS).to_string(),
            category: choice(&mut rng, CATEGORIES).to_string(),
            subcategory: choice(&mut rng, CATEGORIES).to_string(),
            status,
            severity: choice(&mut rng, SEVERITIES).to_string(),
            created_at,
            first_response_at,
            closed_at,
            location: Location {
                lat: round(base_lat + (rng.random::<f64>() - 0.5) * 0.02, 6),
                lon: round(base_lon + (rng.random::<f64>() - 0.5) * 0.02, 6),
                district,
                zone: zone.clone(),
                cell_id: cell_id(&zone),
            },
            source: if automated { TicketSource::Bot } else { TicketSource::Human },
            attachment_count: rng.random_range(0..4),
            tags: TAGS
                .iter()
                .filter(|_| rng.random::<f64>() < 0.2)
                .map(|t| t.to_string())
                .collect(),
            assigned_agent_id: assigned,
            reopen_count,
            automated,
            first_contact_resolved: rng.random::<f64>() < 0.68,
        };

        if rng.random::<f64>() < 0.65 {
            let kind = if tenant.kind == TenantKind::Pyme {
                SurveyKind::Nps
            } else {
                SurveyKind::Csat
            };
            let base = if kind == SurveyKind::Nps {
                6 + rng.random_range(0..5)
            } else {
                3 + rng.random_range(0..3)
            };
            let jitter: i32 = rng.random_range(-1..=1);
            surveys.push(Survey {
                id: format!("survey-{}-{}", i, id_suffix(&mut rng)),
                tenant_id: tenant.id.clone(),
                ticket_id: ticket.id.clone(),
                kind,
                score: (base as i32 + jitter).clamp(0, kind.max_score() as i32) as u8,
                timestamp: created_at
                    + Duration::minutes((rng.random::<f64>() * resolved_minutes as f64) as i64),
            });
        }

        if tenant.kind == TenantKind::Pyme && rng.random::<f64>() < 0.7 {
            let items: Vec<OrderItem> = (0..rng.random_range(1..=3))
                .map(|_| {
                    let (sku, price) = choice(&mut rng, PRODUCTS);
                    OrderItem {
                        sku: sku.to_string(),
                        qty: rng.random_range(1..=3),
                        price: *price,
                    }
                })
                .collect();
            let total = items.iter().map(|it| it.qty as f64 * it.price).sum();
            let customer = choice(&mut rng, &customers);
            orders.push(Order {
                id: format!("order-{}-{}", i, id_suffix(&mut rng)),
                tenant_id: tenant.id.clone(),
                items,
                total,
                status: weighted_choice(&mut rng, &order_status_weights).to_string(),
                channel: weighted_choice(&mut rng, &order_channel_weights).to_string(),
                created_at,
                zone: zone.clone(),
                lat: ticket.location.lat,
                lon: ticket.location.lon,
                template_id: Some(choice(&mut rng, TEMPLATE_CATALOG).to_string()),
                customer_id: customer.id.clone(),
                customer_segment: customer.segment,
            });
        }

        tickets.push(ticket);
    }

    let template_stats = build_template_stats(&mut rng, &tenants, &orders);

    info!(
        tickets = tickets.len(),
        orders = orders.len(),
        surveys = surveys.len(),
        seed = cfg.seed,
        "dataset generated"
    );

    Dataset {
        generated_at: now,
        tenants,
        agents,
        tickets,
        surveys,
        orders,
        template_stats,
        customers,
    }
}

/// Derive delivery funnels from order volume per template, keeping every
/// counter within the funnel invariant (replied <= read <= delivered <= sent).
fn build_template_stats(rng: &mut StdRng, tenants: &[Tenant], orders: &[Order]) -> Vec<TemplateStat> {
    use std::collections::BTreeMap;

    let mut sent: BTreeMap<(String, String), u64> = BTreeMap::new();
    for order in orders {
        if let Some(template_id) = &order.template_id {
            *sent
                .entry((order.tenant_id.clone(), template_id.clone()))
                .or_default() += 1;
        }
    }
    // Every pyme tenant reports the whole catalog, including templates that
    // never went out.
    for tenant in tenants.iter().filter(|t| t.kind == TenantKind::Pyme) {
        for template in TEMPLATE_CATALOG {
            sent.entry((tenant.id.clone(), template.to_string()))
                .or_default();
        }
    }

    sent.into_iter()
        .map(|((tenant_id, template_id), sent)| {
            let delivered = (sent as f64 * (0.9 + rng.random::<f64>() * 0.1)) as u64;
            let read = (delivered as f64 * (0.6 + rng.random::<f64>() * 0.3)) as u64;
            let replied = (read as f64 * (0.4 + rng.random::<f64>() * 0.4)) as u64;
            let blocked = (sent as f64 * rng.random::<f64>() * 0.05) as u64;
            TemplateStat {
                tenant_id,
                template_id,
                sent,
                delivered,
                read,
                replied,
                blocked,
            }
        })
        .collect()
}
