//! Hand-built fixtures for unit tests; small and explicit so each test can
//! state exactly the data it depends on.

use chrono::{DateTime, Utc};

use crate::dataset::models::*;

pub fn ticket(id: &str, tenant_id: &str, created_at: DateTime<Utc>) -> Ticket {
    Ticket {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        channel: "Web".into(),
        category: "Soporte".into(),
        subcategory: "General".into(),
        status: TicketStatus::Open,
        severity: "media".into(),
        created_at,
        first_response_at: created_at + chrono::Duration::minutes(30),
        closed_at: None,
        location: Location {
            lat: -34.6,
            lon: -58.4,
            district: "San Martin".into(),
            zone: "Centro".into(),
            cell_id: "cell-Centro-A".into(),
        },
        source: TicketSource::Human,
        attachment_count: 0,
        tags: vec![],
        assigned_agent_id: None,
        reopen_count: 0,
        automated: false,
        first_contact_resolved: false,
    }
}

pub fn resolved_ticket(id: &str, tenant_id: &str, created_at: DateTime<Utc>) -> Ticket {
    let mut t = ticket(id, tenant_id, created_at);
    t.status = TicketStatus::Resolved;
    t.closed_at = Some(created_at + chrono::Duration::hours(4));
    t
}

pub fn order(
    id: &str,
    tenant_id: &str,
    customer_id: &str,
    created_at: DateTime<Utc>,
    total: f64,
) -> Order {
    Order {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        items: vec![OrderItem {
            sku: "sku-101".into(),
            qty: 1,
            price: total,
        }],
        total,
        status: "delivered".into(),
        channel: "Whatsapp".into(),
        created_at,
        zone: "Capital".into(),
        lat: -34.6,
        lon: -58.38,
        template_id: Some("whatsapp_recordatorio".into()),
        customer_id: customer_id.to_string(),
        customer_segment: CustomerSegment::New,
    }
}

pub fn survey(
    id: &str,
    tenant_id: &str,
    ticket_id: &str,
    kind: SurveyKind,
    score: u8,
    timestamp: DateTime<Utc>,
) -> Survey {
    Survey {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        ticket_id: ticket_id.to_string(),
        kind,
        score,
        timestamp,
    }
}

pub fn dataset(tickets: Vec<Ticket>, orders: Vec<Order>, surveys: Vec<Survey>) -> Dataset {
    Dataset {
        generated_at: Utc::now(),
        tenants: vec![
            Tenant {
                id: "muni-centro".into(),
                name: "Municipio Centro".into(),
                kind: TenantKind::Municipio,
                zones: vec!["Centro".into(), "Norte".into()],
                districts: vec!["San Martin".into(), "Belgrano".into()],
            },
            Tenant {
                id: "pyme-tienda".into(),
                name: "PyME Tienda Express".into(),
                kind: TenantKind::Pyme,
                zones: vec!["Capital".into(), "Online".into()],
                districts: vec!["Comercial".into()],
            },
        ],
        agents: vec![
            Agent {
                id: "agente-1".into(),
                name: "Agente Norte".into(),
                role: AgentRole::Operador,
                team: "General".into(),
                tenant_ids: vec!["muni-centro".into()],
            },
            Agent {
                id: "agente-3".into(),
                name: "Agente PyME".into(),
                role: AgentRole::Operador,
                team: "Ventas".into(),
                tenant_ids: vec!["pyme-tienda".into()],
            },
        ],
        tickets,
        surveys,
        orders,
        template_stats: vec![],
        customers: vec![],
    }
}
