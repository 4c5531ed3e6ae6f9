use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant is the hard partition boundary: no query ever aggregates
/// across more than one tenant_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TenantKind,
    pub zones: Vec<String>,
    pub districts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKind {
    Municipio,
    Pyme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    pub team: String,
    pub tenant_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Operador,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Escalated,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Resolved and closed tickets carry a close timestamp; everything
    /// else counts as open workload.
    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Escalated => "escalated",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketSource {
    Bot,
    Human,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub district: String,
    pub zone: String,
    pub cell_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub tenant_id: String,
    pub channel: String,
    pub category: String,
    pub subcategory: String,
    pub status: TicketStatus,
    pub severity: String,
    pub created_at: DateTime<Utc>,
    pub first_response_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub location: Location,
    pub source: TicketSource,
    pub attachment_count: u32,
    pub tags: Vec<String>,
    pub assigned_agent_id: Option<String>,
    pub reopen_count: u32,
    pub automated: bool,
    pub first_contact_resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurveyKind {
    #[serde(rename = "NPS")]
    Nps,
    #[serde(rename = "CSAT")]
    Csat,
}

impl SurveyKind {
    /// Upper bound of the score scale (NPS 0-10, CSAT 0-5).
    pub fn max_score(&self) -> u8 {
        match self {
            SurveyKind::Nps => 10,
            SurveyKind::Csat => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyKind::Nps => "NPS",
            SurveyKind::Csat => "CSAT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub tenant_id: String,
    pub ticket_id: String,
    #[serde(rename = "type")]
    pub kind: SurveyKind,
    pub score: u8,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub qty: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: String,
    pub channel: String,
    pub created_at: DateTime<Utc>,
    pub zone: String,
    pub lat: f64,
    pub lon: f64,
    pub template_id: Option<String>,
    pub customer_id: String,
    pub customer_segment: CustomerSegment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    New,
    Returning,
    Premium,
}

/// Messaging-template delivery funnel counters. Invariant:
/// delivered <= sent, read <= delivered, replied <= read, blocked <= sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateStat {
    pub tenant_id: String,
    pub template_id: String,
    pub sent: u64,
    pub delivered: u64,
    pub read: u64,
    pub replied: u64,
    pub blocked: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub segment: CustomerSegment,
    pub preferred_channel: String,
}

/// The immutable full snapshot. Shared as `Arc<Dataset>`; never mutated in
/// place, only replaced wholesale by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub generated_at: DateTime<Utc>,
    pub tenants: Vec<Tenant>,
    pub agents: Vec<Agent>,
    pub tickets: Vec<Ticket>,
    pub surveys: Vec<Survey>,
    pub orders: Vec<Order>,
    pub template_stats: Vec<TemplateStat>,
    pub customers: Vec<Customer>,
}

impl Dataset {
    /// Minimum shape a persisted snapshot must have to be trusted.
    pub fn is_valid(&self) -> bool {
        !self.tickets.is_empty() && !self.orders.is_empty()
    }

    pub fn tenant(&self, tenant_id: &str) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.id == tenant_id)
    }

    pub fn agent_name(&self, agent_id: &str) -> Option<&str> {
        self.agents
            .iter()
            .find(|a| a.id == agent_id)
            .map(|a| a.name.as_str())
    }
}
