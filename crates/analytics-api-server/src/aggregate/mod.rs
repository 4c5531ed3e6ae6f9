//! Pure aggregation functions over a filtered snapshot view. Everything here
//! is synchronous and allocation-bounded; the dispatcher decides budgets.

pub mod cohorts;
pub mod commerce;
pub mod geo;
pub mod quality;
pub mod sla;
pub mod stats;
pub mod volume;

pub use cohorts::{cohorts, CohortEntry};
pub use commerce::{commerce_report, template_reports, CommerceReport, TemplateReport};
pub use geo::{chronic_zones, heatmap, hotspots, points, HeatmapCell, POINTS_CAP};
pub use quality::{quality, QualityReport};
pub use sla::{efficiency, sla_report, EfficiencyReport, SlaReport};
pub use stats::{mean, percentile, rate, round2};
pub use volume::{breakdown, daily_series, dimension_key, BreakdownEntry, SeriesPoint};
