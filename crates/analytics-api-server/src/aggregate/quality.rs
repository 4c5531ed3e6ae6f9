use std::collections::HashMap;

use serde::Serialize;

use super::stats::{mean, round2};
use crate::dataset::models::{Dataset, Survey, Ticket};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreEntry {
    pub label: String,
    pub average: f64,
    pub responses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub by_type: Vec<ScoreEntry>,
    pub by_agent: Vec<ScoreEntry>,
}

fn averaged(entries: Vec<(String, Vec<f64>)>) -> Vec<ScoreEntry> {
    entries
        .into_iter()
        .map(|(label, scores)| ScoreEntry {
            average: round2(mean(&scores)),
            responses: scores.len() as u64,
            label,
        })
        .collect()
}

/// Average survey score grouped by survey type, and separately by the agent
/// assigned to the referenced ticket. Only tickets carrying both an assignee
/// and a matching survey contribute to the per-agent averages.
pub fn quality(tickets: &[&Ticket], surveys: &[&Survey], dataset: &Dataset) -> QualityReport {
    let mut by_type: Vec<(String, Vec<f64>)> = Vec::new();
    for survey in surveys {
        let label = survey.kind.as_str();
        match by_type.iter_mut().find(|(l, _)| l == label) {
            Some((_, scores)) => scores.push(survey.score as f64),
            None => by_type.push((label.to_string(), vec![survey.score as f64])),
        }
    }

    let survey_by_ticket: HashMap<&str, &Survey> = surveys
        .iter()
        .map(|s| (s.ticket_id.as_str(), *s))
        .collect();

    let mut by_agent: Vec<(String, Vec<f64>)> = Vec::new();
    for ticket in tickets {
        let Some(agent_id) = &ticket.assigned_agent_id else {
            continue;
        };
        let Some(survey) = survey_by_ticket.get(ticket.id.as_str()) else {
            continue;
        };
        let label = dataset.agent_name(agent_id).unwrap_or(agent_id).to_string();
        match by_agent.iter_mut().find(|(l, _)| l == &label) {
            Some((_, scores)) => scores.push(survey.score as f64),
            None => by_agent.push((label, vec![survey.score as f64])),
        }
    }

    QualityReport {
        by_type: averaged(by_type),
        by_agent: averaged(by_agent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::models::SurveyKind;
    use crate::testutil::{dataset, survey, ticket};
    use chrono::{TimeZone, Utc};

    #[test]
    fn averages_group_by_survey_type() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let ds = dataset(vec![], vec![], vec![]);
        let s1 = survey("s1", "muni-centro", "t1", SurveyKind::Csat, 4, t0);
        let s2 = survey("s2", "muni-centro", "t2", SurveyKind::Csat, 2, t0);
        let s3 = survey("s3", "muni-centro", "t3", SurveyKind::Nps, 9, t0);
        let report = quality(&[], &[&s1, &s2, &s3], &ds);
        let csat = report.by_type.iter().find(|e| e.label == "CSAT").unwrap();
        assert_eq!(csat.average, 3.0);
        assert_eq!(csat.responses, 2);
        let nps = report.by_type.iter().find(|e| e.label == "NPS").unwrap();
        assert_eq!(nps.average, 9.0);
    }

    #[test]
    fn per_agent_requires_assignee_and_matching_survey() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let ds = dataset(vec![], vec![], vec![]);
        let mut assigned = ticket("t1", "muni-centro", t0);
        assigned.assigned_agent_id = Some("agente-1".into());
        let unassigned = ticket("t2", "muni-centro", t0);
        let mut no_survey = ticket("t3", "muni-centro", t0);
        no_survey.assigned_agent_id = Some("agente-1".into());
        let s1 = survey("s1", "muni-centro", "t1", SurveyKind::Csat, 5, t0);
        let s2 = survey("s2", "muni-centro", "t2", SurveyKind::Csat, 1, t0);
        let report = quality(&[&assigned, &unassigned, &no_survey], &[&s1, &s2], &ds);
        assert_eq!(report.by_agent.len(), 1);
        assert_eq!(report.by_agent[0].label, "Agente Norte");
        assert_eq!(report.by_agent[0].average, 5.0);
        assert_eq!(report.by_agent[0].responses, 1);
    }
}
