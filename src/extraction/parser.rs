//! Reply parsing and validation for the extraction pipeline.
//!
//! The oracle's reply is untrusted text: it may wrap the JSON array in prose
//! or code fences, drop fields, invent status labels, or emit dates in the
//! wrong shape. This module finds the array, parses it, and normalizes every
//! element independently so one bad element never sinks the batch. Every task
//! that comes out satisfies the record invariants: canonical status, no empty
//! required fields, real calendar dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::oracle::OracleError;
use crate::types::{ExtractedTask, PlanStatus, UNSPECIFIED};

/// Errors that abort an import attempt.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The reply contained no JSON array substring at all.
    #[error("no JSON array found in model reply")]
    Format,
    /// An array substring was located but is not valid JSON.
    #[error("malformed JSON array in model reply: {0}")]
    Parse(#[from] serde_json::Error),
    /// The oracle call itself failed.
    #[error("text model call failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Wire shape of one reply element, exactly as the prompt contract names the
/// fields. Everything is optional — field presence is never trusted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTask {
    date_time: Option<String>,
    sector: Option<String>,
    assignee: Option<String>,
    investment: Option<String>,
    action: Option<String>,
    solution: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    status: Option<String>,
    observations: Option<String>,
}

/// Locate the first balanced `[...]` substring in the reply.
///
/// Bracket depth is tracked with string/escape awareness, so brackets inside
/// JSON string values don't terminate the scan. Code-fenced replies fall out
/// of the same scan — the fence is just surrounding prose.
pub(crate) fn find_json_array(reply: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = reply[search_from..].find('[') {
        let start = search_from + offset;
        if let Some(len) = balanced_array_len(&reply[start..]) {
            return Some(&reply[start..start + len]);
        }
        search_from = start + 1;
    }
    None
}

/// Length of the balanced array starting at the first byte of `candidate`,
/// or None if the opening bracket never closes.
fn balanced_array_len(candidate: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse an oracle reply into normalized tasks.
///
/// No array → [`ExtractionError::Format`]; invalid JSON in the located array
/// → [`ExtractionError::Parse`]. An empty array is a valid empty result.
pub fn parse_tasks(reply: &str) -> Result<Vec<ExtractedTask>, ExtractionError> {
    let raw = find_json_array(reply).ok_or(ExtractionError::Format)?;
    let elements: Vec<serde_json::Value> = serde_json::from_str(raw)?;

    let now = Utc::now();
    let today = now.date_naive();

    let mut tasks = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<RawTask>(element) {
            Ok(raw_task) => tasks.push(normalize(raw_task, now, today)),
            Err(e) => {
                log::warn!("skipping unusable element {} in model reply: {}", index, e);
            }
        }
    }
    Ok(tasks)
}

fn normalize(raw: RawTask, now: DateTime<Utc>, today: NaiveDate) -> ExtractedTask {
    ExtractedTask {
        // Unparseable timestamps fall back to now, dates to today — a
        // documented leniency; records are never dropped over a bad date.
        date_time: raw
            .date_time
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now),
        department: required(raw.sector),
        responsible: required(raw.assignee),
        investment: required(raw.investment),
        action: required(raw.action),
        solution: required(raw.solution),
        start_date: raw
            .start_date
            .as_deref()
            .and_then(parse_calendar_date)
            .unwrap_or(today),
        end_date: raw
            .end_date
            .as_deref()
            .and_then(parse_calendar_date)
            .unwrap_or(today),
        status: PlanStatus::normalize(raw.status.as_deref().unwrap_or("")),
        notes: raw.observations.filter(|s| !s.trim().is_empty()),
    }
}

/// Absent or blank required fields get the sentinel, never an empty cell.
fn required(field: Option<String>) -> String {
    match field {
        Some(s) if !s.trim().is_empty() => s,
        _ => UNSPECIFIED.to_string(),
    }
}

/// Lenient timestamp parsing: RFC 3339 first, then the shapes the model
/// actually emits, then date-only forms at midnight.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    parse_calendar_date(s)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Calendar-date parsing: ISO first, then the Brazilian day-first form, then
/// the date component of timestamp-shaped values.
fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_minutes_scenario() {
        let reply = r#"[{"dateTime":"2024-01-10 09:00","sector":"TI","assignee":"João","action":"Atualizar servidores","solution":"-","startDate":"2024-01-10","endDate":"2024-01-15","status":"em andamento"}]"#;

        let tasks = parse_tasks(reply).unwrap();
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert_eq!(task.status, PlanStatus::Progress);
        assert_eq!(task.start_date, date(2024, 1, 10));
        assert_eq!(task.end_date, date(2024, 1, 15));
        assert_eq!(task.department, "TI");
        assert_eq!(task.responsible, "João");
        assert_eq!(task.action, "Atualizar servidores");
        assert_eq!(task.investment, UNSPECIFIED);
        assert_eq!(task.notes, None);
        assert_eq!(
            task.date_time,
            "2024-01-10T09:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_parse_reply_without_array_is_format_error() {
        let reply = "Desculpe, não encontrei nenhum plano de ação.";
        assert!(matches!(parse_tasks(reply), Err(ExtractionError::Format)));
    }

    #[test]
    fn test_parse_reply_with_malformed_array_is_parse_error() {
        let reply = "Aqui está: [{sector: TI,}]";
        assert!(matches!(parse_tasks(reply), Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Claro! Segue o resultado:\n```json\n[{\"action\":\"Trocar filtro\",\"status\":\"concluído\"}]\n```\nEspero ter ajudado.";

        let tasks = parse_tasks(reply).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].action, "Trocar filtro");
        assert_eq!(tasks[0].status, PlanStatus::Complete);
    }

    #[test]
    fn test_parse_empty_array_is_valid_empty_result() {
        assert_eq!(parse_tasks("Nenhum plano: []").unwrap().len(), 0);
    }

    #[test]
    fn test_parse_skips_non_object_elements() {
        let _ = env_logger::builder().is_test(true).try_init();
        let reply = r#"[1, {"action":"Revisar contrato"}, "texto solto"]"#;
        let tasks = parse_tasks(reply).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].action, "Revisar contrato");
    }

    #[test]
    fn test_parse_empty_object_gets_sentinels_and_fallback_dates() {
        let before = Utc::now();
        let tasks = parse_tasks("[{}]").unwrap();
        let after = Utc::now();

        let task = &tasks[0];
        assert_eq!(task.department, UNSPECIFIED);
        assert_eq!(task.responsible, UNSPECIFIED);
        assert_eq!(task.investment, UNSPECIFIED);
        assert_eq!(task.action, UNSPECIFIED);
        assert_eq!(task.solution, UNSPECIFIED);
        assert_eq!(task.status, PlanStatus::Progress);
        assert!(task.date_time >= before && task.date_time <= after);
        assert_eq!(task.start_date, task.date_time.date_naive());
    }

    #[test]
    fn test_parse_unparseable_dates_fall_back() {
        let reply = r#"[{"action":"a","dateTime":"em breve","startDate":"amanhã","endDate":"???"}]"#;
        let before = Utc::now();
        let tasks = parse_tasks(reply).unwrap();

        let task = &tasks[0];
        assert!(task.date_time >= before);
        assert_eq!(task.start_date, Utc::now().date_naive());
        assert_eq!(task.end_date, Utc::now().date_naive());
    }

    #[test]
    fn test_parse_status_synonyms_map_to_canonical() {
        let cases = [
            ("em andamento", PlanStatus::Progress),
            ("a fazer", PlanStatus::Progress),
            ("progress", PlanStatus::Progress),
            ("Concluído", PlanStatus::Complete),
            ("complete", PlanStatus::Complete),
            ("atrasado", PlanStatus::Overdue),
            ("OVERDUE", PlanStatus::Overdue),
            ("algo estranho", PlanStatus::Progress),
        ];

        for (label, expected) in cases {
            let reply = format!(r#"[{{"action":"x","status":"{}"}}]"#, label);
            let tasks = parse_tasks(&reply).unwrap();
            assert_eq!(tasks[0].status, expected, "label {:?}", label);
        }
    }

    #[test]
    fn test_parse_blank_required_field_gets_sentinel() {
        let reply = r#"[{"action":"  ","sector":"","assignee":"Maria"}]"#;
        let tasks = parse_tasks(reply).unwrap();
        assert_eq!(tasks[0].action, UNSPECIFIED);
        assert_eq!(tasks[0].department, UNSPECIFIED);
        assert_eq!(tasks[0].responsible, "Maria");
    }

    #[test]
    fn test_parse_blank_observations_become_none() {
        let reply = r#"[{"action":"x","observations":"   "}]"#;
        assert_eq!(parse_tasks(reply).unwrap()[0].notes, None);

        let reply = r#"[{"action":"x","observations":"ver orçamento"}]"#;
        assert_eq!(
            parse_tasks(reply).unwrap()[0].notes.as_deref(),
            Some("ver orçamento")
        );
    }

    #[test]
    fn test_find_json_array_ignores_brackets_in_strings() {
        let reply = r#"prosa [{"action":"fechar ] chave","solution":"ok"}] mais prosa"#;
        let found = find_json_array(reply).unwrap();
        assert!(found.starts_with('['));
        assert!(found.ends_with(']'));
        let parsed: Vec<serde_json::Value> = serde_json::from_str(found).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_find_json_array_skips_unclosed_bracket() {
        let reply = r#"nota[1 sem fechar... mas aqui vai: [{"action":"x"}]"#;
        // The first '[' never closes, so the scan retries from the next '['
        // and lands on the balanced candidate.
        let found = find_json_array(reply).unwrap();
        let parsed: Result<Vec<serde_json::Value>, _> = serde_json::from_str(found);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_parse_calendar_date_shapes() {
        assert_eq!(parse_calendar_date("2024-01-15"), Some(date(2024, 1, 15)));
        assert_eq!(parse_calendar_date("15/01/2024"), Some(date(2024, 1, 15)));
        assert_eq!(
            parse_calendar_date("2024-01-15 08:30"),
            Some(date(2024, 1, 15))
        );
        assert_eq!(parse_calendar_date("depois do carnaval"), None);
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let expected = "2024-01-10T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2024-01-10 09:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-10T09:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-10T09:00:00Z"), Some(expected));

        let midnight = "2024-01-10T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2024-01-10"), Some(midnight));
        assert_eq!(parse_timestamp("10/01/2024"), Some(midnight));
    }
}
