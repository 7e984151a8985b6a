//! Text presentation of enrichment results.
//!
//! Layout: title (`company_name`, else the query), optional logo URL, then one
//! entry per field. Scalars are inline, sequences are bullet lists and
//! mappings are pretty-printed JSON.

use leadlens_enrich::{EnrichmentOutcome, EnrichmentState};
use leadlens_protocol::{Record, RecordValue};

pub const LOADING: &str = "Loading...";

/// `company_name` -> `Company Name`.
pub fn humanize_label(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_record(record: &Record, query: &str) -> String {
    let title = record.company_name().unwrap_or(query);
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count().max(1)));
    out.push('\n');
    if let Some(photo) = record.profile_photo() {
        out.push_str(&format!("Logo: {}\n", photo));
    }
    if !record.is_empty() {
        out.push('\n');
    }

    for (key, value) in record.iter() {
        let label = humanize_label(key);
        match value {
            RecordValue::Scalar(scalar) => {
                out.push_str(&format!("{}: {}\n", label, scalar));
            }
            RecordValue::Sequence(items) => {
                out.push_str(&format!("{}:\n", label));
                for item in items {
                    out.push_str(&format!("  - {}\n", inline_value(item)));
                }
            }
            RecordValue::Mapping(_) => {
                out.push_str(&format!("{}:\n", label));
                let pretty = serde_json::to_string_pretty(&value.to_json())
                    .unwrap_or_else(|_| value.to_json().to_string());
                for line in pretty.lines() {
                    out.push_str(&format!("  {}\n", line));
                }
            }
        }
    }
    out
}

fn inline_value(value: &RecordValue) -> String {
    match value {
        RecordValue::Scalar(scalar) => scalar.to_string(),
        nested => nested.to_json().to_string(),
    }
}

/// Text for a broadcast state; `None` for `Idle`.
pub fn render_state(state: &EnrichmentState) -> Option<String> {
    match &state.outcome {
        EnrichmentOutcome::Idle => None,
        EnrichmentOutcome::Pending => Some(LOADING.to_string()),
        EnrichmentOutcome::Succeeded(record) => Some(render_record(record, &state.query)),
        EnrichmentOutcome::Failed(message) => Some(format!("Error: {}", message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[test]
    fn labels_are_humanized() {
        assert_eq!(humanize_label("company_name"), "Company Name");
        assert_eq!(humanize_label("employees"), "Employees");
        assert_eq!(humanize_label("linkedin__url_"), "Linkedin Url");
    }

    #[test]
    fn renders_each_value_kind() {
        let text = render_record(
            &record(json!({
                "company_name": "Acme",
                "profile_photo": "https://img.example/acme.png",
                "tags": ["b2b", "saas"],
                "employees": 120,
                "hq": {"city": "Berlin"}
            })),
            "acme",
        );

        assert!(text.starts_with("Acme\n====\n"));
        assert!(text.contains("Logo: https://img.example/acme.png\n"));
        assert!(text.contains("Tags:\n  - b2b\n  - saas\n"));
        assert!(text.contains("Employees: 120\n"));
        assert!(text.contains("Hq:\n  {\n    \"city\": \"Berlin\"\n  }\n"));
    }

    #[test]
    fn fields_render_in_server_order() {
        let text = render_record(
            &record(json!({"website": "acme.io", "company_name": "Acme", "employees": 5})),
            "acme",
        );
        let website = text.find("Website:").unwrap();
        let name = text.find("Company Name:").unwrap();
        let employees = text.find("Employees:").unwrap();
        assert!(website < name && name < employees, "{}", text);
    }

    #[test]
    fn title_falls_back_to_query() {
        let text = render_record(&record(json!({"industry": "Retail"})), "Globex");
        assert!(text.starts_with("Globex\n"));
        assert!(!text.contains("Logo:"));
        assert!(text.contains("Industry: Retail\n"));
    }

    #[test]
    fn states_render_distinctly() {
        let mut state = EnrichmentState::default();
        assert_eq!(render_state(&state), None);

        state.outcome = EnrichmentOutcome::Pending;
        assert_eq!(render_state(&state).as_deref(), Some("Loading..."));

        state.outcome = EnrichmentOutcome::Failed("rate limited".into());
        assert_eq!(render_state(&state).as_deref(), Some("Error: rate limited"));
    }
}
