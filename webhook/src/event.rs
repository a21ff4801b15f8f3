//! Inbound webhook event: parsing and gating.

use serde_json::Value;

/// Stage value that triggers processing; anything else is acknowledged and
/// dropped.
const PROCESSED_STAGE: &str = "installed";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WebhookEvent {
    pub design_id: Option<String>,
    pub project_id: Option<String>,
    pub stage: Option<String>,
}

/// Outcome of gating an inbound event before any processing starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// Acknowledge and hand to the processor.
    Accept,
    /// Acknowledge as skipped: the stage is not "installed".
    SkipStage,
    /// Reject: neither a design id nor a project id was supplied.
    Reject,
}

impl WebhookEvent {
    /// Parse from a query string (GET delivery).
    pub fn from_query(query: &str) -> Self {
        let mut event = WebhookEvent::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "design_id" => event.design_id = Some(value.to_string()),
                "project_id" => event.project_id = Some(value.to_string()),
                "stage" => event.stage = Some(value.to_string()),
                _ => {}
            }
        }
        event
    }

    /// Parse from a JSON body (POST delivery). Ids are tolerated as numbers.
    pub fn from_json(body: &Value) -> Self {
        WebhookEvent {
            design_id: scalar_text(body.get("design_id")),
            project_id: scalar_text(body.get("project_id")),
            stage: scalar_text(body.get("stage")),
        }
    }

    pub fn gate(&self) -> Gate {
        if let Some(stage) = &self.stage
            && !stage.eq_ignore_ascii_case(PROCESSED_STAGE)
        {
            return Gate::SkipStage;
        }
        if self.design_id.is_none() && self.project_id.is_none() {
            return Gate::Reject;
        }
        Gate::Accept
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_parsing_picks_known_keys() {
        let event =
            WebhookEvent::from_query("design_id=d1&project_id=p1&stage=Installed&extra=x");
        assert_eq!(event.design_id.as_deref(), Some("d1"));
        assert_eq!(event.project_id.as_deref(), Some("p1"));
        assert_eq!(event.stage.as_deref(), Some("Installed"));
    }

    #[test]
    fn json_parsing_tolerates_numeric_ids() {
        let event = WebhookEvent::from_json(&json!({"design_id": 42, "stage": "installed"}));
        assert_eq!(event.design_id.as_deref(), Some("42"));
        assert_eq!(event.gate(), Gate::Accept);
    }

    #[test]
    fn stage_gate_is_case_insensitive() {
        let event = WebhookEvent::from_json(&json!({"design_id": "d1", "stage": "INSTALLED"}));
        assert_eq!(event.gate(), Gate::Accept);

        let event = WebhookEvent::from_json(&json!({"design_id": "d1", "stage": "pending"}));
        assert_eq!(event.gate(), Gate::SkipStage);
    }

    #[test]
    fn missing_stage_is_accepted() {
        let event = WebhookEvent::from_json(&json!({"project_id": "p1"}));
        assert_eq!(event.gate(), Gate::Accept);
    }

    #[test]
    fn empty_event_is_rejected() {
        assert_eq!(WebhookEvent::default().gate(), Gate::Reject);
        assert_eq!(WebhookEvent::from_query("").gate(), Gate::Reject);
        // a skipped stage takes precedence over missing ids
        let event = WebhookEvent::from_json(&json!({"stage": "cancelled"}));
        assert_eq!(event.gate(), Gate::SkipStage);
    }
}
