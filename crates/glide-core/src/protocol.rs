//! JSON messages exchanged with the client renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::callback::{CallbackId, Outcome, Target};

/// The renderer-side change that triggered a callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerValue {
    pub id: String,
    pub attribute: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub trigger: TriggerValue,
    /// Destinations of the callback to run; identifies it.
    pub outputs: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: String,
    pub attribute: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallbackResponse {
    Applied { updates: Vec<Update> },
    Suppressed,
    Superseded,
    Failed { error: String },
}

impl CallbackResponse {
    pub fn is_failure(&self) -> bool {
        matches!(self, CallbackResponse::Failed { .. })
    }
}

impl From<Outcome> for CallbackResponse {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied(writes) => CallbackResponse::Applied {
                updates: writes
                    .into_iter()
                    .map(|(target, value)| Update { id: target.id, attribute: target.attribute, value })
                    .collect(),
            },
            Outcome::Suppressed => CallbackResponse::Suppressed,
            Outcome::Superseded => CallbackResponse::Superseded,
            Outcome::Failed(error) => CallbackResponse::Failed { error },
        }
    }
}

/// One registered callback, as advertised to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    pub id: CallbackId,
    pub inputs: Vec<Target>,
    pub outputs: Vec<Target>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let req: CallbackRequest = serde_json::from_value(json!({
            "trigger": { "id": "my-swiper", "attribute": "activeIndex", "value": 3 },
            "outputs": [{ "id": "active-label", "attribute": "text" }],
        }))
        .unwrap();
        assert_eq!(req.trigger.value, json!(3));
        assert_eq!(req.outputs, [Target::new("active-label", "text")]);
    }

    #[test]
    fn responses_are_tagged_by_status() {
        let applied = CallbackResponse::from(Outcome::Applied(vec![(Target::new("l", "text"), json!("Slide 4"))]));
        assert_eq!(
            serde_json::to_value(&applied).unwrap(),
            json!({ "status": "applied", "updates": [{ "id": "l", "attribute": "text", "value": "Slide 4" }] })
        );
        assert_eq!(
            serde_json::to_value(CallbackResponse::from(Outcome::Suppressed)).unwrap(),
            json!({ "status": "suppressed" })
        );
        let failed = CallbackResponse::from(Outcome::Failed("boom".into()));
        assert!(failed.is_failure());
        assert_eq!(serde_json::to_value(&failed).unwrap(), json!({ "status": "failed", "error": "boom" }));
    }

    #[test]
    fn dependency_ids_are_plain_numbers() {
        let dep = DependencyDescriptor {
            id: CallbackId(2),
            inputs: vec![Target::new("s", "activeIndex")],
            outputs: vec![Target::new("l", "text")],
        };
        assert_eq!(serde_json::to_value(&dep).unwrap()["id"], json!(2));
    }
}
