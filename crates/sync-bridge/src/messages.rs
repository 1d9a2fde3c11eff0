//! Tagged messages for both directions of the link.

use resizer_core_types::SelectionRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Display-relevant slice of the record pushed to the UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    #[serde(rename = "iframeName")]
    pub name: String,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "fullViewOn")]
    pub full_view_on: bool,
}

impl SelectionSnapshot {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (field, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() {
                return Err(ProtocolError::InvalidField {
                    field,
                    reason: format!("{value} is not a finite number"),
                });
            }
        }
        Ok(())
    }
}

impl From<&SelectionRecord> for SelectionSnapshot {
    fn from(record: &SelectionRecord) -> Self {
        Self {
            name: record.name.clone(),
            width: record.width,
            height: record.height,
            full_view_on: record.full_view_on,
        }
    }
}

/// Page agent -> UI agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageToUi {
    /// Authoritative snapshot of the current selection.
    Update(SelectionSnapshot),
    /// No selection exists.
    Clear,
    /// A selection session is waiting for the user's click.
    AwaitSelection,
}

impl PageToUi {
    pub fn update(record: &SelectionRecord) -> Self {
        Self::Update(SelectionSnapshot::from(record))
    }

    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(raw)?;
        if let Self::Update(snapshot) = &message {
            snapshot.validate()?;
        }
        Ok(message)
    }
}

/// Partial edit of the record; absent fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(
        rename = "fullViewOn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub full_view_on: Option<bool>,
}

impl UpdatePatch {
    pub fn full_view(on: bool) -> Self {
        Self {
            full_view_on: Some(on),
            ..Self::default()
        }
    }

    pub fn width(width: f64) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    pub fn height(height: f64) -> Self {
        Self {
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.full_view_on.is_none()
    }
}

/// UI agent -> page agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UiToPage {
    /// Status query.
    Fetch,
    Update(UpdatePatch),
    /// Starts a selection session.
    Select {
        #[serde(rename = "fullViewOn", default)]
        full_view_on: bool,
    },
    /// Discards the current selection.
    Clear,
    /// Cancels an in-flight selection session.
    EndSelection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_messages_carry_action_tag() {
        let update = PageToUi::Update(SelectionSnapshot {
            name: "player".into(),
            width: 50.0,
            height: 25.5,
            full_view_on: true,
        });
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"action": "update", "iframeName": "player", "width": 50.0, "height": 25.5, "fullViewOn": true})
        );
        assert_eq!(
            serde_json::to_value(PageToUi::AwaitSelection).unwrap(),
            json!({"action": "awaitSelection"})
        );
    }

    #[test]
    fn ui_update_omits_absent_fields() {
        let patch = UiToPage::Update(UpdatePatch::width(42.0));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"action": "update", "width": 42.0})
        );
        let decoded: UiToPage = serde_json::from_str(r#"{"action":"update"}"#).unwrap();
        assert_eq!(decoded, UiToPage::Update(UpdatePatch::default()));
    }

    #[test]
    fn select_defaults_to_windowed() {
        let decoded: UiToPage = serde_json::from_str(r#"{"action":"select"}"#).unwrap();
        assert_eq!(decoded, UiToPage::Select { full_view_on: false });
        let decoded: UiToPage =
            serde_json::from_str(r#"{"action":"select","fullViewOn":true}"#).unwrap();
        assert_eq!(decoded, UiToPage::Select { full_view_on: true });
    }

    #[test]
    fn update_with_wrong_types_is_rejected() {
        let raw = r#"{"action":"update","iframeName":"x","width":"10","height":1,"fullViewOn":false}"#;
        assert!(matches!(
            PageToUi::from_json(raw),
            Err(ProtocolError::Malformed(_))
        ));
        let raw = r#"{"action":"update","iframeName":"x","height":1,"fullViewOn":false}"#;
        assert!(PageToUi::from_json(raw).is_err());
        assert_eq!(PageToUi::from_json(r#"{"action":"clear"}"#).unwrap(), PageToUi::Clear);
    }
}
