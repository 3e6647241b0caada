//! Hierarchical test-execution input model (suites -> cases -> steps/items).

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::spec::EnumColumnGroup;
use crate::util::is_text_present;

////////////////////////////////////////////////////////////////////////////////
// #region FieldValues

/// Scalar value of an open custom-field map.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumFieldValue {
    /// Explicit null / missing.
    #[default]
    Null,
    /// Free text.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Date-time value.
    Date(NaiveDateTime),
    /// Value of a shape the compiler cannot render (arrays, objects).
    Unknown(String),
}

impl EnumFieldValue {
    /// Whether the value counts as populated for column discovery and pruning.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Text(val) => is_text_present(val),
            Self::Number(_) | Self::Boolean(_) | Self::Date(_) | Self::Unknown(_) => true,
        }
    }

    /// Stable text form used for grouping keys and run detection.
    pub fn to_key_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(val) => val.trim().to_string(),
            Self::Number(val) => val.to_string(),
            Self::Boolean(val) => if *val { "True" } else { "False" }.to_string(),
            Self::Date(val) => val.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Unknown(val) => val.clone(),
        }
    }
}

impl From<serde_json::Value> for EnumFieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(val) => Self::Boolean(val),
            serde_json::Value::Number(val) => match val.as_f64() {
                Some(n) => Self::Number(n),
                None => Self::Unknown(val.to_string()),
            },
            serde_json::Value::String(val) => Self::Text(val),
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for EnumFieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// Ordered custom-field map; iteration order is input order.
pub type DictCustomFields = IndexMap<String, EnumFieldValue>;

/// Accept identifiers written either as JSON strings or numbers.
fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(val) => val,
        other => other.to_string(),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Hierarchy

/// Top-level report: ordered suites.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecTestReport {
    /// Report display name.
    pub name: String,
    /// Ordered suites; order is preserved in output.
    pub suites: Vec<SpecTestSuite>,
}

impl SpecTestReport {
    /// Iterate `(suite, case)` pairs in output order.
    pub fn iter_cases(&self) -> impl Iterator<Item = (&SpecTestSuite, &SpecTestCase)> {
        self.suites
            .iter()
            .flat_map(|suite| suite.cases.iter().map(move |case| (suite, case)))
    }

    /// Number of cases across all suites.
    pub fn count_cases(&self) -> usize {
        self.suites.iter().map(|suite| suite.cases.len()).sum()
    }

    /// Number of populated associated items of `group` across all cases.
    pub fn count_items(&self, group: EnumColumnGroup) -> usize {
        self.iter_cases()
            .map(|(_, case)| case.items(group).iter().filter(|it| it.is_present()).count())
            .sum()
    }
}

/// Named, ordered group of cases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecTestSuite {
    /// Suite display name.
    pub name: String,
    /// Ordered cases.
    pub cases: Vec<SpecTestCase>,
}

/// One executed test case with its two independent tracks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecTestCase {
    /// Case identifier (required, non-blank).
    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub id: String,
    /// Case title.
    pub title: String,
    /// Optional link to the case itself.
    pub url: Option<String>,
    /// Execution date as delivered by the source system.
    pub execution_date: Option<String>,
    /// Result message.
    pub result_message: Option<String>,
    /// Result link (run/result page).
    pub result_link: Option<String>,
    /// Failure classification.
    pub failure_type: Option<String>,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Executor.
    pub run_by: Option<String>,
    /// Test configuration name.
    pub configuration: Option<String>,
    /// Work item state.
    pub state: Option<String>,
    /// Date of the last state change.
    pub state_change_date: Option<String>,
    /// Ordered steps.
    pub steps: Vec<SpecTestStep>,
    /// Ordered free-text history entries.
    pub history: Vec<String>,
    /// Linked requirements.
    pub requirements: Vec<SpecAssociatedItem>,
    /// Linked bugs.
    pub bugs: Vec<SpecAssociatedItem>,
    /// Linked change requests.
    #[serde(alias = "crs")]
    pub change_requests: Vec<SpecAssociatedItem>,
    /// Open map of case-level custom fields.
    pub custom_fields: DictCustomFields,
}

impl SpecTestCase {
    /// Associated items of `group`; empty for the `Test Cases` group.
    pub fn items(&self, group: EnumColumnGroup) -> &[SpecAssociatedItem] {
        match group {
            EnumColumnGroup::TestCases => &[],
            EnumColumnGroup::Requirements => &self.requirements,
            EnumColumnGroup::Bugs => &self.bugs,
            EnumColumnGroup::Crs => &self.change_requests,
        }
    }

    /// Rows needed by the step/history track.
    pub fn derive_step_span(&self) -> usize {
        usize::max(1, usize::max(self.steps.len(), self.history.len()))
    }

    /// Rows needed by the associated-item track.
    pub fn derive_item_span(&self) -> usize {
        EnumColumnGroup::ITEM_GROUPS
            .iter()
            .map(|group| self.items(*group).len())
            .fold(1, usize::max)
    }

    /// Physical rows consumed by the case block.
    pub fn derive_row_span(&self) -> usize {
        usize::max(self.derive_step_span(), self.derive_item_span())
    }
}

/// One step of a case.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecTestStep {
    /// Step number or label.
    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub step_no: String,
    /// Action text, possibly with markup.
    pub action: String,
    /// Expected-result text, possibly with markup.
    pub expected: String,
    /// Step run status.
    pub run_status: String,
    /// Step error message.
    pub error_message: String,
}

/// Cross-linked requirement, bug or change request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecAssociatedItem {
    /// Item identifier.
    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub id: String,
    /// Item title.
    pub title: String,
    /// Optional link; renders as hyperlink when present.
    pub url: Option<String>,
    /// Open map of item-level custom fields.
    pub custom_fields: DictCustomFields,
}

impl SpecAssociatedItem {
    /// Whether the item carries anything worth a row slot.
    pub fn is_present(&self) -> bool {
        is_text_present(&self.id)
            || is_text_present(&self.title)
            || self.custom_fields.values().any(EnumFieldValue::is_present)
    }

    /// Display text `"{id} {title}"`, trimmed when either part is blank.
    pub fn derive_display_text(&self) -> String {
        format!("{} {}", self.id.trim(), self.title.trim())
            .trim()
            .to_string()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_deserializes_with_lenient_ids_and_ordered_fields() {
        let c_json = r#"{
            "name": "Nightly",
            "suites": [{
                "name": "Login",
                "cases": [{
                    "id": 101,
                    "title": "Valid login",
                    "steps": [{"stepNo": 1, "action": "<b>Open</b>"}],
                    "crs": [{"id": "CR-7", "title": "Rename"}],
                    "customFields": {"zeta": "z", "Alpha": 3, "mid": null, "raw": [1, 2]}
                }]
            }]
        }"#;

        let report: SpecTestReport = serde_json::from_str(c_json).unwrap();
        let case = &report.suites[0].cases[0];

        assert_eq!(case.id, "101");
        assert_eq!(case.steps[0].step_no, "1");
        assert_eq!(case.change_requests[0].id, "CR-7");
        assert_eq!(
            case.custom_fields.keys().collect::<Vec<_>>(),
            vec!["zeta", "Alpha", "mid", "raw"]
        );
        assert_eq!(case.custom_fields["Alpha"], EnumFieldValue::Number(3.0));
        assert_eq!(case.custom_fields["mid"], EnumFieldValue::Null);
        assert_eq!(
            case.custom_fields["raw"],
            EnumFieldValue::Unknown("[1,2]".to_string())
        );
    }

    #[test]
    fn test_spans_are_independent_per_track() {
        let case = SpecTestCase {
            steps: vec![SpecTestStep::default(); 3],
            history: vec!["h".to_string()],
            requirements: vec![SpecAssociatedItem::default()],
            bugs: vec![SpecAssociatedItem::default(); 2],
            ..Default::default()
        };

        assert_eq!(case.derive_step_span(), 3);
        assert_eq!(case.derive_item_span(), 2);
        assert_eq!(case.derive_row_span(), 3);
        assert_eq!(SpecTestCase::default().derive_row_span(), 1);
    }

    #[test]
    fn test_field_value_presence() {
        assert!(!EnumFieldValue::Null.is_present());
        assert!(!EnumFieldValue::Text("   ".to_string()).is_present());
        assert!(EnumFieldValue::Text("x".to_string()).is_present());
        assert!(EnumFieldValue::Number(0.0).is_present());
        assert!(EnumFieldValue::Boolean(false).is_present());
    }

    #[test]
    fn test_item_display_text() {
        let item = SpecAssociatedItem {
            id: "REQ-1".to_string(),
            title: "Login works".to_string(),
            ..Default::default()
        };
        assert_eq!(item.derive_display_text(), "REQ-1 Login works");

        let item_no_title = SpecAssociatedItem {
            id: "REQ-2".to_string(),
            ..Default::default()
        };
        assert_eq!(item_no_title.derive_display_text(), "REQ-2");
    }
}
