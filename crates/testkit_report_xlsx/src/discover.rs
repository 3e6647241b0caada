//! Column discovery: candidate columns from the report, then a sparse-column prune.
//!
//! [`derive_cell_source`] is the one place that maps `(case, column, offset)` to a
//! value; discovery, pruning and row emission all read through it.

use indexmap::IndexSet;
use log::debug;

use crate::conf::derive_default_column_width;
use crate::model::{SpecAssociatedItem, SpecTestCase, SpecTestReport, SpecTestSuite};
use crate::spec::{EnumCellSource, EnumColumnGroup, EnumColumnProperty, SpecColumnDefinition};
use crate::util::is_text_present;

/// Case-level base columns after the optional suite column, in emission order.
const TUP_CASE_BASE_PROPERTIES: [EnumColumnProperty; 11] = [
    EnumColumnProperty::CaseId,
    EnumColumnProperty::CaseName,
    EnumColumnProperty::ExecutionDate,
    EnumColumnProperty::Result,
    EnumColumnProperty::FailureType,
    EnumColumnProperty::Comment,
    EnumColumnProperty::StepNo,
    EnumColumnProperty::StepAction,
    EnumColumnProperty::StepExpected,
    EnumColumnProperty::StepRunStatus,
    EnumColumnProperty::StepErrorMessage,
];

/// Case metadata columns that follow the step/history track.
const TUP_CASE_TAIL_PROPERTIES: [EnumColumnProperty; 4] = [
    EnumColumnProperty::RunBy,
    EnumColumnProperty::Configuration,
    EnumColumnProperty::State,
    EnumColumnProperty::StateChangeDate,
];

////////////////////////////////////////////////////////////////////////////////
// #region Discovery

/// Derive the ordered column list for the hierarchical report.
///
/// Pure and deterministic: the same report always yields the same columns.
pub fn derive_report_columns(
    report: &SpecTestReport,
    if_group_by_suite: bool,
) -> Vec<SpecColumnDefinition> {
    let mut l_columns = Vec::new();
    let mut push_column = |property: EnumColumnProperty, group: EnumColumnGroup| {
        let n_width = derive_default_column_width(&property);
        l_columns.push(SpecColumnDefinition::new(property, group, n_width));
    };

    if !if_group_by_suite {
        push_column(EnumColumnProperty::SuiteName, EnumColumnGroup::TestCases);
    }
    for property in TUP_CASE_BASE_PROPERTIES {
        push_column(property, EnumColumnGroup::TestCases);
    }

    let if_history = report
        .iter_cases()
        .any(|(_, case)| case.steps.iter().any(|step| is_text_present(&step.step_no)));
    if if_history {
        push_column(EnumColumnProperty::History, EnumColumnGroup::TestCases);
    }

    for property in TUP_CASE_TAIL_PROPERTIES {
        push_column(property, EnumColumnGroup::TestCases);
    }

    for name in derive_case_custom_field_names(report) {
        push_column(EnumColumnProperty::CaseCustom(name), EnumColumnGroup::TestCases);
    }

    for group in EnumColumnGroup::ITEM_GROUPS {
        let if_group_populated = report
            .iter_cases()
            .any(|(_, case)| case.items(group).iter().any(SpecAssociatedItem::is_present));
        if !if_group_populated {
            continue;
        }
        push_column(EnumColumnProperty::ItemId, group);
        push_column(EnumColumnProperty::ItemTitle, group);
        for name in derive_item_custom_field_names(report, group) {
            push_column(EnumColumnProperty::ItemCustom(name), group);
        }
    }

    let n_candidates = l_columns.len();
    l_columns.retain(|column| is_column_populated(report, column));
    debug!(
        "Discovered {} columns ({} candidates) for report {:?}.",
        l_columns.len(),
        n_candidates,
        report.name
    );
    l_columns
}

/// Whether any case populates `column` at any row offset of its block.
pub fn is_column_populated(report: &SpecTestReport, column: &SpecColumnDefinition) -> bool {
    report.iter_cases().any(|(suite, case)| {
        (0..case.derive_row_span())
            .any(|n_offset| derive_cell_source(suite, case, column, n_offset).is_present())
    })
}

/// Union of populated case custom-field names, first-encounter order.
fn derive_case_custom_field_names(report: &SpecTestReport) -> IndexSet<String> {
    report
        .iter_cases()
        .flat_map(|(_, case)| case.custom_fields.iter())
        .filter(|(_, value)| value.is_present())
        .map(|(name, _)| name.clone())
        .collect()
}

/// Union of populated item custom-field names for `group` over every item.
fn derive_item_custom_field_names(
    report: &SpecTestReport,
    group: EnumColumnGroup,
) -> IndexSet<String> {
    report
        .iter_cases()
        .flat_map(|(_, case)| case.items(group).iter())
        .flat_map(|item| item.custom_fields.iter())
        .filter(|(_, value)| value.is_present())
        .map(|(name, _)| name.clone())
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellSources

/// Source value of `column` for `case` at row offset `n_offset` inside its block.
///
/// Case-level columns only carry a value on the first row of the block; track
/// columns read the entry at `n_offset` and are `Missing` past the track end.
pub fn derive_cell_source(
    suite: &SpecTestSuite,
    case: &SpecTestCase,
    column: &SpecColumnDefinition,
    n_offset: usize,
) -> EnumCellSource {
    if column.property.is_item_property() {
        return match case.items(column.group).get(n_offset) {
            Some(item) => derive_item_source(column.group, item, &column.property),
            None => EnumCellSource::Missing,
        };
    }
    if column.property.is_step_track() {
        return derive_step_track_source(case, &column.property, n_offset);
    }
    if n_offset > 0 {
        return EnumCellSource::Missing;
    }

    let text = |val: &Option<String>| EnumCellSource::Text(val.clone().unwrap_or_default());
    let date = |val: &Option<String>| EnumCellSource::Date(val.clone().unwrap_or_default());

    match &column.property {
        EnumColumnProperty::SuiteName => EnumCellSource::Text(suite.name.clone()),
        EnumColumnProperty::CaseId => EnumCellSource::Id(case.id.clone()),
        EnumColumnProperty::CaseName => EnumCellSource::Link {
            text: case.title.clone(),
            url: case.url.clone(),
            tooltip: format!("Open test case {}", case.id.trim()),
        },
        EnumColumnProperty::ExecutionDate => date(&case.execution_date),
        EnumColumnProperty::Result => EnumCellSource::Link {
            text: case.result_message.clone().unwrap_or_default(),
            url: case.result_link.clone(),
            tooltip: format!("Open result of test case {}", case.id.trim()),
        },
        EnumColumnProperty::FailureType => text(&case.failure_type),
        EnumColumnProperty::Comment => text(&case.comment),
        EnumColumnProperty::RunBy => text(&case.run_by),
        EnumColumnProperty::Configuration => text(&case.configuration),
        EnumColumnProperty::State => text(&case.state),
        EnumColumnProperty::StateChangeDate => date(&case.state_change_date),
        EnumColumnProperty::CaseCustom(name) => case
            .custom_fields
            .get(name)
            .map_or(EnumCellSource::Missing, |value| {
                EnumCellSource::Field(value.clone())
            }),
        _ => EnumCellSource::Missing,
    }
}

fn derive_step_track_source(
    case: &SpecTestCase,
    property: &EnumColumnProperty,
    n_offset: usize,
) -> EnumCellSource {
    if *property == EnumColumnProperty::History {
        return case
            .history
            .get(n_offset)
            .map_or(EnumCellSource::Missing, |entry| {
                EnumCellSource::Text(entry.clone())
            });
    }

    let Some(step) = case.steps.get(n_offset) else {
        return EnumCellSource::Missing;
    };
    match property {
        EnumColumnProperty::StepNo => EnumCellSource::Text(step.step_no.clone()),
        EnumColumnProperty::StepAction => EnumCellSource::Markup(step.action.clone()),
        EnumColumnProperty::StepExpected => EnumCellSource::Markup(step.expected.clone()),
        EnumColumnProperty::StepRunStatus => EnumCellSource::Text(step.run_status.clone()),
        EnumColumnProperty::StepErrorMessage => EnumCellSource::Text(step.error_message.clone()),
        _ => EnumCellSource::Missing,
    }
}

/// Source value of an item-fed column for one associated item.
pub fn derive_item_source(
    group: EnumColumnGroup,
    item: &SpecAssociatedItem,
    property: &EnumColumnProperty,
) -> EnumCellSource {
    match property {
        EnumColumnProperty::ItemId => EnumCellSource::Id(item.id.clone()),
        EnumColumnProperty::ItemTitle => EnumCellSource::Link {
            text: item.derive_display_text(),
            url: item.url.clone(),
            tooltip: format!("Open {} {}", group.item_noun(), item.id.trim()),
        },
        EnumColumnProperty::ItemCustom(name) => item
            .custom_fields
            .get(name)
            .map_or(EnumCellSource::Missing, |value| {
                EnumCellSource::Field(value.clone())
            }),
        _ => EnumCellSource::Missing,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
