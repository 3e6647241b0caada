//! Requirement coverage table: one row per (requirement, case) link, grouped by
//! requirement id in first-encounter order.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use log::debug;

use crate::conf::derive_default_column_width;
use crate::discover::{derive_cell_source, derive_item_source};
use crate::emit::SpecGroupedTable;
use crate::model::{SpecAssociatedItem, SpecTestCase, SpecTestReport, SpecTestSuite};
use crate::spec::{EnumCellSource, EnumColumnGroup, EnumColumnProperty, SpecColumnDefinition};

/// Columns that merge identical runs within one requirement group.
const TUP_COLS_IDX_MERGE: [usize; 3] = [0, 1, 2];

fn derive_coverage_columns() -> Vec<SpecColumnDefinition> {
    let column = |property: EnumColumnProperty, group: EnumColumnGroup| {
        let n_width = derive_default_column_width(&property);
        SpecColumnDefinition::new(property, group, n_width)
    };
    vec![
        column(EnumColumnProperty::ItemId, EnumColumnGroup::Requirements)
            .with_name("Requirement ID"),
        column(EnumColumnProperty::ItemTitle, EnumColumnGroup::Requirements)
            .with_name("Requirement Title"),
        column(EnumColumnProperty::SuiteName, EnumColumnGroup::TestCases),
        column(EnumColumnProperty::CaseId, EnumColumnGroup::TestCases).with_name("Case ID"),
        column(EnumColumnProperty::CaseName, EnumColumnGroup::TestCases).with_name("Case Title"),
        column(EnumColumnProperty::Result, EnumColumnGroup::TestCases),
        column(EnumColumnProperty::ExecutionDate, EnumColumnGroup::TestCases),
    ]
}

/// Build the grouped coverage table of `report`.
///
/// Columns other than the requirement id that are empty on every row are dropped;
/// key and merge indices follow the remaining columns.
pub fn derive_coverage_table(report: &SpecTestReport) -> SpecGroupedTable {
    let l_columns_all = derive_coverage_columns();

    let mut dict_links: IndexMap<String, Vec<(&SpecTestSuite, &SpecTestCase, &SpecAssociatedItem)>> =
        IndexMap::new();
    for (suite, case) in report.iter_cases() {
        for item in case.requirements.iter().filter(|it| it.is_present()) {
            let c_key = match item.id.trim() {
                "" => item.derive_display_text(),
                c_id => c_id.to_string(),
            };
            dict_links.entry(c_key).or_default().push((suite, case, item));
        }
    }

    let l_rows_all: Vec<Vec<EnumCellSource>> = dict_links
        .values()
        .flatten()
        .map(|(suite, case, item)| {
            l_columns_all
                .iter()
                .map(|column| {
                    if column.property.is_item_property() {
                        derive_item_source(column.group, item, &column.property)
                    } else {
                        derive_cell_source(suite, case, column, 0)
                    }
                })
                .collect()
        })
        .collect();

    let l_cols_idx_kept: Vec<usize> = (0..l_columns_all.len())
        .filter(|n_col_idx| {
            *n_col_idx == 0 || l_rows_all.iter().any(|row| row[*n_col_idx].is_present())
        })
        .collect();

    let columns = l_cols_idx_kept
        .iter()
        .map(|n_col_idx| l_columns_all[*n_col_idx].clone())
        .collect();
    let rows = l_rows_all
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .filter(|(n_col_idx, _)| l_cols_idx_kept.contains(n_col_idx))
                .map(|(_, source)| source)
                .collect()
        })
        .collect::<Vec<Vec<EnumCellSource>>>();
    let cols_idx_merge = TUP_COLS_IDX_MERGE
        .iter()
        .filter_map(|n_col_idx| l_cols_idx_kept.iter().position(|idx| idx == n_col_idx))
        .collect();

    let n_cases_covered = dict_links
        .values()
        .flatten()
        .map(|(suite, case, _)| (suite.name.as_str(), case.id.trim()))
        .collect::<BTreeSet<_>>()
        .len();
    let dict_group_counts = BTreeMap::from([
        (EnumColumnGroup::Requirements, dict_links.len()),
        (EnumColumnGroup::TestCases, n_cases_covered),
    ]);

    debug!(
        "Coverage table: {} requirements, {} links, {} cases.",
        dict_links.len(),
        rows.len(),
        n_cases_covered
    );

    SpecGroupedTable {
        columns,
        rows,
        col_idx_key: 0,
        cols_idx_merge,
        dict_group_counts,
    }
}
