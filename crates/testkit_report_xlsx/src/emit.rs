//! Row emission and merge planning.
//!
//! Hierarchical report: one block of `row_span` rows per case, case-level columns
//! merged vertically over the block, track columns never merged.
//! Grouped report: zebra toggles on a key change and identical runs are merged
//! inside each key group.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::cell::{create_blank_cell, create_error_cell, create_text_cell, derive_cell_from_source};
use crate::conf::N_NROWS_EXCEL_MAX;
use crate::discover::derive_cell_source;
use crate::model::{SpecTestCase, SpecTestReport, SpecTestSuite};
use crate::spec::{
    EnumCellContent, EnumCellSource, EnumColumnGroup, ReportCompileError, Result, SpecCell,
    SpecCellRef, SpecColumnDefinition, SpecMergeRange, SpecReportOptions, SpecRow,
};
use crate::style::{EnumStyleId, select_group_header_style};
use crate::util::{derive_contiguous_ranges, derive_vertical_runs, should_alternate};

/// Rows, merges and recoverable warnings produced by one planning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecEmitOutput {
    /// Rows in ascending row order.
    pub rows: Vec<SpecRow>,
    /// Merge ranges over `rows`.
    pub merges: Vec<SpecMergeRange>,
    /// Cell-level and case-level recoveries.
    pub warnings: Vec<String>,
    /// First row index after the emitted rows.
    pub row_idx_next: usize,
}

impl SpecEmitOutput {
    fn new(row_idx_start: usize) -> Self {
        Self {
            row_idx_next: row_idx_start,
            ..Default::default()
        }
    }

    fn extend(&mut self, other: SpecEmitOutput) {
        self.rows.extend(other.rows);
        self.merges.extend(other.merges);
        self.warnings.extend(other.warnings);
        self.row_idx_next = other.row_idx_next;
    }
}

/// Flat table consumed by the grouped (coverage-style) variant.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecGroupedTable {
    /// Emitted columns.
    pub columns: Vec<SpecColumnDefinition>,
    /// One source row per output row, aligned with `columns`.
    pub rows: Vec<Vec<EnumCellSource>>,
    /// Column whose value change toggles zebra and opens a new merge scope.
    pub col_idx_key: usize,
    /// Columns whose identical runs are merged within a key group.
    pub cols_idx_merge: Vec<usize>,
    /// Counts shown next to each group label in the group-header row.
    pub dict_group_counts: BTreeMap<EnumColumnGroup, usize>,
}

////////////////////////////////////////////////////////////////////////////////
// #region HeaderRows

/// Plan the group-header row and the field-header row at `row_idx_start`.
///
/// Each contiguous run of one group gets a label like `"Requirements (12)"`,
/// merged horizontally when the run is wider than one column.
pub fn plan_header_rows(
    columns: &[SpecColumnDefinition],
    dict_group_counts: &BTreeMap<EnumColumnGroup, usize>,
    row_idx_start: usize,
) -> SpecEmitOutput {
    let mut output = SpecEmitOutput::new(row_idx_start);
    let n_row_group = row_idx_start;
    let n_row_field = row_idx_start + 1;

    let mut l_group_ranges: Vec<(usize, usize, EnumColumnGroup)> = Vec::new();
    for group in [EnumColumnGroup::TestCases]
        .into_iter()
        .chain(EnumColumnGroup::ITEM_GROUPS)
    {
        let l_cols_idx: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.group == group)
            .map(|(n_col_idx, _)| n_col_idx)
            .collect();
        l_group_ranges.extend(
            derive_contiguous_ranges(&l_cols_idx)
                .into_iter()
                .map(|(n_start, n_end)| (n_start, n_end, group)),
        );
    }
    l_group_ranges.sort_unstable_by_key(|(n_start, _, _)| *n_start);

    let mut l_cells_group = Vec::with_capacity(columns.len());
    for (n_col_idx_start, n_col_idx_end, group) in l_group_ranges {
        let style = select_group_header_style(group);
        let c_label = format!(
            "{} ({})",
            group.label(),
            dict_group_counts.get(&group).copied().unwrap_or_default()
        );

        l_cells_group.push(create_text_cell(
            SpecCellRef::new(n_row_group, n_col_idx_start),
            c_label,
            style,
        ));
        for n_col_idx in n_col_idx_start + 1..=n_col_idx_end {
            l_cells_group.push(create_blank_cell(
                SpecCellRef::new(n_row_group, n_col_idx),
                style,
            ));
        }
        if n_col_idx_end > n_col_idx_start {
            output.merges.push(SpecMergeRange::horizontal(
                n_row_group,
                n_col_idx_start,
                n_col_idx_end,
            ));
        }
    }

    let l_cells_field = columns
        .iter()
        .enumerate()
        .map(|(n_col_idx, col)| {
            create_text_cell(
                SpecCellRef::new(n_row_field, n_col_idx),
                col.name.as_str(),
                EnumStyleId::FieldHeader,
            )
        })
        .collect();

    output.rows.push(SpecRow {
        row_idx: n_row_group,
        cells: l_cells_group,
    });
    output.rows.push(SpecRow {
        row_idx: n_row_field,
        cells: l_cells_field,
    });
    output.row_idx_next = n_row_field + 1;
    output
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HierarchicalRows

/// Plan data rows and merges for the hierarchical report starting at `row_idx_start`.
///
/// A case whose block would pass the worksheet row limit is skipped with a warning;
/// rows planned before it stay valid.
pub fn plan_report_rows(
    report: &SpecTestReport,
    columns: &[SpecColumnDefinition],
    options: &SpecReportOptions,
    row_idx_start: usize,
) -> Result<SpecEmitOutput> {
    if columns.is_empty() {
        return Err(ReportCompileError::EmptyColumns(report.name.clone()));
    }

    let mut output = SpecEmitOutput::new(row_idx_start);
    let mut key_prev: Option<(usize, usize)> = None;
    let mut if_zebra_alt = false;

    for (n_suite_idx, suite) in report.suites.iter().enumerate() {
        if options.if_group_by_suite {
            if output.row_idx_next >= N_NROWS_EXCEL_MAX {
                let c_msg = format!(
                    "Suite {:?}: title row {} is beyond the row limit, skipped.",
                    suite.name, output.row_idx_next
                );
                warn!("{c_msg}");
                output.warnings.push(c_msg);
            } else {
                plan_suite_title_row(&mut output, suite, columns.len());
            }
        }

        for (n_case_idx, case) in suite.cases.iter().enumerate() {
            let key = (n_suite_idx, n_case_idx);
            if should_alternate(key_prev.as_ref(), &key) {
                if_zebra_alt = !if_zebra_alt;
            }
            key_prev = Some(key);

            match plan_case_block(
                suite,
                case,
                columns,
                output.row_idx_next,
                if_zebra_alt,
                options.if_strip_markup,
            ) {
                Ok(block) => output.extend(block),
                Err(err) => {
                    let c_msg = format!("Case {:?} skipped: {err}", case.id.trim());
                    warn!("{c_msg}");
                    output.warnings.push(c_msg);
                }
            }
        }
    }

    debug!(
        "Planned {} data rows and {} merges for report {:?}.",
        output.rows.len(),
        output.merges.len(),
        report.name
    );
    Ok(output)
}

fn plan_suite_title_row(output: &mut SpecEmitOutput, suite: &SpecTestSuite, n_cols: usize) {
    let n_row_idx = output.row_idx_next;
    let mut l_cells = Vec::with_capacity(n_cols);
    l_cells.push(create_text_cell(
        SpecCellRef::new(n_row_idx, 0),
        suite.name.trim(),
        EnumStyleId::SuiteTitle,
    ));
    for n_col_idx in 1..n_cols {
        l_cells.push(create_blank_cell(
            SpecCellRef::new(n_row_idx, n_col_idx),
            EnumStyleId::SuiteTitle,
        ));
    }
    if n_cols > 1 {
        output
            .merges
            .push(SpecMergeRange::horizontal(n_row_idx, 0, n_cols - 1));
    }
    output.rows.push(SpecRow {
        row_idx: n_row_idx,
        cells: l_cells,
    });
    output.row_idx_next = n_row_idx + 1;
}

/// Plan the `row_span` rows of one case block.
pub fn plan_case_block(
    suite: &SpecTestSuite,
    case: &SpecTestCase,
    columns: &[SpecColumnDefinition],
    row_idx_start: usize,
    if_zebra_alt: bool,
    if_strip_markup: bool,
) -> Result<SpecEmitOutput> {
    let n_row_span = case.derive_row_span();
    let n_row_idx_last = row_idx_start + n_row_span - 1;
    if n_row_idx_last >= N_NROWS_EXCEL_MAX {
        return Err(ReportCompileError::RowLimitExceeded {
            row_idx: n_row_idx_last,
            row_max: N_NROWS_EXCEL_MAX,
        });
    }

    let mut output = SpecEmitOutput::new(row_idx_start);
    for n_offset in 0..n_row_span {
        let n_row_idx = row_idx_start + n_offset;
        let l_cells = columns
            .iter()
            .enumerate()
            .map(|(n_col_idx, column)| {
                let cell_ref = SpecCellRef::new(n_row_idx, n_col_idx);
                let source = derive_cell_source(suite, case, column, n_offset);
                render_cell_or_placeholder(
                    cell_ref,
                    &source,
                    if_zebra_alt,
                    if_strip_markup,
                    &mut output.warnings,
                )
            })
            .collect();
        output.rows.push(SpecRow {
            row_idx: n_row_idx,
            cells: l_cells,
        });
    }

    if n_row_span > 1 {
        for (n_col_idx, column) in columns.iter().enumerate() {
            if column.group == EnumColumnGroup::TestCases && !column.property.is_step_track() {
                output.merges.push(SpecMergeRange::vertical(
                    n_col_idx,
                    row_idx_start,
                    n_row_span,
                ));
            }
        }
    }

    output.row_idx_next = row_idx_start + n_row_span;
    Ok(output)
}

fn render_cell_or_placeholder(
    cell_ref: SpecCellRef,
    source: &EnumCellSource,
    if_zebra_alt: bool,
    if_strip_markup: bool,
    l_warnings: &mut Vec<String>,
) -> SpecCell {
    match derive_cell_from_source(cell_ref, source, if_zebra_alt, if_strip_markup) {
        Ok(cell) => cell,
        Err(err) => {
            let c_msg = format!("Cell {}: {err}", cell_ref.to_a1());
            warn!("{c_msg}");
            l_warnings.push(c_msg);
            create_error_cell(cell_ref, if_zebra_alt)
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GroupedRows

/// Plan data rows for a grouped table starting at `row_idx_start`.
pub fn plan_grouped_rows(
    table: &SpecGroupedTable,
    if_strip_markup: bool,
    row_idx_start: usize,
) -> Result<SpecEmitOutput> {
    validate_grouped_table(table)?;

    let n_rows = table.rows.len();
    let n_row_idx_last = row_idx_start + n_rows - 1;
    if n_row_idx_last >= N_NROWS_EXCEL_MAX {
        return Err(ReportCompileError::RowLimitExceeded {
            row_idx: n_row_idx_last,
            row_max: N_NROWS_EXCEL_MAX,
        });
    }

    let l_keys: Vec<String> = table
        .rows
        .iter()
        .map(|row| row[table.col_idx_key].to_key_text())
        .collect();
    let set_group_starts: BTreeSet<usize> = (0..n_rows)
        .filter(|n_idx| *n_idx == 0 || l_keys[*n_idx] != l_keys[*n_idx - 1])
        .collect();

    let mut output = SpecEmitOutput::new(row_idx_start);
    let mut set_covered: BTreeSet<(usize, usize)> = BTreeSet::new();
    for n_col_idx in &table.cols_idx_merge {
        let l_values: Vec<String> = table
            .rows
            .iter()
            .map(|row| row[*n_col_idx].to_key_text())
            .collect();
        for (n_start, n_end) in
            derive_vertical_runs(&l_values, |n_idx| set_group_starts.contains(&n_idx))
        {
            output.merges.push(SpecMergeRange::vertical(
                *n_col_idx,
                row_idx_start + n_start,
                n_end - n_start + 1,
            ));
            set_covered.extend((n_start + 1..=n_end).map(|n_offset| (n_offset, *n_col_idx)));
        }
    }

    let mut if_zebra_alt = false;
    for (n_offset, row) in table.rows.iter().enumerate() {
        let key_prev = n_offset.checked_sub(1).map(|n_prev| &l_keys[n_prev]);
        if should_alternate(key_prev, &l_keys[n_offset]) {
            if_zebra_alt = !if_zebra_alt;
        }

        let n_row_idx = row_idx_start + n_offset;
        let l_cells = row
            .iter()
            .enumerate()
            .map(|(n_col_idx, source)| {
                let mut cell = render_cell_or_placeholder(
                    SpecCellRef::new(n_row_idx, n_col_idx),
                    source,
                    if_zebra_alt,
                    if_strip_markup,
                    &mut output.warnings,
                );
                if set_covered.contains(&(n_offset, n_col_idx)) {
                    cell.content = EnumCellContent::Blank;
                }
                cell
            })
            .collect();
        output.rows.push(SpecRow {
            row_idx: n_row_idx,
            cells: l_cells,
        });
    }

    output.row_idx_next = row_idx_start + n_rows;
    Ok(output)
}

fn validate_grouped_table(table: &SpecGroupedTable) -> Result<()> {
    let n_cols = table.columns.len();
    if n_cols == 0 {
        return Err(ReportCompileError::EmptyColumns("grouped table".to_string()));
    }
    if table.rows.is_empty() {
        return Err(ReportCompileError::InvalidInput(
            "grouped table has no rows".to_string(),
        ));
    }
    if let Some(n_row_idx) = table.rows.iter().position(|row| row.len() != n_cols) {
        return Err(ReportCompileError::InvalidInput(format!(
            "grouped table row {n_row_idx} has {} values, expected {n_cols}",
            table.rows[n_row_idx].len()
        )));
    }
    if table.col_idx_key >= n_cols {
        return Err(ReportCompileError::InvalidInput(format!(
            "grouping key column {} is out of range",
            table.col_idx_key
        )));
    }
    if let Some(n_col_idx) = table.cols_idx_merge.iter().find(|idx| **idx >= n_cols) {
        return Err(ReportCompileError::InvalidInput(format!(
            "merge column {n_col_idx} is out of range"
        )));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
