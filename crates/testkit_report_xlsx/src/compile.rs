//! Report orchestrator: validate, discover, plan, then write one worksheet.

use std::collections::BTreeMap;

use log::{debug, error, info};

use crate::conf::{C_SHEET_NAME_COVERAGE_DEFAULT, C_SHEET_NAME_FLAT_DEFAULT, N_ROWS_HEADER};
use crate::coverage::derive_coverage_table;
use crate::discover::derive_report_columns;
use crate::emit::{SpecEmitOutput, plan_grouped_rows, plan_header_rows, plan_report_rows};
use crate::model::SpecTestReport;
use crate::sink::DocumentSink;
use crate::spec::{
    EnumCellContent, EnumColumnGroup, ReportCompileError, Result, SpecColumnDefinition,
    SpecReportOptions, SpecSheetReport,
};
use crate::style::StyleRegistry;
use crate::util::is_text_present;

/// Compile the hierarchical report of `report` into a new worksheet.
///
/// A blank `worksheet_name` falls back to `"Flat Report"`.
pub fn insert_report_sheet<D: DocumentSink>(
    document: &mut D,
    worksheet_name: &str,
    report: &SpecTestReport,
    options: &SpecReportOptions,
    registry: &StyleRegistry,
) -> Result<SpecSheetReport> {
    let c_name = derive_worksheet_name(worksheet_name, C_SHEET_NAME_FLAT_DEFAULT);
    compile_report_sheet(document, &c_name, report, options, registry).inspect_err(|err| {
        error!("Failed to compile worksheet {c_name:?}: {err}");
    })
}

/// Compile the requirement coverage table of `report` into a new worksheet.
///
/// A blank `worksheet_name` falls back to `"MEWP Internal Validation"`.
pub fn insert_coverage_sheet<D: DocumentSink>(
    document: &mut D,
    worksheet_name: &str,
    report: &SpecTestReport,
    options: &SpecReportOptions,
    registry: &StyleRegistry,
) -> Result<SpecSheetReport> {
    let c_name = derive_worksheet_name(worksheet_name, C_SHEET_NAME_COVERAGE_DEFAULT);
    compile_coverage_sheet(document, &c_name, report, options, registry).inspect_err(|err| {
        error!("Failed to compile worksheet {c_name:?}: {err}");
    })
}

fn derive_worksheet_name(worksheet_name: &str, name_default: &str) -> String {
    if is_text_present(worksheet_name) {
        worksheet_name.trim().to_string()
    } else {
        name_default.to_string()
    }
}

fn validate_report(report: &SpecTestReport) -> Result<()> {
    for (suite, case) in report.iter_cases() {
        if !is_text_present(&case.id) {
            return Err(ReportCompileError::InvalidInput(format!(
                "case {:?} in suite {:?} has a blank identifier",
                case.title, suite.name
            )));
        }
    }
    Ok(())
}

fn compile_report_sheet<D: DocumentSink>(
    document: &mut D,
    worksheet_name: &str,
    report: &SpecTestReport,
    options: &SpecReportOptions,
    registry: &StyleRegistry,
) -> Result<SpecSheetReport> {
    validate_report(report)?;
    let l_columns = derive_report_columns(report, options.if_group_by_suite);
    if l_columns.is_empty() {
        return Err(ReportCompileError::EmptyColumns(worksheet_name.to_string()));
    }

    let mut dict_group_counts = BTreeMap::from([(EnumColumnGroup::TestCases, report.count_cases())]);
    for group in EnumColumnGroup::ITEM_GROUPS {
        dict_group_counts.insert(group, report.count_items(group));
    }
    let header = plan_header_rows(&l_columns, &dict_group_counts, 0);
    let body = plan_report_rows(report, &l_columns, options, N_ROWS_HEADER)?;
    debug!(
        "Worksheet {worksheet_name:?}: {} columns, {} data rows planned.",
        l_columns.len(),
        body.rows.len()
    );

    write_worksheet(document, worksheet_name, &l_columns, header, body, options, registry)
}

fn compile_coverage_sheet<D: DocumentSink>(
    document: &mut D,
    worksheet_name: &str,
    report: &SpecTestReport,
    options: &SpecReportOptions,
    registry: &StyleRegistry,
) -> Result<SpecSheetReport> {
    validate_report(report)?;
    let table = derive_coverage_table(report);
    let header = plan_header_rows(&table.columns, &table.dict_group_counts, 0);
    let body = plan_grouped_rows(&table, options.if_strip_markup, N_ROWS_HEADER)?;
    debug!(
        "Worksheet {worksheet_name:?}: {} columns, {} coverage rows planned.",
        table.columns.len(),
        body.rows.len()
    );

    write_worksheet(
        document,
        worksheet_name,
        &table.columns,
        header,
        body,
        options,
        registry,
    )
}

/// Push planned rows and merges into the sink and finalize the worksheet.
fn write_worksheet<D: DocumentSink>(
    document: &mut D,
    worksheet_name: &str,
    columns: &[SpecColumnDefinition],
    header: SpecEmitOutput,
    body: SpecEmitOutput,
    options: &SpecReportOptions,
    registry: &StyleRegistry,
) -> Result<SpecSheetReport> {
    registry.validate()?;
    document.ensure_styles(registry)?;
    let sheet = document.add_worksheet(worksheet_name)?;

    let mut report = SpecSheetReport {
        sheet_name: document.worksheet_name(sheet)?.to_string(),
        cnt_columns: columns.len(),
        ..Default::default()
    };

    for (n_col_idx, column) in columns.iter().enumerate() {
        document.set_column_width(sheet, n_col_idx, column.width)?;
    }

    for mut row in header.rows.into_iter().chain(body.rows) {
        for cell in &mut row.cells {
            if let EnumCellContent::Hyperlink(link) = &mut cell.content {
                link.relationship_id = Some(document.register_hyperlink(sheet, &link.url)?);
                report.cnt_hyperlinks += 1;
            }
        }
        document.append_row(sheet, row)?;
        report.cnt_rows += 1;
    }

    for merge in header.merges.into_iter().chain(body.merges) {
        document.add_merge_range(sheet, merge)?;
        report.cnt_merges += 1;
    }

    if options.if_freeze_header {
        document.set_freeze_panes(sheet, N_ROWS_HEADER, options.col_freeze)?;
    }
    document.finalize_worksheet(sheet)?;

    for c_warning in body.warnings {
        report.warn(c_warning);
    }
    info!("{}", report.format("Compiled"));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SpecAssociatedItem, SpecTestCase, SpecTestStep, SpecTestSuite};
    use crate::sink::MemoryDocument;
    use crate::spec::EnumColumnProperty;
    use crate::style::EnumStyleId;
    use crate::writer::XlsxDocument;

    fn build_report() -> SpecTestReport {
        SpecTestReport {
            name: "Nightly".to_string(),
            suites: vec![SpecTestSuite {
                name: "Login".to_string(),
                cases: vec![
                    SpecTestCase {
                        id: "101".to_string(),
                        title: "Valid login".to_string(),
                        execution_date: Some("2024-03-05 10:20:30".to_string()),
                        result_message: Some("Passed".to_string()),
                        steps: vec![
                            SpecTestStep {
                                step_no: "1".to_string(),
                                action: "<p>Open page</p>".to_string(),
                                ..Default::default()
                            },
                            SpecTestStep {
                                step_no: "2".to_string(),
                                action: "Submit".to_string(),
                                ..Default::default()
                            },
                        ],
                        requirements: vec![SpecAssociatedItem {
                            id: "REQ-1".to_string(),
                            title: "Login".to_string(),
                            url: Some("https://example.org/req/1".to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                    SpecTestCase {
                        id: "102".to_string(),
                        title: "Locked account".to_string(),
                        result_message: Some("Failed".to_string()),
                        requirements: vec![SpecAssociatedItem {
                            id: "REQ-2".to_string(),
                            title: "Lockout".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_blank_sheet_name_uses_default() {
        let mut document = MemoryDocument::new();
        let registry = StyleRegistry::default();
        let options = SpecReportOptions::default();

        let report = insert_report_sheet(&mut document, "  ", &build_report(), &options, &registry)
            .unwrap();
        assert_eq!(report.sheet_name, "Flat Report");

        let report =
            insert_coverage_sheet(&mut document, "", &build_report(), &options, &registry).unwrap();
        assert_eq!(report.sheet_name, "MEWP Internal Validation");
        assert_eq!(document.worksheets().len(), 2);
    }

    #[test]
    fn test_report_sheet_layout() {
        let mut document = MemoryDocument::new();
        let report = insert_report_sheet(
            &mut document,
            "Run 42",
            &build_report(),
            &SpecReportOptions::default(),
            &StyleRegistry::default(),
        )
        .unwrap();

        let ws = &document.worksheets()[0];
        assert_eq!(ws.name, "Run 42");
        assert_eq!(report.cnt_rows, 2 + 3);
        assert_eq!(ws.freeze_panes, Some((2, 0)));
        assert_eq!(ws.hyperlinks, vec!["https://example.org/req/1".to_string()]);
        assert_eq!(report.cnt_hyperlinks, 1);
        assert!(report.warnings.is_empty());
        assert!(document.style_registry().is_some());

        let cell_group = ws.cell(0, 0).unwrap();
        assert_eq!(
            cell_group.content,
            EnumCellContent::Text("Test Cases (2)".to_string())
        );
        assert_eq!(cell_group.style, EnumStyleId::GroupHeaderTestCases);

        let n_col_req = ws.rows[0]
            .cells
            .iter()
            .position(|cell| cell.style == EnumStyleId::GroupHeaderRequirements)
            .unwrap();
        assert_eq!(
            ws.cell(0, n_col_req).unwrap().content,
            EnumCellContent::Text("Requirements (2)".to_string())
        );

        let n_col_title = n_col_req + 1;
        match &ws.cell(2, n_col_title).unwrap().content {
            EnumCellContent::Hyperlink(link) => {
                assert_eq!(link.text, "REQ-1 Login");
                assert_eq!(link.relationship_id.as_deref(), Some("rId1"));
            }
            other => panic!("unexpected content {other:?}"),
        }
        let cell_plain = ws.cell(4, n_col_title).unwrap();
        assert_eq!(
            cell_plain.content,
            EnumCellContent::Text("REQ-2 Lockout".to_string())
        );
        assert_eq!(cell_plain.style, EnumStyleId::TextB);

        for (n_idx, merge) in ws.merges.iter().enumerate() {
            for other in &ws.merges[n_idx + 1..] {
                assert!(!merge.is_overlapping(other));
            }
        }
    }

    #[test]
    fn test_blank_case_id_fails_before_writing() {
        let mut report = build_report();
        report.suites[0].cases[1].id = " ".to_string();
        let mut document = MemoryDocument::new();

        let result = insert_report_sheet(
            &mut document,
            "Run",
            &report,
            &SpecReportOptions::default(),
            &StyleRegistry::default(),
        );
        assert!(matches!(result, Err(ReportCompileError::InvalidInput(_))));
        assert!(document.worksheets().is_empty());
    }

    #[test]
    fn test_report_without_cases_has_no_columns() {
        let mut document = MemoryDocument::new();
        let result = insert_report_sheet(
            &mut document,
            "Run",
            &SpecTestReport::default(),
            &SpecReportOptions::default(),
            &StyleRegistry::default(),
        );
        assert!(matches!(result, Err(ReportCompileError::EmptyColumns(_))));
    }

    #[test]
    fn test_group_by_suite_drops_suite_column() {
        let mut document = MemoryDocument::new();
        let options = SpecReportOptions {
            if_group_by_suite: true,
            ..Default::default()
        };
        insert_report_sheet(
            &mut document,
            "Run",
            &build_report(),
            &options,
            &StyleRegistry::default(),
        )
        .unwrap();

        let ws = &document.worksheets()[0];
        assert_eq!(
            ws.cell(1, 0).unwrap().content,
            EnumCellContent::Text(EnumColumnProperty::CaseId.label())
        );
        assert_eq!(ws.cell(2, 0).unwrap().style, EnumStyleId::SuiteTitle);
    }

    #[test]
    fn test_workbook_is_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nightly.xlsx");
        let mut document = XlsxDocument::new(&path);
        let registry = StyleRegistry::default();
        let options = SpecReportOptions::default();

        insert_report_sheet(&mut document, "Run", &build_report(), &options, &registry).unwrap();
        insert_coverage_sheet(&mut document, "", &build_report(), &options, &registry).unwrap();
        document.close().unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(document.document().worksheets().len(), 2);
    }

    #[test]
    fn test_schemeless_item_url_keeps_worksheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = XlsxDocument::new(dir.path().join("nightly.xlsx"));
        let registry = StyleRegistry::default();
        let mut report = build_report();
        report.suites[0].cases[0].requirements[0].url = Some("www.example.org/req/1".to_string());

        let options = SpecReportOptions::default();

        let sheet_report =
            insert_report_sheet(&mut document, "Run", &report, &options, &registry).unwrap();
        document.close().unwrap();

        let ws = &document.document().worksheets()[0];
        assert_eq!(ws.name, sheet_report.sheet_name);
        assert!(
            ws.rows
                .iter()
                .flat_map(|row| row.cells.iter())
                .any(|cell| cell.content == EnumCellContent::Text("REQ-1 Login".to_string()))
        );
    }
}
