//! `testkit_report_xlsx` v1:
//! Test-execution report compiler for XLSX worksheets.
//!
//! Module layout:
//! - `conf`     : constants and default presets
//! - `spec`     : columns, cells, merges, options, errors
//! - `model`    : input hierarchy (report -> suites -> cases)
//! - `util`     : pure helper functions
//! - `style`    : style index contract and palette registry
//! - `cell`     : cell builders and source rendering
//! - `discover` : column discovery and sparse-column pruning
//! - `emit`     : row emission and merge planning
//! - `coverage` : requirement coverage table
//! - `sink`     : document sink trait and in-memory document
//! - `writer`   : `rust_xlsxwriter`-backed document sink
//! - `compile`  : worksheet orchestrator
pub mod cell;
pub mod compile;
pub mod conf;
pub mod coverage;
pub mod discover;
pub mod emit;
pub mod model;
pub mod sink;
pub mod spec;
pub mod style;
pub mod util;
pub mod writer;

pub use compile::{insert_coverage_sheet, insert_report_sheet};
pub use conf::{
    C_SHEET_NAME_COVERAGE_DEFAULT, C_SHEET_NAME_FLAT_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use coverage::derive_coverage_table;
pub use discover::derive_report_columns;
pub use emit::{SpecEmitOutput, SpecGroupedTable, plan_grouped_rows, plan_report_rows};
pub use model::{
    DictCustomFields, EnumFieldValue, SpecAssociatedItem, SpecTestCase, SpecTestReport,
    SpecTestStep, SpecTestSuite,
};
pub use sink::{DocumentSink, MemoryDocument, SheetHandle};
pub use spec::{
    CellFormatError, EnumCellContent, EnumColumnGroup, EnumColumnProperty, ReportCompileError,
    Result, SpecCell, SpecCellFormat, SpecCellRef, SpecColumnDefinition, SpecMergeRange,
    SpecReportOptions, SpecRow, SpecSheetReport, SpecWorksheet,
};
pub use style::{EnumStyleId, StyleRegistry};
pub use util::{derive_column_letter, parse_column_letter, sanitize_sheet_name};
pub use writer::XlsxDocument;
