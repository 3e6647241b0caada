//! Shared compiler specification models: columns, cells, merges, options, errors.

use chrono::NaiveDateTime;

use crate::model::EnumFieldValue;
use crate::style::EnumStyleId;
use crate::util::{derive_cell_reference, humanize_field_name, is_text_present};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; one entry of the style palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Single underline.
    pub underline: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnSpecification

/// Logical column group; drives the group-header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumColumnGroup {
    /// Case-level and step/history columns.
    TestCases,
    /// Linked requirement columns.
    Requirements,
    /// Linked bug columns.
    Bugs,
    /// Linked change-request columns.
    Crs,
}

impl EnumColumnGroup {
    /// Associated-item groups in emission order.
    pub const ITEM_GROUPS: [EnumColumnGroup; 3] = [Self::Requirements, Self::Bugs, Self::Crs];

    /// Display name used in the group-header row.
    pub fn label(self) -> &'static str {
        match self {
            Self::TestCases => "Test Cases",
            Self::Requirements => "Requirements",
            Self::Bugs => "Bugs",
            Self::Crs => "CRs",
        }
    }

    /// Singular noun used in hyperlink tooltips.
    pub fn item_noun(self) -> &'static str {
        match self {
            Self::TestCases => "test case",
            Self::Requirements => "requirement",
            Self::Bugs => "bug",
            Self::Crs => "change request",
        }
    }
}

/// What data feeds a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumColumnProperty {
    /// Suite name (only when not grouping by suite).
    SuiteName,
    /// Case identifier.
    CaseId,
    /// Case title.
    CaseName,
    /// Execution date.
    ExecutionDate,
    /// Result message, linked to the result page when available.
    Result,
    /// Failure classification.
    FailureType,
    /// Case comment.
    Comment,
    /// Step number/label.
    StepNo,
    /// Step action text.
    StepAction,
    /// Step expected-result text.
    StepExpected,
    /// Step run status.
    StepRunStatus,
    /// Step error message.
    StepErrorMessage,
    /// History entry.
    History,
    /// Executor.
    RunBy,
    /// Configuration name.
    Configuration,
    /// Work item state.
    State,
    /// Date of the last state change.
    StateChangeDate,
    /// Case-level custom field by raw name.
    CaseCustom(String),
    /// Associated-item identifier.
    ItemId,
    /// Associated-item display text (`"{id} {title}"`).
    ItemTitle,
    /// Associated-item custom field by raw name.
    ItemCustom(String),
}

impl EnumColumnProperty {
    /// Whether the column belongs to the step/history track (varies per row).
    pub fn is_step_track(&self) -> bool {
        matches!(
            self,
            Self::StepNo
                | Self::StepAction
                | Self::StepExpected
                | Self::StepRunStatus
                | Self::StepErrorMessage
                | Self::History
        )
    }

    /// Whether the column is fed by an associated item rather than the case.
    pub fn is_item_property(&self) -> bool {
        matches!(self, Self::ItemId | Self::ItemTitle | Self::ItemCustom(_))
    }

    /// Human-readable header label.
    pub fn label(&self) -> String {
        match self {
            Self::SuiteName => "Suite".to_string(),
            Self::CaseId => "ID".to_string(),
            Self::CaseName => "Title".to_string(),
            Self::ExecutionDate => "Execution Date".to_string(),
            Self::Result => "Result".to_string(),
            Self::FailureType => "Failure Type".to_string(),
            Self::Comment => "Comment".to_string(),
            Self::StepNo => "Step".to_string(),
            Self::StepAction => "Action".to_string(),
            Self::StepExpected => "Expected Result".to_string(),
            Self::StepRunStatus => "Step Status".to_string(),
            Self::StepErrorMessage => "Step Error".to_string(),
            Self::History => "History".to_string(),
            Self::RunBy => "Run By".to_string(),
            Self::Configuration => "Configuration".to_string(),
            Self::State => "State".to_string(),
            Self::StateChangeDate => "State Change Date".to_string(),
            Self::ItemId => "ID".to_string(),
            Self::ItemTitle => "Title".to_string(),
            Self::CaseCustom(name) | Self::ItemCustom(name) => humanize_field_name(name),
        }
    }
}

/// One emitted column: label, width, data source and group tag.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecColumnDefinition {
    /// Header display name.
    pub name: String,
    /// Target column width (character units).
    pub width: f64,
    /// Data source key.
    pub property: EnumColumnProperty,
    /// Group tag.
    pub group: EnumColumnGroup,
}

impl SpecColumnDefinition {
    /// Build a definition labelled from its property.
    pub fn new(property: EnumColumnProperty, group: EnumColumnGroup, width: f64) -> Self {
        Self {
            name: property.label(),
            width,
            property,
            group,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellSpecification

/// Zero-based cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecCellRef {
    /// Zero-based row index.
    pub row_idx: usize,
    /// Zero-based column index.
    pub col_idx: usize,
}

impl SpecCellRef {
    /// Create address from zero-based row/column.
    pub fn new(row_idx: usize, col_idx: usize) -> Self {
        Self { row_idx, col_idx }
    }

    /// A1-style reference (`(0, 0)` -> `"A1"`).
    pub fn to_a1(self) -> String {
        derive_cell_reference(self.row_idx, self.col_idx)
    }
}

/// Hyperlink payload of a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecHyperlink {
    /// Display text.
    pub text: String,
    /// Link target.
    pub url: String,
    /// Hover tooltip.
    pub tooltip: String,
    /// Relationship id assigned by the document sink on registration.
    pub relationship_id: Option<String>,
}

/// Typed cell payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellContent {
    /// Styled blank cell.
    Blank,
    /// Text value.
    Text(String),
    /// Finite numeric value.
    Number(f64),
    /// Date-time value.
    Date(NaiveDateTime),
    /// Hyperlink cell.
    Hyperlink(SpecHyperlink),
}

impl EnumCellContent {
    /// Display text of the cell (empty for blanks).
    pub fn to_display_text(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Text(val) => val.clone(),
            Self::Number(val) => val.to_string(),
            Self::Date(val) => val.format("%Y-%m-%d %H:%M").to_string(),
            Self::Hyperlink(link) => link.text.clone(),
        }
    }
}

/// One addressable cell bound to exactly one style index.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCell {
    /// Cell address.
    pub cell_ref: SpecCellRef,
    /// Cell payload.
    pub content: EnumCellContent,
    /// Palette style.
    pub style: EnumStyleId,
}

/// One physical worksheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRow {
    /// Zero-based row index.
    pub row_idx: usize,
    /// Cells in column order.
    pub cells: Vec<SpecCell>,
}

impl SpecRow {
    /// Cell at zero-based column index.
    pub fn cell(&self, col_idx: usize) -> Option<&SpecCell> {
        self.cells.iter().find(|cell| cell.cell_ref.col_idx == col_idx)
    }
}

/// Source value of one cell before rendering.
///
/// Shared by sparse-column pruning and cell rendering so both agree on emptiness.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellSource {
    /// Nothing at this position (past the end of a track, or an absent optional).
    Missing,
    /// Plain text.
    Text(String),
    /// Text that may carry markup.
    Markup(String),
    /// Date text to be parsed.
    Date(String),
    /// Identifier; numeric identifiers render as numbers.
    Id(String),
    /// Custom-field value.
    Field(EnumFieldValue),
    /// Text that links to `url` when one is present.
    Link {
        /// Display text.
        text: String,
        /// Optional target.
        url: Option<String>,
        /// Tooltip used when the link renders.
        tooltip: String,
    },
}

impl EnumCellSource {
    /// Single emptiness predicate used by discovery, pruning and emission.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Text(val) | Self::Markup(val) | Self::Date(val) | Self::Id(val) => {
                is_text_present(val)
            }
            Self::Field(val) => val.is_present(),
            Self::Link { text, url, .. } => {
                is_text_present(text) || url.as_deref().is_some_and(is_text_present)
            }
        }
    }

    /// Text used for grouping keys and identical-run detection.
    pub fn to_key_text(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(val) | Self::Markup(val) | Self::Date(val) | Self::Id(val) => {
                val.trim().to_string()
            }
            Self::Field(val) => val.to_key_text(),
            Self::Link { text, url, .. } => {
                if is_text_present(text) {
                    text.trim().to_string()
                } else {
                    url.clone().unwrap_or_default()
                }
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MergeSpecification

/// Inclusive rectangular merge range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecMergeRange {
    /// First row (inclusive).
    pub row_idx_start: usize,
    /// First column (inclusive).
    pub col_idx_start: usize,
    /// Last row (inclusive).
    pub row_idx_end: usize,
    /// Last column (inclusive).
    pub col_idx_end: usize,
}

impl SpecMergeRange {
    /// Vertical range of `n_rows` rows in one column.
    pub fn vertical(col_idx: usize, row_idx_start: usize, n_rows: usize) -> Self {
        Self {
            row_idx_start,
            col_idx_start: col_idx,
            row_idx_end: row_idx_start + n_rows.saturating_sub(1),
            col_idx_end: col_idx,
        }
    }

    /// Horizontal range within one row.
    pub fn horizontal(row_idx: usize, col_idx_start: usize, col_idx_end: usize) -> Self {
        Self {
            row_idx_start: row_idx,
            col_idx_start,
            row_idx_end: row_idx,
            col_idx_end,
        }
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        self.row_idx_end - self.row_idx_start + 1
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.col_idx_end - self.col_idx_start + 1
    }

    /// Whether `(row_idx, col_idx)` lies inside the range.
    pub fn contains(&self, row_idx: usize, col_idx: usize) -> bool {
        (self.row_idx_start..=self.row_idx_end).contains(&row_idx)
            && (self.col_idx_start..=self.col_idx_end).contains(&col_idx)
    }

    /// Whether two ranges share at least one cell.
    pub fn is_overlapping(&self, other: &SpecMergeRange) -> bool {
        self.row_idx_start <= other.row_idx_end
            && other.row_idx_start <= self.row_idx_end
            && self.col_idx_start <= other.col_idx_end
            && other.col_idx_start <= self.col_idx_end
    }

    /// A1-style range reference, e.g. `"B3:B5"`.
    pub fn to_a1(&self) -> String {
        format!(
            "{}:{}",
            derive_cell_reference(self.row_idx_start, self.col_idx_start),
            derive_cell_reference(self.row_idx_end, self.col_idx_end)
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorksheetSpecification

/// Finished logical worksheet handed to the container serializer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecWorksheet {
    /// Final (sanitized, unique) sheet name.
    pub name: String,
    /// Rows in ascending row order, header rows included.
    pub rows: Vec<SpecRow>,
    /// Merge ranges.
    pub merges: Vec<SpecMergeRange>,
    /// Column widths by zero-based column index.
    pub col_widths: Vec<f64>,
    /// Frozen pane `(row_idx, col_idx)` when set.
    pub freeze_panes: Option<(usize, usize)>,
    /// Registered hyperlink targets; position `n` is relationship `rId{n + 1}`.
    pub hyperlinks: Vec<String>,
}

impl SpecWorksheet {
    /// Cell at `(row_idx, col_idx)`.
    pub fn cell(&self, row_idx: usize, col_idx: usize) -> Option<&SpecCell> {
        self.rows
            .iter()
            .find(|row| row.row_idx == row_idx)
            .and_then(|row| row.cell(col_idx))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Options for one compiled worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecReportOptions {
    /// Emit one title row per suite instead of a suite column.
    pub if_group_by_suite: bool,
    /// Reduce step markup to plain text.
    pub if_strip_markup: bool,
    /// Freeze panes below the two header rows.
    pub if_freeze_header: bool,
    /// Number of frozen columns when freezing.
    pub col_freeze: usize,
}

impl Default for SpecReportOptions {
    fn default() -> Self {
        Self {
            if_group_by_suite: false,
            if_strip_markup: true,
            if_freeze_header: true,
            col_freeze: 0,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-insert compile report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetReport {
    /// Actual worksheet name in the workbook.
    pub sheet_name: String,
    /// Emitted columns.
    pub cnt_columns: usize,
    /// Emitted rows, header rows included.
    pub cnt_rows: usize,
    /// Recorded merge ranges.
    pub cnt_merges: usize,
    /// Registered hyperlinks.
    pub cnt_hyperlinks: usize,
    /// Non-fatal warnings (cell placeholders, skipped cases).
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} sheet={:?} columns={} rows={} merges={} hyperlinks={} warnings={}",
            self.sheet_name,
            self.cnt_columns,
            self.cnt_rows,
            self.cnt_merges,
            self.cnt_hyperlinks,
            self.warnings.len()
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Top-level compile failures (preconditions and stage errors).
#[derive(Debug, thiserror::Error)]
pub enum ReportCompileError {
    /// Input failed validation before any row was written.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Column discovery produced nothing to emit.
    #[error("No columns to emit for worksheet {0:?}.")]
    EmptyColumns(String),

    /// A block would land beyond the worksheet row limit.
    #[error("Row limit exceeded: row {row_idx} is beyond the maximum of {row_max} rows.")]
    RowLimitExceeded {
        /// Offending zero-based row index.
        row_idx: usize,
        /// Worksheet row capacity.
        row_max: usize,
    },

    /// Style registry lacks an index referenced by the compiler.
    #[error("Style registry is missing style index {0}.")]
    StyleMissing(u16),

    /// Document sink rejected an operation.
    #[error("Document sink: {0}")]
    Sink(String),

    /// Container writer error.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Input decoding error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReportCompileError>;

/// Recoverable single-cell formatting failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CellFormatError {
    /// Date text matched none of the accepted formats.
    #[error("unparseable date {0:?}")]
    InvalidDate(String),
    /// NaN or infinite number.
    #[error("non-finite number {0}")]
    InvalidNumber(f64),
    /// Custom-field value of an unsupported shape.
    #[error("unsupported value {0}")]
    UnsupportedValue(String),
    /// Text longer than a cell can hold.
    #[error("text of {0} characters exceeds the cell limit")]
    TextTooLong(usize),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_format_merge_overlays_right_side() {
        let fmt_base = SpecCellFormat {
            font_name: Some("Calibri".to_string()),
            bold: Some(false),
            border: Some(1),
            ..Default::default()
        };
        let fmt = fmt_base.with_(SpecCellFormat {
            bold: Some(true),
            bg_color: Some("#FFFFFF".to_string()),
            ..Default::default()
        });

        assert_eq!(fmt.font_name.as_deref(), Some("Calibri"));
        assert_eq!(fmt.bold, Some(true));
        assert_eq!(fmt.border, Some(1));
        assert_eq!(fmt.bg_color.as_deref(), Some("#FFFFFF"));
    }

    #[test]
    fn test_merge_range_geometry() {
        let merge = SpecMergeRange::vertical(1, 2, 3);
        assert_eq!(merge.to_a1(), "B3:B5");
        assert_eq!(merge.height(), 3);
        assert_eq!(merge.width(), 1);
        assert!(merge.contains(4, 1));
        assert!(!merge.contains(5, 1));

        let merge_h = SpecMergeRange::horizontal(0, 0, 3);
        assert_eq!(merge_h.to_a1(), "A1:D1");
        assert!(!merge.is_overlapping(&merge_h));
        assert!(merge.is_overlapping(&SpecMergeRange::vertical(1, 4, 2)));
        assert!(!merge.is_overlapping(&SpecMergeRange::vertical(1, 5, 2)));
    }

    #[test]
    fn test_cell_source_presence() {
        assert!(!EnumCellSource::Missing.is_present());
        assert!(!EnumCellSource::Text(" ".to_string()).is_present());
        assert!(EnumCellSource::Id("7".to_string()).is_present());
        assert!(
            EnumCellSource::Link {
                text: String::new(),
                url: Some("https://example.org".to_string()),
                tooltip: String::new(),
            }
            .is_present()
        );
    }

    #[test]
    fn test_custom_property_label_is_humanized() {
        assert_eq!(
            EnumColumnProperty::CaseCustom("automationStatus".to_string()).label(),
            "Automation Status"
        );
        assert!(EnumColumnProperty::History.is_step_track());
        assert!(!EnumColumnProperty::CaseId.is_step_track());
    }
}
