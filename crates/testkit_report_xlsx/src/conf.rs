//! Compiler constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{EnumColumnProperty, SpecCellFormat};
use crate::style::EnumStyleId;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel cell text maximum length.
pub const N_LEN_EXCEL_CELL_TEXT_MAX: usize = 32_767;
/// Excel hyperlink target maximum length.
pub const N_LEN_EXCEL_URL_MAX: usize = 2_079;
/// Largest integer magnitude a worksheet number stores exactly.
pub const N_INT_EXACT_MAX: u64 = 1 << 53;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 8] = ["*", ":", "?", "/", "\\", "[", "]", "'"];

/// Sheet name used when the hierarchical report is given a blank name.
pub const C_SHEET_NAME_FLAT_DEFAULT: &str = "Flat Report";
/// Sheet name used when the coverage report is given a blank name.
pub const C_SHEET_NAME_COVERAGE_DEFAULT: &str = "MEWP Internal Validation";
/// Literal written in place of a cell that failed to format.
pub const C_CELL_ERROR_PLACEHOLDER: &str = "Error";

/// Header rows above the data: group-header row and field-header row.
pub const N_ROWS_HEADER: usize = 2;
/// Width for custom-field columns.
pub const N_WIDTH_CUSTOM_FIELD: f64 = 20.0;

/// Date display format for date cells.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd hh:mm";

/// Default target width for a column fed by `property`.
pub fn derive_default_column_width(property: &EnumColumnProperty) -> f64 {
    match property {
        EnumColumnProperty::SuiteName => 30.0,
        EnumColumnProperty::CaseId => 10.0,
        EnumColumnProperty::CaseName => 40.0,
        EnumColumnProperty::ExecutionDate => 18.0,
        EnumColumnProperty::Result => 30.0,
        EnumColumnProperty::FailureType => 16.0,
        EnumColumnProperty::Comment => 40.0,
        EnumColumnProperty::StepNo => 8.0,
        EnumColumnProperty::StepAction => 50.0,
        EnumColumnProperty::StepExpected => 50.0,
        EnumColumnProperty::StepRunStatus => 14.0,
        EnumColumnProperty::StepErrorMessage => 40.0,
        EnumColumnProperty::History => 40.0,
        EnumColumnProperty::RunBy => 18.0,
        EnumColumnProperty::Configuration => 20.0,
        EnumColumnProperty::State => 14.0,
        EnumColumnProperty::StateChangeDate => 18.0,
        EnumColumnProperty::ItemId => 12.0,
        EnumColumnProperty::ItemTitle => 40.0,
        EnumColumnProperty::CaseCustom(_) | EnumColumnProperty::ItemCustom(_) => {
            N_WIDTH_CUSTOM_FIELD
        }
    }
}

/// Build the default style palette keyed by style index.
pub fn derive_default_style_formats() -> BTreeMap<EnumStyleId, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("top".to_string()),
        ..Default::default()
    };
    let fmt_fill_a = SpecCellFormat {
        bg_color: Some("#FFFFFF".to_string()),
        ..Default::default()
    };
    let fmt_fill_b = SpecCellFormat {
        bg_color: Some("#EAF1FB".to_string()),
        ..Default::default()
    };
    let fmt_date = cfg_base_fmt_spec.with_(SpecCellFormat {
        num_format: Some(C_NUM_FORMAT_DATE.to_string()),
        align: Some("center".to_string()),
        ..Default::default()
    });
    let fmt_wrap = cfg_base_fmt_spec.with_(SpecCellFormat {
        text_wrap: Some(true),
        ..Default::default()
    });
    let fmt_number = cfg_base_fmt_spec.with_(SpecCellFormat {
        num_format: Some("General".to_string()),
        align: Some("center".to_string()),
        ..Default::default()
    });
    let fmt_link = cfg_base_fmt_spec.with_(SpecCellFormat {
        underline: Some(true),
        font_color: Some("#0563C1".to_string()),
        ..Default::default()
    });
    let fmt_group_header = cfg_base_fmt_spec.with_(SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        valign: Some("vcenter".to_string()),
        font_color: Some("#FFFFFF".to_string()),
        ..Default::default()
    });

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(EnumStyleId::Default, cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        EnumStyleId::FieldHeader,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            bg_color: Some("#D9E1F2".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleId::SuiteTitle,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            font_size: Some(12),
            valign: Some("vcenter".to_string()),
            bg_color: Some("#B4C6E7".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(EnumStyleId::DateA, fmt_date.merge(&fmt_fill_a));
    dict_fmt.insert(EnumStyleId::DateB, fmt_date.merge(&fmt_fill_b));
    dict_fmt.insert(EnumStyleId::TextA, cfg_base_fmt_spec.merge(&fmt_fill_a));
    dict_fmt.insert(EnumStyleId::TextB, cfg_base_fmt_spec.merge(&fmt_fill_b));
    dict_fmt.insert(EnumStyleId::TextWrapA, fmt_wrap.merge(&fmt_fill_a));
    dict_fmt.insert(EnumStyleId::TextWrapB, fmt_wrap.merge(&fmt_fill_b));
    dict_fmt.insert(EnumStyleId::NumberA, fmt_number.merge(&fmt_fill_a));
    dict_fmt.insert(EnumStyleId::NumberB, fmt_number.merge(&fmt_fill_b));
    dict_fmt.insert(EnumStyleId::HyperlinkA, fmt_link.merge(&fmt_fill_a));
    dict_fmt.insert(EnumStyleId::HyperlinkB, fmt_link.merge(&fmt_fill_b));
    dict_fmt.insert(
        EnumStyleId::GroupHeaderTestCases,
        fmt_group_header.with_(SpecCellFormat {
            bg_color: Some("#4472C4".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleId::GroupHeaderRequirements,
        fmt_group_header.with_(SpecCellFormat {
            bg_color: Some("#70AD47".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleId::GroupHeaderBugs,
        fmt_group_header.with_(SpecCellFormat {
            bg_color: Some("#C00000".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleId::GroupHeaderCrs,
        fmt_group_header.with_(SpecCellFormat {
            bg_color: Some("#ED7D31".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}
