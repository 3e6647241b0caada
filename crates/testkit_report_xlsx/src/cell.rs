//! Stateless cell constructors and source-value rendering.

use chrono::NaiveDateTime;
use log::debug;

use crate::conf::{C_CELL_ERROR_PLACEHOLDER, N_INT_EXACT_MAX, N_LEN_EXCEL_CELL_TEXT_MAX};
use crate::model::EnumFieldValue;
use crate::spec::{
    CellFormatError, EnumCellContent, EnumCellSource, SpecCell, SpecCellRef, SpecHyperlink,
};
use crate::style::{EnumCellKind, EnumStyleId, select_data_style};
use crate::util::{
    is_sheet_url_supported, is_text_present, parse_date_text, strip_markup, validate_sheet_date,
};

////////////////////////////////////////////////////////////////////////////////
// #region Constructors

/// Styled blank cell.
pub fn create_blank_cell(cell_ref: SpecCellRef, style: EnumStyleId) -> SpecCell {
    SpecCell {
        cell_ref,
        content: EnumCellContent::Blank,
        style,
    }
}

/// Text cell.
pub fn create_text_cell(
    cell_ref: SpecCellRef,
    value: impl Into<String>,
    style: EnumStyleId,
) -> SpecCell {
    SpecCell {
        cell_ref,
        content: EnumCellContent::Text(value.into()),
        style,
    }
}

/// Number cell; `value` must already be validated as finite by the caller.
pub fn create_number_cell(cell_ref: SpecCellRef, value: f64, style: EnumStyleId) -> SpecCell {
    debug_assert!(value.is_finite(), "number cells require finite values");
    SpecCell {
        cell_ref,
        content: EnumCellContent::Number(value),
        style,
    }
}

/// Date cell.
pub fn create_date_cell(cell_ref: SpecCellRef, value: NaiveDateTime, style: EnumStyleId) -> SpecCell {
    SpecCell {
        cell_ref,
        content: EnumCellContent::Date(value),
        style,
    }
}

/// Hyperlink cell; the relationship id is assigned later by the document sink.
pub fn create_hyperlink_cell(
    cell_ref: SpecCellRef,
    text: impl Into<String>,
    url: impl Into<String>,
    style: EnumStyleId,
    tooltip: impl Into<String>,
) -> SpecCell {
    SpecCell {
        cell_ref,
        content: EnumCellContent::Hyperlink(SpecHyperlink {
            text: text.into(),
            url: url.into(),
            tooltip: tooltip.into(),
            relationship_id: None,
        }),
        style,
    }
}

/// `"Error"` placeholder in the active zebra tone.
pub fn create_error_cell(cell_ref: SpecCellRef, if_zebra_alt: bool) -> SpecCell {
    create_text_cell(
        cell_ref,
        C_CELL_ERROR_PLACEHOLDER,
        select_data_style(EnumCellKind::Text, if_zebra_alt),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SourceRendering

/// Render one source value into a styled cell.
///
/// Failures are returned to the caller, which substitutes [`create_error_cell`].
pub fn derive_cell_from_source(
    cell_ref: SpecCellRef,
    source: &EnumCellSource,
    if_zebra_alt: bool,
    if_strip_markup: bool,
) -> Result<SpecCell, CellFormatError> {
    let blank = || create_blank_cell(cell_ref, select_data_style(EnumCellKind::Text, if_zebra_alt));

    match source {
        EnumCellSource::Missing => Ok(blank()),
        EnumCellSource::Text(val) => derive_text_cell(cell_ref, val, if_zebra_alt),
        EnumCellSource::Markup(val) => {
            if if_strip_markup {
                derive_text_cell(cell_ref, &strip_markup(val), if_zebra_alt)
            } else {
                derive_text_cell(cell_ref, val, if_zebra_alt)
            }
        }
        EnumCellSource::Date(val) => {
            if !is_text_present(val) {
                return Ok(blank());
            }
            let dt = parse_date_text(val)?;
            Ok(create_date_cell(
                cell_ref,
                dt,
                select_data_style(EnumCellKind::Date, if_zebra_alt),
            ))
        }
        EnumCellSource::Id(val) => {
            let c_id = val.trim();
            match c_id.parse::<i64>() {
                Ok(n_id) if n_id.to_string() == c_id && n_id.unsigned_abs() <= N_INT_EXACT_MAX => {
                    Ok(create_number_cell(
                        cell_ref,
                        n_id as f64,
                        select_data_style(EnumCellKind::Number, if_zebra_alt),
                    ))
                }
                _ => derive_text_cell(cell_ref, c_id, if_zebra_alt),
            }
        }
        EnumCellSource::Field(value) => derive_field_cell(cell_ref, value, if_zebra_alt),
        EnumCellSource::Link { text, url, tooltip } => {
            let c_text = if is_text_present(text) {
                text.trim()
            } else {
                url.as_deref().unwrap_or_default().trim()
            };
            match url.as_deref().map(str::trim).filter(|c| is_text_present(c)) {
                Some(c_url) if is_sheet_url_supported(c_url) => {
                    check_text_length(c_text)?;
                    Ok(create_hyperlink_cell(
                        cell_ref,
                        c_text,
                        c_url,
                        select_data_style(EnumCellKind::Hyperlink, if_zebra_alt),
                        tooltip.as_str(),
                    ))
                }
                Some(c_url) => {
                    debug!(
                        "Cell {}: unsupported link target {:?}, writing plain text.",
                        cell_ref.to_a1(),
                        c_url
                    );
                    derive_text_cell(cell_ref, c_text, if_zebra_alt)
                }
                None => derive_text_cell(cell_ref, c_text, if_zebra_alt),
            }
        }
    }
}

fn derive_field_cell(
    cell_ref: SpecCellRef,
    value: &EnumFieldValue,
    if_zebra_alt: bool,
) -> Result<SpecCell, CellFormatError> {
    match value {
        EnumFieldValue::Null => Ok(create_blank_cell(
            cell_ref,
            select_data_style(EnumCellKind::Text, if_zebra_alt),
        )),
        EnumFieldValue::Text(val) => derive_text_cell(cell_ref, val, if_zebra_alt),
        EnumFieldValue::Number(val) => {
            if !val.is_finite() {
                return Err(CellFormatError::InvalidNumber(*val));
            }
            Ok(create_number_cell(
                cell_ref,
                *val,
                select_data_style(EnumCellKind::Number, if_zebra_alt),
            ))
        }
        EnumFieldValue::Boolean(val) => {
            derive_text_cell(cell_ref, if *val { "True" } else { "False" }, if_zebra_alt)
        }
        EnumFieldValue::Date(val) => Ok(create_date_cell(
            cell_ref,
            validate_sheet_date(*val)?,
            select_data_style(EnumCellKind::Date, if_zebra_alt),
        )),
        EnumFieldValue::Unknown(raw) => Err(CellFormatError::UnsupportedValue(raw.clone())),
    }
}

fn derive_text_cell(
    cell_ref: SpecCellRef,
    value: &str,
    if_zebra_alt: bool,
) -> Result<SpecCell, CellFormatError> {
    if !is_text_present(value) {
        return Ok(create_blank_cell(
            cell_ref,
            select_data_style(EnumCellKind::Text, if_zebra_alt),
        ));
    }
    check_text_length(value)?;
    let kind = if value.contains('\n') {
        EnumCellKind::TextWrap
    } else {
        EnumCellKind::Text
    };
    Ok(create_text_cell(
        cell_ref,
        value,
        select_data_style(kind, if_zebra_alt),
    ))
}

fn check_text_length(value: &str) -> Result<(), CellFormatError> {
    let n_len = value.chars().count();
    if n_len > N_LEN_EXCEL_CELL_TEXT_MAX {
        return Err(CellFormatError::TextTooLong(n_len));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
