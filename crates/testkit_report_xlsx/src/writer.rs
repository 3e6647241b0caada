//! `rust_xlsxwriter`-backed document sink.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::debug;
use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, FormatUnderline, Url, Workbook, Worksheet,
};

use crate::sink::{DocumentSink, MemoryDocument, SheetHandle};
use crate::spec::{
    EnumCellContent, ReportCompileError, Result, SpecCell, SpecCellFormat, SpecMergeRange,
    SpecRow, SpecWorksheet,
};
use crate::style::{EnumStyleId, StyleRegistry};

/// Stateful workbook writer.
///
/// Worksheets are planned in a [`MemoryDocument`] and serialized into the
/// workbook on finalize; the workbook is buffered in memory until [`Self::close`].
pub struct XlsxDocument {
    path_file_out: PathBuf,
    workbook: Workbook,
    document: MemoryDocument,
    dict_formats: BTreeMap<EnumStyleId, Format>,
    if_closed: bool,
}

impl XlsxDocument {
    /// Create writer bound to an output path.
    pub fn new(path_file_out: impl Into<PathBuf>) -> Self {
        Self {
            path_file_out: path_file_out.into(),
            workbook: Workbook::new(),
            document: MemoryDocument::new(),
            dict_formats: BTreeMap::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Logical worksheets written so far.
    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    /// Serialize the workbook to bytes without touching the output path.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }

    fn derive_format(&self, style: EnumStyleId) -> Result<&Format> {
        self.dict_formats
            .get(&style)
            .ok_or(ReportCompileError::StyleMissing(style.index()))
    }

    fn build_worksheet(&self, spec: &SpecWorksheet) -> Result<Worksheet> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&spec.name)?;

        for (n_col_idx, n_width) in spec.col_widths.iter().enumerate() {
            if *n_width > 0.0 {
                worksheet.set_column_width(cast_col_num(n_col_idx)?, *n_width)?;
            }
        }

        // Merges first; the anchor cell is then overwritten with its typed value.
        for merge in &spec.merges {
            let style = spec
                .cell(merge.row_idx_start, merge.col_idx_start)
                .map_or(EnumStyleId::Default, |cell| cell.style);
            write_merge_range(&mut worksheet, merge, self.derive_format(style)?)?;
        }

        for row in &spec.rows {
            self.write_row(&mut worksheet, row)?;
        }

        if let Some((n_row_idx, n_col_idx)) = spec.freeze_panes {
            worksheet.set_freeze_panes(cast_row_num(n_row_idx)?, cast_col_num(n_col_idx)?)?;
        }
        Ok(worksheet)
    }

    fn write_row(&self, worksheet: &mut Worksheet, row: &SpecRow) -> Result<()> {
        for cell in &row.cells {
            write_cell_with_format(worksheet, cell, self.derive_format(cell.style)?)?;
        }
        Ok(())
    }
}

impl DocumentSink for XlsxDocument {
    fn ensure_styles(&mut self, registry: &StyleRegistry) -> Result<()> {
        if self.document.style_registry().is_some() {
            return Ok(());
        }
        self.document.ensure_styles(registry)?;
        self.dict_formats = registry
            .iter()
            .map(|(style, spec)| (style, derive_rust_xlsx_format(spec)))
            .collect();
        debug!("Attached {} cell formats.", self.dict_formats.len());
        Ok(())
    }

    fn add_worksheet(&mut self, name: &str) -> Result<SheetHandle> {
        if self.if_closed {
            return Err(ReportCompileError::Sink("workbook is closed".to_string()));
        }
        self.document.add_worksheet(name)
    }

    fn worksheet_by_name(&self, name: &str) -> Option<SheetHandle> {
        self.document.worksheet_by_name(name)
    }

    fn worksheet_name(&self, sheet: SheetHandle) -> Result<&str> {
        self.document.worksheet_name(sheet)
    }

    fn set_column_width(&mut self, sheet: SheetHandle, col_idx: usize, width: f64) -> Result<()> {
        self.document.set_column_width(sheet, col_idx, width)
    }

    fn append_row(&mut self, sheet: SheetHandle, row: SpecRow) -> Result<()> {
        self.document.append_row(sheet, row)
    }

    fn add_merge_range(&mut self, sheet: SheetHandle, merge: SpecMergeRange) -> Result<()> {
        self.document.add_merge_range(sheet, merge)
    }

    fn register_hyperlink(&mut self, sheet: SheetHandle, url: &str) -> Result<String> {
        self.document.register_hyperlink(sheet, url)
    }

    fn set_freeze_panes(
        &mut self,
        sheet: SheetHandle,
        row_idx: usize,
        col_idx: usize,
    ) -> Result<()> {
        self.document.set_freeze_panes(sheet, row_idx, col_idx)
    }

    fn finalize_worksheet(&mut self, sheet: SheetHandle) -> Result<()> {
        if self.dict_formats.is_empty() {
            return Err(ReportCompileError::Sink(
                "styles must be attached before a worksheet is finalized".to_string(),
            ));
        }
        if self.document.is_finalized(sheet) {
            return Err(ReportCompileError::Sink(format!(
                "worksheet {:?} is already finalized",
                self.document.worksheet(sheet)?.name
            )));
        }
        let worksheet = self.build_worksheet(self.document.worksheet(sheet)?)?;
        self.document.finalize_worksheet(sheet)?;
        self.workbook.push_worksheet(worksheet);
        Ok(())
    }

    /// Flush workbook to disk. Idempotent.
    fn close(&mut self) -> Result<()> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.document.close()?;
        self.if_closed = true;
        debug!("Saved workbook {}.", self.file_out());
        Ok(())
    }
}

fn write_merge_range(worksheet: &mut Worksheet, merge: &SpecMergeRange, format: &Format) -> Result<()> {
    worksheet.merge_range(
        cast_row_num(merge.row_idx_start)?,
        cast_col_num(merge.col_idx_start)?,
        cast_row_num(merge.row_idx_end)?,
        cast_col_num(merge.col_idx_end)?,
        "",
        format,
    )?;
    Ok(())
}

fn write_cell_with_format(worksheet: &mut Worksheet, cell: &SpecCell, format: &Format) -> Result<()> {
    let n_row = cast_row_num(cell.cell_ref.row_idx)?;
    let n_col = cast_col_num(cell.cell_ref.col_idx)?;
    match &cell.content {
        EnumCellContent::Blank => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellContent::Text(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellContent::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellContent::Date(val) => {
            worksheet.write_datetime_with_format(n_row, n_col, val, format)?;
        }
        EnumCellContent::Hyperlink(link) => {
            let mut url = Url::new(link.url.as_str()).set_text(link.text.as_str());
            if !link.tooltip.is_empty() {
                url = url.set_tip(link.tooltip.as_str());
            }
            worksheet.write_url_with_format(n_row, n_col, url, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if spec.underline.unwrap_or(false) {
        format = format.set_underline(FormatUnderline::Single);
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ReportCompileError::Sink(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| ReportCompileError::Sink(format!("column index overflow: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{create_blank_cell, create_hyperlink_cell, create_text_cell};
    use crate::spec::SpecCellRef;

    fn build_document_with_sheet() -> (XlsxDocument, SheetHandle, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut document = XlsxDocument::new(dir.path().join("report.xlsx"));
        document.ensure_styles(&StyleRegistry::default()).unwrap();
        let sheet = document.add_worksheet("Report").unwrap();
        (document, sheet, dir)
    }

    #[test]
    fn test_finalized_sheet_is_saved_once() {
        let (mut document, sheet, dir) = build_document_with_sheet();
        document.set_column_width(sheet, 0, 30.0).unwrap();
        document
            .append_row(
                sheet,
                SpecRow {
                    row_idx: 0,
                    cells: vec![
                        create_text_cell(SpecCellRef::new(0, 0), "Login", EnumStyleId::TextA),
                        create_hyperlink_cell(
                            SpecCellRef::new(0, 1),
                            "REQ-1 Login",
                            "https://example.org/req/1",
                            EnumStyleId::HyperlinkA,
                            "Open requirement REQ-1",
                        ),
                    ],
                },
            )
            .unwrap();
        document
            .append_row(
                sheet,
                SpecRow {
                    row_idx: 1,
                    cells: vec![create_blank_cell(SpecCellRef::new(1, 0), EnumStyleId::TextA)],
                },
            )
            .unwrap();
        document
            .add_merge_range(sheet, SpecMergeRange::vertical(0, 0, 2))
            .unwrap();
        document.set_freeze_panes(sheet, 1, 0).unwrap();
        document.finalize_worksheet(sheet).unwrap();

        document.close().unwrap();
        document.close().unwrap();

        let path = dir.path().join("report.xlsx");
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_finalize_requires_styles() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = XlsxDocument::new(dir.path().join("report.xlsx"));
        let sheet = document.add_worksheet("Report").unwrap();
        assert!(matches!(
            document.finalize_worksheet(sheet),
            Err(ReportCompileError::Sink(_))
        ));
    }

    #[test]
    fn test_failed_build_leaves_sheet_open() {
        let (mut document, sheet, _dir) = build_document_with_sheet();
        document
            .append_row(
                sheet,
                SpecRow {
                    row_idx: 0,
                    cells: vec![create_hyperlink_cell(
                        SpecCellRef::new(0, 0),
                        "REQ-1",
                        "www.example.org/req/1",
                        EnumStyleId::HyperlinkA,
                        "",
                    )],
                },
            )
            .unwrap();

        assert!(matches!(
            document.finalize_worksheet(sheet),
            Err(ReportCompileError::Xlsx(_))
        ));
        assert!(!document.document().is_finalized(sheet));
        assert_eq!(document.worksheet_by_name("Report"), Some(sheet));
    }

    #[test]
    fn test_format_conversion_keeps_known_aligns() {
        assert_eq!(derive_format_align(" Center "), Some(FormatAlign::Center));
        assert_eq!(derive_format_align("vcenter"), Some(FormatAlign::VerticalCenter));
        assert_eq!(derive_format_align("diagonal"), None);
        assert_eq!(derive_format_border(1), FormatBorder::Thin);
        assert_eq!(derive_format_border(99), FormatBorder::None);
    }

    #[test]
    fn test_save_to_buffer_produces_zip() {
        let (mut document, sheet, _dir) = build_document_with_sheet();
        document.finalize_worksheet(sheet).unwrap();
        let v_bytes = document.save_to_buffer().unwrap();
        assert_eq!(&v_bytes[..2], b"PK");
    }
}
