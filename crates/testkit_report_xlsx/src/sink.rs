//! Document sink boundary: the workbook operations the compiler needs.

use std::collections::BTreeSet;

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{ReportCompileError, Result, SpecMergeRange, SpecRow, SpecWorksheet};
use crate::style::StyleRegistry;
use crate::util::{derive_unique_sheet_name, sanitize_sheet_name};

/// Opaque handle of a worksheet inside one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetHandle(usize);

/// Workbook operations used by the report compiler.
pub trait DocumentSink {
    /// Attach the style registry; later calls are no-ops.
    fn ensure_styles(&mut self, registry: &StyleRegistry) -> Result<()>;

    /// Create a worksheet; the name is sanitized and made unique in the document.
    fn add_worksheet(&mut self, name: &str) -> Result<SheetHandle>;

    /// Look up a worksheet by its final name.
    fn worksheet_by_name(&self, name: &str) -> Option<SheetHandle>;

    /// Return the worksheet whose sanitized name matches, or create it.
    fn get_or_add_worksheet(&mut self, name: &str) -> Result<SheetHandle> {
        match self.worksheet_by_name(&sanitize_sheet_name(name, "_", "Sheet")) {
            Some(sheet) => Ok(sheet),
            None => self.add_worksheet(name),
        }
    }

    /// Final name of a worksheet.
    fn worksheet_name(&self, sheet: SheetHandle) -> Result<&str>;

    /// Set the width of one column.
    fn set_column_width(&mut self, sheet: SheetHandle, col_idx: usize, width: f64) -> Result<()>;

    /// Append one row; rows must arrive in ascending row order.
    fn append_row(&mut self, sheet: SheetHandle, row: SpecRow) -> Result<()>;

    /// Record a merge range; ranges may not overlap.
    fn add_merge_range(&mut self, sheet: SheetHandle, merge: SpecMergeRange) -> Result<()>;

    /// Register a hyperlink target and return its relationship id.
    fn register_hyperlink(&mut self, sheet: SheetHandle, url: &str) -> Result<String>;

    /// Freeze panes above `row_idx` and left of `col_idx`.
    fn set_freeze_panes(&mut self, sheet: SheetHandle, row_idx: usize, col_idx: usize)
    -> Result<()>;

    /// Close the worksheet; further writes to it fail.
    fn finalize_worksheet(&mut self, sheet: SheetHandle) -> Result<()>;

    /// Persist the document. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// In-memory document holding logical worksheets.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    l_worksheets: Vec<SpecWorksheet>,
    l_if_finalized: Vec<bool>,
    set_sheet_names_existing: BTreeSet<String>,
    style_registry: Option<StyleRegistry>,
    if_closed: bool,
}

impl MemoryDocument {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Worksheets in creation order.
    pub fn worksheets(&self) -> &[SpecWorksheet] {
        &self.l_worksheets
    }

    /// Worksheet behind `sheet`.
    pub fn worksheet(&self, sheet: SheetHandle) -> Result<&SpecWorksheet> {
        self.l_worksheets
            .get(sheet.0)
            .ok_or_else(|| ReportCompileError::Sink(format!("unknown worksheet handle {}", sheet.0)))
    }

    /// Whether `finalize_worksheet` ran for `sheet`.
    pub fn is_finalized(&self, sheet: SheetHandle) -> bool {
        self.l_if_finalized.get(sheet.0).copied().unwrap_or(false)
    }

    /// Attached style registry, if any.
    pub fn style_registry(&self) -> Option<&StyleRegistry> {
        self.style_registry.as_ref()
    }

    /// Whether the document was closed.
    pub fn is_closed(&self) -> bool {
        self.if_closed
    }

    fn worksheet_open_mut(&mut self, sheet: SheetHandle) -> Result<&mut SpecWorksheet> {
        if self.if_closed {
            return Err(ReportCompileError::Sink("document is closed".to_string()));
        }
        if self.is_finalized(sheet) {
            return Err(ReportCompileError::Sink(format!(
                "worksheet {:?} is already finalized",
                self.l_worksheets[sheet.0].name
            )));
        }
        self.l_worksheets
            .get_mut(sheet.0)
            .ok_or_else(|| ReportCompileError::Sink(format!("unknown worksheet handle {}", sheet.0)))
    }
}

fn validate_cell_address(row_idx: usize, col_idx: usize) -> Result<()> {
    if row_idx >= N_NROWS_EXCEL_MAX {
        return Err(ReportCompileError::RowLimitExceeded {
            row_idx,
            row_max: N_NROWS_EXCEL_MAX,
        });
    }
    if col_idx >= N_NCOLS_EXCEL_MAX {
        return Err(ReportCompileError::Sink(format!(
            "column {col_idx} is beyond the maximum of {N_NCOLS_EXCEL_MAX} columns"
        )));
    }
    Ok(())
}

impl DocumentSink for MemoryDocument {
    fn ensure_styles(&mut self, registry: &StyleRegistry) -> Result<()> {
        if self.style_registry.is_none() {
            registry.validate()?;
            self.style_registry = Some(registry.clone());
        }
        Ok(())
    }

    fn add_worksheet(&mut self, name: &str) -> Result<SheetHandle> {
        if self.if_closed {
            return Err(ReportCompileError::Sink("document is closed".to_string()));
        }
        let c_name_clean = sanitize_sheet_name(name, "_", "Sheet");
        let c_name_unique = derive_unique_sheet_name(&self.set_sheet_names_existing, &c_name_clean);
        self.set_sheet_names_existing.insert(c_name_unique.clone());
        self.l_worksheets.push(SpecWorksheet {
            name: c_name_unique,
            ..Default::default()
        });
        self.l_if_finalized.push(false);
        Ok(SheetHandle(self.l_worksheets.len() - 1))
    }

    fn worksheet_by_name(&self, name: &str) -> Option<SheetHandle> {
        self.l_worksheets
            .iter()
            .position(|ws| ws.name == name)
            .map(SheetHandle)
    }

    fn worksheet_name(&self, sheet: SheetHandle) -> Result<&str> {
        self.worksheet(sheet).map(|ws| ws.name.as_str())
    }

    fn set_column_width(&mut self, sheet: SheetHandle, col_idx: usize, width: f64) -> Result<()> {
        validate_cell_address(0, col_idx)?;
        if !width.is_finite() || width < 0.0 {
            return Err(ReportCompileError::Sink(format!(
                "invalid width {width} for column {col_idx}"
            )));
        }
        let ws = self.worksheet_open_mut(sheet)?;
        if ws.col_widths.len() <= col_idx {
            ws.col_widths.resize(col_idx + 1, 0.0);
        }
        ws.col_widths[col_idx] = width;
        Ok(())
    }

    fn append_row(&mut self, sheet: SheetHandle, row: SpecRow) -> Result<()> {
        for cell in &row.cells {
            validate_cell_address(cell.cell_ref.row_idx, cell.cell_ref.col_idx)?;
            if cell.cell_ref.row_idx != row.row_idx {
                return Err(ReportCompileError::Sink(format!(
                    "cell {} does not belong to row {}",
                    cell.cell_ref.to_a1(),
                    row.row_idx + 1
                )));
            }
        }
        validate_cell_address(row.row_idx, 0)?;
        let ws = self.worksheet_open_mut(sheet)?;
        if let Some(row_last) = ws.rows.last()
            && row_last.row_idx >= row.row_idx
        {
            return Err(ReportCompileError::Sink(format!(
                "row {} appended after row {}",
                row.row_idx + 1,
                row_last.row_idx + 1
            )));
        }
        ws.rows.push(row);
        Ok(())
    }

    fn add_merge_range(&mut self, sheet: SheetHandle, merge: SpecMergeRange) -> Result<()> {
        validate_cell_address(merge.row_idx_end, merge.col_idx_end)?;
        if merge.row_idx_end < merge.row_idx_start
            || merge.col_idx_end < merge.col_idx_start
            || (merge.height() == 1 && merge.width() == 1)
        {
            return Err(ReportCompileError::Sink(format!(
                "invalid merge range {}",
                merge.to_a1()
            )));
        }
        let ws = self.worksheet_open_mut(sheet)?;
        if let Some(other) = ws.merges.iter().find(|other| other.is_overlapping(&merge)) {
            return Err(ReportCompileError::Sink(format!(
                "merge range {} overlaps {}",
                merge.to_a1(),
                other.to_a1()
            )));
        }
        ws.merges.push(merge);
        Ok(())
    }

    fn register_hyperlink(&mut self, sheet: SheetHandle, url: &str) -> Result<String> {
        let ws = self.worksheet_open_mut(sheet)?;
        ws.hyperlinks.push(url.to_string());
        Ok(format!("rId{}", ws.hyperlinks.len()))
    }

    fn set_freeze_panes(
        &mut self,
        sheet: SheetHandle,
        row_idx: usize,
        col_idx: usize,
    ) -> Result<()> {
        validate_cell_address(row_idx, col_idx)?;
        let ws = self.worksheet_open_mut(sheet)?;
        ws.freeze_panes = Some((row_idx, col_idx));
        Ok(())
    }

    fn finalize_worksheet(&mut self, sheet: SheetHandle) -> Result<()> {
        self.worksheet_open_mut(sheet)?;
        self.l_if_finalized[sheet.0] = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.if_closed = true;
        Ok(())
    }
}
