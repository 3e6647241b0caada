use clap::Parser;
use std::path::PathBuf;

use testkit_report_xlsx::SpecReportOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "testkit-report")]
#[command(about = "Compile a JSON test-execution report into an XLSX workbook")]
#[command(version)]
pub struct CliArgs {
    /// JSON report (suites -> cases -> steps / linked items)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output workbook path
    #[arg(long, short = 'o', value_name = "PATH", default_value = "report.xlsx")]
    pub output: PathBuf,

    /// Worksheet name for the flat report (blank uses the default)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub sheet: String,

    /// Emit one title row per suite instead of a suite column
    #[arg(long)]
    pub group_by_suite: bool,

    /// Also write the requirement coverage sheet
    #[arg(long)]
    pub coverage: bool,

    /// Worksheet name for the coverage sheet (blank uses the default)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub coverage_sheet: String,

    /// Keep step markup instead of reducing it to plain text
    #[arg(long)]
    pub keep_markup: bool,

    /// Do not freeze the header rows
    #[arg(long)]
    pub no_freeze: bool,

    /// Number of frozen columns left of the data
    #[arg(long, default_value = "0")]
    pub freeze_columns: usize,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl CliArgs {
    pub fn parse_args() -> Self {
        let mut args = CliArgs::parse();
        args.sheet = args.sheet.trim().to_string();
        args.coverage_sheet = args.coverage_sheet.trim().to_string();
        args
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input == self.output {
            return Err("Input and output paths must differ".to_string());
        }
        if self.no_freeze && self.freeze_columns > 0 {
            return Err("Cannot combine --no-freeze with --freeze-columns".to_string());
        }
        Ok(())
    }

    pub fn to_report_options(&self) -> SpecReportOptions {
        SpecReportOptions {
            if_group_by_suite: self.group_by_suite,
            if_strip_markup: !self.keep_markup,
            if_freeze_header: !self.no_freeze,
            col_freeze: self.freeze_columns,
        }
    }
}
