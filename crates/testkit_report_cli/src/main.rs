mod cli;

use std::fs::File;
use std::io::BufReader;
use std::process;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info, warn};

use testkit_report_xlsx::{
    DocumentSink, EnumColumnGroup, SpecTestReport, StyleRegistry, XlsxDocument,
    insert_coverage_sheet, insert_report_sheet,
};

fn main() {
    let args = cli::CliArgs::parse_args();

    let level_default = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level_default)).init();

    if let Err(e) = args.validate() {
        error!("{e}");
        process::exit(2);
    }

    if let Err(err) = run(&args) {
        error!("{err:#}");
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<()> {
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let report: SpecTestReport = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse report JSON {}", args.input.display()))?;
    info!(
        "Loaded report {:?}: {} suites, {} cases.",
        report.name,
        report.suites.len(),
        report.count_cases()
    );

    let options = args.to_report_options();
    let registry = StyleRegistry::default();
    let mut document = XlsxDocument::new(&args.output);

    let sheet_report = insert_report_sheet(&mut document, &args.sheet, &report, &options, &registry)
        .context("Failed to compile the flat report sheet")?;
    println!("{}", sheet_report.format("[flat]"));

    if args.coverage {
        if report.count_items(EnumColumnGroup::Requirements) == 0 {
            warn!("No linked requirements; coverage sheet skipped.");
        } else {
            let sheet_report = insert_coverage_sheet(
                &mut document,
                &args.coverage_sheet,
                &report,
                &options,
                &registry,
            )
            .context("Failed to compile the coverage sheet")?;
            println!("{}", sheet_report.format("[coverage]"));
        }
    }

    document
        .close()
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    info!("Wrote {}", document.file_out());
    Ok(())
}
