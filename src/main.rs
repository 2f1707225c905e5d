// Entry point and high-level CLI flow.
//
// Two ways to drive the pipeline:
// - one-shot: load the CSV or workbook, build the matrix, print a preview
//   and optionally export CSV/XLSX/JSON, then exit.
// - `--interactive`: a numbered menu that keeps the loaded table in memory
//   so the matrix can be rebuilt after each settings change without
//   re-reading the file.
mod aggregate;
mod buckets;
mod error;
mod loader;
mod matrix;
mod normalize;
mod output;
mod pipeline;
mod types;
mod util;

use clap::Parser;
use error::Result;
use pipeline::{PipelineConfig, PipelineOutput};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use types::{CategoryFilter, RawTable, WindowMode};

#[derive(Parser, Debug)]
#[command(name = "material_matrix")]
#[command(about = "Monthly raw material consumption matrix from a CSV or Excel file")]
#[command(version)]
struct Cli {
    /// CSV or Excel file with prod_date, raw material and qty used columns
    #[arg(short, long, env = "MATERIAL_MATRIX_INPUT")]
    input: Option<PathBuf>,

    /// First month of the window (1-12)
    #[arg(long, default_value_t = 1)]
    start_month: u32,

    /// First year of the window [default: last year]
    #[arg(long, allow_negative_numbers = true)]
    start_year: Option<i32>,

    /// Window end: `rolling` (current month) or `fixed12` (12 months)
    #[arg(long, default_value = "rolling")]
    mode: WindowMode,

    /// Code length category to show: all, 1, 2 or 3
    #[arg(long, default_value = "all")]
    filter: CategoryFilter,

    /// Only codes containing this text (case-insensitive)
    #[arg(long)]
    search: Option<String>,

    /// Export the matrix to this file (`.xlsx` for a workbook, otherwise CSV)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write summary statistics to this JSON file
    #[arg(long)]
    summary: Option<String>,

    /// Number of rows to preview on the console
    #[arg(long, default_value_t = 10)]
    preview: usize,

    /// Start the interactive menu instead of a single run
    #[arg(long)]
    interactive: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            start_month: self.start_month,
            start_year: self.start_year.unwrap_or(defaults.start_year),
            mode: self.mode,
            category_filter: self.filter,
            search: self.search.clone(),
        }
    }
}

fn init_logging() {
    // Console output belongs to the table, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("material_matrix=info")),
        )
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn print_report(out: &PipelineOutput) {
    let r = &out.report;
    println!(
        "Processing dataset... ({} rows read, {} kept)",
        util::format_int(r.total_rows),
        util::format_int(r.kept_rows)
    );
    if r.bad_dates + r.outside_window + r.empty_codes + r.search_excluded > 0 {
        println!(
            concat!(
                "Note: skipped {} with unreadable dates, {} outside the window, ",
                "{} without a code, {} not matching the search."
            ),
            util::format_int(r.bad_dates),
            util::format_int(r.outside_window),
            util::format_int(r.empty_codes),
            util::format_int(r.search_excluded)
        );
    }
    if r.coerced_quantities > 0 {
        println!(
            "Info: {} quantities could not be read and were counted as 0.",
            util::format_int(r.coerced_quantities)
        );
    }
    println!();
}

fn export(
    out: &PipelineOutput,
    matrix_path: Option<&PathBuf>,
    summary_path: Option<&str>,
) -> Result<()> {
    if let Some(path) = matrix_path {
        output::write_matrix(path, &out.matrix)?;
        println!("(Full table exported to {})", path.display());
    }
    if let Some(path) = summary_path {
        let summary = matrix::summarize(&out.matrix, &out.report);
        output::write_json(path, &summary)?;
        println!("Summary stats written to {}", path);
    }
    Ok(())
}

fn run_once(cli: &Cli) -> Result<()> {
    let Some(input) = &cli.input else {
        return Err(error::MatrixError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no input file given (use --input or MATERIAL_MATRIX_INPUT)",
        )));
    };
    let table = loader::load_table(input)?;
    let out = pipeline::run(&table, &cli.pipeline_config())?;
    print_report(&out);
    output::preview_matrix(&out.matrix, cli.preview);
    export(&out, cli.output.as_ref(), cli.summary.as_deref())
}

/// What the interactive menu remembers between choices.
struct Session {
    input: Option<PathBuf>,
    table: Option<RawTable>,
    config: PipelineConfig,
    last: Option<PipelineOutput>,
    preview: usize,
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Prompt for a value, keeping `current` when the answer is empty and
/// asking again when it does not parse.
fn prompt_value<T>(label: &str, current: T) -> Option<T>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    loop {
        let answer = read_line(&format!("{} [{}]: ", label, current))?;
        if answer.is_empty() {
            return Some(current);
        }
        match answer.parse::<T>() {
            Ok(v) => return Some(v),
            Err(e) => println!("Invalid value: {}", e),
        }
    }
}

fn handle_load(session: &mut Session) {
    let default = session
        .input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let Some(answer) = read_line(&format!("CSV or Excel file [{}]: ", default)) else {
        return;
    };
    let path = if answer.is_empty() {
        PathBuf::from(default)
    } else {
        PathBuf::from(answer)
    };
    match loader::load_table(&path) {
        Ok(table) => {
            if table.is_empty() {
                tracing::warn!("{} has a header but no data rows", path.display());
            }
            println!(
                "Loaded {} rows from {}\n",
                util::format_int(table.len()),
                path.display()
            );
            session.input = Some(path);
            session.table = Some(table);
            session.config.search = None;
            handle_generate(session);
        }
        Err(e) => {
            tracing::error!("Failed to load {}: {}", path.display(), e);
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn handle_generate(session: &mut Session) {
    let Some(table) = &session.table else {
        println!("Error: No data loaded. Please load a file first (option 1).\n");
        return;
    };
    match pipeline::run(table, &session.config) {
        Ok(out) => {
            print_report(&out);
            output::preview_matrix(&out.matrix, session.preview);
            session.last = Some(out);
        }
        Err(e) => {
            // The previous matrix stays available for export.
            tracing::error!("Pipeline failed: {}", e);
            eprintln!("Could not build the table: {}\n", e);
        }
    }
}

fn describe_columns(config: &PipelineConfig) -> String {
    match buckets::generate_buckets(config.start_month, config.start_year, config.mode) {
        Ok(b) if b.is_empty() => "no month columns (start is after the end)".to_string(),
        Ok(b) => format!(
            "{} month columns, {} to {}",
            b.len(),
            b[0],
            b[b.len() - 1]
        ),
        Err(e) => e.to_string(),
    }
}

fn handle_settings(session: &mut Session) -> Option<()> {
    let c = &session.config;
    let mut next = PipelineConfig {
        start_month: prompt_value("Start month (1-12)", c.start_month)?,
        start_year: prompt_value("Start year", c.start_year)?,
        mode: prompt_value("Window mode (rolling/fixed12)", c.mode)?,
        category_filter: prompt_value("Display filter (all/1/2/3)", c.category_filter)?,
        search: c.search.clone(),
    };
    let search = read_line(&format!(
        "Search code (- to clear) [{}]: ",
        next.search.as_deref().unwrap_or("")
    ))?;
    match search.as_str() {
        "" => {}
        "-" => next.search = None,
        s => next.search = Some(s.to_string()),
    }
    println!("{}\n", describe_columns(&next));
    session.config = next;
    handle_generate(session);
    Some(())
}

fn handle_export(session: &Session) {
    let Some(out) = &session.last else {
        println!("Error: No table generated yet. Nothing to export.\n");
        return;
    };
    let Some(path) = read_line("Export to (.csv or .xlsx): ") else {
        return;
    };
    if path.is_empty() {
        return;
    }
    let path = PathBuf::from(path);
    if let Err(e) = export(out, Some(&path), None) {
        tracing::error!("{}", e);
        eprintln!("Write error: {}\n", e);
    }
}

fn interactive(cli: &Cli) {
    let mut session = Session {
        input: cli.input.clone(),
        table: None,
        config: cli.pipeline_config(),
        last: None,
        preview: cli.preview,
    };
    loop {
        println!("Raw Material Consumption");
        println!("[1] Load the file");
        println!("[2] Generate table");
        println!("[3] Change settings");
        println!("[4] Export table");
        println!("[5] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session),
            "2" => handle_generate(&mut session),
            "3" => {
                if handle_settings(&mut session).is_none() {
                    break;
                }
            }
            "4" => handle_export(&session),
            "5" => break,
            _ => println!("Invalid choice. Please enter 1 to 5.\n"),
        }
    }
    println!("Exiting the program.");
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    if cli.interactive {
        interactive(&cli);
        return ExitCode::SUCCESS;
    }
    match run_once(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ResultMatrix;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["material_matrix", "--input", "data.csv"]).unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.start_month, 1);
        assert_eq!(config.start_year, PipelineConfig::default().start_year);
        assert_eq!(config.mode, WindowMode::RollingToNow);
        assert_eq!(config.category_filter, CategoryFilter::All);
        assert_eq!(cli.preview, 10);
        assert!(!cli.interactive);
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "material_matrix",
            "-i",
            "data.csv",
            "--start-month",
            "3",
            "--start-year",
            "2022",
            "--mode",
            "fixed12",
            "--filter",
            "2",
            "--search",
            "mat",
        ])
        .unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.start_month, 3);
        assert_eq!(config.start_year, 2022);
        assert_eq!(config.mode, WindowMode::Fixed12);
        assert_eq!(
            config.category_filter,
            CategoryFilter::Only(types::LengthCategory::Medium)
        );
        assert_eq!(config.search.as_deref(), Some("mat"));
    }

    #[test]
    fn test_cli_rejects_bad_filter() {
        assert!(Cli::try_parse_from(["material_matrix", "--filter", "7"]).is_err());
    }

    #[test]
    fn test_run_once_writes_exports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(
            &input,
            concat!(
                "prod_date,raw material,qty used\n",
                "2023-01-15,abc123,10\n",
                "2023-01-20,ABC123,5\n",
                "2023-02-01,xy,\"3,000\"\n",
            ),
        )
        .unwrap();
        let csv_out = dir.path().join("out.csv");
        let json_out = dir.path().join("summary.json");
        let cli = Cli::try_parse_from([
            "material_matrix",
            "--input",
            input.to_str().unwrap(),
            "--start-month",
            "1",
            "--start-year",
            "2023",
            "--mode",
            "fixed12",
            "--output",
            csv_out.to_str().unwrap(),
            "--summary",
            json_out.to_str().unwrap(),
        ])
        .unwrap();
        run_once(&cli).unwrap();

        let matrix: ResultMatrix = output::read_matrix_csv(&csv_out).unwrap();
        assert_eq!(matrix.buckets.len(), 12);
        assert_eq!(matrix.rows[0].code, "XY");
        assert_eq!(matrix.rows[1].quantities[0], 15.0);

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_out).unwrap()).unwrap();
        assert_eq!(summary["total_codes"], 2);
        assert_eq!(summary["first_month"], "Jan 2023");
        assert_eq!(summary["total_quantity"], 3015.0);
    }

    #[test]
    fn test_run_once_writes_xlsx() {
        use calamine::{open_workbook_auto, Data, Reader};

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(
            &input,
            "prod_date,raw material,qty used\n2023-01-15,abc123,10\n2023-02-01,xy,4\n",
        )
        .unwrap();
        let xlsx_out = dir.path().join("out.xlsx");
        let cli = Cli::try_parse_from([
            "material_matrix",
            "--input",
            input.to_str().unwrap(),
            "--start-year",
            "2023",
            "--mode",
            "fixed12",
            "--output",
            xlsx_out.to_str().unwrap(),
        ])
        .unwrap();
        run_once(&cli).unwrap();

        let mut workbook = open_workbook_auto(&xlsx_out).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_size(), (3, 13));
        assert_eq!(range.get((1, 0)), Some(&Data::String("XY".into())));
        assert_eq!(range.get((1, 2)), Some(&Data::Float(4.0)));
        assert_eq!(range.get((2, 1)), Some(&Data::Float(10.0)));
    }

    #[test]
    fn test_run_once_without_input() {
        let mut cli = Cli::try_parse_from(["material_matrix"]).unwrap();
        cli.input = None;
        let err = run_once(&cli).unwrap_err();
        assert!(matches!(err, error::MatrixError::Io(_)));
    }
}
