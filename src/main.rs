use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use classwindow::config::AppConfig;
use classwindow::init::init_csv;
use classwindow::model::Interval;
use classwindow::report::{export_xlsx, output_path, render_text};
use classwindow::datetime::INTERVAL_FORMAT_HINT;
use classwindow::schedule::is_valid_datetime;
use classwindow::session::Session;

#[derive(Parser, Debug)]
#[command(author, version, about = "Grade summaries from activity exports, limited to class time windows", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schedule document, overrides the configured path
    #[arg(short, long, global = true)]
    schedule: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty activity CSV with the required header
    Init { filename: String },
    /// Print the first rows of an export in canonical column order
    Preview {
        csv: PathBuf,
        #[arg(short, long, default_value_t = 10)]
        rows: usize,
    },
    /// List the distinct students of an export
    Students { csv: PathBuf },
    /// Manage class schedules
    #[command(subcommand)]
    Class(ClassCommand),
    /// Check whether text is usable as an interval endpoint
    Check { text: String },
    /// Compute per-student results for one class
    Compute(ComputeArgs),
}

#[derive(Subcommand, Debug)]
enum ClassCommand {
    /// List class names
    List,
    /// Show the intervals of a class
    Show { name: String },
    /// Create a class with no intervals
    Add { name: String },
    /// Delete a class
    Remove { name: String },
    /// Append an interval to a class
    AddInterval {
        name: String,
        start: String,
        end: String,
    },
    /// Delete the interval at INDEX (0-based)
    RemoveInterval { name: String, index: usize },
    /// Replace the interval at INDEX (0-based)
    EditInterval {
        name: String,
        index: usize,
        start: String,
        end: String,
    },
}

#[derive(Args, Debug)]
struct ComputeArgs {
    csv: PathBuf,

    /// Class whose intervals limit the matched activity
    #[arg(long)]
    class: String,

    /// Only these students ("Last First"); default is everyone
    #[arg(long = "student")]
    students: Vec<String>,

    /// Leave these students out ("Last First")
    #[arg(long = "exclude")]
    excluded: Vec<String>,

    /// Also write the results as an .xlsx workbook
    #[arg(long)]
    xlsx: bool,

    /// Workbook path, defaults to the CSV path with an .xlsx extension
    #[arg(short, long, requires = "xlsx")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:?}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(schedule) = &cli.schedule {
        config.schedule_path = schedule.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Init { filename } => {
            let path = init_csv(&filename, config.delimiter_byte()?)?;
            println!("Created CSV file: {}", path.display());
        }
        Command::Preview { csv, rows } => {
            let mut session = Session::open(&config)?;
            let dataset = session.open_and_load(&csv)?;
            println!("{}", dataset.columns().join(" | "));
            for i in 0..rows.min(dataset.len()) {
                if let Some(cells) = dataset.row_cells(i) {
                    println!("{}", cells.join(" | "));
                }
            }
            println!("({} rows)", dataset.len());
        }
        Command::Students { csv } => {
            let mut session = Session::open(&config)?;
            session.open_and_load(&csv)?;
            for student in session.students() {
                println!("{}", student);
            }
        }
        Command::Class(command) => run_class(&config, command)?,
        Command::Check { text } => {
            if is_valid_datetime(&text) {
                println!("valid datetime");
            } else {
                bail!("invalid datetime {text:?}: {INTERVAL_FORMAT_HINT}");
            }
        }
        Command::Compute(args) => run_compute(&config, args)?,
    }
    Ok(())
}

fn run_class(config: &AppConfig, command: ClassCommand) -> Result<()> {
    let mut session = Session::open(config)?;
    let store = session.schedules_mut();

    match command {
        ClassCommand::List => {
            for name in store.list_class_names() {
                println!("{}", name);
            }
        }
        ClassCommand::Show { name } => {
            let intervals = store
                .intervals(&name)
                .with_context(|| format!("unknown class {name:?}"))?;
            for (i, interval) in intervals.iter().enumerate() {
                let validity = interval.validity();
                let flag = |ok: bool| if ok { "" } else { " (invalid)" };
                println!(
                    "{i}: {}{} -> {}{}",
                    interval.start,
                    flag(validity.start),
                    interval.end,
                    flag(validity.end)
                );
            }
        }
        ClassCommand::Add { name } => {
            store.add_class(&name)?;
            store.save()?;
            println!("Added class {name:?}");
        }
        ClassCommand::Remove { name } => {
            store.remove_class(&name)?;
            println!("Removed class {name:?}");
        }
        ClassCommand::AddInterval { name, start, end } => {
            store.add_interval(&name, Interval::new(start, end))?;
            store.save()?;
        }
        ClassCommand::RemoveInterval { name, index } => {
            store.remove_interval(&name, index)?;
            store.save()?;
        }
        ClassCommand::EditInterval {
            name,
            index,
            start,
            end,
        } => {
            store.edit_interval(&name, index, Interval::new(start, end))?;
            store.save()?;
        }
    }
    Ok(())
}

fn run_compute(config: &AppConfig, args: ComputeArgs) -> Result<()> {
    let mut session = Session::open(config)?;
    session.open_and_load(&args.csv)?;

    let selection = session.selection_mut();
    if !args.students.is_empty() {
        let unknown = selection.select_only(args.students.iter().map(String::as_str));
        if !unknown.is_empty() {
            bail!("unknown student(s): {}", unknown.join(", "));
        }
    }
    for name in &args.excluded {
        if !selection.set(name, false) {
            bail!("unknown student: {name}");
        }
    }

    let rows = session.compute_results(&args.class)?;
    print!("{}", render_text(&rows));

    if args.xlsx {
        let path = output_path(&args.csv, args.output);
        export_xlsx(&rows, &args.class, &path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
