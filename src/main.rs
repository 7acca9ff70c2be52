//! LazyTable - a spreadsheet-style data editor for the terminal.
//!
//! Without a subcommand the editor opens. `export`, `import`, `info` and
//! `reset` work on the stored table without starting the interface.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{error, info, warn};

use lazytable::app::App;
use lazytable::config::Config;
use lazytable::csv;
use lazytable::events::{Event, EventHandler};
use lazytable::export::{self, ExportFormat};
use lazytable::filter;
use lazytable::imaging;
use lazytable::logging;
use lazytable::storage::{format_size, resolve_table, StorageManager};
use lazytable::table::{default_columns, Table};
use lazytable::tasks::create_task_channel;

/// Spreadsheet-style data editor for the terminal
#[derive(Parser, Debug)]
#[command(name = "lazytable")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding tableData.json and appState.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the stored table to a file
    Export {
        /// json, csv or excel
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Ignore the saved filter and export every row
        #[arg(long)]
        all: bool,
    },
    /// Load a CSV file into the stored table
    Import {
        /// Path of the .csv file
        path: PathBuf,

        /// The first line is data, not a header
        #[arg(long)]
        no_header: bool,

        /// Replace the table instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// Show table and storage statistics
    Info,
    /// Delete all stored data
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(None, cli.verbose) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::default_path().and_then(|path| Config::load_from(&path)),
    }
    .context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    let data_dir = config
        .resolved_data_dir()
        .context("Could not determine the data directory")?;
    let storage = StorageManager::with_dir(data_dir, config.storage_quota_bytes);

    let result = match cli.command {
        None => run_tui(config, storage),
        Some(Command::Export {
            format,
            output,
            all,
        }) => run_export(&storage, &format, &output, all),
        Some(Command::Import {
            path,
            no_header,
            replace,
        }) => run_import(&storage, &path, !no_header, replace),
        Some(Command::Info) => run_info(&storage),
        Some(Command::Reset) => run_reset(&storage),
    };

    if let Err(e) = &result {
        error!(error = %e, "Exiting with error");
    }
    logging::shutdown();
    result
}

/// Open the editor and run until the user quits.
fn run_tui(config: Config, storage: StorageManager) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config, storage);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    config: Config,
    storage: StorageManager,
) -> Result<()> {
    let (mut task_rx, spawner) = create_task_channel();
    let mut app = App::new(config, storage).with_spawner(spawner);
    let events = EventHandler::new();
    info!("Editor started");

    loop {
        terminal.draw(|frame| app.view(frame))?;

        while let Ok(message) = task_rx.try_recv() {
            app.handle_task_message(message);
        }

        match events.next() {
            Ok(event) => app.update(event),
            Err(e) => {
                warn!(error = %e, "Failed to read terminal event");
                app.update(Event::Quit);
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Load the stored table; a missing one is an error outside the editor.
fn load_table(storage: &StorageManager) -> Result<Table> {
    match resolve_table(storage.load_table(), default_columns) {
        Some((columns, rows)) => Ok(Table::new(columns, rows)),
        None => bail!(
            "No saved table in {}. Open the editor once or import a CSV file.",
            storage.base_dir().display()
        ),
    }
}

fn run_export(storage: &StorageManager, format: &str, output: &Path, all: bool) -> Result<()> {
    let format = ExportFormat::from_name(format)
        .with_context(|| format!("Unknown format '{}', expected json, csv or excel", format))?;
    let table = load_table(storage)?;

    let conditions = match (all, storage.load_app_state()) {
        (false, Some(state)) => filter::collect(&state.filters),
        _ => Vec::new(),
    };
    let visible = filter::apply(table.rows(), table.columns(), &conditions);
    let rows: Vec<_> = visible.iter().filter_map(|&i| table.row(i)).collect();

    let file = export::export_table(format, table.columns(), &rows)?;
    let path = file.write_to(output)?;
    if let Some(note) = file.note {
        println!("{}", note);
    }
    println!("Exported {} of {} rows to {}", rows.len(), table.len(), path.display());
    Ok(())
}

fn run_import(storage: &StorageManager, path: &Path, has_header: bool, replace: bool) -> Result<()> {
    let text = csv::read_file(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = csv::parse_document(&text, has_header)?;
    let (columns, rows) = document.to_table();

    let mut table = match resolve_table(storage.load_table(), default_columns) {
        Some((columns, rows)) => Table::new(columns, rows),
        None => Table::new(Vec::new(), Vec::new()),
    };
    let outcome = table.import_csv(columns, rows, replace);
    storage
        .save_table(&table.snapshot())
        .context("Failed to save the table")?;
    info!(rows = outcome.rows, replace, "Imported CSV from the command line");
    println!(
        "Imported {} rows and {} columns. The table now has {} rows.",
        outcome.rows,
        outcome.columns,
        table.len()
    );
    Ok(())
}

fn run_info(storage: &StorageManager) -> Result<()> {
    let usage = storage.usage();
    println!("Data dir:   {}", storage.base_dir().display());
    match resolve_table(storage.load_table(), default_columns) {
        Some((columns, rows)) => {
            let images = imaging::collect_images(&rows, &columns).len();
            println!("Records:    {}", rows.len());
            println!("Columns:    {}", columns.len());
            println!("Images:     {}", images);
        }
        None => println!("Records:    no saved table"),
    }
    if let Some(state) = storage.load_app_state() {
        println!("Filters:    {}", state.filters.len());
        if let Some(group) = state.group {
            println!("Grouped by: {}", group.field);
        }
    }
    println!("Table data: {}", format_size(usage.table_bytes));
    println!("App state:  {}", format_size(usage.state_bytes));
    println!(
        "Quota:      {} ({:.1}% used)",
        format_size(usage.quota_bytes),
        usage.usage_percent()
    );
    if let Some(dir) = logging::log_directory() {
        println!("Logs:       {}", dir.display());
    }
    Ok(())
}

fn run_reset(storage: &StorageManager) -> Result<()> {
    storage.reset().context("Failed to reset storage")?;
    println!("Removed all data in {}", storage.base_dir().display());
    Ok(())
}
