//! fovea - bionic reading for HTML pages

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};

use fovea::dom::{parse_html_bytes, to_html};
use fovea::emphasis::render_marked;
use fovea::persist::backend_for;
use fovea::walk::text_nodes;
use fovea::{ActivationState, Config, EligibilityPolicy, Engine, LocalFonts};

#[derive(Parser)]
#[command(name = "fovea")]
#[command(version, about = "Bionic reading for HTML pages", long_about = None)]
#[command(after_help = "EXAMPLES:
    fovea page.html out.html                 Apply the saved state to a page
    fovea --state s.json --toggle page.html  Flip the saved state, then apply it
    fovea --state s.json --status            Show the saved state
    fovea --preview page.html                Show emphasized text as **bold**")]
struct Cli {
    /// Input HTML file
    #[arg(value_name = "INPUT", required_unless_present = "status")]
    input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// JSON file holding the persisted on/off state
    #[arg(short, long, value_name = "JSON")]
    state: Option<PathBuf>,

    /// Flip the persisted state before applying it
    #[arg(short, long)]
    toggle: bool,

    /// Print the persisted state and exit
    #[arg(long)]
    status: bool,

    /// Print eligible text with emphasized prefixes instead of HTML
    #[arg(short, long, conflicts_with_all = ["toggle", "status"])]
    preview: bool,

    /// Do not insert the on-page toggle button
    #[arg(long)]
    no_control: bool,

    /// Log each step to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress warnings
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("{level}: {}", record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = if cli.status {
        show_status(&cli)
    } else if cli.preview {
        preview(&cli)
    } else {
        run(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> fovea::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if cli.no_control {
        config.control.enabled = false;
    }
    Ok(config)
}

fn input_path(cli: &Cli) -> Result<&Path, String> {
    cli.input
        .as_deref()
        .ok_or_else(|| "no input file given".to_string())
}

fn show_status(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli).map_err(|e| e.to_string())?;
    let backend = backend_for(cli.state.as_deref());
    let mut state = ActivationState::new(&config.storage.namespace);
    let active = state.load(&*backend).map_err(|e| e.to_string())?;
    println!("{}: {}", state.key(), if active { "on" } else { "off" });
    Ok(())
}

fn preview(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli).map_err(|e| e.to_string())?;
    let policy = EligibilityPolicy::from_config(&config.policy).map_err(|e| e.to_string())?;
    let input = input_path(cli)?;
    let bytes = std::fs::read(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let doc = parse_html_bytes(&bytes);

    let mut out = String::new();
    for node in text_nodes(&doc, &policy) {
        let Some(text) = doc.text_content(node) else {
            continue;
        };
        let marked = render_marked(&config.emphasis.segments(text));
        out.push_str(marked.trim());
        out.push('\n');
    }
    write_output(cli.output.as_deref(), out.as_bytes())
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli).map_err(|e| e.to_string())?;
    let input = input_path(cli)?;
    let bytes = std::fs::read(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let mut doc = parse_html_bytes(&bytes);

    let base = input.parent().unwrap_or(Path::new("."));
    let backend = backend_for(cli.state.as_deref());
    let mut engine = Engine::new(config, backend)
        .map_err(|e| e.to_string())?
        .with_font_loader(LocalFonts::new(base));

    let mut report = engine.initialize(&mut doc);
    if cli.toggle {
        report = engine.toggle(&mut doc);
        if !report.persisted {
            log::warn!("state change was applied but not saved");
        }
    }
    log::info!(
        "{}: {} ({} text nodes transformed)",
        input.display(),
        if report.active { "on" } else { "off" },
        engine.store().len()
    );

    write_output(cli.output.as_deref(), to_html(&doc).as_bytes())
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, data).map_err(|e| format!("{}: {e}", path.display())),
        None => std::io::stdout()
            .lock()
            .write_all(data)
            .map_err(|e| e.to_string()),
    }
}
