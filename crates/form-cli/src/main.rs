mod save;
mod terminal;

use clap::{Parser, Subcommand, ValueEnum};
use form_spec::discovery::{DEFAULT_FILTER, Discovery};
use form_spec::{FormDefinition, ResultTree, definition};
use save::{DEFAULT_CONFIRM_MESSAGE, SaveOptions};
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use terminal::TerminalPrompter;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const FORM_PATH_ENV: &str = "CONSOLE_FORM_PATH";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Interactive console forms",
    long_about = "Runs declarative console forms, asking each question in turn and saving the collected answers"
)]
struct Cli {
    /// Emit debug logs on stderr (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Cbor,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the questions of a form and save the answers.
    Run {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "SPEC", conflicts_with = "name")]
        spec: Option<PathBuf>,
        /// Name of a discovered form.
        #[arg(long, value_name = "NAME", required_unless_present = "spec")]
        name: Option<String>,
        /// Directories searched for form definitions (defaults to CONSOLE_FORM_PATH or the current directory).
        #[arg(long = "dir", value_name = "DIR")]
        dirs: Vec<PathBuf>,
        /// File pattern used when discovering forms.
        #[arg(long, default_value = DEFAULT_FILTER)]
        filter: String,
        /// Save without asking for confirmation.
        #[arg(long)]
        yes: bool,
        /// Keep empty answers in the saved results.
        #[arg(long)]
        all: bool,
        /// Skip every question and keep only defaults that apply without input.
        #[arg(long)]
        no_interaction: bool,
        /// Write results to this file instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Encoding of the saved results.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// List forms found in the search directories.
    List {
        /// Directories searched for form definitions (defaults to CONSOLE_FORM_PATH or the current directory).
        #[arg(long = "dir", value_name = "DIR")]
        dirs: Vec<PathBuf>,
        /// File pattern used when discovering forms.
        #[arg(long, default_value = DEFAULT_FILTER)]
        filter: String,
    },
    /// Print the JSON schema of form definitions.
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(command: Command) -> CliResult<()> {
    match command {
        Command::Run {
            spec,
            name,
            dirs,
            filter,
            yes,
            all,
            no_interaction,
            out,
            format,
        } => {
            let definition = load_definition(spec.as_deref(), name.as_deref(), dirs, &filter)?;
            let options = SaveOptions {
                confirm: (!yes).then(|| DEFAULT_CONFIRM_MESSAGE.to_string()),
                filter_empty: !all,
            };
            run_form(&definition, &options, !no_interaction, out.as_deref(), format)
        }
        Command::List { dirs, filter } => run_list(dirs, &filter),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&definition::schema())?);
            Ok(())
        }
    }
}

fn load_definition(
    spec: Option<&Path>,
    name: Option<&str>,
    dirs: Vec<PathBuf>,
    filter: &str,
) -> CliResult<FormDefinition> {
    if let Some(path) = spec {
        let contents = fs::read_to_string(path)
            .map_err(|err| format!("unable to read {}: {}", path.display(), err))?;
        return Ok(FormDefinition::from_json(&contents)?);
    }
    let name = name.ok_or("either --spec or --name is required")?;
    let dirs = search_dirs(dirs);
    debug!(?dirs, filter, "discovering forms");
    let registry = Discovery::default().discover(&dirs, filter)?;
    Ok(registry.get(name)?.clone())
}

fn run_form(
    definition: &FormDefinition,
    options: &SaveOptions,
    interactive: bool,
    out: Option<&Path>,
    format: OutputFormat,
) -> CliResult<()> {
    let mut form = definition.build()?;
    if let Some(title) = &definition.title {
        println!("{}", title);
    }
    if let Some(description) = &definition.description {
        println!("{}", description);
    }

    let mut prompter = TerminalPrompter::stdio(interactive);
    let saved = save::save(&mut form, &mut prompter, options, |results| {
        write_results(results, format, out)
    })?;
    if !saved {
        println!("Results discarded.");
    }
    Ok(())
}

fn write_results(results: &ResultTree, format: OutputFormat, out: Option<&Path>) -> CliResult<()> {
    let bytes = match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(results)?;
            json.push('\n');
            json.into_bytes()
        }
        OutputFormat::Cbor => serde_cbor::to_vec(results)?,
    };
    match (out, format) {
        (Some(path), _) => {
            fs::write(path, &bytes)?;
            println!("Saved results to {}", path.display());
        }
        (None, OutputFormat::Json) => print!("{}", String::from_utf8_lossy(&bytes)),
        (None, OutputFormat::Cbor) => println!("Results (CBOR hex): {}", encode_hex(&bytes)),
    }
    Ok(())
}

fn run_list(dirs: Vec<PathBuf>, filter: &str) -> CliResult<()> {
    let dirs = search_dirs(dirs);
    let registry = Discovery::default().discover(&dirs, filter)?;
    if registry.is_empty() {
        println!("No forms found.");
        return Ok(());
    }
    for definition in registry.iter() {
        let source = registry
            .source(&definition.name)
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}",
            definition.name,
            definition.title.as_deref().unwrap_or("-"),
            source
        );
    }
    Ok(())
}

fn search_dirs(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    if !dirs.is_empty() {
        return dirs;
    }
    let from_env = env::var(FORM_PATH_ENV)
        .ok()
        .map(|value| split_search_path(&value))
        .unwrap_or_default();
    if from_env.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        from_env
    }
}

fn split_search_path(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}
