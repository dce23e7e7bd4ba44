use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use rpbridge::cli::commands::{self, ConfigOverrides, StreamOptions};

#[derive(Parser)]
#[command(
    name = "rpbridge",
    about = "Report test-runner results to ReportPortal",
    version
)]
struct Cli {
    /// Reporter config file (YAML, or JSON with a .json extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API token
    #[arg(long, env = "RP_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// API base URL, e.g. https://rp.example.com/api/v1
    #[arg(long, env = "RP_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Project name
    #[arg(long, env = "RP_PROJECT", global = true)]
    project: Option<String>,

    /// Launch name
    #[arg(long, env = "RP_LAUNCH", global = true)]
    launch_name: Option<String>,

    /// Verbose diagnostics
    #[arg(long, global = true)]
    debug: bool,

    /// Record the calls instead of contacting the service, and print them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a workers result file as one launch
    Replay {
        /// JSON file with `suites` and `tests` buckets
        file: PathBuf,
    },

    /// Report runner events read as NDJSON
    Stream {
        /// Event file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Collect results and report them when the run finishes
        #[arg(long)]
        workers: bool,
    },

    /// Validate the configuration and print the effective settings
    Check,
}

fn init_tracing(debug: bool) {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn exit_with(result: Result<String, String>) {
    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        config: cli.config,
        token: cli.token,
        endpoint: cli.endpoint,
        project: cli.project,
        launch_name: cli.launch_name,
        debug: cli.debug,
    };
    let config = match commands::load_config(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.debug);

    match cli.command {
        Some(Commands::Replay { file }) => {
            exit_with(commands::run_replay(&config, &file, cli.dry_run));
        }
        Some(Commands::Stream { input, workers }) => {
            let options = StreamOptions {
                input,
                workers,
                dry_run: cli.dry_run,
            };
            exit_with(commands::run_stream(&config, &options));
        }
        Some(Commands::Check) => exit_with(commands::run_check(&config)),
        None => {
            // No subcommand, show help
            Cli::parse_from(["rpbridge", "--help"]);
        }
    }
}
