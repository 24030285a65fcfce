use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use jump_core::{config::ConfigLoader, run_with_config, HarnessConfig};
use log::LevelFilter;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "jump",
    author,
    version,
    about = "Run coding-problem solutions in throwaway containers"
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(long, short, help = "List the supported languages and their images")]
    list_languages: bool,

    #[clap(long, help = "Configuration file (defaults to ./jump.yaml when present)")]
    config: Option<PathBuf>,

    #[clap(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a solution file against its test cases
    Start {
        /// Path to the solution file, e.g. problems/two_sum/sol.py
        file: PathBuf,

        #[clap(long, help = "Show step-by-step diagnostics")]
        log: bool,
    },
}

impl Cli {
    fn verbose(&self) -> bool {
        matches!(self.command, Some(Commands::Start { log: true, .. }))
    }

    fn level_filter(&self) -> LevelFilter {
        if self.verbose() {
            LevelFilter::Debug
        } else {
            self.log_level.parse().unwrap_or(LevelFilter::Warn)
        }
    }
}

async fn load_config(path: Option<&Path>, verbose: bool) -> HarnessConfig {
    match ConfigLoader::load(path).await {
        Ok(config) => config.with_verbose(verbose),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn print_languages(config: &HarnessConfig) {
    println!("Supported languages:");
    for runtime in config.registry().languages() {
        println!("  {:<12} .{:<6} {}", runtime.name, runtime.extension, runtime.image);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with program output.
    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .init();

    let verbose = cli.verbose();
    let config = load_config(cli.config.as_deref(), verbose).await;

    if cli.list_languages {
        print_languages(&config);
        return Ok(());
    }

    match cli.command {
        Some(Commands::Start { file, .. }) => {
            log::debug!("Running {}", file.display());
            let status = run_with_config(&file, &config).await;
            std::process::exit(status);
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
