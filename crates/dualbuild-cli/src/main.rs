use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use dualbuild_tasks::{Overwrite, TaskName};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// Build, test and publish dual CommonJS / ES module TypeScript packages.
///
/// Runs esbuild, tsc, the test runner, c8 and eslint over a conventional
/// project layout (src/, test/, dist/) configured by an optional
/// dualbuild.toml.
///
/// TASKS:
///     transpile     Transpile sources to both formats with declarations
///     test-types    Type-check the tests
///     test          Run the tests once per format
///     coverage      Run the tests and report coverage
///     lint          Lint sources and tests
///     exports       Transpile, then write the package.json export map
///     all           transpile + test-types + coverage/test + lint (default)
///
/// EXAMPLES:
///     dualbuild                        Run everything
///     dualbuild --parallel             Run everything concurrently
///     dualbuild transpile --no-esm     CommonJS only
///     dualbuild exports --dest-dir out Export map for ./out
///     dualbuild init                   Bootstrap the current project
///
/// ENVIRONMENT VARIABLES:
///     DUALBUILD_DEST_DIR, DUALBUILD_CJS, DUALBUILD_ESM, DUALBUILD_COVERAGE,
///     DUALBUILD_PARALLELIZE, DUALBUILD_BANNERS   Configuration overrides
///     RUST_LOG                                   Log filter
///     NO_COLOR                                   Disable colored output
#[derive(Parser)]
#[command(name = "dualbuild")]
#[command(version)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Task to run
    #[arg(value_name = "TASK", value_parser = parse_task)]
    task: Option<TaskName>,

    #[command(flatten)]
    flags: config::BuildFlags,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "directory", value_name = "DIR", global = true)]
    directory: Option<PathBuf>,

    /// Verbose output (tool invocations)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Quiet output (warnings and errors only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true, value_parser = clap::builder::FalseyValueParser::new())]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a project for dualbuild
    ///
    /// Copies starter configuration files (tsconfig, eslint, .gitignore,
    /// dualbuild.toml) into the project and adds scripts, files and the
    /// dualbuild dev dependency to package.json.
    ///
    /// EXAMPLES:
    ///     dualbuild init                       Keep existing files
    ///     dualbuild init --overwrite=overwrite Replace existing files
    ///     dualbuild init --resources=./starter Use custom starter files
    Init {
        /// Directory holding the starter files, relative to the project directory
        /// (defaults to the bundled ones)
        #[arg(long, value_name = "DIR")]
        resources: Option<PathBuf>,
        /// Policy for files that already exist: skip, overwrite or fail
        #[arg(long, value_name = "POLICY", default_value = "skip")]
        overwrite: Overwrite,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     dualbuild completions bash > ~/.bash_completions/dualbuild.bash
    ///     dualbuild completions zsh > ~/.zfunc/_dualbuild
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_task(value: &str) -> Result<TaskName, String> {
    value.parse().map_err(|e: dualbuild_tasks::BuildError| e.to_string())
}

fn init_logging(cli: &Cli) {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::log_level(cli.verbose, cli.quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let current_dir = std::env::current_dir()?;
    let project_dir = match cli.directory {
        Some(ref directory) => current_dir.join(directory),
        None => current_dir,
    };

    match cli.command {
        Some(Commands::Init {
            resources,
            overwrite,
        }) => {
            let args = commands::init::InitArgs {
                project_dir,
                resources,
                overwrite,
            };
            commands::init::run(args).await?;
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        None => {
            let args = commands::run::RunArgs {
                task: cli.task.unwrap_or(TaskName::Default),
                project_dir,
                overrides: cli.flags.to_overrides(),
            };
            commands::run::run(args).await?;
        }
    }

    Ok(())
}
