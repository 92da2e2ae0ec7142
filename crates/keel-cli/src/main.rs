use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::build::BuildArgs;

/// Incremental builds for projects that reference each other.
///
/// Builds every listed project and everything it references, in dependency
/// order, skipping projects whose outputs are already up to date.
///
/// EXAMPLES:
///     keel                            Build the project in the current directory
///     keel build packages/app         Build app and its references
///     keel --dry --verbose .          Explain what a build would do
///     keel --clean packages/app       Delete outputs of app and its references
///
/// ENVIRONMENT VARIABLES:
///     KEEL_LOG              Log filter (e.g. 'keel_build=debug'), logs go to stderr
///     KEEL_JSON             Set to '1' for a JSON summary by default
///     KEEL_VERBOSE, KEEL_DRY_RUN, KEEL_FORCE,
///     KEEL_SINGLE_THREADED, KEEL_STOP_ON_ERRORS
///                           Defaults for the matching build options
///
/// EXIT CODES:
///     0  success
///     1  errors reported, some outputs skipped
///     2  errors reported, outputs generated
///     3  a project config could not be read
///     4  project references form a cycle
#[derive(Parser)]
#[command(name = "keel")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Build projects and their references (the default command)
    ///
    /// EXAMPLES:
    ///     keel build                     Build ./keel.toml
    ///     keel build a b --force         Rebuild a, b and their references
    ///     keel build . --json            Print a JSON summary
    #[command(visible_alias = "b")]
    Build(BuildArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let args = match cli.command {
        Some(Commands::Build(args)) => args,
        None => cli.build,
    };

    let options = args.options();
    logging::init(options.verbose);
    let code = commands::build::run(args, options)?;
    std::process::exit(code);
}
