//! Build command - build or clean projects and everything they reference

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::Args;
use keel_build::{BuildOptions, BuildSummary, Orchestrator, ProjectAction};
use keel_config::ProjectId;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

/// Build command arguments
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Projects to build: directories containing keel.toml or config files
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<PathBuf>,
    /// Delete outputs instead of building
    #[arg(long)]
    pub clean: bool,
    /// Report what would be done without writing anything
    #[arg(long)]
    pub dry: bool,
    /// Rebuild every project
    #[arg(long, short = 'f')]
    pub force: bool,
    /// Explain why each project is or is not built
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Build projects one at a time, in order
    #[arg(long)]
    pub single_threaded: bool,
    /// Build projects even when something they reference has errors
    #[arg(long)]
    pub no_stop_on_errors: bool,
    /// Print a JSON summary on stdout (build output moves to stderr)
    #[arg(long, env = "KEEL_JSON", value_parser = FalseyValueParser::new())]
    pub json: bool,
}

impl BuildArgs {
    /// Options from `KEEL_*` variables, with command-line flags on top
    pub fn options(&self) -> BuildOptions {
        let mut options = BuildOptions::from_env();
        if self.verbose {
            options = options.with_verbose(true);
        }
        if self.dry {
            options = options.with_dry_run(true);
        }
        if self.force {
            options = options.with_force(true);
        }
        if self.single_threaded {
            options = options.with_single_threaded(true);
        }
        if self.no_stop_on_errors {
            options = options.with_stop_build_on_errors(false);
        }
        options
    }

    /// Root project identifiers; the current directory when none are given
    pub fn roots(&self) -> Result<Vec<ProjectId>> {
        if self.projects.is_empty() {
            return Ok(vec![ProjectId::new(".").context("Invalid project path '.'")?]);
        }
        self.projects
            .iter()
            .map(|path| {
                ProjectId::new(path)
                    .with_context(|| format!("Invalid project path '{}'", path.display()))
            })
            .collect()
    }
}

/// Run the build command, returning the process exit code
pub fn run(args: BuildArgs, options: BuildOptions) -> Result<i32> {
    let roots = args.roots()?;
    debug!(roots = roots.len(), clean = args.clean, ?options, "starting keel");
    let orchestrator = Orchestrator::with_defaults(roots, options);

    let build = !args.clean;
    let summary = if args.json {
        let mut stderr = io::stderr();
        orchestrator.build_or_clean_to(build, &mut stderr)
    } else {
        orchestrator.build_or_clean(build)
    };

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", json);
    } else if orchestrator.options().verbose {
        print_totals(&summary, &mut io::stdout()).context("Failed to write summary")?;
    }

    Ok(summary.exit_status.code())
}

fn print_totals(summary: &BuildSummary, out: &mut impl Write) -> io::Result<()> {
    let count = |action: ProjectAction| {
        summary
            .projects
            .iter()
            .filter(|stats| stats.action == action)
            .count()
    };
    writeln!(
        out,
        "{} project(s): {} built, {} timestamps updated, {} up to date, {} skipped, {} error(s)",
        summary.projects.len(),
        count(ProjectAction::Built),
        count(ProjectAction::PseudoBuilt),
        count(ProjectAction::UpToDate),
        count(ProjectAction::Skipped),
        summary.total_errors()
    )
}
