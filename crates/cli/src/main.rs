mod check;
mod config;
mod plan;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::{NamedSource, Report};
use send_core::CompileOptions;
use send_ty::{Strategy, TypeDecl};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dispatch tables, call-sites and arity index of every type
    Plan(ManifestArgs),
    /// Report excluded methods, expansion warnings and build errors
    Check(ManifestArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Path to the signature manifest
    manifest: PathBuf,

    /// Path to send.toml (default: nearest one above the manifest)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default call-site strategy: `closure` or `value-object`
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Hide skip-marked methods from the arity index
    #[arg(long)]
    hide_skipped: bool,

    /// Report signatures expanding to more combinations than this
    #[arg(long)]
    combination_warning: Option<usize>,

    /// Reject signatures expanding to more combinations than this
    #[arg(long)]
    max_combinations: Option<usize>,

    /// Only process the named type
    #[arg(long = "type", value_name = "NAME")]
    only: Option<String>,
}

/// A parsed manifest, ready to compile.
pub struct Loaded {
    pub name: String,
    pub source: String,
    pub decls: Vec<TypeDecl>,
    pub options: CompileOptions,
}

impl Loaded {
    pub fn report(&self, err: impl miette::Diagnostic + Send + Sync + 'static) -> Report {
        Report::new(err).with_source_code(NamedSource::new(&self.name, self.source.clone()))
    }
}

/// Read, parse and configure. Manifest syntax errors are rendered here and
/// come back as `Ok(None)`.
pub fn load(args: &ManifestArgs) -> Result<Option<Loaded>, Box<dyn Error>> {
    let source = std::fs::read_to_string(&args.manifest)
        .map_err(|e| format!("could not read {}: {e}", args.manifest.display()))?;
    let name = args.manifest.display().to_string();

    let config = config::config_for(&args.manifest, args.config.as_deref())?;
    let overrides = Overrides {
        strategy: args.strategy,
        hide_skipped: args.hide_skipped,
        combination_warning: args.combination_warning,
        max_combinations: args.max_combinations,
    };
    let options = config.compile_options(&overrides)?;

    let mut decls = match sig_parser::parse_manifest(&source) {
        Ok(decls) => decls,
        Err(err) => {
            let report = Report::new(err).with_source_code(NamedSource::new(&name, source));
            eprintln!("{report:?}");
            return Ok(None);
        }
    };

    if let Some(only) = &args.only {
        decls.retain(|decl| decl.name == only.as_str());
        if decls.is_empty() {
            return Err(format!("no type named `{only}` in {name}").into());
        }
    }

    log::info!("{}: {} types", name, decls.len());
    Ok(Some(Loaded {
        name,
        source,
        decls,
        options,
    }))
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn Error>> {
    match cli.command {
        Command::Plan(args) => plan::run_plan(&args),
        Command::Check(args) => check::run_check(&args),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(ok) => exit_code(ok),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
