//! enumgen CLI - Go constants from C header enums

use std::io::IsTerminal;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use enumgen::codegen::{parse_lang_version, FormatError, RenderError};
use enumgen::enums::CollectError;
use enumgen::header::HeaderError;
use enumgen::ops::{gen_enums, GenOptions, GenOutcome};
use enumgen::util::diagnostic::{self, suggestions, Diagnostic};
use enumgen::util::GenConfig;

mod cli;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

/// Print `e` to stderr, with code and help where the error carries them.
fn report(e: &anyhow::Error, color: bool) {
    if let Some(header_error) = e.downcast_ref::<HeaderError>() {
        diagnostic::emit(&header_error.to_diagnostic(), color);
        return;
    }

    let details: Option<&dyn miette::Diagnostic> = e
        .downcast_ref::<CollectError>()
        .map(|c| c as &dyn miette::Diagnostic)
        .or_else(|| e.downcast_ref::<RenderError>().map(|r| r as &dyn miette::Diagnostic))
        .or_else(|| e.downcast_ref::<FormatError>().map(|f| f as &dyn miette::Diagnostic));

    match details {
        Some(d) => {
            let mut diag = Diagnostic::error(format!("{:#}", e));
            if let Some(code) = d.code() {
                diag = diag.with_context(format!("code: {}", code));
            }
            if let Some(help) = d.help() {
                diag = diag.with_suggestion(help.to_string());
            }
            if matches!(e.downcast_ref::<FormatError>(), Some(FormatError::Formatter { .. })) {
                diag = diag.with_suggestion(suggestions::FORMAT_FAILED);
            }
            diagnostic::emit(&diag, color);
        }
        None => eprintln!("error: {:#}", e),
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("enumgen=debug")
    } else {
        EnvFilter::new("enumgen=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let opts = options(cli)?;
    match gen_enums(&opts)? {
        GenOutcome::Written { .. } | GenOutcome::UpToDate => Ok(()),
        GenOutcome::Stale => bail!(
            "`{}` is out of date; re-run enumgen without --check",
            opts.output.display()
        ),
    }
}

/// Merge the configuration file and command-line flags; flags win.
fn options(cli: Cli) -> Result<GenOptions> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = GenConfig::load(path)?;
            if let Some(base) = path.parent() {
                config.rebase_paths(base);
            }
            config
        }
        None => GenConfig::default(),
    };

    let mut opts = GenOptions::new(cli.input, cli.output, cli.pkg);

    opts.enums = config.enums;
    if let Some(prefix) = cli.prefix {
        opts.enums.prefix = prefix;
    }
    if !cli.skip_types.is_empty() {
        opts.enums.skip_types = cli.skip_types;
    }

    opts.compiler = cli.cc.or(config.host.cc);
    opts.include_dirs = config.host.include_dirs;
    opts.include_dirs.extend(cli.include_dirs);

    opts.formatter = cli.formatter.unwrap_or(config.format.formatter);
    if let Some(version) = cli.lang_version.or(config.format.lang_version) {
        let parsed = parse_lang_version(&version)
            .ok_or_else(|| anyhow!("invalid Go language version `{}`", version))?;
        opts.lang_version = Some(parsed);
    }

    opts.check = cli.check;
    Ok(opts)
}
