mod catalog;
mod check;
mod clipboard;
mod config;
mod context;
mod document;
mod error;
mod logging;
mod preview;
mod prompter;
mod render;
mod search;
mod shell;
mod tui;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, TemplateHandle};
use crate::check::check_catalog;
use crate::clipboard::SystemClipboard;
use crate::config::{Config, LoadedConfig};
use crate::context::{RenderContext, parse_assignment};
use crate::render::{MissingVariables, Renderer};
use crate::shell::{DirectOptions, Shell, run_direct, write_listing};
use crate::tui::TerminalPrompter;

/// Browse YAML prompt templates and fill in their placeholders.
#[derive(Debug, Parser)]
#[command(name = "prompt-templates", version, about)]
struct Cli {
    /// Category (directory under the template root) to open.
    #[arg(short, long)]
    category: Option<String>,

    /// Template file inside the category; shows it without menus.
    #[arg(short, long, requires = "category")]
    template: Option<String>,

    /// Placeholder value, repeatable. A later value for the same key wins.
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, String)>,

    /// Use the menus even when a template is named.
    #[arg(short, long)]
    interactive: bool,

    /// Template root directory.
    #[arg(long, value_name = "DIR")]
    templates_dir: Option<PathBuf>,

    /// Fail when a placeholder has no value.
    #[arg(long)]
    strict: bool,

    /// Copy the rendered document to the clipboard (direct mode).
    #[arg(long)]
    copy: bool,

    /// Print only the rendered document (direct mode). Combines with --copy.
    #[arg(long)]
    raw: bool,

    /// Print categories, or the templates of --category, and exit.
    #[arg(long, conflicts_with_all = ["template", "interactive", "check"])]
    list: bool,

    /// Validate every template under the root and exit.
    #[arg(long, conflicts_with_all = ["template", "interactive"])]
    check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check,
    List,
    Direct,
    Interactive,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.check {
            Mode::Check
        } else if self.list {
            Mode::List
        } else if self.template.is_some() && !self.interactive {
            Mode::Direct
        } else {
            Mode::Interactive
        }
    }

    /// Root directory: the flag, else configuration.
    fn templates_root(&self, config: &Config) -> PathBuf {
        match &self.templates_dir {
            Some(dir) => dir.clone(),
            None => config.templates_path(),
        }
    }

    fn missing_variables(&self, config: &Config) -> MissingVariables {
        if self.strict {
            MissingVariables::Strict
        } else {
            config.missing_variables()
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let start_time = Instant::now();

    // Logging first so configuration loading is captured.
    let logging = match logging::init("info") {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            None
        }
    };

    let loaded_config = config::load_config();
    debug!(
        config_path = %loaded_config.config_path.display(),
        project_config = ?loaded_config.project_config_path,
        status = ?loaded_config.status,
        "config_loaded"
    );

    if let Some(ctx) = &logging {
        let level = &loaded_config.config.logging.level;
        if let Err(e) = logging::update_log_level(&ctx.reload_handle, level) {
            warn!(level = %level, error = %e, "log_level_update_failed");
        }
        logging::cleanup_old_logs(&ctx.log_directory);
    }

    let result = run(&cli, &loaded_config);

    if let Some(ctx) = &logging {
        info!(
            session_id = %ctx.session_id,
            duration_secs = start_time.elapsed().as_secs_f64(),
            "session_end"
        );
    }

    result
}

fn run(cli: &Cli, loaded_config: &LoadedConfig) -> Result<ExitCode> {
    let config = &loaded_config.config;
    let root = cli.templates_root(config);
    let catalog = Catalog::open(root.clone())
        .with_context(|| format!("Template root {} is not usable", root.display()))?
        .with_sorted_categories(config.behavior.sort_categories);
    let renderer = Renderer::new(cli.missing_variables(config));
    let context = RenderContext::from_assignments(cli.set.iter().cloned());

    let mode = cli.mode();
    info!(
        root = %root.display(),
        mode = ?mode,
        variables = context.values().len(),
        missing_variables = renderer.missing_variables().label(),
        "run_started"
    );

    match mode {
        Mode::Check => {
            if run_check(&catalog, &renderer)? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Mode::List => {
            let mut stdout = io::stdout().lock();
            write_listing(&catalog, cli.category.as_deref(), &mut stdout)?;
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Direct => {
            let (Some(category), Some(template)) = (&cli.category, &cli.template) else {
                anyhow::bail!("--template requires --category");
            };
            let options = DirectOptions {
                raw: cli.raw,
                copy: cli.copy,
                color: io::stdout().is_terminal(),
            };
            run_direct(
                &catalog,
                &renderer,
                &context,
                &TemplateHandle::new(category.as_str(), template.as_str()),
                options,
                &SystemClipboard,
                &mut io::stdout().lock(),
                &mut io::stderr().lock(),
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Interactive => {
            let prompter = TerminalPrompter::start()?;
            let mut shell = Shell::new(catalog, renderer, context, prompter, SystemClipboard)
                .with_copy_default(config.behavior.copy_by_default);
            shell.run(cli.category.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Print every issue and a summary. Returns whether the catalog is clean.
fn run_check(catalog: &Catalog, renderer: &Renderer) -> Result<bool> {
    let report = check_catalog(catalog, renderer)?;
    let mut stdout = io::stdout().lock();
    for issue in &report.issues {
        let path = issue
            .path
            .strip_prefix(catalog.root())
            .unwrap_or(&issue.path);
        writeln!(stdout, "{}: {}", path.display(), issue.kind)?;
    }
    writeln!(
        stdout,
        "Checked {} templates, {} issues",
        report.checked,
        report.issues.len()
    )?;
    Ok(report.is_clean())
}
