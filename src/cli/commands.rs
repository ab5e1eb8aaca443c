//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, info, instrument};

use crate::application::services::BuildRequest;
use crate::cli::args::{Cli, Commands, ConfigCommands, Mode};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, project_config_path, OutputFormat, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the parsed command line.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;

    if let Some(Commands::Completion { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(Some(&project_dir))?;
    if !settings.output.color {
        output::disable_color();
    }
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Some(Commands::Build {
            descriptor,
            page,
            into,
            mode,
            before,
            format,
        }) => {
            let request = BuildRequest {
                descriptor: descriptor.clone(),
                page: page.clone(),
                into: into.clone(),
                mode: mode.map(|m| m.as_str().to_string()),
                before: before.clone(),
            };
            let format = format.unwrap_or(container.settings.output.format);
            cmd_build(&container, &request, format, *mode)
        }
        Some(Commands::Query {
            page,
            selector,
            all,
        }) => cmd_query(&container, page, selector, *all),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cmd_config_show(&container),
            ConfigCommands::Init { global } => cmd_config_init(&container, &project_dir, *global),
            ConfigCommands::Path => cmd_config_path(&project_dir),
        },
        Some(Commands::Completion { .. }) => Ok(()),
        None => Err(CliError::Usage(
            "no command given, run `domkit --help`".to_string(),
        )),
    }
}

fn resolve_project_dir(project_dir: Option<&Path>) -> CliResult<PathBuf> {
    match project_dir {
        Some(dir) if !dir.is_dir() => Err(CliError::InvalidArgs(format!(
            "project directory does not exist: {}",
            dir.display()
        ))),
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e).into()),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_build(
    container: &ServiceContainer,
    request: &BuildRequest,
    format: OutputFormat,
    mode: Option<Mode>,
) -> CliResult<()> {
    if mode == Some(Mode::InsertBefore) && request.before.is_none() {
        return Err(CliError::InvalidArgs(
            "--mode insert-before requires --before <selector>".to_string(),
        ));
    }
    let service = container.build_service();
    let built = service.build(request)?;
    info!(
        "built {} node(s) from {}",
        built.created.len(),
        request.descriptor.display()
    );
    let rendered = service.render(&built, format);
    if !rendered.is_empty() {
        output::info(rendered.trim_end());
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_query(container: &ServiceContainer, page: &Path, selector: &str, all: bool) -> CliResult<()> {
    let matches = container.build_service().query(page, selector, all)?;
    if matches.is_empty() {
        output::warning(&format!("no element matches '{}'", selector));
    }
    for markup in matches {
        output::info(&markup);
    }
    Ok(())
}

fn cmd_config_show(container: &ServiceContainer) -> CliResult<()> {
    output::info(&container.settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(container: &ServiceContainer, project_dir: &Path, global: bool) -> CliResult<()> {
    let path = if global {
        global_config_path().ok_or_else(|| {
            CliError::Usage("cannot determine the global config directory".to_string())
        })?
    } else {
        project_config_path(project_dir)
    };
    debug!("config init: {}", path.display());

    if container.fs.exists(&path) {
        output::warning(&format!("config already exists: {}", path.display()));
        return Ok(());
    }
    container
        .fs
        .ensure_parent(&path)
        .map_err(|e| InfraError::config_write(&path, e))?;
    container
        .fs
        .write(&path, &Settings::template())
        .map_err(|e| InfraError::config_write(&path, e))?;
    output::action("Created", &path.display());
    Ok(())
}

fn cmd_config_path(project_dir: &Path) -> CliResult<()> {
    output::header("Config locations");
    let status = |path: &Path| if path.exists() { "exists" } else { "missing" };
    match global_config_path() {
        Some(path) => output::detail(&format!("global:  {} ({})", path.display(), status(&path))),
        None => output::detail("global:  unavailable"),
    }
    let local = project_config_path(project_dir);
    output::detail(&format!("project: {} ({})", local.display(), status(&local)));
    Ok(())
}
