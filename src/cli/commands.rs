use std::io;
use std::path::Path;
use std::rc::Rc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::load_declarations;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{Hierarchy, ModelType, NodeId, TreeNodeConvert, TypeRegistry};
use crate::util::naming::fqualname_of;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Types {
            file,
            subclasses_of,
        }) => cmd_types(cli, file, subclasses_of.as_deref()),
        Some(Commands::Tree { file, model, name }) => cmd_tree(cli, file, model, name.as_deref()),
        Some(Commands::Chain { file, model, path }) => cmd_chain(cli, file, model, path),
        Some(Commands::Leaves { file, model }) => cmd_leaves(cli, file, model),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage("no command given, see --help".to_string())),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    Ok(Settings::load(cli.config.as_deref())?)
}

fn lookup<'a>(registry: &'a TypeRegistry, model: &str) -> CliResult<&'a Rc<ModelType>> {
    registry.get(model).ok_or_else(|| {
        let known = registry
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        CliError::InvalidArgs(format!("unknown model '{}' (known: {})", model, known))
    })
}

/// Load declarations and instantiate `model` in a fresh hierarchy.
fn instantiate(
    cli: &Cli,
    file: &Path,
    model: &str,
    name: Option<&str>,
) -> CliResult<(Hierarchy, NodeId)> {
    let settings = load_settings(cli)?;
    let registry = load_declarations(file, &settings)?;
    let model = lookup(&registry, model)?;

    let mut hierarchy = Hierarchy::with_formatting(settings.formatting());
    let root = hierarchy.instantiate(model, name.unwrap_or(model.name()))?;
    debug!(nodes = hierarchy.len(), "instantiated");
    Ok((hierarchy, root))
}

#[instrument(skip(cli))]
fn cmd_types(cli: &Cli, file: &Path, subclasses_of: Option<&str>) -> CliResult<()> {
    let settings = load_settings(cli)?;
    let registry = load_declarations(file, &settings)?;

    let types: Vec<Rc<ModelType>> = match subclasses_of {
        Some(base) => registry.subclasses_of(lookup(&registry, base)?),
        None => registry.iter().cloned().collect(),
    };

    for model in &types {
        let detail = match model.base() {
            Some(base) => format!("({}, {} fields)", base.name(), model.fields().len()),
            None => format!("({} fields)", model.fields().len()),
        };
        output::entry(&fqualname_of(model), &detail);
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_tree(cli: &Cli, file: &Path, model: &str, name: Option<&str>) -> CliResult<()> {
    let (hierarchy, root) = instantiate(cli, file, model, name)?;
    output::info(&hierarchy.to_tree_string(root));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_chain(cli: &Cli, file: &Path, model: &str, path: &str) -> CliResult<()> {
    let (mut hierarchy, root) = instantiate(cli, file, model, None)?;
    let target = hierarchy.resolve_path(root, path)?;
    output::info(&hierarchy.display(target));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_leaves(cli: &Cli, file: &Path, model: &str) -> CliResult<()> {
    let (hierarchy, root) = instantiate(cli, file, model, None)?;
    let leaves = hierarchy.leaves(root);
    if leaves == [root] {
        output::warning(&format!("{} has no children", model));
    }
    for leaf in leaves {
        output::info(&hierarchy.display(leaf));
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::header("# effective settings");
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::warning("cannot determine config directory"),
        },
    }
    Ok(())
}
