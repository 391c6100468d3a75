mod cli;
mod logging;
mod tools;

use clap::Parser;

use terv_backend::ManagerError;
use terv_core::{Config, VersionManager};

use crate::cli::{Cli, Command, ToolCommand};
use crate::tools::{OPENTOFU, TERRAGRUNT, ToolDefinition};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ManagerError> {
    log::debug!("CLI args parsed: {cli:?}");

    let mut conf = Config::from_env(false)?;
    if let Some(root) = cli.root {
        conf.root_path = root;
    }
    if cli.force_remote {
        conf.force_remote = true;
    }
    if cli.install {
        conf.no_install = false;
    }

    let (definition, command) = match cli.tool {
        ToolCommand::Tofu { command } => (&OPENTOFU, command),
        ToolCommand::Terragrunt { command } => (&TERRAGRUNT, command),
    };

    let manager = definition.manager(&conf)?;
    dispatch(&manager, definition, command)
}

fn dispatch(
    manager: &VersionManager<'_>,
    definition: &ToolDefinition,
    command: Command,
) -> Result<(), ManagerError> {
    match command {
        Command::Detect => {
            let version = manager.detect(false)?;
            println!("{} {version}", definition.folder_name);

            Ok(())
        }
        Command::Install { version } => {
            let requested = match version {
                Some(version) => version,
                None => manager.resolve(terv_core::semantic::LATEST_KEY)?,
            };

            manager.install(&requested)
        }
        Command::Uninstall { targets } => {
            if let [target] = targets.as_slice() {
                manager.uninstall(target)
            } else {
                manager.uninstall_multiple(&targets)
            }
        }
        Command::Use {
            version,
            working_dir,
        } => manager.use_version(&version, working_dir),
        Command::List => {
            for dated in manager.list_local(false)? {
                match dated.use_date {
                    Some(use_date) => {
                        println!("{} (last used {})", dated.version, use_date.format("%Y-%m-%d"));
                    }
                    None => println!("{}", dated.version),
                }
            }

            Ok(())
        }
        Command::ListRemote => {
            for version in manager.list_remote(false)? {
                println!("{version}");
            }

            Ok(())
        }
        Command::Constraint { expression, reset } => match expression {
            Some(expression) => manager.set_constraint(&expression),
            None if reset => manager.reset_constraint(),
            None => {
                let constraint = manager.read_default_constraint();
                if constraint.is_empty() {
                    println!("No default constraint set for {}", definition.folder_name);
                } else {
                    println!("{constraint}");
                }

                Ok(())
            }
        },
        Command::ResetVersion => manager.reset_version(),
    }
}
