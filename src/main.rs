//! caster's main application entry point.
//! Parses the command line, wires the OS storage and environment into the
//! pipeline and runs the requested command.

use std::io::Write;
use std::sync::Arc;

use caster::{
    cli::{get_args, variable_declarations, Command},
    env::OsEnv,
    error::{default_error_handler, Result},
    pipeline::{ApplyRequest, InterpolateRequest, Pipeline},
    storage::OsStorage,
    variables::environment_declarations,
};

/// Main application entry point.
fn main() {
    let (args, matches) = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Off })
        .init();

    if let Err(err) = run(args.command, &matches) {
        default_error_handler(err);
    }
}

/// Runs the parsed command.
///
/// Environment entries prefixed with `CASTER_VAR_` are appended after the
/// command line declarations; they only apply where no `--var` or
/// `--var-file` sets the same name.
fn run(command: Command, matches: &clap::ArgMatches) -> Result<()> {
    let pipeline = Pipeline::new(Arc::new(OsStorage::new()), Box::new(OsEnv));

    let mut variables = variable_declarations(matches)?;
    variables.extend(environment_declarations(&OsEnv));

    match command {
        Command::Apply(args) => {
            pipeline.apply(&ApplyRequest {
                template: args.template,
                target: args.target.clone(),
                variables,
            })?;
            println!("Template applied successfully in {}.", args.target.display());
        }
        Command::Interpolate(args) => {
            let interpolated =
                pipeline.interpolate(&InterpolateRequest { template: args.template, variables })?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(interpolated.to_yaml()?.as_bytes())?;
        }
        Command::Init(args) => {
            let path = pipeline.initialize(&args.template)?;
            println!("Created {}.", path.display());
        }
    }
    Ok(())
}
