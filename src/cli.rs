//! Command-line interface implementation for caster.
//! Provides argument parsing with clap and recovers the command line order of
//! `--var` and `--var-file`, which decides which of them wins.

use crate::error::Result;
use crate::variables::Variable;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments structure for caster.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "caster: materialize file trees from templated YAML/JSON documents",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Applies the template to the target directory
    Apply(ApplyArgs),
    /// Interpolates the template and prints the resulting document
    Interpolate(InterpolateArgs),
    /// Writes a starter caster document
    #[command(alias = "initialize")]
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Caster file, or a directory containing a single .caster.(yml|yaml|json)
    #[arg(short, long, value_name = "TEMPLATE", default_value = ".")]
    pub template: PathBuf,

    #[command(flatten)]
    pub variables: VariableArgs,

    /// Directory the tree is written to
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,
}

#[derive(Args, Debug)]
pub struct InterpolateArgs {
    /// Caster file, or a directory containing a single .caster.(yml|yaml|json)
    #[arg(short, long, value_name = "TEMPLATE", default_value = ".")]
    pub template: PathBuf,

    #[command(flatten)]
    pub variables: VariableArgs,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create a .caster.yml in, or the caster file to create
    #[arg(short, long, value_name = "TEMPLATE", default_value = ".")]
    pub template: PathBuf,
}

#[derive(Args, Debug)]
pub struct VariableArgs {
    /// Template variable; later values override earlier ones
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// YAML or JSON file whose top-level keys become template variables
    #[arg(long = "var-file", value_name = "FILE")]
    pub var_files: Vec<PathBuf>,
}

/// Parses the process arguments, printing help or the clap error and exiting
/// on failure.
pub fn get_args() -> (Cli, ArgMatches) {
    parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

/// Parses `args` and keeps the raw matches around for [`variable_declarations`].
pub fn parse_from<I, T>(args: I) -> std::result::Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    Ok((cli, matches))
}

/// Returns the `--var` and `--var-file` declarations of the invoked
/// subcommand, in command line order.
///
/// # Errors
/// * `Error::ConfigError` if a `--var` is not in `key=value` form
pub fn variable_declarations(matches: &ArgMatches) -> Result<Vec<Variable>> {
    let Some((_, matches)) = matches.subcommand() else {
        return Ok(Vec::new());
    };

    let mut indexed = Vec::new();
    if let Some(values) = matches.try_get_many::<String>("vars").ok().flatten() {
        let indices = matches.indices_of("vars").into_iter().flatten();
        for (index, value) in indices.zip(values) {
            indexed.push((index, Variable::from_assignment(value)?));
        }
    }
    if let Some(values) = matches.try_get_many::<PathBuf>("var_files").ok().flatten() {
        let indices = matches.indices_of("var_files").into_iter().flatten();
        for (index, value) in indices.zip(values) {
            indexed.push((index, Variable::File(value.clone())));
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, variable)| variable).collect())
}
