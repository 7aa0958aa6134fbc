use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Command, FromArgMatches as _};

use crate::census::ContextCensusExt;
use crate::context::Context;
use crate::error::SimError;
use crate::log::{set_log_level, LevelFilter};
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::info;

/// Name of the census report written to the output directory.
pub const CENSUS_REPORT: &str = "census.csv";

/// Default cli arguments for the episim runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a JSON parameters file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Optional directory for the census report
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(short, long)]
    pub log_level: Option<String>,
}

fn create_episim_cli() -> Command {
    let cli = Command::new("episim");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with the process's command line arguments.
///
/// # Parameters
/// - `setup_fn`: builds the model in the prepared `Context`; it is called
///   after the seed, parameters and census report have been installed
///
/// # Errors
/// Returns an error if argument parsing, loading the parameters or the setup
/// function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), SimError>,
{
    let matches = create_episim_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    run_with_base_args(args, setup_fn)
}

/// Runs a simulation with already parsed arguments.
///
/// # Errors
/// Returns an error if the log level is unknown, loading the parameters
/// fails, the report cannot be created or the setup function fails
pub fn run_with_base_args<F>(args: BaseArgs, setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), SimError>,
{
    if let Some(level) = &args.log_level {
        let level = LevelFilter::from_str(level)
            .map_err(|_| SimError::SimError(format!("unknown log level `{level}`")))?;
        set_log_level(level);
    }

    let mut context = Context::new();
    context.init_random(args.random_seed);

    // Optionally load parameters from a file
    if !args.config.is_empty() {
        info!("loading parameters from {}", args.config);
        context.load_parameters_from_json(Path::new(&args.config))?;
    }

    // Optionally write the census to the output directory
    if !args.output_dir.is_empty() {
        let path = PathBuf::from(&args.output_dir).join(CENSUS_REPORT);
        context.add_census_report(&path)?;
    }

    setup_fn(&mut context, &args)?;

    context.execute();
    Ok(context)
}
