//! stratus: build and deploy serverless projects as ordered stacks.

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{cmd_apply, cmd_build, cmd_delete, cmd_run};
use output::{OutputFormat, print_error, print_hint};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(author, version, about = "Build and deploy serverless projects", long_about = None)]
struct Cli {
  /// Project directory containing settings.yml
  #[arg(short, long, global = true, default_value = ".")]
  project: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the project into numbered template artifacts under _build/
  Build,

  /// Apply the last build to a stage
  Apply {
    /// Stage to deploy to (2-32 characters of a-z, 0-9 and '-')
    #[arg(short, long)]
    stage: String,

    /// Minutes each stack operation may take before giving up
    #[arg(long = "cf-timeout", value_name = "MINUTES")]
    cf_timeout: Option<u64>,

    /// Region to deploy to
    #[arg(long)]
    region: Option<String>,

    /// Output format of the resulting outputs
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Delete the stacks of the last build from a stage
  Delete {
    /// Stage to delete from
    #[arg(short, long)]
    stage: String,

    /// Actually delete; without this only the plan is printed
    #[arg(long)]
    confirm: bool,

    /// Region the stage lives in
    #[arg(long)]
    region: Option<String>,
  },

  /// Run a function locally through its local-command
  Run {
    /// Function reference, e.g. lambda::hello or lambda:app:hello
    lrn: String,

    /// JSON file passed to the function as its event
    #[arg(short, long)]
    event: Option<PathBuf>,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build => cmd_build(&cli.project),
    Commands::Apply {
      stage,
      cf_timeout,
      region,
      output,
    } => cmd_apply(&cli.project, &stage, region.as_deref(), cf_timeout, output),
    Commands::Delete { stage, confirm, region } => cmd_delete(&cli.project, &stage, region.as_deref(), confirm),
    Commands::Run { lrn, event } => cmd_run(&cli.project, &lrn, event.as_deref()),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      let code = match err.downcast_ref::<stratus_lib::Error>() {
        Some(e) => {
          print_hint(e.hint());
          e.exit_code()
        }
        None => 1,
      };
      ExitCode::from(u8::try_from(code).unwrap_or(1))
    }
  }
}
