use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use tracing::Level;

/// Values given on the command line that take precedence over the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub output_dir: Option<String>,
    pub start_year: Option<u32>,
    pub end_year: Option<u32>,
    pub max_workers: Option<usize>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum Command {
    Download {
        config_path: Option<String>,
        overrides: ConfigOverrides,
    },
    Plan {
        config_path: Option<String>,
        overrides: ConfigOverrides,
    },
}

pub struct Args {
    pub command: Command,
    pub log_level: Level,
}

#[derive(Debug, Parser)]
#[command(
    name = "era5dl",
    version,
    about = "Bulk-download ERA5-Land reanalysis data from the Climate Data Store, one file per variable, year and month"
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Sets the level of verbosity",
        action = ArgAction::Count,
        global = true
    )]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, ClapArgs)]
struct CommonArgs {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Sets a config file (built-in defaults are used when omitted)"
    )]
    config: Option<String>,

    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        help = "Overrides the base output directory"
    )]
    output_dir: Option<String>,

    #[arg(
        long = "start-year",
        value_name = "YEAR",
        help = "Overrides the first year to download"
    )]
    start_year: Option<u32>,

    #[arg(
        long = "end-year",
        value_name = "YEAR",
        help = "Overrides the last year to download (inclusive)"
    )]
    end_year: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Download every variable/year/month file that is not on disk yet
    Download {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(
            long = "max-workers",
            value_name = "N",
            help = "Maximum number of simultaneous downloads"
        )]
        max_workers: Option<usize>,

        #[arg(
            long = "max-retries",
            value_name = "N",
            help = "Maximum attempts per file"
        )]
        max_retries: Option<u32>,
    },

    /// List the files a download would produce and whether they already exist
    Plan {
        #[command(flatten)]
        common: CommonArgs,
    },
}

pub fn parse_args() -> Args {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy()
                .add_directive("hyper_util=warn".parse().expect("valid directive")),
        )
        .init();

    let command = match cli.command {
        CliCommand::Download {
            common,
            max_workers,
            max_retries,
        } => Command::Download {
            config_path: common.config,
            overrides: ConfigOverrides {
                output_dir: common.output_dir,
                start_year: common.start_year,
                end_year: common.end_year,
                max_workers,
                max_retries,
            },
        },
        CliCommand::Plan { common } => Command::Plan {
            config_path: common.config,
            overrides: ConfigOverrides {
                output_dir: common.output_dir,
                start_year: common.start_year,
                end_year: common.end_year,
                ..ConfigOverrides::default()
            },
        },
    };

    Args { command, log_level }
}
