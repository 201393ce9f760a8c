mod animation;
mod cmd;
mod output;
mod progress;
mod prompt;
mod root;
mod settings;
mod ui;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::{doctor::DoctorArgs, init::InitArgs, update::UpdateArgs, versions::VersionsArgs};
use pmkit_core::PmKitError;
use settings::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pm-kit",
    about = "Install, update and diagnose the PM Kit product-management framework",
    disable_version_flag = true
)]
struct Cli {
    /// Project root (default: nearest ancestor containing .pm-kit/, else cwd)
    #[arg(long, global = true, env = "PMKIT_ROOT")]
    root: Option<PathBuf>,

    /// Print version and check for a newer CLI release
    #[arg(short = 'v', long = "version")]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize PM Kit in the current directory
    Init(InitArgs),

    /// Update PM Kit to the latest (or a specific) release
    Update(UpdateArgs),

    /// Run diagnostics on the PM Kit installation
    Doctor(DoctorArgs),

    /// Manage PM Kit configuration
    Config {
        /// list, get, set, delete or reset
        action: String,
        key: Option<String>,
        value: Option<String>,
    },

    /// List available PM Kit versions
    Versions(VersionsArgs),

    /// Remove PM Kit installations
    Uninstall {
        /// Skip confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let debug = settings::debug_enabled();

    let default_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::resolve(cli.root.as_deref());

    if cli.version {
        cmd::version::run(settings.as_ref().ok());
        return;
    }
    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return;
    };

    let result = settings.and_then(|settings| match command {
        Commands::Init(args) => cmd::init::run(&settings, args),
        Commands::Update(args) => cmd::update::run(&settings, args),
        Commands::Doctor(args) => cmd::doctor::run(&settings, args),
        Commands::Config { action, key, value } => {
            cmd::config::run(&settings, &action, key.as_deref(), value.as_deref())
        }
        Commands::Versions(args) => cmd::versions::run(&settings, args),
        Commands::Uninstall { yes } => cmd::uninstall::run(&settings, yes),
    });

    if let Err(e) = result {
        let core = e.chain().find_map(|c| c.downcast_ref::<PmKitError>());
        if matches!(core, Some(PmKitError::Cancelled)) {
            println!("Operation cancelled.");
            return;
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        if let Some(hint) = core.and_then(PmKitError::hint) {
            eprintln!("hint: {hint}");
        }
        if debug {
            eprintln!("\n{e:?}");
        }
        std::process::exit(1);
    }
}
