//! Binary entrypoint for the playerhomes operator CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and the home folder
//! - `players` - list players that have a home document
//! - `list <player>` - list a player's homes, default marked with `*`
//! - `show <player> [name]` - print one home (the default when no name is given)
//! - `set <player> <name> <dimension> <x> <y> <z>` - add a home
//! - `remove <player> <name>` - delete a home
//! - `default <player> <name>` - change the default home
//!
//! See the library crate docs for module-level details: `playerhomes::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use playerhomes::config::Config;
use playerhomes::location::Location;
use playerhomes::storage::HomeDirectory;

#[derive(Parser)]
#[command(name = "playerhomes")]
#[command(about = "Inspect and edit per-player home bookmarks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the home folder
    Init,
    /// List players with a home document
    Players,
    /// List a player's homes
    List { player: String },
    /// Show one home, or the default home when no name is given
    Show { player: String, name: Option<String> },
    /// Add a home for a player
    Set {
        player: String,
        name: String,
        dimension: String,
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
        #[arg(allow_hyphen_values = true)]
        z: f64,
    },
    /// Remove a player's home
    Remove { player: String, name: String },
    /// Make an existing home the player's default
    #[command(name = "default")]
    SetDefault { player: String, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new playerhomes configuration");
        let cfg = Config::default();
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        let homes: HomeDirectory = HomeDirectory::from_config(&cfg.storage)?;
        info!("Home folder ready at {}", homes.folder().display());
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);
    let homes: HomeDirectory = HomeDirectory::from_config(&config.storage)?;

    let ok = match cli.command {
        Commands::Init => true,
        Commands::Players => {
            for player in homes.players()? {
                println!("{}", player);
            }
            true
        }
        Commands::List { player } => {
            let store = homes.store(&player)?;
            let default = store.default_name()?;
            let list = store.list_homes()?;
            if list.is_empty() {
                println!("{} has no homes.", store.player());
            }
            for (name, loc) in list {
                let mark = if default.as_deref() == Some(name.as_str()) { "*" } else { " " };
                println!("{} {}: {}", mark, name, loc);
            }
            true
        }
        Commands::Show { player, name } => {
            let store = homes.store(&player)?;
            let found = match &name {
                Some(name) => store.get_home(name, None)?,
                None => store.get_default(None)?,
            };
            match found {
                Some(loc) => {
                    println!("{}", loc);
                    true
                }
                None => {
                    match name {
                        Some(name) => eprintln!("{} has no home named '{}'.", store.player(), name),
                        None => eprintln!("{} has no default home.", store.player()),
                    }
                    false
                }
            }
        }
        Commands::Set {
            player,
            name,
            dimension,
            x,
            y,
            z,
        } => {
            let store = homes.store(&player)?;
            let loc = Location::new(dimension, x, y, z);
            if store.set_home(&name, loc)? {
                println!("Saved home '{}' for {}.", name, store.player());
                true
            } else {
                eprintln!(
                    "Cannot save '{}': the name is reserved, empty, or already used.",
                    name
                );
                false
            }
        }
        Commands::Remove { player, name } => {
            let store = homes.store(&player)?;
            if store.remove_home(&name)? {
                println!("Removed home '{}' for {}.", name, store.player());
                true
            } else {
                eprintln!("{} has no home named '{}'.", store.player(), name);
                false
            }
        }
        Commands::SetDefault { player, name } => {
            let store = homes.store(&player)?;
            if store.set_default(&name)? {
                println!("Default home for {} is now '{}'.", store.player(), name);
                true
            } else {
                eprintln!("{} has no home named '{}'.", store.player(), name);
                false
            }
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides config
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .map_err(|e| eprintln!("Cannot open log file {}: {}", file, e))
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
