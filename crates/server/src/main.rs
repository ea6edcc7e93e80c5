//! `luxdb-server`: serve a LuxDB store over TCP.
//!
//! ```text
//! LUXDB_SECRET=... luxdb-server /var/lib/luxdb --port 8484
//! luxdb-server --config luxdb.toml --log-level debug
//! luxdb-server --memory
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use luxdb_server::{ServerConfig, ServerError};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn build_cli() -> Command {
    Command::new("luxdb-server")
        .about("Networked vector index store (server)")
        .arg(
            Arg::new("path")
                .help("Directory where the store is kept (overrides [store].path)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .help("Keep the store in memory only")
                .action(ArgAction::SetTrue)
                .conflicts_with("path"),
        )
        .arg(Arg::new("host").long("host").help("Address to listen on"))
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Port to listen on (0 = any free port)")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("durability")
                .long("durability")
                .help("Durability mode: standard or always")
                .value_parser(["standard", "always"]),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Log filter, e.g. info or luxdb::session=debug (overrides RUST_LOG)"),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .help("Print an example configuration file and exit")
                .action(ArgAction::SetTrue),
        )
}

fn init_logging(matches: &ArgMatches) -> Result<()> {
    let filter = match matches.get_one::<String>("log-level") {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn load_config(matches: &ArgMatches) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))?;

    if let Some(path) = matches.get_one::<PathBuf>("path") {
        config.store.path = Some(path.clone());
    }
    if matches.get_flag("memory") {
        config.store.path = None;
    }
    if let Some(host) = matches.get_one::<String>("host") {
        config.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(durability) = matches.get_one::<String>("durability") {
        config.store.durability = durability.clone();
    }

    if config.store.path.is_none() && !matches.get_flag("memory") {
        bail!("no store path given; pass a directory or --memory");
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    if matches.get_flag("print-config") {
        print!("{}", ServerConfig::default_toml());
        return;
    }

    if let Err(e) = init_logging(&matches) {
        eprintln!("{:#}", e);
        process::exit(2);
    }

    let code = match serve(&matches).await {
        Ok(()) => 0,
        Err(e) => {
            error!(target: "luxdb::server", "{:#}", e);
            eprintln!("luxdb-server: {:#}", e);
            match e.downcast_ref::<ServerError>() {
                Some(ServerError::Close(_)) => 3,
                _ => 1,
            }
        }
    };
    process::exit(code);
}

async fn serve(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    luxdb_server::run(config).await?;
    Ok(())
}
