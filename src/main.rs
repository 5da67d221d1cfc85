use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api_key;
use api_key::{generate_api_key, is_valid_api_key};

mod mcp;
use mcp::{Dispatcher, ToolRegistry};

mod record_store;
use record_store::{NullRecordStore, RecordStore, SqliteRecordStore};

mod runner;

mod server;
use server::{run_sse_server, run_stdio_server, ServerConfig};

mod tools;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Listen address; combined with a non-zero port it selects the SSE
    /// transport.
    #[clap(short = 'a', default_value = "")]
    pub addr: String,

    /// Listen port. Absent or zero selects the stdio transport.
    #[clap(short = 'p', default_value_t = 0)]
    pub port: u16,

    /// Enable the record store rooted at this directory.
    #[clap(short = 'D')]
    pub record_dir: Option<PathBuf>,

    /// Prefix the SSE path with this API key.
    #[clap(short = 'o')]
    pub api_key: Option<String>,

    /// Enable debug logging (stderr).
    #[clap(short = 'v')]
    pub verbose: bool,

    /// Print a newly generated API key and exit.
    #[clap(long = "generate_key")]
    pub generate_key: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if cli_args.generate_key {
        println!("{}", generate_api_key());
        return Ok(());
    }

    let default_level = if cli_args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    if std::env::consts::OS != "linux" {
        bail!("This program only supports Linux systems.");
    }

    // ss -p, pkill of arbitrary pids and lastb all need root.
    if unsafe { libc::geteuid() } != 0 {
        bail!("This program must be run as root.");
    }

    if let Some(key) = &cli_args.api_key {
        if !is_valid_api_key(key) {
            bail!("Invalid API key format. Must start with 'sk-netutil-' followed by 32 characters.");
        }
    }

    let record_store: Arc<dyn RecordStore> = match &cli_args.record_dir {
        Some(dir) => {
            let store = SqliteRecordStore::new(dir)?;
            info!("Record store enabled at {:?}", dir);
            Arc::new(store)
        }
        None => Arc::new(NullRecordStore),
    };

    let mut registry = ToolRegistry::new();
    tools::register_all_tools(&mut registry);
    info!("Registered {} tools", registry.tool_count());

    let dispatcher = Dispatcher::new(Arc::new(registry), record_store);

    if !cli_args.addr.is_empty() && cli_args.port != 0 {
        let config = ServerConfig {
            bind_addr: cli_args.addr,
            port: cli_args.port,
            api_key: cli_args.api_key,
        };
        run_sse_server(config, Arc::new(dispatcher)).await
    } else {
        run_stdio_server(dispatcher).await
    }
}
