//! Overlay daemon: inspects a node's output store and effective configuration.
//!
//! Hosting topics needs topic managers and a chain tracker, which are
//! supplied by the embedding application through `overlay_node::OverlayNode`.
//! This binary only reads what such a node persisted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use overlay_node::{init_logging, NodeConfig};
use overlay_store::{Output, OutputLookup, SpentFilter, UtxoEnumeration};
use overlay_store_lmdb::LmdbEnvironment;
use overlay_types::{Outpoint, Score};

#[derive(Parser)]
#[command(name = "overlay-daemon", about = "Topic overlay node tools")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "OVERLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory of the LMDB output store.
    #[arg(long, env = "OVERLAY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "OVERLAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "OVERLAY_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// List a topic's unspent outputs, oldest first.
    Utxos {
        #[arg(long)]
        topic: String,
        /// Only outputs scored strictly above this value.
        #[arg(long, default_value_t = 0)]
        since: u64,
        /// Maximum number of outputs; 0 lists everything.
        #[arg(long, default_value_t = 100)]
        limit: u32,
        /// Include spent outputs.
        #[arg(long)]
        historical: bool,
        /// One JSON object per line instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show one output as JSON.
    Output {
        /// Outpoint as `<txid>.<index>`.
        outpoint: Outpoint,
        #[arg(long)]
        topic: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn effective_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            NodeConfig::from_toml_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn output_json(output: &Output) -> serde_json::Value {
    let outpoints = |ops: &[Outpoint]| ops.iter().map(ToString::to_string).collect::<Vec<_>>();
    serde_json::json!({
        "outpoint": output.outpoint.to_string(),
        "topic": output.topic,
        "spent": output.spent,
        "score": output.score.value(),
        "block_height": output.block_height,
        "consumed_by": outpoints(&output.consumed_by),
        "outputs_consumed": outpoints(&output.outputs_consumed),
        "bundle": hex::encode(&output.bundle),
    })
}

fn open_store(config: &NodeConfig) -> anyhow::Result<overlay_store_lmdb::LmdbOutputStore> {
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size)
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    Ok(env.output_store())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    init_logging(config.log_format(), &config.log_level);

    match cli.command {
        Command::Utxos {
            topic,
            since,
            limit,
            historical,
            json,
        } => {
            let store = open_store(&config)?;
            let outputs =
                store.find_utxos_for_topic(&topic, Score::new(since), limit, historical)?;
            tracing::debug!(%topic, count = outputs.len(), "listed outputs");
            for output in &outputs {
                if json {
                    println!("{}", output_json(output));
                } else {
                    println!(
                        "{}\t{}\t{}\t{}",
                        output.score.value(),
                        output.outpoint,
                        if output.spent { "spent" } else { "unspent" },
                        output
                            .block_height
                            .map(|h| h.to_string())
                            .unwrap_or_else(|| "-".into()),
                    );
                }
            }
        }
        Command::Output { outpoint, topic } => {
            let store = open_store(&config)?;
            let output = store
                .find_output(&outpoint, Some(&topic), SpentFilter::Any)?
                .with_context(|| format!("{outpoint} is not admitted into {topic}"))?;
            println!("{}", serde_json::to_string_pretty(&output_json(&output))?);
        }
        Command::Config => {
            print!("{}", config.to_toml_string());
        }
    }
    Ok(())
}
