#![forbid(unsafe_code)]
//! Resolve an epoch of candidate transactions against a UTXO pool snapshot.

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use scroogecoin::cli::{
    build_demo, load_batch, load_pool, short_hex, write_json, DemoParticipants,
};
use scroogecoin::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use scroogecoin::crypto::Secp256k1Verifier;
use scroogecoin::ledger::{resolve_epoch, UtxoPool};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Writes a demo pool snapshot and candidate batch with fresh keys
    Demo {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Resolves one epoch and writes the updated pool
    Run {
        /// Pool snapshot (JSON)
        #[arg(long)]
        pool: PathBuf,
        /// Candidate transactions (JSON array)
        #[arg(long)]
        txs: PathBuf,
        /// Where to write the updated pool; defaults to overwriting --pool
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Prints the entries of a pool snapshot
    Inspect {
        #[arg(long)]
        pool: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Demo { out_dir } => demo(out_dir)?,
        Commands::Run { pool, txs, out } => {
            run(&config, pool, txs, out.as_deref().unwrap_or(pool.as_path()))?
        }
        Commands::Inspect { pool } => inspect(&load_pool(pool)?),
    }

    Ok(())
}

fn demo(out_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(out_dir)?;
    let fixture = build_demo(&DemoParticipants::generate())?;

    let pool_path = out_dir.join("pool.json");
    let batch_path = out_dir.join("batch.json");
    write_json(&pool_path, &fixture.pool)?;
    write_json(&batch_path, &fixture.candidates)?;

    println!("{}", "✅ Demo files written".bright_green().bold());
    println!("   pool:  {}", pool_path.display().to_string().cyan());
    println!("   batch: {}", batch_path.display().to_string().cyan());
    println!();
    println!(
        "{}",
        format!(
            "💡 Next: scrooge-epoch run --pool {} --txs {}",
            pool_path.display(),
            batch_path.display()
        )
        .yellow()
    );
    Ok(())
}

fn run(
    config: &Config,
    pool_path: &Path,
    txs_path: &Path,
    out_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = load_pool(pool_path)?;
    let candidates = load_batch(txs_path)?;

    println!(
        "{}",
        format!(
            "⚖️  Resolving {} candidates against {} unspent outputs",
            candidates.len(),
            pool.len()
        )
        .bright_cyan()
        .bold()
    );

    let outcome = resolve_epoch(pool, &candidates, &Secp256k1Verifier, &config.handler);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Transaction").add_attribute(Attribute::Bold),
            Cell::new("In/Out").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
        ]);

    for (order, tx) in outcome.accepted.iter().enumerate() {
        table.add_row(vec![
            Cell::new(order + 1),
            Cell::new(short_hex(&tx.hash())),
            Cell::new(format!("{}/{}", tx.num_inputs(), tx.num_outputs())),
            Cell::new("accepted").fg(TableColor::Green),
        ]);
    }
    for rejected in &outcome.rejected {
        table.add_row(vec![
            Cell::new("-"),
            Cell::new(short_hex(&rejected.tx.hash())),
            Cell::new(format!(
                "{}/{}",
                rejected.tx.num_inputs(),
                rejected.tx.num_outputs()
            )),
            Cell::new(rejected.reason.to_string()).fg(TableColor::Red),
        ]);
    }
    println!("{table}");

    write_json(out_path, &outcome.pool)?;
    println!(
        "{}",
        format!(
            "✅ {} accepted, {} rejected; pool written to {}",
            outcome.accepted.len(),
            outcome.rejected.len(),
            out_path.display()
        )
        .bright_green()
    );
    Ok(())
}

fn inspect(pool: &UtxoPool) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Outpoint").add_attribute(Attribute::Bold),
            Cell::new("Owner").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

    for (outpoint, output) in pool.all_outputs() {
        table.add_row(vec![
            Cell::new(format!("{}:{}", short_hex(&outpoint.tx_hash), outpoint.index)),
            Cell::new(short_hex(output.address.as_bytes())),
            Cell::new(output.value).fg(TableColor::Yellow),
        ]);
    }
    println!("{table}");

    match pool.total_value() {
        Some(total) => println!(
            "{}",
            format!("💰 {} outputs, total value {}", pool.len(), total).bright_cyan()
        ),
        None => println!("{}", "⚠️  Total value overflows i64".red()),
    }
}
