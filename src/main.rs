//! mongo-printers - Render mongo core types from a stopped process or a
//! memory snapshot
//!
//! Entry point that handles CLI argument parsing and target setup, then
//! either renders one value or starts the REPL.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use mongo_printers::core::memory::{ProcessMemory, SnapshotMemory, TargetMemory};
use mongo_printers::debuginfo::TypeRegistry;
use mongo_printers::printers::RenderOptions;
use mongo_printers::ui::cli::{parse_address, print_rendered, run_cli, Session};
use std::path::PathBuf;

/// Pretty-print mongo::StringMap, Status, StringData and BSONObj values
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read memory of this (stopped) process
    #[arg(short, long, conflicts_with = "snapshot")]
    pid: Option<u32>,

    /// Map a raw memory dump at an address (FILE@ADDR, repeatable)
    #[arg(long, value_name = "FILE@ADDR")]
    snapshot: Vec<String>,

    /// JSON layout file exported from the target's debug info
    #[arg(long, value_name = "FILE")]
    layouts: Option<PathBuf>,

    /// Add layouts for mongo::StringMap<TYPE> (repeatable)
    #[arg(long = "string-map", value_name = "TYPE")]
    string_maps: Vec<String>,

    /// Longest string read from the target
    #[arg(long, default_value_t = RenderOptions::default().max_string_len)]
    max_string: usize,

    /// Most children shown per value
    #[arg(long, default_value_t = RenderOptions::default().max_children)]
    max_children: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one value and exit
    Print {
        /// Type name, e.g. mongo::BSONObj
        type_name: String,
        /// Address of the object (hex with 0x, or decimal)
        address: String,
    },
    /// Interactive prompt (default)
    Repl,
}

fn open_target(args: &Args) -> anyhow::Result<Box<dyn TargetMemory>> {
    if let Some(pid) = args.pid {
        let mut memory = ProcessMemory::new();
        memory
            .open_process(pid)
            .with_context(|| format!("opening process {}", pid))?;
        return Ok(Box::new(memory));
    }

    if args.snapshot.is_empty() {
        bail!("no target: pass --pid <PID> or --snapshot <FILE@ADDR>");
    }

    let mut memory = SnapshotMemory::new();
    for spec in &args.snapshot {
        let (path, addr) = spec
            .rsplit_once('@')
            .ok_or_else(|| anyhow!("snapshot '{}' is not FILE@ADDR", spec))?;
        let base = parse_address(addr).with_context(|| format!("bad address in '{}'", spec))?;
        memory.map_file(path, base)?;
    }
    Ok(Box::new(memory))
}

fn load_types(args: &Args) -> anyhow::Result<TypeRegistry> {
    let mut types = TypeRegistry::builtin();
    if let Some(path) = &args.layouts {
        types
            .load_file(path)
            .with_context(|| format!("loading layouts from {}", path.display()))?;
    }
    for value_type in &args.string_maps {
        let name = types
            .add_string_map_instance(value_type)
            .with_context(|| format!("adding layouts for StringMap<{}>", value_type))?;
        log::debug!("Added {}", name);
    }
    Ok(types)
}

fn main() -> anyhow::Result<()> {
    // 1. Parse command line arguments
    let args = Args::parse();

    // 2. Initialize logger with verbosity level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    ))
    .init();

    log::debug!("Target pid: {:?}", args.pid);
    log::debug!("Snapshots: {:?}", args.snapshot);

    // 3. Build the session
    let memory = open_target(&args)?;
    let types = load_types(&args)?;
    log::info!("{} types known, target {}", types.len(), memory.describe());

    let session = Session::new(memory, types).with_options(RenderOptions {
        max_string_len: args.max_string,
        max_children: args.max_children,
    });

    // 4. Branch based on execution mode
    match &args.command {
        Some(Command::Print { type_name, address }) => {
            let address = parse_address(address)
                .with_context(|| format!("bad address '{}'", address))?;
            let rendered = session.render(type_name, address)?;
            print_rendered(&rendered);
        }
        Some(Command::Repl) | None => {
            println!("[*] mongo-printers v{}", env!("CARGO_PKG_VERSION"));
            run_cli(session)?;
        }
    }

    Ok(())
}
