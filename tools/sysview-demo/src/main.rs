//! sysview-demo - drive the record-exposure framework end to end
//!
//! Stands in for the kernel module wiring around the framework: it creates
//! the registry at startup, publishes a handful of records, plays the role of
//! user space by reading every attribute file, optionally rings the
//! acknowledge doorbell on each record, and tears the registry down.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use sysview_eventlog::{
    create_and_register, handle_read_raw, handle_show, handle_store, MemNodeSpace,
    NodeSpace, RecordKind, RecordRef, Registry,
};

#[derive(Parser)]
#[command(name = "sysview-demo")]
#[command(version)]
#[command(about = "SysView - expose event-log records as attribute nodes", long_about = None)]
struct Cli {
    /// Number of records to publish
    #[arg(long, default_value_t = 3)]
    records: u64,

    /// Payload size per record, in bytes
    #[arg(long, default_value_t = 64)]
    payload_bytes: usize,

    /// Ring the acknowledge doorbell on every record before teardown
    #[arg(long)]
    ack_all: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let cli = Cli::parse();

    let space = Arc::new(MemNodeSpace::new());
    let registry = Registry::create("elog", Arc::clone(&space) as Arc<dyn NodeSpace>)
        .context("failed to create the elog container")?;
    log::info!("registry {:?} up, container {}", registry.name(), registry.container());

    let mut records = Vec::new();
    for n in 0..cli.records {
        let id = 0x2a + n;
        // Give the last record an unrecognized kind so the total label
        // mapping is visible in the output.
        let kind = if n + 1 == cli.records && cli.records > 1 {
            RecordKind::new(0x7f)
        } else {
            RecordKind::PEL
        };
        let payload: Vec<u8> = (0..cli.payload_bytes).map(|i| (id as usize + i) as u8).collect();
        let record = create_and_register(&registry, id, kind, &payload)
            .with_context(|| format!("failed to publish record 0x{id:x}"))?;
        records.push(record);
    }

    println!("{}", format!("/{}", registry.name()).bold().green());
    for record in &records {
        show_record(&space, &registry, record);
    }

    if cli.ack_all {
        println!("\n{}", "acknowledging every record".bold());
        for record in &records {
            let node = record.node();
            let before = record.ref_count();
            let consumed = handle_store(&registry, node, "acknowledge", b"ack\n")
                .context("doorbell store failed")?;
            println!(
                "  0x{:x}: consumed {} byte(s), references {} -> {}",
                record.id(),
                consumed,
                before,
                record.ref_count()
            );
            match handle_show(&registry, node, "acknowledge", &mut String::new()) {
                Err(err) => println!("  0x{:x}: acknowledge now {}", record.id(), err.to_string().red()),
                Ok(_) => println!("  0x{:x}: acknowledge still visible", record.id()),
            }
        }

        records.clear();
        println!(
            "{}",
            format!("released {} node(s) so far", space.release_count()).bold()
        );
    } else {
        records.clear();
    }

    registry.teardown();
    log::info!("registry torn down, {} node(s) released in total", space.release_count());
    Ok(())
}

fn show_record(space: &MemNodeSpace, registry: &Registry, record: &RecordRef) {
    let node = record.node();
    println!(
        "└─ {} ({})",
        space.node_name(node).unwrap_or_default().bold(),
        node
    );

    for attr in space.attributes(node) {
        if attr.name == "raw" {
            let mut window = [0u8; 16];
            let got = handle_read_raw(registry, node, 0, &mut window).unwrap_or(0);
            let hex: String = window[..got]
                .iter()
                .map(|byte| format!("{byte:02x} "))
                .collect();
            println!(
                "   {} [{:?}] {} ({} bytes total)",
                attr.name.cyan(),
                attr.mode,
                hex.trim_end(),
                record.payload().len()
            );
            continue;
        }
        let mut out = String::new();
        match handle_show(registry, node, attr.name, &mut out) {
            Ok(_) => println!("   {} [{:?}] {}", attr.name.cyan(), attr.mode, out.trim_end()),
            Err(err) => println!("   {} [{:?}] {}", attr.name.cyan(), attr.mode, err.to_string().red()),
        }
    }
}
