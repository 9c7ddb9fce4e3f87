//! Table Parsing Example
//!
//! This example parses canned Juniper command output from several routers,
//! merges the per-router tables and prints them, once sequentially and once
//! on the tokio blocking pool.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example parse_tables
//! cargo run --example parse_tables -- --verbose --sort
//! RUST_LOG=fsmtable=debug cargo run --example parse_tables
//! ```

use std::env;
use std::sync::Arc;

use fsmtable::engine::batch::format_concurrent;
use fsmtable::{DeviceOutput, EngineBuilder, Formatted};

const INDEX: &str = include_str!("templates/index");

const TEMPLATES: &[(&str, &str)] = &[
    (
        "juniper_show_interfaces_terse",
        include_str!("templates/juniper_show_interfaces_terse.textfsm"),
    ),
    (
        "juniper_show_version",
        include_str!("templates/juniper_show_version.textfsm"),
    ),
    (
        "juniper_show_version_model",
        include_str!("templates/juniper_show_version_model.textfsm"),
    ),
];

const R1_INTERFACES: &str = "\
Interface               Admin Link Proto    Local                 Remote
ge-0/0/0                up    up
ge-0/0/0.0              up    up   inet     10.0.0.1/30
                                   iso
ge-0/0/1                up    down
lo0.0                   up    up   inet     192.168.255.1         --> 0/0
";

const R2_INTERFACES: &str = "\
Interface               Admin Link Proto    Local                 Remote
ge-0/0/0                up    up
ge-0/0/0.0              up    up   inet     10.0.0.2/30
";

const R1_VERSION: &str = "\
Hostname: r1
Model: mx960
Junos: 21.4R3-S5.4
";

const R2_VERSION: &str = "\
Hostname: r2
Model: mx204
Junos: 22.2R1.9
";

/// Simple argument parser
struct Args {
    verbose: bool,
    sort: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        Self {
            verbose: args.iter().any(|a| a == "--verbose"),
            sort: args.iter().any(|a| a == "--sort"),
        }
    }
}

fn outputs() -> Vec<DeviceOutput> {
    [
        ("r1", "show interfaces terse", R1_INTERFACES),
        ("r2", "sh int te", R2_INTERFACES),
        ("r1", "show version", R1_VERSION),
        ("r2", "show ver", R2_VERSION),
        ("r2", "show system uptime", "Current time: 2026-10-16 12:00:00 UTC\n"),
    ]
    .into_iter()
    .map(|(device, command, data)| {
        DeviceOutput::new(device, command, data).with_attribute("Vendor", "Juniper")
    })
    .collect()
}

fn print_formatted(formatted: &Formatted) {
    for table in &formatted.tables {
        println!("{}", table);
    }
    for output in &formatted.raw {
        println!("--- {} ({}), unparsed ---", output.device, output.command);
        println!("{}", output.data);
    }
    for (device, error) in &formatted.failures {
        println!("--- {} failed: {} ---", device, error);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== fsmtable Parsing Example ===\n");

    let mut builder = EngineBuilder::new()
        .index(INDEX)
        .verbose(args.verbose)
        .sort(args.sort);
    for (name, source) in TEMPLATES {
        builder = builder.template(*name, *source);
    }
    let engine = Arc::new(builder.build()?);

    println!("--- Sequential ---\n");
    print_formatted(&engine.format(outputs()));

    println!("--- Concurrent ---\n");
    let formatted = format_concurrent(Arc::clone(&engine), outputs()).await;
    print_formatted(&formatted);

    println!("--- JSON dump of the first table ---\n");
    if let Some(table) = formatted.tables.first() {
        println!("{}", table.dump()?);
    }

    Ok(())
}
