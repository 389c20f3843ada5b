//! Scnr CLI - inspect and edit scenario tag data in place.
//!
//! This is the main entry point for the scnr command-line application.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scnr::prelude::*;
use scnr::tag::locator;
use scnr::tag::{LocationOwner, ZoneSlot};

/// Scnr - scenario tag editor
#[derive(Parser)]
#[command(name = "scnr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario tag file
    #[arg(short, long, env = "SCNR_SCENARIO")]
    scenario: Option<PathBuf>,

    /// JSON schema describing the scenario layout
    #[arg(long, env = "SCNR_SCHEMA")]
    schema: PathBuf,

    /// Write edits here instead of back to the scenario file
    #[arg(short, long, env = "SCNR_OUTPUT")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the items of a collection (e.g. `scenery`, `zone:0:areas`)
    List {
        kind: SelectionKind,
    },

    /// Show one item's layout, address and fields
    Show {
        kind: SelectionKind,
        index: usize,
    },

    /// Print one field of an item
    Get {
        kind: SelectionKind,
        index: usize,
        field: String,
    },

    /// Set one field of an item
    Set {
        kind: SelectionKind,
        index: usize,
        field: String,
        value: String,
    },

    /// Append a new item
    Add {
        kind: SelectionKind,
    },

    /// Remove an item
    Remove {
        kind: SelectionKind,
        index: usize,

        /// Also remove the object name a placement references
        #[arg(long)]
        cascade: bool,
    },

    /// Duplicate an item into another slot
    Copy {
        kind: SelectionKind,
        source: usize,
        dest: usize,
    },

    /// Print the zone / squad hierarchy
    AiTree,

    /// Print a summary of the schema
    Schema,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = SchemaCatalog::load(&cli.schema)
        .with_context(|| format!("Failed to load schema {}", cli.schema.display()))?;

    if let Commands::Schema = cli.command {
        cmd_schema(&catalog);
        return Ok(());
    }

    let path = cli
        .scenario
        .as_deref()
        .context("No scenario given (use --scenario or SCNR_SCENARIO)")?;
    let mut scenario =
        Scenario::open(path, catalog).with_context(|| format!("Failed to open scenario {}", path.display()))?;

    match cli.command {
        Commands::List { kind } => cmd_list(&scenario, kind)?,
        Commands::Show { kind, index } => cmd_show(&scenario, kind, index)?,
        Commands::Get { kind, index, field } => cmd_get(&scenario, kind, index, &field)?,
        Commands::Set {
            kind,
            index,
            field,
            value,
        } => {
            cmd_set(&mut scenario, kind, index, &field, &value)?;
        }
        Commands::Add { kind } => {
            let report = scenario.add(kind).context("Add failed")?;
            print_report(&report);
        }
        Commands::Remove { kind, index, cascade } => {
            let op = if cascade {
                StructuralOp::remove_cascading(kind, index)
            } else {
                StructuralOp::remove(kind, index)
            };
            let report = scenario.apply(op).context("Remove failed")?;
            print_report(&report);
        }
        Commands::Copy { kind, source, dest } => {
            let report = scenario.copy(kind, source, dest).context("Copy failed")?;
            print_report(&report);
        }
        Commands::AiTree => cmd_ai_tree(&scenario),
        Commands::Schema => {}
    }

    if scenario.is_dirty() {
        save(&mut scenario, path, cli.output.as_deref())?;
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_field(name: &str) -> Result<FieldId> {
    FieldId::from_name(name).with_context(|| format!("Unknown field '{name}'"))
}

fn save(scenario: &mut Scenario, input: &Path, output: Option<&Path>) -> Result<()> {
    let target = output.unwrap_or(input);
    if let Some(output) = output {
        scenario.set_origin(Box::new(FileOrigin::new(output)));
    }
    scenario
        .commit()
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!(path = %target.display(), "saved scenario");
    println!("Saved {}", target.display());
    Ok(())
}

fn cmd_list(scenario: &Scenario, kind: SelectionKind) -> Result<()> {
    let items = scenario.items(kind).with_context(|| format!("Cannot list {kind}"))?;
    for item in &items {
        println!("{}", item.label);
    }
    println!("\nTotal: {} items", items.len());
    Ok(())
}

fn cmd_show(scenario: &Scenario, kind: SelectionKind, index: usize) -> Result<()> {
    let context = scenario
        .locate(Selection::item(kind, index))
        .with_context(|| format!("No item {index} in {kind}"))?;

    println!("{}", locator::label(scenario, context.target));
    println!("  address: {:#x}", context.base_address);
    println!("  stride:  {:#x}", context.layout.stride);

    let record = scenario
        .record(context.target)
        .with_context(|| format!("No item {index} in {kind}"))?;
    for (field, def) in context.layout.fields_by_offset() {
        let value = record
            .get(field)
            .map_or_else(|| "<unreadable>".to_string(), |v| v.to_string());
        println!("  +{:#06x} {:<18} {}", def.offset, field.as_str(), value);
    }
    for name in context.layout.block_names() {
        let count = record.child(name).map_or(0, |c| c.len());
        println!("  block {name}: {count} items");
    }

    for table in &context.auxiliary {
        match table.base_address {
            Some(address) => println!("  uses {} ({} items at {:#x})", table.kind, table.count, address),
            None => println!("  uses {} (empty)", table.kind),
        }
    }
    Ok(())
}

fn cmd_get(scenario: &Scenario, kind: SelectionKind, index: usize, field: &str) -> Result<()> {
    let field = parse_field(field)?;
    let value = scenario
        .get_field(EntityHandle::new(kind, index), field)
        .with_context(|| format!("Cannot read {kind}[{index}]"))?;
    match value {
        Some(value) => println!("{value}"),
        None => println!("{field} is not part of {kind} in this format"),
    }
    Ok(())
}

fn cmd_set(scenario: &mut Scenario, kind: SelectionKind, index: usize, field: &str, value: &str) -> Result<()> {
    let field = parse_field(field)?;
    let handle = EntityHandle::new(kind, index);
    let outcome = scenario
        .set_field_text(handle, field, value)
        .with_context(|| format!("Failed to set {field} on {handle}"))?;
    match outcome {
        WriteOutcome::Written => println!("{handle}.{field} = {value}"),
        WriteOutcome::Cached => println!("{handle}.{field} cached, not written"),
        WriteOutcome::Unsupported => println!("{field} is not part of {kind} in this format, nothing written"),
    }
    Ok(())
}

fn print_report(report: &EditReport) {
    for (kind, count) in &report.counts {
        println!("{kind}: {count} items");
    }
    if let Some(created) = report.created {
        println!("created {created}");
    }
    for handle in &report.detached {
        println!("removed {handle}");
    }
    for change in &report.rewritten {
        println!(
            "rewrote {}.{}: {} -> {}",
            change.entity, change.field, change.old, change.new
        );
    }
}

fn cmd_ai_tree(scenario: &Scenario) {
    let tree = scenario.ai_tree();
    println!("format: {}", tree.format);

    if !tree.squad_groups.is_empty() {
        println!("squad groups:");
        for group in &tree.squad_groups {
            match group.parent.and_then(|p| tree.squad_groups.get(p)) {
                Some(parent) => println!("  [{:03}] {} (in {})", group.index, group.name, parent.name),
                None => println!("  [{:03}] {}", group.index, group.name),
            }
        }
    }

    for zone in tree.iter_zones() {
        match zone.slot {
            ZoneSlot::Index(i) => println!("zone [{i:03}] {}", zone.name),
            ZoneSlot::Default => println!("zone ({})", zone.name),
        }
        if !zone.is_default() {
            println!(
                "  {} areas, {} firing positions",
                zone.areas.len(),
                zone.firing_positions.len()
            );
        }
        for squad in &zone.squads {
            println!(
                "  squad [{:03}] {} ({} locations)",
                squad.index,
                squad.name,
                squad.locations.locations().len()
            );
            if let LocationOwner::Encounters(encounters) = &squad.locations {
                for encounter in encounters {
                    println!(
                        "    encounter [{:03}] {} ({} starting locations)",
                        encounter.index,
                        encounter.name,
                        encounter.starting_locations.len()
                    );
                }
            }
        }
    }
    println!("\nTotal: {} squads", tree.squad_count());
}

fn cmd_schema(catalog: &SchemaCatalog) {
    println!(
        "format: {}, endian: {}, pointer base: {:#x}, root: {:#x}",
        catalog.format,
        catalog.endian.as_str(),
        catalog.pointer_base,
        catalog.root_address
    );
    for name in catalog.section_names() {
        if let Some(layout) = catalog.section(name) {
            print_layout(name, layout, 0);
        }
    }
}

fn print_layout(name: &str, layout: &SectionLayout, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{name} (header +{:#x}, stride {:#x})",
        layout.header_offset, layout.stride
    );
    for (field, def) in layout.fields_by_offset() {
        println!("{indent}  +{:#06x} {:<18} {}", def.offset, field.as_str(), def.kind.as_str());
    }
    for block in layout.block_names() {
        if let Some(child) = layout.block(block) {
            print_layout(block, child, depth + 1);
        }
    }
}
