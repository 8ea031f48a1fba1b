use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use machine_inventory::{logging, Collection, Config, Inventory, Machine, Purchase, Store};

#[derive(Parser)]
#[command(name = "inventory")]
#[command(about = "Track machines and purchases, with CSV import/export", long_about = None)]
#[command(version)]
struct Cli {
    /// Database file (overrides INVENTORY_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CollectionArg {
    Machines,
    Purchases,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Machines => Collection::Machine,
            CollectionArg::Purchases => Collection::Purchase,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Browse both collections in the terminal (default)
    Browse,

    /// Print every record and the total quantity
    List {
        #[arg(short, long, value_enum, default_value = "machines")]
        collection: CollectionArg,
    },

    /// Import a CSV file as new records (all rows or none)
    Import {
        /// Input CSV file
        input: PathBuf,

        #[arg(short, long, value_enum, default_value = "machines")]
        collection: CollectionArg,
    },

    /// Export a collection to a timestamped CSV file
    Export {
        #[arg(short, long, value_enum, default_value = "machines")]
        collection: CollectionArg,

        /// Output directory (overrides INVENTORY_EXPORT_DIR)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Browse);
    if wants_logging(&command) {
        logging::init();
    }

    let config = Config::from_env().context("Invalid configuration")?;

    let db_path = cli.db.unwrap_or_else(|| config.database_path.clone());
    let store = Store::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let inventory = Inventory::new(store);

    match command {
        Commands::Browse => run_ui_mode(&inventory)?,
        Commands::List { collection } => run_list(&inventory, collection.into())?,
        Commands::Import { input, collection } => {
            let count = match Collection::from(collection) {
                Collection::Machine => inventory.import_file::<Machine>(&input),
                Collection::Purchase => inventory.import_file::<Purchase>(&input),
            }
            .with_context(|| format!("Failed to import {}", input.display()))?;
            println!("✓ Imported {} records from {}", count, input.display());
        }
        Commands::Export { collection, out_dir } => {
            let dir = out_dir.unwrap_or_else(|| config.export_dir.clone());
            let path = match Collection::from(collection) {
                Collection::Machine => inventory.export_to_dir::<Machine>(&dir),
                Collection::Purchase => inventory.export_to_dir::<Purchase>(&dir),
            }
            .context("Export failed")?;
            println!("✓ Exported to {}", path.display());
        }
    }

    inventory.close().context("Failed to close database")?;
    Ok(())
}

/// The terminal UI owns the screen, so log lines would corrupt it
fn wants_logging(command: &Commands) -> bool {
    !matches!(command, Commands::Browse)
}

fn run_list(inventory: &Inventory, collection: Collection) -> Result<()> {
    println!("{}", collection.title());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let total = match collection {
        Collection::Machine => {
            let listing = inventory.list_with_total::<Machine>()?;
            for m in &listing.records {
                println!("{:>6}  {:<30} {:>8}", m.id, m.name, m.quantity);
            }
            listing.total_quantity
        }
        Collection::Purchase => {
            let listing = inventory.list_with_total::<Purchase>()?;
            for p in &listing.records {
                println!(
                    "{:>6}  {:<12} {:<24} {:>8} {:>10}",
                    p.id, p.date, p.product_name, p.quantity, p.cost
                );
            }
            listing.total_quantity
        }
    };

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total quantity: {}", total);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(inventory: &Inventory) -> Result<()> {
    use machine_inventory::ui;

    let machines = inventory.list_with_total::<Machine>()?;
    let purchases = inventory.list_with_total::<Purchase>()?;

    let mut app = ui::App::new(machines, purchases);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_inventory: &Inventory) -> Result<()> {
    anyhow::bail!("TUI mode not available; rebuild with `--features tui` or use `inventory list`")
}
