// Machine Inventory - Core Library
// Exposes all modules for use in CLI, web server, and tests

pub mod config;
pub mod csv_io;
pub mod db;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod uploads;

#[cfg(feature = "tui")]
pub mod ui;

#[cfg(feature = "server")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use csv_io::{export_string, read_rows, write_csv};
pub use db::{setup_database, Store};
pub use error::{InventoryError, Result};
pub use inventory::{Inventory, Listing};
pub use models::{Collection, Machine, MachineFields, Purchase, PurchaseFields, Record};
pub use uploads::{UploadArea, UploadGuard};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
