// Entity models - Machine and Purchase
// Each entity is bound to its SQLite table and CSV layout through `Record`

use crate::error::{InventoryError, Result};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// ============================================================================
// COLLECTION
// ============================================================================

/// The two independent record sets kept by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    Machine,
    Purchase,
}

impl Collection {
    /// SQLite table name
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Machine => "machine",
            Collection::Purchase => "purchase",
        }
    }

    /// Human-readable name for display
    pub fn title(&self) -> &'static str {
        match self {
            Collection::Machine => "Machines",
            Collection::Purchase => "Purchases",
        }
    }

    /// Prefix used for exported file names
    pub fn file_stem(&self) -> &'static str {
        match self {
            Collection::Machine => "machines",
            Collection::Purchase => "purchases",
        }
    }
}

// ============================================================================
// RECORD TRAIT
// ============================================================================

/// A persisted entity.
///
/// `Fields` is everything the caller supplies (the record minus its id). The
/// store reads rows as `id` followed by [`Record::COLUMNS`] in order, and the
/// CSV header is the same list with `id` first.
pub trait Record: Sized + Clone + Debug + Serialize {
    type Fields: Clone + Debug + Serialize + DeserializeOwned;

    const COLLECTION: Collection;

    /// Data columns, excluding `id`
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> i64;

    fn quantity(&self) -> u32;

    fn fields(&self) -> Self::Fields;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// SQL values for `COLUMNS`, in order
    fn to_values(fields: &Self::Fields) -> Vec<Value>;

    fn validate(fields: &Self::Fields) -> Result<()>;

    fn csv_header() -> Vec<&'static str> {
        let mut header = vec!["id"];
        header.extend_from_slice(Self::COLUMNS);
        header
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(InventoryError::validation(field, "must not be empty"));
    }
    Ok(())
}

// ============================================================================
// MACHINE
// ============================================================================

/// An equipment unit and how many of it are on hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineFields {
    pub name: String,
    pub quantity: u32,
}

impl MachineFields {
    pub fn new(name: &str, quantity: u32) -> Self {
        MachineFields {
            name: name.to_string(),
            quantity,
        }
    }
}

impl Record for Machine {
    type Fields = MachineFields;

    const COLLECTION: Collection = Collection::Machine;
    const COLUMNS: &'static [&'static str] = &["name", "quantity"];

    fn id(&self) -> i64 {
        self.id
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn fields(&self) -> MachineFields {
        MachineFields {
            name: self.name.clone(),
            quantity: self.quantity,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Machine {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
        })
    }

    fn to_values(fields: &MachineFields) -> Vec<Value> {
        vec![
            Value::Text(fields.name.trim().to_string()),
            Value::Integer(i64::from(fields.quantity)),
        ]
    }

    fn validate(fields: &MachineFields) -> Result<()> {
        require_text("name", &fields.name)
    }
}

// ============================================================================
// PURCHASE
// ============================================================================

/// A purchase of some product; not linked to any machine record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    /// Free text, the format is whatever the caller typed
    pub date: String,
    pub product_name: String,
    pub quantity: u32,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseFields {
    pub date: String,
    pub product_name: String,
    pub quantity: u32,
    pub cost: u32,
}

impl PurchaseFields {
    pub fn new(date: &str, product_name: &str, quantity: u32, cost: u32) -> Self {
        PurchaseFields {
            date: date.to_string(),
            product_name: product_name.to_string(),
            quantity,
            cost,
        }
    }
}

impl Record for Purchase {
    type Fields = PurchaseFields;

    const COLLECTION: Collection = Collection::Purchase;
    const COLUMNS: &'static [&'static str] = &["date", "product_name", "quantity", "cost"];

    fn id(&self) -> i64 {
        self.id
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn fields(&self) -> PurchaseFields {
        PurchaseFields {
            date: self.date.clone(),
            product_name: self.product_name.clone(),
            quantity: self.quantity,
            cost: self.cost,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Purchase {
            id: row.get(0)?,
            date: row.get(1)?,
            product_name: row.get(2)?,
            quantity: row.get(3)?,
            cost: row.get(4)?,
        })
    }

    fn to_values(fields: &PurchaseFields) -> Vec<Value> {
        vec![
            Value::Text(fields.date.trim().to_string()),
            Value::Text(fields.product_name.trim().to_string()),
            Value::Integer(i64::from(fields.quantity)),
            Value::Integer(i64::from(fields.cost)),
        ]
    }

    fn validate(fields: &PurchaseFields) -> Result<()> {
        require_text("product_name", &fields.product_name)
    }
}
