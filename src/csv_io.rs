// CSV Interchange - collection <-> CSV document
// Export writes `id` plus the record columns; import ignores `id` and yields new-record fields.

use crate::error::{InventoryError, Result};
use crate::models::Record;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::io::{self, Read, Write};

// ============================================================================
// EXPORT
// ============================================================================

/// Write the header row and one row per record.
///
/// The header is always written, so an empty collection still yields a
/// valid document.
pub fn write_csv<R: Record, W: Write>(records: &[R], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(R::csv_header())?;
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_string<R: Record>(records: &[R]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).map_err(|e| InventoryError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

// ============================================================================
// IMPORT
// ============================================================================

fn row_error(err: &csv::Error) -> InventoryError {
    let line = err.position().map(|p| p.line()).unwrap_or(1);
    let message = match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        _ => err.to_string(),
    };
    InventoryError::malformed(line, message)
}

fn check_header<R: Record>(headers: &StringRecord) -> Result<()> {
    for column in R::COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(InventoryError::malformed(
                1,
                format!("missing required column '{}'", column),
            ));
        }
    }
    Ok(())
}

/// Read new-record fields from a CSV document, one row at a time.
///
/// The header is checked up front. Each yielded row is either validated
/// fields or a `MalformedRow` naming its line; an `id` column and any
/// unknown columns are ignored. A document without a header yields nothing.
pub fn read_rows<R: Record, Rd: Read>(
    reader: Rd,
) -> Result<impl Iterator<Item = Result<R::Fields>>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr.headers().map_err(|e| row_error(&e))?.clone();
    if !headers.is_empty() {
        check_header::<R>(&headers)?;
    }

    Ok(rdr.into_records().map(move |result| {
        let record = result.map_err(|e| row_error(&e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let fields: R::Fields = record
            .deserialize(Some(&headers))
            .map_err(|e| row_error(&e))?;
        R::validate(&fields).map_err(|e| InventoryError::malformed(line, e.to_string()))?;

        Ok(fields)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, MachineFields, Purchase, PurchaseFields};

    fn machine(id: i64, name: &str, quantity: u32) -> Machine {
        Machine {
            id,
            name: name.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_export_empty_has_header_only() {
        let doc = export_string::<Machine>(&[]).unwrap();
        assert_eq!(doc, "id,name,quantity\n");
    }

    #[test]
    fn test_export_rows_in_order() {
        let doc = export_string(&[machine(1, "Drill", 5), machine(2, "Saw", 3)]).unwrap();
        assert_eq!(doc, "id,name,quantity\n1,Drill,5\n2,Saw,3\n");
    }

    #[test]
    fn test_export_quotes_delimiters() {
        let doc = export_string(&[machine(1, "Drill, cordless", 2)]).unwrap();
        assert_eq!(doc, "id,name,quantity\n1,\"Drill, cordless\",2\n");
    }

    #[test]
    fn test_export_purchase_header() {
        let purchase = Purchase {
            id: 3,
            date: "2024-02-01".to_string(),
            product_name: "Lathe".to_string(),
            quantity: 1,
            cost: 1200,
        };
        let doc = export_string(&[purchase]).unwrap();
        assert_eq!(doc, "id,date,product_name,quantity,cost\n3,2024-02-01,Lathe,1,1200\n");
    }

    #[test]
    fn test_read_rows_ignores_id_column() {
        let doc = "id,name,quantity\n17,Bolt,100\n18,Nut,200\n";
        let rows: Vec<MachineFields> = read_rows::<Machine, _>(doc.as_bytes())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            rows,
            vec![MachineFields::new("Bolt", 100), MachineFields::new("Nut", 200)]
        );
    }

    #[test]
    fn test_read_rows_non_numeric_quantity() {
        let doc = "name,quantity\nBolt,100\nNut,lots\n";
        let rows: Vec<Result<MachineFields>> =
            read_rows::<Machine, _>(doc.as_bytes()).unwrap().collect();

        assert!(rows[0].is_ok());
        match &rows[1] {
            Err(InventoryError::MalformedRow { line, .. }) => assert_eq!(*line, 3),
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_read_rows_empty_quantity_not_zero() {
        let doc = "name,quantity\nBolt,\n";
        let first = read_rows::<Machine, _>(doc.as_bytes()).unwrap().next().unwrap();
        assert!(matches!(first, Err(InventoryError::MalformedRow { .. })));
    }

    #[test]
    fn test_read_rows_negative_quantity() {
        let doc = "name,quantity\nBolt,-4\n";
        let first = read_rows::<Machine, _>(doc.as_bytes()).unwrap().next().unwrap();
        assert!(matches!(first, Err(InventoryError::MalformedRow { line: 2, .. })));
    }

    #[test]
    fn test_read_rows_missing_column() {
        let doc = "name\nBolt\n";
        let err = read_rows::<Machine, _>(doc.as_bytes()).err().unwrap();
        match err {
            InventoryError::MalformedRow { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("quantity"));
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_read_rows_short_row() {
        let doc = "name,quantity\nBolt\n";
        let first = read_rows::<Machine, _>(doc.as_bytes()).unwrap().next().unwrap();
        assert!(matches!(first, Err(InventoryError::MalformedRow { line: 2, .. })));
    }

    #[test]
    fn test_read_rows_blank_name() {
        let doc = "name,quantity\n  ,4\n";
        let first = read_rows::<Machine, _>(doc.as_bytes()).unwrap().next().unwrap();
        assert!(matches!(first, Err(InventoryError::MalformedRow { line: 2, .. })));
    }

    #[test]
    fn test_read_rows_trims_whitespace() {
        let doc = "name , quantity\n Bolt , 100 \n";
        let rows: Vec<MachineFields> = read_rows::<Machine, _>(doc.as_bytes())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![MachineFields::new("Bolt", 100)]);
    }

    #[test]
    fn test_read_rows_empty_document() {
        let rows: Vec<_> = read_rows::<Machine, _>("".as_bytes()).unwrap().collect();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_read_purchase_rows() {
        let doc = "date,product_name,quantity,cost\n2024-01-05,Drill,2,300\n";
        let rows: Vec<PurchaseFields> = read_rows::<Purchase, _>(doc.as_bytes())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![PurchaseFields::new("2024-01-05", "Drill", 2, 300)]);
    }

    #[test]
    fn test_read_purchase_non_numeric_cost() {
        let doc = "date,product_name,quantity,cost\n2024-01-05,Drill,2,$300\n";
        let first = read_rows::<Purchase, _>(doc.as_bytes()).unwrap().next().unwrap();
        assert!(matches!(first, Err(InventoryError::MalformedRow { line: 2, .. })));
    }
}
