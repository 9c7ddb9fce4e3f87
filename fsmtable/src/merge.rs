//! Table merge engine.
//!
//! Combines per-device tables produced for the same command. Tables with
//! identical column lists are concatenated under a leading `Host` column;
//! tables with a different column list start a separate result table rather
//! than being padded with empty columns.

use log::debug;

use crate::error::TableError;
use crate::table::{Cell, Column, Table};
use crate::template::ValueOptions;

/// Column prepended to merged tables, holding the source device name.
pub const HOST_COLUMN: &str = "Host";

/// Merge `(device, table)` pairs into one table per distinct column list.
///
/// Tables are grouped by their ordered column list across the whole batch,
/// so interleaved outputs with the same columns still land in one table.
/// This differs from consecutive grouping, where every change of columns
/// between neighbouring outputs starts a new table. Result tables appear in
/// order of first arrival; rows keep device-then-row arrival order.
///
/// A table that already has a `Host` column is rejected, since its own
/// column would shadow the device name.
pub fn merge<I, S>(tables: I) -> Result<Vec<Table>, TableError>
where
    I: IntoIterator<Item = (S, Table)>,
    S: AsRef<str>,
{
    let tables: Vec<(S, Table)> = tables.into_iter().collect();
    for (device, table) in &tables {
        check_mergeable(device.as_ref(), table)?;
    }
    Ok(merge_checked(tables))
}

/// Check that `table` can take the merged `Host` column.
pub fn check_mergeable(device: &str, table: &Table) -> Result<(), TableError> {
    if table.column_index(HOST_COLUMN).is_some() {
        return Err(TableError::DuplicateColumn {
            device: device.to_string(),
            column: HOST_COLUMN.to_string(),
        });
    }
    Ok(())
}

/// Merge tables already accepted by [`check_mergeable`].
pub(crate) fn merge_checked<I, S>(tables: I) -> Vec<Table>
where
    I: IntoIterator<Item = (S, Table)>,
    S: AsRef<str>,
{
    let mut groups: Vec<(Vec<String>, Table)> = Vec::new();

    for (device, table) in tables {
        let device = device.as_ref();
        let header: Vec<String> = table.header().into_iter().map(String::from).collect();

        let slot = match groups.iter().position(|(h, _)| *h == header) {
            Some(slot) => slot,
            None => {
                debug!("New result table for columns {:?} (first device '{}')", header, device);
                let mut columns = vec![Column::new(HOST_COLUMN, ValueOptions::KEY)];
                columns.extend(table.columns().iter().cloned());
                groups.push((header, Table::new(columns)));
                groups.len() - 1
            }
        };
        let merged = &mut groups[slot].1;

        for row in table.rows() {
            let mut cells = Vec::with_capacity(row.len() + 1);
            cells.push(Cell::from(device));
            cells.extend(row.iter().cloned());
            merged.push_row(cells);
        }
    }

    groups.into_iter().map(|(_, table)| table).collect()
}

/// Return `table` without its `Verbose` columns unless `verbose` is set.
pub fn project(table: &Table, verbose: bool) -> Table {
    table.project(verbose)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(
            columns
                .iter()
                .map(|c| Column::new(*c, ValueOptions::empty()))
                .collect(),
        );
        for row in rows {
            table.push_row(row.iter().map(|c| Cell::from(*c)).collect());
        }
        table
    }

    #[test]
    fn test_merge_identical_columns() {
        let merged = merge(vec![
            ("r1", table(&["ColA", "ColB"], &[&["a1", "b1"], &["a2", "b2"]])),
            ("r2", table(&["ColA", "ColB"], &[&["a3", "b3"]])),
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
        let result = &merged[0];
        assert_eq!(result.header(), vec!["Host", "ColA", "ColB"]);
        assert_eq!(result.len(), 3);
        let hosts: Vec<String> = result.column("Host").unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(hosts, vec!["r1", "r1", "r2"]);
        assert_eq!(result.get(2, "ColA"), Some(&Cell::from("a3")));
        assert_eq!(result.keys(), vec!["Host"]);
    }

    #[test]
    fn test_merge_splits_differing_columns() {
        let merged = merge(vec![
            ("r1".to_string(), table(&["ColA", "ColB"], &[&["a1", "b1"]])),
            ("r2".to_string(), table(&["ColA", "ColC"], &[&["a2", "c2"]])),
            ("r3".to_string(), table(&["ColA", "ColB"], &[&["a3", "b3"]])),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].header(), vec!["Host", "ColA", "ColB"]);
        assert_eq!(merged[0].len(), 2);
        assert_eq!(merged[1].header(), vec!["Host", "ColA", "ColC"]);
        assert_eq!(merged[1].len(), 1);
        assert_eq!(merged[1].get(0, "Host"), Some(&Cell::from("r2")));
    }

    #[test]
    fn test_merge_is_order_sensitive() {
        let merged = merge(vec![
            ("r1", table(&["ColA", "ColB"], &[&["a", "b"]])),
            ("r2", table(&["ColB", "ColA"], &[&["b", "a"]])),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_rejects_host_column() {
        let err = merge(vec![
            ("r1", table(&["ColA"], &[&["a"]])),
            ("r2", table(&["Host", "ColA"], &[&["a", "b"]])),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            TableError::DuplicateColumn { ref device, ref column } if device == "r2" && column == "Host"
        ));
        assert!(check_mergeable("r1", &table(&["ColA"], &[])).is_ok());
    }

    #[test]
    fn test_merge_keeps_verbose_metadata() {
        let mut verbose = Table::new(vec![
            Column::new("Name", ValueOptions::empty()),
            Column::new("Detail", ValueOptions::VERBOSE),
        ]);
        verbose.push_row(vec!["x".into(), "more".into()]);

        let merged = merge(vec![("r1", verbose)]).unwrap();
        let projected = project(&merged[0], false);
        assert_eq!(projected.header(), vec!["Host", "Name"]);
        assert_eq!(project(&merged[0], true), merged[0]);
    }
}
