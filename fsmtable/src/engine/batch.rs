//! Concurrent batch formatting.
//!
//! Parsing is CPU-bound, so each device output is parsed on the tokio
//! blocking pool. Results are put back into input order before merging, so
//! the merged tables are identical to [`Engine::format`]'s.

use std::sync::Arc;

use log::{debug, warn};
use tokio::task::JoinSet;

use super::{DeviceOutput, Engine, Formatted, Outcome};
use crate::error::Error;

/// Parse every output concurrently, then merge like [`Engine::format`].
pub async fn format_concurrent(engine: Arc<Engine>, outputs: Vec<DeviceOutput>) -> Formatted {
    let devices: Vec<String> = outputs.iter().map(|o| o.device.clone()).collect();
    let mut slots: Vec<Option<Outcome>> = Vec::new();
    slots.resize_with(outputs.len(), || None);

    let mut tasks = JoinSet::new();
    for (idx, output) in outputs.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        tasks.spawn_blocking(move || (idx, engine.outcome(output)));
    }
    debug!("Spawned {} parse tasks", devices.len());

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => warn!("Parse task failed: {}", e),
        }
    }

    engine.collate(gather(slots, devices))
}

/// Fill the slots of tasks that never reported back with `Aborted` failures.
fn gather(slots: Vec<Option<Outcome>>, devices: Vec<String>) -> Vec<Outcome> {
    slots
        .into_iter()
        .zip(devices)
        .map(|(slot, device)| {
            slot.unwrap_or_else(|| Outcome::Failed {
                error: Error::Aborted(device.clone()),
                device,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineBuilder;
    use crate::table::Cell;

    const INDEX: &str = "Template, Hostname, Command\nversion, .*, sh[[ow]] ve[[rsion]]\n";
    const TEMPLATE: &str = "\
Value Model (\\S+)
Value Version (\\S+)

Start
  ^Model: ${Model}
  ^Version: ${Version} -> Record
";

    fn engine() -> Arc<Engine> {
        Arc::new(
            EngineBuilder::new()
                .index(INDEX)
                .template("version", TEMPLATE)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let outputs: Vec<DeviceOutput> = (0..16)
            .map(|i| {
                DeviceOutput::new(
                    format!("r{i}"),
                    "show version",
                    format!("Model: mx{i}\nVersion: 21.{i}\n"),
                )
            })
            .collect();

        let engine = engine();
        let sequential = engine.format(outputs.clone());
        let concurrent = format_concurrent(engine, outputs).await;

        assert_eq!(concurrent.tables, sequential.tables);
        assert_eq!(concurrent.tables[0].len(), 16);
        assert_eq!(concurrent.tables[0].get(3, "Host"), Some(&Cell::from("r3")));
        assert_eq!(concurrent.tables[0].get(3, "Model"), Some(&Cell::from("mx3")));
    }

    #[tokio::test]
    async fn test_concurrent_raw_passthrough() {
        let formatted = format_concurrent(
            engine(),
            vec![
                DeviceOutput::new("r1", "show version", "Model: a\nVersion: 1\n"),
                DeviceOutput::new("r2", "show clock", "12:00:00 UTC"),
            ],
        )
        .await;
        assert_eq!(formatted.tables.len(), 1);
        assert_eq!(formatted.raw.len(), 1);
        assert_eq!(formatted.raw[0].device, "r2");
    }

    #[test]
    fn test_missing_task_reported_as_aborted() {
        let engine = engine();
        let parsed = engine.outcome(DeviceOutput::new("r1", "show version", "Model: a\nVersion: 1\n"));
        let outcomes = gather(vec![Some(parsed), None], vec!["r1".to_string(), "r2".to_string()]);

        let formatted = engine.collate(outcomes);
        assert_eq!(formatted.tables.len(), 1);
        assert_eq!(formatted.failures.len(), 1);
        assert_eq!(formatted.failures[0].0, "r2");
        assert!(matches!(formatted.failures[0].1, Error::Aborted(ref device) if device == "r2"));
    }

    #[tokio::test]
    async fn test_concurrent_empty_batch() {
        let formatted = format_concurrent(engine(), Vec::new()).await;
        assert!(formatted.tables.is_empty());
        assert!(formatted.is_complete());
    }
}
