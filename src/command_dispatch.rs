//! Purpose: Hold top-level CLI command dispatch for `docshelf`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command goes through `api::Store`; no direct file access here.
//! Invariants: Output envelopes are stable JSON objects keyed by command.

use super::*;
use std::path::Path;

pub(super) fn dispatch_command(command: Command, store: &Store, dir: &Path) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "docshelf", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Insert { table, id, data } => {
            let location = table_location(dir, &table)?;
            let document = read_document(data)?;
            store.insert(&id, &document, &location)?;
            let path = store.record_path::<Document>(&id, &location)?;
            emit_json(json!({
                "table": table,
                "id": id,
                "path": path.display().to_string(),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Get { table, id } => {
            let location = table_location(dir, &table)?;
            let Some(document) = store.get::<Document>(&id, &location)? else {
                return Err(Error::new(ErrorKind::NotFound)
                    .with_message("record not found")
                    .with_id(id)
                    .with_path(store.table_path::<Document>(&location))
                    .with_hint(format!("List available ids with `docshelf ids {table}`.")));
            };
            emit_json(json!({ "Id": id, "Data": document.into_value() }));
            Ok(RunOutcome::ok())
        }
        Command::Ids { table } => {
            let location = table_location(dir, &table)?;
            let mut ids = store.select_ids::<Document>(&location)?;
            ids.sort();
            emit_json(json!({ "table": table, "ids": ids }));
            Ok(RunOutcome::ok())
        }
        Command::All { table, clauses } => {
            let location = table_location(dir, &table)?;
            let filter = parse_where_clauses(&clauses)?;
            let records = store.select_filter::<Document>(&filter, &location)?;
            let records: Map<String, Value> = records
                .into_iter()
                .map(|(id, document)| (id, document.into_value()))
                .collect();
            emit_json(json!({ "table": table, "records": records }));
            Ok(RunOutcome::ok())
        }
        Command::Delete { table, ids } => {
            let location = table_location(dir, &table)?;
            for id in &ids {
                store.delete::<Document>(id, &location)?;
            }
            emit_json(json!({ "table": table, "deleted": ids }));
            Ok(RunOutcome::ok())
        }
        Command::Count { table, clauses } => {
            let location = table_location(dir, &table)?;
            let filter = parse_where_clauses(&clauses)?;
            let count = store.count_filter::<Document>(&filter, &location)?;
            emit_json(json!({ "table": table, "count": count }));
            Ok(RunOutcome::ok())
        }
        Command::Sum {
            table,
            field,
            clauses,
        } => {
            let location = table_location(dir, &table)?;
            let filter = parse_where_clauses(&clauses)?;
            let sum = store.sum_filter::<Document>(&field, &filter, &location)?;
            emit_json(json!({ "table": table, "field": field, "sum": sum }));
            Ok(RunOutcome::ok())
        }
    }
}
