/*
 * Project::Ampere, EV charging demand forecasting
 * Copyright (C) 2025 Athaariq A. Ramadhani <foss@athaariq.my.id>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use serde_json::Value;
use std::{
	borrow::Cow,
	io::{Read, Write},
	path::Path,
	sync::{Arc, Mutex},
};

use super::{helper::*, typedef::*};
use crate::{
	config::Settings,
	error::{CoreError, Result},
	typedef::{AppState, CellValue, RawTable},
};

pub fn read_csv<R: Read>(source: R) -> Result<RawTable> {
	let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);

	let columns = reader
		.headers()?
		.iter()
		.map(|each| each.trim().to_string())
		.collect::<Vec<_>>();

	let rows = reader
		.records()
		.map(|each| Ok(each?.iter().map(parse_cell).collect::<Vec<_>>()))
		.collect::<Result<Vec<_>>>()?;

	Ok(RawTable::new(columns, rows))
}

pub fn load_csv(path: &Path) -> Result<RawTable> {
	let file = std::fs::File::open(path)?;
	read_csv(file)
}

/// First sheet when `sheet` is `None`. The first row is the header.
pub fn load_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<RawTable> {
	use calamine::Reader;

	let mut workbook = calamine::open_workbook_auto(path)?;
	let sheet_name = match sheet {
		Some(name) => name.to_string(),
		None => workbook
			.sheet_names()
			.first()
			.cloned()
			.ok_or(CoreError::EmptyDataset(Cow::Borrowed("workbook has no sheet")))?,
	};

	let range = workbook.worksheet_range(&sheet_name)?;
	let mut rows = range.rows();
	let columns = rows
		.next()
		.map(|header| header.iter().map(|each| each.to_string().trim().to_string()).collect::<Vec<_>>())
		.unwrap_or_default();

	let rows = rows
		.map(|each| each.iter().map(spreadsheet_cell).collect::<Vec<_>>())
		.collect::<Vec<_>>();

	Ok(RawTable::new(columns, rows))
}

/// `{ "_meta": {...}, "_items": [...] }` export into a flat table.
pub fn parse_acn_json(payload: &Value) -> Result<RawTable> {
	let items = payload
		.get("_items")
		.and_then(Value::as_array)
		.ok_or(CoreError::EmptyDataset(Cow::Borrowed("No _items found in JSON payload.")))?;

	let table = items_to_table(items, payload.get("_meta").and_then(Value::as_object));
	if table.is_empty() {
		return Err(CoreError::EmptyDataset(Cow::Borrowed("No _items found in JSON payload.")));
	}

	Ok(table)
}

/// Salvages a truncated export. `_meta` is dropped because it cannot be trusted to be whole.
pub fn recover_partial_json(text: &str) -> Result<RawTable> {
	let items = complete_items(text)
		.ok_or(CoreError::Malformed(String::from("no _items array in JSON text")))?;
	if items.is_empty() {
		return Err(CoreError::EmptyDataset(Cow::Borrowed(
			"No complete item could be recovered from the JSON text.",
		)));
	}

	tracing::warn!(recovered = items.len(), "JSON text was truncated, kept complete items only");
	Ok(items_to_table(&items, None))
}

pub fn read_json_text(text: &str) -> Result<RawTable> {
	match serde_json::from_str::<Value>(text) {
		Ok(payload) => parse_acn_json(&payload),
		Err(err) if err.is_eof() => recover_partial_json(text),
		Err(err) => Err(err.into()),
	}
}

/// Picks a reader by file extension.
pub fn load_file(path: &Path, sheet: Option<&str>) -> Result<(RawTable, SourceFormat)> {
	let extension = path
		.extension()
		.and_then(|found| found.to_str())
		.map(|found| found.to_lowercase())
		.ok_or(CoreError::InvalidRequest(format!(
			"cannot determine the file type of \"{}\"",
			path.display()
		)))?;

	match extension.as_str() {
		"csv" => Ok((load_csv(path)?, SourceFormat::CSV)),
		"xlsx" | "xls" | "xlsb" | "ods" => Ok((load_spreadsheet(path, sheet)?, SourceFormat::SPREADSHEET)),
		"json" => {
			let text = std::fs::read_to_string(path)?;
			Ok((read_json_text(&text)?, SourceFormat::JSON))
		}
		_ => Err(CoreError::InvalidRequest(format!(
			"Cannot parse \"{}\" file extension",
			extension
		))),
	}
}

/// Replaces the working dataset wholesale.
pub fn ingest(
	state: &Mutex<AppState>,
	settings: &Settings,
	table: RawTable,
	format: SourceFormat,
) -> Result<IngestSummary> {
	let message = match format {
		SourceFormat::CSV | SourceFormat::SPREADSHEET => {
			if table.len() < settings.min_upload_rows {
				tracing::warn!(rows = table.len(), needed = settings.min_upload_rows, "upload rejected");
				return Err(CoreError::EmptyDataset(Cow::Borrowed("CSV seems too small.")));
			}
			format!("Loaded {} rows from {}", table.len(), format)
		}
		_ => {
			if table.is_empty() {
				return Err(CoreError::EmptyDataset(Cow::Borrowed("No _items found in JSON payload.")));
			}
			format!("Flattened {} items from {}", table.len(), format)
		}
	};

	let summary = IngestSummary {
		rows: table.len(),
		columns: table.columns.clone(),
		format,
		message,
	};

	let mut guarded_state = state.lock().map_err(|err| CoreError::State(err.to_string()))?;
	guarded_state.dataset = Some(Arc::new(table));
	guarded_state.dataset_format = format;
	drop(guarded_state);

	tracing::info!(rows = summary.rows, columns = summary.columns.len(), %format, "dataset ingested");
	Ok(summary)
}

pub fn ingest_file(
	state: &Mutex<AppState>,
	settings: &Settings,
	path: &Path,
	sheet: Option<&str>,
) -> Result<IngestSummary> {
	let (table, format) = load_file(path, sheet)?;
	ingest(state, settings, table, format)
}

/// Forward-filled file from disk, read and filled again in memory.
pub fn load_filled(path: &Path) -> Result<RawTable> {
	let mut table = load_csv(path)?;
	forward_fill(&mut table);
	Ok(table)
}

/// In-memory dataset, else the configured filled file, else synthetic sessions.
pub fn working_dataset(state: &Mutex<AppState>, settings: &Settings) -> Result<(Arc<RawTable>, SourceFormat)> {
	let guarded_state = state.lock().map_err(|err| CoreError::State(err.to_string()))?;
	if let Some(dataset) = &guarded_state.dataset {
		return Ok((dataset.clone(), guarded_state.dataset_format));
	}
	drop(guarded_state);

	if let Some(path) = settings.filled_dataset_path.as_deref().filter(|found| found.exists()) {
		match load_filled(path) {
			Ok(table) if !table.is_empty() => return Ok((Arc::new(table), SourceFormat::FILLED)),
			Ok(_) => tracing::warn!(path = %path.display(), "filled dataset is empty"),
			Err(err) => tracing::warn!(path = %path.display(), %err, "filled dataset unreadable"),
		}
	}

	tracing::debug!(rows = settings.synthetic_rows, "using synthetic sessions");
	Ok((
		Arc::new(synthetic_sessions(settings.synthetic_rows, SYNTHETIC_SEED)?),
		SourceFormat::SYNTHETIC,
	))
}

pub fn write_csv<W: Write>(table: &RawTable, sink: W) -> Result<()> {
	let mut writer = csv::Writer::from_writer(sink);
	writer.write_record(table.columns.iter().map(|each| each.as_str()))?;

	for row in 0..table.len() {
		writer.write_record((0..table.columns.len()).map(|column| table.cell(row, column).to_string()))?;
	}

	writer.flush()?;
	Ok(())
}

pub fn fill_missing_file(input: &Path, output: &Path) -> Result<FillReport> {
	let mut table = load_csv(input)?;
	let missing_before = count_missing(&table);
	forward_fill(&mut table);
	let missing_after = count_missing(&table);

	let file = std::fs::File::create(output)?;
	write_csv(&table, file)?;

	tracing::info!(missing_before, missing_after, output = %output.display(), "forward fill written");
	Ok(FillReport {
		rows: table.len(),
		columns: table.columns.len(),
		missing_before,
		missing_after,
	})
}

/// Flattens a nested JSON export to CSV without touching the working dataset.
pub fn flatten_json_file(input: &Path, output: &Path) -> Result<IngestSummary> {
	let text = std::fs::read_to_string(input)?;
	let table = read_json_text(&text)?;
	write_csv(&table, std::fs::File::create(output)?)?;
	tracing::info!(rows = table.len(), output = %output.display(), "flattened JSON written");
	Ok(IngestSummary {
		rows: table.len(),
		columns: table.columns.clone(),
		format: SourceFormat::JSON,
		message: format!("Flattened {} items to {}", table.len(), output.display()),
	})
}

fn cell_to_json(cell: &CellValue) -> Value {
	match cell {
		_ if cell.is_missing() => Value::Null,
		CellValue::Boolean(value) => Value::Bool(*value),
		CellValue::Number(value) => serde_json::Number::from_f64(*value)
			.map(Value::Number)
			.unwrap_or(Value::Null),
		CellValue::DateTime(_) | CellValue::String(_) => Value::String(cell.to_string()),
		CellValue::Missing => Value::Null,
	}
}

pub fn raw_preview(table: &RawTable, limit: usize, source: SourceFormat) -> RawPreview {
	let columns = table
		.columns
		.iter()
		.zip(vote_column_types(table))
		.map(|(name, (column_type, missing))| ColumnInfo {
			field: name.clone(),
			header_name: name.to_string(),
			column_type,
			missing: missing as usize,
		})
		.collect::<Vec<_>>();

	let preview = table
		.rows
		.iter()
		.take(limit)
		.enumerate()
		.map(|(row, _)| {
			table
				.columns
				.iter()
				.enumerate()
				.map(|(column, name)| (name.to_string(), cell_to_json(table.cell(row, column))))
				.collect::<serde_json::Map<_, _>>()
		})
		.collect::<Vec<_>>();

	RawPreview {
		total_rows: table.len(),
		columns,
		preview,
		source,
	}
}

pub fn preview_working_dataset(state: &Mutex<AppState>, settings: &Settings, limit: Option<usize>) -> Result<RawPreview> {
	let (table, source) = working_dataset(state, settings)?;
	Ok(raw_preview(&table, limit.unwrap_or(settings.raw_preview_limit), source))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn csv_text(rows: usize) -> String {
		let mut text = String::from("connectionTime,kWhDelivered,siteID\n");
		for index in 0..rows {
			text.push_str(&format!("2020-01-01 {:02}:15:00,{}.5,1\n", index % 24, index));
		}
		text
	}

	#[test]
	fn csv_cells_are_typed() {
		let table = read_csv(csv_text(3).as_bytes()).unwrap();
		assert_eq!(table.len(), 3);
		assert_eq!(table.columns[1].as_str(), "kWhDelivered");
		assert!(matches!(table.cell(0, 0), CellValue::DateTime(_)));
		assert_eq!(table.cell(2, 1), &CellValue::Number(2.5));
	}

	#[test]
	fn small_upload_is_rejected_and_keeps_previous_dataset() {
		let state = Mutex::new(AppState::default());
		let settings = Settings::default();

		let table = read_csv(csv_text(12).as_bytes()).unwrap();
		ingest(&state, &settings, table, SourceFormat::CSV).unwrap();

		let table = read_csv(csv_text(4).as_bytes()).unwrap();
		let err = ingest(&state, &settings, table, SourceFormat::CSV).unwrap_err();
		assert_eq!(err.to_string(), "CSV seems too small.");

		let (dataset, format) = working_dataset(&state, &settings).unwrap();
		assert_eq!(dataset.len(), 12);
		assert_eq!(format, SourceFormat::CSV);
	}

	#[test]
	fn json_without_items_is_input_absent() {
		let err = parse_acn_json(&json!({ "_meta": {} })).unwrap_err();
		assert!(matches!(err, CoreError::EmptyDataset(_)));
		let err = parse_acn_json(&json!({ "_items": [] })).unwrap_err();
		assert!(matches!(err, CoreError::EmptyDataset(_)));
	}

	#[test]
	fn truncated_json_text_is_recovered() {
		let text = r#"{"_items": [{"connectionTime": "2020-01-01 00:00:00", "kWhDelivered": 1}, {"connectionTime": "2020-01-0"#;
		let table = read_json_text(text).unwrap();
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn empty_workspace_falls_back_to_synthetic() {
		let state = Mutex::new(AppState::default());
		let settings = Settings {
			filled_dataset_path: Some(std::path::PathBuf::from("/nonexistent/ACN-data-filled.csv")),
			..Default::default()
		};

		let (dataset, format) = working_dataset(&state, &settings).unwrap();
		assert_eq!(format, SourceFormat::SYNTHETIC);
		assert_eq!(dataset.len(), 150);
	}

	#[test]
	fn preview_is_limited_and_typed() {
		let table = read_csv(csv_text(12).as_bytes()).unwrap();
		let preview = raw_preview(&table, 5, SourceFormat::CSV);
		assert_eq!(preview.total_rows, 12);
		assert_eq!(preview.preview.len(), 5);
		assert_eq!(preview.columns[0].column_type, ColumnType::DATETIME);
		assert_eq!(preview.columns[1].column_type, ColumnType::NUMBER);
		assert_eq!(preview.preview[0]["kWhDelivered"], json!(0.5));
	}

	#[test]
	fn written_csv_reads_back() {
		let table = read_csv(csv_text(3).as_bytes()).unwrap();
		let mut buffer = Vec::new();
		write_csv(&table, &mut buffer).unwrap();
		assert_eq!(read_csv(buffer.as_slice()).unwrap(), table);
	}
}
