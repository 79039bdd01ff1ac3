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

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use calamine::DataType;
use parse_datetime::parse_datetime;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use serde_json::Value;
use std::collections::HashMap;

use super::typedef::*;
use crate::{
	error::Result,
	typedef::{CellValue, RawTable},
};

pub(crate) const SYNTHETIC_SEED: u64 = 42;

const NAIVE_FORMATS: [&str; 7] = [
	"%Y-%m-%d %H:%M:%S%.f",
	"%Y-%m-%dT%H:%M:%S%.f",
	"%Y-%m-%d %H:%M",
	"%Y-%m-%dT%H:%M",
	"%Y/%m/%d %H:%M:%S",
	"%m/%d/%Y %H:%M:%S",
	"%m/%d/%Y %H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Well-known layouts only. Offsets are folded into UTC and dropped.
pub(crate) fn parse_timestamp_strict(text: &str) -> Option<NaiveDateTime> {
	let text = text.trim();
	if text.is_empty() {
		return None;
	}

	if let Ok(found) = DateTime::parse_from_rfc3339(text) {
		return Some(found.naive_utc());
	}
	if let Ok(found) = DateTime::parse_from_rfc2822(text) {
		return Some(found.naive_utc());
	}
	if let Some(found) = OFFSET_FORMATS
		.iter()
		.find_map(|format| DateTime::parse_from_str(text, format).ok())
	{
		return Some(found.naive_utc());
	}
	if let Some(found) = NAIVE_FORMATS
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
	{
		return Some(found);
	}

	NaiveDate::parse_from_str(text, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Strict layouts first, then the permissive free-form parser. Bare numbers are never read as
/// dates.
pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
	if let Some(found) = parse_timestamp_strict(text) {
		return Some(found);
	}

	let text = text.trim();
	if text.is_empty() || text.parse::<f64>().is_ok() {
		return None;
	}

	parse_datetime(text).ok().map(|found| found.naive_utc())
}

pub(crate) fn parse_cell(cell: &str) -> CellValue {
	let trimmed = cell.trim();
	if trimmed.is_empty() {
		CellValue::Missing
	} else if let Ok(number_value) = trimmed.parse::<f64>() {
		if number_value.is_nan() {
			CellValue::Missing
		} else {
			CellValue::Number(number_value)
		}
	} else if let Ok(boolean_value) = trimmed.to_lowercase().parse::<bool>() {
		CellValue::Boolean(boolean_value)
	} else if let Some(datetime_value) = parse_timestamp_strict(trimmed) {
		CellValue::DateTime(datetime_value)
	} else {
		CellValue::String(cell.to_string())
	}
}

pub(super) fn spreadsheet_cell(cell: &calamine::Data) -> CellValue {
	match cell {
		calamine::Data::Empty => CellValue::Missing,
		calamine::Data::Bool(value) => CellValue::Boolean(*value),
		calamine::Data::Int(value) => CellValue::Number(*value as f64),
		calamine::Data::Float(value) => CellValue::Number(*value),
		calamine::Data::String(value) => parse_cell(value),
		other => match other.as_datetime() {
			Some(datetime_value) => CellValue::DateTime(datetime_value),
			None => parse_cell(&other.to_string()),
		},
	}
}

fn json_cell(value: &Value) -> CellValue {
	match value {
		Value::Null => CellValue::Missing,
		Value::Bool(flag) => CellValue::Boolean(*flag),
		Value::Number(number) => number
			.as_f64()
			.map(CellValue::Number)
			.unwrap_or(CellValue::Missing),
		Value::String(text) => parse_cell(text),
		other => CellValue::String(other.to_string()),
	}
}

/// Nested objects become dotted columns. A list of objects contributes its last entry, which
/// is the most recent revision in charging exports.
pub(super) fn flatten_value(prefix: &str, value: &Value, out: &mut Vec<(String, CellValue)>) {
	match value {
		Value::Object(map) => {
			for (key, each) in map {
				let column = if prefix.is_empty() {
					key.clone()
				} else {
					format!("{}.{}", prefix, key)
				};
				flatten_value(&column, each, out);
			}
		}
		Value::Array(items) if items.iter().any(Value::is_object) => {
			if let Some(last) = items.iter().rev().find(|each| each.is_object()) {
				flatten_value(prefix, last, out);
			}
		}
		other => out.push((prefix.to_string(), json_cell(other))),
	}
}

/// Union of every item's columns in first-seen order; absent keys read as missing.
pub(super) fn items_to_table(items: &[Value], meta: Option<&serde_json::Map<String, Value>>) -> RawTable {
	let mut columns = Vec::<String>::new();
	let mut lookup = HashMap::<String, usize>::new();
	let mut flattened_rows = Vec::<Vec<(String, CellValue)>>::with_capacity(items.len());

	for item in items.iter().filter(|each| each.is_object()) {
		let mut pairs = Vec::new();
		flatten_value("", item, &mut pairs);
		for (column, _) in &pairs {
			if !lookup.contains_key(column) {
				lookup.insert(column.clone(), columns.len());
				columns.push(column.clone());
			}
		}
		flattened_rows.push(pairs);
	}

	let meta_pairs = meta
		.map(|found| {
			found
				.iter()
				.map(|(key, value)| (format!("_meta.{}", key), json_cell(value)))
				.collect::<Vec<_>>()
		})
		.unwrap_or_default();
	for (column, _) in &meta_pairs {
		if !lookup.contains_key(column) {
			lookup.insert(column.clone(), columns.len());
			columns.push(column.clone());
		}
	}

	let rows = flattened_rows
		.into_iter()
		.map(|pairs| {
			let mut row = vec![CellValue::Missing; columns.len()];
			for (column, cell) in pairs.into_iter().chain(meta_pairs.iter().cloned()) {
				if let Some(index) = lookup.get(&column) {
					row[*index] = cell;
				}
			}
			row
		})
		.collect::<Vec<_>>();

	RawTable::new(columns, rows)
}

/// Every complete object of the `_items` array in a truncated export, stopping at the first
/// object that does not parse.
pub(super) fn complete_items(text: &str) -> Option<Vec<Value>> {
	let key = text.find("\"_items\"")?;
	let open = key + text[key..].find('[')? + 1;

	let mut items = Vec::new();
	let mut depth = 0usize;
	let mut start = None;
	let mut in_string = false;
	let mut escaped = false;

	for (offset, each) in text[open..].char_indices() {
		let position = open + offset;
		if in_string {
			match each {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'"' => in_string = false,
				_ => {}
			}
			continue;
		}

		match each {
			'"' => in_string = true,
			'{' => {
				if depth == 0 {
					start = Some(position);
				}
				depth += 1;
			}
			'}' if depth > 0 => {
				depth -= 1;
				if depth == 0 {
					let Some(begin) = start.take() else { continue };
					match serde_json::from_str::<Value>(&text[begin..=position]) {
						Ok(item) => items.push(item),
						Err(_) => break,
					}
				}
			}
			']' if depth == 0 => break,
			_ => {}
		}
	}

	Some(items)
}

pub fn count_missing(table: &RawTable) -> usize {
	(0..table.columns.len())
		.map(|column| table.column_cells(column).filter(|each| each.is_missing()).count())
		.sum()
}

/// Each missing cell takes the nearest preceding non-missing value of its column. Leading gaps
/// stay missing.
pub fn forward_fill(table: &mut RawTable) {
	let column_count = table.columns.len();
	let mut last_seen = vec![Option::<CellValue>::None; column_count];

	for row in table.rows.iter_mut() {
		if row.len() < column_count {
			row.resize(column_count, CellValue::Missing);
		}

		for (column, cell) in row.iter_mut().enumerate().take(column_count) {
			if cell.is_missing() {
				if let Some(previous) = &last_seen[column] {
					*cell = previous.clone();
				}
			} else {
				last_seen[column] = Some(cell.clone());
			}
		}
	}
}

pub(super) fn vote_column_types(table: &RawTable) -> Vec<(ColumnType, u64)> {
	(0..table.columns.len())
		.map(|column| {
			let counter = table
				.column_cells(column)
				.fold(ColumnCounter::default(), |mut counter, each| {
					match each {
						_ if each.is_missing() => counter.missing += 1,
						CellValue::String(_) => counter.string += 1,
						CellValue::Number(_) => counter.number += 1,
						CellValue::DateTime(_) => counter.datetime += 1,
						CellValue::Boolean(_) => counter.boolean += 1,
						CellValue::Missing => counter.missing += 1,
					}
					counter
				});

			// Pick the most occuring data type, ties go to the earlier one
			let winner = [
				(ColumnType::STRING, counter.string),
				(ColumnType::NUMBER, counter.number),
				(ColumnType::DATETIME, counter.datetime),
				(ColumnType::BOOLEAN, counter.boolean),
			]
			.into_iter()
			.fold((ColumnType::EMPTY, 0u64), |best, each| {
				if each.1 > best.1 {
					each
				} else {
					best
				}
			})
			.0;

			(winner, counter.missing)
		})
		.collect()
}

/// Hourly sessions shaped like a real charging export, used when no dataset exists yet.
pub(crate) fn synthetic_sessions(row_count: usize, seed: u64) -> Result<RawTable> {
	let mut rng = StdRng::seed_from_u64(seed);
	let energy_draw = LogNormal::new(1.5, 0.4)?;
	let start = NaiveDate::from_ymd_opt(2020, 1, 1)
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.unwrap_or_default();

	let columns = [
		"connectionTime",
		"disconnectTime",
		"kWhDelivered",
		"clusterID",
		"siteID",
		"sessionID",
		"spaceID",
		"stationID",
		"timezone",
		"userID",
		"WhPerMile",
		"kWhRequested",
		"milesRequested",
		"minutesAvailable",
		"paymentRequired",
	]
	.map(String::from)
	.to_vec();

	let rows = (0..row_count)
		.map(|index| {
			let connected = start + Duration::hours(index as i64);
			let energy: f64 = energy_draw.sample(&mut rng);
			let energy = (energy * 1000f64).round() / 1000f64;

			let mut row = vec![
				CellValue::DateTime(connected),
				CellValue::DateTime(connected + Duration::hours(2)),
				CellValue::Number(energy),
				CellValue::String(String::from("synthetic_cluster")),
				CellValue::String(String::from("synthetic")),
				CellValue::String(format!("sess-{}", index)),
				CellValue::String(String::from("synthetic_space")),
				CellValue::String(String::from("synthetic_station")),
				CellValue::String(String::from("UTC")),
			];
			row.resize(columns.len(), CellValue::Missing);
			row
		})
		.collect::<Vec<_>>();

	Ok(RawTable::new(columns, rows))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn timestamps_in_common_layouts() {
		let expected = NaiveDate::from_ymd_opt(2018, 4, 25)
			.unwrap()
			.and_hms_opt(11, 8, 4)
			.unwrap();

		assert_eq!(parse_timestamp("Wed, 25 Apr 2018 11:08:04 GMT"), Some(expected));
		assert_eq!(parse_timestamp("2018-04-25T11:08:04Z"), Some(expected));
		assert_eq!(parse_timestamp("2018-04-25 13:08:04+02:00"), Some(expected));
		assert_eq!(parse_timestamp("2018-04-25 11:08:04"), Some(expected));
		assert_eq!(parse_timestamp("not a date"), None);
		assert_eq!(parse_timestamp(""), None);
		assert_eq!(parse_timestamp("42"), None);
	}

	#[test]
	fn cells_are_typed() {
		assert_eq!(parse_cell(""), CellValue::Missing);
		assert_eq!(parse_cell("3.5"), CellValue::Number(3.5));
		assert_eq!(parse_cell("True"), CellValue::Boolean(true));
		assert!(matches!(parse_cell("2020-01-01 00:00:00"), CellValue::DateTime(_)));
		assert_eq!(parse_cell("site-a"), CellValue::String(String::from("site-a")));
	}

	#[test]
	fn nested_items_flatten_with_dots() {
		let items = vec![
			json!({
				"connectionTime": "2020-01-01 00:00:00",
				"kWhDelivered": 5.5,
				"userInputs": [
					{ "WhPerMile": 300, "paymentRequired": false },
					{ "WhPerMile": 250, "paymentRequired": true }
				]
			}),
			json!({ "connectionTime": "2020-01-01 01:00:00", "siteID": 2 }),
		];
		let meta = json!({ "site": "caltech" });
		let table = items_to_table(&items, meta.as_object());

		let names = table.columns.iter().map(|each| each.as_str()).collect::<Vec<_>>();
		assert_eq!(
			names,
			vec![
				"connectionTime",
				"kWhDelivered",
				"userInputs.WhPerMile",
				"userInputs.paymentRequired",
				"siteID",
				"_meta.site"
			]
		);
		assert_eq!(table.cell(0, 2), &CellValue::Number(250f64));
		assert_eq!(table.cell(0, 3), &CellValue::Boolean(true));
		assert_eq!(table.cell(1, 1), &CellValue::Missing);
		assert_eq!(table.cell(1, 5), &CellValue::String(String::from("caltech")));
	}

	#[test]
	fn truncated_export_keeps_complete_items() {
		let text = r#"{"_meta": {"n": 3}, "_items": [{"a": 1, "b": {"c": "}"}}, {"a": 2}, {"a": 3, "b": {"#;
		let items = complete_items(text).unwrap();
		assert_eq!(items, vec![json!({"a": 1, "b": {"c": "}"}}), json!({"a": 2})]);
		assert!(complete_items(r#"{"rows": []}"#).is_none());
	}

	#[test]
	fn forward_fill_propagates_last_value() {
		let mut table = RawTable::new(
			vec![String::from("a"), String::from("b")],
			vec![
				vec![CellValue::Missing, CellValue::Number(1f64)],
				vec![CellValue::Number(2f64), CellValue::Missing],
				vec![CellValue::Missing, CellValue::Missing],
			],
		);
		assert_eq!(count_missing(&table), 4);

		forward_fill(&mut table);
		assert_eq!(table.cell(0, 0), &CellValue::Missing);
		assert_eq!(table.cell(2, 0), &CellValue::Number(2f64));
		assert_eq!(table.cell(2, 1), &CellValue::Number(1f64));
		assert_eq!(count_missing(&table), 1);
	}

	#[test]
	fn synthetic_sessions_are_deterministic() {
		let first = synthetic_sessions(24, SYNTHETIC_SEED).unwrap();
		let second = synthetic_sessions(24, SYNTHETIC_SEED).unwrap();
		assert_eq!(first, second);
		assert_eq!(first.len(), 24);
		assert!(first
			.column_cells(2)
			.all(|each| each.as_number().is_some_and(|energy| energy > 0f64)));
	}

	#[test]
	fn column_types_follow_majority() {
		let table = RawTable::new(
			vec![String::from("n"), String::from("e")],
			vec![
				vec![CellValue::Number(1f64), CellValue::Missing],
				vec![CellValue::String(String::from("x")), CellValue::Missing],
				vec![CellValue::Number(3f64), CellValue::Missing],
			],
		);
		let voted = vote_column_types(&table);
		assert_eq!(voted[0], (ColumnType::NUMBER, 0));
		assert_eq!(voted[1], (ColumnType::EMPTY, 3));
	}
}
