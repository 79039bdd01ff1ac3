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

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc};
use tokio::sync::Semaphore;

use crate::data::typedef::SourceFormat;
use crate::error::CoreError;
use crate::evaluate::typedef::ForecastResult;

#[derive(Default, Serialize, Clone, Debug, PartialEq)]
pub struct ErrorInfo {
	pub title: Cow<'static, str>,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub series_length: Option<usize>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
	Missing,
	Boolean(bool),
	Number(f64),
	DateTime(NaiveDateTime),
	String(String),
}

impl Default for CellValue {
	fn default() -> Self {
		CellValue::Missing
	}
}

static MISSING_CELL: CellValue = CellValue::Missing;

impl CellValue {
	pub fn is_missing(&self) -> bool {
		match self {
			CellValue::Missing => true,
			CellValue::Number(value) => value.is_nan(),
			CellValue::String(text) => text.trim().is_empty(),
			_ => false,
		}
	}

	/// Numeric view of the cell; text is parsed, anything else is `None`.
	pub fn as_number(&self) -> Option<f64> {
		match self {
			CellValue::Number(value) if value.is_finite() => Some(*value),
			CellValue::Boolean(value) => Some(if *value { 1f64 } else { 0f64 }),
			CellValue::String(text) => text.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<String> {
		if self.is_missing() {
			return None;
		}
		Some(self.to_string())
	}

	pub fn is_truthy(&self) -> bool {
		match self {
			CellValue::Boolean(value) => *value,
			CellValue::Number(value) => *value != 0f64 && !value.is_nan(),
			CellValue::String(text) => matches!(
				text.trim().to_lowercase().as_str(),
				"true" | "t" | "yes" | "y" | "1" | "1.0"
			),
			_ => false,
		}
	}
}

impl std::fmt::Display for CellValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CellValue::Missing => Ok(()),
			CellValue::Boolean(value) => write!(f, "{}", value),
			// Whole numbers print without the trailing ".0" so ids like `2` still match
			CellValue::Number(value) if value.fract() == 0f64 && value.abs() < 1e15 => {
				write!(f, "{}", *value as i64)
			}
			CellValue::Number(value) => write!(f, "{}", value),
			CellValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
			CellValue::String(value) => write!(f, "{}", value),
		}
	}
}

/// Rows × named columns with no fixed schema, exactly as ingested.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct RawTable {
	pub columns: Vec<Arc<String>>,
	pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
	pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
		Self {
			columns: columns.into_iter().map(Arc::new).collect(),
			rows,
		}
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|each| each.as_str() == name)
	}

	/// Short rows read as missing instead of panicking.
	pub fn cell(&self, row: usize, column: usize) -> &CellValue {
		self.rows
			.get(row)
			.and_then(|found| found.get(column))
			.unwrap_or(&MISSING_CELL)
	}

	pub fn column_cells(&self, column: usize) -> impl Iterator<Item = &CellValue> + '_ {
		(0..self.rows.len()).map(move |row| self.cell(row, column))
	}
}

/// Serving-boundary state. Each request clones the `Arc` snapshots it needs and releases the
/// lock before doing any real work.
pub struct AppState {
	pub dataset: Option<Arc<RawTable>>,
	pub dataset_format: SourceFormat,
	pub last_forecast: Option<Arc<ForecastResult>>,
	pub fit_gate: Arc<Semaphore>,
}

impl Default for AppState {
	fn default() -> Self {
		Self {
			dataset: None,
			dataset_format: SourceFormat::default(),
			last_forecast: None,
			fit_gate: Arc::new(Semaphore::new(1)),
		}
	}
}

/// `{"ok": true, ...body}` or `{"ok": false, "title", "message"}` envelope handed to the
/// presentation layer.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum Reply<T: Serialize> {
	Success {
		ok: bool,
		#[serde(flatten)]
		body: T,
	},
	Failure {
		ok: bool,
		#[serde(flatten)]
		error: ErrorInfo,
	},
}

impl<T: Serialize> From<Result<T, CoreError>> for Reply<T> {
	fn from(result: Result<T, CoreError>) -> Self {
		match result {
			Ok(body) => Reply::Success { ok: true, body },
			Err(err) => Reply::Failure {
				ok: false,
				error: ErrorInfo::from(&err),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn whole_numbers_print_like_ids() {
		assert_eq!(CellValue::Number(2f64).to_string(), "2");
		assert_eq!(CellValue::Number(2.5f64).to_string(), "2.5");
		assert_eq!(CellValue::Missing.to_string(), "");
	}

	#[test]
	fn timestamps_keep_sub_second_precision() {
		let day = chrono::NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
		let precise = day.and_hms_milli_opt(1, 2, 3, 250).unwrap();
		assert_eq!(CellValue::DateTime(precise).to_string(), "2020-03-01 01:02:03.250");
		let whole = day.and_hms_opt(1, 2, 3).unwrap();
		assert_eq!(CellValue::DateTime(whole).to_string(), "2020-03-01 01:02:03");
	}

	#[test]
	fn truthiness_accepts_common_spellings() {
		assert!(CellValue::Boolean(true).is_truthy());
		assert!(CellValue::String(String::from("True")).is_truthy());
		assert!(CellValue::Number(1f64).is_truthy());
		assert!(!CellValue::String(String::from("False")).is_truthy());
		assert!(!CellValue::Missing.is_truthy());
	}

	#[test]
	fn short_rows_read_as_missing() {
		let table = RawTable::new(
			vec![String::from("a"), String::from("b")],
			vec![vec![CellValue::Number(1f64)]],
		);
		assert_eq!(table.cell(0, 1), &CellValue::Missing);
		assert_eq!(table.cell(5, 0), &CellValue::Missing);
	}

	#[test]
	fn failure_reply_serializes_with_ok_false() {
		let reply: Reply<serde_json::Value> = Err(CoreError::NoForecast).into();
		let json = serde_json::to_value(&reply).unwrap();
		assert_eq!(json["ok"], serde_json::json!(false));
		assert_eq!(json["message"], serde_json::json!("No forecast available yet."));
	}
}
