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

use serde::Serialize;
use std::sync::Arc;

#[derive(Default, PartialEq, Eq, Serialize, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
	CSV,
	SPREADSHEET,
	JSON,
	FILLED,
	#[default]
	SYNTHETIC,
}

impl std::fmt::Display for SourceFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SourceFormat::CSV => write!(f, "csv"),
			SourceFormat::SPREADSHEET => write!(f, "spreadsheet"),
			SourceFormat::JSON => write!(f, "json"),
			SourceFormat::FILLED => write!(f, "filled"),
			SourceFormat::SYNTHETIC => write!(f, "synthetic"),
		}
	}
}

#[derive(Default, PartialEq, Eq, Serialize, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
	#[default]
	STRING,
	NUMBER,
	#[serde(rename = "dateTime")]
	DATETIME,
	BOOLEAN,
	EMPTY,
}

#[derive(Default, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
	pub field: Arc<String>,
	pub header_name: String,
	#[serde(rename = "type")]
	pub column_type: ColumnType,
	pub missing: usize,
}

#[derive(Default, Clone, Copy)]
pub(super) struct ColumnCounter {
	pub string: u64,
	pub number: u64,
	pub datetime: u64,
	pub boolean: u64,
	pub missing: u64,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct IngestSummary {
	pub rows: usize,
	pub columns: Vec<Arc<String>>,
	pub format: SourceFormat,
	pub message: String,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct RawPreview {
	pub total_rows: usize,
	pub columns: Vec<ColumnInfo>,
	pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
	pub source: SourceFormat,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FillReport {
	pub rows: usize,
	pub columns: usize,
	pub missing_before: usize,
	pub missing_after: usize,
}
