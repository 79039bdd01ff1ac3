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
use std::sync::Arc;

use super::typedef::*;
use crate::{data::helper::parse_timestamp, typedef::CellValue};

pub(crate) const TIMESTAMP_PATTERNS: [NamePattern; 6] = [
	NamePattern::Exact("connectionTime"),
	NamePattern::Exact("timestamp"),
	NamePattern::Exact("ts"),
	NamePattern::Exact("start"),
	NamePattern::Exact("date"),
	NamePattern::Contains(&["time", "date"]),
];

pub(crate) const ENERGY_PATTERNS: [NamePattern; 5] = [
	NamePattern::Exact("energy_kwh"),
	NamePattern::Exact("kWhDelivered"),
	NamePattern::Exact("kwh"),
	NamePattern::Exact("energy"),
	NamePattern::Contains(&["kwh", "energy", "wh"]),
];

pub(crate) const SITE_PATTERNS: [NamePattern; 5] = [
	NamePattern::Exact("site"),
	NamePattern::Exact("siteID"),
	NamePattern::Exact("clusterID"),
	NamePattern::Exact("stationID"),
	NamePattern::Contains(&["site", "station", "location"]),
];

pub(crate) const EXTRA_FIELDS: [ExtraField; 6] = [
	ExtraField {
		name: "WhPerMile",
		source: "WhPerMile",
		reduction: Reduction::MEAN,
	},
	ExtraField {
		name: "kWhRequested",
		source: "kWhRequested",
		reduction: Reduction::MEAN,
	},
	ExtraField {
		name: "milesRequested",
		source: "milesRequested",
		reduction: Reduction::MEAN,
	},
	ExtraField {
		name: "minutesAvailable",
		source: "minutesAvailable",
		reduction: Reduction::MEAN,
	},
	ExtraField {
		name: "paid_sessions",
		source: "paymentRequired",
		reduction: Reduction::SUM,
	},
	ExtraField {
		name: "identified_users",
		source: "userID",
		reduction: Reduction::SUM,
	},
];

pub(crate) const DEFAULT_SITE: &str = "default";

fn last_segment(column: &str) -> &str {
	column.rsplit('.').next().unwrap_or(column)
}

/// Columns describing the request rather than the delivered energy.
fn is_auxiliary(column: &str) -> bool {
	EXTRA_FIELDS
		.iter()
		.filter(|each| each.reduction == Reduction::MEAN)
		.any(|each| last_segment(column) == each.source)
}

pub(crate) fn match_column(columns: &[Arc<String>], patterns: &[NamePattern], skip_auxiliary: bool) -> Option<Arc<String>> {
	patterns.iter().find_map(|pattern| match pattern {
		NamePattern::Exact(name) => columns.iter().find(|each| each.as_str() == *name).cloned(),
		NamePattern::Contains(hints) => columns
			.iter()
			.filter(|each| !(skip_auxiliary && is_auxiliary(each)))
			.find(|each| {
				let lowered = each.to_lowercase();
				hints.iter().any(|hint| lowered.contains(hint))
			})
			.cloned(),
	})
}

/// Watt-hour named columns are scaled down to kWh.
pub(crate) fn energy_scale(column: &str) -> f64 {
	let lowered = column.to_lowercase();
	if lowered.contains("wh") && !lowered.contains("kwh") {
		1000f64
	} else {
		1f64
	}
}

/// Exact name first, then a flattened column ending in `.name`.
pub(crate) fn find_extra_column(columns: &[Arc<String>], source: &str) -> Option<usize> {
	columns
		.iter()
		.position(|each| each.as_str() == source)
		.or_else(|| columns.iter().position(|each| last_segment(each) == source))
}

pub(crate) fn coerce_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
	match cell {
		CellValue::DateTime(found) => Some(*found),
		CellValue::String(text) => parse_timestamp(text),
		_ => None,
	}
}

pub(crate) fn coerce_extra(cell: &CellValue, field: &ExtraField) -> Option<f64> {
	match field.source {
		"paymentRequired" => Some(if cell.is_truthy() { 1f64 } else { 0f64 }),
		"userID" => Some(if cell.is_missing() { 0f64 } else { 1f64 }),
		_ => match cell {
			CellValue::Boolean(_) => None,
			other => other.as_number(),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(columns: &[&str]) -> Vec<Arc<String>> {
		columns.iter().map(|each| Arc::new(each.to_string())).collect()
	}

	#[test]
	fn exact_names_beat_substring_hints() {
		let columns = names(&["doneChargingTime", "connectionTime", "kWhDelivered", "siteID"]);
		assert_eq!(
			match_column(&columns, &TIMESTAMP_PATTERNS, false).as_deref().map(String::as_str),
			Some("connectionTime")
		);
		assert_eq!(
			match_column(&columns, &SITE_PATTERNS, false).as_deref().map(String::as_str),
			Some("siteID")
		);
	}

	#[test]
	fn energy_hint_skips_request_columns() {
		let columns = names(&["userInputs.WhPerMile", "userInputs.kWhRequested", "meter_wh"]);
		assert_eq!(
			match_column(&columns, &ENERGY_PATTERNS, true).as_deref().map(String::as_str),
			Some("meter_wh")
		);
		assert_eq!(energy_scale("meter_wh"), 1000f64);
		assert_eq!(energy_scale("kWhDelivered"), 1f64);
	}

	#[test]
	fn nothing_matches_without_hints() {
		let columns = names(&["a", "b"]);
		assert!(match_column(&columns, &TIMESTAMP_PATTERNS, false).is_none());
	}

	#[test]
	fn flattened_extra_columns_are_found() {
		let columns = names(&["connectionTime", "userInputs.milesRequested"]);
		assert_eq!(find_extra_column(&columns, "milesRequested"), Some(1));
		assert_eq!(find_extra_column(&columns, "WhPerMile"), None);
	}

	#[test]
	fn indicators_count_presence() {
		let paid = EXTRA_FIELDS[4];
		let user = EXTRA_FIELDS[5];
		assert_eq!(coerce_extra(&CellValue::Boolean(true), &paid), Some(1f64));
		assert_eq!(coerce_extra(&CellValue::Missing, &paid), Some(0f64));
		assert_eq!(coerce_extra(&CellValue::String(String::from("u1")), &user), Some(1f64));
		assert_eq!(coerce_extra(&CellValue::Missing, &user), Some(0f64));
		assert_eq!(coerce_extra(&CellValue::String(String::from("n/a")), &EXTRA_FIELDS[0]), None);
	}
}
