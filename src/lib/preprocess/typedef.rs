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

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use strum_macros::EnumIter;

use crate::error::CoreError;

#[derive(Default, PartialEq, Eq, EnumIter, Deserialize, Serialize, Clone, Copy, Debug, Hash)]
pub enum Frequency {
	#[default]
	#[serde(rename = "H", alias = "h")]
	HOURLY,
	#[serde(rename = "D", alias = "d")]
	DAILY,
}

impl Frequency {
	pub fn step(&self) -> Duration {
		match self {
			Frequency::HOURLY => Duration::hours(1),
			Frequency::DAILY => Duration::days(1),
		}
	}

	/// Start of the bucket holding `ts`.
	pub fn truncate(&self, ts: NaiveDateTime) -> NaiveDateTime {
		match self {
			Frequency::HOURLY => ts
				.date()
				.and_hms_opt(ts.hour(), 0, 0)
				.unwrap_or(ts),
			Frequency::DAILY => ts.date().and_hms_opt(0, 0, 0).unwrap_or(ts),
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Frequency::HOURLY => "Hourly",
			Frequency::DAILY => "Daily",
		}
	}
}

impl std::fmt::Display for Frequency {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Frequency::HOURLY => write!(f, "H"),
			Frequency::DAILY => write!(f, "D"),
		}
	}
}

impl std::str::FromStr for Frequency {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"h" | "hourly" => Ok(Frequency::HOURLY),
			"d" | "daily" => Ok(Frequency::DAILY),
			other => Err(CoreError::InvalidRequest(format!(
				"freq must be 'H' or 'D', got '{}'",
				other
			))),
		}
	}
}

#[derive(Default, PartialEq, Eq, EnumIter, Deserialize, Serialize, Clone, Copy, Debug, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
	#[default]
	ENERGY,
	SESSIONS,
}

impl std::fmt::Display for Metric {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Metric::ENERGY => write!(f, "energy"),
			Metric::SESSIONS => write!(f, "sessions"),
		}
	}
}

impl std::str::FromStr for Metric {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"energy" => Ok(Metric::ENERGY),
			"sessions" => Ok(Metric::SESSIONS),
			other => Err(CoreError::InvalidRequest(format!(
				"metric must be 'energy' or 'sessions', got '{}'",
				other
			))),
		}
	}
}

/// One column-name test. Tables of these are tried in order and the first hit wins.
#[derive(Clone, Copy, Debug)]
pub(crate) enum NamePattern {
	Exact(&'static str),
	/// Lowercased column name contains any of the hints.
	Contains(&'static [&'static str]),
}

#[derive(Default, Clone, Debug, PartialEq, Serialize)]
pub struct ColumnRoles {
	pub timestamp: Option<Arc<String>>,
	pub energy: Option<Arc<String>>,
	pub site: Option<Arc<String>>,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum Reduction {
	MEAN,
	SUM,
}

/// Optional per-session field carried into the buckets when the source has it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ExtraField {
	pub name: &'static str,
	pub source: &'static str,
	pub reduction: Reduction,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
	pub ts: NaiveDateTime,
	pub energy_kwh: f64,
	pub site: String,
	pub sessions: u64,
	/// Aligned with `NormalizedSessions::extra_names`.
	pub extras: Vec<Option<f64>>,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct NormalizedSessions {
	pub roles: ColumnRoles,
	pub extra_names: Vec<&'static str>,
	pub records: Vec<SessionRecord>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Bucket {
	pub ts: NaiveDateTime,
	pub energy_kwh: f64,
	pub sessions: u64,
	#[serde(flatten)]
	pub extras: BTreeMap<String, Option<f64>>,
}

impl Bucket {
	pub fn value(&self, metric: Metric) -> f64 {
		match metric {
			Metric::ENERGY => self.energy_kwh,
			Metric::SESSIONS => self.sessions as f64,
		}
	}
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AggregatedSeries {
	pub freq: Frequency,
	pub columns: Vec<String>,
	pub buckets: Vec<Bucket>,
}

impl AggregatedSeries {
	pub fn empty(freq: Frequency) -> Self {
		Self {
			freq,
			columns: vec![String::from("energy_kwh"), String::from("sessions")],
			buckets: Vec::new(),
		}
	}

	pub fn len(&self) -> usize {
		self.buckets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}

	pub fn values(&self, metric: Metric) -> Vec<f64> {
		self.buckets.iter().map(|each| each.value(metric)).collect()
	}
}

/// Plot-ready view with only the two headline columns.
#[derive(Serialize, Clone, Debug)]
pub struct SeriesPoint {
	pub ts: NaiveDateTime,
	pub energy_kwh: f64,
	pub sessions: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct SeriesView {
	pub freq: Frequency,
	pub site: String,
	pub series: Vec<SeriesPoint>,
}

#[derive(Serialize, Clone, Debug)]
pub struct CleanPreview {
	pub message: String,
	pub raw_rows: usize,
	pub buckets: usize,
	/// Per raw column, most nulls first.
	pub null_counts: serde_json::Map<String, serde_json::Value>,
	pub preview: Vec<Bucket>,
}
