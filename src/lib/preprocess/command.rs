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
use std::{
	borrow::Cow,
	collections::BTreeMap,
	sync::Mutex,
};

use super::{helper::*, typedef::*};
use crate::{
	config::Settings,
	data::{command::working_dataset, helper::count_missing},
	error::{CoreError, Result},
	typedef::{AppState, RawTable},
};

pub fn detect_columns(table: &RawTable) -> ColumnRoles {
	ColumnRoles {
		timestamp: match_column(&table.columns, &TIMESTAMP_PATTERNS, false),
		energy: match_column(&table.columns, &ENERGY_PATTERNS, true),
		site: match_column(&table.columns, &SITE_PATTERNS, false),
	}
}

/// Canonical per-session records. Rows without a usable timestamp are dropped.
pub fn normalize(table: &RawTable, site: Option<&str>) -> NormalizedSessions {
	let roles = detect_columns(table);
	let Some(timestamp_index) = roles
		.timestamp
		.as_ref()
		.and_then(|name| table.column_index(name))
	else {
		return NormalizedSessions {
			roles,
			..Default::default()
		};
	};

	let energy = roles.energy.as_ref().and_then(|name| {
		table
			.column_index(name)
			.map(|index| (index, energy_scale(name)))
	});
	let site_index = roles.site.as_ref().and_then(|name| table.column_index(name));
	if site.is_some() && site_index.is_none() {
		tracing::warn!(?site, "no site column detected, site filter ignored");
	}

	let extras = EXTRA_FIELDS
		.iter()
		.filter_map(|field| find_extra_column(&table.columns, field.source).map(|index| (field, index)))
		.collect::<Vec<_>>();

	let records = (0..table.len())
		.filter_map(|row| {
			let ts = coerce_timestamp(table.cell(row, timestamp_index))?;

			let site_value = site_index
				.and_then(|index| table.cell(row, index).as_text())
				.unwrap_or_else(|| String::from(DEFAULT_SITE));
			if let (Some(wanted), Some(_)) = (site, site_index) {
				if site_value != wanted {
					return None;
				}
			}

			let energy_kwh = energy
				.and_then(|(index, scale)| table.cell(row, index).as_number().map(|value| value / scale))
				.unwrap_or(0f64);

			Some(SessionRecord {
				ts,
				energy_kwh,
				site: site_value,
				sessions: 1,
				extras: extras
					.iter()
					.map(|(field, index)| coerce_extra(table.cell(row, *index), field))
					.collect(),
			})
		})
		.collect::<Vec<_>>();

	tracing::debug!(
		rows = table.len(),
		kept = records.len(),
		timestamp = ?roles.timestamp,
		energy = ?roles.energy,
		site = ?roles.site,
		"sessions normalized"
	);

	NormalizedSessions {
		roles,
		extra_names: extras.iter().map(|(field, _)| field.name).collect(),
		records,
	}
}

#[derive(Default)]
struct Accumulator {
	energy_kwh: f64,
	sessions: u64,
	extra_sums: Vec<f64>,
	extra_counts: Vec<usize>,
}

pub fn aggregate_sessions(sessions: &NormalizedSessions, freq: Frequency) -> AggregatedSeries {
	if sessions.records.is_empty() {
		return AggregatedSeries::empty(freq);
	}

	let reductions = sessions
		.extra_names
		.iter()
		.map(|name| {
			EXTRA_FIELDS
				.iter()
				.find(|field| field.name == *name)
				.map(|field| field.reduction)
				.unwrap_or(Reduction::MEAN)
		})
		.collect::<Vec<_>>();
	let extra_count = reductions.len();

	let mut groups = BTreeMap::<NaiveDateTime, Accumulator>::new();
	for record in &sessions.records {
		let group = groups.entry(freq.truncate(record.ts)).or_insert_with(|| Accumulator {
			extra_sums: vec![0f64; extra_count],
			extra_counts: vec![0; extra_count],
			..Default::default()
		});

		group.energy_kwh += record.energy_kwh;
		group.sessions += record.sessions;
		for (index, value) in record.extras.iter().enumerate() {
			if let Some(found) = value {
				group.extra_sums[index] += found;
				group.extra_counts[index] += 1;
			}
		}
	}

	let buckets = groups
		.into_iter()
		.map(|(ts, group)| {
			let extras = sessions
				.extra_names
				.iter()
				.enumerate()
				.map(|(index, name)| {
					let value = match (reductions[index], group.extra_counts[index]) {
						(Reduction::SUM, _) => Some(group.extra_sums[index]),
						(Reduction::MEAN, 0) => None,
						(Reduction::MEAN, count) => Some(group.extra_sums[index] / count as f64),
					};
					(name.to_string(), value)
				})
				.collect::<BTreeMap<_, _>>();

			Bucket {
				ts,
				energy_kwh: group.energy_kwh,
				sessions: group.sessions,
				extras,
			}
		})
		.collect::<Vec<_>>();

	let mut columns = vec![String::from("energy_kwh"), String::from("sessions")];
	columns.extend(sessions.extra_names.iter().map(|each| each.to_string()));

	AggregatedSeries { freq, columns, buckets }
}

/// Buckets of `freq` width, empty ones left out.
pub fn aggregate(table: &RawTable, site: Option<&str>, freq: Frequency) -> AggregatedSeries {
	let series = aggregate_sessions(&normalize(table, site), freq);
	tracing::debug!(buckets = series.len(), %freq, "sessions aggregated");
	series
}

/// Aggregation of the working dataset, or why there is nothing to model.
pub fn aggregate_working(
	state: &Mutex<AppState>,
	settings: &Settings,
	site: Option<&str>,
	freq: Frequency,
) -> Result<AggregatedSeries> {
	let (table, _) = working_dataset(state, settings)?;
	let series = aggregate(&table, site, freq);
	if series.is_empty() {
		if detect_columns(&table).timestamp.is_none() {
			return Err(CoreError::MissingColumn { role: "timestamp" });
		}
		return Err(CoreError::EmptyDataset(Cow::Borrowed("No aggregated data available.")));
	}
	Ok(series)
}

/// One metric on the complete regular grid between the first and last bucket. Absent buckets
/// had no sessions, so they read as zero.
pub fn fill_gaps(series: &AggregatedSeries, metric: Metric) -> (Vec<NaiveDateTime>, Vec<f64>) {
	let (Some(first), Some(last)) = (series.buckets.first(), series.buckets.last()) else {
		return (Vec::new(), Vec::new());
	};

	let step = series.freq.step();
	let mut timestamps = Vec::new();
	let mut values = Vec::new();
	let mut present = series.buckets.iter().peekable();

	let mut cursor = first.ts;
	while cursor <= last.ts {
		let value = match present.peek() {
			Some(bucket) if bucket.ts == cursor => {
				let value = bucket.value(metric);
				present.next();
				value
			}
			_ => 0f64,
		};
		timestamps.push(cursor);
		values.push(value);
		cursor += step;
	}

	(timestamps, values)
}

pub fn series_view(
	state: &Mutex<AppState>,
	settings: &Settings,
	site: Option<&str>,
	freq: Frequency,
) -> Result<SeriesView> {
	let series = aggregate_working(state, settings, site, freq)
		.map_err(|err| match err {
			CoreError::EmptyDataset(_) => CoreError::EmptyDataset(Cow::Borrowed("No aggregated series available.")),
			other => other,
		})?;

	Ok(SeriesView {
		freq,
		site: site.unwrap_or(DEFAULT_SITE).to_string(),
		series: series
			.buckets
			.iter()
			.map(|each| SeriesPoint {
				ts: each.ts,
				energy_kwh: each.energy_kwh,
				sessions: each.sessions,
			})
			.collect(),
	})
}

pub fn clean_preview(table: &RawTable, site: Option<&str>, freq: Frequency, limit: usize) -> CleanPreview {
	let series = aggregate(table, site, freq);

	let mut null_counts = (0..table.columns.len())
		.map(|column| {
			(
				table.columns[column].to_string(),
				table.column_cells(column).filter(|each| each.is_missing()).count(),
			)
		})
		.collect::<Vec<_>>();
	null_counts.sort_by(|a, b| b.1.cmp(&a.1));

	let message = if series.is_empty() {
		format!(
			"Could not build aggregated series. Check that timestamps and kWhDelivered/energy columns exist. Raw rows: {}.",
			table.len()
		)
	} else {
		format!(
			"Data aggregated at {} frequency for site '{}'. {} session records became {} time buckets, {} raw cells were missing.",
			freq.label(),
			site.unwrap_or(DEFAULT_SITE),
			table.len(),
			series.len(),
			count_missing(table)
		)
	};

	CleanPreview {
		message,
		raw_rows: table.len(),
		buckets: series.len(),
		null_counts: null_counts
			.into_iter()
			.map(|(column, count)| (column, serde_json::Value::from(count)))
			.collect(),
		preview: series.buckets.into_iter().take(limit).collect(),
	}
}

pub fn clean_working(
	state: &Mutex<AppState>,
	settings: &Settings,
	site: Option<&str>,
	freq: Frequency,
	limit: Option<usize>,
) -> Result<CleanPreview> {
	let (table, _) = working_dataset(state, settings)?;
	Ok(clean_preview(&table, site, freq, limit.unwrap_or(settings.clean_preview_limit)))
}
