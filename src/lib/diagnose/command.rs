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

use std::{borrow::Cow, sync::Mutex};

use super::{helper::*, typedef::*};
use crate::{
	config::Settings,
	error::{CoreError, Result},
	evaluate::helper::finite,
	preprocess::{
		command::{aggregate_working, fill_gaps},
		typedef::{Frequency, Metric},
	},
	typedef::AppState,
};

pub const MIN_DIAGNOSTIC_POINTS: usize = 10;

/// ACF and PACF of `values`, non-finite inputs dropped first. The lag count is capped to
/// `max(5, n / 3)`.
pub fn diagnostics(values: &[f64], requested_lags: usize) -> Result<DiagnosticsReport> {
	let values = values
		.iter()
		.copied()
		.filter(|each| each.is_finite())
		.collect::<Vec<_>>();
	let n = values.len();
	if n < MIN_DIAGNOSTIC_POINTS {
		return Err(CoreError::InsufficientData {
			needed: MIN_DIAGNOSTIC_POINTS,
			got: n,
		});
	}

	let lags = requested_lags.min(5.max(n / 3)).min(n - 1);
	let to_report = |series: Vec<f64>| series.into_iter().map(finite).collect::<Vec<_>>();

	Ok(DiagnosticsReport {
		lags,
		acf: to_report(acf(&values, lags)),
		pacf: to_report(pacf_yule_walker(&values, lags)),
		series_length: n,
	})
}

pub fn diagnose_working(
	state: &Mutex<AppState>,
	settings: &Settings,
	metric: Metric,
	site: Option<&str>,
	freq: Frequency,
	requested_lags: Option<usize>,
) -> Result<DiagnosticsReport> {
	let series = aggregate_working(state, settings, site, freq).map_err(|err| match err {
		CoreError::EmptyDataset(_) => {
			CoreError::EmptyDataset(Cow::Borrowed("No aggregated data available for diagnostics."))
		}
		other => other,
	})?;

	let (_, values) = fill_gaps(&series, metric);
	let report = diagnostics(&values, requested_lags.unwrap_or(settings.diagnostic_lags))?;
	tracing::debug!(lags = report.lags, series_length = report.series_length, %metric, "diagnostics computed");
	Ok(report)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lag_count_is_capped() {
		let values = (0..30).map(|t| (t as f64 * 0.4).sin()).collect::<Vec<_>>();
		let report = diagnostics(&values, 40).unwrap();
		assert_eq!(report.lags, 10);
		assert_eq!(report.acf.len(), 11);
		assert_eq!(report.pacf.len(), 11);

		let report = diagnostics(&values, 3).unwrap();
		assert_eq!(report.lags, 3);
	}

	#[test]
	fn short_series_reports_length() {
		let err = diagnostics(&[1f64, 2f64, f64::NAN, 3f64], 40).unwrap_err();
		assert_eq!(err.series_length(), Some(3));
	}

	#[test]
	fn constant_series_reports_nulls() {
		let report = diagnostics(&[4f64; 20], 40).unwrap();
		assert!(report.acf.iter().all(Option::is_none));
		assert_eq!(report.pacf[0], Some(1f64));
		assert!(report.pacf[1..].iter().all(Option::is_none));

		let json = serde_json::to_value(&report).unwrap();
		assert!(json["acf"][1].is_null());
	}
}
