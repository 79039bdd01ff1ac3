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
	io::Write,
	sync::{Arc, Mutex},
};

use super::{helper::*, typedef::*};
use crate::{
	config::Settings,
	error::{CoreError, Result},
	preprocess::command::{aggregate_working, fill_gaps},
	train::{
		command::{grid_search, select_hyperparameters},
		model::SeasonalArima,
		typedef::{FitOptions, ModelSpec, Order, SearchOutcome, SeasonalOrder, StepForecast},
	},
	typedef::AppState,
};

fn model_id(request: &ForecastRequest, order: Order, seasonal_order: SeasonalOrder) -> String {
	format!("{}_{}_{}_{}", request.metric, request.freq, order, seasonal_order)
}

fn forecast_points(timestamps: Vec<NaiveDateTime>, steps: Vec<StepForecast>) -> Vec<ForecastPoint> {
	timestamps
		.into_iter()
		.zip(steps)
		.map(|(ts, step)| ForecastPoint {
			ts,
			y_pred: finite(step.mean),
			lower: finite(step.lower),
			upper: finite(step.upper),
		})
		.collect()
}

/// Select, fit, validate and forecast one regular series. Blocking; run it off the async
/// executor.
pub fn forecast_series(
	timestamps: &[NaiveDateTime],
	values: &[f64],
	request: &ForecastRequest,
	options: FitOptions,
) -> Result<ForecastResult> {
	let n = values.len().min(timestamps.len());
	let plan = plan_windows(n, request.horizon, request.test_size)?;
	let (timestamps, values) = (&timestamps[..n], &values[..n]);

	let split = n - plan.test_size;
	let (train, test) = values.split_at(split);
	let last = timestamps[n - 1];
	let future = future_timestamps(last, request.freq, plan.horizon);

	let history = timestamps
		.iter()
		.zip(values)
		.map(|(ts, y)| HistoryPoint { ts: *ts, y: finite(*y) })
		.collect::<Vec<_>>();

	let spec = select_hyperparameters(train, request.auto_grid, request.order, request.seasonal_order, options);
	let mut model = match SeasonalArima::fit(train, spec, options) {
		Ok(model) => model,
		Err(err) => {
			tracing::warn!(%spec, %err, "model fit failed, using linear trend fallback");
			return Ok(ForecastResult {
				model_id: model_id(request, Order::NONE, SeasonalOrder::NONE),
				order: Order::NONE,
				seasonal_order: SeasonalOrder::NONE,
				metric: request.metric,
				freq: request.freq,
				fallback: true,
				horizon: plan.horizon,
				test_size: plan.test_size,
				metrics: None,
				history,
				validation: None,
				forecast: forecast_points(future, linear_fallback(values, plan.horizon)),
			});
		}
	};

	let (metrics, validation) = if test.is_empty() {
		(None, None)
	} else {
		let predicted = model.forecast(test.len());
		let validation = timestamps[split..]
			.iter()
			.zip(test.iter().zip(&predicted))
			.map(|(ts, (actual, guess))| ValidationPoint {
				ts: *ts,
				y_true: finite(*actual),
				y_pred: finite(*guess),
			})
			.collect::<Vec<_>>();
		(Some(accuracy(test, &predicted)), Some(validation))
	};

	model.extend(test)?;
	let steps = model.forecast_interval(plan.horizon, INTERVAL_ALPHA);

	tracing::info!(
		spec = %model.spec(),
		aic = model.aic(),
		horizon = plan.horizon,
		test_size = plan.test_size,
		"forecast ready"
	);

	let ModelSpec { order, seasonal_order } = model.spec();
	Ok(ForecastResult {
		model_id: model_id(request, order, seasonal_order),
		order,
		seasonal_order,
		metric: request.metric,
		freq: request.freq,
		fallback: false,
		horizon: plan.horizon,
		test_size: plan.test_size,
		metrics,
		history,
		validation,
		forecast: forecast_points(future, steps),
	})
}

fn regular_series(
	state: &Mutex<AppState>,
	settings: &Settings,
	request: &ForecastRequest,
) -> Result<(Vec<NaiveDateTime>, Vec<f64>)> {
	let series = aggregate_working(state, settings, request.site.as_deref(), request.freq).map_err(|err| match err {
		CoreError::EmptyDataset(_) => {
			CoreError::EmptyDataset(Cow::Borrowed("No aggregated data available for forecasting."))
		}
		other => other,
	})?;
	Ok(fill_gaps(&series, request.metric))
}

fn fit_gate(state: &Mutex<AppState>) -> Result<Arc<tokio::sync::Semaphore>> {
	let guarded_state = state.lock().map_err(|err| CoreError::State(err.to_string()))?;
	Ok(guarded_state.fit_gate.clone())
}

/// Forecast on the working dataset within the configured budget. A finished result replaces
/// the last forecast.
pub async fn forecast(
	state: &Mutex<AppState>,
	settings: &Settings,
	request: ForecastRequest,
) -> Result<Arc<ForecastResult>> {
	let (timestamps, values) = regular_series(state, settings, &request)?;
	let gate = fit_gate(state)?;

	let outcome = run_with_deadline(gate, settings.forecast_budget(), move || {
		forecast_series(&timestamps, &values, &request, FitOptions::default())
	})
	.await?;

	let result = match outcome {
		Deadline::Finished(result) => Arc::new(result?),
		Deadline::TimedOut => {
			tracing::warn!(budget_secs = settings.forecast_budget_secs, "forecast abandoned");
			return Err(CoreError::Timeout {
				budget_secs: settings.forecast_budget_secs,
			});
		}
	};

	let mut guarded_state = state.lock().map_err(|err| CoreError::State(err.to_string()))?;
	guarded_state.last_forecast = Some(result.clone());
	Ok(result)
}

/// Exhaustive search over the whole working series, sharing the single fit slot.
pub async fn search(state: &Mutex<AppState>, settings: &Settings, request: ForecastRequest) -> Result<SearchOutcome> {
	let (_, values) = regular_series(state, settings, &request)?;
	let permit = fit_gate(state)?
		.acquire_owned()
		.await
		.map_err(|err| CoreError::Worker(err.to_string()))?;

	let period = request.seasonal_period;
	tokio::task::spawn_blocking(move || {
		let _permit = permit;
		grid_search(&values, period, FitOptions::default())
	})
	.await
	.map_err(|err| CoreError::Worker(err.to_string()))?
}

pub fn export_rows(result: &ForecastResult) -> Vec<ExportRow> {
	result
		.forecast
		.iter()
		.map(|each| ExportRow {
			metric: result.metric,
			freq: result.freq,
			ts: each.ts,
			y_pred: each.y_pred,
			lower: each.lower,
			upper: each.upper,
		})
		.collect()
}

/// Writes the last forecast's future rows as CSV and returns how many were written.
pub fn export_forecast<W: Write>(state: &Mutex<AppState>, sink: W) -> Result<usize> {
	let last_forecast = {
		let guarded_state = state.lock().map_err(|err| CoreError::State(err.to_string()))?;
		guarded_state.last_forecast.clone()
	};
	let result = last_forecast
		.filter(|found| !found.forecast.is_empty())
		.ok_or(CoreError::NoForecast)?;

	let rows = export_rows(&result);
	let mut writer = csv::Writer::from_writer(sink);
	for each in &rows {
		writer.serialize(each)?;
	}
	writer.flush()?;

	Ok(rows.len())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, NaiveDate};

	fn hours(n: usize) -> Vec<NaiveDateTime> {
		let start = NaiveDate::from_ymd_opt(2020, 1, 1)
			.unwrap()
			.and_hms_opt(0, 0, 0)
			.unwrap();
		(0..n).map(|i| start + Duration::hours(i as i64)).collect()
	}

	fn daily_cycle(n: usize) -> Vec<f64> {
		(0..n)
			.map(|t| 20f64 + 8f64 * (t as f64 * std::f64::consts::TAU / 24f64).sin() + (t % 5) as f64 * 0.3)
			.collect()
	}

	#[test]
	fn forecast_covers_horizon_after_last_point() {
		let timestamps = hours(60);
		let request = ForecastRequest {
			horizon: 10,
			test_size: 12,
			..Default::default()
		};
		let result = forecast_series(&timestamps, &daily_cycle(60), &request, FitOptions::default()).unwrap();

		assert_eq!(result.horizon, 10);
		assert_eq!(result.test_size, 12);
		assert_eq!(result.forecast.len(), 10);
		assert_eq!(result.history.len(), 60);
		assert_eq!(result.forecast[0].ts, timestamps[59] + Duration::hours(1));
		if !result.fallback {
			assert_eq!(result.validation.as_ref().map(Vec::len), Some(12));
			assert!(result.metrics.is_some());
			assert_eq!(result.model_id, "energy_H_(1,1,1)_(0,0,0,0)");
		}
	}

	#[test]
	fn infeasible_seasonal_order_falls_back() {
		let request = ForecastRequest {
			horizon: 6,
			test_size: 24,
			auto_grid: false,
			order: Some(Order(1, 0, 0)),
			seasonal_order: Some(SeasonalOrder(0, 1, 0, 150)),
			..Default::default()
		};
		let result = forecast_series(&hours(160), &daily_cycle(160), &request, FitOptions::default()).unwrap();

		assert!(result.fallback);
		assert_eq!(result.order, Order::NONE);
		assert_eq!(result.seasonal_order, SeasonalOrder::NONE);
		assert!(result.metrics.is_none());
		assert!(result.validation.is_none());
		for each in &result.forecast {
			let y_pred = each.y_pred.unwrap();
			assert_eq!(each.lower, Some((y_pred * 0.9).min(y_pred * 1.1)));
			assert_eq!(each.upper, Some((y_pred * 0.9).max(y_pred * 1.1)));
		}
	}

	#[test]
	fn overflowing_series_falls_back_after_auto_search() {
		let values = daily_cycle(200).iter().map(|each| each * 1e160).collect::<Vec<_>>();
		let request = ForecastRequest::default();
		let result = forecast_series(&hours(200), &values, &request, FitOptions::default()).unwrap();

		assert!(result.fallback);
		assert_eq!(result.model_id, "energy_H_(0,0,0)_(0,0,0,0)");
		assert_eq!(result.forecast.len(), 48);
		assert!(result.metrics.is_none());
		for each in &result.forecast {
			let y_pred = each.y_pred.unwrap();
			assert_eq!(each.lower, Some((y_pred * 0.9).min(y_pred * 1.1)));
			assert_eq!(each.upper, Some((y_pred * 0.9).max(y_pred * 1.1)));
		}
	}

	#[test]
	fn export_without_forecast_is_input_absent() {
		let state = Mutex::new(AppState::default());
		let err = export_forecast(&state, Vec::new()).unwrap_err();
		assert_eq!(err, CoreError::NoForecast);
		assert_eq!(err.to_string(), "No forecast available yet.");
	}
}
