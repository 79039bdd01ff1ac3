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
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

use super::typedef::*;
use crate::{
	error::{CoreError, Result},
	preprocess::typedef::Frequency,
	train::typedef::StepForecast,
};

/// Hard minimum series length for forecasting.
pub const MIN_FORECAST_POINTS: usize = 20;

/// Two-sided tail mass of the reported interval.
pub const INTERVAL_ALPHA: f64 = 0.2;

const FALLBACK_LOWER: f64 = 0.9;
const FALLBACK_UPPER: f64 = 1.1;

pub(crate) fn finite(value: f64) -> Option<f64> {
	value.is_finite().then_some(value)
}

/// Shrinks the requested windows to what a series of length `n` can hold.
pub fn plan_windows(n: usize, horizon: usize, test_size: usize) -> Result<ForecastPlan> {
	if n < MIN_FORECAST_POINTS {
		return Err(CoreError::InsufficientData {
			needed: MIN_FORECAST_POINTS,
			got: n,
		});
	}
	if horizon == 0 {
		return Err(CoreError::InvalidRequest(String::from("horizon must be at least 1")));
	}

	let mut plan = ForecastPlan { horizon, test_size };
	if n < 50.max(horizon.saturating_add(test_size).saturating_add(5)) {
		plan.test_size = plan.test_size.min(12.max(n / 5));
		plan.horizon = plan.horizon.min(12.max(n / 6));
	}
	if plan.test_size >= n / 2 {
		plan.test_size = 12.max(n / 5);
	}

	Ok(plan)
}

/// MAE, RMSE and MAPE in percent. Actuals near zero are floored at `1e-8` in the MAPE.
pub fn accuracy(actual: &[f64], predicted: &[f64]) -> AccuracyMetrics {
	let count = actual.len().min(predicted.len()) as f64;
	let pairs = || actual.iter().zip(predicted);

	let mae = pairs().map(|(a, p)| (a - p).abs()).sum::<f64>() / count;
	let rmse = (pairs().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / count).sqrt();
	let mape = pairs().map(|(a, p)| ((a - p) / a.abs().max(1e-8)).abs()).sum::<f64>() / count * 100f64;

	AccuracyMetrics {
		mae: finite(mae),
		rmse: finite(rmse),
		mape: finite(mape),
	}
}

/// `horizon` bucket starts following `last`.
pub fn future_timestamps(last: NaiveDateTime, freq: Frequency, horizon: usize) -> Vec<NaiveDateTime> {
	(1..=horizon as i32)
		.map(|step| last + freq.step() * step)
		.collect()
}

/// Straight line from the last value along the slope of the last few points, with a fixed
/// ±10% band.
pub fn linear_fallback(values: &[f64], horizon: usize) -> Vec<StepForecast> {
	let n = values.len();
	let Some(last) = values.last().copied() else {
		return Vec::new();
	};

	let lookback = 5.min(n / 2);
	let trend = if lookback == 0 {
		0f64
	} else {
		(last - values[n - lookback]) / lookback.max(1) as f64
	};

	(1..=horizon)
		.map(|step| {
			let mean = last + trend * step as f64;
			let (a, b) = (mean * FALLBACK_LOWER, mean * FALLBACK_UPPER);
			StepForecast {
				mean,
				lower: a.min(b),
				upper: a.max(b),
			}
		})
		.collect()
}

/// Runs `job` on the blocking pool with one permit of `gate` held until the job really ends,
/// even when the caller stopped waiting.
pub async fn run_with_deadline<T, F>(gate: Arc<Semaphore>, budget: Duration, job: F) -> Result<Deadline<T>>
where
	T: Send + 'static,
	F: FnOnce() -> T + Send + 'static,
{
	let work = async move {
		let permit = gate
			.acquire_owned()
			.await
			.map_err(|err| CoreError::Worker(err.to_string()))?;

		tokio::task::spawn_blocking(move || {
			let _permit = permit;
			job()
		})
		.await
		.map_err(|err| CoreError::Worker(err.to_string()))
	};

	match tokio::time::timeout(budget, work).await {
		Ok(finished) => Ok(Deadline::Finished(finished?)),
		Err(_) => Ok(Deadline::TimedOut),
	}
}
