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

use crate::{
	preprocess::typedef::{Frequency, Metric},
	train::typedef::{Order, SeasonalOrder},
};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct ForecastRequest {
	pub site: Option<String>,
	pub metric: Metric,
	pub freq: Frequency,
	pub seasonal_period: usize,
	pub horizon: usize,
	pub test_size: usize,
	pub auto_grid: bool,
	pub order: Option<Order>,
	pub seasonal_order: Option<SeasonalOrder>,
}

impl Default for ForecastRequest {
	fn default() -> Self {
		Self {
			site: None,
			metric: Metric::ENERGY,
			freq: Frequency::HOURLY,
			seasonal_period: 24,
			horizon: 48,
			test_size: 48,
			auto_grid: true,
			order: None,
			seasonal_order: None,
		}
	}
}

/// Validation and horizon sizes after shrinking to the series length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForecastPlan {
	pub horizon: usize,
	pub test_size: usize,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct AccuracyMetrics {
	#[serde(rename = "MAE")]
	pub mae: Option<f64>,
	#[serde(rename = "RMSE")]
	pub rmse: Option<f64>,
	#[serde(rename = "MAPE")]
	pub mape: Option<f64>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct HistoryPoint {
	pub ts: NaiveDateTime,
	pub y: Option<f64>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct ValidationPoint {
	pub ts: NaiveDateTime,
	pub y_true: Option<f64>,
	pub y_pred: Option<f64>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct ForecastPoint {
	pub ts: NaiveDateTime,
	pub y_pred: Option<f64>,
	pub lower: Option<f64>,
	pub upper: Option<f64>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ForecastResult {
	pub model_id: String,
	pub order: Order,
	pub seasonal_order: SeasonalOrder,
	pub metric: Metric,
	pub freq: Frequency,
	pub fallback: bool,
	pub horizon: usize,
	pub test_size: usize,
	pub metrics: Option<AccuracyMetrics>,
	pub history: Vec<HistoryPoint>,
	pub validation: Option<Vec<ValidationPoint>>,
	pub forecast: Vec<ForecastPoint>,
}

/// One line of the forecast CSV.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ExportRow {
	pub metric: Metric,
	pub freq: Frequency,
	pub ts: NaiveDateTime,
	pub y_pred: Option<f64>,
	pub lower: Option<f64>,
	pub upper: Option<f64>,
}

/// Outcome of a budgeted job, kept apart from the job's own `Result`.
#[derive(Debug, PartialEq)]
pub enum Deadline<T> {
	Finished(T),
	TimedOut,
}
