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

use std::borrow::Cow;
use thiserror::Error;

use crate::typedef::ErrorInfo;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Every recoverable failure of the pipeline. None of these should ever take the process down;
/// they travel back to the caller as an `ok: false` reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
	#[error("no {role} column found, map columns explicitly in your CSV/JSON")]
	MissingColumn { role: &'static str },

	#[error("{0}")]
	EmptyDataset(Cow<'static, str>),

	#[error("cannot parse input: {0}")]
	Malformed(String),

	#[error("cannot access file: {0}")]
	Io(String),

	#[error("insufficient data: need at least {needed} points, got {got}")]
	InsufficientData { needed: usize, got: usize },

	#[error("model fit failed: {0}")]
	FitFailed(String),

	#[error("grid search failed, try different settings or more data")]
	NoUsableModel,

	#[error("forecasting timed out after {budget_secs}s, try a smaller horizon or disable auto_grid")]
	Timeout { budget_secs: u64 },

	#[error("invalid request: {0}")]
	InvalidRequest(String),

	#[error("No forecast available yet.")]
	NoForecast,

	#[error("worker failed: {0}")]
	Worker(String),

	#[error("state inaccessible: {0}")]
	State(String),
}

impl CoreError {
	pub fn title(&self) -> Cow<'static, str> {
		Cow::Borrowed(match self {
			CoreError::MissingColumn { .. } => "Data is Incomplete",
			CoreError::EmptyDataset(_) => "No Data",
			CoreError::Malformed(_) => "Failed to Read Content",
			CoreError::Io(_) => "Cannot Read File",
			CoreError::InsufficientData { .. } => "Not Enough Data Points",
			CoreError::FitFailed(_) => "Model Fit Failed",
			CoreError::NoUsableModel => "No Usable Model",
			CoreError::Timeout { .. } => "Forecast Timed Out",
			CoreError::InvalidRequest(_) => "Invalid Request",
			CoreError::NoForecast => "Nothing to Export",
			CoreError::Worker(_) => "Cannot Create New Process Thread",
			CoreError::State(_) => "State Inaccessible",
		})
	}

	/// Observed length, so the caller can adjust its parameters.
	pub fn series_length(&self) -> Option<usize> {
		match self {
			CoreError::InsufficientData { got, .. } => Some(*got),
			_ => None,
		}
	}
}

impl From<&CoreError> for ErrorInfo {
	fn from(err: &CoreError) -> Self {
		ErrorInfo {
			title: err.title(),
			message: err.to_string(),
			series_length: err.series_length(),
		}
	}
}

impl From<std::io::Error> for CoreError {
	fn from(err: std::io::Error) -> Self {
		CoreError::Io(err.to_string())
	}
}

impl From<csv::Error> for CoreError {
	fn from(err: csv::Error) -> Self {
		if err.is_io_error() {
			CoreError::Io(err.to_string())
		} else {
			CoreError::Malformed(err.to_string())
		}
	}
}

impl From<serde_json::Error> for CoreError {
	fn from(err: serde_json::Error) -> Self {
		CoreError::Malformed(err.to_string())
	}
}

impl From<calamine::Error> for CoreError {
	fn from(err: calamine::Error) -> Self {
		CoreError::Malformed(err.to_string())
	}
}

impl From<rand_distr::NormalError> for CoreError {
	fn from(err: rand_distr::NormalError) -> Self {
		CoreError::InvalidRequest(format!("invalid sampling distribution: {}", err))
	}
}

impl From<toml::de::Error> for CoreError {
	fn from(err: toml::de::Error) -> Self {
		CoreError::InvalidRequest(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insufficient_data_reports_observed_length() {
		let err = CoreError::InsufficientData { needed: 20, got: 15 };
		assert_eq!(err.series_length(), Some(15));
		assert_eq!(err.to_string(), "insufficient data: need at least 20 points, got 15");

		let info = ErrorInfo::from(&err);
		assert_eq!(info.title, "Not Enough Data Points");
		assert_eq!(info.series_length, Some(15));
	}

	#[test]
	fn timeout_is_distinct_from_fit_failure() {
		let timeout = CoreError::Timeout { budget_secs: 20 };
		let failure = CoreError::FitFailed(String::from("diverged"));
		assert_ne!(timeout.title(), failure.title());
		assert!(timeout.to_string().contains("disable auto_grid"));
	}
}
