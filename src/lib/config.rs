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

use serde::{Deserialize, Serialize};
use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use crate::error::Result;

/// Service knobs, read from an optional TOML file. Every field has a default so an empty file
/// (or no file at all) is a valid configuration.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
	/// Wall-clock budget of one fit-and-forecast run.
	pub forecast_budget_secs: u64,
	/// Output of the forward-fill step, used when nothing was ingested in this process.
	pub filled_dataset_path: Option<PathBuf>,
	pub synthetic_rows: usize,
	pub min_upload_rows: usize,
	pub raw_preview_limit: usize,
	pub clean_preview_limit: usize,
	pub diagnostic_lags: usize,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			forecast_budget_secs: 20,
			filled_dataset_path: None,
			synthetic_rows: 150,
			min_upload_rows: 10,
			raw_preview_limit: 100,
			clean_preview_limit: 200,
			diagnostic_lags: 40,
		}
	}
}

impl Settings {
	pub fn from_toml_str(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let settings = Self::from_toml_str(&text)?;
		tracing::debug!(path = %path.display(), ?settings, "settings loaded");
		Ok(settings)
	}

	pub fn forecast_budget(&self) -> Duration {
		Duration::from_secs(self.forecast_budget_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_file_yields_defaults() {
		let settings = Settings::from_toml_str("").unwrap();
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.forecast_budget(), Duration::from_secs(20));
	}

	#[test]
	fn partial_file_overrides_only_named_fields() {
		let settings = Settings::from_toml_str(
			"forecast_budget_secs = 5\nfilled_dataset_path = \"data/ACN-data-filled.csv\"\n",
		)
		.unwrap();
		assert_eq!(settings.forecast_budget_secs, 5);
		assert_eq!(
			settings.filled_dataset_path,
			Some(PathBuf::from("data/ACN-data-filled.csv"))
		);
		assert_eq!(settings.synthetic_rows, 150);
	}

	#[test]
	fn malformed_file_is_an_invalid_request() {
		let err = Settings::from_toml_str("forecast_budget_secs = \"soon\"").unwrap_err();
		assert!(matches!(err, crate::error::CoreError::InvalidRequest(_)));
	}
}
