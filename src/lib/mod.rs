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

//! Aggregation and seasonal ARIMA forecasting of EV charging sessions.
//!
//! Raw session tables are ingested from CSV, spreadsheets or nested JSON exports, bucketed
//! into an hourly or daily series, then either diagnosed (ACF/PACF) or forecast under a
//! wall-clock budget. Every operation takes the shared [`typedef::AppState`] by reference.

pub mod config;
pub mod error;
pub mod typedef;

pub mod data;
pub mod diagnose;
pub mod evaluate;
pub mod preprocess;
pub mod train;

pub use config::Settings;
pub use error::{CoreError, Result};
pub use typedef::{AppState, CellValue, ErrorInfo, RawTable, Reply};
