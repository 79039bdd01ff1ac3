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

//! Command-line glue: loads a dataset into the workspace, runs one operation and prints the
//! JSON reply on stdout. Logs go to stderr, filtered by `RUST_LOG`.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::{
	path::PathBuf,
	process::ExitCode,
	sync::Mutex,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use project_ampere_lib::{
	data::command as data,
	diagnose::command as diagnose,
	error::{CoreError, Result},
	evaluate::{command as evaluate, typedef::ForecastRequest},
	preprocess::{
		command as preprocess,
		typedef::{Frequency, Metric},
	},
	train::typedef::{Order, SeasonalOrder},
	AppState, Reply, Settings,
};

#[derive(Parser)]
#[command(name = "project-ampere")]
#[command(about = "EV charging demand aggregation and forecasting", long_about = None)]
struct Cli {
	/// TOML settings file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Dataset to ingest first (csv, xlsx, xls, xlsb, ods or json)
	#[arg(short, long, global = true)]
	data: Option<PathBuf>,

	/// Spreadsheet tab, first one when omitted
	#[arg(long, global = true)]
	sheet: Option<String>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Args, Clone)]
struct SeriesArgs {
	/// Only sessions of this site
	#[arg(long)]
	site: Option<String>,

	/// Bucket width, H or D
	#[arg(long, default_value = "H")]
	freq: Frequency,
}

#[derive(Subcommand)]
enum Commands {
	/// Raw rows of the working dataset with voted column types
	Preview {
		#[arg(short, long)]
		limit: Option<usize>,
	},

	/// Aggregated buckets plus null counts of the raw table
	Clean {
		#[command(flatten)]
		series: SeriesArgs,

		#[arg(short, long)]
		limit: Option<usize>,
	},

	/// Energy and session counts per bucket
	Series {
		#[command(flatten)]
		series: SeriesArgs,
	},

	/// ACF and PACF of one metric
	Diagnostics {
		#[command(flatten)]
		series: SeriesArgs,

		#[arg(short, long, default_value = "energy")]
		metric: Metric,

		#[arg(long)]
		lags: Option<usize>,
	},

	/// Fit, validate and forecast one metric
	Forecast {
		#[command(flatten)]
		series: SeriesArgs,

		#[arg(short, long, default_value = "energy")]
		metric: Metric,

		#[arg(long, default_value = "24")]
		seasonal_period: usize,

		#[arg(long, default_value = "48")]
		horizon: usize,

		#[arg(long, default_value = "48")]
		test_size: usize,

		/// Use the given orders instead of the responsive search
		#[arg(long)]
		no_auto_grid: bool,

		/// p,d,q
		#[arg(long, value_parser = parse_order)]
		order: Option<Order>,

		/// P,D,Q,period
		#[arg(long, value_parser = parse_seasonal_order)]
		seasonal_order: Option<SeasonalOrder>,

		/// Also write the forecast rows as CSV
		#[arg(short, long)]
		export: Option<PathBuf>,
	},

	/// Exhaustive AIC grid over the whole series
	Grid {
		#[command(flatten)]
		series: SeriesArgs,

		#[arg(short, long, default_value = "energy")]
		metric: Metric,

		#[arg(long, default_value = "24")]
		seasonal_period: usize,
	},

	/// Forward-fill missing cells of a CSV file
	Fill { input: PathBuf, output: PathBuf },

	/// Flatten a nested JSON export into CSV
	FlattenJson { input: PathBuf, output: PathBuf },
}

fn parse_numbers<const N: usize>(text: &str) -> std::result::Result<[usize; N], String> {
	let numbers = text
		.split(',')
		.map(|each| each.trim().parse::<usize>().map_err(|err| err.to_string()))
		.collect::<std::result::Result<Vec<_>, _>>()?;
	numbers
		.try_into()
		.map_err(|_| format!("expected {} comma-separated numbers", N))
}

fn parse_order(text: &str) -> std::result::Result<Order, String> {
	let [p, d, q] = parse_numbers::<3>(text)?;
	Ok(Order(p, d, q))
}

fn parse_seasonal_order(text: &str) -> std::result::Result<SeasonalOrder, String> {
	let [p, d, q, period] = parse_numbers::<4>(text)?;
	Ok(SeasonalOrder(p, d, q, period))
}

fn emit<T: Serialize>(result: Result<T>) -> ExitCode {
	let failed = result.is_err();
	let reply = Reply::from(result);
	match serde_json::to_string_pretty(&reply) {
		Ok(text) => println!("{}", text),
		Err(err) => {
			tracing::error!(%err, "reply is not serializable");
			return ExitCode::FAILURE;
		}
	}

	if failed {
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}

async fn run(cli: Cli) -> Result<ExitCode> {
	let settings = match &cli.config {
		Some(path) => Settings::load(path)?,
		None => Settings::default(),
	};

	let state = Mutex::new(AppState::default());
	if let Some(path) = &cli.data {
		data::ingest_file(&state, &settings, path, cli.sheet.as_deref())?;
	}

	let code = match cli.command {
		Commands::Preview { limit } => emit(data::preview_working_dataset(&state, &settings, limit)),
		Commands::Clean { series, limit } => emit(preprocess::clean_working(
			&state,
			&settings,
			series.site.as_deref(),
			series.freq,
			limit,
		)),
		Commands::Series { series } => emit(preprocess::series_view(
			&state,
			&settings,
			series.site.as_deref(),
			series.freq,
		)),
		Commands::Diagnostics { series, metric, lags } => emit(diagnose::diagnose_working(
			&state,
			&settings,
			metric,
			series.site.as_deref(),
			series.freq,
			lags,
		)),
		Commands::Forecast {
			series,
			metric,
			seasonal_period,
			horizon,
			test_size,
			no_auto_grid,
			order,
			seasonal_order,
			export,
		} => {
			let request = ForecastRequest {
				site: series.site,
				metric,
				freq: series.freq,
				seasonal_period,
				horizon,
				test_size,
				auto_grid: !no_auto_grid,
				order,
				seasonal_order,
			};

			let result = evaluate::forecast(&state, &settings, request).await;
			let result = match (result, export) {
				(Ok(found), Some(path)) => std::fs::File::create(&path)
					.map_err(CoreError::from)
					.and_then(|file| evaluate::export_forecast(&state, file))
					.map(|rows| {
						tracing::info!(rows, path = %path.display(), "forecast exported");
						found
					}),
				(other, _) => other,
			};
			emit(result)
		}
		Commands::Grid {
			series,
			metric,
			seasonal_period,
		} => {
			let request = ForecastRequest {
				site: series.site,
				metric,
				freq: series.freq,
				seasonal_period,
				..Default::default()
			};
			emit(evaluate::search(&state, &settings, request).await)
		}
		Commands::Fill { input, output } => emit(data::fill_missing_file(&input, &output)),
		Commands::FlattenJson { input, output } => emit(data::flatten_json_file(&input, &output)),
	};

	Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "project_ampere_lib=info,project_ampere=info".into()),
		)
		.init();

	let cli = Cli::parse();
	match run(cli).await {
		Ok(code) => code,
		Err(err) => emit::<()>(Err(err)),
	}
}
