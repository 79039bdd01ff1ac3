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

use super::{model::SeasonalArima, typedef::*};
use crate::error::{CoreError, Result};

/// Below this many training points the search is skipped altogether.
pub const SMALL_SERIES: usize = 100;

/// Cheap non-seasonal candidates tried when a forecast must stay responsive.
pub const RESPONSIVE_ORDERS: [Order; 4] = [Order(1, 1, 1), Order(2, 1, 1), Order(1, 0, 1), Order(0, 1, 1)];

/// Fits every spec and keeps the ones with a finite AIC. Failures are only counted.
pub fn score_candidates<I>(values: &[f64], specs: I, options: FitOptions) -> (Vec<Candidate>, usize)
where
	I: IntoIterator<Item = ModelSpec>,
{
	let mut evaluated = Vec::new();
	let mut failures = 0;

	for spec in specs {
		match SeasonalArima::fit(values, spec, options) {
			Ok(model) if model.aic().is_finite() => evaluated.push(Candidate {
				spec: model.spec(),
				aic: model.aic(),
			}),
			Ok(_) => {
				tracing::debug!(%spec, "candidate skipped, AIC is not finite");
				failures += 1;
			}
			Err(err) => {
				tracing::debug!(%spec, %err, "candidate skipped");
				failures += 1;
			}
		}
	}

	(evaluated, failures)
}

fn best_of(candidates: &[Candidate]) -> Option<Candidate> {
	candidates
		.iter()
		.copied()
		.min_by(|a, b| a.aic.total_cmp(&b.aic))
}

/// Hyperparameters for one forecast run.
///
/// Short training series get `(1,1,1)` straight away. Otherwise `auto_grid` scores the
/// responsive candidates and keeps the lowest AIC, falling back to `(1,1,1)` when none fits so
/// the forecaster can decide what to do with the failure. Without `auto_grid` the caller's
/// orders are used as given.
pub fn select_hyperparameters(
	train: &[f64],
	auto_grid: bool,
	order: Option<Order>,
	seasonal_order: Option<SeasonalOrder>,
	options: FitOptions,
) -> ModelSpec {
	if train.len() < SMALL_SERIES {
		return ModelSpec::new(Order::DEFAULT, SeasonalOrder::NONE);
	}

	if !auto_grid {
		return ModelSpec::new(
			order.unwrap_or(Order::DEFAULT),
			seasonal_order.unwrap_or(SeasonalOrder::NONE),
		);
	}

	let specs = RESPONSIVE_ORDERS
		.iter()
		.map(|each| ModelSpec::new(*each, SeasonalOrder::NONE));
	let (evaluated, failures) = score_candidates(train, specs, options);

	match best_of(&evaluated) {
		Some(best) => {
			tracing::info!(spec = %best.spec, aic = best.aic, failures, "responsive search done");
			best.spec
		}
		None => {
			tracing::warn!("every responsive candidate failed, keeping (1,1,1)");
			ModelSpec::new(Order::DEFAULT, SeasonalOrder::NONE)
		}
	}
}

/// Orders `{0,1,2} x {0,1} x {0,1,2}` crossed with seasonal `{0,1}^3` at `period`, or with no
/// seasonal part when `period <= 1`.
pub fn grid_candidates(period: usize) -> Vec<ModelSpec> {
	let orders = (0..3)
		.flat_map(|p| (0..2).flat_map(move |d| (0..3).map(move |q| Order(p, d, q))))
		.collect::<Vec<_>>();

	let seasonal_orders = if period > 1 {
		(0..2)
			.flat_map(|sp| (0..2).flat_map(move |sd| (0..2).map(move |sq| SeasonalOrder(sp, sd, sq, period))))
			.collect::<Vec<_>>()
	} else {
		vec![SeasonalOrder::NONE]
	};

	orders
		.iter()
		.flat_map(|order| {
			seasonal_orders
				.iter()
				.map(move |seasonal_order| ModelSpec::new(*order, *seasonal_order))
		})
		.collect()
}

/// Exhaustive AIC search. Unlike the responsive path, nothing fitting is an error.
pub fn grid_search(values: &[f64], period: usize, options: FitOptions) -> Result<SearchOutcome> {
	let (evaluated, failures) = score_candidates(values, grid_candidates(period), options);
	let best = best_of(&evaluated).ok_or(CoreError::NoUsableModel)?;

	tracing::info!(
		spec = %best.spec,
		aic = best.aic,
		evaluated = evaluated.len(),
		failures,
		"grid search done"
	);

	Ok(SearchOutcome {
		best,
		evaluated,
		failures,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn wavy(n: usize) -> Vec<f64> {
		(0..n)
			.map(|t| 10f64 + 0.05 * t as f64 + (t as f64 * 0.7).sin() + 0.3 * (t as f64 * 2.3).cos())
			.collect()
	}

	#[test]
	fn short_training_series_skips_search() {
		let spec = select_hyperparameters(&wavy(60), true, Some(Order(2, 0, 2)), None, FitOptions::default());
		assert_eq!(spec, ModelSpec::new(Order(1, 1, 1), SeasonalOrder::NONE));
	}

	#[test]
	fn explicit_orders_are_honoured() {
		let spec = select_hyperparameters(
			&wavy(120),
			false,
			Some(Order(2, 0, 1)),
			Some(SeasonalOrder(1, 0, 0, 12)),
			FitOptions::default(),
		);
		assert_eq!(spec.order, Order(2, 0, 1));
		assert_eq!(spec.seasonal_order, SeasonalOrder(1, 0, 0, 12));

		let spec = select_hyperparameters(&wavy(120), false, None, None, FitOptions::default());
		assert_eq!(spec, ModelSpec::new(Order::DEFAULT, SeasonalOrder::NONE));
	}

	#[test]
	fn responsive_search_picks_a_listed_candidate() {
		let spec = select_hyperparameters(&wavy(150), true, None, None, FitOptions::default());
		assert!(RESPONSIVE_ORDERS.contains(&spec.order));
		assert_eq!(spec.seasonal_order, SeasonalOrder::NONE);
	}

	#[test]
	fn grid_sizes() {
		assert_eq!(grid_candidates(24).len(), 144);
		assert_eq!(grid_candidates(1).len(), 18);
		assert_eq!(grid_candidates(0).len(), 18);
	}

	#[test]
	fn grid_search_returns_minimum_aic() {
		let outcome = grid_search(&wavy(60), 1, FitOptions::default()).unwrap();
		assert!(outcome
			.evaluated
			.iter()
			.all(|each| each.aic >= outcome.best.aic));
		assert_eq!(outcome.evaluated.len() + outcome.failures, 18);
	}

	#[test]
	fn responsive_search_keeps_default_when_every_candidate_fails() {
		let values = wavy(150).iter().map(|each| each * 1e160).collect::<Vec<_>>();
		let (evaluated, failures) = score_candidates(
			&values,
			RESPONSIVE_ORDERS.iter().map(|each| ModelSpec::new(*each, SeasonalOrder::NONE)),
			FitOptions::default(),
		);
		assert!(evaluated.is_empty());
		assert_eq!(failures, 4);

		let spec = select_hyperparameters(&values, true, None, None, FitOptions::default());
		assert_eq!(spec, ModelSpec::new(Order::DEFAULT, SeasonalOrder::NONE));
	}

	#[test]
	fn grid_search_without_any_fit_fails_hard() {
		let err = grid_search(&[1f64], 1, FitOptions::default()).unwrap_err();
		assert_eq!(err, CoreError::NoUsableModel);
	}
}
