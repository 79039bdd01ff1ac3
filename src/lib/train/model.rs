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

use anofox_forecast::utils::{nelder_mead, quantile_normal, NelderMeadConfig};

use super::{helper::*, typedef::*};
use crate::error::{CoreError, Result};

/// Seasonal ARIMA estimated by conditional sum of squares, without stationarity or
/// invertibility constraints.
///
/// The model is `a(B) (w_t - mu) = b(B) e_t` on the differenced series `w = Δ(B) y`, where
/// `a = φ(B) Φ(B^s)`, `b = θ(B) Θ(B^s)` and `Δ = (1 - B)^d (1 - B^s)^D`. A mean `mu` is only
/// estimated when nothing is differenced.
#[derive(Debug, Clone)]
pub struct SeasonalArima {
	spec: ModelSpec,
	mean: f64,
	ar: Vec<f64>,
	seasonal_ar: Vec<f64>,
	ma: Vec<f64>,
	seasonal_ma: Vec<f64>,
	ar_operator: Vec<f64>,
	ma_operator: Vec<f64>,
	differencing: Vec<f64>,
	history: Vec<f64>,
	differenced: Vec<f64>,
	residuals: Vec<f64>,
	sigma2: f64,
	aic: f64,
	converged: bool,
}

struct Coefficients {
	mean: f64,
	ar: Vec<f64>,
	seasonal_ar: Vec<f64>,
	ma: Vec<f64>,
	seasonal_ma: Vec<f64>,
}

impl Coefficients {
	/// Parameter layout is `[mu?, φ.., Φ.., θ.., Θ..]`.
	fn unpack(spec: &ModelSpec, params: &[f64]) -> Self {
		let mut cursor = 0;
		let mut take = |count: usize| {
			let slice = params[cursor..cursor + count].to_vec();
			cursor += count;
			slice
		};

		let mean = if spec.has_mean() { take(1)[0] } else { 0f64 };
		let ar = take(spec.order.0);
		let seasonal_ar = take(spec.seasonal_order.0);
		let ma = take(spec.order.2);
		let seasonal_ma = take(spec.seasonal_order.2);

		Self {
			mean,
			ar,
			seasonal_ar,
			ma,
			seasonal_ma,
		}
	}

	fn operators(&self, period: usize) -> (Vec<f64>, Vec<f64>) {
		let period = period.max(1);
		let ar_operator = multiply(
			&lag_polynomial(&self.ar, 1, -1f64),
			&lag_polynomial(&self.seasonal_ar, period, -1f64),
		);
		let ma_operator = multiply(
			&lag_polynomial(&self.ma, 1, 1f64),
			&lag_polynomial(&self.seasonal_ma, period, 1f64),
		);
		(ar_operator, ma_operator)
	}
}

/// Innovations of the differenced series and their sum of squares. The first `deg a` values are
/// conditioned on and stay zero.
fn innovations(differenced: &[f64], mean: f64, ar_operator: &[f64], ma_operator: &[f64]) -> (Vec<f64>, f64) {
	let start = ar_operator.len() - 1;
	let mut residuals = vec![0f64; differenced.len()];
	let mut css = 0f64;

	for t in start..differenced.len() {
		let autoregressive = ar_operator
			.iter()
			.enumerate()
			.map(|(i, coefficient)| coefficient * (differenced[t - i] - mean))
			.sum::<f64>();
		let moving_average = ma_operator
			.iter()
			.enumerate()
			.skip(1)
			.filter(|(j, _)| *j <= t)
			.map(|(j, coefficient)| coefficient * residuals[t - j])
			.sum::<f64>();

		let error = autoregressive - moving_average;
		residuals[t] = error;
		css += error * error;
	}

	(residuals, css)
}

impl SeasonalArima {
	/// Smallest series length `spec` can be estimated on.
	pub fn min_length(spec: &ModelSpec) -> usize {
		let ar_degree = spec.order.0 + spec.seasonal_order.0 * spec.seasonal_order.3;
		spec.differencing_span() + ar_degree + spec.param_count() + 1
	}

	pub fn fit(values: &[f64], spec: ModelSpec, options: FitOptions) -> Result<Self> {
		let spec = ModelSpec::new(spec.order, spec.seasonal_order);
		let needed = Self::min_length(&spec);
		if values.len() < needed {
			return Err(CoreError::InsufficientData {
				needed,
				got: values.len(),
			});
		}
		if values.iter().any(|each| !each.is_finite()) {
			return Err(CoreError::FitFailed(String::from("series contains non-finite values")));
		}

		let period = spec.seasonal_order.period();
		let differencing = differencing_polynomial(spec.order.1, spec.seasonal_order.1, period);
		let differenced = apply_polynomial(values, &differencing);
		let start_mean = if spec.has_mean() { mean(&differenced) } else { 0f64 };

		let mut initial = Vec::with_capacity(spec.param_count());
		if spec.has_mean() {
			initial.push(start_mean);
		}
		initial.extend((0..spec.order.0).map(|i| 0.1 / (i + 1) as f64));
		initial.extend((0..spec.seasonal_order.0).map(|_| 0.1));
		initial.extend((0..spec.order.2).map(|i| 0.1 / (i + 1) as f64));
		initial.extend((0..spec.seasonal_order.2).map(|_| 0.1));

		let arma_terms = spec.param_count() - usize::from(spec.has_mean());
		let (params, converged) = if arma_terms == 0 {
			// Only the mean, which the sample mean already minimizes
			(initial, true)
		} else {
			let result = nelder_mead(
				|params| {
					let coefficients = Coefficients::unpack(&spec, params);
					let (ar_operator, ma_operator) = coefficients.operators(period);
					let (_, css) = innovations(&differenced, coefficients.mean, &ar_operator, &ma_operator);
					if css.is_finite() {
						css
					} else {
						f64::MAX
					}
				},
				&initial,
				None,
				NelderMeadConfig {
					max_iter: options.max_iter,
					tolerance: options.tolerance,
					..Default::default()
				},
			);
			(result.optimal_point, result.converged)
		};

		let coefficients = Coefficients::unpack(&spec, &params);
		let (ar_operator, ma_operator) = coefficients.operators(period);
		let (residuals, css) = innovations(&differenced, coefficients.mean, &ar_operator, &ma_operator);

		let effective = (differenced.len() - (ar_operator.len() - 1)) as f64;
		let sigma2 = (css / effective).max(f64::MIN_POSITIVE);
		if !css.is_finite() || css >= f64::MAX || !sigma2.is_finite() {
			return Err(CoreError::FitFailed(format!(
				"conditional sum of squares diverged for {}",
				spec
			)));
		}

		let log_likelihood = -0.5 * effective * (1f64 + (2f64 * std::f64::consts::PI * sigma2).ln());
		let aic = -2f64 * log_likelihood + 2f64 * (spec.param_count() + 1) as f64;

		Ok(Self {
			spec,
			mean: coefficients.mean,
			ar: coefficients.ar,
			seasonal_ar: coefficients.seasonal_ar,
			ma: coefficients.ma,
			seasonal_ma: coefficients.seasonal_ma,
			ar_operator,
			ma_operator,
			differencing,
			history: values.to_vec(),
			differenced,
			residuals,
			sigma2,
			aic,
			converged,
		})
	}

	pub fn spec(&self) -> ModelSpec {
		self.spec
	}

	pub fn aic(&self) -> f64 {
		self.aic
	}

	pub fn sigma2(&self) -> f64 {
		self.sigma2
	}

	pub fn converged(&self) -> bool {
		self.converged
	}

	pub fn intercept(&self) -> f64 {
		self.mean
	}

	pub fn ar_coefficients(&self) -> &[f64] {
		&self.ar
	}

	pub fn seasonal_ar_coefficients(&self) -> &[f64] {
		&self.seasonal_ar
	}

	pub fn ma_coefficients(&self) -> &[f64] {
		&self.ma
	}

	pub fn seasonal_ma_coefficients(&self) -> &[f64] {
		&self.seasonal_ma
	}

	/// Appends observations and re-filters the innovations with the estimated coefficients kept
	/// fixed, so the next forecast starts after the newest point.
	pub fn extend(&mut self, values: &[f64]) -> Result<()> {
		if values.iter().any(|each| !each.is_finite()) {
			return Err(CoreError::FitFailed(String::from("series contains non-finite values")));
		}

		self.history.extend_from_slice(values);
		self.differenced = apply_polynomial(&self.history, &self.differencing);
		let (residuals, _) = innovations(&self.differenced, self.mean, &self.ar_operator, &self.ma_operator);
		self.residuals = residuals;
		Ok(())
	}

	/// Point forecasts for the next `steps` observations.
	pub fn forecast(&self, steps: usize) -> Vec<f64> {
		let mut differenced = self.differenced.clone();
		let mut residuals = self.residuals.clone();

		for _ in 0..steps {
			let t = differenced.len();
			let autoregressive = self
				.ar_operator
				.iter()
				.enumerate()
				.skip(1)
				.filter(|(i, _)| *i <= t)
				.map(|(i, coefficient)| coefficient * (differenced[t - i] - self.mean))
				.sum::<f64>();
			let moving_average = self
				.ma_operator
				.iter()
				.enumerate()
				.skip(1)
				.filter(|(j, _)| *j <= t)
				.map(|(j, coefficient)| coefficient * residuals[t - j])
				.sum::<f64>();

			differenced.push(self.mean - autoregressive + moving_average);
			residuals.push(0f64);
		}

		let mut levels = self.history.clone();
		for each in &differenced[self.differenced.len()..] {
			let t = levels.len();
			let carried = self
				.differencing
				.iter()
				.enumerate()
				.skip(1)
				.filter(|(i, _)| *i <= t)
				.map(|(i, coefficient)| coefficient * levels[t - i])
				.sum::<f64>();
			levels.push(each - carried);
		}

		levels.split_off(self.history.len())
	}

	/// Psi weights of the integrated process, `b(B) / (a(B) Δ(B))`.
	fn psi_weights(&self, count: usize) -> Vec<f64> {
		let full_ar = multiply(&self.ar_operator, &self.differencing);
		let mut psi = Vec::with_capacity(count);
		for j in 0..count {
			if j == 0 {
				psi.push(1f64);
				continue;
			}

			let moving_average = self.ma_operator.get(j).copied().unwrap_or(0f64);
			let carried = (1..=j.min(full_ar.len() - 1))
				.map(|i| full_ar[i] * psi[j - i])
				.sum::<f64>();
			psi.push(moving_average - carried);
		}
		psi
	}

	/// Point forecasts with a two-sided `1 - alpha` normal interval.
	pub fn forecast_interval(&self, steps: usize, alpha: f64) -> Vec<StepForecast> {
		let z = quantile_normal(1f64 - alpha / 2f64);
		let psi = self.psi_weights(steps);

		let mut cumulative = 0f64;
		self.forecast(steps)
			.into_iter()
			.zip(psi)
			.map(|(mean, weight)| {
				cumulative += weight * weight;
				let half_width = z * (self.sigma2 * cumulative).sqrt();
				StepForecast {
					mean,
					lower: mean - half_width,
					upper: mean + half_width,
				}
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use rand::{rngs::StdRng, Rng, SeedableRng};
	use rand_distr::StandardNormal;

	#[test]
	fn recovers_ar1_coefficient() {
		let mut rng = StdRng::seed_from_u64(7);
		let mut values = vec![0f64];
		for t in 1..400 {
			values.push(0.6 * values[t - 1] + rng.sample::<f64, _>(StandardNormal));
		}

		let model = SeasonalArima::fit(
			&values,
			ModelSpec::new(Order(1, 0, 0), SeasonalOrder::NONE),
			FitOptions::default(),
		)
		.unwrap();

		assert_relative_eq!(model.ar_coefficients()[0], 0.6, epsilon = 0.1);
		assert!(model.intercept().abs() < 0.5);
		assert!(model.aic().is_finite());
	}

	#[test]
	fn random_walk_forecast_is_flat_with_growing_band() {
		let values = (0..30).map(|t| 5f64 + 2f64 * t as f64).collect::<Vec<_>>();
		let model = SeasonalArima::fit(
			&values,
			ModelSpec::new(Order(0, 1, 0), SeasonalOrder::NONE),
			FitOptions::default(),
		)
		.unwrap();

		// Differences are all 2 and no drift is estimated, so sigma^2 is 4
		assert_relative_eq!(model.sigma2(), 4f64, epsilon = 1e-9);

		let steps = model.forecast_interval(3, 0.2);
		let z = quantile_normal(0.9);
		for (h, step) in steps.iter().enumerate() {
			assert_relative_eq!(step.mean, 63f64, epsilon = 1e-9);
			assert_relative_eq!(step.upper - step.mean, z * (4f64 * (h + 1) as f64).sqrt(), epsilon = 1e-9);
			assert!(step.lower <= step.mean);
		}
	}

	#[test]
	fn seasonal_difference_repeats_the_pattern() {
		let pattern = [1f64, 5f64, 3f64, 8f64];
		let values = pattern.iter().cycle().take(24).copied().collect::<Vec<_>>();
		let model = SeasonalArima::fit(
			&values,
			ModelSpec::new(Order(0, 0, 0), SeasonalOrder(0, 1, 0, 4)),
			FitOptions::default(),
		)
		.unwrap();

		let forecast = model.forecast(4);
		for (predicted, expected) in forecast.iter().zip(pattern) {
			assert_relative_eq!(*predicted, expected, epsilon = 1e-9);
		}
	}

	#[test]
	fn short_series_is_rejected() {
		let err = SeasonalArima::fit(
			&[1f64, 2f64, 3f64],
			ModelSpec::new(Order(1, 1, 1), SeasonalOrder::NONE),
			FitOptions::default(),
		)
		.unwrap_err();
		assert!(matches!(err, CoreError::InsufficientData { got: 3, .. }));
	}

	#[test]
	fn period_one_drops_seasonality() {
		let spec = ModelSpec::new(Order(1, 1, 1), SeasonalOrder(1, 1, 1, 1));
		assert_eq!(spec.seasonal_order, SeasonalOrder::NONE);
	}

	#[test]
	fn extending_moves_the_forecast_origin() {
		let values = (0..40).map(|t| t as f64).collect::<Vec<_>>();
		let mut model = SeasonalArima::fit(
			&values[..30],
			ModelSpec::new(Order(0, 1, 0), SeasonalOrder::NONE),
			FitOptions::default(),
		)
		.unwrap();
		assert_relative_eq!(model.forecast(1)[0], 29f64, epsilon = 1e-9);

		model.extend(&values[30..]).unwrap();
		assert_relative_eq!(model.forecast(1)[0], 39f64, epsilon = 1e-9);
	}
}
