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

fn demeaned(values: &[f64]) -> Vec<f64> {
	let mean = values.iter().sum::<f64>() / values.len() as f64;
	values.iter().map(|each| each - mean).collect()
}

/// Lag-`k` sum of products of the demeaned series.
fn lagged_products(centered: &[f64], lag: usize) -> f64 {
	centered
		.iter()
		.zip(&centered[lag..])
		.map(|(a, b)| a * b)
		.sum()
}

/// Sample autocorrelation over lags `0..=lags`, every lag divided by the full-sample sum.
/// A constant series gives `NaN` everywhere.
pub(crate) fn acf(values: &[f64], lags: usize) -> Vec<f64> {
	let centered = demeaned(values);
	let denominator = lagged_products(&centered, 0);

	(0..=lags.min(values.len().saturating_sub(1)))
		.map(|lag| lagged_products(&centered, lag) / denominator)
		.collect()
}

/// Partial autocorrelation by Yule-Walker on the length-adjusted autocovariance, solved with
/// Durbin-Levinson. Lag 0 is always 1.
pub(crate) fn pacf_yule_walker(values: &[f64], lags: usize) -> Vec<f64> {
	let n = values.len();
	let lags = lags.min(n.saturating_sub(1));
	let centered = demeaned(values);

	let autocovariance = (0..=lags)
		.map(|lag| lagged_products(&centered, lag) / (n - lag) as f64)
		.collect::<Vec<_>>();
	let rho = autocovariance
		.iter()
		.map(|each| each / autocovariance[0])
		.collect::<Vec<_>>();

	let mut pacf = vec![1f64];
	let mut phi = Vec::<f64>::new();
	for k in 1..=lags {
		let numerator = rho[k] - (1..k).map(|j| phi[j - 1] * rho[k - j]).sum::<f64>();
		let denominator = 1f64 - (1..k).map(|j| phi[j - 1] * rho[j]).sum::<f64>();
		let reflection = numerator / denominator;

		let mut next = (1..k)
			.map(|j| phi[j - 1] - reflection * phi[k - j - 1])
			.collect::<Vec<_>>();
		next.push(reflection);
		phi = next;

		pacf.push(reflection);
	}

	pacf
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	#[test]
	fn acf_of_alternating_series() {
		let values = [1f64, -1f64, 1f64, -1f64, 1f64, -1f64];
		let acf = acf(&values, 2);
		assert_relative_eq!(acf[0], 1f64);
		assert_relative_eq!(acf[1], -5f64 / 6f64, epsilon = 1e-12);
		assert_relative_eq!(acf[2], 4f64 / 6f64, epsilon = 1e-12);
	}

	#[test]
	fn pacf_first_lag_is_adjusted_correlation() {
		let values = [1f64, 2f64, 3f64, 4f64, 5f64, 6f64, 7f64, 8f64];
		let pacf = pacf_yule_walker(&values, 3);
		assert_eq!(pacf.len(), 4);
		assert_relative_eq!(pacf[0], 1f64);

		// (sum of lag-1 products / 7) / (sum of squares / 8)
		let expected = (105f64 / 4f64 / 7f64) / (42f64 / 8f64);
		assert_relative_eq!(pacf[1], expected, epsilon = 1e-12);
	}

	#[test]
	fn constant_series_is_undefined() {
		let values = [3f64; 12];
		assert!(acf(&values, 4).iter().all(|each| each.is_nan()));
		let pacf = pacf_yule_walker(&values, 4);
		assert_eq!(pacf[0], 1f64);
		assert!(pacf[1..].iter().all(|each| each.is_nan()));
	}
}
