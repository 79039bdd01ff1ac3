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

/// `1 + sign * (c_1 B^stride + c_2 B^(2 stride) + ...)` as dense coefficients.
pub(crate) fn lag_polynomial(coefficients: &[f64], stride: usize, sign: f64) -> Vec<f64> {
	let mut polynomial = vec![0f64; coefficients.len() * stride + 1];
	polynomial[0] = 1f64;
	for (index, each) in coefficients.iter().enumerate() {
		polynomial[(index + 1) * stride] = sign * each;
	}
	polynomial
}

pub(crate) fn multiply(left: &[f64], right: &[f64]) -> Vec<f64> {
	if left.is_empty() || right.is_empty() {
		return Vec::new();
	}

	let mut product = vec![0f64; left.len() + right.len() - 1];
	for (i, a) in left.iter().enumerate() {
		for (j, b) in right.iter().enumerate() {
			product[i + j] += a * b;
		}
	}
	product
}

/// `(1 - B)^d (1 - B^period)^seasonal_d`.
pub(crate) fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
	let plain = (0..d).fold(vec![1f64], |acc, _| multiply(&acc, &[1f64, -1f64]));
	let seasonal_step = lag_polynomial(&[1f64], period.max(1), -1f64);
	(0..seasonal_d).fold(plain, |acc, _| multiply(&acc, &seasonal_step))
}

/// Filters `values` through `polynomial`, dropping the first `degree` points that lack history.
pub(crate) fn apply_polynomial(values: &[f64], polynomial: &[f64]) -> Vec<f64> {
	let degree = polynomial.len().saturating_sub(1);
	if values.len() <= degree {
		return Vec::new();
	}

	(degree..values.len())
		.map(|t| {
			polynomial
				.iter()
				.enumerate()
				.map(|(i, coefficient)| coefficient * values[t - i])
				.sum::<f64>()
		})
		.collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
	if values.is_empty() {
		return f64::NAN;
	}
	values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn differencing_polynomial_expands() {
		assert_eq!(differencing_polynomial(1, 0, 0), vec![1f64, -1f64]);
		assert_eq!(differencing_polynomial(2, 0, 0), vec![1f64, -2f64, 1f64]);
		assert_eq!(
			differencing_polynomial(1, 1, 3),
			vec![1f64, -1f64, 0f64, -1f64, 1f64]
		);
	}

	#[test]
	fn seasonal_lag_polynomial_is_sparse() {
		assert_eq!(lag_polynomial(&[0.5], 4, -1f64), vec![1f64, 0f64, 0f64, 0f64, -0.5]);
		assert_eq!(lag_polynomial(&[], 4, -1f64), vec![1f64]);
	}

	#[test]
	fn polynomial_filter_differences() {
		let values = [1f64, 3f64, 6f64, 10f64];
		assert_eq!(apply_polynomial(&values, &[1f64, -1f64]), vec![2f64, 3f64, 4f64]);
		assert!(apply_polynomial(&values[..1], &[1f64, -1f64]).is_empty());
	}
}
