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

/// Non-seasonal `(p, d, q)`.
#[derive(Default, PartialEq, Eq, Deserialize, Serialize, Clone, Copy, Debug, Hash)]
pub struct Order(pub usize, pub usize, pub usize);

impl Order {
	pub const DEFAULT: Order = Order(1, 1, 1);
	pub const NONE: Order = Order(0, 0, 0);
}

impl std::fmt::Display for Order {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({},{},{})", self.0, self.1, self.2)
	}
}

/// Seasonal `(P, D, Q, period)`.
#[derive(Default, PartialEq, Eq, Deserialize, Serialize, Clone, Copy, Debug, Hash)]
pub struct SeasonalOrder(pub usize, pub usize, pub usize, pub usize);

impl SeasonalOrder {
	pub const NONE: SeasonalOrder = SeasonalOrder(0, 0, 0, 0);

	/// A period of 0 or 1 carries no seasonality at all.
	pub fn effective(self) -> SeasonalOrder {
		if self.3 <= 1 {
			SeasonalOrder::NONE
		} else {
			self
		}
	}

	pub fn period(&self) -> usize {
		self.3
	}
}

impl std::fmt::Display for SeasonalOrder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({},{},{},{})", self.0, self.1, self.2, self.3)
	}
}

#[derive(Default, PartialEq, Eq, Serialize, Clone, Copy, Debug, Hash)]
pub struct ModelSpec {
	pub order: Order,
	pub seasonal_order: SeasonalOrder,
}

impl ModelSpec {
	pub fn new(order: Order, seasonal_order: SeasonalOrder) -> Self {
		Self {
			order,
			seasonal_order: seasonal_order.effective(),
		}
	}

	/// Total differencing span, `d + D * period`.
	pub fn differencing_span(&self) -> usize {
		self.order.1 + self.seasonal_order.1 * self.seasonal_order.3
	}

	pub fn has_mean(&self) -> bool {
		self.order.1 == 0 && self.seasonal_order.1 == 0
	}

	/// Estimated coefficients, excluding the innovation variance.
	pub fn param_count(&self) -> usize {
		self.order.0 + self.order.2 + self.seasonal_order.0 + self.seasonal_order.2 + usize::from(self.has_mean())
	}
}

impl std::fmt::Display for ModelSpec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}_{}", self.order, self.seasonal_order)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
	pub max_iter: usize,
	pub tolerance: f64,
}

impl Default for FitOptions {
	fn default() -> Self {
		Self {
			max_iter: 1000,
			tolerance: 1e-8,
		}
	}
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
	pub spec: ModelSpec,
	pub aic: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SearchOutcome {
	pub best: Candidate,
	pub evaluated: Vec<Candidate>,
	pub failures: usize,
}

/// One step ahead with its two-sided interval.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct StepForecast {
	pub mean: f64,
	pub lower: f64,
	pub upper: f64,
}
