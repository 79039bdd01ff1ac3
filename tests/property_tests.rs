//! Property checks on aggregation and gap filling.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use project_ampere_lib::{
	preprocess::{
		command::{aggregate, fill_gaps},
		typedef::{Frequency, Metric},
	},
	CellValue, RawTable,
};

fn sessions_table(sessions: &[(i64, f64)]) -> RawTable {
	let start = NaiveDate::from_ymd_opt(2019, 6, 1)
		.unwrap()
		.and_hms_opt(0, 0, 0)
		.unwrap();

	RawTable::new(
		vec![String::from("connectionTime"), String::from("kWhDelivered")],
		sessions
			.iter()
			.map(|(minutes, energy)| {
				vec![
					CellValue::DateTime(start + Duration::minutes(*minutes)),
					CellValue::Number(*energy),
				]
			})
			.collect(),
	)
}

fn frequency() -> impl Strategy<Value = Frequency> {
	prop_oneof![Just(Frequency::HOURLY), Just(Frequency::DAILY)]
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(50))]

	#[test]
	fn buckets_are_unique_and_ordered(
		sessions in prop::collection::vec((0i64..20_000, 0f64..80f64), 1..200),
		freq in frequency(),
	) {
		let series = aggregate(&sessions_table(&sessions), None, freq);

		prop_assert!(series.buckets.windows(2).all(|pair| pair[0].ts < pair[1].ts));
		prop_assert!(series.buckets.iter().all(|each| freq.truncate(each.ts) == each.ts));
		prop_assert_eq!(series.buckets.iter().map(|each| each.sessions).sum::<u64>(), sessions.len() as u64);

		let total = sessions.iter().map(|(_, energy)| energy).sum::<f64>();
		let bucketed = series.buckets.iter().map(|each| each.energy_kwh).sum::<f64>();
		prop_assert!((total - bucketed).abs() < 1e-6 * total.max(1f64));
	}

	#[test]
	fn gap_filling_keeps_every_bucket(
		sessions in prop::collection::vec((0i64..5_000, 0f64..80f64), 1..100),
		freq in frequency(),
	) {
		let series = aggregate(&sessions_table(&sessions), None, freq);
		let (timestamps, values) = fill_gaps(&series, Metric::SESSIONS);

		prop_assert_eq!(timestamps.len(), values.len());
		prop_assert!(timestamps.windows(2).all(|pair| pair[1] - pair[0] == freq.step()));
		prop_assert_eq!(values.iter().sum::<f64>(), sessions.len() as f64);
		prop_assert_eq!(values.iter().filter(|each| **each > 0f64).count(), series.len());
	}
}
