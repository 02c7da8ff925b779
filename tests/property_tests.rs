//! Property tests for risk metrics, generalization and synthetic data.

#![allow(clippy::unwrap_used, clippy::cast_precision_loss)]

use std::sync::Arc;

use arrow::{
    array::{Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use proptest::prelude::*;
use safedata::{
    column,
    privacy::Generalize,
    risk::{journalist_risk, k_anonymity, prosecutor_risk},
    utility::{pearson, split_indices},
    ArrowDataset, KValue, SyntheticGenerator, Transform,
};

fn people(ages: &[i64], locations: &[String]) -> ArrowDataset {
    let ids: Vec<i64> = (1..=ages.len() as i64).collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("age", DataType::Int64, false),
        Field::new("location", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Int64Array::from(ages.to_vec())),
            Arc::new(StringArray::from(locations.to_vec())),
        ],
    )
    .unwrap();
    ArrowDataset::from_batch(batch).unwrap()
}

fn rows() -> impl Strategy<Value = (Vec<i64>, Vec<String>)> {
    (1usize..60).prop_flat_map(|n| {
        (
            prop::collection::vec(0i64..100, n),
            prop::collection::vec(
                prop::sample::select(vec!["Mumbai", "Delhi", "Pune", "Agra"]).prop_map(String::from),
                n,
            ),
        )
    })
}

proptest! {
    #[test]
    fn prop_k_bounded_by_rows((ages, locations) in rows()) {
        let data = people(&ages, &locations);
        let result = k_anonymity(&data, &["age", "location"], 5).unwrap();
        match result.value {
            KValue::Finite(k) => {
                prop_assert!(k >= 1);
                prop_assert!(k <= ages.len());
                prop_assert!(result.risky_groups <= result.group_count);
            }
            KValue::Infinite => prop_assert!(false, "complete rows give a finite k"),
        }
    }

    #[test]
    fn prop_fewer_qis_never_lower_k((ages, locations) in rows()) {
        let data = people(&ages, &locations);
        let both = k_anonymity(&data, &["age", "location"], 5).unwrap().value.finite().unwrap();
        let one = k_anonymity(&data, &["location"], 5).unwrap().value.finite().unwrap();
        prop_assert!(one >= both);
    }

    #[test]
    fn prop_generalized_ages_are_floors((ages, locations) in rows()) {
        let data = people(&ages, &locations);
        let batch = Generalize::with_defaults().apply(data.to_single_batch().unwrap()).unwrap();
        let generalized = column::numeric_values(&batch, "age").unwrap();
        for (before, after) in ages.iter().zip(generalized) {
            prop_assert_eq!(after, Some(((before / 10) * 10) as f64));
        }
    }

    #[test]
    fn prop_risk_scores_in_unit_interval(k in 1usize..1000, extra in 0usize..1000) {
        let n = k + extra;
        let prosecutor = prosecutor_risk(k);
        let journalist = journalist_risk(k, n);
        prop_assert!(prosecutor > 0.0 && prosecutor <= 1.0);
        prop_assert!(journalist > 0.0 && journalist <= 1.0);
    }

    #[test]
    fn prop_synthetic_ids_sequential((ages, locations) in rows(), n in 1usize..40, seed in any::<u64>()) {
        let data = people(&ages, &locations);
        let out = SyntheticGenerator::new(n)
            .with_seed(seed)
            .apply(data.to_single_batch().unwrap())
            .unwrap();
        prop_assert_eq!(out.num_rows(), n);
        let ids = column::numeric_values(&out, "id").unwrap();
        let expected: Vec<Option<f64>> = (1..=n).map(|i| Some(i as f64)).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_pearson_bounded(values in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 2..50)) {
        let a: Vec<Option<f64>> = values.iter().map(|(x, _)| Some(*x)).collect();
        let b: Vec<Option<f64>> = values.iter().map(|(_, y)| Some(*y)).collect();
        let r = pearson(&a, &b);
        prop_assert!((-1.0..=1.0).contains(&r));
    }

    #[test]
    fn prop_split_partitions_indices(n in 2usize..200, seed in any::<u64>()) {
        let (train, test) = split_indices(n, 0.3, seed);
        prop_assert!(!train.is_empty());
        prop_assert!(!test.is_empty());
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
    }
}
