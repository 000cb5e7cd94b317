use std::error::Error;

use chrono::DateTime;
use proptest::prelude::*;
use rusty_eem::data::cache;
use rusty_eem::{CacheTable, EemMatrix, SampleMetadata, SampleRecord};
use tempfile::tempdir;

fn record_strategy() -> impl Strategy<Value = SampleRecord> {
    (1usize..5, 1usize..6, "[a-z]{1,8}", "[A-Za-z0-9 ]{1,12}", 0i64..2_000_000_000)
        .prop_flat_map(|(rows, cols, batch, name, secs)| {
            (
                prop::collection::vec(-1.0e6f32..1.0e6, rows * cols),
                prop::collection::vec(200i32..800, rows),
                prop::collection::vec(200i32..900, cols),
                Just((rows, cols, batch, name, secs)),
            )
        })
        .prop_map(|(values, excitation, emission, (rows, cols, batch, name, secs))| SampleRecord {
            batch: format!("{batch}.csv"),
            name,
            metadata: SampleMetadata {
                acquisition_time: DateTime::from_timestamp(secs, 0).unwrap(),
                excitation,
                emission,
            },
            data: EemMatrix::new(rows, cols, values).unwrap(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn persisted_tables_load_back_equal(records in prop::collection::vec(record_strategy(), 0..6)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.parquet");
        let table = CacheTable::from_records(records);

        cache::persist(&table, &path).unwrap();
        let loaded = cache::load(&path).unwrap().unwrap();
        prop_assert_eq!(loaded, table);
    }
}

#[test]
fn missing_intensities_survive_as_nan() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("cache.parquet");
    let record = SampleRecord {
        batch: "run1.csv".to_string(),
        name: "S1".to_string(),
        metadata: SampleMetadata {
            acquisition_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            excitation: vec![250, 260],
            emission: vec![300],
        },
        data: EemMatrix::new(2, 1, vec![1.5, f32::NAN]).unwrap(),
    };
    cache::persist(&CacheTable::from_records(vec![record]), &path)?;

    let loaded = cache::load(&path)?.unwrap();
    let data = loaded.records()[0].data.as_slice();
    assert_eq!(data[0], 1.5);
    assert!(data[1].is_nan());
    Ok(())
}
