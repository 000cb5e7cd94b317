mod common;

use std::error::Error;

use common::{intensity, write_export, EMISSION, EXCITATION};
use rusty_eem::data::ingest::{self, IngestionManager};
use rusty_eem::{AppConfig, CorrectionMode, EemError};
use tempfile::tempdir;

fn open(dir: &std::path::Path, purge: bool) -> Result<IngestionManager, EemError> {
    IngestionManager::open(dir, CorrectionMode::Raw, &AppConfig::default(), purge)
}

#[test]
fn two_files_two_samples_each() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1", "S2"], 1)?;
    write_export(dir.path(), "run2.csv", &["S1", "S2"], 2)?;

    let table = ingest::load(dir.path(), CorrectionMode::Raw, false)?;
    assert_eq!(table.len(), 4);

    let keys: Vec<_> = table.iter().map(|r| (r.batch.as_str(), r.name.as_str())).collect();
    assert_eq!(
        keys,
        vec![("run1.csv", "S1"), ("run1.csv", "S2"), ("run2.csv", "S1"), ("run2.csv", "S2")]
    );

    let second = &table.records()[1];
    assert_eq!(second.metadata.excitation, EXCITATION.to_vec());
    assert_eq!(second.metadata.emission, EMISSION.to_vec());
    assert_eq!(second.data.shape(), (EXCITATION.len(), EMISSION.len()));
    assert_eq!(second.data.get(2, 1), intensity(1, EXCITATION[2], EMISSION[1]));
    assert_eq!(
        second.metadata.acquisition_time.timestamp(),
        1_700_000_001
    );
    Ok(())
}

#[test]
fn second_ingest_is_idempotent() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1", "S2"], 1)?;

    let mut first = open(dir.path(), false)?;
    let report = first.ingest()?;
    assert!(report.persisted);
    let bytes = std::fs::read(first.cache_path())?;

    let mut second = open(dir.path(), false)?;
    let report = second.ingest()?;
    assert!(report.new_files.is_empty());
    assert!(!report.persisted);
    assert_eq!(second.table(), first.table());
    assert_eq!(std::fs::read(second.cache_path())?, bytes);
    Ok(())
}

#[test]
fn new_files_append_after_existing_records() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1", "S2"], 1)?;
    let before = ingest::load(dir.path(), CorrectionMode::Raw, false)?;

    write_export(dir.path(), "run2.csv", &["S3"], 2)?;
    let mut manager = open(dir.path(), false)?;
    let report = manager.ingest()?;
    assert_eq!(report.new_files, vec!["run2.csv"]);
    assert_eq!(report.records_added, 1);

    let after = manager.table();
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(&after.records()[..before.len()], before.records());
    assert_eq!(after.records()[2].name, "S3");
    Ok(())
}

#[test]
fn files_are_processed_oldest_first() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "z.csv", &["S1"], 1)?;
    write_export(dir.path(), "a.csv", &["S1"], 2)?;
    write_export(dir.path(), "b.csv", &["S1"], 2)?;

    let table = ingest::load(dir.path(), CorrectionMode::Raw, false)?;
    assert_eq!(table.batches(), vec!["z.csv", "a.csv", "b.csv"]);
    Ok(())
}

#[test]
fn removed_files_keep_their_records() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let first = write_export(dir.path(), "run1.csv", &["S1", "S2"], 1)?;
    write_export(dir.path(), "run2.csv", &["S1", "S2"], 2)?;
    ingest::load(dir.path(), CorrectionMode::Raw, false)?;

    std::fs::remove_file(first)?;
    let mut manager = open(dir.path(), false)?;
    let report = manager.ingest()?;
    assert_eq!(report.files_found, 1);
    assert_eq!(manager.table().len(), 4);
    assert_eq!(manager.table().names_in_batch("run1.csv"), vec!["S1", "S2"]);
    Ok(())
}

#[test]
fn parse_failure_leaves_the_artifact_untouched() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1"], 1)?;
    let mut manager = open(dir.path(), false)?;
    manager.ingest()?;
    let bytes = std::fs::read(manager.cache_path())?;
    let before = manager.table().clone();

    std::fs::write(dir.path().join("broken.csv"), "Wavelength,Intensity\n300,1\n")?;
    common::set_age(&dir.path().join("broken.csv"), 2)?;
    write_export(dir.path(), "run3.csv", &["S1"], 3)?;

    let err = manager.ingest().unwrap_err();
    assert!(matches!(err, EemError::Parse { .. }));
    assert!(err.to_string().contains("broken.csv"));
    assert_eq!(manager.table(), &before);
    assert_eq!(std::fs::read(manager.cache_path())?, bytes);
    Ok(())
}

#[test]
fn purge_rebuilds_from_sources() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1"], 1)?;
    ingest::load(dir.path(), CorrectionMode::Raw, false)?;

    std::fs::write(
        dir.path().join("rename.json"),
        r#"{ "run1.csv": { "S1": "Humic acid" } }"#,
    )?;
    // Without a purge the alias does not reach already cached records.
    let table = ingest::load(dir.path(), CorrectionMode::Raw, false)?;
    assert_eq!(table.records()[0].name, "S1");

    let table = ingest::load(dir.path(), CorrectionMode::Raw, true)?;
    assert_eq!(table.len(), 1);
    assert_eq!(table.records()[0].name, "Humic acid");
    Ok(())
}

#[test]
fn corrected_mode_keeps_a_separate_artifact() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1"], 1)?;

    let raw = ingest::load(dir.path(), CorrectionMode::Raw, false)?;
    let corrected = ingest::load(dir.path(), CorrectionMode::Corrected, false)?;

    assert!(dir.path().join("rawdata_cache.parquet").exists());
    assert!(dir.path().join("corrected_rawdata_cache.parquet").exists());

    let (raw, corrected) = (&raw.records()[0], &corrected.records()[0]);
    assert_eq!(raw.metadata, corrected.metadata);
    // At 250 nm excitation the first order Raman band ends below 300 nm.
    assert_eq!(corrected.data.row(0), raw.data.row(0));
    assert_ne!(corrected.data, raw.data);
    assert!(corrected.data.as_slice().iter().all(|v| v.is_finite()));
    Ok(())
}

#[test]
fn malformed_alias_file_is_an_error() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_export(dir.path(), "run1.csv", &["S1"], 1)?;
    std::fs::write(dir.path().join("rename.json"), "{ not json")?;

    let err = ingest::load(dir.path(), CorrectionMode::Raw, false).unwrap_err();
    assert!(matches!(err, EemError::Json(_)));
    assert!(!dir.path().join("rawdata_cache.parquet").exists());
    Ok(())
}
