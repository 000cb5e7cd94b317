use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, Float32Array, Float32Builder, Int32Array, Int32Builder, ListArray,
    ListBuilder, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use tempfile::NamedTempFile;

use super::model::{CacheTable, EemMatrix, SampleMetadata, SampleRecord};
use crate::error::{EemError, Result};

// ---------------------------------------------------------------------------
// Artifact schema
// ---------------------------------------------------------------------------
//
//   batch             Utf8
//   name              Utf8
//   acquisition_time  Timestamp(µs, UTC)
//   excitation        List<Int32>
//   emission          List<Int32>
//   data              List<Float32>   row-major [excitation][emission]

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

pub fn cache_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("batch", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new(
            "acquisition_time",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("excitation", list_of(DataType::Int32), false),
        Field::new("emission", list_of(DataType::Int32), false),
        Field::new("data", list_of(DataType::Float32), false),
    ]))
}

/// Arrow representation of the whole table.
pub fn to_record_batch(table: &CacheTable) -> Result<RecordBatch> {
    let batches = StringArray::from_iter_values(table.iter().map(|r| r.batch.as_str()));
    let names = StringArray::from_iter_values(table.iter().map(|r| r.name.as_str()));
    let times = TimestampMicrosecondArray::from_iter_values(
        table.iter().map(|r| r.metadata.acquisition_time.timestamp_micros()),
    )
    .with_timezone("UTC");

    let mut excitation = ListBuilder::new(Int32Builder::new());
    let mut emission = ListBuilder::new(Int32Builder::new());
    let mut data = ListBuilder::new(Float32Builder::new());
    for record in table.iter() {
        excitation.values().append_slice(&record.metadata.excitation);
        excitation.append(true);
        emission.values().append_slice(&record.metadata.emission);
        emission.append(true);
        data.values().append_slice(record.data.as_slice());
        data.append(true);
    }

    let batch = RecordBatch::try_new(
        cache_schema(),
        vec![
            Arc::new(batches),
            Arc::new(names),
            Arc::new(times),
            Arc::new(excitation.finish()),
            Arc::new(emission.finish()),
            Arc::new(data.finish()),
        ],
    )?;
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Persist
// ---------------------------------------------------------------------------

/// Write `table` to `path`, replacing any previous artifact atomically: the
/// parquet file is written and synced next to `path`, then renamed over it.
pub fn persist(table: &CacheTable, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let batch = to_record_batch(table)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| EemError::Io(e.error))?;

    info!("persisted {} records to {}", table.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load a persisted table. A missing artifact yields `None`.
pub fn load(path: &Path) -> Result<Option<CacheTable>> {
    if !path.exists() {
        debug!("no cache artifact at {}", path.display());
        return Ok(None);
    }

    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        read_batch(&batch, path, &mut records)?;
    }

    debug!("loaded {} cached records from {}", records.len(), path.display());
    Ok(Some(CacheTable::from_records(records)))
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<T>())
        .ok_or_else(|| EemError::parse(path, format!("missing or mistyped column '{name}'")))
}

fn list_values<T: Array + Clone + 'static>(
    list: &ListArray,
    row: usize,
    path: &Path,
) -> Result<T> {
    list.value(row)
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| EemError::parse(path, format!("row {row}: unexpected list item type")))
}

fn read_batch(batch: &RecordBatch, path: &Path, out: &mut Vec<SampleRecord>) -> Result<()> {
    let batches = column::<StringArray>(batch, "batch", path)?;
    let names = column::<StringArray>(batch, "name", path)?;
    let times = column::<TimestampMicrosecondArray>(batch, "acquisition_time", path)?;
    let excitation = column::<ListArray>(batch, "excitation", path)?;
    let emission = column::<ListArray>(batch, "emission", path)?;
    let data = column::<ListArray>(batch, "data", path)?;

    for row in 0..batch.num_rows() {
        let ex: Vec<i32> = list_values::<Int32Array>(excitation, row, path)?
            .values()
            .to_vec();
        let em: Vec<i32> = list_values::<Int32Array>(emission, row, path)?
            .values()
            .to_vec();
        let values: Vec<f32> = list_values::<Float32Array>(data, row, path)?
            .values()
            .to_vec();

        let matrix = EemMatrix::new(ex.len(), em.len(), values).ok_or_else(|| {
            EemError::parse(path, format!("row {row}: data does not match its axes"))
        })?;
        let acquisition_time = DateTime::from_timestamp_micros(times.value(row))
            .ok_or_else(|| EemError::parse(path, format!("row {row}: invalid timestamp")))?;

        out.push(SampleRecord {
            batch: batches.value(row).to_string(),
            name: names.value(row).to_string(),
            metadata: SampleMetadata {
                acquisition_time,
                excitation: ex,
                emission: em,
            },
            data: matrix,
        });
    }
    Ok(())
}
