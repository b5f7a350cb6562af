//! Save the final event table to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray},
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::DateTime;
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{cli::create_progress_bar, table::Table};

const FLOAT_COLUMNS: [&str; 13] = [
    "latitude",
    "longitude",
    "depth",
    "mag",
    "nst",
    "gap",
    "dmin",
    "rms",
    "horizontalError",
    "depthError",
    "magError",
    "magNst",
    "offset_distance",
];

const TIMESTAMP_COLUMNS: [&str; 2] = ["time", "updated"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Float,
    Timestamp,
    Text,
}

impl ColumnKind {
    fn for_column(name: &str) -> Self {
        if FLOAT_COLUMNS.contains(&name) {
            ColumnKind::Float
        } else if TIMESTAMP_COLUMNS.contains(&name) {
            ColumnKind::Timestamp
        } else {
            ColumnKind::Text
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            ColumnKind::Text => DataType::Utf8,
        }
    }

    /// Builds one column of a batch. Values that do not parse become nulls.
    fn build(self, rows: &[Vec<String>], idx: usize) -> ArrayRef {
        match self {
            ColumnKind::Float => {
                let values: Vec<Option<f64>> = rows
                    .iter()
                    .map(|row| row[idx].trim().parse::<f64>().ok())
                    .collect();
                Arc::new(Float64Array::from(values))
            }
            ColumnKind::Timestamp => {
                let values: Vec<Option<i64>> = rows
                    .iter()
                    .map(|row| {
                        DateTime::parse_from_rfc3339(row[idx].trim())
                            .ok()
                            .map(|t| t.timestamp_millis())
                    })
                    .collect();
                Arc::new(TimestampMillisecondArray::from(values).with_timezone("UTC"))
            }
            ColumnKind::Text => {
                let values: Vec<Option<&str>> = rows
                    .iter()
                    .map(|row| Some(row[idx].as_str()).filter(|v| !v.is_empty()))
                    .collect();
                Arc::new(StringArray::from(values))
            }
        }
    }
}

pub fn save_events(table: &Table, file_path: &Path) -> Result<()> {
    let chunk_size = 100000;

    let kinds: Vec<ColumnKind> = table
        .headers
        .iter()
        .map(|h| ColumnKind::for_column(h))
        .collect();

    let fields: Vec<Field> = table
        .headers
        .iter()
        .zip(&kinds)
        .map(|(name, kind)| Field::new(name, kind.data_type(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let file = File::create(file_path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let pb = create_progress_bar(table.len() as u64, "Writing parquet file".to_string());

    for chunk in table.rows.chunks(chunk_size) {
        let columns: Vec<ArrayRef> = kinds
            .iter()
            .enumerate()
            .map(|(idx, kind)| kind.build(chunk, idx))
            .collect();

        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        writer.write(&batch)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_with_message("Finished writing Parquet file");
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    #[test]
    fn should_type_known_columns() {
        assert_eq!(ColumnKind::for_column("mag"), ColumnKind::Float);
        assert_eq!(ColumnKind::for_column("time"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::for_column("county"), ColumnKind::Text);
    }

    #[test]
    fn should_write_readable_parquet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.parquet");
        let table = Table::from_reader(
            "time,mag,earthquake_id,offset_distance,county\n2024-03-01T10:00:00.000Z,2.1,us1,3.0,Sangamon\n2024-03-02T11:00:00.000Z,3.4,ak2,,Anchorage\n"
                .as_bytes(),
        )
        .unwrap();

        save_events(&table, &path).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let batch = &batches[0];

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Float64);

        let offsets = batch
            .column(3)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(offsets.value(0), 3.0);
        assert!(offsets.is_null(1));

        let times = batch
            .column(0)
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        assert_eq!(times.value(0), 1_709_287_200_000);
    }
}
