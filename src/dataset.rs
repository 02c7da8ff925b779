//! Dataset types for safedata.
//!
//! Provides the [`Dataset`] trait and the Arrow-backed [`ArrowDataset`] used
//! by every stage of the pipeline. A dataset is an ordered sequence of
//! RecordBatches sharing one schema; it always has at least one column.

use std::{
    io::{BufReader, Cursor, Seek, SeekFrom},
    path::Path,
    sync::Arc,
};

use arrow::{
    array::RecordBatch,
    compute::concat_batches,
    datatypes::SchemaRef,
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    file::properties::WriterProperties,
};

use crate::{
    error::{Error, Result},
    transform::Transform,
};

/// Number of rows sampled for CSV / JSON schema inference.
const INFER_ROWS: usize = 1000;

/// Rows per record batch when reading CSV.
const CSV_BATCH_SIZE: usize = 8192;

/// A tabular dataset that can be iterated over.
pub trait Dataset: Send + Sync {
    /// Returns the total number of rows in the dataset.
    fn len(&self) -> usize;

    /// Returns true if the dataset contains no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the schema of the dataset.
    fn schema(&self) -> SchemaRef;

    /// Returns an iterator over all RecordBatches in the dataset.
    fn iter(&self) -> Box<dyn Iterator<Item = RecordBatch> + Send + '_>;
}

/// An in-memory dataset backed by Arrow RecordBatches.
///
/// # Example
///
/// ```no_run
/// use safedata::{ArrowDataset, Dataset};
///
/// let dataset = ArrowDataset::open("data/people.csv").unwrap();
/// println!("Dataset has {} rows", dataset.len());
/// ```
#[derive(Debug, Clone)]
pub struct ArrowDataset {
    batches: Vec<RecordBatch>,
    schema: SchemaRef,
    row_count: usize,
}

impl ArrowDataset {
    /// Creates a new ArrowDataset from a vector of RecordBatches.
    ///
    /// Batches with zero rows are allowed; the schema must have at least
    /// one column.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The batches vector is empty
    /// - The schema has no columns
    /// - The batches have inconsistent schemas
    pub fn new(batches: Vec<RecordBatch>) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Err(Error::EmptyDataset);
        };
        let schema = first.schema();

        if schema.fields().is_empty() {
            return Err(Error::schema_mismatch("dataset schema has no columns"));
        }

        for (i, batch) in batches.iter().enumerate().skip(1) {
            if batch.schema() != schema {
                return Err(Error::schema_mismatch(format!(
                    "Batch {} has different schema than batch 0",
                    i
                )));
            }
        }

        let row_count = batches.iter().map(RecordBatch::num_rows).sum();

        Ok(Self {
            batches,
            schema,
            row_count,
        })
    }

    /// Creates an ArrowDataset from a single RecordBatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch schema has no columns.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        Self::new(vec![batch])
    }

    /// Loads a dataset, choosing the reader from the file extension.
    ///
    /// `csv` is the primary format; `parquet` and `json`/`jsonl` are also
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unknown, the file cannot be
    /// read, or it contains no rows.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match extension(path) {
            "csv" => Self::from_csv(path),
            "parquet" => Self::from_parquet(path),
            "json" | "jsonl" => Self::from_json(path),
            ext => Err(Error::unsupported_format(ext)),
        }
    }

    /// Writes the dataset, choosing the writer from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unknown or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent))?;
        }
        match extension(path) {
            "csv" => self.to_csv(path),
            "parquet" => self.to_parquet(path),
            "json" | "jsonl" => self.to_json(path),
            ext => Err(Error::unsupported_format(ext)),
        }
    }

    /// Loads a dataset from a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The file is not valid CSV
    /// - The file has no data rows
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv_with_options(path, CsvOptions::default())
    }

    /// Loads a dataset from a CSV file with options.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the file has no data rows.
    pub fn from_csv_with_options(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
        let mut buf_reader = BufReader::new(file);

        let schema = infer_csv_schema(&mut buf_reader, &options)?;
        buf_reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io(e, path))?;

        read_csv(buf_reader, schema, &options)
    }

    /// Loads a dataset from an in-memory CSV string with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid CSV or has no data rows.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        let options = CsvOptions::default();
        let mut cursor = Cursor::new(data.as_bytes());
        let schema = infer_csv_schema(&mut cursor, &options)?;
        read_csv(Cursor::new(data.as_bytes()), schema, &options)
    }

    /// Saves the dataset to a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        use arrow_csv::WriterBuilder;

        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;

        let mut writer = WriterBuilder::new().with_header(true).build(file);

        for batch in &self.batches {
            writer.write(batch).map_err(Error::Arrow)?;
        }

        Ok(())
    }

    /// Loads a dataset from a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not valid Parquet,
    /// or has no rows.
    pub fn from_parquet(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(Error::Parquet)?
            .build()
            .map_err(Error::Parquet)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        non_empty(batches)
    }

    /// Saves the dataset to a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    pub fn to_parquet(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;

        let props = WriterProperties::builder().build();
        let mut writer =
            ArrowWriter::try_new(file, self.schema.clone(), Some(props)).map_err(Error::Parquet)?;

        for batch in &self.batches {
            writer.write(batch).map_err(Error::Parquet)?;
        }

        writer.close().map_err(Error::Parquet)?;
        Ok(())
    }

    /// Loads a dataset from a JSON Lines file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, parsed, or has no rows.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        use arrow_json::ReaderBuilder;

        let path = path.as_ref();

        let infer_file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
        let (inferred, _) =
            arrow_json::reader::infer_json_schema(BufReader::new(infer_file), Some(INFER_ROWS))
                .map_err(Error::Arrow)?;

        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
        let reader = ReaderBuilder::new(Arc::new(inferred))
            .build(BufReader::new(file))
            .map_err(Error::Arrow)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        non_empty(batches)
    }

    /// Saves the dataset to a JSON Lines file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        use std::io::BufWriter;

        use arrow_json::LineDelimitedWriter;

        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;
        let mut writer = LineDelimitedWriter::new(BufWriter::new(file));

        for batch in &self.batches {
            writer.write(batch).map_err(Error::Arrow)?;
        }

        writer.finish().map_err(Error::Arrow)?;
        Ok(())
    }

    /// Returns the underlying batches.
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Concatenates all batches into one.
    ///
    /// Column-wide statistics (ranges, means, medians) need every row at
    /// once, so the privacy and utility stages work on this form.
    ///
    /// # Errors
    ///
    /// Returns an error if Arrow fails to concatenate the batches.
    pub fn to_single_batch(&self) -> Result<RecordBatch> {
        if self.batches.len() == 1 {
            return Ok(self.batches[0].clone());
        }
        concat_batches(&self.schema, &self.batches).map_err(Error::Arrow)
    }

    /// Returns the column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Returns true if the schema contains `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    /// Applies a transform to the whole dataset and returns a new one.
    ///
    /// The batches are concatenated first so transforms see every row.
    ///
    /// # Errors
    ///
    /// Returns an error if concatenation or the transform fails.
    pub fn with_transform<T: Transform + ?Sized>(&self, transform: &T) -> Result<Self> {
        let batch = self.to_single_batch()?;
        Self::from_batch(transform.apply(batch)?)
    }
}

impl Dataset for ArrowDataset {
    fn len(&self) -> usize {
        self.row_count
    }

    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = RecordBatch> + Send + '_> {
        Box::new(self.batches.iter().cloned())
    }
}

/// Options for parsing CSV files with a header row.
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Delimiter character (default is comma).
    pub delimiter: Option<u8>,
}

impl CsvOptions {
    /// Creates new CSV options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delimiter character.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn infer_csv_schema<R: std::io::Read>(reader: &mut R, options: &CsvOptions) -> Result<SchemaRef> {
    use arrow_csv::reader::Format;

    let mut format = Format::default().with_header(true);
    if let Some(delim) = options.delimiter {
        format = format.with_delimiter(delim);
    }
    let (inferred, _) = format
        .infer_schema(reader, Some(INFER_ROWS))
        .map_err(Error::Arrow)?;
    Ok(Arc::new(inferred))
}

fn read_csv<R: std::io::Read>(
    reader: R,
    schema: SchemaRef,
    options: &CsvOptions,
) -> Result<ArrowDataset> {
    use arrow_csv::ReaderBuilder;

    let mut builder = ReaderBuilder::new(schema)
        .with_batch_size(CSV_BATCH_SIZE)
        .with_header(true);

    if let Some(delim) = options.delimiter {
        builder = builder.with_delimiter(delim);
    }

    let batches: Vec<RecordBatch> = builder
        .build(reader)
        .map_err(Error::Arrow)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::Arrow)?;

    non_empty(batches)
}

/// Loaded files must carry at least one data row.
fn non_empty(batches: Vec<RecordBatch>) -> Result<ArrowDataset> {
    if batches.iter().all(|b| b.num_rows() == 0) {
        return Err(Error::EmptyDataset);
    }
    ArrowDataset::new(batches)
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
mod tests {
    use arrow::{
        array::{Int64Array, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    fn create_test_batch(start: i64, count: usize) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("location", DataType::Utf8, false),
        ]));

        let ids: Vec<i64> = (start..start + count as i64).collect();
        let cities: Vec<String> = ids.iter().map(|i| format!("city_{}", i % 3)).collect();

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(cities)),
            ],
        )
        .ok()
        .unwrap_or_else(|| panic!("Failed to create test batch"))
    }

    #[test]
    fn test_new_dataset() {
        let dataset = ArrowDataset::new(vec![create_test_batch(0, 10)])
            .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        assert_eq!(dataset.len(), 10);
        assert!(!dataset.is_empty());
    }

    #[test]
    fn test_empty_batches_error() {
        let result = ArrowDataset::new(vec![]);
        assert!(matches!(result, Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_schema_without_columns_rejected() {
        let batch = RecordBatch::new_empty(Arc::new(Schema::empty()));
        assert!(ArrowDataset::from_batch(batch).is_err());
    }

    #[test]
    fn test_zero_row_batch_allowed_in_memory() {
        let schema = create_test_batch(0, 1).schema();
        let dataset = ArrowDataset::from_batch(RecordBatch::new_empty(schema))
            .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        assert!(dataset.is_empty());
        assert_eq!(dataset.column_names(), vec!["id", "location"]);
    }

    #[test]
    fn test_schema_mismatch_error() {
        let other = RecordBatch::try_new(
            Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, false)])),
            vec![Arc::new(Int64Array::from(vec![1]))],
        )
        .unwrap_or_else(|e| panic!("batch: {e}"));
        let result = ArrowDataset::new(vec![create_test_batch(0, 2), other]);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_to_single_batch_concatenates() {
        let dataset =
            ArrowDataset::new(vec![create_test_batch(0, 5), create_test_batch(5, 3)])
                .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        assert_eq!(dataset.batches().len(), 2);
        let batch = dataset
            .to_single_batch()
            .unwrap_or_else(|e| panic!("concat: {e}"));
        assert_eq!(batch.num_rows(), 8);
    }

    #[test]
    fn test_has_column() {
        let dataset = ArrowDataset::from_batch(create_test_batch(0, 2))
            .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        assert!(dataset.has_column("location"));
        assert!(!dataset.has_column("income"));
    }

    #[test]
    fn test_csv_roundtrip_via_open_and_save() {
        let dataset = ArrowDataset::from_batch(create_test_batch(0, 10))
            .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        let temp_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("temp dir: {e}"));
        let path = temp_dir.path().join("nested").join("people.csv");

        dataset
            .save(&path)
            .unwrap_or_else(|e| panic!("Should write csv: {e}"));
        let loaded = ArrowDataset::open(&path).unwrap_or_else(|e| panic!("Should load: {e}"));

        assert_eq!(loaded.len(), 10);
        assert_eq!(loaded.column_names(), dataset.column_names());
    }

    #[test]
    fn test_parquet_roundtrip() {
        let dataset = ArrowDataset::from_batch(create_test_batch(0, 10))
            .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        let temp_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("temp dir: {e}"));
        let path = temp_dir.path().join("people.parquet");

        dataset
            .save(&path)
            .unwrap_or_else(|e| panic!("Should write parquet: {e}"));
        let loaded = ArrowDataset::open(&path).unwrap_or_else(|e| panic!("Should load: {e}"));

        assert_eq!(loaded.len(), dataset.len());
        assert_eq!(loaded.schema(), dataset.schema());
    }

    #[test]
    fn test_json_roundtrip() {
        let dataset = ArrowDataset::from_batch(create_test_batch(0, 4))
            .unwrap_or_else(|e| panic!("Should create dataset: {e}"));
        let temp_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("temp dir: {e}"));
        let path = temp_dir.path().join("people.jsonl");

        dataset
            .save(&path)
            .unwrap_or_else(|e| panic!("Should write json: {e}"));
        let loaded = ArrowDataset::open(&path).unwrap_or_else(|e| panic!("Should load: {e}"));
        assert_eq!(loaded.len(), 4);
    }

    #[test]
    fn test_from_csv_str_infers_types() {
        let dataset = ArrowDataset::from_csv_str("id,age,location\n1,34,Delhi\n2,47,Pune\n")
            .unwrap_or_else(|e| panic!("Should parse: {e}"));
        let schema = dataset.schema();
        assert_eq!(dataset.len(), 2);
        assert_eq!(
            schema.field_with_name("age").map(|f| f.data_type().clone()).ok(),
            Some(DataType::Int64)
        );
        assert_eq!(
            schema
                .field_with_name("location")
                .map(|f| f.data_type().clone())
                .ok(),
            Some(DataType::Utf8)
        );
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let result = ArrowDataset::from_csv_str("id,age\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let result = ArrowDataset::open("/nonexistent/path/to/file.csv");
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_open_unsupported_extension() {
        let result = ArrowDataset::open("people.xlsx");
        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_csv_with_semicolon_delimiter() {
        let temp_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("temp dir: {e}"));
        let path = temp_dir.path().join("people.csv");
        std::fs::write(&path, "id;age\n1;30\n2;41\n").unwrap_or_else(|e| panic!("write: {e}"));

        let dataset = ArrowDataset::from_csv_with_options(&path, CsvOptions::new().with_delimiter(b';'))
            .unwrap_or_else(|e| panic!("Should load: {e}"));
        assert_eq!(dataset.column_names(), vec!["id", "age"]);
    }
}
