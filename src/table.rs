use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::domain::{NULL_SYMBOL, SightError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Categorical => write!(f, "categorical"),
            ColumnKind::Numeric => write!(f, "numeric"),
        }
    }
}

/// Cell storage. Integer columns keep their exact values; floats widen into
/// `Numeric`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Numeric(Vec<Option<f64>>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
        }
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            ColumnData::Integer(v) => ColumnData::Integer(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
        }
    }

    /// Present values of a numeric column as `f64`, for statistics and axes.
    pub fn widened(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Text(_) => None,
            ColumnData::Integer(v) => Some(v.iter().flatten().map(|&i| i as f64).collect()),
            ColumnData::Numeric(v) => Some(v.iter().flatten().copied().collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn text<S: AsRef<str>>(name: &str, values: Vec<Option<S>>) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Text(
                values
                    .into_iter()
                    .map(|v| v.map(|s| s.as_ref().to_string()))
                    .collect(),
            ),
        }
    }

    /// `NaN` cells are stored as missing.
    pub fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Numeric(
                values
                    .into_iter()
                    .map(|v| v.filter(|f| !f.is_nan()))
                    .collect(),
            ),
        }
    }

    pub fn integer(name: &str, values: Vec<Option<i64>>) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Integer(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Text(_) => ColumnKind::Categorical,
            ColumnData::Integer(_) | ColumnData::Numeric(_) => ColumnKind::Numeric,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Text(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Integer(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Min and max over the non-missing cells of a numeric column.
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        self.data.widened()?.into_iter().fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
    }

    /// Exact min and max of an integer column.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match &self.data {
            ColumnData::Integer(v) => {
                let lo = v.iter().flatten().min()?;
                let hi = v.iter().flatten().max()?;
                Some((*lo, *hi))
            }
            _ => None,
        }
    }

    pub fn display_cell(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Text(v) => match &v[row] {
                Some(s) => s.replace("\r\n", " ↵ ").replace('\n', " ↵ "),
                None => NULL_SYMBOL.to_string(),
            },
            ColumnData::Integer(v) => match v[row] {
                Some(i) => i.to_string(),
                None => NULL_SYMBOL.to_string(),
            },
            ColumnData::Numeric(v) => match v[row] {
                Some(f) => format_number(f),
                None => NULL_SYMBOL.to_string(),
            },
        }
    }
}

/// Whole numbers print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Fails unless every column has the same length as the first one.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, SightError> {
        if let Some(first) = columns.first()
            && let Some(ragged) = columns.iter().find(|c| c.len() != first.len())
        {
            return Err(SightError::RaggedColumn {
                column: ragged.name.clone(),
                expected: first.len(),
                found: ragged.len(),
            });
        }
        Ok(Table {
            name: name.into(),
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column, SightError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SightError::UnknownColumn(name.to_string()))
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Trim and lowercase every header. Fails when two headers collapse onto
    /// the same name.
    pub fn normalize_headers(mut self) -> Result<Self, SightError> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in self.columns.iter_mut() {
            column.name = column.name.trim().to_lowercase();
            if !seen.insert(column.name.clone()) {
                return Err(SightError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(self)
    }

    /// New table holding `rows` (indices into this table) in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(rows),
                })
                .collect(),
        }
    }

    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..std::cmp::min(n, self.nrows())).collect();
        self.take(&rows)
    }

    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Table, SightError> {
        let file_info = Table::get_file_info(path.to_path_buf())?;
        let frame = match file_info.file_type {
            FileType::CSV => Table::load_csv(&file_info.path)?,
            FileType::PARQUET => Table::load_parquet(&file_info.path)?,
            FileType::ARROW => Table::load_arrow(&file_info.path)?,
        };
        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        info!(
            "Loading {:?} file {} ({} bytes)",
            file_info.file_type, name, file_info.file_size
        );
        let df = frame.collect()?;
        Table::from_dataframe(name, &df)
    }

    #[instrument(skip(bytes), fields(bytes = bytes.len()))]
    pub fn from_csv_bytes(name: &str, bytes: Vec<u8>) -> Result<Table, SightError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Table::from_dataframe(name.to_string(), &df)
    }

    // Each column is converted in its own thread. Cells become owned Strings
    // or f64 values, so the frame can be dropped afterwards.
    fn from_dataframe(name: String, df: &DataFrame) -> Result<Table, SightError> {
        let start_time = Instant::now();
        let c_: Result<Vec<Column>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(df, name))
            .collect();
        let columns = c_?;

        let loading_duration = start_time.elapsed().as_millis();
        info!(
            "Converted {} columns x {} rows in {loading_duration}ms",
            columns.len(),
            df.height()
        );
        for c in columns.iter() {
            debug!(
                "Column \"{}\", {}, {} missing",
                c.name,
                c.kind(),
                c.missing_count()
            );
        }
        Table::new(name, columns)?.normalize_headers()
    }

    // UInt64 can exceed i64 and is read as a float column instead.
    fn is_integer_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
        )
    }

    fn is_numeric_type(dtype: &DataType) -> bool {
        Table::is_integer_type(dtype)
            || matches!(dtype, DataType::UInt64 | DataType::Float32 | DataType::Float64)
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
        let source = df.column(col_name)?;
        if Table::is_integer_type(source.dtype()) {
            let col = source.cast(&DataType::Int64)?;
            let values: Vec<Option<i64>> = col.i64()?.into_iter().collect();
            Ok(Column::integer(col_name, values))
        } else if Table::is_numeric_type(source.dtype()) {
            let col = source.cast(&DataType::Float64)?;
            let values: Vec<Option<f64>> = col.f64()?.into_iter().collect();
            Ok(Column::numeric(col_name, values))
        } else {
            let col = source.cast(&DataType::String)?;
            let values: Vec<Option<&str>> = col.str()?.into_iter().collect();
            Ok(Column::text(col_name, values))
        }
    }

    fn detect_file_type(path: &Path) -> Result<FileType, SightError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(SightError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, SightError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SightError::FileNotFound,
            ErrorKind::PermissionDenied => SightError::PermissionDenied,
            _ => SightError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(SightError::load("Not a file!"));
        }

        let file_size = metadata.len();
        let file_type = Table::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size,
            file_type,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .with_infer_schema_length(None)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}
