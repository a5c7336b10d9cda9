use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FetchError, FetchResult};

/// Header of the identifier column in every output file.
pub const CODE_HEADER: &str = "CPICode";

// ----------------------- Input -----------------------
/// Reads the series-code column from a headed CSV, keeping every data row
/// in file order.
pub fn load_series_codes(path: &Path, column: &str) -> FetchResult<Vec<String>> {
    let input_err = |source: csv::Error| FetchError::Input {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(input_err)?;

    let headers = reader.headers().map_err(input_err)?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| FetchError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
            available: headers.iter().collect::<Vec<_>>().join(", "),
        })?;

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record.map_err(input_err)?;
        codes.push(record.get(idx).unwrap_or_default().to_string());
    }
    Ok(codes)
}

// ----------------------- Series table -----------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationRow {
    /// Position of the observation inside its returned series; written as
    /// the leading index column.
    pub position: usize,
    /// Index of the returned series inside the response.
    pub series_id: usize,
    pub year: Option<String>,
    pub period: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesTable {
    pub code: String,
    pub rows: Vec<ObservationRow>,
}

impl SeriesTable {
    pub fn new(code: &str) -> Self {
        SeriesTable {
            code: code.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn extend(&mut self, rows: Vec<ObservationRow>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes `,year,period,value,CPICode`. Every row carries the table's
    /// code. An empty table still gets its header line.
    pub fn write_csv(&self, path: &Path) -> FetchResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FetchError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let out_err = |source: csv::Error| FetchError::Output {
            path: path.to_path_buf(),
            source,
        };

        let mut wtr = csv::Writer::from_path(path).map_err(out_err)?;
        wtr.write_record(["", "year", "period", "value", CODE_HEADER])
            .map_err(out_err)?;

        for row in &self.rows {
            wtr.write_record([
                row.position.to_string().as_str(),
                row.year.as_deref().unwrap_or_default(),
                row.period.as_deref().unwrap_or_default(),
                row.value.as_deref().unwrap_or_default(),
                self.code.as_str(),
            ])
            .map_err(out_err)?;
        }

        wtr.flush().map_err(|e| out_err(e.into()))?;
        Ok(())
    }
}

/// `<prefix><j>.csv`, or `<prefix><code>.csv` when naming by code.
pub fn output_path(prefix: &str, index: usize, code: &str, name_by_code: bool) -> PathBuf {
    let stem = if name_by_code {
        code.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    } else {
        index.to_string()
    };
    PathBuf::from(format!("{}{}.csv", prefix, stem))
}
