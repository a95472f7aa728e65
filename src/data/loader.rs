use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dimension, ExportDataset, ExportRecord, NO_DATA};
use crate::error::{LoadError, LoadWarning};

pub const PERIOD_COLUMN: &str = "GESTION";
pub const MONTH_COLUMN: &str = "MES";
pub const VALUE_COLUMN: &str = "VALOR";
pub const WEIGHT_COLUMN: &str = "KILNET";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Result of assembling the dataset from all configured sources.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub dataset: ExportDataset,
    pub warnings: Vec<LoadWarning>,
}

/// Rows read from one source file.
#[derive(Debug, Default)]
pub struct SourceTable {
    pub records: Vec<ExportRecord>,
    /// Rows dropped because their year or month was unusable.
    pub skipped_rows: usize,
}

/// Load and concatenate every source, in order.
///
/// Never fails: a missing or unreadable file contributes no rows and is
/// reported as a warning, so the caller can still run on whatever loaded.
pub fn load_sources(paths: &[PathBuf]) -> LoadReport {
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for path in paths {
        if !path.exists() {
            log::warn!("Export source {} not found, continuing without it", path.display());
            warnings.push(LoadWarning::MissingSource(path.clone()));
            continue;
        }
        match load_file(path) {
            Ok(table) => {
                log::info!(
                    "Read {} export rows from {}",
                    table.records.len(),
                    path.display()
                );
                if table.skipped_rows > 0 {
                    log::warn!(
                        "{} rows in {} have no usable year/month",
                        table.skipped_rows,
                        path.display()
                    );
                    warnings.push(LoadWarning::SkippedRows {
                        path: path.clone(),
                        count: table.skipped_rows,
                    });
                }
                records.extend(table.records);
            }
            Err(e) => {
                log::error!("Failed to read {}: {e}", path.display());
                warnings.push(LoadWarning::UnreadableSource {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let dataset = ExportDataset::from_records(records);
    log::info!(
        "Dataset ready: {} records, years {:?}",
        dataset.len(),
        dataset.periods().collect::<Vec<_>>()
    );
    LoadReport { dataset, warnings }
}

/// Load one export table.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per field (recommended)
/// * `.csv`     – header row with the source column names
/// * `.json`    – `[{ "GESTION": 2024, "MES": 1, ... }, ...]`
pub fn load_file(path: &Path) -> Result<SourceTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "parquet" | "pq" => read_parquet(path)?,
        "json" => read_json(path)?,
        "csv" => read_csv(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    let mut table = SourceTable::default();
    for row in rows {
        match row.normalize() {
            Some(rec) => table.records.push(rec),
            None => table.skipped_rows += 1,
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Raw rows and normalization
// ---------------------------------------------------------------------------

/// A row as read from disk, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub period: Option<f64>,
    pub month: Option<f64>,
    /// Indexed like [`Dimension::ALL`].
    pub categories: [Option<String>; 6],
    pub value: Option<f64>,
    pub net_weight: Option<f64>,
}

impl RawRow {
    /// Apply the load-time cleaning rules.
    ///
    /// Returns `None` when the row cannot be placed in a year/month selector.
    pub fn normalize(self) -> Option<ExportRecord> {
        let period = self.period.filter(|p| p.is_finite())?.round_ties_even();
        let month = self.month.filter(|m| m.is_finite())?.round_ties_even();
        if !(1.0..=12.0).contains(&month) || period < i32::MIN as f64 || period > i32::MAX as f64 {
            return None;
        }

        let [country, product, category, industry, activity, department] =
            self.categories.map(category_or_placeholder);

        Some(ExportRecord {
            period: period as i32,
            month: month as u8,
            destination_country: country,
            product_code: product,
            economic_category: category,
            industry_class: industry,
            economic_activity: activity,
            origin_department: department,
            value: normalize_measure(self.value),
            net_weight: normalize_measure(self.net_weight),
        })
    }
}

/// Round to whole units (half to even); missing, NaN and negative become 0.
/// Values beyond `u64::MAX` are pinned there.
pub fn normalize_measure(raw: Option<f64>) -> u64 {
    match raw {
        Some(v) if v.is_finite() && v > 0.0 => v.round_ties_even() as u64,
        _ => 0,
    }
}

fn category_or_placeholder(raw: Option<String>) -> String {
    match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => NO_DATA.to_string(),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the source column names, one shipment per row.
/// Extra columns are ignored.
fn read_csv(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(LoadError::MissingColumn(name))
    };

    let period_idx = position(PERIOD_COLUMN)?;
    let month_idx = position(MONTH_COLUMN)?;
    let value_idx = position(VALUE_COLUMN)?;
    let weight_idx = position(WEIGHT_COLUMN)?;
    let mut category_idx = [0usize; 6];
    for (slot, dim) in category_idx.iter_mut().zip(Dimension::ALL) {
        *slot = position(dim.column())?;
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let text = |idx: usize| record.get(idx).map(str::to_string);
        rows.push(RawRow {
            period: record.get(period_idx).and_then(parse_number),
            month: record.get(month_idx).and_then(parse_number),
            categories: category_idx.map(text),
            value: record.get(value_idx).and_then(parse_number),
            net_weight: record.get(weight_idx).and_then(parse_number),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "GESTION": 2024, "MES": 1, "DESPAIS": "Chile", ..., "VALOR": 1520.4, "KILNET": 80.0 },
///   ...
/// ]
/// ```
fn read_json(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected top-level JSON array".into()))?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .ok_or_else(|| LoadError::Malformed(format!("row {i} is not a JSON object")))?;
            let number = |col: &str| obj.get(col).and_then(json_to_number);
            Ok(RawRow {
                period: number(PERIOD_COLUMN),
                month: number(MONTH_COLUMN),
                categories: Dimension::ALL.map(|dim| obj.get(dim.column()).and_then(json_to_text)),
                value: number(VALUE_COLUMN),
                net_weight: number(WEIGHT_COLUMN),
            })
        })
        .collect()
}

fn json_to_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_number(s),
        _ => None,
    }
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a Parquet export table.
///
/// Numeric columns may be any integer or float type (or numeric text);
/// categorical columns may be plain or dictionary-encoded strings.  Works with
/// files written by both **Pandas** (`df.to_parquet()`) and **Polars**.
fn read_parquet(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        let column = |name: &'static str| -> Result<ArrayRef, LoadError> {
            let idx = schema
                .index_of(name)
                .map_err(|_| LoadError::MissingColumn(name))?;
            Ok(batch.column(idx).clone())
        };

        let period = numeric_column(&column(PERIOD_COLUMN)?)?;
        let month = numeric_column(&column(MONTH_COLUMN)?)?;
        let value = numeric_column(&column(VALUE_COLUMN)?)?;
        let weight = numeric_column(&column(WEIGHT_COLUMN)?)?;
        let mut categories = Vec::with_capacity(Dimension::ALL.len());
        for dim in Dimension::ALL {
            categories.push(text_column(&column(dim.column())?)?);
        }

        for row in 0..batch.num_rows() {
            rows.push(RawRow {
                period: period[row],
                month: month[row],
                categories: std::array::from_fn(|i| categories[i][row].clone()),
                value: value[row],
                net_weight: weight[row],
            });
        }
    }

    Ok(rows)
}

// -- Parquet / Arrow helpers --

/// Cast any numeric (or numeric text) column to `f64`; unparseable cells become `None`.
fn numeric_column(col: &ArrayRef) -> Result<Vec<Option<f64>>, LoadError> {
    let floats = cast(col, &DataType::Float64)?;
    Ok(floats.as_primitive::<Float64Type>().iter().collect())
}

/// Cast any string-like column to UTF-8 text.
fn text_column(col: &ArrayRef) -> Result<Vec<Option<String>>, LoadError> {
    let text = cast(col, &DataType::Utf8)?;
    let text = text.as_string::<i32>();
    Ok((0..text.len())
        .map(|i| (!text.is_null(i)).then(|| text.value(i).to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const HEADER: &str = "GESTION,MES,DESPAIS,DESNAN,DESGCE3,DESCIIU3,DESACT2,DESDEP,VALOR,KILNET";

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn normalize_rounds_and_clamps_measures() {
        assert_eq!(normalize_measure(Some(1499.5)), 1500);
        assert_eq!(normalize_measure(Some(2.5)), 2);
        assert_eq!(normalize_measure(Some(-12.0)), 0);
        assert_eq!(normalize_measure(Some(f64::NAN)), 0);
        assert_eq!(normalize_measure(None), 0);
        assert_eq!(normalize_measure(Some(1e30)), u64::MAX);
    }

    #[test]
    fn normalize_replaces_missing_categories() {
        let row = RawRow {
            period: Some(2024.0),
            month: Some(5.0),
            categories: [
                Some("Chile".into()),
                None,
                Some("   ".into()),
                Some("Minería".into()),
                Some("Extracción".into()),
                Some("Oruro".into()),
            ],
            value: Some(10.4),
            net_weight: None,
        };
        let rec = row.normalize().unwrap();
        assert_eq!(rec.product_code, NO_DATA);
        assert_eq!(rec.economic_category, NO_DATA);
        assert_eq!(rec.destination_country, "Chile");
        assert_eq!(rec.value, 10);
        assert_eq!(rec.net_weight, 0);
    }

    #[test]
    fn rows_without_period_or_valid_month_are_skipped() {
        let no_period = RawRow {
            month: Some(1.0),
            ..RawRow::default()
        };
        assert!(no_period.normalize().is_none());

        let bad_month = RawRow {
            period: Some(2023.0),
            month: Some(13.0),
            ..RawRow::default()
        };
        assert!(bad_month.normalize().is_none());
    }

    #[test]
    fn csv_source_is_read_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n\
             2023,1,Chile,Estaño,Suministros,Minería,Extracción,Potosí,500.4,20\n\
             2023,2,Perú,,Alimentos,Agro,Cultivo,Santa Cruz,-3,\n\
             ,2,Perú,Soya,Alimentos,Agro,Cultivo,Santa Cruz,100,1\n"
        );
        let path = write_file(&dir, "exports.csv", &body);

        let table = load_file(&path).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.skipped_rows, 1);
        assert_eq!(table.records[0].value, 500);
        assert_eq!(table.records[1].product_code, NO_DATA);
        assert_eq!(table.records[1].value, 0);
    }

    #[test]
    fn csv_missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "broken.csv", "GESTION,MES\n2023,1\n");
        assert!(matches!(
            load_file(&path),
            Err(LoadError::MissingColumn(_))
        ));
    }

    #[test]
    fn json_source_accepts_numbers_and_numeric_text() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"[
            {"GESTION": 2024, "MES": "3", "DESPAIS": "Brasil", "DESNAN": "Gas natural",
             "DESGCE3": "Combustibles", "DESCIIU3": "Hidrocarburos",
             "DESACT2": "Extracción de gas", "DESDEP": "Tarija", "VALOR": 1200.6, "KILNET": null}
        ]"#;
        let path = write_file(&dir, "exports.json", body);

        let table = load_file(&path).unwrap();
        assert_eq!(table.records.len(), 1);
        let rec = &table.records[0];
        assert_eq!((rec.period, rec.month), (2024, 3));
        assert_eq!(rec.value, 1201);
        assert_eq!(rec.net_weight, 0);
        assert_eq!(rec.origin_department, "Tarija");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "exports.xlsx", "");
        assert!(matches!(
            load_file(&path),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn missing_source_is_a_warning_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let present = write_file(
            &dir,
            "2024.csv",
            &format!("{HEADER}\n2024,1,Chile,Estaño,S,Minería,Extracción,Potosí,10,1\n"),
        );
        let absent = dir.path().join("2023.csv");

        let report = load_sources(&[absent.clone(), present]);
        assert_eq!(report.dataset.len(), 1);
        assert_eq!(report.warnings, vec![LoadWarning::MissingSource(absent)]);
    }

    #[test]
    fn all_sources_missing_yields_empty_dataset() {
        let report = load_sources(&[PathBuf::from("/nonexistent/a.parquet")]);
        assert!(report.dataset.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }
}
