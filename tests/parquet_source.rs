use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use export_lens::data::loader::load_file;
use export_lens::data::model::NO_DATA;
use export_lens::error::LoadError;

fn text(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

fn int32(values: Vec<i32>) -> ArrayRef {
    Arc::new(Int32Array::from(values))
}

fn write_batch(path: &std::path::Path, columns: Vec<(&str, ArrayRef)>) {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, col)| Field::new(*name, col.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, c)| c).collect())
        .expect("record batch");
    let file = std::fs::File::create(path).expect("create parquet");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("writer");
    writer.write(&batch).expect("write");
    writer.close().expect("close");
}

#[test]
fn parquet_with_mixed_column_types_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("EXPORTACIONES_2024p.parquet");
    write_batch(
        &path,
        vec![
            ("GESTION", int32(vec![2024, 2024, 2024])),
            ("MES", Arc::new(Int64Array::from(vec![1, 2, 14])) as ArrayRef),
            ("DESPAIS", text(&[Some("Brasil"), None, Some("Chile")])),
            ("DESNAN", text(&[Some("Gas natural"), Some("Quinua"), Some("Zinc")])),
            ("DESGCE3", text(&[Some("Combustibles"), Some("Alimentos"), Some("Suministros")])),
            ("DESCIIU3", text(&[Some("Hidrocarburos"), Some("Agro"), Some("Minería")])),
            ("DESACT2", text(&[Some("Extracción de gas"), Some("Cereales"), Some("Minerales")])),
            ("DESDEP", text(&[Some("Tarija"), Some("La Paz"), Some("Potosí")])),
            (
                "VALOR",
                Arc::new(Float64Array::from(vec![Some(1500.6), None, Some(10.0)])) as ArrayRef,
            ),
            ("KILNET", text(&[Some("12.5"), Some("n/d"), Some("3")])),
        ],
    );

    let table = load_file(&path).unwrap();
    // Month 14 cannot be selected.
    assert_eq!(table.skipped_rows, 1);
    assert_eq!(table.records.len(), 2);

    let gas = &table.records[0];
    assert_eq!((gas.period, gas.month), (2024, 1));
    assert_eq!(gas.value, 1501);
    assert_eq!(gas.net_weight, 12);

    let quinua = &table.records[1];
    assert_eq!(quinua.destination_country, NO_DATA);
    assert_eq!(quinua.value, 0);
    assert_eq!(quinua.net_weight, 0);
}

#[test]
fn parquet_without_measure_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.parquet");
    write_batch(
        &path,
        vec![
            ("GESTION", int32(vec![2024])),
            ("MES", int32(vec![1])),
        ],
    );

    assert!(matches!(load_file(&path), Err(LoadError::MissingColumn(_))));
}
