use std::sync::Arc;

use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Deterministic splitmix64 stream; the same seed always yields the same files.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Log-uniform amount, spanning several orders of magnitude.
    fn amount(&mut self, min: f64, max: f64) -> f64 {
        (min.ln() + self.unit() * (max.ln() - min.ln())).exp()
    }
}

struct Product {
    industry: &'static str,
    activity: &'static str,
    name: &'static str,
    category: &'static str,
    usd_per_kg: f64,
}

const fn product(
    industry: &'static str,
    activity: &'static str,
    name: &'static str,
    category: &'static str,
    usd_per_kg: f64,
) -> Product {
    Product {
        industry,
        activity,
        name,
        category,
        usd_per_kg,
    }
}

const MINING: &str = "Extracción de minerales";
const MANUFACTURING: &str = "Industria manufacturera";
const FARMING: &str = "Agricultura, ganadería y pesca";
const SUPPLIES: &str = "Suministros industriales";
const FOOD: &str = "Alimentos y bebidas";

const PRODUCTS: &[Product] = &[
    product(MINING, "Minerales metálicos", "Minerales de zinc y sus concentrados", SUPPLIES, 2.8),
    product(MINING, "Minerales metálicos", "Minerales de plata y sus concentrados", SUPPLIES, 9.5),
    product(MINING, "Minerales metálicos", "Minerales de plomo y sus concentrados", SUPPLIES, 1.9),
    product(
        "Extracción de hidrocarburos",
        "Gas natural",
        "Gas natural en estado gaseoso",
        "Combustibles y lubricantes",
        0.3,
    ),
    product(MANUFACTURING, "Metales preciosos", "Oro en bruto", SUPPLIES, 60_000.0),
    product(MANUFACTURING, "Aceites y grasas", "Aceite de soya en bruto", FOOD, 1.1),
    product(MANUFACTURING, "Aceites y grasas", "Tortas de soya", FOOD, 0.45),
    product(FARMING, "Frutos y nueces", "Nueces del Brasil sin cáscara", FOOD, 6.0),
    product(FARMING, "Cereales y granos", "Quinua", FOOD, 2.2),
    product(MANUFACTURING, "Textiles y prendas", "Prendas de alpaca", "Bienes de consumo", 45.0),
];

const COUNTRIES: &[&str] = &[
    "Brasil",
    "Argentina",
    "Colombia",
    "Perú",
    "Chile",
    "Estados Unidos",
    "India",
    "Japón",
    "Corea del Sur",
    "China",
    "Emiratos Árabes Unidos",
    "Bélgica",
];

const DEPARTMENTS: &[&str] = &[
    "La Paz",
    "Santa Cruz",
    "Cochabamba",
    "Potosí",
    "Oruro",
    "Tarija",
    "Chuquisaca",
    "Beni",
    "Pando",
];

#[derive(Default)]
struct Columns {
    period: Vec<i64>,
    month: Vec<i64>,
    country: Vec<Option<String>>,
    product: Vec<Option<String>>,
    category: Vec<Option<String>>,
    industry: Vec<Option<String>>,
    activity: Vec<Option<String>>,
    department: Vec<Option<String>>,
    value: Vec<Option<f64>>,
    weight: Vec<Option<f64>>,
}

fn generate_year(period: i64, rows: usize, rng: &mut SampleRng) -> Columns {
    let mut cols = Columns::default();
    for _ in 0..rows {
        let item = rng.pick(PRODUCTS);
        let weight = rng.amount(50.0, 5_000_000.0);
        let value = weight * item.usd_per_kg * (0.8 + 0.4 * rng.unit());

        cols.period.push(period);
        cols.month.push(1 + (rng.next_u64() % 12) as i64);
        cols.country.push(Some(rng.pick(COUNTRIES).to_string()));
        cols.product.push(Some(item.name.to_string()));
        cols.category.push(Some(item.category.to_string()));
        cols.industry.push(Some(item.industry.to_string()));
        cols.activity.push(Some(item.activity.to_string()));
        // A few shipments without a declared origin, as in the published tables.
        let origin = rng.chance(0.98).then(|| rng.pick(DEPARTMENTS).to_string());
        cols.department.push(origin);
        cols.value.push(Some(value));
        cols.weight.push(rng.chance(0.99).then_some(weight));
    }
    cols
}

fn write_parquet(path: &str, cols: Columns) -> anyhow::Result<usize> {
    let text = |v: Vec<Option<String>>| -> ArrayRef { Arc::new(StringArray::from(v)) };
    let n_rows = cols.period.len();

    let schema = Arc::new(Schema::new(vec![
        Field::new("GESTION", DataType::Int64, false),
        Field::new("MES", DataType::Int64, false),
        Field::new("DESPAIS", DataType::Utf8, true),
        Field::new("DESNAN", DataType::Utf8, true),
        Field::new("DESGCE3", DataType::Utf8, true),
        Field::new("DESCIIU3", DataType::Utf8, true),
        Field::new("DESACT2", DataType::Utf8, true),
        Field::new("DESDEP", DataType::Utf8, true),
        Field::new("VALOR", DataType::Float64, true),
        Field::new("KILNET", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(cols.period)),
            Arc::new(Int64Array::from(cols.month)),
            text(cols.country),
            text(cols.product),
            text(cols.category),
            text(cols.industry),
            text(cols.activity),
            text(cols.department),
            Arc::new(Float64Array::from(cols.value)),
            Arc::new(Float64Array::from(cols.weight)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(n_rows)
}

fn main() -> anyhow::Result<()> {
    let mut rng = SampleRng(42);

    for (period, rows) in [(2023, 4_000), (2024, 3_500)] {
        let output_path = format!("EXPORTACIONES_{period}p.parquet");
        let cols = generate_year(period, rows, &mut rng);
        let written = write_parquet(&output_path, cols)?;
        println!("Wrote {written} export rows to {output_path}");
    }
    Ok(())
}
