use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label substituted for missing categorical values at load time.
pub const NO_DATA: &str = "Sin datos";

// ---------------------------------------------------------------------------
// Dimension – the categorical columns a record can be filtered / grouped by
// ---------------------------------------------------------------------------

/// The six categorical columns of an export record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Country,
    Product,
    Category,
    Industry,
    Activity,
    Department,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Country,
        Dimension::Product,
        Dimension::Category,
        Dimension::Industry,
        Dimension::Activity,
        Dimension::Department,
    ];

    /// Column name in the source tables.
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Country => "DESPAIS",
            Dimension::Product => "DESNAN",
            Dimension::Category => "DESGCE3",
            Dimension::Industry => "DESCIIU3",
            Dimension::Activity => "DESACT2",
            Dimension::Department => "DESDEP",
        }
    }

    /// Human-readable selector label.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Country => "País de destino",
            Dimension::Product => "Producto (DESNAN)",
            Dimension::Category => "Categoría económica (DESGCE3)",
            Dimension::Industry => "Industria (DESCIIU3)",
            Dimension::Activity => "Actividad (DESACT2)",
            Dimension::Department => "Departamento de origen",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The summable quantity of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// FOB value in USD (`VALOR`).
    #[default]
    Value,
    /// Net weight in kilograms (`KILNET`).
    NetWeight,
}

// ---------------------------------------------------------------------------
// ExportRecord – one shipment row
// ---------------------------------------------------------------------------

/// A single export shipment after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub period: i32,
    pub month: u8,
    pub destination_country: String,
    pub product_code: String,
    pub economic_category: String,
    pub industry_class: String,
    pub economic_activity: String,
    pub origin_department: String,
    /// USD, rounded to whole units.
    pub value: u64,
    /// Kilograms, rounded to whole units.
    pub net_weight: u64,
}

impl ExportRecord {
    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Country => &self.destination_country,
            Dimension::Product => &self.product_code,
            Dimension::Category => &self.economic_category,
            Dimension::Industry => &self.industry_class,
            Dimension::Activity => &self.economic_activity,
            Dimension::Department => &self.origin_department,
        }
    }

    pub fn measure(&self, measure: Measure) -> u64 {
        match measure {
            Measure::Value => self.value,
            Measure::NetWeight => self.net_weight,
        }
    }
}

/// Sum of measure values, pinned at `u64::MAX` instead of overflowing.
pub fn saturating_sum<I: IntoIterator<Item = u64>>(values: I) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

// ---------------------------------------------------------------------------
// ExportDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// All loaded records with pre-computed selector domains.
///
/// Built once and never mutated afterwards; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ExportDataset {
    records: Vec<ExportRecord>,
    periods: BTreeSet<i32>,
    months: BTreeSet<u8>,
    domains: BTreeMap<Dimension, BTreeSet<String>>,
}

impl ExportDataset {
    /// Build selector domains from the loaded records.
    pub fn from_records(records: Vec<ExportRecord>) -> Self {
        let mut periods = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut domains: BTreeMap<Dimension, BTreeSet<String>> = BTreeMap::new();

        for rec in &records {
            periods.insert(rec.period);
            months.insert(rec.month);
            for dim in Dimension::ALL {
                let values = domains.entry(dim).or_default();
                if !values.contains(rec.get(dim)) {
                    values.insert(rec.get(dim).to_string());
                }
            }
        }

        ExportDataset {
            records,
            periods,
            months,
            domains,
        }
    }

    pub fn records(&self) -> &[ExportRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years, ascending.
    pub fn periods(&self) -> impl Iterator<Item = i32> + '_ {
        self.periods.iter().copied()
    }

    /// Distinct months, ascending.
    pub fn months(&self) -> impl Iterator<Item = u8> + '_ {
        self.months.iter().copied()
    }

    /// Most recent year, the default selection.
    pub fn latest_period(&self) -> Option<i32> {
        self.periods.last().copied()
    }

    /// Sorted distinct values of a categorical column.
    pub fn domain(&self, dimension: Dimension) -> impl Iterator<Item = &str> + '_ {
        self.domains
            .get(&dimension)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Snapshot of every selector domain, for external UIs.
    pub fn selector_domains(&self) -> SelectorDomains {
        SelectorDomains {
            periods: self.periods().collect(),
            months: self.months().collect(),
            dimensions: Dimension::ALL
                .into_iter()
                .map(|dim| (dim, self.domain(dim).map(str::to_string).collect()))
                .collect(),
        }
    }
}

/// Sorted distinct values available to each selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorDomains {
    pub periods: Vec<i32>,
    pub months: Vec<u8>,
    pub dimensions: BTreeMap<Dimension, Vec<String>>,
}
