use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{saturating_sum, Dimension, ExportDataset, ExportRecord, Measure};
use crate::error::QueryError;

// ---------------------------------------------------------------------------
// Filter specification: the selected values across all dimensions
// ---------------------------------------------------------------------------

/// Month selector: a single month, or every month of the year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthSelection {
    #[default]
    All,
    Month(u8),
}

/// Everything the user has selected.
///
/// The year is always set.  A dimension that is absent from `selections`,
/// or maps to an empty set, places no constraint on the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub period: i32,
    #[serde(default)]
    pub month: MonthSelection,
    #[serde(default)]
    pub selections: BTreeMap<Dimension, BTreeSet<String>>,
}

impl FilterSpec {
    /// A spec that selects every record of `period`.
    pub fn new(period: i32) -> Self {
        Self {
            period,
            month: MonthSelection::All,
            selections: BTreeMap::new(),
        }
    }

    pub fn with_month(mut self, month: u8) -> Self {
        self.month = MonthSelection::Month(month);
        self
    }

    pub fn with_selection<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(dimension, values.into_iter().map(Into::into).collect());
        self
    }

    /// Selected values of a dimension, if it is actually constraining.
    pub fn active(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.selections.get(&dimension).filter(|s| !s.is_empty())
    }

    /// Whether `record` passes every active predicate.
    pub fn matches(&self, record: &ExportRecord) -> bool {
        if record.period != self.period {
            return false;
        }
        if let MonthSelection::Month(m) = self.month {
            if record.month != m {
                return false;
            }
        }
        Dimension::ALL.into_iter().all(|dim| match self.active(dim) {
            Some(selected) => selected.contains(record.get(dim)),
            None => true,
        })
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// The records of a dataset that passed a [`FilterSpec`], in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a ExportDataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a ExportRecord> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sum of `measure` over the view.
    pub fn total(&self, measure: Measure) -> u64 {
        saturating_sum(self.iter().map(|r| r.measure(measure)))
    }
}

/// Return indices of records that pass all active filters and carry a
/// positive value.
pub fn filtered_indices(dataset: &ExportDataset, spec: &FilterSpec) -> Vec<usize> {
    dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| spec.matches(rec) && rec.value > 0)
        .map(|(i, _)| i)
        .collect()
}

/// Filter the dataset, refusing to hand out an empty view.
pub fn apply<'a>(
    dataset: &'a ExportDataset,
    spec: &FilterSpec,
) -> Result<FilteredView<'a>, QueryError> {
    let indices = filtered_indices(dataset, spec);
    if indices.is_empty() {
        return Err(QueryError::EmptyResult);
    }
    Ok(FilteredView { dataset, indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::record;

    fn sample() -> ExportDataset {
        let mut zero = record(2023, 2, "Chile", 0);
        zero.origin_department = "La Paz".into();
        let mut santa_cruz = record(2023, 2, "Perú", 700);
        santa_cruz.origin_department = "Santa Cruz".into();
        ExportDataset::from_records(vec![
            record(2023, 1, "Chile", 500),
            record(2023, 1, "Perú", 1500),
            santa_cruz,
            zero,
            record(2024, 1, "Chile", 900),
        ])
    }

    #[test]
    fn period_is_always_applied() {
        let ds = sample();
        let view = apply(&ds, &FilterSpec::new(2024)).unwrap();
        assert_eq!(view.indices(), &[4]);
    }

    #[test]
    fn month_all_skips_the_month_predicate() {
        let ds = sample();
        assert_eq!(filtered_indices(&ds, &FilterSpec::new(2023)), vec![0, 1, 2]);
        assert_eq!(
            filtered_indices(&ds, &FilterSpec::new(2023).with_month(2)),
            vec![2]
        );
    }

    #[test]
    fn empty_selection_equals_no_selection() {
        let ds = sample();
        let without = FilterSpec::new(2023);
        let with_empty = FilterSpec::new(2023)
            .with_selection(Dimension::Country, Vec::<String>::new())
            .with_selection(Dimension::Department, Vec::<String>::new());
        assert_eq!(
            filtered_indices(&ds, &without),
            filtered_indices(&ds, &with_empty)
        );
    }

    #[test]
    fn dimensions_combine_with_and() {
        let ds = sample();
        let spec = FilterSpec::new(2023)
            .with_selection(Dimension::Country, ["Perú", "Chile"])
            .with_selection(Dimension::Department, ["Santa Cruz"]);
        assert_eq!(filtered_indices(&ds, &spec), vec![2]);
    }

    #[test]
    fn zero_value_records_never_pass() {
        let ds = sample();
        let spec = FilterSpec::new(2023).with_selection(Dimension::Department, ["La Paz"]);
        assert!(filtered_indices(&ds, &spec).is_empty());
        assert_eq!(apply(&ds, &spec).unwrap_err(), QueryError::EmptyResult);
    }

    #[test]
    fn every_retained_record_satisfies_the_filter() {
        let ds = sample();
        let spec = FilterSpec::new(2023).with_selection(Dimension::Country, ["Perú"]);
        let view = apply(&ds, &spec).unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|r| spec.matches(r) && r.value > 0));
        assert_eq!(view.total(Measure::Value), 2200);
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: FilterSpec = serde_json::from_str(r#"{"period": 2023}"#).unwrap();
        assert_eq!(spec, FilterSpec::new(2023));

        let spec: FilterSpec = serde_json::from_str(
            r#"{"period": 2024, "month": {"month": 4}, "selections": {"country": ["Chile"]}}"#,
        )
        .unwrap();
        assert_eq!(spec.month, MonthSelection::Month(4));
        assert!(spec.active(Dimension::Country).unwrap().contains("Chile"));
    }
}
