use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::filter::{FilterSpec, MonthSelection};
use crate::data::loader::LoadReport;
use crate::data::model::{Dimension, ExportDataset};
use crate::data::query::{query, QueryOptions, QueryOutcome};

// ---------------------------------------------------------------------------
// Filter events
// ---------------------------------------------------------------------------

/// A user interaction that changes the filter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterEvent {
    SetPeriod { period: i32 },
    SetMonth { month: MonthSelection },
    /// Selector checkbox: add the value if absent, remove it otherwise.
    Toggle { dimension: Dimension, value: String },
    /// Empty a selector, lifting its restriction.
    Clear { dimension: Dimension },
    /// A bar was clicked: add its label to the selector if absent.
    ChartClick { dimension: Dimension, label: String },
}

/// Compute the filter state that follows `event`.
pub fn reduce(old: &FilterSpec, event: &FilterEvent) -> FilterSpec {
    let mut next = old.clone();
    match event {
        FilterEvent::SetPeriod { period } => next.period = *period,
        FilterEvent::SetMonth { month } => next.month = *month,
        FilterEvent::Toggle { dimension, value } => {
            let selected = next.selections.entry(*dimension).or_default();
            if !selected.remove(value) {
                selected.insert(value.clone());
            }
        }
        FilterEvent::Clear { dimension } => {
            next.selections.remove(dimension);
        }
        FilterEvent::ChartClick { dimension, label } => {
            let selected = next.selections.entry(*dimension).or_default();
            if !selected.contains(label) {
                selected.insert(label.clone());
            }
        }
    }
    next
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (empty until a source loads).
    pub dataset: Arc<ExportDataset>,

    /// Current selections; `None` while the dataset has no years.
    pub spec: Option<FilterSpec>,

    pub options: QueryOptions,

    /// Outcome of the last query (cached).
    pub outcome: QueryOutcome,

    /// Load warnings shown in the UI.
    pub warnings: Vec<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: Arc::new(ExportDataset::default()),
            spec: None,
            options: QueryOptions::default(),
            outcome: no_dataset(),
            warnings: Vec::new(),
            status_message: None,
        }
    }
}

fn no_dataset() -> QueryOutcome {
    QueryOutcome::NoData {
        message: "no export data loaded".to_string(),
    }
}

impl AppState {
    pub fn new(report: LoadReport, options: QueryOptions) -> Self {
        let mut state = Self {
            options,
            ..Self::default()
        };
        state.set_dataset(report);
        state
    }

    /// Ingest a newly loaded dataset and select its latest year.
    pub fn set_dataset(&mut self, report: LoadReport) {
        self.warnings = report.warnings.iter().map(ToString::to_string).collect();
        self.spec = report.dataset.latest_period().map(FilterSpec::new);
        self.dataset = Arc::new(report.dataset);
        self.status_message = None;
        self.refresh();
    }

    /// Apply one interaction and recompute the outcome.
    pub fn dispatch(&mut self, event: FilterEvent) {
        let Some(spec) = &self.spec else {
            return;
        };
        log::debug!("Filter event {event:?}");
        let next = reduce(spec, &event);
        self.spec = Some(next);
        self.refresh();
    }

    /// Recompute `outcome` after a filter or dataset change.
    pub fn refresh(&mut self) {
        self.outcome = match &self.spec {
            Some(spec) => query(&self.dataset, spec, &self.options),
            None => no_dataset(),
        };
    }

    pub fn is_selected(&self, dimension: Dimension, value: &str) -> bool {
        self.spec
            .as_ref()
            .and_then(|s| s.selections.get(&dimension))
            .is_some_and(|set| set.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::record;

    fn click(label: &str) -> FilterEvent {
        FilterEvent::ChartClick {
            dimension: Dimension::Country,
            label: label.to_string(),
        }
    }

    #[test]
    fn chart_click_is_idempotent() {
        let start = FilterSpec::new(2023);
        let once = reduce(&start, &click("Chile"));
        let twice = reduce(&once, &click("Chile"));
        assert_eq!(once, twice);
        assert!(once.active(Dimension::Country).unwrap().contains("Chile"));
    }

    #[test]
    fn chart_click_appends() {
        let spec = reduce(&FilterSpec::new(2023), &click("Chile"));
        let spec = reduce(&spec, &click("Perú"));
        assert_eq!(spec.active(Dimension::Country).unwrap().len(), 2);
    }

    #[test]
    fn toggle_and_clear() {
        let toggle = FilterEvent::Toggle {
            dimension: Dimension::Product,
            value: "Soya".into(),
        };
        let on = reduce(&FilterSpec::new(2023), &toggle);
        assert!(on.active(Dimension::Product).is_some());
        let off = reduce(&on, &toggle);
        assert!(off.active(Dimension::Product).is_none());

        let cleared = reduce(&on, &FilterEvent::Clear { dimension: Dimension::Product });
        assert_eq!(cleared, FilterSpec::new(2023));
    }

    #[test]
    fn reduce_leaves_old_state_untouched() {
        let old = FilterSpec::new(2023);
        let _ = reduce(&old, &FilterEvent::SetPeriod { period: 2024 });
        assert_eq!(old.period, 2023);
    }

    #[test]
    fn event_json_shape() {
        let event: FilterEvent = serde_json::from_str(
            r#"{"type": "chart_click", "dimension": "department", "label": "Oruro"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            FilterEvent::ChartClick {
                dimension: Dimension::Department,
                label: "Oruro".into()
            }
        );
    }

    #[test]
    fn app_state_selects_latest_year_and_requeries() {
        let report = LoadReport {
            dataset: ExportDataset::from_records(vec![
                record(2023, 1, "Chile", 200_000),
                record(2024, 1, "Perú", 300_000),
            ]),
            warnings: Vec::new(),
        };
        let mut state = AppState::new(report, QueryOptions::default());
        assert_eq!(state.spec.as_ref().unwrap().period, 2024);
        assert_eq!(state.outcome.dashboard().unwrap().kpis.total_value, 300_000);

        state.dispatch(FilterEvent::SetPeriod { period: 2023 });
        assert_eq!(state.outcome.dashboard().unwrap().kpis.total_value, 200_000);

        state.dispatch(click("Perú"));
        assert!(state.outcome.dashboard().is_none());
        assert!(state.is_selected(Dimension::Country, "Perú"));
    }

    #[test]
    fn empty_dataset_stays_in_no_data_state() {
        let mut state = AppState::new(LoadReport::default(), QueryOptions::default());
        state.dispatch(click("Chile"));
        assert!(state.spec.is_none());
        assert!(state.outcome.dashboard().is_none());
    }
}
