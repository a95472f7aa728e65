use serde::{Deserialize, Serialize};

use super::aggregate::{flows, hierarchy, rank, FlowDiagram, RankEntry, RankLimit, TreeNode};
use super::filter::{apply, FilterSpec};
use super::model::{Dimension, ExportDataset, Measure};
use crate::error::QueryError;

/// Knobs of the dashboard query.  The defaults reproduce the published
/// dashboard: value in USD, countries and departments above 100'000, the 15
/// largest activities, industry → activity → product treemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub measure: Measure,
    pub country_limit: RankLimit,
    pub department_limit: RankLimit,
    pub activity_limit: RankLimit,
    pub hierarchy: Vec<Dimension>,
    pub flow: Option<[Dimension; 3]>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            measure: Measure::Value,
            country_limit: RankLimit::Above(100_000),
            department_limit: RankLimit::Above(100_000),
            activity_limit: RankLimit::Top(15),
            hierarchy: vec![Dimension::Industry, Dimension::Activity, Dimension::Product],
            flow: Some([Dimension::Department, Dimension::Category, Dimension::Country]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub total_value: u64,
    pub total_weight: u64,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rankings {
    pub by_country: Vec<RankEntry>,
    pub by_activity: Vec<RankEntry>,
    pub by_department: Vec<RankEntry>,
}

/// Every artifact the dashboard renders for one filter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub rankings: Rankings,
    pub hierarchy: TreeNode,
    pub flows: Option<FlowDiagram>,
}

/// Result of a query: either the full dashboard or one "no data" placeholder
/// standing in for every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Dashboard(Dashboard),
    NoData { message: String },
}

impl QueryOutcome {
    pub fn dashboard(&self) -> Option<&Dashboard> {
        match self {
            QueryOutcome::Dashboard(d) => Some(d),
            QueryOutcome::NoData { .. } => None,
        }
    }
}

/// Filter the dataset and compute every dashboard artifact.
///
/// Pure: the same dataset, spec and options always give the same outcome.
pub fn query(dataset: &ExportDataset, spec: &FilterSpec, options: &QueryOptions) -> QueryOutcome {
    match try_query(dataset, spec, options) {
        Ok(dashboard) => QueryOutcome::Dashboard(dashboard),
        Err(e @ QueryError::EmptyResult) => {
            log::debug!("Query for {} returned no rows", spec.period);
            QueryOutcome::NoData {
                message: e.to_string(),
            }
        }
    }
}

fn try_query(
    dataset: &ExportDataset,
    spec: &FilterSpec,
    options: &QueryOptions,
) -> Result<Dashboard, QueryError> {
    let view = apply(dataset, spec)?;
    let measure = options.measure;
    log::debug!("Query for {} matched {} records", spec.period, view.len());

    Ok(Dashboard {
        kpis: Kpis {
            total_value: view.total(Measure::Value),
            total_weight: view.total(Measure::NetWeight),
            record_count: view.len(),
        },
        rankings: Rankings {
            by_country: rank(&view, Dimension::Country, measure, options.country_limit),
            by_activity: rank(&view, Dimension::Activity, measure, options.activity_limit),
            by_department: rank(&view, Dimension::Department, measure, options.department_limit),
        },
        hierarchy: hierarchy(&view, &options.hierarchy, measure),
        flows: options.flow.map(|triple| flows(&view, triple, measure)),
    })
}
