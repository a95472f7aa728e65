use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::filter::FilteredView;
use super::model::{saturating_sum, Dimension, ExportRecord, Measure};

// ---------------------------------------------------------------------------
// Grouped-sum ranking
// ---------------------------------------------------------------------------

/// How many groups survive a ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankLimit {
    /// Keep every group.
    #[default]
    All,
    /// Keep groups whose sum is strictly greater than the cutoff.
    Above(u64),
    /// Keep the `n` largest groups.
    Top(usize),
}

/// One bar of a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub label: String,
    pub total: u64,
}

/// Sum `measure` per distinct value of `dimension`, keyed in label order.
pub fn group_sum<'a>(
    view: &FilteredView<'a>,
    dimension: Dimension,
    measure: Measure,
) -> BTreeMap<&'a str, u64> {
    let mut sums: BTreeMap<&'a str, u64> = BTreeMap::new();
    for rec in view.iter() {
        let sum = sums.entry(rec.get(dimension)).or_default();
        *sum = sum.saturating_add(rec.measure(measure));
    }
    sums
}

/// Grouped-sum ranking, ascending by total.
///
/// Ascending order puts the largest bar last, which a horizontal bar chart
/// draws at the top.  Equal totals keep label order.
pub fn rank(
    view: &FilteredView<'_>,
    dimension: Dimension,
    measure: Measure,
    limit: RankLimit,
) -> Vec<RankEntry> {
    let mut entries: Vec<RankEntry> = group_sum(view, dimension, measure)
        .into_iter()
        .filter(|(_, total)| match limit {
            RankLimit::Above(cutoff) => *total > cutoff,
            _ => true,
        })
        .map(|(label, total)| RankEntry {
            label: label.to_string(),
            total,
        })
        .collect();

    entries.sort_by_key(|e| e.total);

    if let RankLimit::Top(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries
}

// ---------------------------------------------------------------------------
// Hierarchical aggregation
// ---------------------------------------------------------------------------

/// A node of the nested-sum tree.  `value` of an internal node is exactly the
/// sum of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub value: u64,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether every internal node equals the sum of its children.
    pub fn is_additive(&self) -> bool {
        self.is_leaf()
            || (saturating_sum(self.children.iter().map(|c| c.value)) == self.value
                && self.children.iter().all(TreeNode::is_additive))
    }

    /// Number of leaves below (or at) this node.
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TreeNode::leaf_count).sum()
        }
    }
}

/// Nested sums along `path`, under a root labelled "Total".
pub fn hierarchy(view: &FilteredView<'_>, path: &[Dimension], measure: Measure) -> TreeNode {
    build_node("Total".to_string(), view.iter().collect(), path, measure)
}

fn build_node(
    label: String,
    records: Vec<&ExportRecord>,
    path: &[Dimension],
    measure: Measure,
) -> TreeNode {
    let Some((dim, rest)) = path.split_first() else {
        return TreeNode {
            label,
            value: saturating_sum(records.iter().map(|r| r.measure(measure))),
            children: Vec::new(),
        };
    };

    let mut groups: BTreeMap<&str, Vec<&ExportRecord>> = BTreeMap::new();
    for rec in records {
        groups.entry(rec.get(*dim)).or_default().push(rec);
    }

    let children: Vec<TreeNode> = groups
        .into_iter()
        .map(|(child, recs)| build_node(child.to_string(), recs, rest, measure))
        .collect();

    TreeNode {
        label,
        value: saturating_sum(children.iter().map(|c| c.value)),
        children,
    }
}

// ---------------------------------------------------------------------------
// Flow decomposition
// ---------------------------------------------------------------------------

/// A weighted edge between two entries of [`FlowDiagram::labels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowEdge {
    pub source: usize,
    pub target: usize,
    pub weight: u64,
    /// 0 for origin → category, 1 for category → destination.
    pub layer: u8,
}

/// Two layers of edges over one deduplicated label set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowDiagram {
    pub labels: Vec<String>,
    /// Node indices appearing in each stage (origin, category, destination).
    pub stages: [Vec<usize>; 3],
    pub edges: Vec<FlowEdge>,
}

impl FlowDiagram {
    /// Total weight leaving `node` on `layer`.
    pub fn outflow(&self, node: usize, layer: u8) -> u64 {
        saturating_sum(
            self.edges
                .iter()
                .filter(|e| e.layer == layer && e.source == node)
                .map(|e| e.weight),
        )
    }

    /// Total weight entering `node` on `layer`.
    pub fn inflow(&self, node: usize, layer: u8) -> u64 {
        saturating_sum(
            self.edges
                .iter()
                .filter(|e| e.layer == layer && e.target == node)
                .map(|e| e.weight),
        )
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// Decompose the grouped sum over `(origin, category, destination)` into
/// origin → category and category → destination edges.
///
/// A label that occurs in several stages becomes a single node.
pub fn flows(view: &FilteredView<'_>, triple: [Dimension; 3], measure: Measure) -> FlowDiagram {
    let [origin, category, destination] = triple;

    let mut grouped: BTreeMap<(&str, &str, &str), u64> = BTreeMap::new();
    for rec in view.iter() {
        let key = (rec.get(origin), rec.get(category), rec.get(destination));
        let sum = grouped.entry(key).or_default();
        *sum = sum.saturating_add(rec.measure(measure));
    }

    let mut labels: Vec<String> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stages: [Vec<usize>; 3] = Default::default();

    let stage_keys: [Vec<&str>; 3] = [
        grouped.keys().map(|k| k.0).collect(),
        grouped.keys().map(|k| k.1).collect(),
        grouped.keys().map(|k| k.2).collect(),
    ];
    for (stage, keys) in stages.iter_mut().zip(&stage_keys) {
        for &label in keys {
            let idx = *index.entry(label).or_insert_with(|| {
                labels.push(label.to_string());
                labels.len() - 1
            });
            if !stage.contains(&idx) {
                stage.push(idx);
            }
        }
    }

    let mut first: BTreeMap<(usize, usize), u64> = BTreeMap::new();
    let mut second: BTreeMap<(usize, usize), u64> = BTreeMap::new();
    for (&(o, c, d), &total) in &grouped {
        let (o, c, d) = (index[o], index[c], index[d]);
        let out = first.entry((o, c)).or_default();
        *out = out.saturating_add(total);
        let onward = second.entry((c, d)).or_default();
        *onward = onward.saturating_add(total);
    }

    let edges = first
        .into_iter()
        .map(|((source, target), weight)| FlowEdge {
            source,
            target,
            weight,
            layer: 0,
        })
        .chain(second.into_iter().map(|((source, target), weight)| FlowEdge {
            source,
            target,
            weight,
            layer: 1,
        }))
        .collect();

    FlowDiagram {
        labels,
        stages,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterSpec};
    use crate::data::model::fixtures::record;
    use crate::data::model::ExportDataset;

    fn dataset() -> ExportDataset {
        let mut rows = vec![
            record(2023, 1, "Chile", 500),
            record(2023, 1, "Perú", 1500),
            record(2023, 2, "Perú", 250),
            record(2023, 2, "Brasil", 500),
            record(2023, 3, "Argentina", 80),
        ];
        rows[1].industry_class = "Agro".into();
        rows[1].economic_activity = "Cultivo".into();
        rows[1].product_code = "Soya".into();
        rows[1].origin_department = "Santa Cruz".into();
        rows[1].economic_category = "Alimentos".into();
        rows[2].product_code = "Zinc".into();
        ExportDataset::from_records(rows)
    }

    #[test]
    fn ranking_sums_per_group_ascending() {
        let ds = dataset();
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let ranking = rank(&view, Dimension::Country, Measure::Value, RankLimit::All);
        let pairs: Vec<(&str, u64)> = ranking.iter().map(|e| (e.label.as_str(), e.total)).collect();
        assert_eq!(
            pairs,
            vec![("Argentina", 80), ("Brasil", 500), ("Chile", 500), ("Perú", 1750)]
        );
        assert_eq!(ranking.iter().map(|e| e.total).sum::<u64>(), view.total(Measure::Value));
    }

    #[test]
    fn ranking_cutoff_is_strict() {
        let ds = dataset();
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let ranking = rank(&view, Dimension::Country, Measure::Value, RankLimit::Above(500));
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].label, "Perú");
    }

    #[test]
    fn ranking_top_keeps_largest_in_ascending_order() {
        let ds = dataset();
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let ranking = rank(&view, Dimension::Country, Measure::Value, RankLimit::Top(2));
        let labels: Vec<&str> = ranking.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Chile", "Perú"]);

        let all = rank(&view, Dimension::Country, Measure::Value, RankLimit::Top(50));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn hierarchy_is_additive_and_matches_view_total() {
        let ds = dataset();
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let tree = hierarchy(
            &view,
            &[Dimension::Industry, Dimension::Activity, Dimension::Product],
            Measure::Value,
        );
        assert_eq!(tree.value, view.total(Measure::Value));
        assert!(tree.is_additive());
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].label, "Agro");
        assert_eq!(tree.children[0].value, 1500);
        // Minería → Extracción → {Estaño, Zinc}
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn hierarchy_over_weight_uses_weight() {
        let ds = dataset();
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let tree = hierarchy(&view, &[Dimension::Industry], Measure::NetWeight);
        assert_eq!(tree.value, view.total(Measure::NetWeight));
    }

    #[test]
    fn flows_conserve_weight() {
        let ds = dataset();
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let triple = [Dimension::Department, Dimension::Category, Dimension::Country];
        let diagram = flows(&view, triple, Measure::Value);

        let by_department = group_sum(&view, Dimension::Department, Measure::Value);
        for (label, total) in by_department {
            let node = diagram.index_of(label).unwrap();
            assert_eq!(diagram.outflow(node, 0), total);
        }
        let by_country = group_sum(&view, Dimension::Country, Measure::Value);
        for (label, total) in by_country {
            let node = diagram.index_of(label).unwrap();
            assert_eq!(diagram.inflow(node, 1), total);
        }
        for &category in &diagram.stages[1] {
            assert_eq!(diagram.inflow(category, 0), diagram.outflow(category, 1));
        }
    }

    #[test]
    fn flow_labels_are_deduplicated() {
        let mut rows = vec![record(2023, 1, "Potosí", 10)];
        rows[0].origin_department = "Potosí".into();
        let ds = ExportDataset::from_records(rows);
        let view = apply(&ds, &FilterSpec::new(2023)).unwrap();
        let diagram = flows(
            &view,
            [Dimension::Department, Dimension::Category, Dimension::Country],
            Measure::Value,
        );
        assert_eq!(diagram.labels, vec!["Potosí", "Suministros industriales"]);
        assert_eq!(diagram.stages[0], diagram.stages[2]);
        assert_eq!(diagram.edges.len(), 2);
    }
}
