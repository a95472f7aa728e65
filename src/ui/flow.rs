use eframe::egui::{pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Ui};

use crate::color::ColorMap;
use crate::data::aggregate::FlowDiagram;
use crate::data::model::Measure;
use crate::format;

const NODE_WIDTH: f32 = 14.0;
const NODE_GAP: f32 = 6.0;
const CURVE_STEPS: usize = 24;

/// A node box in one stage column.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub stage: usize,
    pub node: usize,
    pub rect: Rect,
    pub value: u64,
}

/// A band between two node boxes; `from`/`to` are band centres.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub layer: u8,
    pub source: usize,
    pub from: Pos2,
    pub to: Pos2,
    pub width: f32,
    pub weight: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowLayout {
    pub nodes: Vec<NodeBox>,
    pub links: Vec<Link>,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Place the three stages as columns and the edges as bands between them.
///
/// Box heights are proportional to the weight passing through the node in
/// that stage.
pub fn layout(diagram: &FlowDiagram, bounds: Rect) -> FlowLayout {
    let stage_value = |stage: usize, node: usize| match stage {
        0 => diagram.outflow(node, 0),
        1 => diagram.inflow(node, 0),
        _ => diagram.inflow(node, 1),
    };

    let tallest = diagram.stages.iter().map(Vec::len).max().unwrap_or(0);
    let total_flow: u64 = diagram.stages[0].iter().map(|&n| stage_value(0, n)).sum();
    if total_flow == 0 || tallest == 0 {
        return FlowLayout::default();
    }

    let usable = bounds.height() - NODE_GAP * (tallest.saturating_sub(1)) as f32;
    let scale = usable.max(0.0) / total_flow as f32;
    let column_x = |stage: usize| bounds.min.x + (bounds.width() - NODE_WIDTH) * stage as f32 / 2.0;

    let mut nodes = Vec::new();
    for (stage, members) in diagram.stages.iter().enumerate() {
        let mut y = bounds.min.y;
        for &node in members {
            let value = stage_value(stage, node);
            let h = value as f32 * scale;
            nodes.push(NodeBox {
                stage,
                node,
                rect: Rect::from_min_size(pos2(column_x(stage), y), vec2(NODE_WIDTH, h)),
                value,
            });
            y += h + NODE_GAP;
        }
    }

    // Running offsets of the bands already attached to each side of a box.
    let mut out_offset = vec![0.0f32; nodes.len()];
    let mut in_offset = vec![0.0f32; nodes.len()];
    let find = |stage: usize, node: usize| {
        nodes
            .iter()
            .position(|b| b.stage == stage && b.node == node)
    };

    let mut links = Vec::with_capacity(diagram.edges.len());
    for edge in &diagram.edges {
        let from_stage = edge.layer as usize;
        let (Some(src), Some(dst)) = (
            find(from_stage, edge.source),
            find(from_stage + 1, edge.target),
        ) else {
            continue;
        };
        let width = edge.weight as f32 * scale;
        let from = pos2(
            nodes[src].rect.max.x,
            nodes[src].rect.min.y + out_offset[src] + width / 2.0,
        );
        let to = pos2(
            nodes[dst].rect.min.x,
            nodes[dst].rect.min.y + in_offset[dst] + width / 2.0,
        );
        out_offset[src] += width;
        in_offset[dst] += width;
        links.push(Link {
            layer: edge.layer,
            source: edge.source,
            from,
            to,
            width,
            weight: edge.weight,
        });
    }

    FlowLayout { nodes, links }
}

/// Points of a horizontal S-curve from `a` to `b`.
fn curve(a: Pos2, b: Pos2) -> Vec<Pos2> {
    let mid = (a.x + b.x) / 2.0;
    let (c1, c2) = (pos2(mid, a.y), pos2(mid, b.y));
    (0..=CURVE_STEPS)
        .map(|i| {
            let t = i as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            pos2(
                w0 * a.x + w1 * c1.x + w2 * c2.x + w3 * b.x,
                w0 * a.y + w1 * c1.y + w2 * c2.y + w3 * b.y,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

/// Render the flow diagram (department → category → country).
pub fn flow_diagram(ui: &mut Ui, title: &str, diagram: &FlowDiagram, measure: Measure) {
    ui.strong(title);

    let size = vec2(ui.available_width(), 460.0);
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    let label_space = 150.0_f32.min(rect.width() / 4.0);
    let plot_rect = Rect::from_min_max(rect.min, pos2(rect.max.x - label_space, rect.max.y));
    let flow = layout(diagram, plot_rect);

    let colors = ColorMap::new(diagram.stages[0].iter().map(|&n| diagram.labels[n].as_str()));
    let painter = ui.painter_at(rect);

    for link in &flow.links {
        // First-layer bands take their origin's colour; the second layer is grey.
        let tint = if link.layer == 0 {
            colors.color_for(&diagram.labels[link.source])
        } else {
            Color32::from_gray(150)
        };
        painter.add(Shape::line(
            curve(link.from, link.to),
            Stroke::new(link.width.max(1.0), tint.gamma_multiply(0.45)),
        ));
    }

    for node in &flow.nodes {
        let label = &diagram.labels[node.node];
        let fill = if node.stage == 0 {
            colors.color_for(label)
        } else {
            Color32::from_gray(110)
        };
        painter.rect_filled(node.rect, 1.0, fill);
        if node.rect.height() >= 9.0 {
            painter.text(
                pos2(node.rect.max.x + 4.0, node.rect.center().y),
                Align2::LEFT_CENTER,
                label,
                FontId::proportional(11.0),
                ui.visuals().text_color(),
            );
        }
    }

    if let Some(pos) = response.hover_pos() {
        if let Some(node) = flow.nodes.iter().find(|n| n.rect.expand(2.0).contains(pos)) {
            response.on_hover_text_at_pointer(format!(
                "{}\n{}",
                diagram.labels[node.node],
                format::measure(node.value, measure)
            ));
        }
    }
}
