use eframe::egui::{self, pos2, vec2, Align2, Color32, FontId, Rect, Sense, Ui};

use crate::color::{shade, ColorMap};
use crate::data::aggregate::TreeNode;
use crate::data::model::Measure;
use crate::format;

/// Height of the label strip above nested tiles.
const HEADER: f32 = 16.0;
const PADDING: f32 = 2.0;

/// One painted rectangle of the treemap.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub rect: Rect,
    pub label: String,
    pub value: u64,
    /// 0 for the first level below the root.
    pub depth: usize,
    /// Label of the first-level ancestor, used for colouring.
    pub group: String,
    pub is_leaf: bool,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Lay out every descendant of `root` inside `bounds`, parents before children.
pub fn layout(root: &TreeNode, bounds: Rect) -> Vec<Tile> {
    let mut tiles = Vec::new();
    layout_children(root, bounds, 0, None, &mut tiles);
    tiles
}

fn layout_children(
    node: &TreeNode,
    bounds: Rect,
    depth: usize,
    group: Option<&str>,
    out: &mut Vec<Tile>,
) {
    // Largest first gives squarer tiles.
    let mut order: Vec<&TreeNode> = node.children.iter().collect();
    order.sort_by(|a, b| b.value.cmp(&a.value));

    let weights: Vec<f64> = order.iter().map(|c| c.value as f64).collect();
    for (child, rect) in order.into_iter().zip(squarify(&weights, bounds)) {
        let group = group.unwrap_or(&child.label);
        out.push(Tile {
            rect,
            label: child.label.clone(),
            value: child.value,
            depth,
            group: group.to_string(),
            is_leaf: child.is_leaf(),
        });

        if !child.is_leaf() {
            let inner = Rect::from_min_max(
                pos2(rect.min.x + PADDING, rect.min.y + HEADER),
                pos2(rect.max.x - PADDING, rect.max.y - PADDING),
            );
            if inner.width() > 0.0 && inner.height() > 0.0 {
                layout_children(child, inner, depth + 1, Some(group), out);
            }
        }
    }
}

/// Squarified treemap split of `rect` into areas proportional to `weights`.
pub fn squarify(weights: &[f64], rect: Rect) -> Vec<Rect> {
    let total: f64 = weights.iter().sum();
    let empty = Rect::from_min_size(rect.min, egui::Vec2::ZERO);
    if total <= 0.0 || rect.area() <= 0.0 {
        return vec![empty; weights.len()];
    }

    let scale = rect.area() as f64 / total;
    let areas: Vec<f64> = weights.iter().map(|w| w * scale).collect();

    let mut out = Vec::with_capacity(areas.len());
    let mut remaining = rect;
    let mut start = 0;

    while start < areas.len() {
        let side = remaining.width().min(remaining.height()) as f64;
        let mut end = start + 1;
        let mut best = worst_ratio(&areas[start..end], side);
        while end < areas.len() {
            let candidate = worst_ratio(&areas[start..=end], side);
            if candidate > best {
                break;
            }
            best = candidate;
            end += 1;
        }

        let row = &areas[start..end];
        let row_sum: f64 = row.iter().sum();
        if row_sum <= 0.0 || remaining.area() <= 0.0 {
            out.extend(row.iter().map(|_| Rect::from_min_size(remaining.min, egui::Vec2::ZERO)));
        } else if remaining.width() >= remaining.height() {
            // Column along the left edge.
            let w = (row_sum / remaining.height() as f64) as f32;
            let mut y = remaining.min.y;
            for a in row {
                let h = (a / w as f64) as f32;
                out.push(Rect::from_min_size(pos2(remaining.min.x, y), vec2(w, h)));
                y += h;
            }
            remaining.min.x += w;
        } else {
            // Row along the top edge.
            let h = (row_sum / remaining.width() as f64) as f32;
            let mut x = remaining.min.x;
            for a in row {
                let w = (a / h as f64) as f32;
                out.push(Rect::from_min_size(pos2(x, remaining.min.y), vec2(w, h)));
                x += w;
            }
            remaining.min.y += h;
        }
        start = end;
    }
    out
}

/// Worst aspect ratio of a row of `areas` laid along a side of length `side`.
fn worst_ratio(areas: &[f64], side: f64) -> f64 {
    let sum: f64 = areas.iter().sum();
    let max = areas.iter().copied().fold(0.0, f64::max);
    let min = areas.iter().copied().fold(f64::INFINITY, f64::min);
    if sum <= 0.0 || min <= 0.0 {
        return f64::INFINITY;
    }
    let (s2, w2) = (sum * sum, side * side);
    (w2 * max / s2).max(s2 / (w2 * min))
}

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

/// Render the hierarchy as a treemap filling the available width.
pub fn treemap(ui: &mut Ui, title: &str, root: &TreeNode, measure: Measure) {
    ui.strong(title);

    let size = vec2(ui.available_width(), 420.0);
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    let tiles = layout(root, rect);
    let colors = ColorMap::new(tiles.iter().filter(|t| t.depth == 0).map(|t| t.label.as_str()));

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 2.0, ui.visuals().extreme_bg_color);

    for tile in &tiles {
        if tile.rect.width() < 1.0 || tile.rect.height() < 1.0 {
            continue;
        }
        let fill = shade(colors.color_for(&tile.group), tile.depth);
        painter.rect_filled(tile.rect.shrink(0.5), 2.0, fill);

        let text = if tile.is_leaf {
            format!("{}\n{}", tile.label, format::measure(tile.value, measure))
        } else {
            tile.label.clone()
        };
        if tile.rect.width() > 40.0 && tile.rect.height() > 14.0 {
            painter.with_clip_rect(tile.rect.shrink(1.0)).text(
                tile.rect.min + vec2(3.0, 2.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(11.0),
                Color32::BLACK,
            );
        }
    }

    if let Some(pos) = response.hover_pos() {
        // Deepest tile under the pointer wins: children come after parents.
        if let Some(tile) = tiles.iter().rev().find(|t| t.rect.contains(pos)) {
            response.on_hover_text_at_pointer(format!(
                "{}\n{}",
                tile.label,
                format::measure(tile.value, measure)
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(label: &str, value: u64) -> TreeNode {
        TreeNode {
            label: label.to_string(),
            value,
            children: Vec::new(),
        }
    }

    #[test]
    fn squarify_preserves_area_proportions() {
        let bounds = Rect::from_min_size(pos2(0.0, 0.0), vec2(600.0, 400.0));
        let weights = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let rects = squarify(&weights, bounds);
        let total: f64 = weights.iter().sum();

        assert_eq!(rects.len(), weights.len());
        for (r, w) in rects.iter().zip(weights) {
            let expected = bounds.area() as f64 * w / total;
            assert!((r.area() as f64 - expected).abs() < 1.0, "{r:?} vs {expected}");
            assert!(bounds.expand(0.01).contains_rect(*r));
        }
    }

    #[test]
    fn squarify_handles_zero_total() {
        let bounds = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let rects = squarify(&[0.0, 0.0], bounds);
        assert!(rects.iter().all(|r| r.area() == 0.0));
    }

    #[test]
    fn layout_nests_children_inside_parents() {
        let root = TreeNode {
            label: "Total".into(),
            value: 30,
            children: vec![
                TreeNode {
                    label: "Minería".into(),
                    value: 20,
                    children: vec![leaf("Estaño", 15), leaf("Zinc", 5)],
                },
                leaf("Agro", 10),
            ],
        };
        let bounds = Rect::from_min_size(pos2(0.0, 0.0), vec2(300.0, 200.0));
        let tiles = layout(&root, bounds);

        assert_eq!(tiles.len(), 4);
        let mineria = tiles.iter().find(|t| t.label == "Minería").unwrap();
        for child in tiles.iter().filter(|t| t.depth == 1) {
            assert_eq!(child.group, "Minería");
            assert!(mineria.rect.contains_rect(child.rect));
        }
    }
}
