use eframe::egui::{Color32, Ui};
use egui_plot::{uniform_grid_spacer, Bar, BarChart, Plot};

use crate::data::aggregate::RankEntry;
use crate::data::model::{Dimension, Measure};
use crate::format;
use crate::state::FilterEvent;

// ---------------------------------------------------------------------------
// Ranking charts (central panel)
// ---------------------------------------------------------------------------

/// Height of one bar row in points.
const ROW_HEIGHT: f32 = 22.0;

/// Render a horizontal bar chart of a ranking.
///
/// Entries arrive in ascending order, so the largest bar ends up on top.
/// Returns a [`FilterEvent::ChartClick`] when a bar is clicked.
pub fn ranking_chart(
    ui: &mut Ui,
    title: &str,
    dimension: Dimension,
    entries: &[RankEntry],
    measure: Measure,
    color: Color32,
) -> Option<FilterEvent> {
    ui.strong(title);

    if entries.is_empty() {
        ui.label("Ningún grupo supera el umbral del gráfico.");
        return None;
    }

    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            Bar::new(i as f64, e.total as f64)
                .name(&e.label)
                .width(0.7)
        })
        .collect();

    let chart = BarChart::new(bars)
        .horizontal()
        .color(color)
        .element_formatter(Box::new(move |bar, _chart| {
            format!("{}\n{}", bar.name, format::measure(bar.value as u64, measure))
        }));

    let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
    let height = (entries.len() as f32 * ROW_HEIGHT + 60.0).clamp(140.0, 520.0);

    let response = Plot::new(("ranking", dimension))
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid([true, false])
        .y_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .y_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .x_axis_formatter(|mark, _range| {
            if mark.value < 0.0 {
                String::new()
            } else {
                format::group_thousands(mark.value as u64)
            }
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
            if plot_ui.response().clicked() {
                plot_ui.pointer_coordinate().map(|p| p.y)
            } else {
                None
            }
        });

    let y = response.inner?;
    let idx = bar_at(y, entries.len())?;
    Some(FilterEvent::ChartClick {
        dimension,
        label: entries[idx].label.clone(),
    })
}

/// Index of the bar under plot coordinate `y`, if any.
fn bar_at(y: f64, len: usize) -> Option<usize> {
    let idx = y.round();
    if idx < 0.0 || (y - idx).abs() > 0.35 {
        return None;
    }
    let idx = idx as usize;
    (idx < len).then_some(idx)
}

/// Stand-in drawn instead of every chart when a query matched nothing.
pub fn no_data_placeholder(ui: &mut Ui, message: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading(format!("Sin datos: {message}"));
    });
}

#[cfg(test)]
mod tests {
    use super::bar_at;

    #[test]
    fn clicks_map_to_nearest_bar() {
        assert_eq!(bar_at(0.1, 3), Some(0));
        assert_eq!(bar_at(1.9, 3), Some(2));
        assert_eq!(bar_at(1.5, 3), None);
        assert_eq!(bar_at(3.0, 3), None);
        assert_eq!(bar_at(-0.8, 3), None);
    }
}
