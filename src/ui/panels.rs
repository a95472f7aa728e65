use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::MonthSelection;
use crate::data::loader::load_sources;
use crate::data::model::Dimension;
use crate::data::query::QueryOutcome;
use crate::format;
use crate::state::{AppState, FilterEvent};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel and return the interactions it produced.
pub fn side_panel(ui: &mut Ui, state: &AppState) -> Vec<FilterEvent> {
    let mut events = Vec::new();

    ui.heading("Filtros");
    ui.separator();

    let (Some(spec), false) = (&state.spec, state.dataset.is_empty()) else {
        ui.label("No hay datos cargados.");
        return events;
    };
    let dataset = &state.dataset;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Year / month selectors ----
            ui.strong("Año");
            egui::ComboBox::from_id_salt("period")
                .selected_text(spec.period.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for period in dataset.periods() {
                        if ui
                            .selectable_label(spec.period == period, period.to_string())
                            .clicked()
                        {
                            events.push(FilterEvent::SetPeriod { period });
                        }
                    }
                });

            ui.strong("Mes (opcional)");
            egui::ComboBox::from_id_salt("month")
                .selected_text(format::month_label(spec.month))
                .show_ui(ui, |ui: &mut Ui| {
                    let options = std::iter::once(MonthSelection::All)
                        .chain(dataset.months().map(MonthSelection::Month));
                    for month in options {
                        if ui
                            .selectable_label(spec.month == month, format::month_label(month))
                            .clicked()
                        {
                            events.push(FilterEvent::SetMonth { month });
                        }
                    }
                });
            ui.separator();

            // ---- Per-dimension multi-selects (collapsible) ----
            for dimension in Dimension::ALL {
                let n_selected = spec.active(dimension).map_or(0, |s| s.len());
                let n_total = dataset.domain(dimension).count();
                let header_text = if n_selected == 0 {
                    format!("{}  (todos)", dimension.label())
                } else {
                    format!("{}  ({n_selected}/{n_total})", dimension.label())
                };

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dimension)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        if ui.small_button("Todos").clicked() {
                            events.push(FilterEvent::Clear { dimension });
                        }

                        ScrollArea::vertical()
                            .id_salt(("values", dimension))
                            .max_height(200.0)
                            .show(ui, |ui: &mut Ui| {
                                for value in dataset.domain(dimension) {
                                    let mut checked = state.is_selected(dimension, value);
                                    if ui.checkbox(&mut checked, value).changed() {
                                        events.push(FilterEvent::Toggle {
                                            dimension,
                                            value: value.to_string(),
                                        });
                                    }
                                }
                            });
                    });
            }
        });

    events
}

// ---------------------------------------------------------------------------
// KPI header
// ---------------------------------------------------------------------------

/// Render the headline figures above the charts.
pub fn kpi_header(ui: &mut Ui, state: &AppState) {
    let Some(spec) = &state.spec else {
        return;
    };
    ui.heading(format::department_heading(spec));
    match &state.outcome {
        QueryOutcome::Dashboard(d) => {
            ui.horizontal(|ui: &mut Ui| {
                let value = format!("Valor Total: {}", format::usd(d.kpis.total_value));
                ui.label(RichText::new(value).size(16.0));
                ui.separator();
                let weight = format!("Peso Neto Total: {}", format::kg(d.kpis.total_weight));
                ui.label(RichText::new(weight).size(16.0));
            });
        }
        QueryOutcome::NoData { .. } => {
            ui.label(RichText::new("Valor Total: sin datos").size(16.0));
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Archivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if !state.dataset.is_empty() {
            let visible = state
                .outcome
                .dashboard()
                .map_or(0, |d| d.kpis.record_count);
            ui.label(format!(
                "{} registros cargados, {} visibles",
                format::group_thousands(state.dataset.len() as u64),
                format::group_thousands(visible as u64)
            ));
        }

        for warning in &state.warnings {
            ui.separator();
            ui.label(RichText::new(warning).color(Color32::YELLOW));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Abrir exportaciones")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_files();

    if let Some(paths) = files {
        let report = load_sources(&paths);
        if report.dataset.is_empty() {
            log::error!("None of {paths:?} produced any records");
            state.status_message = Some("Error: los archivos no contienen registros".to_string());
            return;
        }
        log::info!("Loaded {} export records", report.dataset.len());
        state.set_dataset(report);
    }
}
