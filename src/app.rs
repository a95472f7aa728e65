use eframe::egui::{self, Color32, ScrollArea, Ui};

use crate::data::model::Dimension;
use crate::data::query::QueryOutcome;
use crate::state::{AppState, FilterEvent};
use crate::ui::{flow, panels, plot, treemap};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ExportLensApp {
    pub state: AppState,
}

impl ExportLensApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for ExportLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Events are collected while drawing and applied afterwards, so each
        // frame renders one consistent state.
        let mut events: Vec<FilterEvent> = Vec::new();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                events.extend(panels::side_panel(ui, &self.state));
            });

        // ---- Central panel: KPIs and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::kpi_header(ui, &self.state);
            ui.separator();
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    events.extend(dashboard(ui, &self.state));
                });
        });

        for event in events {
            self.state.dispatch(event);
        }
    }
}

/// Draw every chart of the current outcome; returns chart clicks.
fn dashboard(ui: &mut Ui, state: &AppState) -> Vec<FilterEvent> {
    let mut events = Vec::new();
    let dashboard = match &state.outcome {
        QueryOutcome::Dashboard(d) => d,
        QueryOutcome::NoData { message } => {
            plot::no_data_placeholder(ui, message);
            return events;
        }
    };
    let measure = state.options.measure;
    let rankings = &dashboard.rankings;

    let charts = [
        (
            "Valor exportado por departamento de origen",
            Dimension::Department,
            &rankings.by_department,
            Color32::from_rgb(99, 110, 250),
        ),
        (
            "Valor exportado por país de destino",
            Dimension::Country,
            &rankings.by_country,
            Color32::from_rgb(0, 204, 150),
        ),
        (
            "Principales actividades",
            Dimension::Activity,
            &rankings.by_activity,
            Color32::from_rgb(239, 85, 59),
        ),
    ];
    for (title, dimension, entries, color) in charts {
        events.extend(plot::ranking_chart(ui, title, dimension, entries, measure, color));
        ui.add_space(12.0);
    }

    treemap::treemap(
        ui,
        "Exportaciones por industria > actividad > producto",
        &dashboard.hierarchy,
        measure,
    );
    ui.add_space(12.0);

    if let Some(diagram) = &dashboard.flows {
        flow::flow_diagram(
            ui,
            "Flujo departamento > categoría > país",
            diagram,
            measure,
        );
    }

    events
}
