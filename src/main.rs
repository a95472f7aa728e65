use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eframe::egui;

use export_lens::app::ExportLensApp;
use export_lens::config::{Args, Command};
use export_lens::data::loader::{load_sources, LoadReport};
use export_lens::data::query::QueryOptions;
use export_lens::server::{self, ServerState};
use export_lens::state::AppState;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.default_log_filter()),
    )
    .init();

    let report = load_sources(&args.files);
    let options = args.query_options();

    match args.command.unwrap_or(Command::Gui).bind_addr() {
        Some(addr) => run_server(addr, report, options),
        None => run_gui(AppState::new(report, options)),
    }
}

fn run_gui(state: AppState) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Exportaciones Bolivianas – Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(ExportLensApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("desktop window failed: {e}"))
}

fn run_server(addr: SocketAddr, report: LoadReport, options: QueryOptions) -> anyhow::Result<()> {
    let state = ServerState {
        dataset: Arc::new(report.dataset),
        options: Arc::new(options),
    };
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?
        .block_on(server::serve(addr, state))
        .with_context(|| format!("serving on {addr}"))
}
