//! Interactive dashboard over Bolivian export records.
//!
//! The [`data`] layer loads yearly export tables and answers filter queries;
//! [`app`] and [`ui`] render the answers with egui, and [`server`] exposes the
//! same queries as JSON over HTTP.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod format;
pub mod server;
pub mod state;
pub mod ui;
