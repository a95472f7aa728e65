//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::data::aggregate::RankLimit;
use crate::data::model::Measure;
use crate::data::query::QueryOptions;

pub const DEFAULT_PORT: u16 = 8050;

/// Export Lens - interactive dashboard over Bolivian export records
///
/// Examples:
///   export-lens
///   export-lens --file exports_2023.csv,exports_2024.csv
///   PORT=9000 export-lens serve
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Export tables to load, one per year (comma-separated)
    ///
    /// Missing files are skipped with a warning.
    #[arg(
        short,
        long = "file",
        value_name = "FILE",
        value_delimiter = ',',
        env = "EXPORT_FILES",
        default_values = ["EXPORTACIONES_2023p.parquet", "EXPORTACIONES_2024p.parquet"]
    )]
    pub files: Vec<PathBuf>,

    /// Quantity summed by the charts
    #[arg(long, value_enum, default_value = "value")]
    pub measure: MeasureArg,

    /// Hide countries whose total does not exceed this amount
    #[arg(long, default_value = "100000", value_name = "AMOUNT")]
    pub country_cutoff: u64,

    /// Hide departments whose total does not exceed this amount
    #[arg(long, default_value = "100000", value_name = "AMOUNT")]
    pub department_cutoff: u64,

    /// Number of activities in the activity ranking
    #[arg(long, default_value = "15", value_name = "COUNT")]
    pub top_activities: usize,

    /// Skip the department → category → country flow diagram
    #[arg(long)]
    pub no_flows: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the desktop dashboard (default)
    Gui,
    /// Serve the query interface as JSON over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Interface to bind
        #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        host: IpAddr,
    },
}

impl Command {
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        match self {
            Command::Serve { port, host } => Some(SocketAddr::new(*host, *port)),
            Command::Gui => None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureArg {
    /// USD value
    Value,
    /// Net weight in kg
    Weight,
}

impl From<MeasureArg> for Measure {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::Value => Measure::Value,
            MeasureArg::Weight => Measure::NetWeight,
        }
    }
}

impl Args {
    /// Query knobs derived from the flags.
    pub fn query_options(&self) -> QueryOptions {
        let defaults = QueryOptions::default();
        QueryOptions {
            measure: self.measure.into(),
            country_limit: RankLimit::Above(self.country_cutoff),
            department_limit: RankLimit::Above(self.department_cutoff),
            activity_limit: RankLimit::Top(self.top_activities),
            flow: if self.no_flows { None } else { defaults.flow },
            hierarchy: defaults.hierarchy,
        }
    }

    /// Log filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard() {
        let args = Args::try_parse_from(["export-lens"]).unwrap();
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.command, None);
        assert_eq!(args.query_options(), QueryOptions::default());
    }

    #[test]
    fn serve_binds_all_interfaces() {
        let args = Args::try_parse_from(["export-lens", "serve", "--port", "9000"]).unwrap();
        let addr = args.command.unwrap().bind_addr().unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn files_are_comma_separated() {
        let args =
            Args::try_parse_from(["export-lens", "--file", "a.csv,b.json", "--no-flows"]).unwrap();
        assert_eq!(args.files, vec![PathBuf::from("a.csv"), PathBuf::from("b.json")]);
        assert!(args.query_options().flow.is_none());
    }
}
