use std::{net::IpAddr, path::PathBuf};

use clap::Parser;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// address to listen on
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    pub bind_address: IpAddr,
    /// port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// YAML file with the metric series to serve
    #[arg(short = 'c', long)]
    pub metrics_config: PathBuf,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace")]
    pub trace_logging: bool,
}

impl Cli {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}
