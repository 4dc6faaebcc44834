//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Report format written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "agent-canary",
    about = "Synthetic agent traffic with fault injection",
    version,
    long_about = "Runs canary scenarios against a configurable agent and reports \
                  whether they passed. Telemetry is exported over OTLP."
)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "CANARY_CONFIG")]
    pub config: PathBuf,

    /// Log level; overrides `logging.level` from the configuration
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["agent-canary", "--config", "canary.yaml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("canary.yaml"));
        assert_eq!(args.output, OutputFormat::Text);
    }

    #[test]
    fn test_parse_json_output() {
        let args = Args::try_parse_from([
            "agent-canary",
            "-c",
            "canary.yaml",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(Args::try_parse_from(["agent-canary", "-c", "x", "-l", "loud"]).is_err());
    }
}
