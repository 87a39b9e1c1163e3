//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::query::QueryParameters;

/// Resilient query gateway for the USPTO Enriched Citation API
#[derive(Parser, Debug)]
#[command(name = "citation-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CITATION_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "CITATION_GATEWAY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CITATION_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a citation search through the resilience pipeline
    Search(SearchArgs),

    /// Validate a raw Lucene criteria expression
    Validate {
        /// Criteria expression to validate
        criteria: String,
    },

    /// Load the configuration and print the effective values
    ConfigCheck,
}

/// Search parameters and pagination
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Raw Lucene criteria, combined with the typed parameters via AND
    #[arg(long, default_value = "")]
    pub criteria: String,

    /// Applicant name (phrase-matched)
    #[arg(long)]
    pub applicant_name: Option<String>,

    /// Patent application number
    #[arg(long)]
    pub application_number: Option<String>,

    /// Publication number of a granted patent
    #[arg(long)]
    pub patent_number: Option<String>,

    /// Technology center, e.g. 2100
    #[arg(long)]
    pub tech_center: Option<String>,

    /// Group art unit number, e.g. 2128
    #[arg(long)]
    pub art_unit: Option<String>,

    /// Office action decision type code
    #[arg(long)]
    pub decision_type: Option<String>,

    /// Citation category code, e.g. X
    #[arg(long)]
    pub category_code: Option<String>,

    /// Inclusive office-action date range start, YYYY-MM-DD
    #[arg(long)]
    pub date_start: Option<String>,

    /// Inclusive office-action date range end, YYYY-MM-DD
    #[arg(long)]
    pub date_end: Option<String>,

    /// Filter on examiner-cited references
    #[arg(long)]
    pub examiner_cited: Option<bool>,

    /// Zero-based result offset
    #[arg(long, default_value_t = 0)]
    pub start: u32,

    /// Number of rows to return
    #[arg(long, default_value_t = 50)]
    pub rows: u32,

    /// Build and print the query without calling the remote service
    #[arg(long)]
    pub dry_run: bool,
}

impl SearchArgs {
    /// Convert CLI arguments into query parameters
    #[must_use]
    pub fn to_params(&self) -> QueryParameters {
        QueryParameters {
            criteria: self.criteria.clone(),
            applicant_name: self.applicant_name.clone(),
            application_number: self.application_number.clone(),
            patent_number: self.patent_number.clone(),
            tech_center: self.tech_center.clone(),
            art_unit: self.art_unit.clone(),
            decision_type: self.decision_type.clone(),
            category_code: self.category_code.clone(),
            date_start: self.date_start.clone(),
            date_end: self.date_end.clone(),
            examiner_cited: self.examiner_cited,
        }
    }
}
