use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Password};

use crate::api::BLS_API_URL;
use crate::window::WINDOW_YEARS;

// ----------------------- CLI -----------------------
#[derive(Parser, Debug)]
#[command(
    name = "cpi-pull",
    about = "Pull BLS price-index series in 20-year windows and write one CSV per series."
)]
pub struct Args {
    /// Table listing the series codes to fetch
    #[arg(long, default_value = "derived_data/CEX/seriesid.csv")]
    pub input: PathBuf,

    /// Output files are written to <prefix><row index>.csv
    #[arg(long, default_value = "derived_data/CPI/seriesprices_na_")]
    pub output_prefix: String,

    /// Column of the input table holding the series codes
    #[arg(long, default_value = "CPICode")]
    pub code_column: String,

    #[arg(long, default_value_t = 1961)]
    pub min_year: i32,

    #[arg(long, default_value_t = 2022)]
    pub max_year: i32,

    /// BLS registration key (optional; otherwise interactive)
    #[arg(long, env = "BLS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "BLS_API_URL", default_value = BLS_API_URL)]
    pub endpoint: String,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Stop the last window at --max-year instead of running a full 20 years
    #[arg(long, default_value_t = false)]
    pub clamp_end_year: bool,

    /// Name output files by series code rather than input row position
    #[arg(long, default_value_t = false)]
    pub name_by_code: bool,

    /// Print debug info
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Only print warnings and errors to stderr
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

// ----------------------- Fetch configuration -----------------------
/// The API takes years as 4-digit strings.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub input: PathBuf,
    pub output_prefix: String,
    pub code_column: String,
    pub min_year: i32,
    pub max_year: i32,
    pub window_years: i32,
    pub clamp_end_year: bool,
    pub name_by_code: bool,
}

impl FetchConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let cfg = FetchConfig {
            input: args.input.clone(),
            output_prefix: args.output_prefix.clone(),
            code_column: args.code_column.trim().to_string(),
            min_year: args.min_year,
            max_year: args.max_year,
            window_years: WINDOW_YEARS,
            clamp_end_year: args.clamp_end_year,
            name_by_code: args.name_by_code,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (flag, year) in [("--min-year", self.min_year), ("--max-year", self.max_year)] {
            if !YEAR_RANGE.contains(&year) {
                return Err(anyhow!("{} must be a 4-digit year, got {}", flag, year));
            }
        }
        if self.max_year < self.min_year {
            return Err(anyhow!("--max-year must be >= --min-year"));
        }
        if self.code_column.is_empty() {
            return Err(anyhow!("--code-column must not be empty"));
        }
        Ok(())
    }
}

pub fn request_timeout(args: &Args) -> Option<Duration> {
    args.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
}

/// The registration key from --api-key / BLS_API_KEY, else a hidden prompt.
pub fn resolve_api_key(args: &Args) -> Result<String> {
    let key = match args.api_key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("BLS registration key")
            .interact()
            .context("No API key given (set BLS_API_KEY or pass --api-key)")?
            .trim()
            .to_string(),
    };

    if key.is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["cpi-pull"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_original_pull() {
        let args = parse(&["--api-key", "k"]);
        let cfg = FetchConfig::from_args(&args).unwrap();
        assert_eq!(cfg.input, PathBuf::from("derived_data/CEX/seriesid.csv"));
        assert_eq!(cfg.output_prefix, "derived_data/CPI/seriesprices_na_");
        assert_eq!(cfg.code_column, "CPICode");
        assert_eq!((cfg.min_year, cfg.max_year), (1961, 2022));
        assert_eq!(cfg.window_years, 20);
        assert!(!cfg.clamp_end_year);
        assert!(!cfg.name_by_code);
        assert_eq!(args.endpoint, BLS_API_URL);
        assert_eq!(request_timeout(&args), None);
    }

    #[test]
    fn inverted_years_rejected() {
        let args = parse(&["--min-year", "2022", "--max-year", "2000"]);
        assert!(FetchConfig::from_args(&args).is_err());
    }

    #[test]
    fn years_must_have_four_digits() {
        let args = parse(&["--min-year", "2147483640", "--max-year", "2147483647"]);
        let err = FetchConfig::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("--min-year"));

        let args = parse(&["--min-year", "1961", "--max-year", "10000"]);
        assert!(FetchConfig::from_args(&args).is_err());

        let args = parse(&["--min-year", "1000", "--max-year", "9999"]);
        assert!(FetchConfig::from_args(&args).is_ok());
    }

    #[test]
    fn explicit_key_is_trimmed() {
        let args = parse(&["--api-key", "  abc123 "]);
        assert_eq!(resolve_api_key(&args).unwrap(), "abc123");
    }

    #[test]
    fn timeout_and_log_level() {
        let args = parse(&["--timeout-secs", "30", "-v"]);
        assert_eq!(request_timeout(&args), Some(Duration::from_secs(30)));
        assert_eq!(args.log_level(), "debug");
        assert_eq!(parse(&["-q"]).log_level(), "warn");
        assert!(Args::try_parse_from(["cpi-pull", "-q", "-v"]).is_err());
    }
}
