//! Configuration parsing and validation.
//!
//! Lead Intake is configured via a TOML file (default: `config/leadq.toml`).
//! Only `[db]` is required. The rule tables (`[scoring]`, `[classifier]`,
//! `[tracking]`) default to the built-in values and may be overridden field
//! by field.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/leads.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [scoring]
//! business_hours_percent = 125
//!
//! [tracking]
//! email = 5
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use lead_intake_core::classifier::ClassifierRules;
use lead_intake_core::scoring::ScoringWeights;
use lead_intake_core::tracker::ContributionTable;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub classifier: ClassifierRules,
    #[serde(default)]
    pub tracking: ContributionTable,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let s = &config.scoring;
    for (name, weight) in [
        ("call_answered", s.call_answered),
        ("form_submission", s.form_submission),
        ("email_provided", s.email_provided),
        ("phone_provided", s.phone_provided),
        ("organic_bonus", s.organic_bonus),
        ("social_bonus", s.social_bonus),
        ("mobile_bonus", s.mobile_bonus),
        ("long_call_bonus", s.long_call_bonus),
    ] {
        if weight < 0 {
            anyhow::bail!("scoring.{} must be >= 0", name);
        }
    }
    if s.business_hours_percent < 100 {
        anyhow::bail!("scoring.business_hours_percent must be >= 100");
    }
    if s.business_hours_start > s.business_hours_end || s.business_hours_end > 23 {
        anyhow::bail!(
            "scoring business hours must satisfy start <= end <= 23 (got {}..={})",
            s.business_hours_start,
            s.business_hours_end
        );
    }
    if s.status_bands.is_empty() {
        anyhow::bail!("scoring.status_bands must not be empty");
    }
    if s.status_bands.windows(2).any(|w| w[0].min <= w[1].min) {
        anyhow::bail!("scoring.status_bands must be ordered highest threshold first");
    }

    let c = &config.classifier;
    if c.intents.is_empty() {
        anyhow::bail!("classifier.intents must not be empty");
    }
    if c.compound_percent < 100 {
        anyhow::bail!("classifier.compound_percent must be >= 100");
    }
    if let Some(p) = c.penalties.iter().find(|p| p.weight < 0) {
        anyhow::bail!("classifier penalty weight for {:?} must be >= 0", p.flag);
    }

    let t = &config.tracking;
    if [t.call, t.web_form, t.email, t.other].iter().any(|w| *w < 0) {
        anyhow::bail!("tracking contributions must be >= 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"leads.sqlite\"\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7341");
        assert_eq!(config.scoring, ScoringWeights::default());
        assert_eq!(config.tracking.call, 25);
        assert_eq!(config.classifier.score_cap, 40);
    }

    #[test]
    fn test_partial_override() {
        let config = parse(
            "[db]\npath = \"x.sqlite\"\n[scoring]\nbusiness_hours_percent = 150\n[tracking]\nemail = 3\n",
        )
        .unwrap();
        assert_eq!(config.scoring.business_hours_percent, 150);
        assert_eq!(config.scoring.call_answered, 25);
        assert_eq!(config.tracking.email, 3);
        assert_eq!(config.tracking.web_form, 15);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse("[db]\npath = \"x\"\n[scoring]\nbusiness_hours_percent = 90\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[scoring]\nmobile_bonus = -1\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[scoring]\nbusiness_hours_start = 18\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[tracking]\ncall = -5\n").is_err());
        assert!(parse("[server]\nbind = \"0.0.0.0:1\"\n").is_err());
    }
}
