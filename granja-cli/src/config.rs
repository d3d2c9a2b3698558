use anyhow::{Context, Result};
use granja_core::{CanonicalRule, GroupKey, Normalizer, ReportAssembler, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_granja_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub normalizer: NormalizerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSection {
    /// "stub", "openai" or "anthropic".
    pub provider: String,
    pub model: String,
    /// Overrides the provider's public endpoint (proxies, local servers).
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSection {
    pub top_n: usize,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Extra canonicalization rules, tried after the built-in ones. They drive
/// grouping keys and the rule step of `categorize`/`recategorize --suggest`;
/// categories stored in a ledger are still derived with the built-in rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NormalizerSection {
    #[serde(default)]
    pub rules: Vec<CanonicalRule>,
}

impl Config {
    pub fn normalizer(&self) -> Result<Normalizer> {
        Normalizer::with_rules(self.normalizer.rules.clone()).context("invalid [normalizer] rules")
    }

    pub fn assembler(&self, group_key: GroupKey) -> Result<ReportAssembler> {
        Ok(ReportAssembler::default()
            .with_top_n(self.report.top_n)
            .with_group_key(group_key)
            .with_normalizer(self.normalizer()?))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_granja_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
