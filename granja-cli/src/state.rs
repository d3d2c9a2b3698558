use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$GRANJA_HOME`, or `~/.granja`.
pub fn granja_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("GRANJA_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".granja"))
}

pub fn ensure_granja_home() -> Result<PathBuf> {
    let dir = granja_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
