//! JSON output files
//!
//! Every run overwrites its files. Parent directories are created on demand.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;

use crate::core::Gender;
use crate::error::AppError;
use crate::models::Player;

/// Write `value` as pretty-printed UTF-8 JSON, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body)?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Directory layout under an output root
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn players(&self) -> PathBuf {
        self.root.join("players")
    }

    pub fn matches(&self) -> PathBuf {
        self.root.join("matches")
    }

    pub fn gender(&self) -> PathBuf {
        self.root.join("gender")
    }

    pub fn rankings(&self) -> PathBuf {
        self.root.join("rankings")
    }

    pub fn stats(&self) -> PathBuf {
        self.root.join("stats")
    }

    pub fn cache(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Create every subdirectory
    pub fn create_all(&self) -> Result<(), AppError> {
        for dir in [
            self.players(),
            self.matches(),
            self.gender(),
            self.rankings(),
            self.stats(),
            self.cache(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn gender_group(player: &Player) -> &'static str {
    player.gender.as_ref().map(Gender::label).unwrap_or("unknown")
}

/// Split players into `gender/players_<group>.json`; empty groups are skipped
///
/// Returns the files written.
pub fn save_players_by_gender<'a, I>(layout: &OutputLayout, players: I) -> Result<Vec<PathBuf>, AppError>
where
    I: IntoIterator<Item = &'a Player>,
{
    let mut groups: Vec<(&'static str, Vec<&Player>)> = ["men", "women", "mixed", "unknown"]
        .into_iter()
        .map(|g| (g, Vec::new()))
        .collect();

    for player in players {
        let group = gender_group(player);
        if let Some((_, members)) = groups.iter_mut().find(|(g, _)| *g == group) {
            members.push(player);
        }
    }

    let mut written = Vec::new();
    for (group, members) in groups {
        if members.is_empty() {
            continue;
        }
        let path = layout.gender().join(format!("players_{}.json", group));
        write_json(&path, &members)?;
        tracing::info!("Saved {} {} players to {}", members.len(), group, path.display());
        written.push(path);
    }
    Ok(written)
}

/// Wrapper used for id lists that later runs read back as seeds
pub fn players_envelope<T: Serialize>(players: &[T], scraped_at: &str) -> serde_json::Value {
    json!({
        "scraped_at": scraped_at,
        "total_players": players.len(),
        "players": players,
    })
}
