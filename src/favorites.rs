use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::coin::Coin;

/// User-pinned coin snapshots, persisted as one JSON file that is
/// rewritten whole on every mutation (last writer wins).
///
/// Entries are full snapshots, not ids: a favorite keeps showing the
/// price it was saved at, even after later fetches move the market.
#[derive(Clone, Debug, Default)]
pub struct Favorites {
    path: PathBuf,
    coins: Vec<Coin>,
}

impl Favorites {
    /// Reads the favorites file. A missing or malformed file is an empty
    /// set, never an error; parse failures are logged and swallowed.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let coins = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(coins) => coins,
                Err(err) => {
                    debug!("ignoring malformed favorites file {}: {err}", path.display());
                    Vec::new()
                }
            },
            Err(err) => {
                debug!("no favorites file at {}: {err}", path.display());
                Vec::new()
            }
        };
        Self { path, coins }
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn contains(&self, coin_id: &str) -> bool {
        self.coins.iter().any(|coin| coin.id == coin_id)
    }

    /// Adds the coin if absent, removes it if present, then persists.
    /// Returns whether the coin is a favorite afterwards.
    pub fn toggle(&mut self, coin: &Coin) -> Result<bool> {
        let favorite = if self.contains(&coin.id) {
            self.coins.retain(|saved| saved.id != coin.id);
            false
        } else {
            self.coins.push(coin.clone());
            true
        };
        self.save()?;
        Ok(favorite)
    }

    pub fn remove(&mut self, coin_id: &str) -> Result<()> {
        self.coins.retain(|saved| saved.id != coin_id);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.coins).context("serializing favorites")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing favorites to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: &str) -> Coin {
        Coin {
            id: id.to_string(),
            name: id.to_string(),
            symbol: id.to_string(),
            ..Default::default()
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("coinwatch-test-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_add_then_read_contains_once() {
        let path = temp_path("add");
        let _ = fs::remove_file(&path);

        let mut favorites = Favorites::load(&path);
        favorites.toggle(&coin("bitcoin")).unwrap();

        let reloaded = Favorites::load(&path);
        let hits = reloaded
            .coins()
            .iter()
            .filter(|saved| saved.id == "bitcoin")
            .count();
        assert_eq!(hits, 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_remove_then_read_is_absent() {
        let path = temp_path("remove");
        let _ = fs::remove_file(&path);

        let mut favorites = Favorites::load(&path);
        favorites.toggle(&coin("bitcoin")).unwrap();
        favorites.remove("bitcoin").unwrap();

        let reloaded = Favorites::load(&path);
        assert!(!reloaded.contains("bitcoin"));
        assert!(reloaded.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_double_toggle_restores_membership() {
        let path = temp_path("toggle");
        let _ = fs::remove_file(&path);

        let mut favorites = Favorites::load(&path);
        favorites.toggle(&coin("ethereum")).unwrap();
        let before: Vec<String> = favorites.coins().iter().map(|c| c.id.clone()).collect();

        assert!(favorites.toggle(&coin("solana")).unwrap());
        assert!(!favorites.toggle(&coin("solana")).unwrap());

        let after: Vec<String> = favorites.coins().iter().map(|c| c.id.clone()).collect();
        assert_eq!(before, after);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_reads_as_empty() {
        let path = temp_path("malformed");
        fs::write(&path, "{not json at all").unwrap();

        let favorites = Favorites::load(&path);
        assert!(favorites.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        let favorites = Favorites::load(&path);
        assert!(favorites.is_empty());
    }
}
