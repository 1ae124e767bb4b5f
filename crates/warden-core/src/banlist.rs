//! Reloadable banned-word list.
//!
//! Newline-delimited file, normalized to lower-case at load. Reload swaps the
//! whole list under a write lock so a moderation check never observes a
//! half-updated list.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::info;

use crate::Result;

pub struct BannedWords {
    path: PathBuf,
    words: RwLock<Vec<String>>,
}

impl BannedWords {
    /// Load the list from `path`. A missing file is an empty list, not an
    /// error (the list may simply not have been provisioned yet).
    pub fn load(path: &Path) -> Result<Self> {
        let words = read_words(path)?;
        info!("loaded {} banned words from {}", words.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            words: RwLock::new(words),
        })
    }

    /// Re-read the file and atomically swap the in-memory list.
    /// Returns the new word count. Admin-only at the command layer.
    pub fn reload(&self) -> Result<usize> {
        let fresh = read_words(&self.path)?;
        let count = fresh.len();
        let mut guard = self.words.write().unwrap_or_else(|p| p.into_inner());
        *guard = fresh;
        Ok(count)
    }

    /// Case-insensitive substring match against a consistent snapshot.
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        let guard = self.words.read().unwrap_or_else(|p| p.into_inner());
        guard.iter().any(|w| lower.contains(w.as_str()))
    }

    pub fn len(&self) -> usize {
        self.words.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_words(path: &Path) -> Result<Vec<String>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(parse_words(&contents))
}

fn parse_words(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.txt"))
    }

    #[test]
    fn parse_normalizes_and_skips_blanks() {
        let words = parse_words("  SPAM \n\ncasino\n\t\n Crypto ");
        assert_eq!(words, vec!["spam", "casino", "crypto"]);
    }

    #[test]
    fn matches_is_case_insensitive_substring() {
        let path = tmp("warden-banlist");
        fs::write(&path, "spam\ncasino\n").unwrap();
        let list = BannedWords::load(&path).unwrap();

        assert!(list.matches("Visit our CASINO tonight"));
        assert!(list.matches("spamspamspam"));
        assert!(!list.matches("a perfectly fine message"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_empty_list() {
        let list = BannedWords::load(Path::new("/tmp/warden-banlist-definitely-missing")).unwrap();
        assert!(list.is_empty());
        assert!(!list.matches("anything"));
    }

    #[test]
    fn reload_swaps_the_list() {
        let path = tmp("warden-banlist-reload");
        fs::write(&path, "old\n").unwrap();
        let list = BannedWords::load(&path).unwrap();
        assert!(list.matches("old news"));

        fs::write(&path, "new\nwords\n").unwrap();
        let count = list.reload().unwrap();
        assert_eq!(count, 2);
        assert!(!list.matches("old news"));
        assert!(list.matches("breaking NEW s"));

        let _ = fs::remove_file(&path);
    }
}
