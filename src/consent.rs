//! Consent banner interaction.
//!
//! Loads the word list of known consent-button labels and clicks the first
//! page element whose text matches one. Click failures are counted and the
//! pass moves on to the next candidate; they never abort the visit.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::driver::PageDriver;

/// Lowercased set of consent-button label strings.
#[derive(Debug, Clone, Default)]
pub struct AcceptWords {
    words: HashSet<String>,
}

impl AcceptWords {
    /// Loads a word list file: one label per line, `#` comments and blank
    /// lines skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read accept-word list {}", path.display()))?;
        Ok(Self::from_lines(raw.lines()))
    }

    pub fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let words = lines
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.to_lowercase())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether an element's text corresponds to a consent label. The text
    /// is lowercased and trimmed of decoration characters before lookup.
    pub fn matches(&self, text: &str) -> bool {
        let normalized = text
            .to_lowercase()
            .trim_matches(|c: char| matches!(c, ' ' | '✓' | '›' | '!' | '\n'))
            .to_string();
        !normalized.is_empty() && self.words.contains(&normalized)
    }
}

/// Clicks the consent banner if one is present.
///
/// Scans the driver's candidate elements in document order and clicks the
/// first one whose text matches the word list; stops after the first
/// successful click. Returns the number of click failures encountered.
pub async fn accept_cookies<D: PageDriver>(driver: &mut D, words: &AcceptWords) -> u32 {
    let mut click_errors = 0;
    for candidate in driver.consent_candidates() {
        if !words.matches(&candidate.text) {
            continue;
        }
        match driver.click(&candidate).await {
            Ok(()) => break,
            Err(e) => {
                log::error!("Consent click error on <{}>: {e:#}", candidate.tag);
                click_errors += 1;
            }
        }
    }
    click_errors
}
