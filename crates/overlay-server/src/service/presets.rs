use std::collections::BTreeMap;

use overlay_proto::Layer;

use crate::error::AuthorityError;

const MAX_NAME_CHARS: usize = 64;

/// Keep letters, digits and `-_. `, cut to 64 characters, trim, and turn
/// spaces into underscores. Returns `None` when nothing usable remains.
pub fn sanitize_name(name: &str) -> Option<String> {
    let kept: String = name
        .trim()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' '))
        .take(MAX_NAME_CHARS)
        .collect();
    let safe = kept.trim().replace(' ', "_");
    (!safe.is_empty()).then_some(safe)
}

/// Named scene snapshots, kept in memory.
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    presets: BTreeMap<String, Vec<Layer>>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `items` under the sanitized `name`; returns the stored name.
    pub fn save(&mut self, name: &str, items: Vec<Layer>) -> Result<String, AuthorityError> {
        let safe = sanitize_name(name).ok_or_else(|| AuthorityError::InvalidPresetName(name.to_string()))?;
        self.presets.insert(safe.clone(), items);
        Ok(safe)
    }

    pub fn load(&self, name: &str) -> Result<Vec<Layer>, AuthorityError> {
        self.presets
            .get(name.trim())
            .cloned()
            .ok_or_else(|| AuthorityError::PresetNotFound(name.to_string()))
    }

    /// Names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }
}
