//! In-memory scene document store.

use overlay_proto::Layer;

/// Ordered layer list addressed by layer id.
///
/// Updates replace in place so sequence position (and with it paint order
/// among equal `z`) is stable across edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneStore {
    items: Vec<Layer>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Layer>) -> Self {
        let mut store = Self::new();
        store.replace_all(items);
        store
    }

    pub fn get(&self, id: &str) -> Option<&Layer> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert `item` at the end, or replace the existing layer with the same id
    /// in place. Returns `true` when a new layer was inserted.
    pub fn upsert(&mut self, item: Layer) -> bool {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                false
            }
            None => {
                self.items.push(item);
                true
            }
        }
    }

    /// Returns the removed layer, if the id was present.
    pub fn remove(&mut self, id: &str) -> Option<Layer> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the whole document. Duplicate ids collapse onto the first
    /// occurrence's position with the last occurrence's content.
    pub fn replace_all(&mut self, items: Vec<Layer>) {
        self.items.clear();
        for item in items {
            self.upsert(item);
        }
    }

    pub fn snapshot(&self) -> Vec<Layer> {
        self.items.clone()
    }

    pub fn items(&self) -> &[Layer] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Highest `z` in the document, `1` for an empty one.
    pub fn max_z(&self) -> i32 {
        self.items.iter().map(|item| item.z).max().unwrap_or(1).max(1)
    }

    /// `z` that puts a layer above everything else, pinned at `i32::MAX`.
    pub fn next_z(&self) -> i32 {
        self.max_z().saturating_add(1)
    }
}

/// Layers in paint order: ascending `z`, ties broken by `id`.
pub fn paint_order(items: &[Layer]) -> Vec<&Layer> {
    let mut sorted: Vec<&Layer> = items.iter().collect();
    sorted.sort_by(|a, b| a.z.cmp(&b.z).then_with(|| a.id.cmp(&b.id)));
    sorted
}
