use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

pub type MenuSnapshot = IndexMap<String, String>;

/// Logical menu name → deployed resource id.
///
/// Readers take an `Arc` snapshot and never observe a half-applied update;
/// writers build the next map off to the side and swap it in under the lock.
#[derive(Debug, Default)]
pub struct MenuRegistry {
    current: RwLock<Arc<MenuSnapshot>>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<MenuSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn resolve(&self, name: &str) -> Option<String> {
        self.snapshot().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn insert(&self, name: impl Into<String>, resource_id: impl Into<String>) {
        let (name, resource_id) = (name.into(), resource_id.into());
        self.update(|next| {
            next.insert(name, resource_id);
        });
    }

    /// Overwrites the given entries and keeps every other one.
    pub fn merge(&self, entries: &MenuSnapshot) {
        self.update(|next| {
            for (name, resource_id) in entries {
                next.insert(name.clone(), resource_id.clone());
            }
        });
    }

    /// Swaps in `entries` as the whole mapping.
    pub fn replace_all(&self, entries: MenuSnapshot) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(entries);
    }

    fn update(&self, apply: impl FnOnce(&mut MenuSnapshot)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.as_ref().clone();
        apply(&mut next);
        *guard = Arc::new(next);
    }
}
