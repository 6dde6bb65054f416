//! The persisted application record.

use std::collections::HashSet;

use ext_content::ContentDescriptor;
use ext_model::{ExtensionId, ExtensionKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// One installed extension and the extensions installed beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    pub id: ExtensionId,
    pub kind: ExtensionKind,
    #[serde(default)]
    pub content: ContentDescriptor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionEntry>,
}

impl ExtensionEntry {
    pub fn new(id: ExtensionId, kind: ExtensionKind, content: ContentDescriptor) -> Self {
        Self {
            id,
            kind,
            content,
            extensions: Vec::new(),
        }
    }

    /// Add a nested entry, builder style.
    pub fn with_child(mut self, child: ExtensionEntry) -> Self {
        self.extensions.push(child);
        self
    }
}

/// Installed extensions for one application.
///
/// Entries form an ordered set: insertion order is kept and an id appears at
/// most once anywhere in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    #[serde(default)]
    pub extensions: Vec<ExtensionEntry>,
}

impl Application {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            extensions: Vec::new(),
        }
    }

    /// Number of entries in the whole tree.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn contains(&self, id: ExtensionId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: ExtensionId) -> Option<&ExtensionEntry> {
        self.entries()
            .into_iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(_, entry)| entry)
    }

    pub fn find_mut(&mut self, id: ExtensionId) -> Option<&mut ExtensionEntry> {
        find_in_mut(&mut self.extensions, id)
    }

    /// Every entry in pre-order, paired with its parent's id (`None` for
    /// top-level entries).
    pub fn entries(&self) -> Vec<(Option<ExtensionId>, &ExtensionEntry)> {
        let mut result = Vec::new();
        let mut stack: Vec<(Option<ExtensionId>, &ExtensionEntry)> =
            self.extensions.iter().rev().map(|e| (None, e)).collect();
        while let Some((parent, entry)) = stack.pop() {
            result.push((parent, entry));
            stack.extend(entry.extensions.iter().rev().map(|c| (Some(entry.id), c)));
        }
        result
    }

    /// Ids of every installed extension, in pre-order.
    pub fn installed_ids(&self) -> Vec<ExtensionId> {
        self.entries().into_iter().map(|(_, entry)| entry.id).collect()
    }

    /// Install `entry` (with any nested entries) under `parent`, or at top
    /// level when `parent` is `None`.
    pub fn add_extension(
        &mut self,
        parent: Option<ExtensionId>,
        entry: ExtensionEntry,
    ) -> Result<()> {
        let mut seen: HashSet<ExtensionId> = self.installed_ids().into_iter().collect();
        let mut incoming = Vec::new();
        collect_ids(&entry, &mut incoming);
        if let Some(duplicate) = incoming.into_iter().find(|id| !seen.insert(*id)) {
            return Err(Error::DuplicateExtension(duplicate));
        }

        match parent {
            None => self.extensions.push(entry),
            Some(parent_id) => self
                .find_mut(parent_id)
                .ok_or(Error::UnknownExtension(parent_id))?
                .extensions
                .push(entry),
        }
        Ok(())
    }

    /// Uninstall `id` together with everything installed beneath it.
    pub fn remove_extension(&mut self, id: ExtensionId) -> Option<ExtensionEntry> {
        remove_in(&mut self.extensions, id)
    }

    /// Fails with the first id that appears more than once.
    pub fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (_, entry) in self.entries() {
            if !seen.insert(entry.id) {
                return Err(Error::DuplicateExtension(entry.id));
            }
        }
        Ok(())
    }
}

fn collect_ids(entry: &ExtensionEntry, ids: &mut Vec<ExtensionId>) {
    ids.push(entry.id);
    for child in &entry.extensions {
        collect_ids(child, ids);
    }
}

fn find_in_mut(entries: &mut [ExtensionEntry], id: ExtensionId) -> Option<&mut ExtensionEntry> {
    for entry in entries {
        if entry.id == id {
            return Some(entry);
        }
        if let Some(found) = find_in_mut(&mut entry.extensions, id) {
            return Some(found);
        }
    }
    None
}

fn remove_in(entries: &mut Vec<ExtensionEntry>, id: ExtensionId) -> Option<ExtensionEntry> {
    if let Some(position) = entries.iter().position(|e| e.id == id) {
        return Some(entries.remove(position));
    }
    entries
        .iter_mut()
        .find_map(|entry| remove_in(&mut entry.extensions, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(n: u128) -> ExtensionId {
        ExtensionId::from_u128(n)
    }

    fn sample() -> Application {
        let mut app = Application::new(Uuid::from_u128(100));
        app.add_extension(
            None,
            ExtensionEntry::new(ExtensionId::ROOT, ExtensionKind::Root, ContentDescriptor::Builtin),
        )
        .unwrap();
        app.add_extension(
            Some(ExtensionId::ROOT),
            ExtensionEntry::new(id(1), ExtensionKind::Open, ContentDescriptor::folder("/ext/1")),
        )
        .unwrap();
        app.add_extension(
            Some(id(1)),
            ExtensionEntry::new(id(2), ExtensionKind::Sealed, ContentDescriptor::folder("/ext/2")),
        )
        .unwrap();
        app
    }

    #[test]
    fn test_entries_are_pre_order_with_parents() {
        let app = sample();
        let pairs: Vec<(Option<ExtensionId>, ExtensionId)> =
            app.entries().into_iter().map(|(p, e)| (p, e.id)).collect();
        assert_eq!(
            pairs,
            vec![
                (None, ExtensionId::ROOT),
                (Some(ExtensionId::ROOT), id(1)),
                (Some(id(1)), id(2)),
            ]
        );
        assert_eq!(app.len(), 3);
    }

    #[test]
    fn test_duplicate_is_rejected_anywhere_in_tree() {
        let mut app = sample();
        let err = app
            .add_extension(
                None,
                ExtensionEntry::new(id(2), ExtensionKind::Sealed, ContentDescriptor::Builtin),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateExtension(dup) if dup == id(2)));
        assert_eq!(app, sample());
    }

    #[test]
    fn test_duplicate_inside_incoming_subtree_is_rejected() {
        let mut app = sample();
        let nested = ExtensionEntry::new(id(5), ExtensionKind::Open, ContentDescriptor::Builtin)
            .with_child(ExtensionEntry::new(
                id(5),
                ExtensionKind::Sealed,
                ContentDescriptor::Builtin,
            ));
        let err = app.add_extension(Some(id(1)), nested).unwrap_err();
        assert!(matches!(err, Error::DuplicateExtension(_)));
    }

    #[test]
    fn test_add_under_unknown_parent() {
        let mut app = sample();
        let err = app
            .add_extension(
                Some(id(42)),
                ExtensionEntry::new(id(3), ExtensionKind::Sealed, ContentDescriptor::Builtin),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownExtension(missing) if missing == id(42)));
    }

    #[test]
    fn test_remove_takes_subtree() {
        let mut app = sample();
        let removed = app.remove_extension(id(1)).unwrap();
        assert_eq!(removed.extensions.len(), 1);
        assert_eq!(app.installed_ids(), vec![ExtensionId::ROOT]);
        assert!(app.remove_extension(id(2)).is_none());
    }

    #[test]
    fn test_find_mut_updates_content() {
        let mut app = sample();
        app.find_mut(id(2))
            .unwrap()
            .content
            .relocate("/moved/2");
        assert_eq!(
            app.find(id(2)).unwrap().content,
            ContentDescriptor::folder("/moved/2")
        );
    }
}
