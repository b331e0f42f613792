//! Traversal results: discovered items and folders.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::ItemOrder;
use crate::locator::ResourceIdentifier;

/// A video found during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    pub video_id: u64,
    /// Directory names of the folders listing this video, in discovery order.
    pub folders: Vec<String>,
}

/// Insertion-ordered collection of discovered videos without duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredItems {
    items: Vec<DiscoveredItem>,
    index: HashMap<u64, usize>,
}

impl DiscoveredItems {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `video_id`; returns false if it was already present.
    pub fn insert(&mut self, video_id: u64) -> bool {
        if self.index.contains_key(&video_id) {
            return false;
        }
        self.index.insert(video_id, self.items.len());
        self.items.push(DiscoveredItem {
            video_id,
            folders: Vec::new(),
        });
        true
    }

    /// Records that `video_id` is listed in folder `dir_name`, inserting the
    /// item if needed.
    pub fn add_membership(&mut self, video_id: u64, dir_name: &str) {
        self.insert(video_id);
        if let Some(&position) = self.index.get(&video_id) {
            let folders = &mut self.items[position].folders;
            if !folders.iter().any(|f| f == dir_name) {
                folders.push(dir_name.to_string());
            }
        }
    }

    #[must_use]
    pub fn contains(&self, video_id: u64) -> bool {
        self.index.contains_key(&video_id)
    }

    #[must_use]
    pub fn get(&self, video_id: u64) -> Option<&DiscoveredItem> {
        self.index.get(&video_id).map(|&i| &self.items[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredItem> {
        self.items.iter()
    }

    /// Ids in discovery order.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.items.iter().map(|item| item.video_id).collect()
    }

    /// Items in processing order.
    #[must_use]
    pub fn ordered(&self, order: ItemOrder) -> Vec<&DiscoveredItem> {
        let mut items: Vec<&DiscoveredItem> = self.items.iter().collect();
        match order {
            ItemOrder::Discovery => {}
            ItemOrder::Reverse => items.reverse(),
            ItemOrder::NewestFirst => items.sort_by(|a, b| b.video_id.cmp(&a.video_id)),
        }
        items
    }
}

/// A folder materialized as a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Directory name derived from the title.
    pub dir_name: String,
    /// Full path of the directory.
    pub path: PathBuf,
    /// Identifier the folder was built from.
    pub source: ResourceIdentifier,
    /// Remote title as read from the page.
    pub title: String,
    /// Member video ids in discovery order, without duplicates.
    pub members: Vec<u64>,
}

impl Folder {
    /// Adds a member; returns false if it was already listed.
    pub fn add_member(&mut self, video_id: u64) -> bool {
        if self.members.contains(&video_id) {
            return false;
        }
        self.members.push(video_id);
        true
    }
}
