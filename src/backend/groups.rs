//! The comps hierarchy: categories owning groups owning package lists.
//!
//! The index is built on first access and kept for the life of the backend.
//! Group package lists are fetched from the engine only when first read.

use super::DnfBackend;
use crate::error::{DnfDbusError, Result};
use crate::repomd::model::{CompsData, GroupPackage};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// `(id, name, ui_name, ui_description)`
pub type GroupDump = (String, String, String, String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub ui_name: String,
    pub ui_description: String,
    /// Indexed groups of this category, in comps order
    pub group_ids: Vec<String>,
}

impl Category {
    pub fn dump(&self) -> GroupDump {
        (
            self.id.clone(),
            self.name.clone(),
            self.ui_name.clone(),
            self.ui_description.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub ui_name: String,
    pub ui_description: String,
    pub category_id: String,
    packages: Option<Vec<GroupPackage>>,
}

impl Group {
    pub fn dump(&self) -> GroupDump {
        (
            self.id.clone(),
            self.name.clone(),
            self.ui_name.clone(),
            self.ui_description.clone(),
        )
    }

    /// Package list, if it has been resolved
    pub fn packages(&self) -> Option<&[GroupPackage]> {
        self.packages.as_deref()
    }
}

#[derive(Debug, Default)]
pub(crate) struct CompsTree {
    categories: Vec<Category>,
    groups: Vec<Group>,
    group_pos: HashMap<String, usize>,
}

impl CompsTree {
    /// Walk every category and index its groups. A group listed by several
    /// categories keeps its first position but belongs to the last one.
    fn build(data: CompsData) -> Self {
        let mut tree = CompsTree::default();
        let groups: HashMap<&str, _> = data.groups.iter().map(|g| (g.id.as_str(), g)).collect();

        for category in &data.categories {
            let mut group_ids = Vec::with_capacity(category.group_ids.len());
            for group_id in &category.group_ids {
                let Some(group) = groups.get(group_id.as_str()) else {
                    debug!(category = %category.id, group = %group_id, "category lists unknown group");
                    continue;
                };
                group_ids.push(group_id.clone());
                if let Some(&pos) = tree.group_pos.get(group_id) {
                    tree.groups[pos].category_id = category.id.clone();
                    continue;
                }
                tree.group_pos.insert(group_id.clone(), tree.groups.len());
                tree.groups.push(Group {
                    id: group.id.clone(),
                    name: group.name.clone(),
                    ui_name: group.ui_name.clone(),
                    ui_description: group.ui_description.clone(),
                    category_id: category.id.clone(),
                    packages: None,
                });
            }
            tree.categories.push(Category {
                id: category.id.clone(),
                name: category.name.clone(),
                ui_name: category.ui_name.clone(),
                ui_description: category.ui_description.clone(),
                group_ids,
            });
        }
        tree
    }
}

#[derive(Debug)]
pub(crate) enum CompsIndex {
    Unbuilt,
    Built(CompsTree),
}

/// Comps view of a [`DnfBackend`]
pub struct Groups<'a> {
    backend: &'a mut DnfBackend,
}

impl<'a> Groups<'a> {
    pub(super) fn new(backend: &'a mut DnfBackend) -> Self {
        Self { backend }
    }

    /// Build the index from the engine's comps, replacing any earlier one
    #[instrument(skip(self))]
    pub fn load(&mut self) -> Result<()> {
        self.backend.ensure_comps_read()?;
        let tree = CompsTree::build(self.backend.engine.comps()?);
        info!(
            categories = tree.categories.len(),
            groups = tree.groups.len(),
            "indexed comps"
        );
        self.backend.comps = CompsIndex::Built(tree);
        Ok(())
    }

    fn tree(&mut self) -> Result<&mut CompsTree> {
        if matches!(self.backend.comps, CompsIndex::Unbuilt) {
            self.load()?;
        }
        match &mut self.backend.comps {
            CompsIndex::Built(tree) => Ok(tree),
            CompsIndex::Unbuilt => Err(DnfDbusError::EngineUnavailable(
                "comps index is not built".to_string(),
            )),
        }
    }

    pub fn categories(&mut self) -> Result<&[Category]> {
        Ok(&self.tree()?.categories)
    }

    pub fn groups(&mut self) -> Result<&[Group]> {
        Ok(&self.tree()?.groups)
    }

    pub fn group(&mut self, group_id: &str) -> Result<Option<&Group>> {
        let tree: &CompsTree = self.tree()?;
        Ok(tree.group_pos.get(group_id).map(|&pos| &tree.groups[pos]))
    }

    /// Groups of one category; empty for an unknown category
    pub fn groups_by_category(&mut self, category_id: &str) -> Result<Vec<&Group>> {
        let tree: &CompsTree = self.tree()?;
        let Some(category) = tree.categories.iter().find(|c| c.id == category_id) else {
            return Ok(Vec::new());
        };
        Ok(category
            .group_ids
            .iter()
            .filter_map(|id| tree.group_pos.get(id).map(|&pos| &tree.groups[pos]))
            .collect())
    }

    /// Packages of one group, resolved on first read; empty for an unknown group
    #[instrument(skip(self))]
    pub fn group_packages(&mut self, group_id: &str) -> Result<Vec<GroupPackage>> {
        let tree = self.tree()?;
        let Some(&pos) = tree.group_pos.get(group_id) else {
            return Ok(Vec::new());
        };
        if let Some(packages) = &tree.groups[pos].packages {
            return Ok(packages.clone());
        }

        self.backend.ensure_comps_read()?;
        let packages = self.backend.engine.group_packages(group_id)?;
        debug!(group = %group_id, count = packages.len(), "resolved group packages");
        self.tree()?.groups[pos].packages = Some(packages.clone());
        Ok(packages)
    }
}
