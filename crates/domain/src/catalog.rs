use std::collections::{BTreeMap, BTreeSet, HashMap};

use wardkeep_core::{AppError, AppResult};

use crate::{PermissionDefinition, PermissionId};

/// Validated set of catalog permissions indexed by id and name.
///
/// Construction guarantees unique names, dependency edges that point at
/// known permissions, and an acyclic dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    by_id: BTreeMap<PermissionId, PermissionDefinition>,
    by_name: HashMap<String, PermissionId>,
}

impl PermissionCatalog {
    /// Creates a validated catalog from permission definitions.
    pub fn new(definitions: Vec<PermissionDefinition>) -> AppResult<Self> {
        let mut by_id = BTreeMap::new();
        let mut by_name = HashMap::new();

        for definition in definitions {
            if by_name
                .insert(definition.name().to_owned(), definition.id())
                .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "permission '{}' is defined more than once",
                    definition.name()
                )));
            }

            if by_id.insert(definition.id(), definition.clone()).is_some() {
                return Err(AppError::Conflict(format!(
                    "permission id '{}' is used more than once",
                    definition.id()
                )));
            }
        }

        let catalog = Self { by_id, by_name };
        catalog.validate_dependency_edges()?;
        Ok(catalog)
    }

    /// Returns the definition for an id.
    #[must_use]
    pub fn get(&self, id: PermissionId) -> Option<&PermissionDefinition> {
        self.by_id.get(&id)
    }

    /// Returns the definition for a permission name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&PermissionDefinition> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Returns the display name for an id, falling back to the raw id.
    #[must_use]
    pub fn display_name(&self, id: PermissionId) -> String {
        self.get(id)
            .map(|definition| definition.name().to_owned())
            .unwrap_or_else(|| id.to_string())
    }

    /// Returns the number of catalog entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterates catalog entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionDefinition> {
        self.by_id.values()
    }

    /// Returns the direct dependencies of a permission.
    #[must_use]
    pub fn dependencies_of(&self, id: PermissionId) -> BTreeSet<PermissionId> {
        self.get(id)
            .map(|definition| definition.dependencies().clone())
            .unwrap_or_default()
    }

    /// Maps ids to names, skipping unknown ids.
    #[must_use]
    pub fn names_for<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a PermissionId>,
    ) -> BTreeSet<String> {
        ids.into_iter()
            .filter_map(|id| self.get(*id))
            .map(|definition| definition.name().to_owned())
            .collect()
    }

    /// Maps names to ids, skipping unknown names.
    #[must_use]
    pub fn ids_for<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<PermissionId> {
        names
            .into_iter()
            .filter_map(|name| self.by_name.get(name).copied())
            .collect()
    }

    fn validate_dependency_edges(&self) -> AppResult<()> {
        for definition in self.by_id.values() {
            if let Some(missing) = definition
                .dependencies()
                .iter()
                .find(|dependency| !self.by_id.contains_key(dependency))
            {
                return Err(AppError::Validation(format!(
                    "permission '{}' depends on unknown permission id '{missing}'",
                    definition.name()
                )));
            }
        }

        let mut finished = BTreeSet::new();
        for id in self.by_id.keys() {
            let mut on_path = Vec::new();
            self.visit_for_cycle(*id, &mut on_path, &mut finished)?;
        }

        Ok(())
    }

    fn visit_for_cycle(
        &self,
        id: PermissionId,
        on_path: &mut Vec<PermissionId>,
        finished: &mut BTreeSet<PermissionId>,
    ) -> AppResult<()> {
        if finished.contains(&id) {
            return Ok(());
        }

        if on_path.contains(&id) {
            let cycle = on_path
                .iter()
                .skip_while(|step| **step != id)
                .map(|step| self.display_name(*step))
                .chain(std::iter::once(self.display_name(id)))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(AppError::Validation(format!(
                "permission dependency cycle detected: {cycle}"
            )));
        }

        on_path.push(id);
        for dependency in self.dependencies_of(id) {
            self.visit_for_cycle(dependency, on_path, finished)?;
        }
        on_path.pop();
        finished.insert(id);

        Ok(())
    }
}
