use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkeep_core::{AppError, AppResult, NonEmptyString};

use crate::PermissionId;

/// Longest allowed ancestor chain for a role, the role itself excluded.
pub const MAX_ROLE_DEPTH: usize = 8;

/// Unique identifier for a normalized role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Input payload used to construct a validated role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInput {
    /// Stable identifier; a new one is generated when absent.
    pub id: Option<RoleId>,
    /// Display name, e.g. `Reception Admin`.
    pub name: String,
    /// Unique slug, e.g. `reception-admin`.
    pub slug: String,
    /// Display priority. Carries no resolution semantics.
    pub priority: i32,
    /// Optional parent role. Carries no inheritance semantics.
    pub parent_role_id: Option<RoleId>,
    /// Permissions granted through the normalized mapping.
    pub permissions: BTreeSet<PermissionId>,
}

/// Normalized role owning a set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    slug: String,
    priority: i32,
    parent_role_id: Option<RoleId>,
    permissions: BTreeSet<PermissionId>,
}

impl Role {
    /// Creates a validated role.
    pub fn new(input: RoleInput) -> AppResult<Self> {
        let RoleInput {
            id,
            name,
            slug,
            priority,
            parent_role_id,
            permissions,
        } = input;

        let name = NonEmptyString::new(name.trim())?;
        let slug = slug.trim().to_owned();
        validate_slug(slug.as_str())?;

        let id = id.unwrap_or_default();
        if parent_role_id == Some(id) {
            return Err(AppError::Validation(format!(
                "role '{slug}' cannot be its own parent"
            )));
        }

        Ok(Self {
            id,
            name,
            slug,
            priority,
            parent_role_id,
            permissions,
        })
    }

    /// Returns the role id.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the unique slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_str()
    }

    /// Returns the display priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the parent role id.
    #[must_use]
    pub fn parent_role_id(&self) -> Option<RoleId> {
        self.parent_role_id
    }

    /// Returns the permissions mapped to the role.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<PermissionId> {
        &self.permissions
    }

    /// Returns whether the role maps the permission.
    #[must_use]
    pub fn grants(&self, permission_id: PermissionId) -> bool {
        self.permissions.contains(&permission_id)
    }

    /// Replaces the mapped permission set.
    pub fn set_permissions(&mut self, permissions: BTreeSet<PermissionId>) {
        self.permissions = permissions;
    }
}

/// Flat parent table used to validate role hierarchy writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleHierarchy {
    parents: HashMap<RoleId, Option<RoleId>>,
}

impl RoleHierarchy {
    /// Builds the hierarchy from existing roles.
    #[must_use]
    pub fn from_roles<'a>(roles: impl IntoIterator<Item = &'a Role>) -> Self {
        Self {
            parents: roles
                .into_iter()
                .map(|role| (role.id(), role.parent_role_id()))
                .collect(),
        }
    }

    /// Checks that giving `role_id` the parent `parent_role_id` keeps the
    /// hierarchy acyclic and within [`MAX_ROLE_DEPTH`].
    ///
    /// Existing descendants of `role_id` move with it, so their depth counts
    /// against the limit as well.
    pub fn validate_parent(
        &self,
        role_id: RoleId,
        parent_role_id: Option<RoleId>,
    ) -> AppResult<()> {
        let Some(mut current) = parent_role_id else {
            return Ok(());
        };

        let subtree_height = self.subtree_height(role_id);
        let mut depth = 0_usize;
        loop {
            if current == role_id {
                return Err(AppError::Validation(format!(
                    "role '{role_id}' cannot inherit from its own descendant '{}'",
                    parent_role_id.map(|value| value.to_string()).unwrap_or_default()
                )));
            }

            depth += 1;
            if depth + subtree_height > MAX_ROLE_DEPTH {
                return Err(AppError::Validation(format!(
                    "role hierarchy for '{role_id}' exceeds maximum depth of {MAX_ROLE_DEPTH}"
                )));
            }

            match self.parents.get(&current) {
                Some(Some(next)) => current = *next,
                Some(None) => return Ok(()),
                None => {
                    return Err(AppError::NotFound(format!(
                        "parent role '{current}' does not exist"
                    )));
                }
            }
        }
    }

    /// Length of the longest chain of descendants below `role_id`.
    fn subtree_height(&self, role_id: RoleId) -> usize {
        let mut children: HashMap<RoleId, Vec<RoleId>> = HashMap::new();
        for (child, parent) in &self.parents {
            if let Some(parent) = parent {
                children.entry(*parent).or_default().push(*child);
            }
        }

        let mut height = 0_usize;
        let mut level = vec![role_id];
        let mut visited = HashSet::from([role_id]);
        loop {
            let next: Vec<RoleId> = level
                .iter()
                .filter_map(|parent| children.get(parent))
                .flatten()
                .copied()
                .filter(|child| visited.insert(*child))
                .collect();
            if next.is_empty() {
                return height;
            }

            height += 1;
            level = next;
        }
    }
}

fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.is_empty() {
        return Err(AppError::Validation(
            "role slug must not be empty".to_owned(),
        ));
    }

    let valid = slug.chars().all(|character| {
        character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-'
    });
    if !valid || slug.starts_with('-') || slug.ends_with('-') {
        return Err(AppError::Validation(format!(
            "role slug '{slug}' may only contain lowercase letters, digits and inner '-'"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use wardkeep_core::AppError;

    use super::{MAX_ROLE_DEPTH, Role, RoleHierarchy, RoleId, RoleInput};

    fn role(id: RoleId, slug: &str, parent_role_id: Option<RoleId>) -> Role {
        let built = Role::new(RoleInput {
            id: Some(id),
            name: slug.to_owned(),
            slug: slug.to_owned(),
            priority: 0,
            parent_role_id,
            permissions: BTreeSet::new(),
        });

        match built {
            Ok(value) => value,
            Err(error) => panic!("failed to build role '{slug}': {error}"),
        }
    }

    #[test]
    fn slug_validation_rejects_spaces() {
        let result = Role::new(RoleInput {
            id: None,
            name: "Reception Admin".to_owned(),
            slug: "Reception Admin".to_owned(),
            priority: 1,
            parent_role_id: None,
            permissions: BTreeSet::new(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn hierarchy_rejects_cycles() {
        let admin = RoleId::new();
        let doctor = RoleId::new();
        let roles = [role(admin, "admin", None), role(doctor, "doctor", Some(admin))];
        let hierarchy = RoleHierarchy::from_roles(&roles);

        assert!(hierarchy.validate_parent(admin, Some(doctor)).is_err());
        assert!(hierarchy.validate_parent(doctor, Some(admin)).is_ok());
    }

    #[test]
    fn hierarchy_rejects_unknown_parent() {
        let hierarchy = RoleHierarchy::default();
        assert!(
            hierarchy
                .validate_parent(RoleId::new(), Some(RoleId::new()))
                .is_err()
        );
    }

    fn chain(length: usize) -> Vec<Role> {
        let mut roles: Vec<Role> = Vec::with_capacity(length);
        for index in 0..length {
            let parent = roles.last().map(Role::id);
            roles.push(role(RoleId::new(), &format!("level-{index}"), parent));
        }
        roles
    }

    #[test]
    fn hierarchy_enforces_maximum_depth() {
        let mut roles = chain(MAX_ROLE_DEPTH);
        let Some(deepest) = roles.last().map(Role::id) else {
            panic!("chain should have a tail");
        };

        let hierarchy = RoleHierarchy::from_roles(&roles);
        assert!(hierarchy.validate_parent(RoleId::new(), Some(deepest)).is_ok());

        let extra = RoleId::new();
        roles.push(role(extra, "extra", Some(deepest)));
        let hierarchy = RoleHierarchy::from_roles(&roles);
        assert!(hierarchy.validate_parent(RoleId::new(), Some(extra)).is_err());
    }

    #[test]
    fn reparenting_counts_existing_descendants() {
        let mut roles = chain(MAX_ROLE_DEPTH);
        let Some(deepest) = roles.last().map(Role::id) else {
            panic!("chain should have a tail");
        };

        let ward_lead = RoleId::new();
        roles.push(role(ward_lead, "ward-lead", None));
        roles.push(role(RoleId::new(), "ward-nurse", Some(ward_lead)));
        let hierarchy = RoleHierarchy::from_roles(&roles);

        let result = hierarchy.validate_parent(ward_lead, Some(deepest));
        assert!(matches!(result, Err(AppError::Validation(_))));

        let Some(shallower) = roles.get(MAX_ROLE_DEPTH - 2).map(Role::id) else {
            panic!("chain should be long enough");
        };
        assert!(hierarchy.validate_parent(ward_lead, Some(shallower)).is_ok());
    }
}
