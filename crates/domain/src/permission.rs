use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkeep_core::{AppError, AppResult, NonEmptyString};

/// Unique identifier for a catalog permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Risk classification attached to a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Read-only or low impact access.
    Low,
    /// Mutating access to operational data.
    Medium,
    /// Access to security administration or patient-critical operations.
    High,
}

impl RiskLevel {
    /// Returns a stable storage value for this risk level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(AppError::Validation(format!(
                "unknown risk level value '{value}'"
            ))),
        }
    }
}

/// Input payload used to construct a validated permission definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDefinitionInput {
    /// Stable identifier; a new one is generated when absent.
    pub id: Option<PermissionId>,
    /// Unique permission name, e.g. `edit-users`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Resource the permission governs, e.g. `users`.
    pub resource: String,
    /// Action on the resource, e.g. `edit`.
    pub action: String,
    /// Display category.
    pub category: String,
    /// Application module owning the permission.
    pub module: String,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Whether granting the permission is expected to pass approval.
    pub requires_approval: bool,
    /// Permissions that must be held before this one may be added.
    pub dependencies: BTreeSet<PermissionId>,
    /// Marks permissions whose loss would block critical hospital flows.
    pub is_critical: bool,
}

/// Immutable catalog entry for one named permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    id: PermissionId,
    name: NonEmptyString,
    description: String,
    resource: String,
    action: String,
    category: String,
    module: String,
    risk_level: RiskLevel,
    requires_approval: bool,
    dependencies: BTreeSet<PermissionId>,
    is_critical: bool,
}

impl PermissionDefinition {
    /// Creates a validated permission definition.
    pub fn new(input: PermissionDefinitionInput) -> AppResult<Self> {
        let PermissionDefinitionInput {
            id,
            name,
            description,
            resource,
            action,
            category,
            module,
            risk_level,
            requires_approval,
            dependencies,
            is_critical,
        } = input;

        let name = NonEmptyString::new(name.trim())?;
        validate_permission_name(name.as_str())?;

        let id = id.unwrap_or_default();
        if dependencies.contains(&id) {
            return Err(AppError::Validation(format!(
                "permission '{}' cannot depend on itself",
                name.as_str()
            )));
        }

        Ok(Self {
            id,
            name,
            description,
            resource,
            action,
            category,
            module,
            risk_level,
            requires_approval,
            dependencies,
            is_critical,
        })
    }

    /// Returns the permission id.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the unique permission name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the governed resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the action on the resource.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the display category.
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Returns the owning module.
    #[must_use]
    pub fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Returns the risk classification.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns whether grants of this permission go through approval.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    /// Returns the direct dependency ids.
    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<PermissionId> {
        &self.dependencies
    }

    /// Returns whether the permission is critical.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.is_critical
    }

    /// Adds a direct dependency edge.
    pub fn add_dependency(&mut self, dependency: PermissionId) -> AppResult<()> {
        if dependency == self.id {
            return Err(AppError::Validation(format!(
                "permission '{}' cannot depend on itself",
                self.name()
            )));
        }

        self.dependencies.insert(dependency);
        Ok(())
    }
}

fn validate_permission_name(name: &str) -> AppResult<()> {
    let valid = name.chars().all(|character| {
        character.is_ascii_lowercase()
            || character.is_ascii_digit()
            || matches!(character, '-' | '_' | '.')
    });

    if !valid {
        return Err(AppError::Validation(format!(
            "permission name '{name}' may only contain lowercase letters, digits, '-', '_' or '.'"
        )));
    }

    Ok(())
}
