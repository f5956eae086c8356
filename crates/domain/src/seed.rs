//! Default hospital permission catalog.

use std::collections::{BTreeSet, HashMap};

use wardkeep_core::{AppError, AppResult};

use crate::{
    PermissionCatalog, PermissionDefinition, PermissionDefinitionInput, PermissionId, RiskLevel,
};

/// Permission required for permission administration endpoints.
pub const MANAGE_PERMISSIONS: &str = "manage-permissions";

/// Permission required to approve or reject change requests.
pub const APPROVE_PERMISSION_REQUESTS: &str = "approve-permission-requests";

struct SeedEntry {
    name: &'static str,
    description: &'static str,
    resource: &'static str,
    action: &'static str,
    category: &'static str,
    module: &'static str,
    risk_level: RiskLevel,
    requires_approval: bool,
    is_critical: bool,
    dependencies: &'static [&'static str],
}

#[allow(clippy::too_many_arguments)]
const fn entry(
    name: &'static str,
    description: &'static str,
    resource: &'static str,
    action: &'static str,
    category: &'static str,
    module: &'static str,
    risk_level: RiskLevel,
    dependencies: &'static [&'static str],
) -> SeedEntry {
    SeedEntry {
        name,
        description,
        resource,
        action,
        category,
        module,
        risk_level,
        requires_approval: matches!(risk_level, RiskLevel::High),
        is_critical: false,
        dependencies,
    }
}

const fn critical(mut seed: SeedEntry) -> SeedEntry {
    seed.is_critical = true;
    seed
}

// Dependencies must be declared before the entries that reference them.
#[rustfmt::skip]
const ENTRIES: &[SeedEntry] = &[
    critical(entry("view-users", "View staff accounts", "users", "view", "Users", "administration", RiskLevel::Low, &[])),
    entry("create-users", "Create staff accounts", "users", "create", "Users", "administration", RiskLevel::Medium, &["view-users"]),
    entry("edit-users", "Edit staff accounts", "users", "edit", "Users", "administration", RiskLevel::Medium, &["view-users"]),
    entry("delete-users", "Delete staff accounts", "users", "delete", "Users", "administration", RiskLevel::High, &["edit-users"]),
    entry("view-roles", "View roles and their permissions", "roles", "view", "Roles", "administration", RiskLevel::Low, &[]),
    entry("manage-roles", "Create roles and change role permissions", "roles", "manage", "Roles", "administration", RiskLevel::High, &["view-roles"]),
    entry(MANAGE_PERMISSIONS, "Grant temporary permissions and user overrides", "permissions", "manage", "Permissions", "administration", RiskLevel::High, &["view-roles", "view-users"]),
    entry(APPROVE_PERMISSION_REQUESTS, "Approve or reject permission change requests", "permission-requests", "approve", "Permissions", "administration", RiskLevel::High, &[MANAGE_PERMISSIONS]),
    critical(entry("view-appointments", "View appointment schedules", "appointments", "view", "Appointments", "appointments", RiskLevel::Low, &[])),
    entry("create-appointments", "Book appointments", "appointments", "create", "Appointments", "appointments", RiskLevel::Low, &["view-appointments"]),
    entry("edit-appointments", "Reschedule or cancel appointments", "appointments", "edit", "Appointments", "appointments", RiskLevel::Medium, &["view-appointments"]),
    entry("view-billing", "View invoices and payments", "billing", "view", "Billing", "billing", RiskLevel::Low, &[]),
    entry("create-billing", "Issue invoices", "billing", "create", "Billing", "billing", RiskLevel::Medium, &["view-billing"]),
    entry("edit-billing", "Adjust invoices and record refunds", "billing", "edit", "Billing", "billing", RiskLevel::High, &["view-billing"]),
    critical(entry("view-pharmacy", "View pharmacy stock and prescriptions", "pharmacy", "view", "Pharmacy", "pharmacy", RiskLevel::Low, &[])),
    entry("dispense-medication", "Dispense prescribed medication", "pharmacy", "dispense", "Pharmacy", "pharmacy", RiskLevel::High, &["view-pharmacy"]),
    entry("manage-pharmacy-stock", "Adjust pharmacy inventory", "pharmacy", "manage", "Pharmacy", "pharmacy", RiskLevel::Medium, &["view-pharmacy"]),
    critical(entry("view-lab", "View laboratory orders and results", "lab", "view", "Laboratory", "lab", RiskLevel::Low, &[])),
    entry("create-lab-orders", "Order laboratory tests", "lab", "create", "Laboratory", "lab", RiskLevel::Medium, &["view-lab"]),
    entry("edit-lab-results", "Enter or correct laboratory results", "lab", "edit", "Laboratory", "lab", RiskLevel::High, &["view-lab"]),
    entry("view-reports", "View operational reports", "reports", "view", "Reports", "reports", RiskLevel::Low, &[]),
    entry("view-audit-logs", "View the security audit trail", "audit-logs", "view", "Audit", "administration", RiskLevel::Medium, &[]),
];

/// Builds the default hospital catalog with fresh permission ids.
pub fn default_hospital_catalog() -> AppResult<PermissionCatalog> {
    let mut ids: HashMap<&'static str, PermissionId> = HashMap::new();
    let mut definitions = Vec::with_capacity(ENTRIES.len());

    for seed in ENTRIES {
        let dependencies = seed
            .dependencies
            .iter()
            .map(|name| {
                ids.get(name).copied().ok_or_else(|| {
                    AppError::Internal(format!(
                        "seed permission '{}' references '{name}' before it is declared",
                        seed.name
                    ))
                })
            })
            .collect::<AppResult<BTreeSet<_>>>()?;

        let definition = PermissionDefinition::new(PermissionDefinitionInput {
            id: None,
            name: seed.name.to_owned(),
            description: seed.description.to_owned(),
            resource: seed.resource.to_owned(),
            action: seed.action.to_owned(),
            category: seed.category.to_owned(),
            module: seed.module.to_owned(),
            risk_level: seed.risk_level,
            requires_approval: seed.requires_approval,
            dependencies,
            is_critical: seed.is_critical,
        })?;

        ids.insert(seed.name, definition.id());
        definitions.push(definition);
    }

    PermissionCatalog::new(definitions)
}

#[cfg(test)]
mod tests {
    use crate::validate_dependencies;

    use super::{APPROVE_PERMISSION_REQUESTS, MANAGE_PERMISSIONS, default_hospital_catalog};

    #[test]
    fn default_catalog_is_valid() {
        let catalog = default_hospital_catalog();
        let Ok(catalog) = catalog else {
            panic!("default catalog must be valid");
        };

        assert!(catalog.find_by_name(MANAGE_PERMISSIONS).is_some());
        assert!(catalog.find_by_name("view-billing").is_some());
    }

    #[test]
    fn approving_requests_requires_managing_permissions() {
        let Ok(catalog) = default_hospital_catalog() else {
            panic!("default catalog must be valid");
        };
        let Some(approve) = catalog.find_by_name(APPROVE_PERMISSION_REQUESTS) else {
            panic!("approve permission must exist");
        };

        let messages: Vec<String> = validate_dependencies(&catalog, &[approve.id()], &[])
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            vec![format!("{APPROVE_PERMISSION_REQUESTS} requires {MANAGE_PERMISSIONS}")]
        );
    }
}
