use std::collections::{BTreeSet, VecDeque};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{PermissionCatalog, PermissionId};

/// One unmet "permission requires permission" edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyViolation {
    /// Permission whose direct dependency is missing.
    pub permission: String,
    /// The missing dependency.
    pub dependency: String,
}

impl Display for DependencyViolation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} requires {}", self.permission, self.dependency)
    }
}

/// Checks that adding `to_add` to a user holding `existing` leaves no
/// dependency unmet.
///
/// A dependency is satisfied when it is already held or is part of the
/// same batch. The walk follows satisfied dependencies transitively, so a
/// chain `a -> b -> c` is rejected when `c` is missing even if `b` is
/// present; the violation names the edge closest to the missing
/// permission (`b requires c`). Unknown ids carry no dependencies.
#[must_use]
pub fn validate_dependencies(
    catalog: &PermissionCatalog,
    to_add: &[PermissionId],
    existing: &[PermissionId],
) -> Vec<DependencyViolation> {
    let satisfied: BTreeSet<PermissionId> = to_add.iter().chain(existing).copied().collect();
    let mut violations: Vec<DependencyViolation> = Vec::new();
    let mut visited = BTreeSet::new();

    for root in to_add {
        let mut queue = VecDeque::from([*root]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }

            for dependency in catalog.dependencies_of(current) {
                if satisfied.contains(&dependency) {
                    queue.push_back(dependency);
                    continue;
                }

                let violation = DependencyViolation {
                    permission: catalog.display_name(current),
                    dependency: catalog.display_name(dependency),
                };
                if !violations.contains(&violation) {
                    violations.push(violation);
                }
            }
        }
    }

    violations
}
