/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Three fixed roles: `admin` (everything), `employee` (day-to-day stock work and
 * catalog export) and `viewer` (read-only).
 */

use super::permissions::{consts, format_permission, Actions, Resources};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;
use utoipa::ToSchema;

pub const ADMIN: &str = "admin";
pub const EMPLOYEE: &str = "employee";
pub const VIEWER: &str = "viewer";

/// Role definition with associated permissions
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

// Define standard roles and their permissions
lazy_static! {
    pub static ref ROLES: HashMap<String, Role> = {
        let mut roles = HashMap::new();

        roles.insert(
            ADMIN.to_string(),
            Role {
                name: ADMIN.to_string(),
                description: "Shop owner with full access".to_string(),
                permissions: vec![
                    format_permission(Resources::PRODUCTS, Actions::ALL),
                    format_permission(Resources::CATALOG, Actions::ALL),
                    format_permission(Resources::BACKUPS, Actions::ALL),
                    format_permission(Resources::USERS, Actions::ALL),
                ],
            },
        );

        roles.insert(
            EMPLOYEE.to_string(),
            Role {
                name: EMPLOYEE.to_string(),
                description: "Staff member maintaining stock".to_string(),
                permissions: vec![
                    consts::PRODUCTS_READ.to_string(),
                    consts::PRODUCTS_CREATE.to_string(),
                    consts::PRODUCTS_UPDATE.to_string(),
                    consts::CATALOG_EXPORT.to_string(),
                ],
            },
        );

        roles.insert(
            VIEWER.to_string(),
            Role {
                name: VIEWER.to_string(),
                description: "Read-only access to the catalog".to_string(),
                permissions: vec![consts::PRODUCTS_READ.to_string()],
            },
        );

        roles
    };
}

pub fn is_known_role(role_name: &str) -> bool {
    ROLES.contains_key(role_name)
}

/// Get all permissions for a role
pub fn role_permissions(role_name: &str) -> Vec<String> {
    match ROLES.get(role_name) {
        Some(role) => role.permissions.clone(),
        None => {
            warn!("Role not found: {}", role_name);
            vec![]
        }
    }
}

/// All roles, sorted by name
pub fn all_roles() -> Vec<Role> {
    let mut roles: Vec<Role> = ROLES.values().cloned().collect();
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    roles
}

/// Check if a granted permission covers a required one
pub fn check_permission(granted: &str, required: &str) -> bool {
    if granted == required || granted == "*" {
        return true;
    }

    match granted.strip_suffix(":*") {
        Some(resource) => required
            .split_once(':')
            .map_or(false, |(required_resource, _)| required_resource == resource),
        None => false,
    }
}
