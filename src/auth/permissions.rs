/*!
 * # Permissions Module
 *
 * Permission strings are `<resource>:<action>`. A trailing `*` action grants every
 * action on the resource.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const EXPORT: &'static str = "export";
    pub const IMPORT: &'static str = "import";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const PRODUCTS: &'static str = "products";
    pub const CATALOG: &'static str = "catalog";
    pub const BACKUPS: &'static str = "backups";
    pub const USERS: &'static str = "users";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Products
    pub const PRODUCTS_READ: &str = "products:read";
    pub const PRODUCTS_CREATE: &str = "products:create";
    pub const PRODUCTS_UPDATE: &str = "products:update";
    pub const PRODUCTS_DELETE: &str = "products:delete";

    // Whole-catalog transfer
    pub const CATALOG_EXPORT: &str = "catalog:export";
    pub const CATALOG_IMPORT: &str = "catalog:import";

    // Snapshots
    pub const BACKUPS_MANAGE: &str = "backups:manage";

    // Accounts and sessions
    pub const USERS_MANAGE: &str = "users:manage";
}

/// Format a permission string
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}
