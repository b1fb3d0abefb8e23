// Catalog
pub mod catalog;
pub mod legacy_import;
pub mod stats;

// Snapshots
pub mod backups;

// Accounts and sessions
pub mod sessions;
pub mod users;
