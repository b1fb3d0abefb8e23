pub mod backup;
pub mod product;
pub mod session;
pub mod user;

pub use backup::{BackupKind, Entity as Backup};
pub use product::{Entity as Product, StockStatus};
pub use session::Entity as Session;
pub use user::Entity as User;
