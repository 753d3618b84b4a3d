pub mod audit_log;
pub mod category;
pub mod product;
pub mod user;

pub use audit_log::{AuditLog, Auditable};
pub use category::Category;
pub use product::Product;
pub use user::User;
