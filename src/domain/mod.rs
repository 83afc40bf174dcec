pub mod property;
pub mod role;

pub use property::Property;
pub use role::{Role, UserRecord};
