pub mod dashboard;
pub mod pages;
pub mod property;
pub mod recaptcha;

pub use dashboard::dashboard;
pub use pages::{property_page, search_results};
pub use property::{get_property, save_property};
pub use recaptcha::verify_recaptcha;
