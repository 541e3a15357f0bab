//! The flow document: its typed model, loading and validation.

pub mod action;
pub mod definition;
pub mod loader;
pub mod operator;
pub mod validation;

pub use action::*;
pub use definition::*;
pub use loader::{from_json_str, load};
pub use operator::*;
pub use validation::validate;
