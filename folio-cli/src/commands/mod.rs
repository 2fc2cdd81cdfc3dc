//! CLI command implementations

mod clean;
mod info;
mod validate;

pub use clean::{clean, CleanOptions};
pub use info::info;
pub use validate::validate;
