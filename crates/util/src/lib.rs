//! Small helpers shared by the provider list crates.

pub mod field_checks;
pub mod path_processing;

pub use field_checks::{MAX_NAME_LENGTH, NameProblem, check_name, is_absolute_uri};
pub use path_processing::{expand_tilde, source_to_uri};
