#[cfg(feature = "cli")]
pub mod commands;
pub mod push_function;
