//! CLI command modules

pub mod corridor;
pub mod inspect;
