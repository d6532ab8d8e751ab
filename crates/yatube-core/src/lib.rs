//! # Yatube Core
//!
//! The domain layer of Yatube: posts, groups and their authors, listing
//! pagination and post form validation.
//! This crate contains pure business logic with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;

pub use error::DomainError;
