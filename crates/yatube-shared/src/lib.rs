//! # Yatube Shared
//!
//! Wire types exchanged between the server and its clients.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
