//! Data Transfer Objects for the API.

pub mod extract;
pub mod response;

pub use extract::*;
pub use response::*;
