//! Access-token value types.

pub mod token;

pub use token::{access::*, secret::*};
