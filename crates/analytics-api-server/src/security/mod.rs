pub mod access;

pub use access::{AccessContext, Role};
