pub mod aggregate;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod filters;
pub mod handlers;
pub mod resolvers;
pub mod security;
pub mod state;
pub mod utils;

#[cfg(test)]
pub mod testutil;
