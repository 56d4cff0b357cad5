// GitHub GraphQL module.
// Operation descriptors, wire types, and the HTTP transport.

pub mod client;
pub mod operations;
pub mod types;

pub use client::{GitHubClient, Transport};
pub use types::*;
