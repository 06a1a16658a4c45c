//! SQLite implementation of the database traits.
//!
//! This module provides a SQLx-backed implementation of the repository
//! traits defined in the parent module.

mod api_key;
mod connection;
mod dependency;
mod helpers;
mod hoster;
mod server;
mod service;
mod service_image;
mod user;

#[cfg(test)]
mod dependency_test;

pub use api_key::SqliteApiKeyRepository;
pub use connection::SqliteDatabase;
pub use dependency::SqliteDependencyRepository;
pub use hoster::SqliteHosterRepository;
pub use server::SqliteServerRepository;
pub use service::SqliteServiceRepository;
pub use service_image::SqliteServiceImageRepository;
pub use user::SqliteUserRepository;
