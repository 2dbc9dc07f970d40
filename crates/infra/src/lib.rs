//! Infrastructure layer: configuration, storage backends, credential service.
//!
//! Every store is expressed as an async trait with two implementations: an
//! in-memory backend for tests/dev and a Postgres backend built on `sqlx`.

pub mod config;
pub mod credentials;
pub mod deadline;
pub mod memory;
pub mod postgres;
pub mod store;

pub use config::{AppConfig, ConfigError, DbConfig};
pub use credentials::CredentialStore;
pub use deadline::with_deadline;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{ActionStore, AssociationManager, CredentialRepository, HashedCredential, RoleStore};
