//! Test helpers for plugin and API tests
//!
//! In-memory stand-ins for the database-backed repositories, so plugins can
//! be exercised without a Postgres connection.

pub mod mock_user_store;

pub use mock_user_store::MockUserStore;
