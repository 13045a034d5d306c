//! Storage traits for sessions and users.
//!
//! This module defines the persistence interfaces consumed by the refresh
//! coordinator and the HTTP layer:
//!
//! - Application sessions with their delegated credentials
//! - Local user records
//!
//! # Implementations
//!
//! [`MemoryAuthStorage`] is the in-memory reference backend; relational
//! backends can be provided in separate crates.

pub mod memory;
pub mod session;
pub mod user;

pub use memory::MemoryAuthStorage;
pub use session::SessionStorage;
pub use user::UserStorage;
