//! Database repositories
//!
//! Repositories handle all direct database interactions.

pub mod resource_repo;
pub mod user_repo;

pub use resource_repo::ResourceRepository;
pub use user_repo::UserRepository;
