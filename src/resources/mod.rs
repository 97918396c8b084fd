//! Resource declarations for every exposed entity

pub mod comments;
pub mod contest_problems;
pub mod contests;
pub mod problems;
pub mod submissions;
pub mod test_cases;
pub mod tutorials;
pub mod user_profiles;
pub mod users;

use crate::factory::{FactoryError, Registry};

/// Build and register every resource; a bad declaration stops startup
pub fn registry() -> Result<Registry, FactoryError> {
    let mut registry = Registry::new();
    registry
        .register(users::resource()?)?
        .register(user_profiles::resource()?)?
        .register(problems::resource()?)?
        .register(contests::resource()?)?
        .register(test_cases::resource()?)?
        .register(contest_problems::resource()?)?
        .register(submissions::resource()?)?
        .register(tutorials::resource()?)?
        .register(comments::resource()?)?;
    Ok(registry)
}
