//! User model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::{
    constants::{MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_USERNAME_LENGTH},
    factory::schema::{Column, Schema},
};

/// Account table
pub static USER: Schema = Schema {
    name: "user",
    table: "users",
    columns: &[
        Column::id(),
        Column::varchar("username", MAX_USERNAME_LENGTH as usize).unique(),
        Column::varchar("first_name", MAX_NAME_LENGTH).blank(),
        Column::varchar("last_name", MAX_NAME_LENGTH).blank(),
        Column::email("email", MAX_EMAIL_LENGTH).blank(),
        Column::varchar("password", 128).secret(),
        Column::boolean("is_active").with_default(),
        Column::datetime("date_joined").auto(),
        Column::datetime("last_login").nullable().auto(),
    ],
    relations: &[],
    ordering: &["id"],
};

/// User database model
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_password_is_secret() {
        assert!(USER.column("password").unwrap().secret);
        let value = serde_json::to_value(user()).unwrap();
        assert!(value.get("password").is_none());
    }
}
