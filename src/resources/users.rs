//! Accounts: open registration, self-service changes

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    db::repositories::ResourceRepository,
    error::{AppResult, FieldErrors},
    factory::{
        CreateInstance, FactoryError, RequestContext, Resource, ResourceConfig, ResourceHooks,
        Schema, SqlValue, UpdateInstance, WriteSet,
    },
    models::USER,
    permissions::PermissionSpec,
    services::AuthService,
    utils::validate_username,
};

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("user", &USER)
        .field_names(&["username", "first_name", "last_name", "email", "password"])
        .write_only(&["password"])
        .permissions(vec![PermissionSpec::IsOwnerOrReadOnly(&["id"])])
        .hooks(AccountHooks)
        .create_instance(AccountWriter)
        .update_instance(AccountWriter)
        .build()
}

struct AccountHooks;

impl ResourceHooks for AccountHooks {
    fn validate(&self, _ctx: &RequestContext, data: &mut WriteSet) -> Result<(), FieldErrors> {
        if let Some(username) = data.text("username") {
            validate_username(username).map_err(|message| FieldErrors::single("username", message))?;
        }
        if let Some(email) = data.text("email").map(normalize_email) {
            data.set("email", SqlValue::Text(Some(email)));
        }
        Ok(())
    }
}

/// Stores the password as an Argon2 hash
struct AccountWriter;

#[async_trait]
impl CreateInstance for AccountWriter {
    async fn create(&self, pool: &PgPool, schema: &'static Schema, mut data: WriteSet) -> AppResult<i64> {
        hash_password(&mut data)?;
        ResourceRepository::insert(pool, schema, &data).await
    }
}

#[async_trait]
impl UpdateInstance for AccountWriter {
    async fn update(
        &self,
        pool: &PgPool,
        schema: &'static Schema,
        id: i64,
        mut data: WriteSet,
    ) -> AppResult<()> {
        hash_password(&mut data)?;
        ResourceRepository::update(pool, schema, id, &data).await
    }
}

fn hash_password(data: &mut WriteSet) -> AppResult<()> {
    if let Some(raw) = data.text("password").map(str::to_owned) {
        let hash = AuthService::hash_password(&raw)?;
        data.set("password", SqlValue::Text(Some(hash)));
    }
    Ok(())
}

/// Lowercase the domain part
fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::factory::{Action, WriteMode};

    #[test]
    fn test_password_is_write_only() {
        let users = resource().unwrap();
        let password = users.serializer().field("password").unwrap();
        assert!(password.write_only);
        assert!(!password.is_readable());
        assert!(users.serializer().field("id").is_none());
    }

    #[test]
    fn test_password_hashed_before_insert() {
        let mut data = WriteSet::new();
        data.set("password", SqlValue::Text(Some("hunter22".to_string())));
        hash_password(&mut data).unwrap();

        let stored = data.text("password").unwrap();
        assert_ne!(stored, "hunter22");
        assert!(AuthService::verify_password("hunter22", stored).unwrap());
    }

    #[test]
    fn test_username_rules() {
        let users = resource().unwrap();
        let ctx = RequestContext::new(Action::Create, None);
        let mut data = users
            .serializer()
            .validate(
                &json!({"username": "bad name!", "password": "x", "email": "A@Example.COM"}),
                WriteMode::Create,
                None,
            )
            .unwrap();
        let errors = users.hooks().validate(&ctx, &mut data).unwrap_err();
        assert!(errors.contains("username"));

        let mut data = users
            .serializer()
            .validate(
                &json!({"username": "alice", "password": "x", "email": "A@Example.COM"}),
                WriteMode::Create,
                None,
            )
            .unwrap();
        users.hooks().validate(&ctx, &mut data).unwrap();
        assert_eq!(data.text("email"), Some("A@example.com"));
    }
}
