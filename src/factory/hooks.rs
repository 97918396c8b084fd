//! Extension points of a resource

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    db::repositories::ResourceRepository,
    error::{AppResult, FieldErrors},
    factory::{
        context::RequestContext,
        query::Filter,
        schema::Schema,
        serializer::WriteSet,
    },
};

/// Per-resource validation and queryset scoping
pub trait ResourceHooks: Send + Sync {
    /// Runs after field coercion, before references are checked
    fn validate(&self, _ctx: &RequestContext, _data: &mut WriteSet) -> Result<(), FieldErrors> {
        Ok(())
    }

    /// Narrows every lookup and listing
    fn scope(&self, _ctx: &RequestContext) -> Filter {
        Filter::All
    }
}

/// Hooks that change nothing
#[derive(Debug, Default)]
pub struct NoHooks;

impl ResourceHooks for NoHooks {}

/// Persists a new row, returning its id
#[async_trait]
pub trait CreateInstance: Send + Sync {
    async fn create(&self, pool: &PgPool, schema: &'static Schema, data: WriteSet) -> AppResult<i64>;
}

/// Persists changes to row `id`
#[async_trait]
pub trait UpdateInstance: Send + Sync {
    async fn update(
        &self,
        pool: &PgPool,
        schema: &'static Schema,
        id: i64,
        data: WriteSet,
    ) -> AppResult<()>;
}

/// Plain insert/update of the validated values
#[derive(Debug, Default)]
pub struct DefaultWriter;

#[async_trait]
impl CreateInstance for DefaultWriter {
    async fn create(&self, pool: &PgPool, schema: &'static Schema, data: WriteSet) -> AppResult<i64> {
        ResourceRepository::insert(pool, schema, &data).await
    }
}

#[async_trait]
impl UpdateInstance for DefaultWriter {
    async fn update(
        &self,
        pool: &PgPool,
        schema: &'static Schema,
        id: i64,
        data: WriteSet,
    ) -> AppResult<()> {
        ResourceRepository::update(pool, schema, id, &data).await
    }
}
