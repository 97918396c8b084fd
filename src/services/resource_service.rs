//! Generic CRUD service driving every resource

use serde_json::Value;
use sqlx::PgPool;

use crate::{
    db::repositories::ResourceRepository,
    error::{AppError, AppResult, FieldErrors},
    factory::{
        Action, Filter, ObjectLookup, RequestContext, Resource, Serializer, SqlValue, WriteMode,
        WriteSet,
    },
};

const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Resource service for list/create/retrieve/update/destroy
pub struct ResourceService;

impl ResourceService {
    /// All visible rows, filtered and ordered per the query string
    pub async fn list(pool: &PgPool, resource: &Resource, ctx: &RequestContext) -> AppResult<Vec<Value>> {
        Self::check_action(resource, ctx)?;
        Self::check_permissions(resource, ctx)?;

        let filter = resource.list_filter(ctx)?;
        let ordering = resource.ordering(ctx);
        let serializer = resource.serializer();

        ResourceRepository::list(
            pool,
            resource.schema(),
            serializer.fields(),
            serializer.depth(),
            &filter,
            &ordering,
        )
        .await
    }

    /// One row
    pub async fn retrieve(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        lookup: &str,
    ) -> AppResult<Value> {
        Self::check_action(resource, ctx)?;
        Self::check_permissions(resource, ctx)?;

        let id = Self::get_object(pool, resource, ctx, lookup).await?;
        Self::check_object_permissions(pool, resource, ctx, id).await?;

        let serializer = Self::serializer_for(pool, resource, ctx, Some(id)).await?;
        Self::represent(pool, resource, serializer, id).await
    }

    /// Validate and insert a new row, returning its representation
    pub async fn create(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        body: &Value,
    ) -> AppResult<Value> {
        Self::check_action(resource, ctx)?;
        Self::check_permissions(resource, ctx)?;

        let serializer = Self::serializer_for(pool, resource, ctx, None).await?;
        let data = Self::validate(pool, resource, serializer, ctx, body, WriteMode::Create, None).await?;
        Self::check_parent_permissions(pool, resource, ctx, &data).await?;

        let id = resource.creator().create(pool, resource.schema(), data).await?;

        tracing::info!(resource = resource.name(), id, user_id = ?ctx.user_id(), "Created object");
        Self::represent(pool, resource, serializer, id).await
    }

    /// Full or partial update
    pub async fn update(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        lookup: &str,
        body: &Value,
    ) -> AppResult<Value> {
        Self::check_action(resource, ctx)?;
        Self::check_permissions(resource, ctx)?;

        let id = Self::get_object(pool, resource, ctx, lookup).await?;
        Self::check_object_permissions(pool, resource, ctx, id).await?;

        let mode = if ctx.action == Action::PartialUpdate {
            WriteMode::PartialUpdate
        } else {
            WriteMode::Update
        };
        let serializer = Self::serializer_for(pool, resource, ctx, Some(id)).await?;
        let data = Self::validate(pool, resource, serializer, ctx, body, mode, Some(id)).await?;
        Self::check_parent_permissions(pool, resource, ctx, &data).await?;

        resource.updater().update(pool, resource.schema(), id, data).await?;

        tracing::info!(resource = resource.name(), id, user_id = ?ctx.user_id(), "Updated object");
        Self::represent(pool, resource, serializer, id).await
    }

    /// Delete a row
    pub async fn destroy(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        lookup: &str,
    ) -> AppResult<()> {
        Self::check_action(resource, ctx)?;
        Self::check_permissions(resource, ctx)?;

        let id = Self::get_object(pool, resource, ctx, lookup).await?;
        Self::check_object_permissions(pool, resource, ctx, id).await?;

        if !ResourceRepository::delete(pool, resource.schema(), id).await? {
            return Err(not_found());
        }

        tracing::info!(resource = resource.name(), id, user_id = ?ctx.user_id(), "Deleted object");
        Ok(())
    }

    fn check_action(resource: &Resource, ctx: &RequestContext) -> AppResult<()> {
        if resource.is_enabled(ctx.action) {
            Ok(())
        } else {
            Err(AppError::MethodNotAllowed(ctx.action.method().to_string()))
        }
    }

    fn check_permissions(resource: &Resource, ctx: &RequestContext) -> AppResult<()> {
        if resource.permissions().iter().all(|p| p.has_permission(ctx)) {
            Ok(())
        } else {
            Err(permission_denied(ctx))
        }
    }

    /// Resolve the lookup to the id of a row inside the resource's scope
    async fn get_object(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        lookup: &str,
    ) -> AppResult<i64> {
        let scope = resource.hooks().scope(ctx);
        match resource.lookup() {
            ObjectLookup::ById => {
                let id = lookup.parse::<i64>().map_err(|_| not_found())?;
                if ResourceRepository::exists(pool, resource.schema(), id, &scope).await? {
                    Ok(id)
                } else {
                    Err(not_found())
                }
            }
            ObjectLookup::OwnedBy(field) => {
                let user_id = ctx.user_id().ok_or_else(not_found)?;
                let filter = scope.and(Filter::eq(field, SqlValue::Int(Some(user_id))));
                ResourceRepository::first_id(pool, resource.schema(), &filter)
                    .await?
                    .ok_or_else(not_found)
            }
        }
    }

    async fn check_object_permissions(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        id: i64,
    ) -> AppResult<()> {
        let filter = resource
            .permissions()
            .iter()
            .filter_map(|p| p.object_filter(ctx))
            .fold(Filter::All, Filter::and);
        if filter == Filter::All {
            return Ok(());
        }

        if ResourceRepository::exists(pool, resource.schema(), id, &filter).await? {
            Ok(())
        } else {
            tracing::debug!(resource = resource.name(), id, user_id = ?ctx.user_id(), "Object permission denied");
            Err(permission_denied(ctx))
        }
    }

    /// The payload's parent rows must satisfy the parent conditions
    async fn check_parent_permissions(
        pool: &PgPool,
        resource: &Resource,
        ctx: &RequestContext,
        data: &WriteSet,
    ) -> AppResult<()> {
        let schema = resource.schema();
        for parent in resource.permissions().iter().filter_map(|p| p.parent_filter(ctx)) {
            let Some(relation) = schema.relation(parent.relation) else {
                continue;
            };
            let (Some(column), Some(target)) = (relation.fk_column(), relation.target_schema()) else {
                continue;
            };
            let Some(parent_id) = data.int(column) else {
                continue;
            };

            if !ResourceRepository::exists(pool, target, parent_id, &parent.filter).await? {
                tracing::debug!(
                    resource = resource.name(),
                    parent = parent.relation,
                    parent_id,
                    "Parent permission denied"
                );
                return Err(permission_denied(ctx));
            }
        }
        Ok(())
    }

    /// Owner field set on create and for the owner's own rows
    async fn serializer_for<'r>(
        pool: &PgPool,
        resource: &'r Resource,
        ctx: &RequestContext,
        id: Option<i64>,
    ) -> AppResult<&'r Serializer> {
        let Some(owner) = resource.owner_serializer() else {
            return Ok(resource.serializer());
        };
        let owns = match (id, resource.owned_by(ctx)) {
            (None, _) => ctx.is_authenticated(),
            (Some(id), Some(filter)) => ResourceRepository::exists(pool, resource.schema(), id, &filter).await?,
            (Some(_), None) => false,
        };
        Ok(if owns { owner } else { resource.serializer() })
    }

    /// Field coercion, resource hooks, then database-backed checks
    async fn validate(
        pool: &PgPool,
        resource: &Resource,
        serializer: &Serializer,
        ctx: &RequestContext,
        body: &Value,
        mode: WriteMode,
        instance: Option<i64>,
    ) -> AppResult<WriteSet> {
        let mut data = serializer.validate(body, mode, ctx.user_id())?;
        resource.hooks().validate(ctx, &mut data)?;

        let mut errors = FieldErrors::new();
        for reference in serializer.references(&data) {
            let missing = ResourceRepository::missing_ids(pool, reference.table, &reference.ids).await?;
            for id in missing {
                errors.add(reference.field, format!("Invalid pk \"{id}\" - object does not exist."));
            }
        }
        for check in serializer.unique_checks(&data) {
            if errors.contains(check.field) {
                continue;
            }
            let taken = ResourceRepository::value_taken(
                pool,
                resource.schema().table,
                check.column,
                check.value,
                instance,
            )
            .await?;
            if taken {
                errors.add(check.field, serializer.unique_message(check.field));
            }
        }
        errors.into_result()?;

        Ok(data)
    }

    async fn represent(pool: &PgPool, resource: &Resource, serializer: &Serializer, id: i64) -> AppResult<Value> {
        ResourceRepository::fetch(pool, resource.schema(), serializer.fields(), serializer.depth(), id)
            .await?
            .ok_or_else(not_found)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Not found.".to_string())
}

/// 403 either way; the message tells anonymous callers to authenticate
fn permission_denied(ctx: &RequestContext) -> AppError {
    if ctx.is_authenticated() {
        AppError::Forbidden(PERMISSION_DENIED.to_string())
    } else {
        AppError::NotAuthenticated
    }
}
