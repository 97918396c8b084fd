//! Schema-driven repository backing every resource

use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{AppError, AppResult},
    factory::{
        fields::Field,
        query::{self, Filter, OrderTerm},
        schema::{Relation, RelationKind, Schema},
        serializer::WriteSet,
        value::SqlValue,
    },
};

/// Repository for rows of any registered schema
pub struct ResourceRepository;

impl ResourceRepository {
    /// Representations of all rows matching `filter`
    pub async fn list(
        pool: &PgPool,
        schema: &'static Schema,
        fields: &[Field],
        depth: u8,
        filter: &Filter,
        ordering: &[OrderTerm],
    ) -> AppResult<Vec<Value>> {
        let mut qb = query::select_many(schema, fields, depth, filter, ordering)?;
        let rows = qb.build_query_scalar::<Value>().fetch_all(pool).await?;

        Ok(rows)
    }

    /// Representation of row `id`
    pub async fn fetch(
        pool: &PgPool,
        schema: &'static Schema,
        fields: &[Field],
        depth: u8,
        id: i64,
    ) -> AppResult<Option<Value>> {
        let mut qb = query::select_one(schema, fields, depth, id);
        let row = qb.build_query_scalar::<Value>().fetch_optional(pool).await?;

        Ok(row)
    }

    /// Whether row `id` exists and satisfies `filter`
    pub async fn exists(
        pool: &PgPool,
        schema: &'static Schema,
        id: i64,
        filter: &Filter,
    ) -> AppResult<bool> {
        let mut qb = query::exists(schema, id, filter)?;
        let found = qb.build_query_scalar::<bool>().fetch_one(pool).await?;

        Ok(found)
    }

    /// Lowest id satisfying `filter`
    pub async fn first_id(
        pool: &PgPool,
        schema: &'static Schema,
        filter: &Filter,
    ) -> AppResult<Option<i64>> {
        let mut qb = query::first_id(schema, filter)?;
        let id = qb.build_query_scalar::<i64>().fetch_optional(pool).await?;

        Ok(id)
    }

    /// Those of `ids` that have no row in `table`
    pub async fn missing_ids(pool: &PgPool, table: &'static str, ids: &[i64]) -> AppResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let missing = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT ref.id FROM UNNEST($1::bigint[]) AS ref(id)
            WHERE NOT EXISTS (SELECT 1 FROM {table} t WHERE t.id = ref.id)
            ORDER BY ref.id
            "#
        ))
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(missing)
    }

    /// Whether another row already holds `value` in `column`
    pub async fn value_taken(
        pool: &PgPool,
        table: &'static str,
        column: &'static str,
        value: SqlValue,
        exclude: Option<i64>,
    ) -> AppResult<bool> {
        let mut qb: QueryBuilder<'static, Postgres> =
            QueryBuilder::new(format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE {column} = "));
        value.push_bind(&mut qb);
        if let Some(id) = exclude {
            qb.push(" AND id <> ");
            qb.push_bind(id);
        }
        qb.push(")");

        let taken = qb.build_query_scalar::<bool>().fetch_one(pool).await?;

        Ok(taken)
    }

    /// Insert a row and its many-to-many links, returning the new id
    pub async fn insert(pool: &PgPool, schema: &'static Schema, data: &WriteSet) -> AppResult<i64> {
        let mut tx = pool.begin().await?;

        let mut qb: QueryBuilder<'static, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ", schema.table));
        let columns: Vec<(&'static str, &SqlValue)> = data.columns().collect();
        if columns.is_empty() {
            qb.push("DEFAULT VALUES");
        } else {
            let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
            qb.push(format!("({}) VALUES (", names.join(", ")));
            for (i, (_, value)) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                (*value).clone().push_bind(&mut qb);
            }
            qb.push(")");
        }
        qb.push(" RETURNING id");

        let id = qb.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        for (relation, ids) in data.links() {
            replace_links(&mut tx, relation, id, ids).await?;
        }

        tx.commit().await?;

        tracing::debug!(table = schema.table, id, "Inserted row");
        Ok(id)
    }

    /// Update the given columns and links of row `id`
    pub async fn update(
        pool: &PgPool,
        schema: &'static Schema,
        id: i64,
        data: &WriteSet,
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        let columns: Vec<(&'static str, &SqlValue)> = data.columns().collect();
        if !columns.is_empty() {
            let mut qb: QueryBuilder<'static, Postgres> =
                QueryBuilder::new(format!("UPDATE {} SET ", schema.table));
            for (i, (name, value)) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(format!("{name} = "));
                (*value).clone().push_bind(&mut qb);
            }
            qb.push(" WHERE id = ");
            qb.push_bind(id);

            let result = qb.build().execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("{} not found", schema.name)));
            }
        }

        for (relation, ids) in data.links() {
            replace_links(&mut tx, relation, id, ids).await?;
        }

        tx.commit().await?;

        tracing::debug!(table = schema.table, id, "Updated row");
        Ok(())
    }

    /// Delete row `id`; false when it did not exist
    pub async fn delete(pool: &PgPool, schema: &'static Schema, id: i64) -> AppResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", schema.table))
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Make the link set of row `id` through `relation` exactly `ids`
async fn replace_links(
    tx: &mut Transaction<'static, Postgres>,
    relation: &Relation,
    id: i64,
    ids: &[i64],
) -> AppResult<()> {
    let RelationKind::ManyToMany {
        join_table,
        source_column,
        target_column,
        ..
    } = relation.kind
    else {
        return Ok(());
    };

    sqlx::query(&format!("DELETE FROM {join_table} WHERE {source_column} = $1"))
        .bind(id)
        .execute(&mut **tx)
        .await?;

    if !ids.is_empty() {
        sqlx::query(&format!(
            "INSERT INTO {join_table} ({source_column}, {target_column}) SELECT $1, UNNEST($2::bigint[])"
        ))
        .bind(id)
        .bind(ids)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
