//! SQL generation for representations, filters and ordering
//!
//! Representations are assembled in Postgres with `json_build_object`, so a
//! list or a detail view is a single round trip regardless of how many
//! nested or related fields the resource exposes. Identifiers always come
//! from the static schemas; every client-supplied value is bound.

use anyhow::anyhow;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    factory::{
        fields::{Field, FieldSource, default_fields},
        schema::{Member, Relation, RelationKind, Schema, resolve_path},
        value::SqlValue,
    },
};

/// Root table alias
pub const ROOT: &str = "t0";

/// Hands out unique table aliases within one statement
#[derive(Debug, Default)]
pub struct Aliases(u32);

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> String {
        self.0 += 1;
        format!("t{}", self.0)
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    /// Case-insensitive substring match on the text rendering
    IContains,
}

impl Op {
    fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => " = ",
            Op::Gt => " > ",
            Op::Lt => " < ",
            Op::Gte => " >= ",
            Op::Lte => " <= ",
            Op::IContains => "::text ILIKE ",
        }
    }
}

/// A row predicate over a schema
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Never,
    /// `path` is `relation__...__member`; to-many hops mean "any related row"
    Compare {
        path: String,
        op: Op,
        value: SqlValue,
    },
    /// All `filters` hold for one and the same related row
    Related {
        relation: &'static str,
        filters: Vec<Filter>,
    },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: SqlValue) -> Self {
        Self::Compare {
            path: path.into(),
            op: Op::Eq,
            value,
        }
    }

    pub fn compare(path: impl Into<String>, op: Op, value: SqlValue) -> Self {
        Self::Compare {
            path: path.into(),
            op,
            value,
        }
    }

    pub fn related(relation: &'static str, filters: Vec<Filter>) -> Self {
        Self::Related { relation, filters }
    }

    pub fn negate(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Conjunction that drops `All` terms
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (f, Filter::And(mut b)) => {
                b.insert(0, f);
                Filter::And(b)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Append this predicate, evaluated against `alias` rows of `schema`
    pub fn push_sql(
        &self,
        qb: &mut QueryBuilder<'static, Postgres>,
        schema: &'static Schema,
        alias: &str,
        aliases: &mut Aliases,
    ) -> AppResult<()> {
        match self {
            Filter::All => {
                qb.push("TRUE");
            }
            Filter::Never => {
                qb.push("FALSE");
            }
            Filter::Compare { path, op, value } => {
                push_compare(qb, schema, alias, path, *op, value.clone(), aliases)?;
            }
            Filter::Related { relation, filters } => {
                let rel = schema.relation(relation).ok_or_else(|| {
                    AppError::Internal(anyhow!("{} has no relation {}", schema.table, relation))
                })?;
                let target = target_of(rel)?;
                let inner = aliases.next();
                push_exists_open(qb, rel, target, alias, &inner, aliases);
                push_all(qb, filters, target, &inner, aliases, " AND ", "TRUE")?;
                qb.push(")");
            }
            Filter::Not(inner) => {
                qb.push("NOT (");
                inner.push_sql(qb, schema, alias, aliases)?;
                qb.push(")");
            }
            Filter::And(filters) => push_all(qb, filters, schema, alias, aliases, " AND ", "TRUE")?,
            Filter::Or(filters) => push_all(qb, filters, schema, alias, aliases, " OR ", "FALSE")?,
        }
        Ok(())
    }
}

fn push_all(
    qb: &mut QueryBuilder<'static, Postgres>,
    filters: &[Filter],
    schema: &'static Schema,
    alias: &str,
    aliases: &mut Aliases,
    joiner: &str,
    empty: &str,
) -> AppResult<()> {
    if filters.is_empty() {
        qb.push(empty);
        return Ok(());
    }
    qb.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(joiner);
        }
        filter.push_sql(qb, schema, alias, aliases)?;
    }
    qb.push(")");
    Ok(())
}

fn target_of(relation: &Relation) -> AppResult<&'static Schema> {
    relation
        .target_schema()
        .ok_or_else(|| AppError::Internal(anyhow!("unknown table {}", relation.target)))
}

/// `EXISTS (SELECT 1 FROM <target> <inner> ... WHERE <link> AND ` (caller closes)
fn push_exists_open(
    qb: &mut QueryBuilder<'static, Postgres>,
    relation: &Relation,
    target: &Schema,
    outer: &str,
    inner: &str,
    aliases: &mut Aliases,
) {
    qb.push("EXISTS (SELECT 1");
    push_related_rows(qb, relation, target, outer, inner, aliases);
    qb.push(" AND ");
}

/// ` FROM <target> <inner> [JOIN ...] WHERE <inner is related to outer>`
fn push_related_rows(
    qb: &mut QueryBuilder<'static, Postgres>,
    relation: &Relation,
    target: &Schema,
    outer: &str,
    inner: &str,
    aliases: &mut Aliases,
) {
    match relation.kind {
        RelationKind::ForeignKey { column } => {
            qb.push(format!(
                " FROM {table} {inner} WHERE {inner}.id = {outer}.{column}",
                table = target.table,
            ));
        }
        RelationKind::OneToMany { column } => {
            qb.push(format!(
                " FROM {table} {inner} WHERE {inner}.{column} = {outer}.id",
                table = target.table,
            ));
        }
        RelationKind::ManyToMany {
            join_table,
            source_column,
            target_column,
            ..
        } => {
            let link = aliases.next();
            qb.push(format!(
                " FROM {table} {inner} JOIN {join_table} {link} ON {link}.{target_column} = {inner}.id \
                 WHERE {link}.{source_column} = {outer}.id",
                table = target.table,
            ));
        }
    }
}

fn push_compare(
    qb: &mut QueryBuilder<'static, Postgres>,
    schema: &'static Schema,
    alias: &str,
    path: &str,
    op: Op,
    value: SqlValue,
    aliases: &mut Aliases,
) -> AppResult<()> {
    let resolved = resolve_path(schema, path)
        .map_err(|e| AppError::Internal(anyhow!("invalid filter path {}: {:?}", path, e)))?;

    let mut hops = resolved.hops.clone();
    let column = match resolved.end {
        Member::Column(column) => column.name,
        Member::Relation(relation) => match relation.fk_column() {
            Some(column) => column,
            None => {
                hops.push(relation);
                "id"
            }
        },
    };

    let mut current = alias.to_string();
    for hop in &hops {
        let target = target_of(hop)?;
        let inner = aliases.next();
        push_exists_open(qb, hop, target, &current, &inner, aliases);
        current = inner;
    }

    if value.is_null() {
        let test = if op == Op::Eq { "IS NULL" } else { "IS NOT NULL" };
        qb.push(format!("{current}.{column} {test}"));
    } else if op == Op::IContains {
        qb.push(format!("{current}.{column}{}", op.as_sql()));
        let pattern = match value {
            SqlValue::Text(Some(term)) => format!("%{}%", escape_like(&term)),
            other => return Err(AppError::Internal(anyhow!("icontains needs text, got {:?}", other))),
        };
        qb.push_bind(pattern);
    } else {
        qb.push(format!("{current}.{column}{}", op.as_sql()));
        value.push_bind(qb);
    }

    for _ in &hops {
        qb.push(")");
    }
    Ok(())
}

/// Escape LIKE metacharacters
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One `ORDER BY` term on a column of the root table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderTerm {
    /// Parse `name` or `-name`
    pub fn parse(term: &'static str) -> Self {
        match term.strip_prefix('-') {
            Some(column) => Self {
                column,
                descending: true,
            },
            None => Self {
                column: term,
                descending: false,
            },
        }
    }
}

/// Declared default ordering of a schema
pub fn default_ordering(schema: &Schema) -> Vec<OrderTerm> {
    schema.ordering.iter().map(|t| OrderTerm::parse(t)).collect()
}

/// Terms followed by the primary key as a tiebreaker
fn push_order_terms(qb: &mut QueryBuilder<'static, Postgres>, terms: &[OrderTerm], alias: &str) {
    for term in terms {
        let direction = if term.descending { "DESC" } else { "ASC" };
        qb.push(format!("{alias}.{} {direction}, ", term.column));
    }
    qb.push(format!("{alias}.id ASC"));
}

/// `json_build_object(...)` rendering `fields` of the `alias` row
pub fn push_object(
    qb: &mut QueryBuilder<'static, Postgres>,
    fields: &[Field],
    alias: &str,
    depth: u8,
    aliases: &mut Aliases,
) {
    qb.push("json_build_object(");
    let mut first = true;
    for field in fields.iter().filter(|f| f.is_readable()) {
        if !first {
            qb.push(", ");
        }
        first = false;
        qb.push(format!("'{}', ", field.name));
        push_field_expr(qb, field, alias, depth, aliases);
    }
    qb.push(")");
}

fn push_field_expr(
    qb: &mut QueryBuilder<'static, Postgres>,
    field: &Field,
    alias: &str,
    depth: u8,
    aliases: &mut Aliases,
) {
    match &field.source {
        FieldSource::Column(column) => {
            qb.push(format!("{alias}.{}", column.name));
        }
        FieldSource::Relation(relation) => {
            let Some(target) = relation.target_schema() else {
                qb.push("NULL");
                return;
            };
            match relation.kind {
                RelationKind::ForeignKey { column } if depth == 0 => {
                    qb.push(format!("{alias}.{column}"));
                }
                RelationKind::ForeignKey { .. } => {
                    let inner = aliases.next();
                    qb.push("(SELECT ");
                    push_object(qb, &default_fields(target, depth - 1), &inner, depth - 1, aliases);
                    push_related_rows(qb, relation, target, alias, &inner, aliases);
                    qb.push(")");
                }
                _ if depth == 0 => {
                    let inner = aliases.next();
                    qb.push(format!("COALESCE((SELECT json_agg({inner}.id ORDER BY {inner}.id)"));
                    push_related_rows(qb, relation, target, alias, &inner, aliases);
                    qb.push("), '[]'::json)");
                }
                _ => {
                    let nested = default_fields(target, depth - 1);
                    push_aggregate(qb, relation, target, &nested, alias, depth - 1, aliases);
                }
            }
        }
        FieldSource::Nested {
            relation,
            target,
            fields,
        } => push_aggregate(qb, relation, target, fields, alias, 0, aliases),
        FieldSource::Related { hops, column } => push_related_value(qb, hops, column.name, alias, aliases),
    }
}

/// JSON array of related rows in the target's default order
fn push_aggregate(
    qb: &mut QueryBuilder<'static, Postgres>,
    relation: &Relation,
    target: &'static Schema,
    fields: &[Field],
    alias: &str,
    depth: u8,
    aliases: &mut Aliases,
) {
    let inner = aliases.next();
    qb.push("COALESCE((SELECT json_agg(");
    push_object(qb, fields, &inner, depth, aliases);
    qb.push(" ORDER BY ");
    push_order_terms(qb, &default_ordering(target), &inner);
    qb.push(")");
    push_related_rows(qb, relation, target, alias, &inner, aliases);
    qb.push("), '[]'::json)");
}

/// Scalar subselect following foreign keys
fn push_related_value(
    qb: &mut QueryBuilder<'static, Postgres>,
    hops: &[&'static Relation],
    column: &str,
    alias: &str,
    aliases: &mut Aliases,
) {
    let Some((hop, rest)) = hops.split_first() else {
        qb.push(format!("{alias}.{column}"));
        return;
    };
    let Some(target) = hop.target_schema() else {
        qb.push("NULL");
        return;
    };
    let inner = aliases.next();
    qb.push("(SELECT ");
    push_related_value(qb, rest, column, &inner, aliases);
    push_related_rows(qb, hop, target, alias, &inner, aliases);
    qb.push(")");
}

/// Representations of every row matching `filter`
pub fn select_many(
    schema: &'static Schema,
    fields: &[Field],
    depth: u8,
    filter: &Filter,
    ordering: &[OrderTerm],
) -> AppResult<QueryBuilder<'static, Postgres>> {
    let mut aliases = Aliases::new();
    let mut qb = QueryBuilder::new("SELECT ");
    push_object(&mut qb, fields, ROOT, depth, &mut aliases);
    qb.push(format!(" FROM {} {ROOT} WHERE ", schema.table));
    filter.push_sql(&mut qb, schema, ROOT, &mut aliases)?;
    qb.push(" ORDER BY ");
    push_order_terms(&mut qb, ordering, ROOT);
    Ok(qb)
}

/// Representation of one row
pub fn select_one(
    schema: &'static Schema,
    fields: &[Field],
    depth: u8,
    id: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut aliases = Aliases::new();
    let mut qb = QueryBuilder::new("SELECT ");
    push_object(&mut qb, fields, ROOT, depth, &mut aliases);
    qb.push(format!(" FROM {} {ROOT} WHERE {ROOT}.id = ", schema.table));
    qb.push_bind(id);
    qb
}

/// `SELECT EXISTS(...)` for row `id` satisfying `filter`
pub fn exists(
    schema: &'static Schema,
    id: i64,
    filter: &Filter,
) -> AppResult<QueryBuilder<'static, Postgres>> {
    let mut aliases = Aliases::new();
    let mut qb = QueryBuilder::new(format!(
        "SELECT EXISTS (SELECT 1 FROM {} {ROOT} WHERE {ROOT}.id = ",
        schema.table
    ));
    qb.push_bind(id);
    qb.push(" AND ");
    filter.push_sql(&mut qb, schema, ROOT, &mut aliases)?;
    qb.push(")");
    Ok(qb)
}

/// Lowest id satisfying `filter`
pub fn first_id(schema: &'static Schema, filter: &Filter) -> AppResult<QueryBuilder<'static, Postgres>> {
    let mut aliases = Aliases::new();
    let mut qb = QueryBuilder::new(format!("SELECT {ROOT}.id FROM {} {ROOT} WHERE ", schema.table));
    filter.push_sql(&mut qb, schema, ROOT, &mut aliases)?;
    qb.push(format!(" ORDER BY {ROOT}.id LIMIT 1"));
    Ok(qb)
}
