//! Payload validation against a resolved field list

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    error::FieldErrors,
    factory::{
        fields::{Field, FieldSource},
        schema::{Relation, RelationKind, Schema},
        value::{self, NOT_NULL, REQUIRED, SqlValue},
    },
};

/// How strictly a payload is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
    /// Missing fields are left untouched
    PartialUpdate,
}

/// Validated values ready to persist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    columns: BTreeMap<&'static str, SqlValue>,
    links: Vec<(&'static Relation, Vec<i64>)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) {
        self.columns.insert(column, value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_int)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SqlValue::as_text)
    }

    /// Replace the link set of a many-to-many relation
    pub fn set_links(&mut self, relation: &'static Relation, ids: Vec<i64>) {
        self.links.retain(|(r, _)| r.name != relation.name);
        self.links.push((relation, ids));
    }

    pub fn columns(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (*k, v))
    }

    pub fn links(&self) -> &[(&'static Relation, Vec<i64>)] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.links.is_empty()
    }
}

/// Ids a payload refers to in another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub table: &'static str,
    pub ids: Vec<i64>,
}

/// A value that must not already exist in `column`
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueCheck {
    pub field: &'static str,
    pub column: &'static str,
    pub value: SqlValue,
}

/// Validates payloads and describes representations for one field set
#[derive(Debug, Clone)]
pub struct Serializer {
    schema: &'static Schema,
    fields: Vec<Field>,
    depth: u8,
    auto_user: Option<&'static Relation>,
}

impl Serializer {
    pub fn new(
        schema: &'static Schema,
        fields: Vec<Field>,
        depth: u8,
        auto_user: Option<&'static Relation>,
    ) -> Self {
        Self {
            schema,
            fields,
            depth,
            auto_user,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn is_auto_user(&self, field: &Field) -> bool {
        matches!((&field.source, self.auto_user), (FieldSource::Relation(r), Some(auto)) if r.name == auto.name)
    }

    /// Coerce `body` into a write set; the caller's id fills the auto user field on create
    pub fn validate(
        &self,
        body: &Value,
        mode: WriteMode,
        caller: Option<i64>,
    ) -> Result<WriteSet, FieldErrors> {
        let Value::Object(map) = body else {
            return Err(FieldErrors::single(
                "non_field_errors",
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type(body)
                ),
            ));
        };

        let mut errors = FieldErrors::new();
        let mut data = WriteSet::new();

        for field in self.fields.iter().filter(|f| f.is_writable()) {
            if self.is_auto_user(field) {
                continue;
            }

            let Some(raw) = map.get(field.name) else {
                if mode != WriteMode::PartialUpdate && field.required {
                    errors.add(field.name, REQUIRED);
                }
                continue;
            };

            match &field.source {
                FieldSource::Column(column) => match value::coerce(column, raw, field.allow_null) {
                    Ok(v) => data.set(column.name, v),
                    Err(message) => errors.add(field.name, message),
                },
                FieldSource::Relation(relation) => match relation.kind {
                    RelationKind::ForeignKey { column } => {
                        if raw.is_null() {
                            if field.allow_null {
                                data.set(column, SqlValue::Int(None));
                            } else {
                                errors.add(field.name, NOT_NULL);
                            }
                        } else {
                            match value::coerce_pk(raw) {
                                Ok(id) => data.set(column, SqlValue::Int(Some(id))),
                                Err(message) => errors.add(field.name, message),
                            }
                        }
                    }
                    RelationKind::ManyToMany { .. } => match value::coerce_pk_list(raw) {
                        Ok(ids) => data.set_links(relation, ids),
                        Err(message) => errors.add(field.name, message),
                    },
                    RelationKind::OneToMany { .. } => {}
                },
                FieldSource::Nested { .. } | FieldSource::Related { .. } => {}
            }
        }

        if mode == WriteMode::Create {
            if let Some(relation) = self.auto_user {
                let column = relation.fk_column().unwrap_or("user_id");
                match caller {
                    Some(id) => data.set(column, SqlValue::Int(Some(id))),
                    None if !relation.nullable => errors.add(relation.name, REQUIRED),
                    None => {}
                }
            }
        }

        errors.into_result().map(|_| data)
    }

    /// Foreign key and many-to-many ids that must exist
    pub fn references(&self, data: &WriteSet) -> Vec<Reference> {
        let mut references = Vec::new();
        for field in &self.fields {
            let FieldSource::Relation(relation) = field.source else {
                continue;
            };
            if self.is_auto_user(field) {
                continue;
            }
            match relation.kind {
                RelationKind::ForeignKey { column } => {
                    if let Some(id) = data.int(column) {
                        references.push(Reference {
                            field: field.name,
                            table: relation.target,
                            ids: vec![id],
                        });
                    }
                }
                RelationKind::ManyToMany { .. } => {
                    if let Some((_, ids)) = data.links().iter().find(|(r, _)| r.name == relation.name) {
                        if !ids.is_empty() {
                            references.push(Reference {
                                field: field.name,
                                table: relation.target,
                                ids: ids.clone(),
                            });
                        }
                    }
                }
                RelationKind::OneToMany { .. } => {}
            }
        }
        references
    }

    /// Unique columns carried by the payload
    pub fn unique_checks(&self, data: &WriteSet) -> Vec<UniqueCheck> {
        let mut checks = Vec::new();
        for column in self.schema.columns.iter().filter(|c| c.unique) {
            if let Some(value) = data.get(column.name).filter(|v| !v.is_null()) {
                checks.push(UniqueCheck {
                    field: column.name,
                    column: column.name,
                    value: value.clone(),
                });
            }
        }
        for relation in self.schema.relations.iter().filter(|r| r.unique) {
            let Some(column) = relation.fk_column() else {
                continue;
            };
            if let Some(value) = data.get(column).filter(|v| !v.is_null()) {
                checks.push(UniqueCheck {
                    field: relation.name,
                    column,
                    value: value.clone(),
                });
            }
        }
        checks
    }

    /// Message for a unique violation on `field`
    pub fn unique_message(&self, field: &str) -> String {
        format!("{} with this {} already exists.", self.schema.name, field.replace('_', " "))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
