//! Declarative REST resources
//!
//! A `ResourceConfig` names an entity schema and describes how it is exposed:
//! which fields, which of them are read-only or write-only, who may do what,
//! which query parameters filter the listing and how rows are written.
//! `ResourceConfig::build` checks the whole declaration against the schema
//! once, at startup, and produces a `Resource` that the generic handlers
//! drive at request time.

pub mod context;
pub mod fields;
pub mod hooks;
pub mod query;
pub mod registry;
pub mod schema;
pub mod serializer;
pub mod value;

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    constants::{MAX_SERIALIZER_DEPTH, ORDERING_PARAM, SEARCH_PARAM},
    error::FieldErrors,
    permissions::{BoxedPermission, PermissionSpec},
};

pub use context::{Action, RequestContext};
pub use fields::{FieldOptions, FieldSpec};
pub use hooks::{CreateInstance, DefaultWriter, NoHooks, ResourceHooks, UpdateInstance};
pub use query::{Filter, Op, OrderTerm};
pub use registry::Registry;
pub use schema::Schema;
pub use serializer::{Serializer, WriteMode, WriteSet};
pub use value::SqlValue;

use fields::{FieldSource, apply_options, extra_kwargs, resolve_fields};
use schema::{ColumnKind, Member, Relation, resolve_path};

/// A resource declaration that does not fit its schema
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("{resource}: fields and excluded fields can not be given at the same time")]
    FieldsAndExclusion { resource: &'static str },

    #[error("{resource}: field list is empty")]
    EmptyFieldList { resource: &'static str },

    #[error("{resource}: field {field} is listed twice")]
    DuplicateField { resource: &'static str, field: String },

    #[error("{resource}: field {field} not found on the model")]
    UnknownField { resource: &'static str, field: String },

    #[error("{resource}: nested field {field} needs a to-many relation")]
    NotToMany {
        resource: &'static str,
        field: &'static str,
    },

    #[error("{resource}: invalid path {path}: {reason}")]
    InvalidPath {
        resource: &'static str,
        path: String,
        reason: String,
    },

    #[error("{resource}: options given for {field}, which is not an exposed field")]
    UnknownOptionField { resource: &'static str, field: String },

    #[error("{resource}: contradictory options for {field}")]
    OptionConflict { resource: &'static str, field: String },

    #[error("{resource}: auto user field {field} must be a foreign key to users")]
    AutoUserField {
        resource: &'static str,
        field: &'static str,
    },

    #[error("{resource}: owner field set needs an auto user field")]
    OwnerFieldsWithoutOwner { resource: &'static str },

    #[error("{resource}: serializer depth {depth} is too deep")]
    DepthTooLarge { resource: &'static str, depth: u8 },

    #[error("{resource}: empty permission or owner list")]
    EmptyPermissionGroup { resource: &'static str },

    #[error("{resource}: lookup field {field} must be a foreign key to users")]
    InvalidLookup {
        resource: &'static str,
        field: &'static str,
    },

    #[error("invalid resource name {0:?}")]
    InvalidName(&'static str),

    #[error("resource {0} is registered twice")]
    DuplicateResource(&'static str),
}

/// How `/{id}` is resolved to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLookup {
    ById,
    /// Whatever id is given, the row whose `field` is the caller
    OwnedBy(&'static str),
}

/// Declaration of a REST resource
pub struct ResourceConfig {
    name: &'static str,
    schema: &'static Schema,
    fields: Option<Vec<FieldSpec>>,
    excluded_fields: Option<Vec<&'static str>>,
    read_only_fields: Vec<&'static str>,
    write_only_fields: Vec<&'static str>,
    extra_kwargs: BTreeMap<&'static str, FieldOptions>,
    auto_user_field: Option<&'static str>,
    create_instance: Option<Arc<dyn CreateInstance>>,
    update_instance: Option<Arc<dyn UpdateInstance>>,
    permissions: Vec<PermissionSpec>,
    filter_fields: Vec<&'static str>,
    search_fields: Vec<&'static str>,
    depth: u8,
    disabled_actions: Vec<Action>,
    owner_fields: Option<Vec<FieldSpec>>,
    lookup: ObjectLookup,
    hooks: Option<Arc<dyn ResourceHooks>>,
}

impl ResourceConfig {
    pub fn new(name: &'static str, schema: &'static Schema) -> Self {
        Self {
            name,
            schema,
            fields: None,
            excluded_fields: None,
            read_only_fields: Vec::new(),
            write_only_fields: Vec::new(),
            extra_kwargs: BTreeMap::new(),
            auto_user_field: None,
            create_instance: None,
            update_instance: None,
            permissions: Vec::new(),
            filter_fields: Vec::new(),
            search_fields: Vec::new(),
            depth: 0,
            disabled_actions: Vec::new(),
            owner_fields: None,
            lookup: ObjectLookup::ById,
            hooks: None,
        }
    }

    pub fn fields(mut self, fields: &[FieldSpec]) -> Self {
        self.fields = Some(fields.to_vec());
        self
    }

    /// Plain column/relation names only
    pub fn field_names(mut self, names: &[&'static str]) -> Self {
        self.fields = Some(names.iter().map(|n| FieldSpec::Plain(n)).collect());
        self
    }

    pub fn exclude(mut self, names: &[&'static str]) -> Self {
        self.excluded_fields = Some(names.to_vec());
        self
    }

    pub fn read_only(mut self, names: &[&'static str]) -> Self {
        self.read_only_fields.extend_from_slice(names);
        self
    }

    pub fn write_only(mut self, names: &[&'static str]) -> Self {
        self.write_only_fields.extend_from_slice(names);
        self
    }

    pub fn field_options(mut self, name: &'static str, options: FieldOptions) -> Self {
        let merged = self.extra_kwargs.get(name).copied().unwrap_or_default().merge(options);
        self.extra_kwargs.insert(name, merged);
        self
    }

    /// Foreign key stamped with the caller on create
    pub fn auto_user_field(mut self, name: &'static str) -> Self {
        self.auto_user_field = Some(name);
        self
    }

    pub fn create_instance(mut self, writer: impl CreateInstance + 'static) -> Self {
        self.create_instance = Some(Arc::new(writer));
        self
    }

    pub fn update_instance(mut self, writer: impl UpdateInstance + 'static) -> Self {
        self.update_instance = Some(Arc::new(writer));
        self
    }

    pub fn permissions(mut self, permissions: Vec<PermissionSpec>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn filter_fields(mut self, paths: &[&'static str]) -> Self {
        self.filter_fields = paths.to_vec();
        self
    }

    pub fn search_fields(mut self, paths: &[&'static str]) -> Self {
        self.search_fields = paths.to_vec();
        self
    }

    pub fn depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn disable(mut self, actions: &[Action]) -> Self {
        self.disabled_actions.extend_from_slice(actions);
        self
    }

    /// Field set shown to the owner and used on create
    pub fn owner_fields(mut self, fields: &[FieldSpec]) -> Self {
        self.owner_fields = Some(fields.to_vec());
        self
    }

    pub fn lookup(mut self, lookup: ObjectLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn hooks(mut self, hooks: impl ResourceHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Validate the declaration against the schema
    pub fn build(self) -> Result<Resource, FactoryError> {
        let resource = self.name;
        let schema = self.schema;

        let valid_name = !resource.is_empty()
            && resource
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid_name {
            return Err(FactoryError::InvalidName(resource));
        }
        if self.depth > MAX_SERIALIZER_DEPTH {
            return Err(FactoryError::DepthTooLarge {
                resource,
                depth: self.depth,
            });
        }

        let auto_user = match self.auto_user_field {
            Some(name) => Some(user_relation(schema, name).ok_or(FactoryError::AutoUserField {
                resource,
                field: name,
            })?),
            None => None,
        };

        let kwargs = extra_kwargs(&self.write_only_fields, &self.extra_kwargs);

        let mut public = resolve_fields(
            resource,
            schema,
            self.fields.as_deref(),
            self.excluded_fields.as_deref(),
            self.depth,
        )?;
        apply_options(resource, &mut public, &self.read_only_fields, &kwargs)?;

        let owner_serializer = match &self.owner_fields {
            Some(specs) => {
                if auto_user.is_none() {
                    return Err(FactoryError::OwnerFieldsWithoutOwner { resource });
                }
                let mut owner = resolve_fields(resource, schema, Some(specs.as_slice()), None, self.depth)?;
                apply_options(resource, &mut owner, &self.read_only_fields, &kwargs)?;
                Some(Serializer::new(schema, owner, self.depth, auto_user))
            }
            None => None,
        };

        let specs = if self.permissions.is_empty() {
            vec![PermissionSpec::IsAuthenticatedOrReadOnly]
        } else {
            self.permissions
        };
        let permissions = specs
            .iter()
            .map(|spec| spec.build(resource, schema))
            .collect::<Result<Vec<_>, _>>()?;

        let mut filter_fields = Vec::with_capacity(self.filter_fields.len());
        for path in self.filter_fields {
            let resolved = resolve_path(schema, path).map_err(|e| FactoryError::InvalidPath {
                resource,
                path: path.to_string(),
                reason: format!("{:?}", e),
            })?;
            if let Member::Column(column) = resolved.end {
                if column.secret {
                    return Err(FactoryError::InvalidPath {
                        resource,
                        path: path.to_string(),
                        reason: "secret columns can not be filtered".to_string(),
                    });
                }
            }
            filter_fields.push(FilterField {
                name: path,
                kind: resolved.end_kind(),
            });
        }

        for path in &self.search_fields {
            let resolved = resolve_path(schema, path).map_err(|e| FactoryError::InvalidPath {
                resource,
                path: path.to_string(),
                reason: format!("{:?}", e),
            })?;
            if !matches!(resolved.end, Member::Column(c) if !c.secret) {
                return Err(FactoryError::InvalidPath {
                    resource,
                    path: path.to_string(),
                    reason: "search fields must end at a column".to_string(),
                });
            }
        }

        if let ObjectLookup::OwnedBy(field) = self.lookup {
            if user_relation(schema, field).is_none() {
                return Err(FactoryError::InvalidLookup { resource, field });
            }
        }

        Ok(Resource {
            name: resource,
            schema,
            serializer: Serializer::new(schema, public, self.depth, auto_user),
            owner_serializer,
            owner_relation: auto_user,
            permissions,
            filter_fields,
            search_fields: self.search_fields,
            disabled_actions: self.disabled_actions,
            lookup: self.lookup,
            hooks: self.hooks.unwrap_or_else(|| Arc::new(NoHooks)),
            creator: self.create_instance.unwrap_or_else(|| Arc::new(DefaultWriter)),
            updater: self.update_instance.unwrap_or_else(|| Arc::new(DefaultWriter)),
        })
    }
}

fn user_relation(schema: &'static Schema, name: &str) -> Option<&'static Relation> {
    schema
        .relation(name)
        .filter(|r| r.target == "users" && r.fk_column().is_some())
}

/// A declared query-string filter
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// A validated resource
pub struct Resource {
    name: &'static str,
    schema: &'static Schema,
    serializer: Serializer,
    owner_serializer: Option<Serializer>,
    owner_relation: Option<&'static Relation>,
    permissions: Vec<BoxedPermission>,
    filter_fields: Vec<FilterField>,
    search_fields: Vec<&'static str>,
    disabled_actions: Vec<Action>,
    lookup: ObjectLookup,
    hooks: Arc<dyn ResourceHooks>,
    creator: Arc<dyn CreateInstance>,
    updater: Arc<dyn UpdateInstance>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("table", &self.schema.table)
            .field("disabled_actions", &self.disabled_actions)
            .finish_non_exhaustive()
    }
}

impl Resource {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        !self.disabled_actions.contains(&action)
    }

    pub fn permissions(&self) -> &[BoxedPermission] {
        &self.permissions
    }

    pub fn lookup(&self) -> ObjectLookup {
        self.lookup
    }

    pub fn hooks(&self) -> &dyn ResourceHooks {
        self.hooks.as_ref()
    }

    pub fn creator(&self) -> &dyn CreateInstance {
        self.creator.as_ref()
    }

    pub fn updater(&self) -> &dyn UpdateInstance {
        self.updater.as_ref()
    }

    /// Field set for everyone
    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    /// Field set for the owner, when one is declared
    pub fn owner_serializer(&self) -> Option<&Serializer> {
        self.owner_serializer.as_ref()
    }

    /// Rows the caller owns, if the resource has an owner view
    pub fn owned_by(&self, ctx: &RequestContext) -> Option<Filter> {
        self.owner_serializer.as_ref()?;
        let relation = self.owner_relation?;
        let id = ctx.user_id()?;
        Some(Filter::eq(relation.name, SqlValue::Int(Some(id))))
    }

    /// Scope hook plus declared filter and search parameters
    pub fn list_filter(&self, ctx: &RequestContext) -> Result<Filter, FieldErrors> {
        let mut filter = self.hooks.scope(ctx);
        let mut errors = FieldErrors::new();

        for field in &self.filter_fields {
            let Some(raw) = ctx.param(field.name) else {
                continue;
            };
            match value::coerce_query(field.kind, raw) {
                Ok(v) => filter = filter.and(Filter::eq(field.name, v)),
                Err(message) => errors.add(field.name, message),
            }
        }

        if let Some(search) = ctx.param(SEARCH_PARAM) {
            if !self.search_fields.is_empty() {
                let terms = search
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|t| !t.is_empty());
                for term in terms {
                    let any_field = self
                        .search_fields
                        .iter()
                        .map(|path| {
                            Filter::compare(*path, Op::IContains, SqlValue::Text(Some(term.to_string())))
                        })
                        .collect();
                    filter = filter.and(Filter::Or(any_field));
                }
            }
        }

        errors.into_result().map(|_| filter)
    }

    /// Requested ordering, falling back to the schema's
    pub fn ordering(&self, ctx: &RequestContext) -> Vec<OrderTerm> {
        let requested: Vec<OrderTerm> = ctx
            .param(ORDERING_PARAM)
            .map(|raw| raw.split(',').filter_map(|t| self.order_term(t.trim())).collect())
            .unwrap_or_default();
        if requested.is_empty() {
            query::default_ordering(self.schema)
        } else {
            requested
        }
    }

    fn order_term(&self, term: &str) -> Option<OrderTerm> {
        let (name, descending) = match term.strip_prefix('-') {
            Some(name) => (name, true),
            None => (term, false),
        };
        let field = self.serializer.field(name).filter(|f| f.is_readable())?;
        let column = match field.source {
            FieldSource::Column(column) => column.name,
            FieldSource::Relation(relation) => relation.fk_column()?,
            _ => return None,
        };
        Some(OrderTerm { column, descending })
    }
}
