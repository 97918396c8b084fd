//! Composable access rules for resources
//!
//! A permission answers two questions: may this caller attempt the action at
//! all (`has_permission`), and which condition must the stored object
//! satisfy (`object_filter`). Object conditions are expressed as filters so
//! ownership through foreign keys and many-to-many relations is decided by
//! the database in one query.
//!
//! A resource's permission list must pass as a whole; `AnyOf` relaxes that
//! for a group of rules.

use std::{fmt, sync::Arc};

use crate::factory::{
    FactoryError,
    context::RequestContext,
    query::Filter,
    schema::{Member, Schema, resolve_path},
    value::SqlValue,
};

/// Condition a referenced parent row must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct ParentFilter {
    /// Foreign key relation on the resource's schema
    pub relation: &'static str,
    /// Evaluated against the parent's schema
    pub filter: Filter,
}

/// An access rule
pub trait Permission: Send + Sync + fmt::Debug {
    /// Checked before anything is loaded
    fn has_permission(&self, _ctx: &RequestContext) -> bool {
        true
    }

    /// Condition on the target object for detail actions; `None` always passes
    fn object_filter(&self, _ctx: &RequestContext) -> Option<Filter> {
        None
    }

    /// Condition on the parent a payload points at, for create and update
    fn parent_filter(&self, _ctx: &RequestContext) -> Option<ParentFilter> {
        None
    }
}

/// Shared handle to a built permission
pub type BoxedPermission = Arc<dyn Permission>;

#[derive(Debug, Clone, Copy)]
pub struct AllowAny;

impl Permission for AllowAny {}

#[derive(Debug, Clone, Copy)]
pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, ctx: &RequestContext) -> bool {
        ctx.is_authenticated()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IsAuthenticatedOrReadOnly;

impl Permission for IsAuthenticatedOrReadOnly {
    fn has_permission(&self, ctx: &RequestContext) -> bool {
        ctx.action.is_safe() || ctx.is_authenticated()
    }
}

/// Writes need the caller to be referenced by one of `owner_fields`
#[derive(Debug, Clone)]
pub struct IsOwnerOrReadOnly {
    owner_fields: Vec<String>,
}

impl IsOwnerOrReadOnly {
    pub fn new<I, S>(owner_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owner_fields: owner_fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Permission for IsOwnerOrReadOnly {
    fn object_filter(&self, ctx: &RequestContext) -> Option<Filter> {
        if ctx.action.is_safe() {
            return None;
        }
        Some(owned_by(&self.owner_fields, ctx.user_id()))
    }
}

/// The parent a record hangs off must be owned by the caller
#[derive(Debug, Clone)]
pub struct IsParentOwner {
    parent: &'static str,
    owner_fields: Vec<String>,
}

impl IsParentOwner {
    pub fn new<I, S>(parent: &'static str, owner_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parent,
            owner_fields: owner_fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Permission for IsParentOwner {
    fn object_filter(&self, ctx: &RequestContext) -> Option<Filter> {
        if ctx.action.is_safe() {
            return None;
        }
        let paths: Vec<String> = self
            .owner_fields
            .iter()
            .map(|f| format!("{}__{}", self.parent, f))
            .collect();
        Some(owned_by(&paths, ctx.user_id()))
    }

    fn parent_filter(&self, ctx: &RequestContext) -> Option<ParentFilter> {
        if ctx.action.is_safe() {
            return None;
        }
        Some(ParentFilter {
            relation: self.parent,
            filter: owned_by(&self.owner_fields, ctx.user_id()),
        })
    }
}

/// Passes when any member passes
#[derive(Debug, Clone)]
pub struct AnyOf(pub Vec<BoxedPermission>);

impl Permission for AnyOf {
    fn has_permission(&self, ctx: &RequestContext) -> bool {
        self.0.iter().any(|p| p.has_permission(ctx))
    }

    fn object_filter(&self, ctx: &RequestContext) -> Option<Filter> {
        let mut alternatives = Vec::with_capacity(self.0.len());
        for permission in self.0.iter().filter(|p| p.has_permission(ctx)) {
            alternatives.push(permission.object_filter(ctx)?);
        }
        Some(Filter::Or(alternatives))
    }

    fn parent_filter(&self, ctx: &RequestContext) -> Option<ParentFilter> {
        let mut relation = None;
        let mut alternatives = Vec::with_capacity(self.0.len());
        for permission in self.0.iter().filter(|p| p.has_permission(ctx)) {
            let parent = permission.parent_filter(ctx)?;
            match relation {
                Some(r) if r != parent.relation => return None,
                _ => relation = Some(parent.relation),
            }
            alternatives.push(parent.filter);
        }
        relation.map(|relation| ParentFilter {
            relation,
            filter: Filter::Or(alternatives),
        })
    }
}

/// Caller equals or is contained in one of `paths`; anonymous callers own nothing
fn owned_by(paths: &[String], user_id: Option<i64>) -> Filter {
    match user_id {
        Some(id) => Filter::Or(
            paths
                .iter()
                .map(|p| Filter::eq(p.as_str(), SqlValue::Int(Some(id))))
                .collect(),
        ),
        None => Filter::Never,
    }
}

/// Permission as declared on a resource, checked against its schema at build time
#[derive(Debug, Clone)]
pub enum PermissionSpec {
    AllowAny,
    IsAuthenticated,
    IsAuthenticatedOrReadOnly,
    IsOwnerOrReadOnly(&'static [&'static str]),
    IsParentOwner {
        parent: &'static str,
        owner_fields: &'static [&'static str],
    },
    AnyOf(Vec<PermissionSpec>),
    Custom(BoxedPermission),
}

impl PermissionSpec {
    pub fn build(&self, resource: &'static str, schema: &'static Schema) -> Result<BoxedPermission, FactoryError> {
        let permission: BoxedPermission = match self {
            Self::AllowAny => Arc::new(AllowAny),
            Self::IsAuthenticated => Arc::new(IsAuthenticated),
            Self::IsAuthenticatedOrReadOnly => Arc::new(IsAuthenticatedOrReadOnly),
            Self::IsOwnerOrReadOnly(fields) => {
                check_owner_paths(resource, schema, fields.iter().copied())?;
                Arc::new(IsOwnerOrReadOnly::new(fields.iter().copied()))
            }
            Self::IsParentOwner {
                parent,
                owner_fields,
            } => {
                let relation = schema.relation(parent).filter(|r| !r.is_to_many()).ok_or_else(|| {
                    FactoryError::InvalidPath {
                        resource,
                        path: parent.to_string(),
                        reason: "parent must be a foreign key".to_string(),
                    }
                })?;
                let target = relation.target_schema().ok_or_else(|| FactoryError::InvalidPath {
                    resource,
                    path: parent.to_string(),
                    reason: format!("unknown table {}", relation.target),
                })?;
                check_owner_paths(resource, target, owner_fields.iter().copied())?;
                Arc::new(IsParentOwner::new(*parent, owner_fields.iter().copied()))
            }
            Self::AnyOf(members) => {
                if members.is_empty() {
                    return Err(FactoryError::EmptyPermissionGroup { resource });
                }
                let built = members
                    .iter()
                    .map(|m| m.build(resource, schema))
                    .collect::<Result<Vec<_>, _>>()?;
                Arc::new(AnyOf(built))
            }
            Self::Custom(permission) => permission.clone(),
        };
        Ok(permission)
    }
}

/// Owner paths must end at a user reference or the primary key
fn check_owner_paths<'a>(
    resource: &'static str,
    schema: &'static Schema,
    paths: impl Iterator<Item = &'a str>,
) -> Result<(), FactoryError> {
    let mut any = false;
    for path in paths {
        any = true;
        let resolved = resolve_path(schema, path).map_err(|e| FactoryError::InvalidPath {
            resource,
            path: path.to_string(),
            reason: format!("{:?}", e),
        })?;
        let ok = match resolved.end {
            Member::Relation(relation) => relation.target == "users",
            Member::Column(column) => column.name == "id",
        };
        if !ok {
            return Err(FactoryError::InvalidPath {
                resource,
                path: path.to_string(),
                reason: "owner fields must reference a user".to_string(),
            });
        }
    }
    if any {
        Ok(())
    } else {
        Err(FactoryError::EmptyPermissionGroup { resource })
    }
}
