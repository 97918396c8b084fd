//! Static table descriptions
//!
//! Every entity exposed through a resource is described once by a `Schema`:
//! its columns, its relations to other tables and its default ordering.
//! Resource declarations are validated against these descriptions at
//! startup, and all generated SQL only ever interpolates identifiers taken
//! from them.

use crate::models;

/// Storage and validation kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Auto-increment primary key
    Id,
    Text { max_length: Option<usize> },
    Email { max_length: usize },
    Integer,
    Boolean,
    DateTime,
    Date,
    Choice(&'static [&'static str]),
}

/// A plain (non-relational) column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub blank: bool,
    pub has_default: bool,
    pub unique: bool,
    /// Set by the database, never accepted from clients
    pub auto: bool,
    /// Never rendered in a representation
    pub secret: bool,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            blank: false,
            has_default: false,
            unique: false,
            auto: false,
            secret: false,
        }
    }

    pub const fn id() -> Self {
        Self::new("id", ColumnKind::Id).auto()
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Text { max_length: None })
    }

    pub const fn varchar(name: &'static str, max_length: usize) -> Self {
        Self::new(name, ColumnKind::Text { max_length: Some(max_length) })
    }

    pub const fn email(name: &'static str, max_length: usize) -> Self {
        Self::new(name, ColumnKind::Email { max_length })
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Boolean)
    }

    pub const fn datetime(name: &'static str) -> Self {
        Self::new(name, ColumnKind::DateTime)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Date)
    }

    pub const fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(name, ColumnKind::Choice(choices))
    }

    pub const fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    /// Accepts empty strings; the table defaults the column to `''`
    pub const fn blank(self) -> Self {
        Self { blank: true, has_default: true, ..self }
    }

    pub const fn with_default(self) -> Self {
        Self { has_default: true, ..self }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    pub const fn auto(self) -> Self {
        Self { auto: true, has_default: true, ..self }
    }

    pub const fn secret(self) -> Self {
        Self { secret: true, ..self }
    }

    /// Must be present on create and full update unless overridden
    pub fn is_required(&self) -> bool {
        !(self.nullable || self.blank || self.has_default || self.auto)
    }
}

/// How a relation is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// This table holds `column` referencing `target.id`
    ForeignKey { column: &'static str },
    /// Link rows in `join_table`; `source_column` references this table
    ManyToMany {
        join_table: &'static str,
        source_column: &'static str,
        target_column: &'static str,
        /// Links are rows of an entity with its own resource
        through: bool,
        /// Declared on the other side
        reverse: bool,
    },
    /// `target.column` references this table
    OneToMany { column: &'static str },
}

/// A named relation to another table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    /// Table name of the related schema
    pub target: &'static str,
    pub kind: RelationKind,
    pub nullable: bool,
    pub unique: bool,
}

impl Relation {
    pub const fn foreign_key(name: &'static str, target: &'static str, column: &'static str) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::ForeignKey { column },
            nullable: false,
            unique: false,
        }
    }

    pub const fn many_to_many(
        name: &'static str,
        target: &'static str,
        join_table: &'static str,
        source_column: &'static str,
        target_column: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::ManyToMany {
                join_table,
                source_column,
                target_column,
                through: false,
                reverse: false,
            },
            nullable: true,
            unique: false,
        }
    }

    pub const fn reverse_many_to_many(
        name: &'static str,
        target: &'static str,
        join_table: &'static str,
        source_column: &'static str,
        target_column: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::ManyToMany {
                join_table,
                source_column,
                target_column,
                through: true,
                reverse: true,
            },
            nullable: true,
            unique: false,
        }
    }

    pub const fn one_to_many(name: &'static str, target: &'static str, column: &'static str) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::OneToMany { column },
            nullable: true,
            unique: false,
        }
    }

    pub const fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    /// Mark a many-to-many as mediated by an entity of its own
    pub const fn through(self) -> Self {
        match self.kind {
            RelationKind::ManyToMany {
                join_table,
                source_column,
                target_column,
                reverse,
                ..
            } => Self {
                kind: RelationKind::ManyToMany {
                    join_table,
                    source_column,
                    target_column,
                    through: true,
                    reverse,
                },
                ..self
            },
            _ => self,
        }
    }

    pub fn is_to_many(&self) -> bool {
        !matches!(self.kind, RelationKind::ForeignKey { .. })
    }

    /// Declared on this table (foreign keys and forward many-to-many)
    pub fn is_forward(&self) -> bool {
        match self.kind {
            RelationKind::ForeignKey { .. } => true,
            RelationKind::ManyToMany { reverse, .. } => !reverse,
            RelationKind::OneToMany { .. } => false,
        }
    }

    /// Column holding the id for foreign keys
    pub fn fk_column(&self) -> Option<&'static str> {
        match self.kind {
            RelationKind::ForeignKey { column } => Some(column),
            _ => None,
        }
    }

    pub fn target_schema(&self) -> Option<&'static Schema> {
        models::lookup(self.target)
    }
}

/// Table description
#[derive(Debug)]
pub struct Schema {
    /// Model label used in messages ("problem")
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [Column],
    pub relations: &'static [Relation],
    /// Default ordering, `-` prefix for descending
    pub ordering: &'static [&'static str],
}

/// A schema member addressed by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Column(&'static Column),
    Relation(&'static Relation),
}

impl Schema {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn member(&self, name: &str) -> Option<Member> {
        self.column(name)
            .map(Member::Column)
            .or_else(|| self.relation(name).map(Member::Relation))
    }

    /// Names serialized when no field list is declared
    pub fn default_field_names(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .map(|c| c.name)
            .chain(self.relations.iter().filter(|r| r.is_forward()).map(|r| r.name))
            .collect()
    }
}

/// Result of walking a `relation__relation__member` path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Relations crossed before the final member
    pub hops: Vec<&'static Relation>,
    pub end: Member,
}

impl ResolvedPath {
    /// True when every hop points at a single row
    pub fn is_single_valued(&self) -> bool {
        self.hops.iter().all(|r| !r.is_to_many())
    }

    /// Column kind at the end of the path; relations compare by id
    pub fn end_kind(&self) -> ColumnKind {
        match self.end {
            Member::Column(c) => c.kind,
            Member::Relation(_) => ColumnKind::Id,
        }
    }
}

/// Why a path could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    UnknownMember { table: &'static str, name: String },
    NotARelation { table: &'static str, name: String },
    UnknownTarget { target: &'static str },
}

/// Walk a path such as `submission__user` starting at `schema`
pub fn resolve_path(schema: &'static Schema, path: &str) -> Result<ResolvedPath, PathError> {
    let segments: Vec<&str> = path.split("__").collect();
    let mut current = schema;
    let mut hops = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if last {
            let end = current.member(segment).ok_or_else(|| PathError::UnknownMember {
                table: current.table,
                name: segment.to_string(),
            })?;
            return Ok(ResolvedPath { hops, end });
        }

        let relation = match current.member(segment) {
            Some(Member::Relation(r)) => r,
            Some(Member::Column(_)) => {
                return Err(PathError::NotARelation {
                    table: current.table,
                    name: segment.to_string(),
                });
            }
            None => {
                return Err(PathError::UnknownMember {
                    table: current.table,
                    name: segment.to_string(),
                });
            }
        };
        current = relation
            .target_schema()
            .ok_or(PathError::UnknownTarget { target: relation.target })?;
        hops.push(relation);
    }

    Err(PathError::UnknownMember {
        table: schema.table,
        name: path.to_string(),
    })
}
