//! Field selection and per-field options

use std::collections::{BTreeMap, HashSet};

use crate::factory::{
    FactoryError,
    schema::{Column, Member, Relation, RelationKind, Schema, resolve_path},
};

/// A field as declared on a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    /// Column or forward relation of the entity
    Plain(&'static str),
    /// Read-only projection of a to-many relation through a restricted field list
    Nested {
        name: &'static str,
        relation: &'static str,
        fields: &'static [&'static str],
    },
    /// Read-only attribute reached through foreign keys (`problem__title`)
    Related {
        name: &'static str,
        path: &'static str,
    },
}

impl FieldSpec {
    pub const fn nested(
        name: &'static str,
        relation: &'static str,
        fields: &'static [&'static str],
    ) -> Self {
        Self::Nested { name, relation, fields }
    }

    pub const fn related(name: &'static str, path: &'static str) -> Self {
        Self::Related { name, path }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain(name) => name,
            Self::Nested { name, .. } | Self::Related { name, .. } => name,
        }
    }
}

impl From<&'static str> for FieldSpec {
    fn from(name: &'static str) -> Self {
        Self::Plain(name)
    }
}

/// Per-field overrides; `None` keeps what the schema implies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub required: Option<bool>,
    pub allow_null: Option<bool>,
}

impl FieldOptions {
    pub const fn read_only() -> Self {
        Self {
            read_only: Some(true),
            write_only: None,
            required: None,
            allow_null: None,
        }
    }

    pub const fn write_only() -> Self {
        Self {
            read_only: None,
            write_only: Some(true),
            required: None,
            allow_null: None,
        }
    }

    pub const fn required(self, required: bool) -> Self {
        Self { required: Some(required), ..self }
    }

    pub const fn allow_null(self, allow_null: bool) -> Self {
        Self { allow_null: Some(allow_null), ..self }
    }

    /// Options set in `other` win
    pub fn merge(self, other: FieldOptions) -> Self {
        Self {
            read_only: other.read_only.or(self.read_only),
            write_only: other.write_only.or(self.write_only),
            required: other.required.or(self.required),
            allow_null: other.allow_null.or(self.allow_null),
        }
    }
}

/// Where a resolved field reads from
#[derive(Debug, Clone)]
pub enum FieldSource {
    Column(&'static Column),
    Relation(&'static Relation),
    Nested {
        relation: &'static Relation,
        target: &'static Schema,
        fields: Vec<Field>,
    },
    Related {
        hops: Vec<&'static Relation>,
        column: &'static Column,
    },
}

/// A field of a built serializer
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub source: FieldSource,
    pub read_only: bool,
    pub write_only: bool,
    pub required: bool,
    pub allow_null: bool,
}

impl Field {
    /// Field for a column or relation with flags implied by the schema
    pub fn from_member(name: &'static str, member: Member, depth: u8) -> Self {
        match member {
            Member::Column(column) => Self {
                name,
                source: FieldSource::Column(column),
                read_only: column.auto,
                write_only: false,
                required: column.is_required(),
                allow_null: column.nullable,
            },
            Member::Relation(relation) => {
                let writable = depth == 0
                    && match relation.kind {
                        RelationKind::ForeignKey { .. } => true,
                        RelationKind::ManyToMany { through, reverse, .. } => !through && !reverse,
                        RelationKind::OneToMany { .. } => false,
                    };
                Self {
                    name,
                    source: FieldSource::Relation(relation),
                    read_only: !writable,
                    write_only: false,
                    required: writable && !relation.nullable,
                    allow_null: relation.nullable && !relation.is_to_many(),
                }
            }
        }
    }

    fn read_only_source(name: &'static str, source: FieldSource) -> Self {
        Self {
            name,
            source,
            read_only: true,
            write_only: false,
            required: false,
            allow_null: true,
        }
    }

    /// Rendered in representations
    pub fn is_readable(&self) -> bool {
        match self.source {
            FieldSource::Column(column) => !self.write_only && !column.secret,
            _ => !self.write_only,
        }
    }

    pub fn is_writable(&self) -> bool {
        !self.read_only
    }

    /// Whether the field maps onto something the default writer can persist
    fn is_storable(&self) -> bool {
        match &self.source {
            FieldSource::Column(column) => !column.auto,
            FieldSource::Relation(relation) => match relation.kind {
                RelationKind::ForeignKey { .. } => true,
                RelationKind::ManyToMany { through, reverse, .. } => !through && !reverse,
                RelationKind::OneToMany { .. } => false,
            },
            FieldSource::Nested { .. } | FieldSource::Related { .. } => false,
        }
    }

    fn apply(&mut self, options: FieldOptions) {
        if let Some(read_only) = options.read_only {
            self.read_only = read_only;
        }
        if let Some(write_only) = options.write_only {
            self.write_only = write_only;
        }
        if let Some(allow_null) = options.allow_null {
            self.allow_null = allow_null;
        }
        if self.read_only {
            self.required = false;
        }
        if let Some(required) = options.required {
            self.required = required;
        }
    }
}

/// Fields rendered when a relation is expanded or no list is declared
pub fn default_fields(schema: &'static Schema, depth: u8) -> Vec<Field> {
    schema
        .default_field_names()
        .into_iter()
        .filter_map(|name| schema.member(name).map(|m| Field::from_member(name, m, depth)))
        .collect()
}

/// Effective field list of a resource
pub fn resolve_fields(
    resource: &'static str,
    schema: &'static Schema,
    fields: Option<&[FieldSpec]>,
    excluded: Option<&[&'static str]>,
    depth: u8,
) -> Result<Vec<Field>, FactoryError> {
    let allowed = schema.default_field_names();

    match (fields, excluded) {
        (Some(_), Some(_)) => Err(FactoryError::FieldsAndExclusion { resource }),
        (Some([]), None) | (None, Some([])) => Err(FactoryError::EmptyFieldList { resource }),
        (Some(specs), None) => {
            let mut seen = HashSet::new();
            let mut resolved = Vec::with_capacity(specs.len());
            for spec in specs {
                if !seen.insert(spec.name()) {
                    return Err(FactoryError::DuplicateField {
                        resource,
                        field: spec.name().to_string(),
                    });
                }
                resolved.push(resolve_spec(resource, schema, &allowed, spec, depth)?);
            }
            Ok(resolved)
        }
        (None, Some(excluded)) => {
            let mut seen = HashSet::new();
            for name in excluded {
                if !seen.insert(*name) {
                    return Err(FactoryError::DuplicateField {
                        resource,
                        field: name.to_string(),
                    });
                }
                if !allowed.contains(name) {
                    return Err(FactoryError::UnknownField {
                        resource,
                        field: name.to_string(),
                    });
                }
            }
            Ok(default_fields(schema, depth)
                .into_iter()
                .filter(|f| !excluded.contains(&f.name))
                .collect())
        }
        (None, None) => Ok(default_fields(schema, depth)),
    }
}

fn resolve_spec(
    resource: &'static str,
    schema: &'static Schema,
    allowed: &[&'static str],
    spec: &FieldSpec,
    depth: u8,
) -> Result<Field, FactoryError> {
    match *spec {
        FieldSpec::Plain(name) => {
            let member = schema
                .member(name)
                .filter(|_| allowed.contains(&name))
                .ok_or_else(|| FactoryError::UnknownField {
                    resource,
                    field: name.to_string(),
                })?;
            Ok(Field::from_member(name, member, depth))
        }
        FieldSpec::Nested {
            name,
            relation,
            fields,
        } => {
            let rel = schema.relation(relation).ok_or_else(|| FactoryError::UnknownField {
                resource,
                field: relation.to_string(),
            })?;
            if !rel.is_to_many() {
                return Err(FactoryError::NotToMany {
                    resource,
                    field: name,
                });
            }
            let target = rel.target_schema().ok_or_else(|| FactoryError::InvalidPath {
                resource,
                path: relation.to_string(),
                reason: format!("unknown table {}", rel.target),
            })?;
            if fields.is_empty() {
                return Err(FactoryError::EmptyFieldList { resource });
            }

            let target_allowed = target.default_field_names();
            let mut nested = Vec::with_capacity(fields.len());
            for field in fields {
                let member = target
                    .member(field)
                    .filter(|_| target_allowed.contains(field))
                    .ok_or_else(|| FactoryError::UnknownField {
                        resource,
                        field: format!("{}.{}", name, field),
                    })?;
                let mut f = Field::from_member(field, member, 0);
                f.read_only = true;
                nested.push(f);
            }

            Ok(Field::read_only_source(
                name,
                FieldSource::Nested {
                    relation: rel,
                    target,
                    fields: nested,
                },
            ))
        }
        FieldSpec::Related { name, path } => {
            let resolved = resolve_path(schema, path).map_err(|e| FactoryError::InvalidPath {
                resource,
                path: path.to_string(),
                reason: format!("{:?}", e),
            })?;
            let column = match resolved.end {
                Member::Column(column) if !column.secret => column,
                _ => {
                    return Err(FactoryError::InvalidPath {
                        resource,
                        path: path.to_string(),
                        reason: "must end at a plain column".to_string(),
                    });
                }
            };
            if resolved.hops.is_empty() || !resolved.is_single_valued() {
                return Err(FactoryError::InvalidPath {
                    resource,
                    path: path.to_string(),
                    reason: "must cross foreign keys only".to_string(),
                });
            }
            Ok(Field::read_only_source(
                name,
                FieldSource::Related {
                    hops: resolved.hops,
                    column,
                },
            ))
        }
    }
}

/// Write-only names folded into the explicit overrides
pub fn extra_kwargs(
    write_only_fields: &[&'static str],
    overrides: &BTreeMap<&'static str, FieldOptions>,
) -> BTreeMap<&'static str, FieldOptions> {
    let mut merged = overrides.clone();
    for name in write_only_fields {
        let entry = merged.entry(*name).or_default();
        entry.write_only = Some(true);
    }
    merged
}

/// Apply read-only names and overrides to a resolved field list
pub fn apply_options(
    resource: &'static str,
    fields: &mut [Field],
    read_only_fields: &[&'static str],
    kwargs: &BTreeMap<&'static str, FieldOptions>,
) -> Result<(), FactoryError> {
    let names: Vec<&'static str> = fields.iter().map(|f| f.name).collect();
    for name in read_only_fields.iter().chain(kwargs.keys()) {
        if !names.contains(name) {
            return Err(FactoryError::UnknownOptionField {
                resource,
                field: name.to_string(),
            });
        }
    }

    for field in fields.iter_mut() {
        let mut options = FieldOptions::default();
        if read_only_fields.contains(&field.name) {
            options.read_only = Some(true);
        }
        if let Some(explicit) = kwargs.get(field.name) {
            options = options.merge(*explicit);
        }

        let conflicting = options.read_only == Some(true) && options.write_only == Some(true)
            || options.read_only == Some(true) && options.required == Some(true)
            || options.read_only == Some(false) && !field.is_storable();
        if conflicting {
            return Err(FactoryError::OptionConflict {
                resource,
                field: field.name.to_string(),
            });
        }

        field.apply(options);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CONTEST, PROBLEM, TEST_CASE, USER};

    fn names(fields: &[Field]) -> Vec<&'static str> {
        fields.iter().map(|f| f.name).collect()
    }

    #[test]
    fn test_fields_and_exclusion_conflict() {
        let err = resolve_fields("problem", &PROBLEM, Some(&[FieldSpec::Plain("title")][..]), Some(&["notice"][..]), 0)
            .unwrap_err();
        assert!(matches!(err, FactoryError::FieldsAndExclusion { .. }));
    }

    #[test]
    fn test_empty_and_duplicate_lists_rejected() {
        assert!(matches!(
            resolve_fields("problem", &PROBLEM, Some(&[] as &[FieldSpec]), None, 0),
            Err(FactoryError::EmptyFieldList { .. })
        ));
        assert!(matches!(
            resolve_fields("problem", &PROBLEM, Some(&[FieldSpec::Plain("title"), FieldSpec::Plain("title")][..]), None, 0),
            Err(FactoryError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = resolve_fields("problem", &PROBLEM, Some(&[FieldSpec::Plain("rating")][..]), None, 0).unwrap_err();
        assert!(matches!(err, FactoryError::UnknownField { ref field, .. } if field == "rating"));

        // reverse relations are only reachable through nested fields
        assert!(resolve_fields("problem", &PROBLEM, Some(&[FieldSpec::Plain("testcase_set")][..]), None, 0).is_err());
    }

    #[test]
    fn test_exclusion_list() {
        let fields = resolve_fields("problem", &PROBLEM, None, Some(&["correct_code", "user"][..]), 0).unwrap();
        let names = names(&fields);
        assert!(names.contains(&"title"));
        assert!(!names.contains(&"correct_code"));
        assert!(!names.contains(&"user"));
    }

    #[test]
    fn test_nested_field_resolution() {
        let specs = [
            FieldSpec::Plain("title"),
            FieldSpec::nested("test_cases", "testcase_set", &["inputs", "output"]),
        ];
        let fields = resolve_fields("problem", &PROBLEM, Some(&specs[..]), None, 0).unwrap();
        let nested = &fields[1];
        assert!(nested.read_only);
        match &nested.source {
            FieldSource::Nested { target, fields, .. } => {
                assert_eq!(target.table, "test_cases");
                assert_eq!(names(fields), vec!["inputs", "output"]);
            }
            other => panic!("unexpected source {:?}", other),
        }

        let bad = [FieldSpec::nested("owner", "user", &["username"])];
        assert!(matches!(
            resolve_fields("problem", &PROBLEM, Some(&bad[..]), None, 0),
            Err(FactoryError::NotToMany { .. })
        ));

        let bad = [FieldSpec::nested("cases", "testcase_set", &["nope"])];
        assert!(matches!(
            resolve_fields("problem", &PROBLEM, Some(&bad[..]), None, 0),
            Err(FactoryError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_related_field_resolution() {
        let specs = [FieldSpec::related("problem_title", "problem__title")];
        let fields = resolve_fields("test-case", &TEST_CASE, Some(&specs[..]), None, 0).unwrap();
        assert!(matches!(fields[0].source, FieldSource::Related { ref hops, column } if hops.len() == 1 && column.name == "title"));

        let bad = [FieldSpec::related("writer_names", "writers__username")];
        assert!(resolve_fields("contest", &CONTEST, Some(&bad[..]), None, 0).is_err());
    }

    #[test]
    fn test_schema_implied_flags() {
        let fields = default_fields(&CONTEST, 0);
        let get = |name: &str| fields.iter().find(|f| f.name == name).unwrap();
        assert!(get("title").required);
        assert!(!get("description").required);
        assert!(get("created_at").read_only);
        assert!(get("writers").is_writable());
        assert!(!get("writers").required);
        assert!(get("problems").read_only);

        let expanded = default_fields(&CONTEST, 1);
        assert!(expanded.iter().find(|f| f.name == "user").unwrap().read_only);
    }

    #[test]
    fn test_write_only_merge_and_conflicts() {
        let mut overrides = BTreeMap::new();
        overrides.insert("password", FieldOptions::default().required(true));
        let kwargs = extra_kwargs(&["password"], &overrides);
        assert_eq!(
            kwargs["password"],
            FieldOptions {
                write_only: Some(true),
                required: Some(true),
                ..FieldOptions::default()
            }
        );

        let mut fields = resolve_fields(
            "user",
            &USER,
            Some(&[FieldSpec::Plain("username"), FieldSpec::Plain("password")][..]),
            None,
            0,
        )
        .unwrap();
        apply_options("user", &mut fields, &[], &kwargs).unwrap();
        assert!(fields[1].write_only);
        assert!(!fields[1].is_readable());

        let conflict = extra_kwargs(&["username"], &BTreeMap::new());
        assert!(matches!(
            apply_options("user", &mut fields, &["username"], &conflict),
            Err(FactoryError::OptionConflict { .. })
        ));
    }

    #[test]
    fn test_option_on_absent_field_rejected() {
        let mut fields = resolve_fields("user", &USER, Some(&[FieldSpec::Plain("username")][..]), None, 0).unwrap();
        let kwargs = extra_kwargs(&["password"], &BTreeMap::new());
        assert!(matches!(
            apply_options("user", &mut fields, &[], &kwargs),
            Err(FactoryError::UnknownOptionField { .. })
        ));
    }

    #[test]
    fn test_read_only_clears_required() {
        let mut fields = resolve_fields("problem", &PROBLEM, Some(&[FieldSpec::Plain("title"), FieldSpec::Plain("user")][..]), None, 0).unwrap();
        apply_options("problem", &mut fields, &["title"], &BTreeMap::new()).unwrap();
        assert!(fields[0].read_only);
        assert!(!fields[0].required);
    }
}
