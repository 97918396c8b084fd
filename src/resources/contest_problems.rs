//! Problem set of a contest

use crate::{
    factory::{FactoryError, FieldSpec, Resource, ResourceConfig},
    models::CONTEST_PROBLEM,
    permissions::PermissionSpec,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::Plain("id"),
    FieldSpec::Plain("contest"),
    FieldSpec::Plain("problem"),
    FieldSpec::Plain("problem_char"),
    FieldSpec::related("problem_title", "problem__title"),
    FieldSpec::Plain("created_at"),
];

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("contest-problem", &CONTEST_PROBLEM)
        .fields(FIELDS)
        .permissions(vec![
            PermissionSpec::IsAuthenticatedOrReadOnly,
            PermissionSpec::IsParentOwner {
                parent: "contest",
                owner_fields: &["user", "writers"],
            },
        ])
        .filter_fields(&["contest", "problem"])
        .build()
}
