//! Test cases; immutable once written

use crate::{
    factory::{Action, FactoryError, FieldSpec, Resource, ResourceConfig},
    models::TEST_CASE,
    permissions::PermissionSpec,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::Plain("inputs"),
    FieldSpec::Plain("output"),
    FieldSpec::Plain("problem"),
    FieldSpec::related("problem_title", "problem__title"),
    FieldSpec::Plain("id"),
];

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("test-case", &TEST_CASE)
        .fields(FIELDS)
        .auto_user_field("user")
        .disable(&[Action::Update, Action::PartialUpdate])
        .permissions(vec![
            PermissionSpec::IsOwnerOrReadOnly(&["user"]),
            PermissionSpec::IsAuthenticatedOrReadOnly,
            PermissionSpec::IsParentOwner {
                parent: "problem",
                owner_fields: &["user"],
            },
        ])
        .filter_fields(&["problem"])
        .build()
}
