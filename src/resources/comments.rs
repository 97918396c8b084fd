//! Threaded comments

use crate::{
    factory::{FactoryError, FieldSpec, Resource, ResourceConfig},
    models::COMMENT,
    permissions::PermissionSpec,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::Plain("id"),
    FieldSpec::Plain("text"),
    FieldSpec::Plain("parent"),
    FieldSpec::Plain("problem"),
    FieldSpec::Plain("tutorial"),
    FieldSpec::Plain("user"),
    FieldSpec::Plain("created_at"),
    FieldSpec::nested("replies", "comment_set", &["id", "text", "user", "created_at"]),
];

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("comment", &COMMENT)
        .fields(FIELDS)
        .auto_user_field("user")
        .read_only(&["user"])
        .permissions(vec![
            PermissionSpec::IsAuthenticatedOrReadOnly,
            PermissionSpec::IsOwnerOrReadOnly(&["user"]),
        ])
        .filter_fields(&["problem", "tutorial", "parent"])
        .build()
}
