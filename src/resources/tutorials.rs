//! Editorials attached to problems or contests

use crate::{
    factory::{FactoryError, Resource, ResourceConfig},
    models::TUTORIAL,
    permissions::PermissionSpec,
};

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("tutorial", &TUTORIAL)
        .auto_user_field("user")
        .read_only(&["user"])
        .permissions(vec![
            PermissionSpec::IsAuthenticatedOrReadOnly,
            PermissionSpec::IsOwnerOrReadOnly(&["user"]),
        ])
        .filter_fields(&["contest", "problem", "user"])
        .search_fields(&["title"])
        .build()
}
