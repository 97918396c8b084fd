//! Submissions; the verdict is set by the judge, never by the submitter

use crate::{
    factory::{Action, FactoryError, Resource, ResourceConfig},
    models::SUBMISSION,
    permissions::PermissionSpec,
};

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("submission", &SUBMISSION)
        .auto_user_field("user")
        .read_only(&["user", "verdict", "details"])
        .disable(&[Action::Update, Action::PartialUpdate])
        .permissions(vec![
            PermissionSpec::IsAuthenticatedOrReadOnly,
            PermissionSpec::IsOwnerOrReadOnly(&["user"]),
        ])
        .filter_fields(&["problem", "contest", "user", "verdict", "language"])
        .build()
}
