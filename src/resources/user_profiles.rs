//! Profile of the signed-in account

use crate::{
    factory::{Action, FactoryError, ObjectLookup, Resource, ResourceConfig},
    models::USER_PROFILE,
    permissions::PermissionSpec,
};

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("user-profile", &USER_PROFILE)
        .auto_user_field("user")
        .read_only(&["user"])
        .permissions(vec![
            PermissionSpec::IsAuthenticated,
            PermissionSpec::IsOwnerOrReadOnly(&["user"]),
        ])
        .disable(&[Action::List])
        .lookup(ObjectLookup::OwnedBy("user"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_declaration() {
        let profiles = resource().unwrap();
        assert!(!profiles.is_enabled(Action::List));
        assert!(profiles.is_enabled(Action::Retrieve));
        assert_eq!(profiles.lookup(), ObjectLookup::OwnedBy("user"));
        assert!(profiles.serializer().field("user").unwrap().read_only);
    }
}
