//! Contests, managed by their owner, writers and testers

use crate::{
    factory::{FactoryError, FieldSpec, Resource, ResourceConfig},
    models::CONTEST,
    permissions::PermissionSpec,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::Plain("id"),
    FieldSpec::Plain("description"),
    FieldSpec::Plain("end_time"),
    FieldSpec::Plain("start_time"),
    FieldSpec::Plain("title"),
    FieldSpec::Plain("user"),
    FieldSpec::Plain("writers"),
    FieldSpec::Plain("testers"),
    FieldSpec::nested("writers_detail", "writers", &["username", "first_name", "last_name"]),
];

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("contest", &CONTEST)
        .fields(FIELDS)
        .auto_user_field("user")
        .read_only(&["user"])
        .permissions(vec![
            PermissionSpec::IsOwnerOrReadOnly(&["user", "writers", "testers"]),
            PermissionSpec::IsAuthenticatedOrReadOnly,
        ])
        .filter_fields(&["user", "writers", "testers"])
        .search_fields(&["title"])
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        factory::{Action, Filter, RequestContext, SqlValue, WriteMode},
        middleware::auth::AuthenticatedUser,
    };

    #[test]
    fn test_writers_and_testers_are_writable() {
        let contests = resource().unwrap();
        let serializer = contests.serializer();
        assert!(serializer.field("writers").unwrap().is_writable());
        assert!(serializer.field("writers_detail").unwrap().read_only);

        let data = serializer
            .validate(
                &json!({"title": "Round 1", "writers": [2, 3, 2], "testers": []}),
                WriteMode::Create,
                Some(1),
            )
            .unwrap();
        let links: Vec<(&str, Vec<i64>)> = data.links().iter().map(|(r, ids)| (r.name, ids.clone())).collect();
        assert!(links.contains(&("writers", vec![2, 3])));
        assert!(links.contains(&("testers", vec![])));
        assert_eq!(data.int("user_id"), Some(1));
    }

    #[test]
    fn test_writers_may_edit() {
        let contests = resource().unwrap();
        let ctx = RequestContext::new(
            Action::Update,
            Some(AuthenticatedUser {
                id: 7,
                username: "writer".to_string(),
            }),
        );
        let filters: Vec<Filter> = contests
            .permissions()
            .iter()
            .filter_map(|p| p.object_filter(&ctx))
            .collect();
        assert_eq!(
            filters,
            vec![Filter::Or(vec![
                Filter::eq("user", SqlValue::Int(Some(7))),
                Filter::eq("writers", SqlValue::Int(Some(7))),
                Filter::eq("testers", SqlValue::Int(Some(7))),
            ])]
        );
    }
}
