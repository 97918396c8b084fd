//! Problems, with an owner view and the solver/tester scopes

use crate::{
    constants::{verdicts, MIN_PROBLEM_DIFFICULTY},
    error::FieldErrors,
    factory::{
        FactoryError, FieldSpec, Filter, Op, RequestContext, Resource, ResourceConfig,
        ResourceHooks, SqlValue, WriteSet,
    },
    models::PROBLEM,
    permissions::PermissionSpec,
};

/// Query flag: only problems the caller has not solved yet
pub const UNSOLVED_PROBLEMS: &str = "unsolved_problems";

/// Query flag: problems of upcoming contests the caller writes or tests
pub const TEST_PROBLEMS: &str = "test_problems";

const TEST_CASES: FieldSpec = FieldSpec::nested("test_cases", "testcase_set", &["inputs", "output"]);

const PUBLIC_FIELDS: &[FieldSpec] = &[
    FieldSpec::Plain("id"),
    FieldSpec::Plain("description"),
    FieldSpec::Plain("difficulty"),
    FieldSpec::Plain("example_number"),
    FieldSpec::Plain("input_terms"),
    FieldSpec::Plain("memory_limit"),
    FieldSpec::Plain("notice"),
    FieldSpec::Plain("output_terms"),
    FieldSpec::Plain("time_limit"),
    FieldSpec::Plain("title"),
    FieldSpec::Plain("user"),
    TEST_CASES,
];

const OWNER_FIELDS: &[FieldSpec] = &[
    FieldSpec::Plain("id"),
    FieldSpec::Plain("correct_code"),
    FieldSpec::Plain("correct_lang"),
    FieldSpec::Plain("description"),
    FieldSpec::Plain("difficulty"),
    FieldSpec::Plain("example_number"),
    FieldSpec::Plain("hidden_till"),
    FieldSpec::Plain("input_terms"),
    FieldSpec::Plain("memory_limit"),
    FieldSpec::Plain("notice"),
    FieldSpec::Plain("output_terms"),
    FieldSpec::Plain("time_limit"),
    FieldSpec::Plain("title"),
    FieldSpec::Plain("user"),
    FieldSpec::Plain("created_at"),
    TEST_CASES,
];

pub fn resource() -> Result<Resource, FactoryError> {
    ResourceConfig::new("problem", &PROBLEM)
        .fields(PUBLIC_FIELDS)
        .owner_fields(OWNER_FIELDS)
        .auto_user_field("user")
        .read_only(&["user"])
        .permissions(vec![
            PermissionSpec::IsAuthenticatedOrReadOnly,
            PermissionSpec::IsOwnerOrReadOnly(&["user"]),
        ])
        .filter_fields(&["user", "submission__verdict", "submission__user"])
        .search_fields(&["title"])
        .hooks(ProblemHooks)
        .build()
}

struct ProblemHooks;

impl ResourceHooks for ProblemHooks {
    fn validate(&self, _ctx: &RequestContext, data: &mut WriteSet) -> Result<(), FieldErrors> {
        match data.int("difficulty") {
            Some(difficulty) if difficulty < MIN_PROBLEM_DIFFICULTY => Err(FieldErrors::single(
                "difficulty",
                format!("Difficulty must be greater than {MIN_PROBLEM_DIFFICULTY}"),
            )),
            _ => Ok(()),
        }
    }

    fn scope(&self, ctx: &RequestContext) -> Filter {
        let now = SqlValue::Timestamp(Some(ctx.now));

        if ctx.flag(UNSOLVED_PROBLEMS) {
            let released = Filter::compare("hidden_till", Op::Lt, now);
            return match ctx.user_id() {
                Some(id) => Filter::negate(Filter::related(
                    "submission",
                    vec![
                        Filter::eq("verdict", SqlValue::Text(Some(verdicts::ACCEPTED.to_string()))),
                        Filter::eq("user", SqlValue::Int(Some(id))),
                    ],
                ))
                .and(released),
                None => released,
            };
        }

        if ctx.flag(TEST_PROBLEMS) {
            let Some(id) = ctx.user_id() else {
                return Filter::Never;
            };
            return Filter::related(
                "contest",
                vec![
                    Filter::Or(vec![
                        Filter::eq("writers", SqlValue::Int(Some(id))),
                        Filter::eq("testers", SqlValue::Int(Some(id))),
                    ]),
                    Filter::compare("start_time", Op::Gt, now),
                ],
            );
        }

        Filter::All
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::{
        factory::{Action, WriteMode},
        middleware::auth::AuthenticatedUser,
    };

    fn ctx(user: Option<i64>, flag: Option<&str>) -> RequestContext {
        let user = user.map(|id| AuthenticatedUser {
            id,
            username: format!("user{id}"),
        });
        let params: HashMap<String, String> = flag
            .into_iter()
            .map(|f| (f.to_string(), "1".to_string()))
            .collect();
        RequestContext::new(Action::List, user).with_params(params)
    }

    #[test]
    fn test_owner_sees_more_fields() {
        let problems = resource().unwrap();
        assert!(problems.serializer().field("correct_code").is_none());
        assert!(problems.serializer().field("hidden_till").is_none());
        let owner = problems.owner_serializer().unwrap();
        assert!(owner.field("correct_code").is_some());
        assert!(owner.field("user").unwrap().read_only);
        assert!(owner.field("test_cases").unwrap().read_only);
    }

    #[test]
    fn test_low_difficulty_rejected() {
        let problems = resource().unwrap();
        let owner = problems.owner_serializer().unwrap();
        let body = json!({
            "title": "Two Sum",
            "description": "d",
            "input_terms": "i",
            "output_terms": "o",
            "difficulty": 300,
        });
        let mut data = owner.validate(&body, WriteMode::Create, Some(1)).unwrap();
        assert_eq!(data.int("user_id"), Some(1));

        let errors = problems.hooks().validate(&ctx(Some(1), None), &mut data).unwrap_err();
        assert_eq!(
            errors.get("difficulty"),
            Some(&["Difficulty must be greater than 500".to_string()][..])
        );

        let mut data = owner
            .validate(&json!({"difficulty": 500}), WriteMode::PartialUpdate, Some(1))
            .unwrap();
        assert!(problems.hooks().validate(&ctx(Some(1), None), &mut data).is_ok());
    }

    #[test]
    fn test_scopes() {
        let hooks = ProblemHooks;
        assert_eq!(hooks.scope(&ctx(Some(1), None)), Filter::All);
        assert_eq!(hooks.scope(&ctx(None, Some(TEST_PROBLEMS))), Filter::Never);

        let anonymous = ctx(None, Some(UNSOLVED_PROBLEMS));
        assert!(matches!(
            hooks.scope(&anonymous),
            Filter::Compare { op: Op::Lt, ref path, .. } if path == "hidden_till"
        ));

        match hooks.scope(&ctx(Some(3), Some(UNSOLVED_PROBLEMS))) {
            Filter::And(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(terms[0], Filter::Not(_)));
            }
            other => panic!("unexpected scope {other:?}"),
        }

        assert!(matches!(
            hooks.scope(&ctx(Some(3), Some(TEST_PROBLEMS))),
            Filter::Related { relation: "contest", .. }
        ));
    }

    #[test]
    fn test_filters_declared() {
        let problems = resource().unwrap();
        let mut params = HashMap::new();
        params.insert("submission__verdict".to_string(), "AC".to_string());
        let ctx = RequestContext::new(Action::List, None).with_params(params);
        assert_eq!(
            problems.list_filter(&ctx).unwrap(),
            Filter::eq("submission__verdict", SqlValue::Text(Some("AC".to_string())))
        );
    }
}
