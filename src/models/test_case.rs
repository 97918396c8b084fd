//! Test case model

use crate::factory::schema::{Column, Relation, Schema};

/// Input/output pairs attached to a problem
pub static TEST_CASE: Schema = Schema {
    name: "test case",
    table: "test_cases",
    columns: &[
        Column::id(),
        Column::text("inputs"),
        Column::text("output").nullable().blank(),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("problem", "problems", "problem_id"),
        Relation::foreign_key("user", "users", "user_id").nullable(),
    ],
    ordering: &["created_at"],
};
