//! Submission model

use crate::{
    constants::{MAX_VERDICT_LENGTH, languages},
    factory::schema::{Column, Relation, Schema},
};

/// Submitted source code and its stored verdict
pub static SUBMISSION: Schema = Schema {
    name: "submission",
    table: "submissions",
    columns: &[
        Column::id(),
        Column::text("code"),
        Column::choice("language", languages::ALL),
        Column::varchar("verdict", MAX_VERDICT_LENGTH).with_default(),
        Column::text("details").nullable().blank(),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("problem", "problems", "problem_id"),
        Relation::foreign_key("contest", "contests", "contest_id").nullable(),
        Relation::foreign_key("user", "users", "user_id"),
    ],
    ordering: &["-created_at"],
};
