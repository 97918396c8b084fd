//! Contest model

use crate::{
    constants::{MAX_PROBLEM_CHAR_LENGTH, MAX_TITLE_LENGTH},
    factory::schema::{Column, Relation, Schema},
};

/// Contests with their writers, testers and problem set
pub static CONTEST: Schema = Schema {
    name: "contest",
    table: "contests",
    columns: &[
        Column::id(),
        Column::varchar("title", MAX_TITLE_LENGTH).unique(),
        Column::text("description").nullable().blank(),
        Column::datetime("start_time").with_default(),
        Column::datetime("end_time").with_default(),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("user", "users", "user_id").nullable(),
        Relation::many_to_many("writers", "users", "contest_writers", "contest_id", "user_id").nullable(),
        Relation::many_to_many("testers", "users", "contest_testers", "contest_id", "user_id").nullable(),
        Relation::many_to_many("problems", "problems", "contest_problems", "contest_id", "problem_id").through(),
        Relation::one_to_many("contestproblem_set", "contest_problems", "contest_id"),
        Relation::one_to_many("submission_set", "submissions", "contest_id"),
        Relation::one_to_many("tutorial_set", "tutorials", "contest_id"),
    ],
    ordering: &["-start_time"],
};

/// Link between a contest and one of its problems
pub static CONTEST_PROBLEM: Schema = Schema {
    name: "contest problem",
    table: "contest_problems",
    columns: &[
        Column::id(),
        Column::varchar("problem_char", MAX_PROBLEM_CHAR_LENGTH).with_default(),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("contest", "contests", "contest_id"),
        Relation::foreign_key("problem", "problems", "problem_id"),
    ],
    ordering: &["problem_char"],
};
