//! Problem model

use crate::{
    constants::{MAX_TITLE_LENGTH, languages},
    factory::schema::{Column, Relation, Schema},
};

/// Problem statements with their limits and reference solution
pub static PROBLEM: Schema = Schema {
    name: "problem",
    table: "problems",
    columns: &[
        Column::id(),
        Column::varchar("title", MAX_TITLE_LENGTH).unique(),
        Column::text("description"),
        Column::text("input_terms"),
        Column::text("output_terms"),
        Column::text("notice").nullable().blank(),
        Column::integer("difficulty").with_default(),
        Column::integer("example_number").with_default(),
        Column::integer("time_limit").with_default(),
        Column::integer("memory_limit").with_default(),
        Column::datetime("hidden_till").with_default(),
        Column::text("correct_code").nullable().blank(),
        Column::choice("correct_lang", languages::ALL).nullable().blank(),
        Column::text("checker_function").nullable().blank(),
        Column::choice("checker_func_lang", languages::ALL).nullable().blank(),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("user", "users", "user_id").nullable(),
        Relation::one_to_many("testcase_set", "test_cases", "problem_id"),
        Relation::one_to_many("submission", "submissions", "problem_id"),
        Relation::reverse_many_to_many("contest", "contests", "contest_problems", "problem_id", "contest_id"),
        Relation::one_to_many("contestproblem_set", "contest_problems", "problem_id"),
        Relation::one_to_many("tutorial_set", "tutorials", "problem_id"),
        Relation::one_to_many("comment_set", "comments", "problem_id"),
    ],
    ordering: &["difficulty", "-created_at"],
};
