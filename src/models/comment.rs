//! Comment model

use crate::factory::schema::{Column, Relation, Schema};

/// Threaded discussion on problems and tutorials
pub static COMMENT: Schema = Schema {
    name: "comment",
    table: "comments",
    columns: &[
        Column::id(),
        Column::text("text"),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("parent", "comments", "parent_id").nullable(),
        Relation::foreign_key("problem", "problems", "problem_id").nullable(),
        Relation::foreign_key("tutorial", "tutorials", "tutorial_id").nullable(),
        Relation::foreign_key("user", "users", "user_id").nullable(),
        Relation::one_to_many("comment_set", "comments", "parent_id"),
    ],
    ordering: &["-created_at"],
};
