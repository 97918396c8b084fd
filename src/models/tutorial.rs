//! Tutorial model

use crate::{
    constants::MAX_TITLE_LENGTH,
    factory::schema::{Column, Relation, Schema},
};

/// Editorials attached to a contest or a problem
pub static TUTORIAL: Schema = Schema {
    name: "tutorial",
    table: "tutorials",
    columns: &[
        Column::id(),
        Column::varchar("title", MAX_TITLE_LENGTH),
        Column::text("text"),
        Column::datetime("hidden_till").with_default(),
        Column::datetime("created_at").auto(),
    ],
    relations: &[
        Relation::foreign_key("contest", "contests", "contest_id").nullable(),
        Relation::foreign_key("problem", "problems", "problem_id").nullable(),
        Relation::foreign_key("user", "users", "user_id"),
        Relation::one_to_many("comment_set", "comments", "tutorial_id"),
    ],
    ordering: &["-created_at"],
};
