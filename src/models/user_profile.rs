//! User profile model

use crate::{
    constants::{MAX_BIO_LENGTH, MAX_LOCATION_LENGTH},
    factory::schema::{Column, Relation, Schema},
};

/// One profile per account
pub static USER_PROFILE: Schema = Schema {
    name: "user profile",
    table: "user_profiles",
    columns: &[
        Column::id(),
        Column::varchar("bio", MAX_BIO_LENGTH).blank(),
        Column::varchar("location", MAX_LOCATION_LENGTH).blank(),
        Column::date("birth_date").nullable(),
    ],
    relations: &[Relation::foreign_key("user", "users", "user_id").unique()],
    ordering: &["id"],
};
