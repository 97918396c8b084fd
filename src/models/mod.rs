//! Domain models
//!
//! Static table descriptions for every entity, plus the few row types
//! that are read outside the resource layer.

pub mod comment;
pub mod contest;
pub mod problem;
pub mod submission;
pub mod test_case;
pub mod tutorial;
pub mod user;
pub mod user_profile;

pub use comment::*;
pub use contest::*;
pub use problem::*;
pub use submission::*;
pub use test_case::*;
pub use tutorial::*;
pub use user::*;
pub use user_profile::*;

use crate::factory::schema::Schema;

/// Every described table
pub static ALL: &[&Schema] = &[
    &USER,
    &USER_PROFILE,
    &PROBLEM,
    &CONTEST,
    &CONTEST_PROBLEM,
    &TEST_CASE,
    &SUBMISSION,
    &TUTORIAL,
    &COMMENT,
];

/// Find a schema by table name
pub fn lookup(table: &str) -> Option<&'static Schema> {
    ALL.iter().copied().find(|s| s.table == table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::schema::RelationKind;

    #[test]
    fn test_every_relation_target_is_described() {
        for schema in ALL {
            for relation in schema.relations {
                assert!(
                    lookup(relation.target).is_some(),
                    "{}.{} points at unknown table {}",
                    schema.table,
                    relation.name,
                    relation.target
                );
            }
        }
    }

    #[test]
    fn test_one_to_many_columns_exist_on_target() {
        for schema in ALL {
            for relation in schema.relations {
                if let RelationKind::OneToMany { column } = relation.kind {
                    let target = lookup(relation.target).unwrap();
                    assert!(
                        target.relations.iter().any(|r| r.fk_column() == Some(column)),
                        "{}.{} expects {}.{}",
                        schema.table,
                        relation.name,
                        target.table,
                        column
                    );
                }
            }
        }
    }

    #[test]
    fn test_default_orderings_name_columns() {
        for schema in ALL {
            for term in schema.ordering {
                let name = term.trim_start_matches('-');
                assert!(schema.column(name).is_some(), "{} orders by {}", schema.table, name);
            }
        }
    }
}
