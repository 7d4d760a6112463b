//! `SeaORM` entities mirroring the tables created by the `migration` crate.

pub mod prelude;

pub mod todo_item;
