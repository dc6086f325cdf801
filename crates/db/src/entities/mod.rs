//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounts;
pub mod entries;
pub mod transfers;
