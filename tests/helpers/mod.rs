#![allow(unused_imports)]
#![allow(dead_code)]
pub mod test_db;
pub mod reset_helpers;

pub use test_db::*;
pub use reset_helpers::*;
