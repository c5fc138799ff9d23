//! Operations with consistency rules of their own, written against the
//! repository traits in `crate::store`.

pub mod catalog;
pub mod ledger;
pub mod membership;
pub mod recipes;
pub mod shopping_list;
