//! EMS Selection - bulk selection across pages
//!
//! One [`SelectionStore`] per list view: four mutations (select/deselect an
//! item, select/deselect everything on a page) and two queries (selected
//! count on a page, whether a page was fully selected).

#![warn(unreachable_pub)]

pub mod store;

pub use store::{PageNumber, SelectionStore};
