//! The plugin surface: containers and filters.
//!
//! Containers substitute a surrogate representation for chosen types;
//! filters adjust which members participate, veto serializability, or patch
//! freshly allocated instances. Both are registered as ordered lists on
//! [`SessionParams`](crate::SessionParams); there is no implicit discovery.

mod container;
mod filter;

pub use container::{Container, first_applicable};
pub use filter::FilterSet;
