//! # campus-forum
//!
//! The threaded Q&A engine of the campus portal.
//!
//! [`Forum`] is the only entry point that mutates forum state.  Every
//! operation runs as one transaction against the store: the caller's
//! identity and block status, the global lock and the target entities are
//! read inside that transaction, the [`authority`] module decides whether
//! the action is allowed, and only then is anything written.

pub mod authority;
pub mod error;
pub mod forum;
pub mod principal;
pub mod view;

pub use error::ForumError;
pub use forum::{BlockState, Forum};
pub use principal::Principal;
pub use view::{ForumView, QueryView, ReplyView};
