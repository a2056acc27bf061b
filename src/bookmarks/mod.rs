//! Bookmarks
//!
//! Storage, permission-checked mutations and listing views for saved URLs.
//!
//! - [`Bookmarks`] is the query layer over the `bookmarks` and
//!   `pinned_bookmarks` tables.
//! - [`BookmarkBoard`] is what a single request works against: it loads the
//!   bookmarks and language stats visible to a [`Caller`](crate::identity::Caller),
//!   enforces ownership and admin rules on every mutation, and re-fetches
//!   after each one.
//!
//! ```rust,ignore
//! let mut board = BookmarkBoard::load(&db, &caller, Scope::language(Language::De)).await?;
//! board.add(input).await?;
//! let stats = board.stats();
//! ```

mod board;
mod handler;
mod lib;
mod routes;

pub use board::*;
pub use lib::*;
pub use routes::routes;
