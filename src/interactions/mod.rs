//! Likes and favorites.
//!
//! Both relations share one implementation keyed by [`Kind`]. Likes may be
//! recorded under an anonymous id; favorites need a signed-in user.

mod board;
mod handler;
mod lib;
mod routes;

pub use board::*;
pub use lib::*;
pub use routes::routes;
