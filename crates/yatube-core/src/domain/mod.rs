//! Domain entities - the core business objects.

mod group;
mod post;
mod user;

pub use group::Group;
pub use post::{POST_PREVIEW_CHARS, Post, PostView};
pub use user::User;
