//! Domain entities and their derived, read-only helpers.
//!
//! Each entity carries the helpers that only need its own fields plus whatever
//! collaborators (URL generator, media managers, stores) the caller passes in.

mod collection;
mod comment;
mod media_entry;
mod user;

pub use collection::{Collection, CollectionItem};
pub use comment::MediaComment;
pub use media_entry::{MediaEntry, MediaState};
pub use user::{RegistrationForm, User};
