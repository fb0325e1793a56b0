//! Database repositories
//!
//! One repository per entity. Repositories whose entities carry slugs also
//! implement `SlugLookup` so slug generation can check collisions per owner.

pub mod collection;
pub mod media_entry;
pub mod user;

pub use collection::CollectionRepository;
pub use media_entry::MediaEntryRepository;
pub use user::{NewUser, UserRepository, UserStore};
