//! Cheap-to-clone, immutable string type used throughout the crate wherever a
//! `String` would otherwise be cloned onto the hot authorization/authentication
//! path (instance name components, scope labels, header names).
//!
//! Backed by `arcstr::ArcStr`: clone is a refcount bump, not an allocation.

pub type Strng = arcstr::ArcStr;

/// Build a [`Strng`] from anything that's already cheaply convertible.
pub fn new(s: impl Into<Strng>) -> Strng {
	s.into()
}
