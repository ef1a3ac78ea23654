//! Small ambient-stack crate shared by the rest of the workspace: a cheap-clone
//! string alias, a `tracing` subscriber bootstrap, and the odd generic helper
//! that doesn't deserve its own crate.

pub mod bow;
pub mod logging;
pub mod prelude;
pub mod strng;

pub use bow::OwnedOrBorrowed;
pub use strng::Strng;
