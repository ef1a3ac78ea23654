//! Validated instance names and the prefix trie used by
//! [`crate::authorizer::StaticAuthorizer`] to answer `instanceNamePrefix`
//! configs.

use std::collections::HashMap;
use std::fmt;

use authguard_core::Strng;
use thiserror::Error;

/// A validated, ordered sequence of path-safe components.
///
/// Two instance names are equal iff their component sequences are equal.
/// The empty sequence is permitted and denotes the root scope. Components
/// are `Strng` (cheap-clone `ArcStr`) rather than `String`: instance names
/// are cloned routinely on the hot authorize path (once per candidate name
/// fed into each `AnyAuthorizer` sub-authorizer call).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InstanceName {
	components: Vec<Strng>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstanceNameError {
	#[error("instance name component must not be empty")]
	EmptyComponent,
	#[error("instance name component {0:?} contains a disallowed character")]
	DisallowedCharacter(String),
}

impl InstanceName {
	pub const ROOT: InstanceName = InstanceName { components: Vec::new() };

	/// Parse a slash-separated instance name, validating every component.
	pub fn parse(s: &str) -> Result<Self, InstanceNameError> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		let components = s
			.split('/')
			.map(|c| validate_component(c).map(Strng::from))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(InstanceName { components })
	}

	pub fn components(&self) -> &[Strng] {
		&self.components
	}

	pub fn is_root(&self) -> bool {
		self.components.is_empty()
	}
}

fn validate_component(c: &str) -> Result<&str, InstanceNameError> {
	if c.is_empty() {
		return Err(InstanceNameError::EmptyComponent);
	}
	if c == "." || c == ".." {
		return Err(InstanceNameError::DisallowedCharacter(c.to_string()));
	}
	if c.as_bytes().contains(&0) {
		return Err(InstanceNameError::DisallowedCharacter(c.to_string()));
	}
	Ok(c)
}

impl fmt::Display for InstanceName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, component) in self.components.iter().enumerate() {
			if i > 0 {
				write!(f, "/")?;
			}
			write!(f, "{component}")?;
		}
		Ok(())
	}
}

/// A trie keyed on instance-name components, used to answer "is this name
/// under one of the configured prefixes" queries in O(components) time.
#[derive(Debug, Default)]
pub struct InstanceNameTrie {
	root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
	set: bool,
	children: HashMap<Strng, TrieNode>,
}

impl InstanceNameTrie {
	pub fn new() -> Self {
		Self::default()
	}

	/// Mark `name` (and everything under it) as matched.
	pub fn set(&mut self, name: &InstanceName) {
		let mut node = &mut self.root;
		for component in &name.components {
			node = node.children.entry(component.clone()).or_default();
		}
		node.set = true;
	}

	/// True iff `name` or any ancestor of `name` has been [`set`](Self::set).
	pub fn contains_prefix(&self, name: &InstanceName) -> bool {
		let mut node = &self.root;
		if node.set {
			return true;
		}
		for component in &name.components {
			match node.children.get(component) {
				Some(next) => {
					node = next;
					if node.set {
						return true;
					}
				}
				None => return false,
			}
		}
		false
	}
}
