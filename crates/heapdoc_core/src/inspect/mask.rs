use glob::Pattern;

use crate::inspect::{InspectError, Result};

/// Shell-style type-name mask (`*`, `?`, `[...]`); an empty mask matches everything.
#[derive(Debug, Clone, Default)]
pub struct TypeMask {
	pattern: Option<Pattern>,
}

impl TypeMask {
	/// Compile `mask`.
	pub fn new(mask: &str) -> Result<Self> {
		let mask = mask.trim();
		if mask.is_empty() || mask == "*" {
			return Ok(Self::default());
		}

		let pattern = Pattern::new(mask).map_err(|err| InspectError::InvalidMask {
			mask: mask.to_owned(),
			reason: err.to_string(),
		})?;
		Ok(Self { pattern: Some(pattern) })
	}

	/// Whether `name` matches.
	pub fn matches(&self, name: &str) -> bool {
		self.pattern.as_ref().is_none_or(|pattern| pattern.matches(name))
	}
}
