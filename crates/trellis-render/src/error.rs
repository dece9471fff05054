//! Render error types.

use thiserror::Error;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while building, patching, hydrating or serializing a tree.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum RenderError {
	/// A component body returned an error.
	#[error("component '{component}' failed: {message}")]
	Component {
		/// Component name.
		component: String,
		/// Error message.
		message: String,
	},

	/// Two siblings in one render pass share a key.
	#[error("duplicate key among siblings: {key}")]
	DuplicateKey {
		/// The repeated key.
		key: String,
	},

	/// Existing markup did not match the tree being hydrated (strict mode only).
	#[error("hydration mismatch at {path}: expected {expected}, found {found}")]
	HydrationMismatch {
		/// Child index path from the container.
		path: String,
		/// What the description asked for.
		expected: String,
		/// What the existing tree had.
		found: String,
	},

	/// The root was unmounted.
	#[error("root is not mounted")]
	NotMounted,
}

impl RenderError {
	/// Error raised by the component named `component`.
	///
	/// # Example
	///
	/// ```ignore
	/// let profile = Component::new("Profile", |props| {
	///     let id = props.value("id").ok_or_else(|| RenderError::component("Profile", "missing id"))?;
	///     Ok(View::text(format!("user {id}")))
	/// });
	/// ```
	pub fn component(component: impl Into<String>, message: impl core::fmt::Display) -> Self {
		Self::Component {
			component: component.into(),
			message: message.to_string(),
		}
	}
}
