//! Engine configuration.
//!
//! All option structs deserialize with defaults for missing fields, so hosts
//! can load them from JSON/TOML:
//!
//! ```ignore
//! let options: EngineOptions = serde_json::from_str(r#"{
//!     "ssr": { "chunk_size": 1024 },
//!     "hydration": { "strict": true }
//! }"#)?;
//! let engine = Engine::with_options(options);
//! ```

use serde::Deserialize;
use trellis_reactive::RuntimeOptions;

/// Options for HTML serialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SsrOptions {
	/// Cache serialized attributes of nodes without reactive bindings.
	pub cache_static_attributes: bool,
	/// Approximate size in bytes of the chunks yielded by a render stream.
	pub chunk_size: usize,
}

impl Default for SsrOptions {
	fn default() -> Self {
		Self {
			cache_static_attributes: true,
			chunk_size: 8 * 1024,
		}
	}
}

impl SsrOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Disables the static attribute cache.
	pub fn no_attribute_cache(mut self) -> Self {
		self.cache_static_attributes = false;
		self
	}

	/// Sets the stream chunk size.
	pub fn chunk_size(mut self, bytes: usize) -> Self {
		self.chunk_size = bytes.max(1);
		self
	}
}

/// Options for hydration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HydrationOptions {
	/// Fail with [`RenderError::HydrationMismatch`](crate::RenderError::HydrationMismatch)
	/// instead of rebuilding the mismatched part.
	pub strict: bool,
}

impl HydrationOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn strict(mut self) -> Self {
		self.strict = true;
		self
	}
}

/// Top-level engine options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
	pub runtime: RuntimeOptions,
	pub ssr: SsrOptions,
	pub hydration: HydrationOptions,
}

impl EngineOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn runtime(mut self, runtime: RuntimeOptions) -> Self {
		self.runtime = runtime;
		self
	}

	pub fn ssr(mut self, ssr: SsrOptions) -> Self {
		self.ssr = ssr;
		self
	}

	pub fn hydration(mut self, hydration: HydrationOptions) -> Self {
		self.hydration = hydration;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let options = EngineOptions::default();
		assert!(options.ssr.cache_static_attributes);
		assert_eq!(options.ssr.chunk_size, 8192);
		assert!(!options.hydration.strict);
	}

	#[rstest]
	fn test_builder() {
		let options = EngineOptions::new()
			.ssr(SsrOptions::new().no_attribute_cache().chunk_size(0))
			.hydration(HydrationOptions::new().strict());

		assert!(!options.ssr.cache_static_attributes);
		assert_eq!(options.ssr.chunk_size, 1);
		assert!(options.hydration.strict);
	}

	#[rstest]
	fn test_deserialize_partial() {
		let options: EngineOptions =
			serde_json::from_str(r#"{"ssr": {"chunk_size": 64}, "runtime": {"max_flush_rounds": 8}}"#)
				.unwrap();

		assert_eq!(options.ssr.chunk_size, 64);
		assert!(options.ssr.cache_static_attributes);
		assert_eq!(options.runtime.max_flush_rounds, 8);
		assert_eq!(options.hydration, HydrationOptions::default());
	}
}
