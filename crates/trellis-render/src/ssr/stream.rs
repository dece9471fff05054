//! Chunked HTML output.

use trellis_reactive::{Runtime, Scope};

use crate::error::{RenderError, RenderResult};
use crate::ssr::renderer::Renderer;

/// Lazily serialized HTML, yielded in chunks of roughly
/// [`SsrOptions::chunk_size`](crate::SsrOptions::chunk_size) bytes.
///
/// Work happens as the stream is polled. Component bodies run untracked
/// inside a scope that is disposed once the stream ends or is dropped. After
/// an error the stream yields nothing more.
///
/// ```ignore
/// let mut response = Vec::new();
/// for chunk in engine.render_to_stream(|| app()) {
///     response.extend_from_slice(chunk?.as_bytes());
/// }
/// ```
pub struct RenderStream {
	renderer: Option<Renderer>,
	runtime: Runtime,
	scope: Scope,
	buffer: String,
	chunk_size: usize,
	pending: Option<RenderError>,
}

impl RenderStream {
	pub(crate) fn new(runtime: Runtime, scope: Scope, renderer: RenderResult<Renderer>, chunk_size: usize) -> Self {
		let (renderer, pending) = match renderer {
			Ok(renderer) => (Some(renderer), None),
			Err(error) => (None, Some(error)),
		};
		Self {
			renderer,
			runtime,
			scope,
			buffer: String::new(),
			chunk_size: chunk_size.max(1),
			pending,
		}
	}

	/// Whether the stream has nothing more to yield.
	pub fn is_finished(&self) -> bool {
		self.renderer.is_none() && self.pending.is_none() && self.buffer.is_empty()
	}

	fn close(&mut self) {
		// the renderer holds context guards; release them before the scope goes
		self.renderer = None;
		if !self.scope.is_disposed() {
			self.scope.dispose();
		}
	}
}

impl Iterator for RenderStream {
	type Item = RenderResult<String>;

	fn next(&mut self) -> Option<Self::Item> {
		if let Some(error) = self.pending.take() {
			self.close();
			return Some(Err(error));
		}
		let Some(mut renderer) = self.renderer.take() else {
			return (!self.buffer.is_empty()).then(|| Ok(core::mem::take(&mut self.buffer)));
		};

		let (runtime, buffer, chunk_size) = (&self.runtime, &mut self.buffer, self.chunk_size);
		let outcome = self.scope.run(|| {
			runtime.untrack(|| -> RenderResult<bool> {
				while buffer.len() < chunk_size {
					if !renderer.step(buffer)? {
						return Ok(false);
					}
				}
				Ok(true)
			})
		});

		match outcome {
			Ok(true) => {
				self.renderer = Some(renderer);
				Some(Ok(core::mem::take(&mut self.buffer)))
			}
			Ok(false) => {
				drop(renderer);
				self.close();
				(!self.buffer.is_empty()).then(|| Ok(core::mem::take(&mut self.buffer)))
			}
			Err(error) => {
				tracing::debug!(%error, "html stream failed");
				drop(renderer);
				self.close();
				self.buffer.clear();
				Some(Err(error))
			}
		}
	}
}

impl Drop for RenderStream {
	fn drop(&mut self) {
		self.close();
	}
}

impl core::fmt::Debug for RenderStream {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("RenderStream")
			.field("chunk_size", &self.chunk_size)
			.field("buffered", &self.buffer.len())
			.field("finished", &self.is_finished())
			.finish()
	}
}
