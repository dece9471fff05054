//! Server-side rendering.
//!
//! Serializes a description to HTML without building live nodes. The output
//! is exactly what a live tree built from the same description serializes to,
//! so a client can [hydrate](crate::Engine::hydrate) it:
//!
//! ```ignore
//! let html = engine.render_to_string(|| app())?;
//!
//! // on the client
//! container.set_inner_html(&html);
//! let root = engine.hydrate(&container, || app())?;
//! ```

mod renderer;
mod stream;

pub use stream::RenderStream;

use tracing::instrument;
use trellis_reactive::Scope;

use crate::engine::Engine;
use crate::error::RenderResult;
use crate::expand::expand_root;
use crate::view::IntoRender;

use self::renderer::Renderer;

/// Serialize the view produced by `build_fn` in one go.
#[instrument(skip_all)]
pub fn render_to_string<R: IntoRender>(engine: &Engine, build_fn: impl FnOnce() -> R) -> RenderResult<String> {
	let chunks = render_to_stream(engine, build_fn).collect::<RenderResult<Vec<String>>>()?;
	Ok(chunks.concat())
}

/// Serialize the view produced by `build_fn` lazily.
///
/// `build_fn` itself runs right away; everything below it runs as the
/// stream is polled.
pub fn render_to_stream<R: IntoRender>(engine: &Engine, build_fn: impl FnOnce() -> R) -> RenderStream {
	let rt = engine.runtime();
	let scope = rt.detached(|| Scope::new(rt));
	let renderer = scope.run(|| rt.untrack(|| build_fn().into_render())).map(|view| {
		let items = expand_root(view).items();
		Renderer::new(engine.clone(), items)
	});
	RenderStream::new(rt.clone(), scope, renderer, engine.options().ssr.chunk_size)
}
