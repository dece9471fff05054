//! Rendering engine context.
//!
//! An [`Engine`] bundles the reactive [`Runtime`], the user directive
//! registry and the options, and is handed to every render operation. There
//! is no ambient engine: two engines are fully independent.
//!
//! ```ignore
//! let engine = Engine::new();
//! let count = Signal::new(engine.runtime(), 0);
//!
//! let container = Node::element("div");
//! let c = count.clone();
//! let root = engine.create_root(&container, move || {
//!     View::element("p").reactive("data-count", {
//!         let c = c.clone();
//!         move || c.get()
//!     })
//! })?;
//!
//! count.set(1);
//! engine.flush();
//! ```

use core::cell::RefCell;
use std::rc::{Rc, Weak};

use trellis_reactive::{Context, Runtime, Signal};

use crate::directive::{DirectiveHooks, DirectiveRegistry};
use crate::dom::Node;
use crate::error::{RenderError, RenderResult};
use crate::options::EngineOptions;
use crate::root::{self, Root};
use crate::ssr::{self, RenderStream};
use crate::view::{IntoRender, View};

/// Where errors raised by re-running consumers go.
#[derive(Clone)]
pub(crate) enum ErrorSink {
	/// Nearest boundary; setting the signal switches it to its fallback
	Boundary(Signal<Option<RenderError>>),
	/// Root handle, read back with [`Root::take_error`]
	Root(Rc<RefCell<Option<RenderError>>>),
}

struct EngineInner {
	runtime: Runtime,
	directives: DirectiveRegistry,
	options: EngineOptions,
	error_sink: Context<ErrorSink>,
}

/// Handle to a rendering engine. Clones share the engine.
#[derive(Clone)]
pub struct Engine {
	inner: Rc<EngineInner>,
}

#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
	pub(crate) fn upgrade(&self) -> Option<Engine> {
		self.0.upgrade().map(|inner| Engine { inner })
	}
}

impl Engine {
	pub fn new() -> Self {
		Self::with_options(EngineOptions::default())
	}

	pub fn with_options(options: EngineOptions) -> Self {
		Self {
			inner: Rc::new(EngineInner {
				runtime: Runtime::with_options(options.runtime.clone()),
				directives: DirectiveRegistry::new(),
				options,
				error_sink: Context::new(),
			}),
		}
	}

	/// The reactive runtime signals for this engine must be created on.
	pub fn runtime(&self) -> &Runtime {
		&self.inner.runtime
	}

	pub fn options(&self) -> &EngineOptions {
		&self.inner.options
	}

	pub(crate) fn downgrade(&self) -> WeakEngine {
		WeakEngine(Rc::downgrade(&self.inner))
	}

	pub fn directives(&self) -> &DirectiveRegistry {
		&self.inner.directives
	}

	pub(crate) fn error_sink(&self) -> &Context<ErrorSink> {
		&self.inner.error_sink
	}

	/// Register a user directive. The last registration of a name wins.
	pub fn register_directive(&self, name: &str, hooks: DirectiveHooks) {
		self.inner.directives.register(name, hooks);
	}

	/// Run pending updates until the tree settles.
	pub fn flush(&self) -> usize {
		self.inner.runtime.run_until_idle()
	}

	/// Mount the view produced by `build_fn` into `container`.
	pub fn create_root<F, R>(&self, container: &Node, build_fn: F) -> RenderResult<Root>
	where
		F: Fn() -> R + 'static,
		R: IntoRender,
	{
		root::create_root(self, container, build_fn)
	}

	/// Mount a tree driven by external state: `read_state` is tracked,
	/// `build_tree` renders from its result.
	pub fn create_reactive_root<S, R>(
		&self,
		container: &Node,
		read_state: impl Fn() -> S + 'static,
		build_tree: impl Fn(&S) -> R + 'static,
	) -> RenderResult<Root>
	where
		R: IntoRender,
	{
		root::create_reactive_root(self, container, read_state, build_tree)
	}

	/// Adopt the markup already in `container` as the output of `build_fn`.
	pub fn hydrate<F, R>(&self, container: &Node, build_fn: F) -> RenderResult<Root>
	where
		F: Fn() -> R + 'static,
		R: IntoRender,
	{
		crate::hydration::hydrate(self, container, build_fn)
	}

	/// Serialize the view produced by `build_fn` to HTML.
	pub fn render_to_string<R: IntoRender>(&self, build_fn: impl FnOnce() -> R) -> RenderResult<String> {
		ssr::render_to_string(self, build_fn)
	}

	/// Serialize the view produced by `build_fn` lazily, in chunks.
	pub fn render_to_stream<R: IntoRender>(&self, build_fn: impl FnOnce() -> R) -> RenderStream {
		ssr::render_to_stream(self, build_fn)
	}

	/// Route an error raised outside of construction to the nearest handler.
	pub(crate) fn report(&self, error: RenderError) {
		match self.runtime().use_context(self.error_sink()) {
			Some(ErrorSink::Boundary(failure)) => {
				tracing::debug!(%error, "error routed to boundary");
				failure.set(Some(error));
			}
			Some(ErrorSink::Root(slot)) => {
				tracing::error!(%error, "unhandled render error");
				*slot.borrow_mut() = Some(error);
			}
			None => tracing::error!(%error, "unhandled render error outside of any root"),
		}
	}

	/// Build a description into a detached node, without a root.
	///
	/// The node's bindings stay live until [`Engine::unmount`] is called on it.
	pub fn mount(&self, view: &View) -> RenderResult<Node> {
		let item = crate::expand::expand_output(view.clone());
		crate::build::build_item(self, &item, crate::build::Flags::default(), None).map(|built| built.node)
	}

	/// Tear down a node built by the engine: bindings stop, directives and
	/// unmount callbacks run bottom-up, then the node is detached.
	pub fn unmount(&self, node: &Node) {
		crate::patch::unmount_node(node);
	}
}

impl Default for Engine {
	fn default() -> Self {
		Self::new()
	}
}

impl core::fmt::Debug for Engine {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Engine")
			.field("runtime", &self.inner.runtime)
			.field("directives", &self.inner.directives)
			.field("options", &self.inner.options)
			.finish()
	}
}
