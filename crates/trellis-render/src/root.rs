//! Root controller.
//!
//! A root owns one container and one render function. The function runs
//! inside a consumer: whatever reactive values it reads schedule a re-render,
//! and each re-render patches the previous output instead of rebuilding it.
//!
//! ```ignore
//! let todos = Signal::new(engine.runtime(), vec!["a".to_string()]);
//! let t = todos.clone();
//! let root = engine.create_reactive_root(&container, move || t.get(), |todos| {
//!     View::element("ul").children(todos.iter().map(|todo| View::element("li").key(todo.clone()).child(todo.clone())))
//! })?;
//!
//! todos.update(|todos| todos.push("b".to_string()));
//! engine.flush();
//!
//! root.unmount();
//! ```

use core::cell::RefCell;
use std::rc::Rc;

use tracing::instrument;
use trellis_reactive::{Effect, Scope, Signal};

use crate::build::{Flags, fill_children};
use crate::dom::Node;
use crate::engine::{Engine, ErrorSink};
use crate::error::{RenderError, RenderResult};
use crate::expand::{Expanded, expand_root};
use crate::patch::{patch_root, unmount_node};
use crate::view::{IntoRender, View};

/// How the first render treats the container's existing children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
	Build,
	Hydrate,
}

#[derive(Default)]
struct RootState {
	previous: Option<View>,
	expanded: Option<Expanded>,
	mounted: bool,
	/// Next render must not be skipped
	forced: bool,
}

struct RootInner {
	engine: Engine,
	container: Node,
	scope: Scope,
	trigger: Signal<u64>,
	effect: RefCell<Option<Effect>>,
	state: RefCell<RootState>,
	error: Rc<RefCell<Option<RenderError>>>,
}

/// Handle to a mounted tree. Clones refer to the same root.
///
/// The tree stays live until [`Root::unmount`], even if every handle is
/// dropped.
#[derive(Clone)]
#[must_use = "a root stays mounted until `unmount` is called"]
pub struct Root {
	inner: Rc<RootInner>,
}

/// Mount the view produced by `build_fn` into `container`.
///
/// Existing children of the container are replaced.
#[instrument(skip_all)]
pub fn create_root<F, R>(engine: &Engine, container: &Node, build_fn: F) -> RenderResult<Root>
where
	F: Fn() -> R + 'static,
	R: IntoRender,
{
	mount(engine, container, build_fn, Mode::Build)
}

/// Mount a tree rendered from external state.
///
/// `read_state` runs tracked on every render; `build_tree` gets its result.
#[instrument(skip_all)]
pub fn create_reactive_root<S, R>(
	engine: &Engine,
	container: &Node,
	read_state: impl Fn() -> S + 'static,
	build_tree: impl Fn(&S) -> R + 'static,
) -> RenderResult<Root>
where
	R: IntoRender,
{
	mount(engine, container, move || build_tree(&read_state()), Mode::Build)
}

pub(crate) fn mount<F, R>(engine: &Engine, container: &Node, build_fn: F, mode: Mode) -> RenderResult<Root>
where
	F: Fn() -> R + 'static,
	R: IntoRender,
{
	let rt = engine.runtime();
	let scope = rt.detached(|| Scope::new(rt));
	let inner = Rc::new(RootInner {
		engine: engine.clone(),
		container: container.clone(),
		scope: scope.clone(),
		trigger: Signal::new(rt, 0),
		effect: RefCell::new(None),
		state: RefCell::new(RootState::default()),
		error: Rc::default(),
	});
	if mode == Mode::Build {
		for child in container.children() {
			unmount_node(&child);
		}
	}

	let first_failure: Rc<RefCell<Option<RenderError>>> = Rc::default();
	let failure = first_failure.clone();
	let runner = inner.clone();
	let mut first = true;
	let effect = scope.run(|| {
		Effect::new(rt, move || {
			let initial = core::mem::replace(&mut first, false);
			let mode = if initial { mode } else { Mode::Build };
			if let Err(error) = runner.render(&build_fn, initial, mode) {
				if initial {
					*failure.borrow_mut() = Some(error);
				} else {
					tracing::error!(%error, "root render failed");
					*runner.error.borrow_mut() = Some(error);
				}
			}
		})
	});
	*inner.effect.borrow_mut() = Some(effect);

	let root = Root { inner };
	let error = first_failure.borrow_mut().take();
	match error {
		Some(error) => {
			root.unmount();
			Err(error)
		}
		None => {
			tracing::debug!(?mode, "root mounted");
			Ok(root)
		}
	}
}

impl RootInner {
	fn render<F, R>(&self, build_fn: &F, initial: bool, mode: Mode) -> RenderResult<()>
	where
		F: Fn() -> R,
		R: IntoRender,
	{
		self.trigger.get();
		let engine = &self.engine;
		let _sink = engine
			.runtime()
			.provide_context(engine.error_sink(), ErrorSink::Root(self.error.clone()));
		let view = build_fn().into_render()?;

		let forced = core::mem::take(&mut self.state.borrow_mut().forced);
		if !initial && !forced && self.unchanged(&view) {
			tracing::trace!("root output unchanged; skipping");
			return Ok(());
		}

		let next = expand_root(view.clone());
		let previous = self.state.borrow_mut().expanded.take();
		let result = match previous {
			Some(previous) if !initial => patch_root(engine, &self.container, &previous, &next),
			_ => fill_children(
				engine,
				&self.container,
				&next.items(),
				Flags::for_container(&self.container),
				mode == Mode::Hydrate,
			),
		};

		let mut state = self.state.borrow_mut();
		state.previous = Some(view);
		state.expanded = Some(next);
		state.mounted = true;
		result
	}

	/// Same description as last time, and the container still holds its output.
	fn unchanged(&self, view: &View) -> bool {
		let state = self.state.borrow();
		let same = state.previous.as_ref().is_some_and(|previous| previous.ptr_eq(view));
		let attached = state
			.expanded
			.as_ref()
			.is_some_and(|expanded| expanded.len() == self.container.child_count());
		same && attached
	}
}

impl Root {
	/// Render again even if nothing the render function reads has changed.
	///
	/// The render happens on the next flush.
	pub fn force_render(&self) -> RenderResult<()> {
		if !self.is_mounted() {
			return Err(RenderError::NotMounted);
		}
		self.inner.state.borrow_mut().forced = true;
		self.inner.trigger.update(|generation| *generation += 1);
		Ok(())
	}

	/// Stop rendering and unmount everything in the container. Idempotent.
	pub fn unmount(&self) {
		let effect = self.inner.effect.borrow_mut().take();
		let Some(effect) = effect else {
			return;
		};
		effect.dispose();
		self.inner.scope.dispose();
		for child in self.inner.container.children() {
			unmount_node(&child);
		}
		let mut state = self.inner.state.borrow_mut();
		state.previous = None;
		state.expanded = None;
		state.mounted = false;
		tracing::debug!("root unmounted");
	}

	pub fn is_mounted(&self) -> bool {
		self.inner.state.borrow().mounted && self.inner.effect.borrow().is_some()
	}

	pub fn container(&self) -> &Node {
		&self.inner.container
	}

	pub fn engine(&self) -> &Engine {
		&self.inner.engine
	}

	/// Take the last error raised by a re-render that no boundary handled.
	pub fn take_error(&self) -> Option<RenderError> {
		self.inner.error.borrow_mut().take()
	}
}

impl core::fmt::Debug for Root {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Root")
			.field("container", &self.inner.container)
			.field("mounted", &self.is_mounted())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::view::IntoView;
	use core::cell::Cell;
	use rstest::rstest;

	#[rstest]
	fn test_unmount_is_idempotent() {
		let engine = Engine::new();
		let container = Node::element("div");
		let root = create_root(&engine, &container, || View::text("a")).unwrap();

		root.unmount();
		root.unmount();

		assert!(!root.is_mounted());
		assert_eq!(container.child_count(), 0);
		assert_eq!(root.force_render(), Err(RenderError::NotMounted));
	}

	#[rstest]
	fn test_force_render_reinvokes_build_fn() {
		let engine = Engine::new();
		let container = Node::element("div");
		let calls = Rc::new(Cell::new(0));
		let c = calls.clone();
		let root = create_root(&engine, &container, move || {
			c.set(c.get() + 1);
			View::element("p").into_view()
		})
		.unwrap();

		root.force_render().unwrap();
		engine.flush();

		assert_eq!(calls.get(), 2);
		assert_eq!(container.inner_html(), "<p></p>");
	}

	#[rstest]
	fn test_first_render_error_is_returned() {
		let engine = Engine::new();
		let container = Node::element("div");

		let result = create_root(&engine, &container, || -> RenderResult<View> {
			Err(RenderError::component("App", "boom"))
		});

		assert_eq!(result.unwrap_err(), RenderError::component("App", "boom"));
		assert_eq!(engine.runtime().effect_count(), 0);
	}

	#[rstest]
	fn test_later_error_is_kept_on_root() {
		let engine = Engine::new();
		let container = Node::element("div");
		let fail = Signal::new(engine.runtime(), false);
		let f = fail.clone();
		let root = create_root(&engine, &container, move || -> RenderResult<View> {
			if f.get() {
				return Err(RenderError::component("App", "late"));
			}
			Ok(View::text("ok"))
		})
		.unwrap();

		fail.set(true);
		engine.flush();

		assert_eq!(root.take_error(), Some(RenderError::component("App", "late")));
		assert_eq!(container.inner_html(), "ok");
	}
}
