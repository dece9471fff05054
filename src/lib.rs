//! # Trellis
//!
//! A fine-grained reactive view engine.
//!
//! Trellis keeps a tree of nodes in sync with immutable view descriptions.
//! Reactive values read while rendering are tracked, and only the bindings
//! that read a changed value are re-run. The same descriptions render to
//! HTML on the server and hydrate back into live trees on the client.
//!
//! ## Crates
//!
//! - [`reactive`]: scheduler, signals, memos, effects and scopes
//! - [`render`]: descriptions, construction, keyed patching, directives,
//!   hydration and server-side rendering
//!
//! ## Feature Flags
//!
//! - `render` (default) - Reconciliation engine, hydration and serialization
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! let engine = Engine::new();
//! let todos = Signal::new(engine.runtime(), vec!["write docs".to_string()]);
//!
//! let container = Node::element("div");
//! let t = todos.clone();
//! let root = engine.create_root(&container, move || {
//!     let items = t.get();
//!     el("ul").children(items.into_iter().map(|todo| el("li").key(todo.clone()).child(todo)))
//! })?;
//!
//! todos.update(|todos| todos.push("ship".to_string()));
//! engine.flush();
//!
//! let html = engine.render_to_string(|| el("p").child("static page"))?;
//! ```

pub mod reactive;
#[cfg(feature = "render")]
pub mod render;

pub use trellis_reactive::{Context, Effect, Memo, Runtime, RuntimeOptions, Scope, Signal};

#[cfg(feature = "render")]
pub use trellis_render::{
	Component, Engine, EngineOptions, IntoView, Key, Node, RenderError, RenderResult, Root, View, el, fragment, text,
};

/// Common imports.
pub mod prelude {
	pub use trellis_reactive::{Context, Effect, Memo, Runtime, Scope, Signal};

	#[cfg(feature = "render")]
	pub use trellis_render::{
		AttrValue, Child, Component, DirectiveHooks, Engine, EngineOptions, Event, IntoRender, IntoView, Key, Model,
		Node, Props, RenderError, RenderResult, Repeat, Root, Value, View, ViewBuilder, component, dynamic, each, el,
		fragment, text,
	};
}
