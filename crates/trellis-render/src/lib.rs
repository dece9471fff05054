//! # trellis-render
//!
//! Reconciliation engine for trellis.
//!
//! Takes immutable [`View`] descriptions and keeps a tree of live [`Node`]s
//! in sync with them:
//!
//! - **Construction**: descriptions become nodes; every reactive attribute,
//!   conditional, list and dynamic child is bound to its own consumer
//! - **Reconciliation**: re-renders patch nodes in place, keyed siblings
//!   move instead of being rebuilt
//! - **Directives**: built-ins (`t-if`, `t-for`, `t-show`, `t-model`, ...)
//!   and user directives with lifecycle hooks
//! - **Hydration**: adopt server-rendered markup instead of rebuilding it
//! - **SSR**: serialize descriptions to HTML, in one go or as a stream
//! - **Error boundaries**: a failing subtree renders a fallback instead
//!
//! ## Example
//!
//! ```ignore
//! use trellis_render::{Engine, Node, View, Signal};
//!
//! let engine = Engine::new();
//! let count = Signal::new(engine.runtime(), 0);
//!
//! let container = Node::element("div");
//! let c = count.clone();
//! let root = engine.create_root(&container, move || {
//!     let c = c.clone();
//!     View::element("button")
//!         .on("click", { let c = c.clone(); move |_| c.update(|n| *n += 1) })
//!         .dynamic(move || c.get().to_string())
//! })?;
//!
//! container.child(0).unwrap().dispatch_event(&Event::new("click"));
//! engine.flush();
//! assert_eq!(container.inner_html(), "<button><t-slot data-slot=\"dyn\">1</t-slot></button>");
//! ```
//!
//! ## Slots
//!
//! Content that can change shape on its own (dynamic children, `t-if`
//! chains, fragment-hosted `t-for` lists, fragments returned by components,
//! error boundaries) is wrapped in a `<t-slot data-slot="...">` element, both
//! in live trees and in serialized HTML. Each description item therefore
//! maps to exactly one node.

mod build;
mod expand;
mod meta;
mod patch;

pub mod directive;
pub mod dom;
pub mod engine;
pub mod error;
pub mod html;
pub mod hydration;
pub mod options;
pub mod root;
pub mod ssr;
pub mod view;

pub use directive::{DirectiveBinding, DirectiveHooks, DirectiveName, DirectiveRegistry};
pub use dom::{Event, EventHandler, Namespace, Node, NodeType, WeakNode};
pub use engine::Engine;
pub use error::{RenderError, RenderResult};
pub use options::{EngineOptions, HydrationOptions, SsrOptions};
pub use root::Root;
pub use ssr::RenderStream;
pub use view::{
	AttrValue, Attributes, Child, Component, DynamicChild, IntoRender, IntoView, Key, Kind, Model, Props, Repeat, Value,
	View, ViewBuilder, component, dynamic, each, el, fragment, h, text,
};

pub use trellis_reactive::{Context, Effect, Memo, Runtime, RuntimeOptions, Scope, Signal};
