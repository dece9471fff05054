//! Node construction.
//!
//! Turns expanded [`Item`]s into live nodes. Every reactive piece of a node
//! (an attribute, `t-show`, `t-model`, a `t-for` list, the content of a slot)
//! gets its own detached consumer, stored on the node and disposed when the
//! node is unmounted. Component bodies run inside a scope stored on the node
//! they produced.
//!
//! When a `target` node is given (hydration), a compatible target is adopted
//! instead of creating a node: its attributes are rewritten from the
//! description and its children are hydrated in turn.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_reactive::{Effect, Scope, Signal};

use crate::directive::{self, Builtin, builtin, has_builtin, sync_directives};
use crate::dom::{Event, EventHandler, Namespace, Node};
use crate::engine::{Engine, ErrorSink};
use crate::error::{RenderError, RenderResult};
use crate::expand::{Item, expand_branch, expand_children, expand_output, expand_views, repeat_of};
use crate::html::{SLOT_ATTR, SLOT_TAG, toggle_display_none};
use crate::meta::{BoundaryState, SlotKind, SlotSource, SlotState};
use crate::patch::{reconcile_children, teardown, unmount_node};
use crate::view::{AttrValue, Child, Component, ComponentBody, FallbackFn, Key, Kind, Model, Repeat, Value, View};

/// Inherited construction state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Flags {
	/// Inside a `t-once` subtree
	pub(crate) frozen: bool,
	/// Namespace new elements are created in
	pub(crate) ns: Namespace,
}

impl Flags {
	/// Flags for the children of `container`.
	pub(crate) fn for_container(container: &Node) -> Self {
		let ns = container.namespace().unwrap_or_default();
		let tag = container.tag_name().unwrap_or_default();
		Self {
			frozen: false,
			ns: ns.for_children_of(&tag),
		}
	}
}

pub(crate) struct Built {
	pub(crate) node: Node,
	/// The hydration target was adopted
	pub(crate) reused: bool,
}

/// Where a node's description came from.
pub(crate) struct Origin {
	/// Component layers (and fragment hosts) above the node's own description
	pub(crate) lineage: Vec<View>,
	pub(crate) key: Option<Key>,
	pub(crate) scope: Option<Scope>,
}

impl Origin {
	pub(crate) fn of(item: &Item) -> Self {
		Self {
			lineage: Vec::new(),
			key: item.key().cloned(),
			scope: None,
		}
	}

	fn attach(self, node: &Node, frozen: bool) {
		let mut meta = node.meta_mut();
		meta.key = self.key;
		meta.lineage = self.lineage;
		meta.scope = self.scope;
		meta.frozen = frozen;
	}
}

/// Build the node for `item`, adopting `target` when it fits.
pub(crate) fn build_item(engine: &Engine, item: &Item, flags: Flags, target: Option<&Node>) -> RenderResult<Built> {
	build_with(engine, item, flags, target, Origin::of(item))
}

pub(crate) fn build_with(
	engine: &Engine,
	item: &Item,
	flags: Flags,
	target: Option<&Node>,
	mut origin: Origin,
) -> RenderResult<Built> {
	match item {
		Item::View(view) => match view.kind() {
			Kind::Element(tag) => build_element(engine, view, tag, flags, target, origin),
			Kind::Text(content) => {
				origin.lineage.push(view.clone());
				Ok(build_text(content, flags, target, origin))
			}
			Kind::Component(component) => match &component.body {
				ComponentBody::Boundary(fallback) => build_boundary(engine, view, fallback, flags, target, origin),
				ComponentBody::Render(_) => build_component(engine, view, component, flags, target, origin),
			},
			Kind::Fragment => build_with(engine, &Item::Fragment(view.clone()), flags, target, origin),
		},
		Item::Dynamic(dynamic) => build_slot(
			engine,
			SlotKind::Dynamic,
			SlotSource::Dynamic(dynamic.clone()),
			flags,
			target,
			origin,
		),
		Item::Chain(chain) => build_slot(engine, SlotKind::Chain, SlotSource::Chain(chain.clone()), flags, target, origin),
		Item::Repeat(view) => {
			origin.lineage.push(view.clone());
			let repeat = repeat_of(view).unwrap_or_else(|| Repeat::eager(Vec::new()));
			build_slot(engine, SlotKind::Repeat, SlotSource::Repeat(repeat), flags, target, origin)
		}
		Item::Fragment(view) => {
			origin.lineage.push(view.clone());
			build_slot(engine, SlotKind::Fragment, SlotSource::Fragment(view.clone()), flags, target, origin)
		}
	}
}

fn build_text(content: &str, flags: Flags, target: Option<&Node>, origin: Origin) -> Built {
	let (node, reused) = match target {
		Some(existing) if existing.is_text() => {
			existing.set_text_data(content);
			(existing.clone(), true)
		}
		_ => (Node::text(content), false),
	};
	origin.attach(&node, flags.frozen);
	Built { node, reused }
}

/// A scope for component bodies, owned by no one but the node it ends up on.
pub(crate) fn component_scope(engine: &Engine) -> Scope {
	let rt = engine.runtime();
	rt.detached(|| Scope::new(rt))
}

/// Invoke a component body inside `scope`.
pub(crate) fn invoke(engine: &Engine, component: &Component, view: &View, scope: &Scope, frozen: bool) -> RenderResult<View> {
	tracing::trace!(component = component.name(), "rendering component");
	let render = || scope.run(|| component.render(view.props()));
	if frozen {
		engine.runtime().untrack(render)
	} else {
		render()
	}
}

fn build_component(
	engine: &Engine,
	view: &View,
	component: &Component,
	flags: Flags,
	target: Option<&Node>,
	mut origin: Origin,
) -> RenderResult<Built> {
	let scope = origin.scope.take().unwrap_or_else(|| component_scope(engine));
	let _context = component.enter(engine.runtime());
	let output = match invoke(engine, component, view, &scope, flags.frozen) {
		Ok(output) => output,
		Err(error) => {
			scope.dispose();
			return Err(error);
		}
	};
	origin.lineage.push(view.clone());
	origin.scope = Some(scope.clone());
	build_with(engine, &expand_output(output), flags, target, origin).inspect_err(|_| scope.dispose())
}

fn build_element(
	engine: &Engine,
	view: &View,
	tag: &str,
	flags: Flags,
	target: Option<&Node>,
	mut origin: Origin,
) -> RenderResult<Built> {
	let frozen = flags.frozen || has_builtin(view.attributes(), Builtin::Once);
	let ns = flags.ns.for_element(tag);
	let (node, reused) = match target {
		Some(existing) if existing.has_tag(tag) => {
			existing.clear_attributes();
			existing.clear_event_listeners();
			(existing.clone(), true)
		}
		_ => (Node::element_ns(tag, ns), false),
	};
	tracing::trace!(tag, reused, frozen, "building element");

	origin.lineage.push(view.clone());
	origin.attach(&node, frozen);
	let child_flags = Flags {
		frozen,
		ns: ns.for_children_of(tag),
	};
	let populate = || -> RenderResult<()> {
		apply_attributes(engine, &node, view, frozen);
		apply_content(engine, &node, view, child_flags, reused)?;
		apply_show(engine, &node, view, frozen);
		sync_directives(engine, &node, view.attributes(), frozen);
		Ok(())
	};
	// the top of a frozen subtree snapshots everything below it
	let result = if frozen && !flags.frozen {
		engine.runtime().untrack(populate)
	} else {
		populate()
	};
	match result {
		Ok(()) => Ok(Built { node, reused }),
		Err(error) => {
			teardown(&node);
			Err(error)
		}
	}
}

/// Run `f` in a consumer whose lifetime is tied to `node`.
fn bind(engine: &Engine, node: &Node, f: impl FnMut() + 'static) {
	let rt = engine.runtime();
	let effect = rt.detached(|| Effect::new(rt, f));
	node.meta_mut().bindings.push(effect);
}

/// Install a detached consumer running `body`.
///
/// `body` receives `true` on its first run. An error from the first run is
/// returned (and the consumer disposed); later errors go to the nearest
/// boundary or root.
pub(crate) fn install(
	engine: &Engine,
	mut body: impl FnMut(&Engine, bool) -> RenderResult<()> + 'static,
) -> RenderResult<Effect> {
	let rt = engine.runtime();
	let weak = engine.downgrade();
	let failure: Rc<RefCell<Option<RenderError>>> = Rc::default();
	let first_failure = failure.clone();
	let mut first = true;
	let effect = rt.detached(|| {
		Effect::new(rt, move || {
			let Some(engine) = weak.upgrade() else {
				return;
			};
			let initial = core::mem::replace(&mut first, false);
			if let Err(error) = body(&engine, initial) {
				if initial {
					*first_failure.borrow_mut() = Some(error);
				} else {
					engine.report(error);
				}
			}
		})
	});
	let error = failure.borrow_mut().take();
	match error {
		Some(error) => {
			effect.dispose();
			Err(error)
		}
		None => Ok(effect),
	}
}

/// Apply plain attributes, event listeners and `t-model`.
pub(crate) fn apply_attributes(engine: &Engine, node: &Node, view: &View, frozen: bool) {
	for (name, value) in view.attributes().iter() {
		if let Some(event) = directive::event_name(name) {
			match value {
				AttrValue::Event(handler) => listen(node, &event, handler.clone()),
				other => tracing::debug!(attribute = name, value = ?other, "listener attribute without a handler ignored"),
			}
			continue;
		}
		match directive::parse_directive_name(name) {
			Some(parsed) => {
				if Builtin::from_name(&parsed.name) == Some(Builtin::Model) {
					match value {
						AttrValue::Model(model) => bind_model(engine, node, view, model, &parsed.modifiers, frozen),
						other => tracing::debug!(value = ?other, "t-model value is not a model; ignored"),
					}
				}
			}
			None => bind_attribute(engine, node, name, value, frozen),
		}
	}
}

fn bind_attribute(engine: &Engine, node: &Node, name: &str, value: &AttrValue, frozen: bool) {
	match value {
		AttrValue::Static(value) => write_attribute(node, name, value),
		AttrValue::Reactive(read) if frozen => {
			let value = engine.runtime().untrack(|| read());
			write_attribute(node, name, &value);
		}
		AttrValue::Reactive(read) => {
			let read = read.clone();
			let weak = node.downgrade();
			let name = name.to_string();
			bind(engine, node, move || {
				let value = read();
				if let Some(node) = weak.upgrade() {
					write_attribute(&node, &name, &value);
				}
			});
		}
		other => tracing::debug!(attribute = name, value = ?other, "attribute value is not renderable; ignored"),
	}
}

fn write_attribute(node: &Node, name: &str, value: &Value) {
	let mut value = value.to_attribute();
	// a rewritten style keeps the `display: none` of a hidden `t-show`
	if name.eq_ignore_ascii_case("style") && node.meta().visible == Some(false) {
		value = toggle_display_none(value.as_deref(), false);
	}
	match value {
		Some(value) => node.set_attribute(name, &value),
		None => {
			node.remove_attribute(name);
		}
	}
}

/// Add a listener the engine owns; patching removes only these.
fn listen(node: &Node, event: &str, handler: EventHandler) {
	node.add_event_listener(event, handler.clone());
	node.meta_mut().listeners.push((event.to_string(), handler));
}

/// Whether `t-model` on this view binds `checked` rather than `value`.
pub(crate) fn is_checkable(view: &View) -> bool {
	view.tag().is_some_and(|tag| tag.eq_ignore_ascii_case("input"))
		&& matches!(
			view.attributes().get("type"),
			Some(AttrValue::Static(Value::Str(kind))) if kind == "checkbox" || kind == "radio"
		)
}

pub(crate) fn write_model(node: &Node, checkable: bool, value: &Value) {
	if !checkable {
		node.set_attribute("value", &value.to_string());
	} else if value.is_truthy() {
		node.set_attribute("checked", "");
	} else {
		node.remove_attribute("checked");
	}
}

fn bind_model(engine: &Engine, node: &Node, view: &View, model: &Model, modifiers: &[String], frozen: bool) {
	let checkable = is_checkable(view);
	if frozen {
		let value = engine.runtime().untrack(|| model.read());
		write_model(node, checkable, &value);
	} else {
		let reader = model.clone();
		let weak = node.downgrade();
		bind(engine, node, move || {
			let value = reader.read();
			if let Some(node) = weak.upgrade() {
				write_model(&node, checkable, &value);
			}
		});
	}

	let has = |name: &str| modifiers.iter().any(|modifier| modifier == name);
	let (trim, number) = (has("trim"), has("number"));
	let event = if checkable || has("lazy") { "change" } else { "input" };
	let writer = model.clone();
	let weak = node.downgrade();
	listen(
		node,
		event,
		Rc::new(move |event: &Event| {
			let Some(node) = weak.upgrade() else {
				return;
			};
			let value = if checkable {
				Value::Bool(event.checked.unwrap_or_else(|| node.has_attribute("checked")))
			} else {
				let raw = event
					.value
					.clone()
					.or_else(|| node.attribute("value"))
					.unwrap_or_default();
				coerce(raw, trim, number)
			};
			writer.write(value);
		}),
	);
}

/// Apply the `trim` and `number` model modifiers.
fn coerce(raw: String, trim: bool, number: bool) -> Value {
	let text = if trim { raw.trim().to_string() } else { raw };
	if number {
		if let Ok(int) = text.parse::<i64>() {
			return Value::Int(int);
		}
		if let Ok(float) = text.parse::<f64>() {
			return Value::Float(float);
		}
	}
	Value::from(text)
}

/// Apply `t-show`. Runs after the content so the node exists either way.
pub(crate) fn apply_show(engine: &Engine, node: &Node, view: &View, frozen: bool) {
	let Some((value, _)) = builtin(view.attributes(), Builtin::Show) else {
		let hidden = node.meta_mut().visible.take() == Some(false);
		if hidden {
			set_display(node, true);
		}
		return;
	};
	match value {
		AttrValue::Reactive(read) if !frozen => {
			let read = read.clone();
			let weak = node.downgrade();
			bind(engine, node, move || {
				let visible = read().is_truthy();
				if let Some(node) = weak.upgrade() {
					write_visibility(&node, visible);
				}
			});
		}
		other => match engine.runtime().untrack(|| other.current()) {
			Some(value) => write_visibility(node, value.is_truthy()),
			None => tracing::debug!(value = ?other, "t-show value is not a value; ignored"),
		},
	}
}

fn write_visibility(node: &Node, visible: bool) {
	node.meta_mut().visible = Some(visible);
	set_display(node, visible);
}

fn set_display(node: &Node, visible: bool) {
	match toggle_display_none(node.attribute("style").as_deref(), visible) {
		Some(style) => node.set_attribute("style", &style),
		None => {
			node.remove_attribute("style");
		}
	}
}

/// Build or update the children of an element.
pub(crate) fn apply_content(engine: &Engine, node: &Node, view: &View, flags: Flags, hydrate: bool) -> RenderResult<()> {
	let attributes = view.attributes();
	if let Some((value, _)) = builtin(attributes, Builtin::Text) {
		bind_text(engine, node, value, flags.frozen);
		return Ok(());
	}
	if let Some((value, _)) = builtin(attributes, Builtin::Html) {
		return bind_html(engine, node, value, flags.frozen);
	}
	if has_builtin(attributes, Builtin::For) {
		return match repeat_of(view) {
			Some(repeat) => bind_repeat(engine, node, repeat, flags, hydrate),
			None => {
				clear_content(node);
				Ok(())
			}
		};
	}
	fill_children(engine, node, &expand_children(view.children()), flags, hydrate)
}

/// Unmount every child of `node`.
pub(crate) fn clear_content(node: &Node) {
	for child in node.children() {
		unmount_node(&child);
	}
}

fn bind_text(engine: &Engine, node: &Node, value: &AttrValue, frozen: bool) {
	let text = match node.first_child() {
		Some(child) if child.is_text() && node.child_count() == 1 => child,
		_ => {
			clear_content(node);
			let text = Node::text("");
			node.append_child(&text);
			text
		}
	};
	match value {
		AttrValue::Reactive(read) if !frozen => {
			let read = read.clone();
			let weak = text.downgrade();
			bind(engine, node, move || {
				let content = read().to_string();
				if let Some(text) = weak.upgrade() {
					text.set_text_data(&content);
				}
			});
		}
		other => {
			let content = engine.runtime().untrack(|| other.current()).unwrap_or(Value::Null);
			text.set_text_data(&content.to_string());
		}
	}
}

fn bind_html(engine: &Engine, node: &Node, value: &AttrValue, frozen: bool) -> RenderResult<()> {
	match value {
		AttrValue::Reactive(read) if !frozen => {
			let read = read.clone();
			let weak = node.downgrade();
			let effect = install(engine, move |_, _| {
				let markup = read().to_string();
				let Some(node) = weak.upgrade() else {
					return Ok(());
				};
				clear_content(&node);
				node.set_inner_html(&markup);
				Ok(())
			})?;
			node.meta_mut().bindings.push(effect);
			Ok(())
		}
		other => {
			let markup = engine.runtime().untrack(|| other.current()).unwrap_or(Value::Null);
			clear_content(node);
			node.set_inner_html(&markup.to_string());
			Ok(())
		}
	}
}

fn bind_repeat(engine: &Engine, node: &Node, repeat: Repeat, flags: Flags, hydrate: bool) -> RenderResult<()> {
	if !repeat.is_reactive() || flags.frozen {
		return fill_children(engine, node, &expand_views(repeat.items()), flags, hydrate);
	}
	let weak = node.downgrade();
	let effect = install(engine, move |engine, first| {
		let items = expand_views(repeat.items());
		match weak.upgrade() {
			Some(node) => fill_children(engine, &node, &items, flags, hydrate && first),
			None => Ok(()),
		}
	})?;
	node.meta_mut().bindings.push(effect);
	Ok(())
}

/// Hydrate `items` over the existing children of `parent`, or reconcile them.
pub(crate) fn fill_children(engine: &Engine, parent: &Node, items: &[Item], flags: Flags, hydrate: bool) -> RenderResult<()> {
	if hydrate {
		crate::hydration::hydrate_children(engine, parent, items, flags)
	} else {
		reconcile_children(engine, parent, items, flags)
	}
}

fn slot_node(kind: SlotKind, flags: Flags, target: Option<&Node>) -> (Node, bool) {
	match target {
		Some(existing) if existing.is_slot() && existing.attribute(SLOT_ATTR).as_deref() == Some(kind.as_str()) => {
			(existing.clone(), true)
		}
		_ => {
			let node = Node::element_ns(SLOT_TAG, flags.ns);
			node.set_attribute(SLOT_ATTR, kind.as_str());
			(node, false)
		}
	}
}

fn build_slot(
	engine: &Engine,
	kind: SlotKind,
	source: SlotSource,
	flags: Flags,
	target: Option<&Node>,
	origin: Origin,
) -> RenderResult<Built> {
	let (node, reused) = slot_node(kind, flags, target);
	tracing::trace!(slot = kind.as_str(), reused, "building slot");
	let reactive = !flags.frozen && is_reactive(&source);
	node.meta_mut().slot = Some(SlotState::new(kind, source));
	origin.attach(&node, flags.frozen);

	let result = if reactive {
		watch_slot(engine, &node, flags, reused)
	} else {
		update_slot(engine, &node, flags, reused)
	};
	match result {
		Ok(()) => Ok(Built { node, reused }),
		Err(error) => {
			teardown(&node);
			Err(error)
		}
	}
}

pub(crate) fn is_reactive(source: &SlotSource) -> bool {
	match source {
		SlotSource::Dynamic(_) => true,
		SlotSource::Chain(chain) => chain.is_reactive(),
		SlotSource::Repeat(repeat) => repeat.is_reactive(),
		SlotSource::Fragment(_) | SlotSource::Boundary(_) => false,
	}
}

/// Keep the content of a slot up to date with a dedicated consumer.
pub(crate) fn watch_slot(engine: &Engine, node: &Node, flags: Flags, hydrate: bool) -> RenderResult<()> {
	let weak = node.downgrade();
	let effect = install(engine, move |engine, first| match weak.upgrade() {
		Some(node) => update_slot(engine, &node, flags, hydrate && first),
		None => Ok(()),
	})?;
	if let Some(slot) = node.meta_mut().slot.as_mut() {
		slot.effect = Some(effect);
	}
	Ok(())
}

/// Recompute the content of a slot from its source and bring the children in line.
pub(crate) fn update_slot(engine: &Engine, node: &Node, flags: Flags, hydrate: bool) -> RenderResult<()> {
	let Some(source) = node.meta().slot.as_ref().map(|slot| slot.source.clone()) else {
		return Ok(());
	};
	let items = match source {
		SlotSource::Dynamic(dynamic) => expand_children(&[Child::View(dynamic.produce())]),
		SlotSource::Chain(chain) => {
			let selected = chain.select().map(|(index, view)| (index, view.clone()));
			let index = selected.as_ref().map(|(index, _)| *index);
			let previous = node
				.meta_mut()
				.slot
				.as_mut()
				.and_then(|slot| core::mem::replace(&mut slot.active_branch, index));
			if previous != index && !hydrate {
				tracing::trace!(?previous, ?index, "conditional branch switched");
				clear_content(node);
			}
			selected
				.map(|(_, view)| expand_branch(&view))
				.unwrap_or_default()
		}
		SlotSource::Repeat(repeat) => expand_views(repeat.items()),
		SlotSource::Fragment(view) => expand_children(view.children()),
		SlotSource::Boundary(_) => return Ok(()),
	};
	fill_children(engine, node, &items, flags, hydrate)
}

/// Run `f` with `state` as the error sink of the consumers it creates.
pub(crate) fn guarded<R>(engine: &Engine, state: &BoundaryState, f: impl FnOnce() -> R) -> R {
	let _sink = engine
		.runtime()
		.provide_context(engine.error_sink(), ErrorSink::Boundary(state.failure.clone()));
	f()
}

/// Replace the content of a boundary slot with its fallback for `error`.
pub(crate) fn show_fallback(
	engine: &Engine,
	node: &Node,
	state: &BoundaryState,
	error: &RenderError,
	flags: Flags,
) -> RenderResult<()> {
	clear_content(node);
	state.showing.set(true);
	let fallback = state.fallback.borrow().clone();
	let view = fallback(error);
	reconcile_children(engine, node, &expand_children(&[Child::View(view)]), flags)
}

fn build_boundary(
	engine: &Engine,
	view: &View,
	fallback: &FallbackFn,
	flags: Flags,
	target: Option<&Node>,
	mut origin: Origin,
) -> RenderResult<Built> {
	let state = BoundaryState {
		failure: Signal::new(engine.runtime(), None),
		fallback: Rc::new(RefCell::new(fallback.clone())),
		showing: Rc::new(Cell::new(false)),
	};
	let (node, reused) = slot_node(SlotKind::Boundary, flags, target);
	node.meta_mut().slot = Some(SlotState::new(SlotKind::Boundary, SlotSource::Boundary(state.clone())));
	origin.lineage.push(view.clone());
	origin.attach(&node, flags.frozen);

	let items = expand_children(view.children());
	if let Err(error) = guarded(engine, &state, || fill_children(engine, &node, &items, flags, reused)) {
		tracing::debug!(%error, "boundary caught a construction error");
		if let Err(fallback_error) = show_fallback(engine, &node, &state, &error, flags) {
			teardown(&node);
			return Err(fallback_error);
		}
		state.failure.set(Some(error));
	}

	if !flags.frozen {
		let weak = node.downgrade();
		let watched = state.clone();
		let effect = install(engine, move |engine, _| {
			let Some(error) = watched.failure.get() else {
				return Ok(());
			};
			if watched.showing.get() {
				return Ok(());
			}
			let Some(node) = weak.upgrade() else {
				return Ok(());
			};
			tracing::debug!(%error, "boundary caught an update error");
			show_fallback(engine, &node, &watched, &error, flags)
		});
		match effect {
			Ok(effect) => {
				if let Some(slot) = node.meta_mut().slot.as_mut() {
					slot.effect = Some(effect);
				}
			}
			Err(error) => {
				teardown(&node);
				return Err(error);
			}
		}
	}
	Ok(Built { node, reused })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::view::IntoView;
	use rstest::rstest;
	use trellis_reactive::Signal;

	fn build(engine: &Engine, view: View) -> Node {
		build_item(engine, &expand_output(view), Flags::default(), None).unwrap().node
	}

	#[rstest]
	fn test_static_element() {
		let engine = Engine::new();
		let node = build(
			&engine,
			View::element("div")
				.attr("id", "a")
				.attr("hidden", false)
				.child("hi")
				.into_view(),
		);

		assert_eq!(node.outer_html(), "<div id=\"a\">hi</div>");
		assert_eq!(engine.runtime().effect_count(), 0);
	}

	#[rstest]
	fn test_reactive_attribute_binding() {
		let engine = Engine::new();
		let class = Signal::new(engine.runtime(), "a".to_string());
		let c = class.clone();
		let node = build(&engine, View::element("p").reactive("class", move || c.get()).into_view());

		class.set("b".to_string());
		engine.flush();

		assert_eq!(node.attribute("class").as_deref(), Some("b"));
		assert_eq!(node.meta().bindings.len(), 1);
	}

	#[rstest]
	fn test_svg_namespace_propagates() {
		let engine = Engine::new();
		let node = build(
			&engine,
			View::element("svg")
				.child(View::element("circle"))
				.child(View::element("foreignObject").child(View::element("p")))
				.into_view(),
		);

		let circle = node.child(0).unwrap();
		let p = node.child(1).and_then(|f| f.child(0)).unwrap();
		assert_eq!(circle.namespace(), Some(Namespace::Svg));
		assert_eq!(p.namespace(), Some(Namespace::Html));
	}

	#[rstest]
	#[case("  42 ", true, true, Value::Int(42))]
	#[case("1.5", false, true, Value::Float(1.5))]
	#[case("abc", false, true, Value::from("abc"))]
	#[case(" x ", true, false, Value::from("x"))]
	fn test_model_coercion(#[case] raw: &str, #[case] trim: bool, #[case] number: bool, #[case] expected: Value) {
		assert_eq!(coerce(raw.to_string(), trim, number), expected);
	}

	#[rstest]
	fn test_show_keeps_other_styles() {
		let engine = Engine::new();
		let visible = Signal::new(engine.runtime(), false);
		let v = visible.clone();
		let node = build(
			&engine,
			View::element("div")
				.attr("style", "color: red")
				.show_when(move || v.get())
				.into_view(),
		);

		assert_eq!(node.attribute("style").as_deref(), Some("color: red; display: none"));
		visible.set(true);
		engine.flush();
		assert_eq!(node.attribute("style").as_deref(), Some("color: red"));
	}

	#[rstest]
	fn test_hidden_node_stays_hidden_when_style_changes() {
		let engine = Engine::new();
		let color = Signal::new(engine.runtime(), "color: red".to_string());
		let visible = Signal::new(engine.runtime(), false);
		let (c, v) = (color.clone(), visible.clone());
		let node = build(
			&engine,
			View::element("div")
				.reactive("style", move || c.get())
				.show_when(move || v.get())
				.into_view(),
		);
		assert_eq!(node.attribute("style").as_deref(), Some("color: red; display: none"));

		color.set("color: blue".to_string());
		engine.flush();
		assert_eq!(node.attribute("style").as_deref(), Some("color: blue; display: none"));

		visible.set(true);
		engine.flush();
		color.set("color: green".to_string());
		engine.flush();
		assert_eq!(node.attribute("style").as_deref(), Some("color: green"));
	}

	#[rstest]
	fn test_raw_markup_decodes_named_entities() {
		let engine = Engine::new();
		let node = build(
			&engine,
			View::element("p")
				.inner_html(Value::from("&copy; 2024 &mdash; <b>x</b>"))
				.into_view(),
		);

		assert_eq!(node.text_content(), "© 2024 — x");
		assert_eq!(node.inner_html(), "© 2024 — <b>x</b>");
	}

	#[rstest]
	fn test_first_run_error_disposes_consumer() {
		let engine = Engine::new();
		let result = install(&engine, |_, _| Err(RenderError::NotMounted));

		assert_eq!(result.unwrap_err(), RenderError::NotMounted);
		assert_eq!(engine.runtime().effect_count(), 0);
	}
}
