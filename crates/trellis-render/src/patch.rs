//! Reconciliation of live nodes against new descriptions.
//!
//! A node whose description still matches (same kind, tag, component type
//! and key) is updated in place; anything else is replaced. Sibling lists
//! are reconciled by position unless every item carries a key, in which case
//! nodes follow their keys and are moved rather than rebuilt.

use std::collections::HashSet;

use indexmap::IndexMap;
use trellis_reactive::Scope;

use crate::build::{
	self, Flags, Origin, apply_attributes, apply_content, apply_show, build_item, build_with, component_scope,
	guarded, invoke, is_checkable, show_fallback,
};
use crate::directive::{Builtin, event_name, has_builtin, parse_directive_name, sync_directives};
use crate::dom::Node;
use crate::engine::Engine;
use crate::error::{RenderError, RenderResult};
use crate::expand::{Expanded, Item, expand_children, expand_output, repeat_of};
use crate::meta::{SlotKind, SlotSource};
use crate::view::{Child, Component, ComponentBody, DynamicChild, FallbackFn, Key, Kind, Repeat, View};

/// Fail if two items share a key.
pub(crate) fn check_keys(items: &[Item]) -> RenderResult<()> {
	let mut seen = HashSet::new();
	for key in items.iter().filter_map(Item::key) {
		if !seen.insert(key) {
			return Err(RenderError::DuplicateKey { key: key.to_string() });
		}
	}
	Ok(())
}

/// Bring the children of `parent` in line with `items`.
pub(crate) fn reconcile_children(engine: &Engine, parent: &Node, items: &[Item], flags: Flags) -> RenderResult<()> {
	check_keys(items)?;
	if !items.is_empty() && items.iter().all(|item| item.key().is_some()) {
		return reconcile_keyed(engine, parent, items, flags);
	}

	let existing = parent.children();
	for stale in existing.iter().skip(items.len()) {
		unmount_node(stale);
	}
	for (index, item) in items.iter().enumerate() {
		match existing.get(index) {
			Some(node) => {
				patch_node(engine, node, item, flags)?;
			}
			None => {
				let built = build_item(engine, item, flags, None)?;
				parent.append_child(&built.node);
			}
		}
	}
	Ok(())
}

fn reconcile_keyed(engine: &Engine, parent: &Node, items: &[Item], flags: Flags) -> RenderResult<()> {
	let mut unclaimed: IndexMap<Key, Node> = IndexMap::new();
	for node in parent.children() {
		let key = node.meta().key.clone();
		match key {
			Some(key) if !unclaimed.contains_key(&key) => {
				unclaimed.insert(key, node);
			}
			_ => unmount_node(&node),
		}
	}

	let mut placed = Vec::with_capacity(items.len());
	for item in items {
		let Some(key) = item.key() else {
			continue;
		};
		let node = match unclaimed.shift_remove(key) {
			Some(node) => patch_node(engine, &node, item, flags)?,
			None => {
				tracing::trace!(%key, "building keyed node");
				build_item(engine, item, flags, None)?.node
			}
		};
		placed.push(node);
	}

	for (key, node) in unclaimed {
		tracing::trace!(%key, "removing keyed node");
		unmount_node(&node);
	}
	for (index, node) in placed.iter().enumerate() {
		let current = parent.child(index);
		if !current.as_ref().is_some_and(|current| current.ptr_eq(node)) {
			parent.insert_before(node, current.as_ref());
		}
	}
	Ok(())
}

/// Update `node` to describe `item`, replacing it when it no longer fits.
///
/// Returns the node now standing in for `item`.
pub(crate) fn patch_node(engine: &Engine, node: &Node, item: &Item, flags: Flags) -> RenderResult<Node> {
	if node.meta().frozen {
		return Ok(node.clone());
	}
	let same_key = node.meta().key.as_ref() == item.key();
	if !same_key || !matches_at(node, item, 0) {
		return replace_with(engine, node, item, flags, Origin::of(item));
	}

	let mut scope = None;
	let result = patch_layer(engine, node, item, flags, 0, &mut scope);
	if let Some(scope) = scope {
		match &result {
			Ok(patched) => {
				let previous = patched.meta_mut().scope.replace(scope);
				if let Some(previous) = previous {
					previous.dispose();
				}
			}
			Err(_) => scope.dispose(),
		}
	}
	result
}

/// Whether `item` can be patched onto `node`, looking at lineage layer `depth`.
pub(crate) fn matches_at(node: &Node, item: &Item, depth: usize) -> bool {
	let meta = node.meta();
	let layer = meta.lineage.get(depth);
	let last = meta.lineage.len() == depth + 1;
	let slot = meta.slot_kind();
	match item {
		Item::View(view) => match view.kind() {
			Kind::Component(component) => match (component.is_boundary(), layer.map(View::kind)) {
				(true, Some(Kind::Component(previous))) => {
					last && previous.is_boundary() && slot == Some(SlotKind::Boundary)
				}
				(false, Some(Kind::Component(previous))) => previous.type_id() == component.type_id(),
				_ => false,
			},
			Kind::Element(tag) => {
				last && slot.is_none()
					&& node.has_tag(tag)
					&& !has_builtin(view.attributes(), Builtin::Once)
			}
			Kind::Text(_) => last && node.is_text(),
			Kind::Fragment => last && slot == Some(SlotKind::Fragment),
		},
		Item::Dynamic(_) => meta.lineage.len() == depth && slot == Some(SlotKind::Dynamic),
		Item::Chain(_) => meta.lineage.len() == depth && slot == Some(SlotKind::Chain),
		Item::Repeat(_) => last && slot == Some(SlotKind::Repeat),
		Item::Fragment(_) => last && slot == Some(SlotKind::Fragment),
	}
}

fn set_layer(node: &Node, depth: usize, view: &View) -> Option<View> {
	let mut meta = node.meta_mut();
	match meta.lineage.get_mut(depth) {
		Some(layer) => Some(core::mem::replace(layer, view.clone())),
		None => {
			meta.lineage.push(view.clone());
			None
		}
	}
}

fn patch_layer(
	engine: &Engine,
	node: &Node,
	item: &Item,
	flags: Flags,
	depth: usize,
	scope: &mut Option<Scope>,
) -> RenderResult<Node> {
	match item {
		Item::View(view) => match view.kind() {
			Kind::Component(component) => match &component.body {
				ComponentBody::Boundary(fallback) => {
					set_layer(node, depth, view);
					patch_boundary(engine, node, view, fallback, flags)?;
					Ok(node.clone())
				}
				ComponentBody::Render(_) => patch_component(engine, node, view, component, flags, depth, scope),
			},
			Kind::Element(_) => {
				let previous = set_layer(node, depth, view);
				patch_element(engine, node, previous.as_ref(), view, flags)?;
				Ok(node.clone())
			}
			Kind::Text(content) => {
				set_layer(node, depth, view);
				if node.text_data().as_deref() != Some(content.as_ref()) {
					node.set_text_data(content);
				}
				Ok(node.clone())
			}
			Kind::Fragment => patch_layer(engine, node, &Item::Fragment(view.clone()), flags, depth, scope),
		},
		Item::Dynamic(dynamic) => {
			patch_dynamic(engine, node, dynamic, flags)?;
			Ok(node.clone())
		}
		Item::Chain(chain) => {
			let reactive = chain.is_reactive();
			patch_source(engine, node, SlotSource::Chain(chain.clone()), reactive, flags)?;
			Ok(node.clone())
		}
		Item::Repeat(view) => {
			set_layer(node, depth, view);
			let repeat = repeat_of(view).unwrap_or_else(|| Repeat::eager(Vec::new()));
			let unchanged = matches!(
				node.meta().slot.as_ref().map(|slot| &slot.source),
				Some(SlotSource::Repeat(previous)) if previous.ptr_eq(&repeat) && repeat.is_reactive()
			);
			if !unchanged {
				let reactive = repeat.is_reactive();
				patch_source(engine, node, SlotSource::Repeat(repeat), reactive, flags)?;
			}
			Ok(node.clone())
		}
		Item::Fragment(view) => {
			set_layer(node, depth, view);
			patch_source(engine, node, SlotSource::Fragment(view.clone()), false, flags)?;
			Ok(node.clone())
		}
	}
}

/// Re-invoke a component layer and patch what it now renders.
fn patch_component(
	engine: &Engine,
	node: &Node,
	view: &View,
	component: &Component,
	flags: Flags,
	depth: usize,
	scope: &mut Option<Scope>,
) -> RenderResult<Node> {
	let layer_scope = scope.get_or_insert_with(|| component_scope(engine)).clone();
	let _context = component.enter(engine.runtime());
	let output = invoke(engine, component, view, &layer_scope, flags.frozen)?;
	set_layer(node, depth, view);

	let item = expand_output(output);
	if matches_at(node, &item, depth + 1) {
		return patch_layer(engine, node, &item, flags, depth + 1, scope);
	}
	tracing::trace!(component = component.name(), "component output changed shape; replacing node");
	let (lineage, key) = {
		let meta = node.meta();
		let lineage: Vec<View> = meta.lineage.iter().take(depth + 1).cloned().collect();
		(lineage, meta.key.clone())
	};
	let origin = Origin {
		lineage,
		key,
		scope: scope.take(),
	};
	replace_with(engine, node, &item, flags, origin)
}

/// Tear `node` down and put a node built for `item` in its place.
fn replace_with(engine: &Engine, node: &Node, item: &Item, flags: Flags, origin: Origin) -> RenderResult<Node> {
	tracing::trace!(item = %item.describe(), "replacing node");
	let parent = node.parent();
	teardown(node);
	let built = build_with(engine, item, flags, None, origin)?;
	if let Some(parent) = parent {
		parent.replace_child(&built.node, node);
	}
	Ok(built.node)
}

/// Names of the attributes the engine writes for `view`.
fn managed_attributes(view: &View) -> Vec<String> {
	let mut names = Vec::new();
	for (name, _) in view.attributes().iter() {
		if event_name(name).is_some() {
			continue;
		}
		match parse_directive_name(name) {
			None => names.push(name.to_string()),
			Some(parsed) => match Builtin::from_name(&parsed.name) {
				Some(Builtin::Show) => names.push("style".to_string()),
				Some(Builtin::Model) if is_checkable(view) => names.push("checked".to_string()),
				Some(Builtin::Model) => names.push("value".to_string()),
				_ => {}
			},
		}
	}
	names
}

fn patch_element(engine: &Engine, node: &Node, previous: Option<&View>, view: &View, flags: Flags) -> RenderResult<()> {
	tracing::trace!(tag = ?view.tag(), "patching element");
	let bindings = core::mem::take(&mut node.meta_mut().bindings);
	for effect in bindings {
		effect.dispose();
	}
	let listeners = core::mem::take(&mut node.meta_mut().listeners);
	for (event, handler) in &listeners {
		node.remove_event_listener(event, handler);
	}

	if let Some(previous) = previous {
		let kept = managed_attributes(view);
		for name in managed_attributes(previous) {
			if !kept.contains(&name) {
				node.remove_attribute(&name);
			}
		}
	}

	let tag = view.tag().unwrap_or_default();
	let child_flags = Flags {
		frozen: false,
		ns: node.namespace().unwrap_or(flags.ns).for_children_of(tag),
	};
	apply_attributes(engine, node, view, false);
	apply_content(engine, node, view, child_flags, false)?;
	apply_show(engine, node, view, false);
	sync_directives(engine, node, view.attributes(), false);
	Ok(())
}

fn patch_boundary(engine: &Engine, node: &Node, view: &View, fallback: &FallbackFn, flags: Flags) -> RenderResult<()> {
	let state = match node.meta().slot.as_ref().map(|slot| &slot.source) {
		Some(SlotSource::Boundary(state)) => state.clone(),
		_ => return Ok(()),
	};
	*state.fallback.borrow_mut() = fallback.clone();

	if state.showing.get() {
		let Some(error) = state.failure.get_untracked() else {
			return Ok(());
		};
		let view = fallback(&error);
		return reconcile_children(engine, node, &expand_children(&[Child::View(view)]), flags);
	}

	let items = expand_children(view.children());
	if let Err(error) = guarded(engine, &state, || reconcile_children(engine, node, &items, flags)) {
		tracing::debug!(%error, "boundary caught a patch error");
		show_fallback(engine, node, &state, &error, flags)?;
		state.failure.set(Some(error));
	}
	Ok(())
}

fn patch_dynamic(engine: &Engine, node: &Node, dynamic: &DynamicChild, flags: Flags) -> RenderResult<()> {
	let unchanged = matches!(
		node.meta().slot.as_ref().map(|slot| &slot.source),
		Some(SlotSource::Dynamic(previous)) if previous.ptr_eq(dynamic)
	);
	if unchanged {
		return Ok(());
	}
	patch_source(engine, node, SlotSource::Dynamic(dynamic.clone()), true, flags)
}

/// Swap the source of a slot and bring its content up to date.
fn patch_source(engine: &Engine, node: &Node, source: SlotSource, reactive: bool, flags: Flags) -> RenderResult<()> {
	let existing = {
		let mut meta = node.meta_mut();
		let Some(slot) = meta.slot.as_mut() else {
			return Ok(());
		};
		slot.source = source;
		slot.effect.take()
	};
	match (reactive && !flags.frozen, existing) {
		(true, Some(effect)) => {
			if let Some(slot) = node.meta_mut().slot.as_mut() {
				slot.effect = Some(effect.clone());
			}
			effect.run();
			Ok(())
		}
		(true, None) => build::watch_slot(engine, node, flags, false),
		(false, existing) => {
			if let Some(effect) = existing {
				effect.dispose();
			}
			build::update_slot(engine, node, flags, false)
		}
	}
}

/// Stop everything bound to `node` and its descendants, bottom-up.
///
/// Directive `unmounted` hooks and unmount callbacks run while the node is
/// still attached.
pub(crate) fn teardown(node: &Node) {
	for child in node.children() {
		teardown(&child);
	}
	let (effects, directives, scope, callbacks) = {
		let mut meta = node.meta_mut();
		(
			meta.take_effects(),
			core::mem::take(&mut meta.directives),
			meta.scope.take(),
			core::mem::take(&mut meta.unmount),
		)
	};
	for effect in effects {
		effect.dispose();
	}
	for directive in directives {
		directive.unmount(node);
	}
	if let Some(scope) = scope {
		scope.dispose();
	}
	for callback in callbacks {
		callback();
	}
}

/// Tear `node` down and detach it.
pub(crate) fn unmount_node(node: &Node) {
	teardown(node);
	node.detach();
}

/// Patch a whole root from one render to the next.
pub(crate) fn patch_root(engine: &Engine, container: &Node, previous: &Expanded, next: &Expanded) -> RenderResult<()> {
	if !previous.same_shape(next) {
		tracing::trace!("root output changed shape; rebuilding");
		for child in container.children() {
			unmount_node(&child);
		}
	}
	reconcile_children(engine, container, &next.items(), Flags::for_container(container))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::view::{IntoView, Value};
	use rstest::rstest;

	fn items(views: Vec<View>) -> Vec<Item> {
		crate::expand::expand_views(views)
	}

	fn keyed(keys: &[i64]) -> Vec<Item> {
		items(
			keys.iter()
				.map(|key| View::element("li").key(*key).child(key.to_string()).into_view())
				.collect(),
		)
	}

	#[rstest]
	fn test_duplicate_keys_rejected_before_mutation() {
		let engine = Engine::new();
		let parent = Node::element("ul");
		reconcile_children(&engine, &parent, &keyed(&[1, 2]), Flags::default()).unwrap();

		let result = reconcile_children(&engine, &parent, &keyed(&[3, 3]), Flags::default());

		assert_eq!(result, Err(RenderError::DuplicateKey { key: "3".into() }));
		assert_eq!(parent.inner_html(), "<li>1</li><li>2</li>");
	}

	#[rstest]
	fn test_keyed_reorder_moves_nodes() {
		let engine = Engine::new();
		let parent = Node::element("ul");
		reconcile_children(&engine, &parent, &keyed(&[1, 2, 3]), Flags::default()).unwrap();
		let before = parent.children();

		reconcile_children(&engine, &parent, &keyed(&[3, 1, 4]), Flags::default()).unwrap();

		let after = parent.children();
		assert_eq!(parent.inner_html(), "<li>3</li><li>1</li><li>4</li>");
		assert!(after[0].ptr_eq(&before[2]));
		assert!(after[1].ptr_eq(&before[0]));
		assert!(before[1].parent().is_none());
	}

	#[rstest]
	fn test_positional_patch_keeps_nodes() {
		let engine = Engine::new();
		let parent = Node::element("div");
		let first = items(vec![View::element("p").attr("class", "a").into_view(), View::text("x")]);
		reconcile_children(&engine, &parent, &first, Flags::default()).unwrap();
		let p = parent.child(0).unwrap();

		let second = items(vec![View::element("p").attr("id", "b").into_view()]);
		reconcile_children(&engine, &parent, &second, Flags::default()).unwrap();

		assert!(parent.child(0).unwrap().ptr_eq(&p));
		assert_eq!(parent.inner_html(), "<p id=\"b\"></p>");
	}

	#[rstest]
	fn test_tag_change_replaces_node() {
		let engine = Engine::new();
		let parent = Node::element("div");
		reconcile_children(&engine, &parent, &items(vec![View::element("p").into_view()]), Flags::default()).unwrap();
		let p = parent.child(0).unwrap();

		reconcile_children(&engine, &parent, &items(vec![View::element("span").into_view()]), Flags::default()).unwrap();

		assert!(!parent.child(0).unwrap().ptr_eq(&p));
		assert!(p.parent().is_none());
	}

	#[rstest]
	fn test_frozen_node_is_not_patched() {
		let engine = Engine::new();
		let parent = Node::element("div");
		let first = items(vec![View::element("p").once().child("a").into_view()]);
		reconcile_children(&engine, &parent, &first, Flags::default()).unwrap();

		let second = items(vec![View::element("p").once().child("b").into_view()]);
		reconcile_children(&engine, &parent, &second, Flags::default()).unwrap();

		assert_eq!(parent.inner_html(), "<p>a</p>");
	}

	#[rstest]
	fn test_teardown_runs_callbacks_bottom_up() {
		let order = std::rc::Rc::new(core::cell::RefCell::new(Vec::new()));
		let outer = Node::element("div");
		let inner = Node::element("span");
		outer.append_child(&inner);
		let o = order.clone();
		outer.on_unmount(move || o.borrow_mut().push("outer"));
		let o = order.clone();
		inner.on_unmount(move || o.borrow_mut().push("inner"));

		unmount_node(&outer);

		assert_eq!(*order.borrow(), vec!["inner", "outer"]);
	}

	#[rstest]
	fn test_removed_show_clears_style() {
		let engine = Engine::new();
		let parent = Node::element("div");
		let first = items(vec![View::element("p").bind("t-show", Value::Bool(false)).into_view()]);
		reconcile_children(&engine, &parent, &first, Flags::default()).unwrap();
		assert_eq!(parent.inner_html(), "<p style=\"display: none\"></p>");

		reconcile_children(&engine, &parent, &items(vec![View::element("p").into_view()]), Flags::default()).unwrap();

		assert_eq!(parent.inner_html(), "<p></p>");
	}
}
