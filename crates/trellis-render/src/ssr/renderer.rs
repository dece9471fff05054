//! Incremental HTML serializer.
//!
//! The renderer keeps an explicit work stack instead of recursing, so output
//! can be produced a piece at a time and deep trees cannot overflow the call
//! stack. Markup matches what a live tree built from the same description
//! serializes to, slot wrappers and text separators included.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use indexmap::IndexMap;

use crate::build::is_checkable;
use crate::directive::{self, Builtin, builtin};
use crate::engine::Engine;
use crate::error::RenderResult;
use crate::expand::{Item, expand_branch, expand_children, expand_output, expand_views, repeat_of};
use crate::html::{SLOT_ATTR, SLOT_TAG, TEXT_SEPARATOR, html_escape, is_raw_text_element, is_void_element, toggle_display_none, write_attributes};
use crate::meta::SlotKind;
use crate::options::SsrOptions;
use crate::patch::check_keys;
use crate::view::{AttrValue, Child, ComponentBody, ContextScope, Kind, Value, View};

enum Frame {
	/// Remaining siblings of one parent
	List {
		items: std::vec::IntoIter<Item>,
		previous_text: bool,
		raw: bool,
	},
	/// Literal output, usually a closing tag
	Markup(String),
	/// Context provided by a component for its subtree
	Context(ContextScope),
}

pub(crate) struct Renderer {
	engine: Engine,
	options: SsrOptions,
	stack: Vec<Frame>,
	/// Serialized attributes keyed by a fingerprint of their static values
	cache: HashMap<u64, String>,
}

impl Renderer {
	pub(crate) fn new(engine: Engine, items: Vec<Item>) -> Self {
		let options = engine.options().ssr.clone();
		Self::with_cache(engine, options, items, HashMap::new())
	}

	fn with_cache(engine: Engine, options: SsrOptions, items: Vec<Item>, cache: HashMap<u64, String>) -> Self {
		Self {
			engine,
			options,
			stack: vec![Frame::List {
				items: items.into_iter(),
				previous_text: false,
				raw: false,
			}],
			cache,
		}
	}

	#[cfg(test)]
	pub(crate) fn cached_attribute_sets(&self) -> usize {
		self.cache.len()
	}

	/// Process one unit of work. Returns `false` once everything is written.
	pub(crate) fn step(&mut self, out: &mut String) -> RenderResult<bool> {
		let Some(frame) = self.stack.pop() else {
			return Ok(false);
		};
		match frame {
			Frame::Markup(markup) => out.push_str(&markup),
			Frame::Context(scope) => drop(scope),
			Frame::List {
				mut items,
				previous_text,
				raw,
			} => {
				let Some(item) = items.next() else {
					return Ok(true);
				};
				let mut contexts = Vec::new();
				let resolved = self.resolve(item, &mut contexts);
				let item = match resolved {
					Ok(item) => item,
					Err(error) => {
						release(contexts);
						return Err(error);
					}
				};
				self.stack.push(Frame::List {
					items,
					previous_text: item.is_text(),
					raw,
				});
				self.stack.extend(contexts.into_iter().map(Frame::Context));
				self.write_item(&item, previous_text, raw, out)?;
			}
		}
		Ok(true)
	}

	/// Run to completion.
	pub(crate) fn finish(&mut self, out: &mut String) -> RenderResult<()> {
		while self.step(out)? {}
		Ok(())
	}

	/// Invoke component layers until a boundary or a node description is reached.
	fn resolve(&self, mut item: Item, contexts: &mut Vec<ContextScope>) -> RenderResult<Item> {
		let rt = self.engine.runtime();
		loop {
			let (view, component) = match &item {
				Item::View(view) => match view.kind() {
					Kind::Component(component) if !component.is_boundary() => (view.clone(), component.clone()),
					_ => return Ok(item),
				},
				_ => return Ok(item),
			};
			tracing::trace!(component = component.name(), "rendering component to html");
			contexts.push(component.enter(rt));
			item = expand_output(component.render(view.props())?);
		}
	}

	fn write_item(&mut self, item: &Item, previous_text: bool, raw: bool, out: &mut String) -> RenderResult<()> {
		match item {
			Item::View(view) => match view.kind() {
				Kind::Text(content) if raw => out.push_str(content),
				Kind::Text(content) => {
					if previous_text {
						out.push_str(TEXT_SEPARATOR);
					}
					out.push_str(&html_escape(content));
				}
				Kind::Element(tag) => self.open_element(view, tag, out)?,
				Kind::Component(component) => {
					if let ComponentBody::Boundary(fallback) = &component.body {
						self.write_boundary(view, fallback.as_ref(), out)?;
					}
				}
				Kind::Fragment => self.open_slot(SlotKind::Fragment, expand_children(view.children()), out)?,
			},
			Item::Dynamic(dynamic) => {
				let items = expand_children(&[Child::View(dynamic.produce())]);
				self.open_slot(SlotKind::Dynamic, items, out)?;
			}
			Item::Chain(chain) => {
				let items = chain.select().map(|(_, view)| expand_branch(view)).unwrap_or_default();
				self.open_slot(SlotKind::Chain, items, out)?;
			}
			Item::Repeat(view) => {
				let items = repeat_of(view).map(|repeat| expand_views(repeat.items())).unwrap_or_default();
				self.open_slot(SlotKind::Repeat, items, out)?;
			}
			Item::Fragment(view) => self.open_slot(SlotKind::Fragment, expand_children(view.children()), out)?,
		}
		Ok(())
	}

	fn open_slot(&mut self, kind: SlotKind, items: Vec<Item>, out: &mut String) -> RenderResult<()> {
		check_keys(&items)?;
		out.push('<');
		out.push_str(SLOT_TAG);
		write_attributes(out, [(SLOT_ATTR, kind.as_str())]);
		out.push('>');
		self.push_children(SLOT_TAG, items, false);
		Ok(())
	}

	fn push_children(&mut self, tag: &str, items: Vec<Item>, raw: bool) {
		self.stack.push(Frame::Markup(format!("</{tag}>")));
		self.stack.push(Frame::List {
			items: items.into_iter(),
			previous_text: false,
			raw,
		});
	}

	fn open_element(&mut self, view: &View, tag: &str, out: &mut String) -> RenderResult<()> {
		out.push('<');
		out.push_str(tag);
		self.write_element_attributes(view, out);
		if is_void_element(tag) {
			out.push_str(" />");
			return Ok(());
		}
		out.push('>');

		let attributes = view.attributes();
		if let Some((value, _)) = builtin(attributes, Builtin::Text) {
			let content = value.current().unwrap_or(Value::Null).to_string();
			out.push_str(&html_escape(&content));
			self.stack.push(Frame::Markup(format!("</{tag}>")));
			return Ok(());
		}
		if let Some((value, _)) = builtin(attributes, Builtin::Html) {
			out.push_str(&value.current().unwrap_or(Value::Null).to_string());
			self.stack.push(Frame::Markup(format!("</{tag}>")));
			return Ok(());
		}
		let items = if directive::has_builtin(attributes, Builtin::For) {
			repeat_of(view).map(|repeat| expand_views(repeat.items())).unwrap_or_default()
		} else {
			expand_children(view.children())
		};
		check_keys(&items)?;
		self.push_children(tag, items, is_raw_text_element(tag));
		Ok(())
	}

	fn write_element_attributes(&mut self, view: &View, out: &mut String) {
		let cache_key = self
			.options
			.cache_static_attributes
			.then(|| fingerprint(view))
			.flatten();
		if let Some(cached) = cache_key.and_then(|key| self.cache.get(&key)) {
			out.push_str(cached);
			return;
		}

		let mut markup = String::new();
		let attributes = resolve_attributes(view);
		write_attributes(
			&mut markup,
			attributes.iter().map(|(name, value)| (name.as_str(), value.as_str())),
		);
		out.push_str(&markup);
		if let Some(key) = cache_key {
			self.cache.insert(key, markup);
		}
	}

	/// Render the children of a boundary to a buffer, falling back on error.
	fn write_boundary(
		&mut self,
		view: &View,
		fallback: &dyn Fn(&crate::RenderError) -> View,
		out: &mut String,
	) -> RenderResult<()> {
		let engine = self.engine.clone();
		let options = self.options.clone();
		let mut nested = Renderer::with_cache(
			engine.clone(),
			options.clone(),
			expand_children(view.children()),
			core::mem::take(&mut self.cache),
		);
		let mut buffer = String::new();
		let result = nested.finish(&mut buffer);
		self.cache = nested.take_cache();

		out.push('<');
		out.push_str(SLOT_TAG);
		write_attributes(out, [(SLOT_ATTR, SlotKind::Boundary.as_str())]);
		out.push('>');
		match result {
			Ok(()) => out.push_str(&buffer),
			Err(error) => {
				tracing::debug!(%error, "boundary caught a serialization error");
				let items = expand_children(&[Child::View(fallback(&error))]);
				let mut nested = Renderer::with_cache(engine, options, items, core::mem::take(&mut self.cache));
				let result = nested.finish(out);
				self.cache = nested.take_cache();
				result?;
			}
		}
		out.push_str("</");
		out.push_str(SLOT_TAG);
		out.push('>');
		Ok(())
	}

	fn take_cache(&mut self) -> HashMap<u64, String> {
		core::mem::take(&mut self.cache)
	}
}

impl Drop for Renderer {
	fn drop(&mut self) {
		// context guards must be released innermost first
		while let Some(frame) = self.stack.pop() {
			drop(frame);
		}
	}
}

fn release(mut contexts: Vec<ContextScope>) {
	while let Some(scope) = contexts.pop() {
		drop(scope);
	}
}

/// Final attribute list of an element, in the order a live node would hold them.
fn resolve_attributes(view: &View) -> IndexMap<String, String> {
	let mut attributes: IndexMap<String, String> = IndexMap::new();
	for (name, value) in view.attributes().iter() {
		if directive::event_name(name).is_some() {
			continue;
		}
		match directive::parse_directive_name(name) {
			None => set(&mut attributes, name, value.current().and_then(|value| value.to_attribute())),
			Some(parsed) => {
				if Builtin::from_name(&parsed.name) != Some(Builtin::Model) {
					continue;
				}
				let Some(value) = value.current() else {
					continue;
				};
				if is_checkable(view) {
					set(&mut attributes, "checked", value.is_truthy().then(String::new));
				} else {
					set(&mut attributes, "value", Some(value.to_string()));
				}
			}
		}
	}

	if let Some(visible) = builtin(view.attributes(), Builtin::Show).and_then(|(value, _)| value.current()) {
		let style = toggle_display_none(attributes.get("style").map(String::as_str), visible.is_truthy());
		set(&mut attributes, "style", style);
	}
	attributes
}

fn set(attributes: &mut IndexMap<String, String>, name: &str, value: Option<String>) {
	match value {
		Some(value) => {
			attributes.insert(name.to_string(), value);
		}
		None => {
			attributes.shift_remove(name);
		}
	}
}

/// Fingerprint of an element's attributes, if none of them are reactive.
fn fingerprint(view: &View) -> Option<u64> {
	let mut hasher = DefaultHasher::new();
	for (name, value) in view.attributes().iter() {
		match value {
			AttrValue::Static(value) => {
				name.hash(&mut hasher);
				format!("{value:?}").hash(&mut hasher);
			}
			AttrValue::Event(_) => {}
			AttrValue::Reactive(_) | AttrValue::Model(_) | AttrValue::Repeat(_) => return None,
		}
	}
	Some(hasher.finish())
}
