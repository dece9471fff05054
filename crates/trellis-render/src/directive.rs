//! Directive resolution.
//!
//! Attribute names select built-in behavior (`t-if`, `t-for`, `t-model`, ...)
//! or user directives registered on the [`Engine`](crate::Engine). Two
//! spellings are accepted for every directive: kebab (`t-else-if`,
//! `t-model:value.trim`) and camel (`tElseIf`, `tModel:value.trim`). Event
//! listeners are spelled `on:click` or `onClick`.
//!
//! ## Custom directives
//!
//! ```ignore
//! engine.register_directive(
//!     "highlight",
//!     DirectiveHooks::new()
//!         .on_mounted(|node, binding| node.set_attribute("data-hl", &binding.value.to_string()))
//!         .on_unmounted(|node, _| {
//!             node.remove_attribute("data-hl");
//!         }),
//! );
//!
//! let view = View::element("p").attr("t-highlight", "yellow");
//! ```

use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use trellis_reactive::Effect;

use crate::dom::Node;
use crate::engine::Engine;
use crate::view::{AttrValue, Attributes, Value};

const PREFIX: &str = "t-";

/// A directive attribute name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveName {
	/// Normalized kebab name without the `t-` prefix
	pub name: String,
	pub argument: Option<String>,
	pub modifiers: Vec<String>,
}

/// Parse a directive attribute name.
///
/// Returns `None` for ordinary attributes.
pub fn parse_directive_name(attribute: &str) -> Option<DirectiveName> {
	let body = if let Some(rest) = attribute.strip_prefix(PREFIX) {
		rest.to_string()
	} else {
		let rest = attribute.strip_prefix('t')?;
		if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
			return None;
		}
		let (head, tail) = split_head(rest);
		format!("{}{}", camel_to_kebab(head), tail)
	};

	let (head, tail) = split_head(&body);
	if head.is_empty() {
		return None;
	}
	let mut parts = tail.split('.');
	let argument = parts
		.next()
		.and_then(|arg| arg.strip_prefix(':'))
		.filter(|arg| !arg.is_empty())
		.map(str::to_string);
	let modifiers = tail
		.split('.')
		.skip(1)
		.filter(|modifier| !modifier.is_empty())
		.map(str::to_string)
		.collect();

	Some(DirectiveName {
		name: head.to_string(),
		argument,
		modifiers,
	})
}

/// Split `name:arg.mod` into `name` and `:arg.mod`.
fn split_head(s: &str) -> (&str, &str) {
	let end = s.find([':', '.']).unwrap_or(s.len());
	s.split_at(end)
}

fn camel_to_kebab(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 4);
	for (i, c) in s.chars().enumerate() {
		if c.is_ascii_uppercase() {
			if i > 0 {
				out.push('-');
			}
			out.push(c.to_ascii_lowercase());
		} else {
			out.push(c);
		}
	}
	out
}

/// Event named by a listener attribute (`on:click` or `onClick`).
pub fn event_name(attribute: &str) -> Option<String> {
	if let Some(event) = attribute.strip_prefix("on:") {
		return (!event.is_empty()).then(|| event.to_string());
	}
	let rest = attribute.strip_prefix("on")?;
	rest.starts_with(|c: char| c.is_ascii_uppercase())
		.then(|| rest.to_ascii_lowercase())
}

/// Directives handled by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
	Show,
	If,
	ElseIf,
	Else,
	For,
	Text,
	Html,
	Once,
	Model,
}

impl Builtin {
	pub(crate) fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"show" => Self::Show,
			"if" => Self::If,
			"else-if" => Self::ElseIf,
			"else" => Self::Else,
			"for" => Self::For,
			"text" => Self::Text,
			"html" => Self::Html,
			"once" => Self::Once,
			"model" => Self::Model,
			_ => return None,
		})
	}
}

/// Find the value bound to a built-in directive, in either spelling.
pub(crate) fn builtin(attributes: &Attributes, which: Builtin) -> Option<(&AttrValue, DirectiveName)> {
	attributes.iter().find_map(|(name, value)| {
		let parsed = parse_directive_name(name)?;
		(Builtin::from_name(&parsed.name) == Some(which)).then_some((value, parsed))
	})
}

pub(crate) fn has_builtin(attributes: &Attributes, which: Builtin) -> bool {
	builtin(attributes, which).is_some()
}

/// What a directive hook receives.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBinding {
	pub value: Value,
	/// Value before the last update; `None` until the first update
	pub old_value: Option<Value>,
	pub argument: Option<String>,
	pub modifiers: Vec<String>,
}

type Hook = Rc<dyn Fn(&Node, &DirectiveBinding)>;

/// Lifecycle hooks of a user directive.
#[derive(Clone, Default)]
pub struct DirectiveHooks {
	mounted: Option<Hook>,
	updated: Option<Hook>,
	unmounted: Option<Hook>,
}

impl DirectiveHooks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Called once the element is built
	pub fn on_mounted(mut self, f: impl Fn(&Node, &DirectiveBinding) + 'static) -> Self {
		self.mounted = Some(Rc::new(f));
		self
	}

	/// Called when a reactive bound value changes
	pub fn on_updated(mut self, f: impl Fn(&Node, &DirectiveBinding) + 'static) -> Self {
		self.updated = Some(Rc::new(f));
		self
	}

	/// Called when the element is unmounted
	pub fn on_unmounted(mut self, f: impl Fn(&Node, &DirectiveBinding) + 'static) -> Self {
		self.unmounted = Some(Rc::new(f));
		self
	}
}

impl core::fmt::Debug for DirectiveHooks {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("DirectiveHooks")
			.field("mounted", &self.mounted.is_some())
			.field("updated", &self.updated.is_some())
			.field("unmounted", &self.unmounted.is_some())
			.finish()
	}
}

/// User directives by name. The last registration of a name wins.
#[derive(Default)]
pub struct DirectiveRegistry {
	hooks: RefCell<HashMap<String, DirectiveHooks>>,
}

impl DirectiveRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `hooks` under `name` (`highlight`, `t-highlight` and
	/// `tHighlight` all name the same directive).
	pub fn register(&self, name: &str, hooks: DirectiveHooks) {
		let name = normalize(name);
		if self.hooks.borrow_mut().insert(name.clone(), hooks).is_some() {
			tracing::debug!(directive = %name, "directive re-registered; last registration wins");
		}
	}

	pub fn get(&self, name: &str) -> Option<DirectiveHooks> {
		self.hooks.borrow().get(&normalize(name)).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.hooks.borrow().contains_key(&normalize(name))
	}
}

impl core::fmt::Debug for DirectiveRegistry {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let hooks = self.hooks.borrow();
		let mut names: Vec<&String> = hooks.keys().collect();
		names.sort();
		f.debug_struct("DirectiveRegistry")
			.field("names", &names)
			.finish()
	}
}

fn normalize(name: &str) -> String {
	let camel = name.starts_with('t') && name[1..].starts_with(|c: char| c.is_ascii_uppercase());
	let candidate = if name.starts_with(PREFIX) || camel {
		name.to_string()
	} else {
		format!("{PREFIX}{name}")
	};
	parse_directive_name(&candidate).map_or_else(|| name.to_string(), |parsed| parsed.name)
}

/// A user directive attached to a live element.
pub(crate) struct BoundDirective {
	pub(crate) name: String,
	hooks: DirectiveHooks,
	binding: Rc<RefCell<DirectiveBinding>>,
	monitor: Option<Effect>,
}

impl BoundDirective {
	/// Attach `hooks` to `node` and fire `mounted`.
	///
	/// A reactive value gets a monitor that fires `updated` on every change.
	pub(crate) fn mount(
		engine: &Engine,
		node: &Node,
		directive: DirectiveName,
		hooks: DirectiveHooks,
		value: &AttrValue,
		frozen: bool,
	) -> Self {
		let rt = engine.runtime();
		let initial = rt.untrack(|| value.current()).unwrap_or(Value::Null);
		let binding = Rc::new(RefCell::new(DirectiveBinding {
			value: initial,
			old_value: None,
			argument: directive.argument,
			modifiers: directive.modifiers,
		}));
		if let Some(mounted) = &hooks.mounted {
			let snapshot = binding.borrow().clone();
			mounted(node, &snapshot);
		}
		let mut bound = Self {
			name: directive.name,
			hooks,
			binding,
			monitor: None,
		};
		if !frozen {
			bound.monitor(engine, node, value);
		}
		bound
	}

	/// Point the directive at a new value after a patch.
	pub(crate) fn rebind(&mut self, engine: &Engine, node: &Node, directive: DirectiveName, value: &AttrValue) {
		if let Some(monitor) = self.monitor.take() {
			monitor.dispose();
		}
		let next = engine
			.runtime()
			.untrack(|| value.current())
			.unwrap_or(Value::Null);
		let changed = {
			let mut binding = self.binding.borrow_mut();
			binding.argument = directive.argument;
			binding.modifiers = directive.modifiers;
			if binding.value == next {
				false
			} else {
				let previous = core::mem::replace(&mut binding.value, next);
				binding.old_value = Some(previous);
				true
			}
		};
		if changed && value.is_reactive() {
			self.fire_updated(node);
		}
		self.monitor(engine, node, value);
	}

	fn monitor(&mut self, engine: &Engine, node: &Node, value: &AttrValue) {
		let AttrValue::Reactive(read) = value else {
			return;
		};
		let read = read.clone();
		let binding = self.binding.clone();
		let updated = self.hooks.updated.clone();
		let weak = node.downgrade();
		let mut first = true;
		let rt = engine.runtime();
		self.monitor = Some(rt.detached(|| {
			Effect::new(rt, move || {
				let next = read();
				if core::mem::take(&mut first) {
					return;
				}
				let snapshot = {
					let mut binding = binding.borrow_mut();
					if binding.value == next {
						return;
					}
					let previous = core::mem::replace(&mut binding.value, next);
					binding.old_value = Some(previous);
					binding.clone()
				};
				if let (Some(updated), Some(node)) = (&updated, weak.upgrade()) {
					updated(&node, &snapshot);
				}
			})
		}));
	}

	fn fire_updated(&self, node: &Node) {
		if let Some(updated) = &self.hooks.updated {
			let snapshot = self.binding.borrow().clone();
			updated(node, &snapshot);
		}
	}

	/// Stop monitoring and fire `unmounted`.
	pub(crate) fn unmount(self, node: &Node) {
		if let Some(monitor) = self.monitor {
			monitor.dispose();
		}
		if let Some(unmounted) = &self.hooks.unmounted {
			let snapshot = self.binding.borrow().clone();
			unmounted(node, &snapshot);
		}
	}
}

/// Mount, rebind or unmount the user directives of `node` to match `attributes`.
pub(crate) fn sync_directives(engine: &Engine, node: &Node, attributes: &Attributes, frozen: bool) {
	let mut previous = core::mem::take(&mut node.meta_mut().directives);
	let mut next = Vec::new();
	for (attribute, value) in attributes.iter() {
		if event_name(attribute).is_some() {
			continue;
		}
		let Some(parsed) = parse_directive_name(attribute) else {
			continue;
		};
		if Builtin::from_name(&parsed.name).is_some() {
			continue;
		}
		if let Some(index) = previous.iter().position(|bound| bound.name == parsed.name) {
			let mut bound = previous.remove(index);
			bound.rebind(engine, node, parsed, value);
			next.push(bound);
			continue;
		}
		match engine.directives().get(&parsed.name) {
			Some(hooks) => next.push(BoundDirective::mount(engine, node, parsed, hooks, value, frozen)),
			None => tracing::debug!(directive = %parsed.name, "unknown directive ignored"),
		}
	}
	for stale in previous {
		stale.unmount(node);
	}
	node.meta_mut().directives = next;
}
