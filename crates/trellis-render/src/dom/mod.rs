//! Live output tree.
//!
//! An in-memory platform tree the engine renders into: elements, text and
//! comment nodes with attributes, parent links and event listeners. Besides
//! the platform data every node carries the engine's render metadata (key,
//! the descriptions it was built from, bound effects, unmount callbacks).
//!
//! ```ignore
//! let container = Node::element("div");
//! container.set_inner_html("<p>hello</p>");
//! assert_eq!(container.inner_html(), "<p>hello</p>");
//! ```

mod parse;

use core::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::html::{SLOT_TAG, TEXT_SEPARATOR, html_escape, is_void_element, write_attributes};
use crate::meta::NodeMeta;

pub use parse::parse_html;

/// Element namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
	#[default]
	Html,
	Svg,
}

impl Namespace {
	/// Namespace of the children of a `tag` element living in `self`.
	pub(crate) fn for_children_of(self, tag: &str) -> Namespace {
		if tag.eq_ignore_ascii_case("svg") {
			Namespace::Svg
		} else if tag == "foreignObject" {
			Namespace::Html
		} else {
			self
		}
	}

	/// Namespace of a `tag` element created inside `self`.
	pub(crate) fn for_element(self, tag: &str) -> Namespace {
		if tag.eq_ignore_ascii_case("svg") {
			Namespace::Svg
		} else {
			self
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Element,
	Text,
	Comment,
}

/// A dispatched event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
	pub kind: String,
	/// New `value` of a form control, for `input`/`change`
	pub value: Option<String>,
	/// New checked state of a checkbox or radio, for `change`
	pub checked: Option<bool>,
}

impl Event {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			..Self::default()
		}
	}

	/// An `input` event carrying the control's new value
	pub fn input(value: impl Into<String>) -> Self {
		Self {
			kind: "input".into(),
			value: Some(value.into()),
			checked: None,
		}
	}

	/// A `change` event carrying the control's new checked state
	pub fn toggle(checked: bool) -> Self {
		Self {
			kind: "change".into(),
			value: None,
			checked: Some(checked),
		}
	}
}

/// Event listener function.
pub type EventHandler = Rc<dyn Fn(&Event)>;

enum NodeData {
	Element {
		tag: String,
		namespace: Namespace,
		attributes: IndexMap<String, String>,
	},
	Text(String),
	Comment(String),
}

struct Listener {
	event: String,
	handler: EventHandler,
}

struct NodeInner {
	data: RefCell<NodeData>,
	parent: RefCell<Weak<NodeInner>>,
	children: RefCell<Vec<Node>>,
	listeners: RefCell<Vec<Listener>>,
	meta: RefCell<NodeMeta>,
}

/// Handle to a live node. Clones refer to the same node.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Non-owning handle to a live node.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
	pub fn upgrade(&self) -> Option<Node> {
		self.0.upgrade().map(Node)
	}
}

impl Node {
	fn from_data(data: NodeData) -> Self {
		Self(Rc::new(NodeInner {
			data: RefCell::new(data),
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
			listeners: RefCell::new(Vec::new()),
			meta: RefCell::new(NodeMeta::default()),
		}))
	}

	/// Create an HTML element
	pub fn element(tag: impl Into<String>) -> Self {
		Self::element_ns(tag, Namespace::Html)
	}

	pub fn element_ns(tag: impl Into<String>, namespace: Namespace) -> Self {
		Self::from_data(NodeData::Element {
			tag: tag.into(),
			namespace,
			attributes: IndexMap::new(),
		})
	}

	pub fn text(content: impl Into<String>) -> Self {
		Self::from_data(NodeData::Text(content.into()))
	}

	pub fn comment(content: impl Into<String>) -> Self {
		Self::from_data(NodeData::Comment(content.into()))
	}

	pub fn downgrade(&self) -> WeakNode {
		WeakNode(Rc::downgrade(&self.0))
	}

	/// Whether both handles refer to the same node
	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn node_type(&self) -> NodeType {
		match &*self.0.data.borrow() {
			NodeData::Element { .. } => NodeType::Element,
			NodeData::Text(_) => NodeType::Text,
			NodeData::Comment(_) => NodeType::Comment,
		}
	}

	pub fn is_element(&self) -> bool {
		self.node_type() == NodeType::Element
	}

	pub fn is_text(&self) -> bool {
		self.node_type() == NodeType::Text
	}

	pub fn is_comment(&self) -> bool {
		self.node_type() == NodeType::Comment
	}

	/// Tag name of an element
	pub fn tag_name(&self) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	/// Whether this is an element with the given tag (ASCII case-insensitive)
	pub fn has_tag(&self, name: &str) -> bool {
		match &*self.0.data.borrow() {
			NodeData::Element { tag, .. } => tag.eq_ignore_ascii_case(name),
			_ => false,
		}
	}

	pub fn namespace(&self) -> Option<Namespace> {
		match &*self.0.data.borrow() {
			NodeData::Element { namespace, .. } => Some(*namespace),
			_ => None,
		}
	}

	/// Whether this is a slot wrapper placed by the engine
	pub fn is_slot(&self) -> bool {
		self.has_tag(SLOT_TAG)
	}

	pub fn attribute(&self, name: &str) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
			_ => None,
		}
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		match &*self.0.data.borrow() {
			NodeData::Element { attributes, .. } => attributes.contains_key(name),
			_ => false,
		}
	}

	/// Attributes in insertion order
	pub fn attributes(&self) -> Vec<(String, String)> {
		match &*self.0.data.borrow() {
			NodeData::Element { attributes, .. } => attributes
				.iter()
				.map(|(name, value)| (name.clone(), value.clone()))
				.collect(),
			_ => Vec::new(),
		}
	}

	/// Set an attribute. No-op on text and comment nodes.
	pub fn set_attribute(&self, name: &str, value: &str) {
		if let NodeData::Element { attributes, .. } = &mut *self.0.data.borrow_mut() {
			match attributes.get_mut(name) {
				Some(current) if current == value => {}
				Some(current) => *current = value.to_string(),
				None => {
					attributes.insert(name.to_string(), value.to_string());
				}
			}
		}
	}

	pub fn remove_attribute(&self, name: &str) -> bool {
		match &mut *self.0.data.borrow_mut() {
			NodeData::Element { attributes, .. } => attributes.shift_remove(name).is_some(),
			_ => false,
		}
	}

	pub(crate) fn clear_attributes(&self) {
		if let NodeData::Element { attributes, .. } = &mut *self.0.data.borrow_mut() {
			attributes.clear();
		}
	}

	/// Data of a text or comment node
	pub fn text_data(&self) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Text(text) | NodeData::Comment(text) => Some(text.clone()),
			NodeData::Element { .. } => None,
		}
	}

	/// Replace the data of a text or comment node
	pub fn set_text_data(&self, content: &str) {
		match &mut *self.0.data.borrow_mut() {
			NodeData::Text(text) | NodeData::Comment(text) => {
				if text != content {
					*text = content.to_string();
				}
			}
			NodeData::Element { .. } => {}
		}
	}

	/// Concatenated text of this node and its descendants
	pub fn text_content(&self) -> String {
		match &*self.0.data.borrow() {
			NodeData::Text(text) => text.clone(),
			NodeData::Comment(_) => String::new(),
			NodeData::Element { .. } => self.children().iter().map(Node::text_content).collect(),
		}
	}

	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	pub fn children(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	pub fn child(&self, index: usize) -> Option<Node> {
		self.0.children.borrow().get(index).cloned()
	}

	pub fn first_child(&self) -> Option<Node> {
		self.child(0)
	}

	pub fn child_count(&self) -> usize {
		self.0.children.borrow().len()
	}

	pub fn index_of(&self, child: &Node) -> Option<usize> {
		self.0
			.children
			.borrow()
			.iter()
			.position(|candidate| candidate.ptr_eq(child))
	}

	/// Append `child`, moving it out of its current parent
	pub fn append_child(&self, child: &Node) {
		child.detach();
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().push(child.clone());
	}

	/// Insert `child` before `reference`, or at the end when `reference` is
	/// `None` or not a child of this node.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		if reference.is_some_and(|reference| reference.ptr_eq(child)) {
			return;
		}
		child.detach();
		let index = reference
			.and_then(|reference| self.index_of(reference))
			.unwrap_or_else(|| self.child_count());
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().insert(index, child.clone());
	}

	pub fn remove_child(&self, child: &Node) -> bool {
		let Some(index) = self.index_of(child) else {
			return false;
		};
		self.0.children.borrow_mut().remove(index);
		*child.0.parent.borrow_mut() = Weak::new();
		true
	}

	/// Put `new` where `old` is. Returns `false` if `old` is not a child.
	pub fn replace_child(&self, new: &Node, old: &Node) -> bool {
		if new.ptr_eq(old) {
			return self.index_of(old).is_some();
		}
		new.detach();
		let Some(index) = self.index_of(old) else {
			return false;
		};
		*new.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut()[index] = new.clone();
		*old.0.parent.borrow_mut() = Weak::new();
		true
	}

	/// Remove this node from its parent
	pub fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.remove_child(self);
		}
	}

	/// Detach every child. Render metadata is left alone.
	pub fn clear_children(&self) {
		let children = core::mem::take(&mut *self.0.children.borrow_mut());
		for child in children {
			*child.0.parent.borrow_mut() = Weak::new();
		}
	}

	/// Replace the children with parsed `markup`.
	pub fn set_inner_html(&self, markup: &str) {
		let namespace = self.namespace().unwrap_or_default();
		let tag = self.tag_name().unwrap_or_default();
		let nodes = parse::parse_fragment(markup, namespace.for_children_of(&tag));
		self.clear_children();
		for node in &nodes {
			self.append_child(node);
		}
	}

	pub fn add_event_listener(&self, event: impl Into<String>, handler: EventHandler) {
		self.0.listeners.borrow_mut().push(Listener {
			event: event.into(),
			handler,
		});
	}

	/// Remove the first `event` listener that is `handler`.
	pub fn remove_event_listener(&self, event: &str, handler: &EventHandler) {
		let mut listeners = self.0.listeners.borrow_mut();
		if let Some(index) = listeners
			.iter()
			.position(|listener| listener.event == event && Rc::ptr_eq(&listener.handler, handler))
		{
			listeners.remove(index);
		}
	}

	pub fn listener_count(&self) -> usize {
		self.0.listeners.borrow().len()
	}

	pub(crate) fn clear_event_listeners(&self) {
		self.0.listeners.borrow_mut().clear();
	}

	/// Deliver `event` to this node's listeners.
	///
	/// A form-control event updates the node's `value`/`checked` attribute
	/// first, like a browser would before listeners run.
	pub fn dispatch_event(&self, event: &Event) {
		if let Some(value) = &event.value {
			self.set_attribute("value", value);
		}
		match event.checked {
			Some(true) => self.set_attribute("checked", ""),
			Some(false) => {
				self.remove_attribute("checked");
			}
			None => {}
		}

		let handlers: Vec<EventHandler> = self
			.0
			.listeners
			.borrow()
			.iter()
			.filter(|listener| listener.event == event.kind)
			.map(|listener| listener.handler.clone())
			.collect();
		for handler in handlers {
			handler(event);
		}
	}

	/// Register a callback run when the engine unmounts this node.
	pub fn on_unmount(&self, f: impl FnOnce() + 'static) {
		self.0.meta.borrow_mut().unmount.push(Box::new(f));
	}

	pub(crate) fn meta(&self) -> Ref<'_, NodeMeta> {
		self.0.meta.borrow()
	}

	pub(crate) fn meta_mut(&self) -> RefMut<'_, NodeMeta> {
		self.0.meta.borrow_mut()
	}

	/// Serialize this node and its descendants.
	pub fn outer_html(&self) -> String {
		let mut out = String::new();
		self.write_html(&mut out);
		out
	}

	/// Serialize the children of this node.
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		write_children(&self.children(), self.raw_text(), &mut out);
		out
	}

	fn raw_text(&self) -> bool {
		self.tag_name()
			.is_some_and(|tag| crate::html::is_raw_text_element(&tag))
	}

	fn write_html(&self, out: &mut String) {
		let data = self.0.data.borrow();
		match &*data {
			NodeData::Text(text) => out.push_str(&html_escape(text)),
			NodeData::Comment(text) => {
				out.push_str("<!--");
				out.push_str(text);
				out.push_str("-->");
			}
			NodeData::Element { tag, attributes, .. } => {
				out.push('<');
				out.push_str(tag);
				write_attributes(
					out,
					attributes
						.iter()
						.map(|(name, value)| (name.as_str(), value.as_str())),
				);
				if is_void_element(tag) {
					out.push_str(" />");
					return;
				}
				out.push('>');
				let raw = crate::html::is_raw_text_element(tag);
				let tag = tag.clone();
				drop(data);
				write_children(&self.children(), raw, out);
				out.push_str("</");
				out.push_str(&tag);
				out.push('>');
			}
		}
	}
}

fn write_children(children: &[Node], raw: bool, out: &mut String) {
	let mut previous_text = false;
	for child in children {
		if raw {
			out.push_str(&child.text_data().unwrap_or_default());
			continue;
		}
		let is_text = child.is_text();
		if is_text && previous_text {
			out.push_str(TEXT_SEPARATOR);
		}
		previous_text = is_text;
		child.write_html(out);
	}
}

impl core::fmt::Debug for Node {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.write_str(&self.outer_html())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::Cell;
	use rstest::rstest;

	#[rstest]
	fn test_append_moves_between_parents() {
		let a = Node::element("div");
		let b = Node::element("div");
		let child = Node::text("x");

		a.append_child(&child);
		b.append_child(&child);

		assert_eq!(a.child_count(), 0);
		assert!(child.parent().is_some_and(|p| p.ptr_eq(&b)));
	}

	#[rstest]
	fn test_insert_before_reorders_existing_child() {
		let parent = Node::element("ul");
		let (one, two, three) = (Node::text("1"), Node::text("2"), Node::text("3"));
		for node in [&one, &two, &three] {
			parent.append_child(node);
		}

		parent.insert_before(&three, Some(&one));
		parent.insert_before(&one, None);

		assert_eq!(parent.text_content(), "321");
		assert_eq!(parent.child_count(), 3);
	}

	#[rstest]
	fn test_replace_child() {
		let parent = Node::element("div");
		let old = Node::element("span");
		let new = Node::element("em");
		parent.append_child(&old);

		assert!(parent.replace_child(&new, &old));

		assert!(old.parent().is_none());
		assert_eq!(parent.inner_html(), "<em></em>");
	}

	#[rstest]
	fn test_serialization_escapes_and_separates_text() {
		let div = Node::element("div");
		div.set_attribute("title", "a \"quote\"");
		div.append_child(&Node::text("a<b"));
		div.append_child(&Node::text("c"));
		div.append_child(&Node::element("br"));

		assert_eq!(
			div.outer_html(),
			"<div title=\"a &quot;quote&quot;\">a&lt;b<!---->c<br /></div>"
		);
	}

	#[rstest]
	fn test_dispatch_input_updates_value_then_calls_listener() {
		let input = Node::element("input");
		let seen = Rc::new(RefCell::new(None));

		let (s, node) = (seen.clone(), input.clone());
		input.add_event_listener(
			"input",
			Rc::new(move |event: &Event| {
				*s.borrow_mut() = node.attribute("value").zip(event.value.clone());
			}),
		);
		input.dispatch_event(&Event::input("abc"));

		assert_eq!(*seen.borrow(), Some(("abc".to_string(), "abc".to_string())));
	}

	#[rstest]
	fn test_dispatch_only_matching_listeners() {
		let button = Node::element("button");
		let clicks = Rc::new(Cell::new(0));

		let c = clicks.clone();
		button.add_event_listener("click", Rc::new(move |_: &Event| c.set(c.get() + 1)));
		button.dispatch_event(&Event::new("click"));
		button.dispatch_event(&Event::new("keydown"));

		assert_eq!(clicks.get(), 1);
	}

	#[rstest]
	fn test_set_inner_html_round_trip() {
		let div = Node::element("div");
		div.set_inner_html("<p class=\"x\">hi <b>there</b></p><br />");

		assert_eq!(div.inner_html(), "<p class=\"x\">hi <b>there</b></p><br />");
	}

	#[rstest]
	fn test_namespace_rules() {
		assert_eq!(Namespace::Html.for_element("svg"), Namespace::Svg);
		assert_eq!(Namespace::Svg.for_children_of("foreignObject"), Namespace::Html);
		assert_eq!(Namespace::Svg.for_children_of("g"), Namespace::Svg);
	}
}
