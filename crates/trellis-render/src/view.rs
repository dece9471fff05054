//! Descriptions of what to render.
//!
//! A [`View`] is an immutable, reference-counted description node: a kind
//! (element, text, component or fragment), props (attributes and children)
//! and an optional key. Views are created fresh on every render; the engine
//! turns them into live nodes and patches those nodes when a later render
//! produces different views.
//!
//! ## Example
//!
//! ```ignore
//! use trellis_render::view::{Repeat, View};
//!
//! let todos = todos.clone();
//! let list = View::element("ul")
//!     .attr("class", "todos")
//!     .repeat(Repeat::keyed(
//!         move || todos.get(),
//!         |todo| todo.id,
//!         |todo| View::element("li").child(todo.title.clone()).into_view(),
//!     ))
//!     .into_view();
//! ```

use core::any::TypeId;
use core::fmt;
use std::borrow::Cow;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trellis_reactive::{Context, ContextGuard, Runtime, Signal};

use crate::dom::{Event, EventHandler};
use crate::error::{RenderError, RenderResult};

/// A plain attribute or directive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Cow<'static, str>),
}

impl Value {
	/// Truthiness used by conditional directives
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Int(i) => *i != 0,
			Value::Float(f) => *f != 0.0 && !f.is_nan(),
			Value::Str(s) => !s.is_empty(),
		}
	}

	/// Serialized attribute value; `None` means the attribute is absent.
	pub fn to_attribute(&self) -> Option<String> {
		match self {
			Value::Null | Value::Bool(false) => None,
			Value::Bool(true) => Some(String::new()),
			other => Some(other.to_string()),
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => Ok(()),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Int(i) => write!(f, "{i}"),
			Value::Float(x) => write!(f, "{x}"),
			Value::Str(s) => f.write_str(s),
		}
	}
}

impl From<&'static str> for Value {
	fn from(s: &'static str) -> Self {
		Value::Str(Cow::Borrowed(s))
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::Str(Cow::Owned(s))
	}
}

impl From<Cow<'static, str>> for Value {
	fn from(s: Cow<'static, str>) -> Self {
		Value::Str(s)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Value::Int(i.into())
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<u32> for Value {
	fn from(i: u32) -> Self {
		Value::Int(i.into())
	}
}

impl From<usize> for Value {
	fn from(i: usize) -> Self {
		i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
	}
}

impl From<f64> for Value {
	fn from(x: f64) -> Self {
		Value::Float(x)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// Two-way binding between a form control and application state.
#[derive(Clone)]
pub struct Model {
	read: Rc<dyn Fn() -> Value>,
	write: Rc<dyn Fn(Value)>,
}

impl Model {
	pub fn new(read: impl Fn() -> Value + 'static, write: impl Fn(Value) + 'static) -> Self {
		Self {
			read: Rc::new(read),
			write: Rc::new(write),
		}
	}

	/// Bind a text control's value to a string signal
	pub fn text(signal: Signal<String>) -> Self {
		let reader = signal.clone();
		Self::new(move || Value::from(reader.get()), move |value| signal.set(value.to_string()))
	}

	/// Bind a checkbox's checked state to a boolean signal
	pub fn checked(signal: Signal<bool>) -> Self {
		let reader = signal.clone();
		Self::new(move || Value::Bool(reader.get()), move |value| signal.set(value.is_truthy()))
	}

	pub(crate) fn read(&self) -> Value {
		(self.read)()
	}

	pub(crate) fn write(&self, value: Value) {
		(self.write)(value)
	}
}

/// Item source for the `t-for` directive.
#[derive(Clone)]
pub struct Repeat {
	source: Rc<dyn Fn() -> Vec<View>>,
	reactive: bool,
}

impl Repeat {
	/// Items re-materialized whenever a signal read by `source` changes
	pub fn reactive(source: impl Fn() -> Vec<View> + 'static) -> Self {
		Self {
			source: Rc::new(source),
			reactive: true,
		}
	}

	/// Items expanded once
	pub fn eager(items: Vec<View>) -> Self {
		Self {
			source: Rc::new(move || items.clone()),
			reactive: false,
		}
	}

	/// Reactive items keyed by `key`, rendered with `render`
	pub fn keyed<T, K>(
		items: impl Fn() -> Vec<T> + 'static,
		key: impl Fn(&T) -> K + 'static,
		render: impl Fn(&T) -> View + 'static,
	) -> Self
	where
		K: Into<Key>,
	{
		Self::reactive(move || {
			items()
				.iter()
				.map(|item| render(item).with_key(key(item)))
				.collect()
		})
	}

	pub fn is_reactive(&self) -> bool {
		self.reactive
	}

	pub(crate) fn items(&self) -> Vec<View> {
		(self.source)()
	}

	pub(crate) fn ptr_eq(&self, other: &Repeat) -> bool {
		Rc::ptr_eq(&self.source, &other.source)
	}
}

/// Value bound to an attribute name.
#[derive(Clone)]
pub enum AttrValue {
	Static(Value),
	/// Re-evaluated by a dedicated effect
	Reactive(Rc<dyn Fn() -> Value>),
	Event(EventHandler),
	Model(Model),
	Repeat(Repeat),
}

impl AttrValue {
	pub fn reactive<V: Into<Value>>(f: impl Fn() -> V + 'static) -> Self {
		AttrValue::Reactive(Rc::new(move || f().into()))
	}

	pub fn event(handler: impl Fn(&Event) + 'static) -> Self {
		AttrValue::Event(Rc::new(handler))
	}

	pub fn is_reactive(&self) -> bool {
		matches!(self, AttrValue::Reactive(_) | AttrValue::Model(_))
	}

	/// Current value, reading signals in the caller's tracking context.
	pub(crate) fn current(&self) -> Option<Value> {
		match self {
			AttrValue::Static(value) => Some(value.clone()),
			AttrValue::Reactive(read) => Some(read()),
			AttrValue::Model(model) => Some(model.read()),
			AttrValue::Event(_) | AttrValue::Repeat(_) => None,
		}
	}
}

impl From<Value> for AttrValue {
	fn from(value: Value) -> Self {
		AttrValue::Static(value)
	}
}

impl From<Model> for AttrValue {
	fn from(model: Model) -> Self {
		AttrValue::Model(model)
	}
}

impl From<Repeat> for AttrValue {
	fn from(repeat: Repeat) -> Self {
		AttrValue::Repeat(repeat)
	}
}

impl fmt::Debug for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
			AttrValue::Reactive(_) => f.write_str("Reactive(..)"),
			AttrValue::Event(_) => f.write_str("Event(..)"),
			AttrValue::Model(_) => f.write_str("Model(..)"),
			AttrValue::Repeat(_) => f.write_str("Repeat(..)"),
		}
	}
}

/// Ordered attribute map.
#[derive(Clone, Default, Debug)]
pub struct Attributes(IndexMap<Cow<'static, str>, AttrValue>);

impl Attributes {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) {
		self.0.insert(name.into(), value.into());
	}

	pub fn get(&self, name: &str) -> Option<&AttrValue> {
		self.0.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
		self.0.iter().map(|(name, value)| (name.as_ref(), value))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Identity of a node across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
	Int(i64),
	Str(Cow<'static, str>),
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Int(i) => write!(f, "{i}"),
			Key::Str(s) => f.write_str(s),
		}
	}
}

impl From<&'static str> for Key {
	fn from(s: &'static str) -> Self {
		Key::Str(Cow::Borrowed(s))
	}
}

impl From<String> for Key {
	fn from(s: String) -> Self {
		Key::Str(Cow::Owned(s))
	}
}

impl From<i32> for Key {
	fn from(i: i32) -> Self {
		Key::Int(i.into())
	}
}

impl From<i64> for Key {
	fn from(i: i64) -> Self {
		Key::Int(i)
	}
}

impl From<u32> for Key {
	fn from(i: u32) -> Self {
		Key::Int(i.into())
	}
}

impl From<u64> for Key {
	fn from(i: u64) -> Self {
		i64::try_from(i).map_or_else(|_| Key::Str(Cow::Owned(i.to_string())), Key::Int)
	}
}

impl From<usize> for Key {
	fn from(i: usize) -> Self {
		i64::try_from(i).map_or_else(|_| Key::Str(Cow::Owned(i.to_string())), Key::Int)
	}
}

/// Attributes and children handed to an element or component.
#[derive(Clone, Default, Debug)]
pub struct Props {
	pub attributes: Attributes,
	pub children: Vec<Child>,
}

impl Props {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) -> Self {
		self.attributes.insert(name, value);
		self
	}

	pub fn child(mut self, child: impl Into<Child>) -> Self {
		self.children.push(child.into());
		self
	}

	pub fn get(&self, name: &str) -> Option<&AttrValue> {
		self.attributes.get(name)
	}

	/// Current value of an attribute. Reactive values are read, so a
	/// component body reading them re-renders when they change.
	pub fn value(&self, name: &str) -> Option<Value> {
		self.attributes.get(name).and_then(AttrValue::current)
	}

	pub fn children(&self) -> &[Child] {
		&self.children
	}
}

type RenderFn = Rc<dyn Fn(&Props) -> RenderResult<View>>;
pub(crate) type FallbackFn = Rc<dyn Fn(&RenderError) -> View>;

#[derive(Clone)]
pub(crate) enum ComponentBody {
	Render(RenderFn),
	Boundary(FallbackFn),
}

#[derive(Clone)]
struct ContextBinding(Rc<dyn Fn(&Runtime) -> ContextGuard>);

struct BoundaryMarker;

/// A function from props to a view.
///
/// Two component descriptions are the same component when they were created
/// from the same closure type, so a component defined in one place keeps its
/// live nodes across renders.
#[derive(Clone)]
pub struct Component {
	name: Cow<'static, str>,
	type_id: TypeId,
	pub(crate) body: ComponentBody,
	provides: Vec<ContextBinding>,
}

impl Component {
	pub fn new<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
	where
		F: Fn(&Props) -> RenderResult<View> + 'static,
	{
		Self {
			name: name.into(),
			type_id: TypeId::of::<F>(),
			body: ComponentBody::Render(Rc::new(render)),
			provides: Vec::new(),
		}
	}

	pub(crate) fn boundary(fallback: FallbackFn) -> Self {
		Self {
			name: Cow::Borrowed("ErrorBoundary"),
			type_id: TypeId::of::<BoundaryMarker>(),
			body: ComponentBody::Boundary(fallback),
			provides: Vec::new(),
		}
	}

	/// Provide `value` for `ctx` to this component and its descendants.
	pub fn provide<T: Clone + 'static>(mut self, ctx: Context<T>, value: T) -> Self {
		self.provides.push(ContextBinding(Rc::new(move |rt: &Runtime| {
			rt.provide_context(&ctx, value.clone())
		})));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn is_boundary(&self) -> bool {
		matches!(self.body, ComponentBody::Boundary(_))
	}

	/// Install the context values this component provides.
	pub(crate) fn enter(&self, rt: &Runtime) -> ContextScope {
		ContextScope(self.provides.iter().map(|binding| (binding.0)(rt)).collect())
	}

	/// Invoke the component body.
	pub(crate) fn render(&self, props: &Props) -> RenderResult<View> {
		match &self.body {
			ComponentBody::Render(render) => render(props),
			ComponentBody::Boundary(_) => Ok(View::fragment(props.children.clone())),
		}
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Component").field("name", &self.name).finish()
	}
}

/// Context values installed around a component; removed in reverse order on drop.
pub(crate) struct ContextScope(Vec<ContextGuard>);

impl Drop for ContextScope {
	fn drop(&mut self) {
		while let Some(guard) = self.0.pop() {
			drop(guard);
		}
	}
}

/// A child produced by a function, kept up to date by its own effect.
#[derive(Clone)]
pub struct DynamicChild(Rc<dyn Fn() -> View>);

impl DynamicChild {
	pub fn new<V: IntoView>(f: impl Fn() -> V + 'static) -> Self {
		Self(Rc::new(move || f().into_view()))
	}

	pub(crate) fn produce(&self) -> View {
		(self.0)()
	}

	pub fn ptr_eq(&self, other: &DynamicChild) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for DynamicChild {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("DynamicChild(..)")
	}
}

#[derive(Clone, Debug)]
pub enum Child {
	View(View),
	Dynamic(DynamicChild),
}

impl From<View> for Child {
	fn from(view: View) -> Self {
		Child::View(view)
	}
}

impl From<ViewBuilder> for Child {
	fn from(builder: ViewBuilder) -> Self {
		Child::View(builder.into_view())
	}
}

impl From<DynamicChild> for Child {
	fn from(dynamic: DynamicChild) -> Self {
		Child::Dynamic(dynamic)
	}
}

impl From<&'static str> for Child {
	fn from(text: &'static str) -> Self {
		Child::View(View::text(text))
	}
}

impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::View(View::text(text))
	}
}

#[derive(Clone, Debug)]
pub enum Kind {
	Element(Cow<'static, str>),
	Text(Cow<'static, str>),
	Component(Component),
	Fragment,
}

#[derive(Debug)]
struct ViewNode {
	kind: Kind,
	props: Props,
	key: Option<Key>,
}

/// An immutable description node. Cloning shares it.
#[derive(Clone)]
pub struct View(Rc<ViewNode>);

/// Build a description from its parts.
pub fn h(kind: Kind, props: Props, key: Option<Key>) -> View {
	View(Rc::new(ViewNode { kind, props, key }))
}

impl View {
	/// Creates an element builder.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> ViewBuilder {
		ViewBuilder::new(Kind::Element(tag.into()))
	}

	/// Creates a text view.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		h(Kind::Text(content.into()), Props::default(), None)
	}

	/// Creates a fragment: its children are spliced into the parent.
	pub fn fragment(children: impl IntoIterator<Item = impl Into<Child>>) -> Self {
		let props = Props {
			attributes: Attributes::default(),
			children: children.into_iter().map(Into::into).collect(),
		};
		h(Kind::Fragment, props, None)
	}

	/// An empty fragment
	pub fn empty() -> Self {
		h(Kind::Fragment, Props::default(), None)
	}

	/// Creates a component builder; attributes and children become its props.
	pub fn component(component: Component) -> ViewBuilder {
		ViewBuilder::new(Kind::Component(component))
	}

	/// Renders `children`, or `fallback` when building them fails.
	///
	/// Errors raised later by effects inside the children (a dynamic child or
	/// a reactive list re-rendering) also switch to the fallback.
	pub fn boundary(
		fallback: impl Fn(&RenderError) -> View + 'static,
		children: impl IntoIterator<Item = impl Into<Child>>,
	) -> Self {
		let props = Props {
			attributes: Attributes::default(),
			children: children.into_iter().map(Into::into).collect(),
		};
		h(Kind::Component(Component::boundary(Rc::new(fallback))), props, None)
	}

	/// A fragment hosting a `t-for` list
	pub fn each(repeat: Repeat) -> Self {
		ViewBuilder::new(Kind::Fragment).repeat(repeat).into_view()
	}

	pub fn kind(&self) -> &Kind {
		&self.0.kind
	}

	pub fn props(&self) -> &Props {
		&self.0.props
	}

	pub fn attributes(&self) -> &Attributes {
		&self.0.props.attributes
	}

	pub fn children(&self) -> &[Child] {
		&self.0.props.children
	}

	pub fn key(&self) -> Option<&Key> {
		self.0.key.as_ref()
	}

	pub fn tag(&self) -> Option<&str> {
		match &self.0.kind {
			Kind::Element(tag) => Some(tag),
			_ => None,
		}
	}

	/// Whether both handles are the same description
	pub fn ptr_eq(&self, other: &View) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// A copy of this description with another key
	pub fn with_key(&self, key: impl Into<Key>) -> View {
		h(self.0.kind.clone(), self.0.props.clone(), Some(key.into()))
	}
}

impl fmt::Debug for View {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("View");
		debug.field("kind", &self.0.kind);
		if let Some(key) = &self.0.key {
			debug.field("key", key);
		}
		if !self.0.props.attributes.is_empty() {
			debug.field("attributes", &self.0.props.attributes);
		}
		if !self.0.props.children.is_empty() {
			debug.field("children", &self.0.props.children);
		}
		debug.finish()
	}
}

/// Builder for element and component descriptions.
#[derive(Clone, Debug)]
pub struct ViewBuilder {
	kind: Kind,
	props: Props,
	key: Option<Key>,
}

impl ViewBuilder {
	fn new(kind: Kind) -> Self {
		Self {
			kind,
			props: Props::default(),
			key: None,
		}
	}

	/// Adds a static attribute.
	pub fn attr(self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
		self.bind(name, AttrValue::Static(value.into()))
	}

	/// Adds an attribute kept in sync with `f`.
	pub fn reactive<V: Into<Value>>(self, name: impl Into<Cow<'static, str>>, f: impl Fn() -> V + 'static) -> Self {
		self.bind(name, AttrValue::reactive(f))
	}

	/// Adds an event listener (`on:<event>`).
	pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
		self.bind(format!("on:{event}"), AttrValue::event(handler))
	}

	/// Binds any value under any attribute or directive name.
	pub fn bind(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) -> Self {
		self.props.attributes.insert(name, value);
		self
	}

	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	pub fn child(mut self, child: impl Into<Child>) -> Self {
		self.props.children.push(child.into());
		self
	}

	pub fn children(mut self, children: impl IntoIterator<Item = impl Into<Child>>) -> Self {
		self.props
			.children
			.extend(children.into_iter().map(Into::into));
		self
	}

	/// Adds a child produced by `f` and kept up to date on its own.
	pub fn dynamic<V: IntoView>(self, f: impl Fn() -> V + 'static) -> Self {
		self.child(DynamicChild::new(f))
	}

	/// `t-if`: start a conditional chain
	pub fn when(self, guard: impl Fn() -> bool + 'static) -> Self {
		self.bind("t-if", AttrValue::reactive(guard))
	}

	/// `t-else-if`
	pub fn else_when(self, guard: impl Fn() -> bool + 'static) -> Self {
		self.bind("t-else-if", AttrValue::reactive(guard))
	}

	/// `t-else`
	pub fn otherwise(self) -> Self {
		self.bind("t-else", Value::Bool(true))
	}

	/// `t-show`
	pub fn show_when(self, visible: impl Fn() -> bool + 'static) -> Self {
		self.bind("t-show", AttrValue::reactive(visible))
	}

	/// `t-once`
	pub fn once(self) -> Self {
		self.bind("t-once", Value::Bool(true))
	}

	/// `t-model`
	pub fn model(self, model: Model) -> Self {
		self.bind("t-model", model)
	}

	/// `t-for`
	pub fn repeat(self, repeat: Repeat) -> Self {
		self.bind("t-for", repeat)
	}

	/// `t-text`
	pub fn text_content(self, text: impl Into<AttrValue>) -> Self {
		self.bind("t-text", text)
	}

	/// `t-html`
	pub fn inner_html(self, markup: impl Into<AttrValue>) -> Self {
		self.bind("t-html", markup)
	}
}

/// Shorthand for [`View::element`].
pub fn el(tag: impl Into<Cow<'static, str>>) -> ViewBuilder {
	View::element(tag)
}

/// Shorthand for [`View::text`].
pub fn text(content: impl Into<Cow<'static, str>>) -> View {
	View::text(content)
}

/// Shorthand for [`View::fragment`].
pub fn fragment(children: impl IntoIterator<Item = impl Into<Child>>) -> View {
	View::fragment(children)
}

/// A component description built from a render function.
pub fn component<F>(name: impl Into<Cow<'static, str>>, render: F) -> ViewBuilder
where
	F: Fn(&Props) -> RenderResult<View> + 'static,
{
	View::component(Component::new(name, render))
}

/// Shorthand for [`DynamicChild::new`].
pub fn dynamic<V: IntoView>(f: impl Fn() -> V + 'static) -> DynamicChild {
	DynamicChild::new(f)
}

/// Shorthand for [`View::each`].
pub fn each(repeat: Repeat) -> View {
	View::each(repeat)
}

/// Conversion into a description.
pub trait IntoView {
	fn into_view(self) -> View;
}

impl IntoView for View {
	fn into_view(self) -> View {
		self
	}
}

impl IntoView for ViewBuilder {
	fn into_view(self) -> View {
		h(self.kind, self.props, self.key)
	}
}

impl IntoView for &'static str {
	fn into_view(self) -> View {
		View::text(self)
	}
}

impl IntoView for String {
	fn into_view(self) -> View {
		View::text(self)
	}
}

impl<T: IntoView> IntoView for Option<T> {
	fn into_view(self) -> View {
		self.map_or_else(View::empty, IntoView::into_view)
	}
}

impl<T: IntoView> IntoView for Vec<T> {
	fn into_view(self) -> View {
		View::fragment(self.into_iter().map(IntoView::into_view))
	}
}

/// What a root render function may return.
pub trait IntoRender {
	fn into_render(self) -> RenderResult<View>;
}

impl<T: IntoView> IntoRender for T {
	fn into_render(self) -> RenderResult<View> {
		Ok(self.into_view())
	}
}

impl IntoRender for RenderResult<View> {
	fn into_render(self) -> RenderResult<View> {
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::Null, false)]
	#[case(Value::Bool(true), true)]
	#[case(Value::Int(0), false)]
	#[case(Value::Float(f64::NAN), false)]
	#[case(Value::from(""), false)]
	#[case(Value::from("x"), true)]
	fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(value.is_truthy(), expected);
	}

	#[rstest]
	#[case(Value::Null, None)]
	#[case(Value::Bool(false), None)]
	#[case(Value::Bool(true), Some(""))]
	#[case(Value::Int(3), Some("3"))]
	#[case(Value::from("a"), Some("a"))]
	fn test_to_attribute(#[case] value: Value, #[case] expected: Option<&str>) {
		assert_eq!(value.to_attribute().as_deref(), expected);
	}

	#[rstest]
	fn test_value_serde_untagged() {
		let values: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 1.5, "s"]"#).unwrap();

		assert_eq!(
			values,
			vec![
				Value::Null,
				Value::Bool(true),
				Value::Int(3),
				Value::Float(1.5),
				Value::from("s")
			]
		);
	}

	#[rstest]
	fn test_builder_collects_props() {
		let view = View::element("div")
			.attr("id", "main")
			.key(7)
			.child("hello")
			.child(View::element("span"))
			.into_view();

		assert_eq!(view.tag(), Some("div"));
		assert_eq!(view.key(), Some(&Key::Int(7)));
		assert_eq!(view.children().len(), 2);
		assert!(matches!(view.attributes().get("id"), Some(AttrValue::Static(Value::Str(s))) if s == "main"));
	}

	#[rstest]
	fn test_component_identity_follows_closure_type() {
		fn make() -> Component {
			Component::new("Card", |_| Ok(View::text("card")))
		}
		let other = Component::new("Card", |_| Ok(View::text("card")));

		assert_eq!(make().type_id(), make().type_id());
		assert_ne!(make().type_id(), other.type_id());
	}

	#[rstest]
	fn test_with_key_keeps_content() {
		let view = View::element("li").child("x").into_view();
		let keyed = view.with_key("a");

		assert!(!keyed.ptr_eq(&view));
		assert_eq!(keyed.key(), Some(&Key::from("a")));
		assert_eq!(keyed.children().len(), 1);
	}

	#[rstest]
	fn test_props_value_reads_reactive() {
		let props = Props::new()
			.attr("label", Value::from("a"))
			.attr("count", AttrValue::reactive(|| 3));

		assert_eq!(props.value("label"), Some(Value::from("a")));
		assert_eq!(props.value("count"), Some(Value::Int(3)));
		assert_eq!(props.value("missing"), None);
	}
}
