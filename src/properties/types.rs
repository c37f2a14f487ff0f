//! Per-type attribute tables
//!
//! A record type describes its readable attributes once through
//! [`BeanType::builder`]. Readers are type-erased so that chains can cross
//! from one record type into a nested one.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use super::introspector;
use super::value::{BeanRef, Value, ValueKind};
use crate::events::{ChangeSupport, Observable};

/// A record type that publishes its attribute table.
pub trait Introspect: Any + Send + Sync + Sized {
    /// Build the attribute table for this type.
    ///
    /// Called at most a handful of times per process; the result is cached
    /// by [`introspector::bean_type`].
    fn describe() -> BeanType;
}

/// Value produced by reading one attribute of one record.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// Attribute is unset / null
    Absent,
    /// A scalar
    Value(Value),
    /// A nested record
    Bean(BeanRef),
    /// A collection or array; each element is read independently
    Many(Vec<Attribute>),
}

impl Attribute {
    /// Wrap a nested record
    pub fn bean<T: Any + Send + Sync>(bean: Arc<T>) -> Self {
        Attribute::Bean(BeanRef::new(bean))
    }

    /// Build a collection from anything convertible into attributes
    pub fn many<I, A>(items: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        Attribute::Many(items.into_iter().map(Into::into).collect())
    }

    /// Returns true if the attribute is unset
    pub fn is_absent(&self) -> bool {
        matches!(self, Attribute::Absent)
    }
}

impl From<Value> for Attribute {
    fn from(v: Value) -> Self {
        Attribute::Value(v)
    }
}

impl From<Option<Value>> for Attribute {
    fn from(v: Option<Value>) -> Self {
        v.map_or(Attribute::Absent, Attribute::Value)
    }
}

impl From<BeanRef> for Attribute {
    fn from(v: BeanRef) -> Self {
        Attribute::Bean(v)
    }
}

macro_rules! scalar_attribute {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Attribute {
                fn from(v: $t) -> Self {
                    Attribute::Value(Value::from(v))
                }
            }

            impl From<Option<$t>> for Attribute {
                fn from(v: Option<$t>) -> Self {
                    v.map_or(Attribute::Absent, |v| Attribute::Value(Value::from(v)))
                }
            }
        )*
    };
}

scalar_attribute!(bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, char, String, &str, &String);

impl<T: Any + Send + Sync> From<Arc<T>> for Attribute {
    fn from(v: Arc<T>) -> Self {
        Attribute::bean(v)
    }
}

impl<T: Any + Send + Sync> From<Option<Arc<T>>> for Attribute {
    fn from(v: Option<Arc<T>>) -> Self {
        v.map_or(Attribute::Absent, Attribute::bean)
    }
}

/// Lazily produces the table of a nested record type.
pub type BeanTypeFn = fn() -> Arc<BeanType>;

type Reader = Arc<dyn Fn(&dyn Any) -> Attribute + Send + Sync>;
type ChangesAccessor = for<'a> fn(&'a dyn Any) -> Option<&'a ChangeSupport>;

/// Declared shape of an attribute.
#[derive(Clone)]
pub enum PropertyKind {
    /// Scalar of the given kind
    Value(ValueKind),
    /// Nested record
    Bean(BeanTypeFn),
    /// Collection of the inner kind
    Many(Box<PropertyKind>),
}

impl PropertyKind {
    /// Returns true for collection-valued attributes
    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyKind::Many(_))
    }

    /// Element kind with every collection layer stripped
    pub fn element(&self) -> &PropertyKind {
        match self {
            PropertyKind::Many(inner) => inner.element(),
            other => other,
        }
    }

    /// Table of the nested record type, if the element is a record
    pub fn nested_type(&self) -> Option<Arc<BeanType>> {
        match self.element() {
            PropertyKind::Bean(describe) => Some(describe()),
            _ => None,
        }
    }

    /// Kind of the values this attribute contributes to an index
    pub fn value_kind(&self) -> ValueKind {
        match self.element() {
            PropertyKind::Value(kind) => *kind,
            _ => ValueKind::Ref,
        }
    }
}

impl fmt::Debug for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Value(kind) => write!(f, "Value({})", kind),
            PropertyKind::Bean(describe) => write!(f, "Bean({})", describe().name()),
            PropertyKind::Many(inner) => write!(f, "Many({:?})", inner),
        }
    }
}

/// One readable attribute of a record type.
pub struct PropertyDescriptor {
    name: String,
    owner: &'static str,
    kind: PropertyKind,
    reader: Reader,
}

impl PropertyDescriptor {
    /// Attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the declaring type
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Declared shape
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Read this attribute from an instance of the declaring type.
    ///
    /// An instance of any other type reads as `Absent`.
    pub fn read(&self, instance: &dyn Any) -> Attribute {
        (self.reader)(instance)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Attribute table of one record type.
pub struct BeanType {
    name: &'static str,
    type_id: TypeId,
    properties: Vec<Arc<PropertyDescriptor>>,
    changes: Option<ChangesAccessor>,
}

impl BeanType {
    /// Start describing `T`
    pub fn builder<T: Any + Send + Sync>(name: &'static str) -> BeanTypeBuilder<T> {
        BeanTypeBuilder {
            name,
            properties: Vec::new(),
            changes: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `TypeId` of the described type
    pub fn type_key(&self) -> TypeId {
        self.type_id
    }

    /// Attributes in declaration order
    pub fn properties(&self) -> &[Arc<PropertyDescriptor>] {
        &self.properties
    }

    /// Look up an immediate attribute
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyDescriptor>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether instances announce attribute changes
    pub fn is_observable(&self) -> bool {
        self.changes.is_some()
    }

    /// Change registry of an instance, if the type is observable
    pub fn change_support<'a>(&self, instance: &'a dyn Any) -> Option<&'a ChangeSupport> {
        self.changes.and_then(|accessor| accessor(instance))
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanType")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("observable", &self.is_observable())
            .finish()
    }
}

/// Builder for [`BeanType`].
pub struct BeanTypeBuilder<T> {
    name: &'static str,
    properties: Vec<Arc<PropertyDescriptor>>,
    changes: Option<ChangesAccessor>,
    _marker: std::marker::PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> BeanTypeBuilder<T> {
    fn push<F>(mut self, name: &str, kind: PropertyKind, read: F) -> Self
    where
        F: Fn(&T) -> Attribute + Send + Sync + 'static,
    {
        let reader: Reader = Arc::new(move |instance: &dyn Any| {
            instance
                .downcast_ref::<T>()
                .map_or(Attribute::Absent, |bean| read(bean))
        });
        self.properties.push(Arc::new(PropertyDescriptor {
            name: name.to_string(),
            owner: self.name,
            kind,
            reader,
        }));
        self
    }

    /// Scalar attribute
    pub fn value<F, A>(self, name: &str, kind: ValueKind, read: F) -> Self
    where
        F: Fn(&T) -> A + Send + Sync + 'static,
        A: Into<Attribute>,
    {
        self.push(name, PropertyKind::Value(kind), move |bean| read(bean).into())
    }

    /// Collection of scalars
    pub fn values<F, I, A>(self, name: &str, kind: ValueKind, read: F) -> Self
    where
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        self.push(
            name,
            PropertyKind::Many(Box::new(PropertyKind::Value(kind))),
            move |bean| Attribute::many(read(bean)),
        )
    }

    /// Nested record
    pub fn bean<U, F>(self, name: &str, read: F) -> Self
    where
        U: Introspect,
        F: Fn(&T) -> Option<Arc<U>> + Send + Sync + 'static,
    {
        self.push(
            name,
            PropertyKind::Bean(introspector::bean_type::<U>),
            move |bean| read(bean).into(),
        )
    }

    /// Collection of nested records
    pub fn beans<U, F, I>(self, name: &str, read: F) -> Self
    where
        U: Introspect,
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = Arc<U>>,
    {
        self.push(
            name,
            PropertyKind::Many(Box::new(PropertyKind::Bean(introspector::bean_type::<U>))),
            move |bean| Attribute::many(read(bean)),
        )
    }

    /// Mark the type as announcing attribute changes
    pub fn observable(mut self) -> Self
    where
        T: Observable,
    {
        self.changes = Some(changes_of::<T>);
        self
    }

    /// Finish the table
    pub fn build(self) -> BeanType {
        BeanType {
            name: self.name,
            type_id: TypeId::of::<T>(),
            properties: self.properties,
            changes: self.changes,
        }
    }
}

fn changes_of<T: Observable + Any>(instance: &dyn Any) -> Option<&ChangeSupport> {
    instance.downcast_ref::<T>().map(T::change_support)
}
