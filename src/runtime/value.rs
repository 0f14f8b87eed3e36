use std::{fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::{
    callsite::CallSite,
    handle::FunctionHandle,
    runtime::constant_key::ConstantKey,
    signature::{ClassDef, Kind, Prim, RefType, Signature},
};

/// Runtime value passed into and out of function handles.
///
/// ## Memory Management Model
///
/// Heap-backed variants share through `Arc` so values (and the handles that
/// capture them) can cross threads. Primitives stay unboxed. A primitive value
/// sitting in a reference-typed slot *is* the boxed wrapper of that primitive:
/// boxing never allocates and unboxing is a kind check.
///
/// ### No-Cycle Invariant
///
/// Values, handles and step programs form acyclic graphs. Back-edges that
/// would close a cycle (such as an `as_type` memo pointing from a handle to
/// its own adapter) are held weakly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of a `void` invocation.
    Void,
    /// The null reference.
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    Array(Arc<ArrayValue>),
    Object(Arc<Instance>),
    Error(Arc<Throwable>),
    Handle(FunctionHandle),
    Signature(Signature),
    CallSite(CallSite),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    pub fn array(element: Kind, items: Vec<Value>) -> Value {
        Value::Array(Arc::new(ArrayValue { element, items }))
    }

    /// Primitive kind of this value, if it is primitive.
    pub fn prim(&self) -> Option<Prim> {
        Some(match self {
            Value::Bool(_) => Prim::Bool,
            Value::Byte(_) => Prim::Byte,
            Value::Short(_) => Prim::Short,
            Value::Char(_) => Prim::Char,
            Value::Int(_) => Prim::Int,
            Value::Long(_) => Prim::Long,
            Value::Float(_) => Prim::Float,
            Value::Double(_) => Prim::Double,
            _ => return None,
        })
    }

    /// Dynamic reference type of this value when it sits in a reference slot.
    ///
    /// Returns `None` for `Null` and `Void`.
    pub fn ref_type(&self) -> Option<RefType> {
        if let Some(prim) = self.prim() {
            return Some(RefType::Boxed(prim));
        }
        Some(match self {
            Value::Str(_) => RefType::String,
            Value::Array(array) => RefType::Array(Arc::new(array.element.clone())),
            Value::Object(instance) => RefType::Class(instance.class.clone()),
            Value::Error(throwable) => RefType::Class(throwable.class.clone()),
            Value::Handle(_) => RefType::Handle,
            Value::Signature(_) => RefType::Signature,
            Value::CallSite(_) => RefType::CallSite,
            _ => return None,
        })
    }

    /// Most precise static kind describing this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Void => Kind::Void,
            Value::Null => Kind::OBJECT,
            other => match other.prim() {
                Some(prim) => Kind::Prim(prim),
                None => other.ref_type().map(Kind::Ref).unwrap_or(Kind::OBJECT),
            },
        }
    }

    /// Canonical type label used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            other => other.kind().to_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&FunctionHandle> {
        match self {
            Value::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// Key for sharing constant handles that return this value.
    ///
    /// Handles, call sites, arrays and instances have identity rather than
    /// structure and yield `None`.
    pub fn constant_key(&self) -> Option<ConstantKey> {
        match self {
            Value::Null => Some(ConstantKey::Null),
            Value::Bool(v) => Some(ConstantKey::Bool(*v)),
            Value::Byte(v) => Some(ConstantKey::Integral(i64::from(*v))),
            Value::Short(v) => Some(ConstantKey::Integral(i64::from(*v))),
            Value::Char(v) => Some(ConstantKey::Integral(i64::from(*v))),
            Value::Int(v) => Some(ConstantKey::Integral(i64::from(*v))),
            Value::Long(v) => Some(ConstantKey::Integral(*v)),
            Value::Float(v) => Some(ConstantKey::Bits(u64::from(v.to_bits()))),
            Value::Double(v) => Some(ConstantKey::Bits(v.to_bits())),
            Value::Str(v) => Some(ConstantKey::Str(v.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{}'", c),
                None => write!(f, "'\\u{{{:04x}}}'", v),
            },
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Array(array) => {
                let items: Vec<String> = array.items.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Object(instance) => write!(f, "<{}>", instance.class.name),
            Value::Error(throwable) => write!(f, "<{}>", throwable),
            Value::Handle(handle) => write!(f, "<handle {}>", handle.signature()),
            Value::Signature(signature) => write!(f, "{}", signature),
            Value::CallSite(site) => write!(f, "<call site {}>", site.signature()),
        }
    }
}

/// Immutable array value with a declared element kind.
#[derive(Debug, PartialEq)]
pub struct ArrayValue {
    pub element: Kind,
    pub items: Vec<Value>,
}

impl ArrayValue {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Instance of a user-declared class.
#[derive(Debug)]
pub struct Instance {
    pub class: Arc<ClassDef>,
    fields: RwLock<Vec<Value>>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Instance {
    pub fn new(class: Arc<ClassDef>, fields: Vec<Value>) -> Self {
        Self {
            class,
            fields: RwLock::new(fields),
        }
    }

    pub fn get_field(&self, index: usize) -> Option<Value> {
        self.fields.read().get(index).cloned()
    }

    pub fn set_field(&self, index: usize, value: Value) -> bool {
        match self.fields.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A thrown value: an instance of a `Throwable` subclass.
#[derive(Debug)]
pub struct Throwable {
    pub class: Arc<ClassDef>,
    pub message: String,
    suppressed: Mutex<Vec<Arc<Throwable>>>,
}

impl PartialEq for Throwable {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Throwable {
    pub fn new(class: Arc<ClassDef>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            class,
            message: message.into(),
            suppressed: Mutex::new(Vec::new()),
        })
    }

    pub fn ref_type(&self) -> RefType {
        RefType::Class(self.class.clone())
    }

    /// Returns whether this throwable is an instance of `kind`.
    pub fn is_instance_of(&self, kind: &RefType) -> bool {
        self.ref_type().is_subtype_of(kind)
    }

    /// Records `other` as suppressed by this throwable.
    pub fn add_suppressed(&self, other: Arc<Throwable>) {
        self.suppressed.lock().push(other);
    }

    pub fn suppressed(&self) -> Vec<Arc<Throwable>> {
        self.suppressed.lock().clone()
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.class.name)
        } else {
            write!(f, "{}: {}", self.class.name, self.message)
        }
    }
}
