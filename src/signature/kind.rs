use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::runtime::native::NativeFunction;

use super::Signature;

/// Primitive value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    pub const ALL: [Prim; 8] = [
        Prim::Bool,
        Prim::Byte,
        Prim::Short,
        Prim::Char,
        Prim::Int,
        Prim::Long,
        Prim::Float,
        Prim::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prim::Bool => "boolean",
            Prim::Byte => "byte",
            Prim::Short => "short",
            Prim::Char => "char",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        }
    }

    /// Name of the reference wrapper for this primitive.
    pub fn wrapper_name(self) -> &'static str {
        match self {
            Prim::Bool => "Boolean",
            Prim::Byte => "Byte",
            Prim::Short => "Short",
            Prim::Char => "Character",
            Prim::Int => "Integer",
            Prim::Long => "Long",
            Prim::Float => "Float",
            Prim::Double => "Double",
        }
    }

    /// Numeric wrappers are subtypes of `Number`.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Prim::Bool | Prim::Char)
    }

    /// Returns whether a value of this kind widens to `to` without loss of
    /// kind identity. Reflexive.
    pub fn widens_to(self, to: Prim) -> bool {
        use Prim::*;
        if self == to {
            return true;
        }
        match self {
            Bool => false,
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            Double => false,
        }
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter or return kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Return-only "no value" kind.
    Void,
    Prim(Prim),
    Ref(RefType),
}

impl Kind {
    pub const VOID: Kind = Kind::Void;
    pub const BOOL: Kind = Kind::Prim(Prim::Bool);
    pub const BYTE: Kind = Kind::Prim(Prim::Byte);
    pub const SHORT: Kind = Kind::Prim(Prim::Short);
    pub const CHAR: Kind = Kind::Prim(Prim::Char);
    pub const INT: Kind = Kind::Prim(Prim::Int);
    pub const LONG: Kind = Kind::Prim(Prim::Long);
    pub const FLOAT: Kind = Kind::Prim(Prim::Float);
    pub const DOUBLE: Kind = Kind::Prim(Prim::Double);
    pub const OBJECT: Kind = Kind::Ref(RefType::Object);
    pub const NUMBER: Kind = Kind::Ref(RefType::Number);
    pub const STRING: Kind = Kind::Ref(RefType::String);
    pub const THROWABLE: Kind = Kind::Ref(RefType::Throwable);
    pub const HANDLE: Kind = Kind::Ref(RefType::Handle);
    pub const SIGNATURE: Kind = Kind::Ref(RefType::Signature);
    pub const CALL_SITE: Kind = Kind::Ref(RefType::CallSite);

    /// Boxed wrapper kind for a primitive.
    pub fn boxed(prim: Prim) -> Kind {
        Kind::Ref(RefType::Boxed(prim))
    }

    /// Array kind with the given element kind.
    pub fn array_of(element: Kind) -> Kind {
        Kind::Ref(RefType::Array(Arc::new(element)))
    }

    pub fn class(def: &Arc<ClassDef>) -> Kind {
        Kind::Ref(RefType::Class(def.clone()))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Kind::Void)
    }

    pub fn as_prim(&self) -> Option<Prim> {
        match self {
            Kind::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_ref_type(&self) -> Option<&RefType> {
        match self {
            Kind::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Element kind when this is an array kind.
    pub fn array_element(&self) -> Option<&Kind> {
        match self {
            Kind::Ref(RefType::Array(element)) => Some(element),
            _ => None,
        }
    }

    /// Reference kinds erase to `Object`; primitives and void are unchanged.
    pub fn erase(&self) -> Kind {
        match self {
            Kind::Ref(_) => Kind::OBJECT,
            other => other.clone(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Void => f.write_str("void"),
            Kind::Prim(p) => f.write_str(p.name()),
            Kind::Ref(r) => write!(f, "{}", r),
        }
    }
}

/// Static reference type of a reference kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefType {
    Object,
    Number,
    String,
    Throwable,
    Boxed(Prim),
    Array(Arc<Kind>),
    Handle,
    Signature,
    CallSite,
    Class(Arc<ClassDef>),
}

impl RefType {
    /// Returns whether values of this type are known to have no subtypes.
    pub fn is_final(&self) -> bool {
        match self {
            RefType::String | RefType::Boxed(_) | RefType::Signature => true,
            RefType::Array(element) => !matches!(element.as_ref(), Kind::Ref(_)),
            RefType::Class(def) => def.is_final,
            RefType::Object
            | RefType::Number
            | RefType::Throwable
            | RefType::Handle
            | RefType::CallSite => false,
        }
    }

    /// Subtype relation of the reference lattice. Reflexive.
    pub fn is_subtype_of(&self, other: &RefType) -> bool {
        if self == other || matches!(other, RefType::Object) {
            return true;
        }
        match (self, other) {
            (RefType::Boxed(p), RefType::Number) => p.is_numeric(),
            (RefType::Array(a), RefType::Array(b)) => match (a.as_ref(), b.as_ref()) {
                (Kind::Ref(ra), Kind::Ref(rb)) => ra.is_subtype_of(rb),
                (ka, kb) => ka == kb,
            },
            (RefType::Class(def), _) => match &def.superclass {
                Some(parent) => parent.is_subtype_of(other),
                None => false,
            },
            _ => false,
        }
    }

    /// Returns whether either type is a subtype of the other.
    pub fn is_related_to(&self, other: &RefType) -> bool {
        self.is_subtype_of(other) || other.is_subtype_of(self)
    }

    pub fn is_throwable(&self) -> bool {
        self.is_subtype_of(&RefType::Throwable)
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefType::Object => f.write_str("Object"),
            RefType::Number => f.write_str("Number"),
            RefType::String => f.write_str("String"),
            RefType::Throwable => f.write_str("Throwable"),
            RefType::Boxed(p) => f.write_str(p.wrapper_name()),
            RefType::Array(element) => write!(f, "{}[]", element),
            RefType::Handle => f.write_str("Handle"),
            RefType::Signature => f.write_str("Signature"),
            RefType::CallSite => f.write_str("CallSite"),
            RefType::Class(def) => f.write_str(&def.name),
        }
    }
}

/// A virtual method declared on a class.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Signature without the receiver.
    pub signature: Signature,
    pub function: NativeFunction,
    pub private: bool,
}

/// A user-declared reference class.
///
/// Classes are identified by name: two definitions with the same name are the
/// same type.
#[derive(Debug)]
pub struct ClassDef {
    pub name: Arc<str>,
    /// `None` means the class extends `Object` directly.
    pub superclass: Option<RefType>,
    pub is_final: bool,
    pub fields: Vec<(Arc<str>, Kind)>,
    pub methods: HashMap<Arc<str>, MethodDef>,
}

impl PartialEq for ClassDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassDef {}

impl Hash for ClassDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl ClassDef {
    pub fn builder(name: &str) -> ClassBuilder {
        ClassBuilder {
            def: ClassDef {
                name: Arc::from(name),
                superclass: None,
                is_final: false,
                fields: Vec::new(),
                methods: HashMap::new(),
            },
        }
    }

    /// Index of a field declared on this class (inherited fields are not
    /// flattened).
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field.as_ref() == name)
    }

    /// Looks a method up along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<&MethodDef> {
        if let Some(method) = self.methods.get(name) {
            return Some(method);
        }
        match &self.superclass {
            Some(RefType::Class(parent)) => parent.find_method(name),
            _ => None,
        }
    }
}

/// Builder for [`ClassDef`].
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    pub fn extends(mut self, parent: RefType) -> Self {
        self.def.superclass = Some(parent);
        self
    }

    pub fn final_class(mut self) -> Self {
        self.def.is_final = true;
        self
    }

    pub fn field(mut self, name: &str, kind: Kind) -> Self {
        self.def.fields.push((Arc::from(name), kind));
        self
    }

    pub fn method(mut self, name: &str, signature: Signature, function: NativeFunction) -> Self {
        self.def.methods.insert(
            Arc::from(name),
            MethodDef {
                signature,
                function,
                private: false,
            },
        );
        self
    }

    pub fn private_method(
        mut self,
        name: &str,
        signature: Signature,
        function: NativeFunction,
    ) -> Self {
        self.def.methods.insert(
            Arc::from(name),
            MethodDef {
                signature,
                function,
                private: true,
            },
        );
        self
    }

    pub fn build(self) -> Arc<ClassDef> {
        Arc::new(self.def)
    }
}
