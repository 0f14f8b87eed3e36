//! Raw actions at the bottom of every handle.
use std::{fmt, sync::Arc};

use crate::{
    diagnostics::InvokeError,
    runtime::{
        convert::cast_error,
        exceptions::{null_pointer, throw},
        native::NativeFunction,
        value::{Instance, Value},
    },
    signature::{ClassDef, Kind},
};

/// Opaque invocable step with a known signature.
///
/// Member actions carry the owner class they were resolved against; the
/// receiver (when any) is the first argument.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafAction {
    /// Host function called with all arguments.
    Static(NativeFunction),
    /// Method dispatched through the receiver's class chain.
    Virtual { owner: Arc<ClassDef>, name: Arc<str> },
    GetField { owner: Arc<ClassDef>, name: Arc<str> },
    SetField { owner: Arc<ClassDef>, name: Arc<str> },
    /// Allocates an instance from one argument per declared field.
    Construct { class: Arc<ClassDef> },
}

impl LeafAction {
    pub fn invoke(&self, mut args: Vec<Value>) -> Result<Value, InvokeError> {
        match self {
            LeafAction::Static(function) => function.call(args),
            LeafAction::Virtual { owner, name } => {
                let receiver = receiver(&args, owner)?;
                let method = receiver.class.find_method(name).ok_or_else(|| {
                    InvokeError::NoSuchMember {
                        owner: receiver.class.name.to_string(),
                        name: name.to_string(),
                    }
                })?;
                method.function.call(args)
            }
            LeafAction::GetField { owner, name } => {
                let receiver = receiver(&args, owner)?;
                let index = field_index(&receiver, name)?;
                receiver.get_field(index).ok_or_else(|| no_field(&receiver, name))
            }
            LeafAction::SetField { owner, name } => {
                let value = args.pop().unwrap_or(Value::Null);
                let receiver = receiver(&args, owner)?;
                let index = field_index(&receiver, name)?;
                if receiver.set_field(index, value) {
                    Ok(Value::Void)
                } else {
                    Err(no_field(&receiver, name))
                }
            }
            LeafAction::Construct { class } => {
                if args.len() != class.fields.len() {
                    return Err(InvokeError::WrongArgumentCount {
                        expected: class.fields.len(),
                        got: args.len(),
                    });
                }
                Ok(Value::Object(Arc::new(Instance::new(class.clone(), args))))
            }
        }
    }
}

impl fmt::Display for LeafAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafAction::Static(function) => write!(f, "static {}", function.name),
            LeafAction::Virtual { owner, name } => write!(f, "virtual {}.{}", owner.name, name),
            LeafAction::GetField { owner, name } => write!(f, "getfield {}.{}", owner.name, name),
            LeafAction::SetField { owner, name } => write!(f, "putfield {}.{}", owner.name, name),
            LeafAction::Construct { class } => write!(f, "new {}", class.name),
        }
    }
}

fn receiver(args: &[Value], owner: &Arc<ClassDef>) -> Result<Arc<Instance>, InvokeError> {
    match args.first() {
        Some(Value::Object(instance)) => Ok(instance.clone()),
        Some(Value::Null) | None => Err(throw(
            null_pointer(),
            format!("receiver of {} is null", owner.name),
        )),
        Some(other) => Err(cast_error(other, &Kind::class(owner))),
    }
}

fn field_index(receiver: &Instance, name: &str) -> Result<usize, InvokeError> {
    receiver
        .class
        .field_index(name)
        .ok_or_else(|| no_field(receiver, name))
}

fn no_field(receiver: &Instance, name: &str) -> InvokeError {
    InvokeError::NoSuchMember {
        owner: receiver.class.name.to_string(),
        name: name.to_string(),
    }
}
