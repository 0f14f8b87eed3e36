#[path = "../common/fixtures.rs"]
mod fixtures;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use fixtures::{add, int, sig, sub};
use invoke::{
    CallSite, CallSiteKind, InvokeError, Kind, Signature, Value,
    linkage::{
        BootstrapDescriptor, BootstrapMethod, CallPointId, DynamicCallPoint, Linker, LinkerConfig,
        Lookup, MemberRegistry,
    },
    runtime::native::NativeFunction,
};
use rayon::prelude::*;

fn math_registry() -> Arc<MemberRegistry> {
    let registry = Arc::new(MemberRegistry::new());
    let binary = sig(Kind::INT, vec![Kind::INT, Kind::INT]);
    registry.register_static(
        "Math",
        "add",
        binary.clone(),
        NativeFunction::new("add", |args| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0)))
        }),
    );
    registry.register_static(
        "Math",
        "mul",
        binary,
        NativeFunction::new("mul", |args| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * args[1].as_int().unwrap_or(0)))
        }),
    );
    registry
}

fn linker(config: LinkerConfig) -> Linker {
    Linker::new(Lookup::new("Main", math_registry()), config)
}

fn binary() -> Signature {
    sig(Kind::INT, vec![Kind::INT, Kind::INT])
}

/// Resolves `Math.<name>` into a mutable call site.
fn math_bootstrap(runs: &Arc<AtomicUsize>) -> Arc<dyn BootstrapMethod> {
    let runs = Arc::clone(runs);
    Arc::new(
        move |lookup: &Lookup, name: &str, signature: &Signature, _: &[Value]| -> Result<Value, InvokeError> {
            runs.fetch_add(1, Ordering::SeqCst);
            let target = lookup.find_static("Math", name, signature)?;
            Ok(Value::CallSite(CallSite::mutable_with(target)))
        },
    )
}

#[test]
fn bootstrap_runs_once_per_call_point() {
    let linker = linker(LinkerConfig::default());
    let runs = Arc::new(AtomicUsize::new(0));
    let point = DynamicCallPoint::new(
        CallPointId(1),
        BootstrapDescriptor::new("add", binary(), Vec::new()),
        math_bootstrap(&runs),
    );
    assert_eq!(point.invoke(&linker, vec![int(2), int(3)]).unwrap(), int(5));
    assert_eq!(point.invoke(&linker, vec![int(4), int(4)]).unwrap(), int(8));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(linker.len(), 1);

    let other = DynamicCallPoint::new(
        CallPointId(2),
        BootstrapDescriptor::new("mul", binary(), Vec::new()),
        math_bootstrap(&runs),
    );
    assert_eq!(other.invoke(&linker, vec![int(4), int(4)]).unwrap(), int(16));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn retargeting_the_linked_site_redirects_the_call_point() {
    let linker = linker(LinkerConfig::default());
    let runs = Arc::new(AtomicUsize::new(0));
    let point = DynamicCallPoint::new(
        CallPointId(7),
        BootstrapDescriptor::new("add", binary(), Vec::new()),
        math_bootstrap(&runs),
    );
    assert_eq!(point.invoke(&linker, vec![int(9), int(3)]).unwrap(), int(12));
    linker.linked(CallPointId(7)).unwrap().set_target(sub()).unwrap();
    assert_eq!(point.invoke(&linker, vec![int(9), int(3)]).unwrap(), int(6));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn resolver_failures_are_wrapped_and_not_published() {
    let linker = linker(LinkerConfig::default());
    let runs = Arc::new(AtomicUsize::new(0));
    let missing = BootstrapDescriptor::new("pow", binary(), Vec::new());
    let bootstrap = math_bootstrap(&runs);
    for _ in 0..2 {
        let err = linker.link(CallPointId(3), &missing, bootstrap.as_ref()).unwrap_err();
        match err {
            InvokeError::BootstrapLinkage { name, cause } => {
                assert_eq!(name, "pow");
                assert!(matches!(*cause, InvokeError::NoSuchMember { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert!(linker.linked(CallPointId(3)).is_none());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn fatal_errors_propagate_unwrapped() {
    let linker = linker(LinkerConfig::default());
    let fatal = |_: &Lookup, _: &str, _: &Signature, _: &[Value]| -> Result<Value, InvokeError> {
        Err(InvokeError::Fatal("linker heap exhausted".into()))
    };
    let descriptor = BootstrapDescriptor::new("add", binary(), Vec::new());
    let err = linker.resolve(&descriptor, &fatal).unwrap_err();
    assert!(matches!(err, InvokeError::Fatal(_)));
}

#[test]
fn wrong_signature_is_a_mismatch() {
    let linker = linker(LinkerConfig::default());
    let narrow = |_: &Lookup, _: &str, _: &Signature, _: &[Value]| -> Result<Value, InvokeError> {
        let target = add().as_type(&sig(Kind::LONG, vec![Kind::INT, Kind::INT]))?;
        Ok(Value::CallSite(CallSite::constant(target)))
    };
    let descriptor = BootstrapDescriptor::new("add", binary(), Vec::new());
    match linker.resolve(&descriptor, &narrow).unwrap_err() {
        InvokeError::SignatureMismatch { expected, actual } => {
            assert_eq!(expected, binary());
            assert_eq!(actual, sig(Kind::LONG, vec![Kind::INT, Kind::INT]));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn bare_handles_need_the_fast_path_enabled() {
    let handle_result = |_: &Lookup, _: &str, _: &Signature, _: &[Value]| -> Result<Value, InvokeError> {
        Ok(Value::Handle(add()))
    };
    let descriptor = BootstrapDescriptor::new("add", binary(), Vec::new());

    let strict = linker(LinkerConfig::default());
    assert!(matches!(
        strict.resolve(&descriptor, &handle_result),
        Err(InvokeError::BootstrapProtocol { .. })
    ));

    let lenient = linker(LinkerConfig::from_json_str(r#"{ "allow_handle_results": true }"#).unwrap());
    let site = lenient.resolve(&descriptor, &handle_result).unwrap();
    assert_eq!(site.kind(), CallSiteKind::Constant);
    assert_eq!(site.target().unwrap().invoke_exact(vec![int(1), int(2)]).unwrap(), int(3));
}

#[test]
fn non_call_site_results_violate_the_protocol() {
    let linker = linker(LinkerConfig::default().with_trace_linkage(true));
    let number = |_: &Lookup, _: &str, _: &Signature, _: &[Value]| -> Result<Value, InvokeError> {
        Ok(Value::Int(42))
    };
    let descriptor = BootstrapDescriptor::new("answer", binary(), vec![Value::str("meta")]);
    match linker.resolve(&descriptor, &number).unwrap_err() {
        InvokeError::BootstrapProtocol { name, detail } => {
            assert_eq!(name, "answer");
            assert!(detail.contains("int"), "{detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn static_arguments_reach_the_bootstrap() {
    let linker = linker(LinkerConfig::default());
    let offset = |lookup: &Lookup, _: &str, signature: &Signature, statics: &[Value]| -> Result<Value, InvokeError> {
        let [Value::Int(delta)] = statics else {
            return Err(InvokeError::illegal("expected one int"));
        };
        let adder = lookup.find_static("Math", "add", &binary())?;
        let bound = adder.bind_argument(1, Value::Int(*delta))?;
        Ok(Value::CallSite(CallSite::constant(bound.as_type(signature)?)))
    };
    let descriptor = BootstrapDescriptor::new("offset", sig(Kind::INT, vec![Kind::INT]), vec![int(40)]);
    let site = linker.link(CallPointId(9), &descriptor, &offset).unwrap();
    assert_eq!(site.target().unwrap().invoke_exact(vec![int(2)]).unwrap(), int(42));
}

#[test]
fn unregister_forces_a_fresh_bootstrap() {
    let linker = linker(LinkerConfig::default());
    let runs = Arc::new(AtomicUsize::new(0));
    let descriptor = BootstrapDescriptor::new("add", binary(), Vec::new());
    let bootstrap = math_bootstrap(&runs);
    let first = linker.link(CallPointId(5), &descriptor, bootstrap.as_ref()).unwrap();
    assert!(linker.unregister(CallPointId(5)).unwrap().ptr_eq(&first));
    assert!(linker.is_empty());
    let second = linker.link(CallPointId(5), &descriptor, bootstrap.as_ref()).unwrap();
    assert!(!second.ptr_eq(&first));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn racing_linkers_agree_on_one_site() {
    let linker = linker(LinkerConfig::default());
    let runs = Arc::new(AtomicUsize::new(0));
    let descriptor = BootstrapDescriptor::new("mul", binary(), Vec::new());
    let bootstrap = math_bootstrap(&runs);
    let sites: Vec<CallSite> = (0..32)
        .into_par_iter()
        .map(|_| linker.link(CallPointId(11), &descriptor, bootstrap.as_ref()).unwrap())
        .collect();
    let published = linker.linked(CallPointId(11)).unwrap();
    assert!(sites.iter().all(|site| site.ptr_eq(&published)));
    assert!(runs.load(Ordering::SeqCst) >= 1);
}
