mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use require::prelude::*;

#[derive(Debug)]
struct Object {
    #[allow(dead_code)]
    id: usize,
}

fn object_factory() -> impl Fn(&Kwargs) -> Result<Object> + Send + Sync + 'static {
    let next = AtomicUsize::new(0);
    move |_| {
        Ok(Object {
            id: next.fetch_add(1, Ordering::SeqCst),
        })
    }
}

fn exported(_: &Kwargs) -> Result<()> {
    Ok(())
}

#[test]
fn export_is_introspectable() {
    common::init_tracing();
    let module = Module::new();
    let export = module
        .export(ExportOptions::new().scope(Scope::oneshot()), exported)
        .unwrap();

    let loaded = module.load(require::requirement!("exported")).unwrap();
    assert!(Arc::ptr_eq(&loaded, &export));
    assert_eq!(loaded.name(), "inject:exported");
    assert_eq!(loaded.scope(), &Scope::oneshot());
    assert!((loaded.factory())().unwrap().is::<()>());
}

#[test]
fn simple_create() {
    let module = Module::new();
    module
        .export(ExportOptions::named("export"), |_| Ok("test"))
        .unwrap();

    let export = module.load("export").unwrap();
    assert_eq!(*export.get::<&str>().unwrap(), "test");
}

#[test]
fn extended_create() {
    let module = Module::new();
    module
        .export(ExportOptions::named("export"), |_| Ok(String::from("test")))
        .unwrap();
    assert_eq!(*module.load("export").unwrap().get::<String>().unwrap(), "test");

    module
        .extend("export", Requirements::new(), |s: &mut String, _: &Kwargs| {
            Ok(Some(format!("{s}!")))
        })
        .unwrap();

    let fresh = module.load("export").unwrap().create().unwrap();
    assert_eq!(fresh.downcast_ref::<String>().unwrap(), "test!");
}

#[test]
fn extenders_observe_previous_extenders() {
    let module = Module::new();
    module
        .export(ExportOptions::named("export"), |_| Ok(vec!["factory"]))
        .unwrap();
    module
        .extend("export", Requirements::new(), |v: &mut Vec<&str>, _: &Kwargs| {
            v.push("first");
            Ok(None)
        })
        .unwrap();
    module
        .extend("export", Requirements::new(), |v: &mut Vec<&str>, _: &Kwargs| {
            assert_eq!(v.last(), Some(&"first"));
            Ok(Some(vec!["replaced"]))
        })
        .unwrap();

    let value = module.load("export").unwrap().get::<Vec<&str>>().unwrap();
    assert_eq!(*value, vec!["replaced"]);
}

#[test]
fn scoping() {
    let module = Module::new();
    module
        .export(
            ExportOptions::named("singleton").scope(Scope::singleton()),
            object_factory(),
        )
        .unwrap();
    module
        .export(
            ExportOptions::named("oneshot").scope(Scope::oneshot()),
            object_factory(),
        )
        .unwrap();

    let singleton_export = module.load("singleton").unwrap();
    assert!(Arc::ptr_eq(
        &singleton_export.get::<Object>().unwrap(),
        &singleton_export.get::<Object>().unwrap()
    ));

    let oneshot_export = module.load("oneshot").unwrap();
    assert!(!Arc::ptr_eq(
        &oneshot_export.get::<Object>().unwrap(),
        &oneshot_export.get::<Object>().unwrap()
    ));
}

#[test]
fn singleton_is_shared_across_threads() {
    let module = Arc::new(Module::new());
    let calls = Arc::new(AtomicUsize::new(0));
    module
        .export(ExportOptions::named("shared"), {
            let calls = calls.clone();
            move |_| Ok(calls.fetch_add(1, Ordering::SeqCst))
        })
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let module = module.clone();
            thread::spawn(move || module.load("shared").unwrap().call().unwrap())
        })
        .collect();
    let instances: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn method_injection() {
    let module = Module::new();
    module
        .export(ExportOptions::named("exported"), |_| Ok("test"))
        .unwrap();

    let tester = module
        .inject(None, Requirements::new().require("exported", "exported"))
        .unwrap()
        .into_binder()
        .unwrap()
        .wrap(|(): (), kwargs: &Kwargs| -> Result<&'static str> {
            Ok(*kwargs.get::<&'static str>("exported")?)
        });

    assert_eq!(tester.call(()).unwrap(), "test");
}

#[test]
fn method_injection_overwrite() {
    let module = Module::new();
    let calls = Arc::new(AtomicUsize::new(0));
    module
        .export(ExportOptions::named("exported"), {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("test")
            }
        })
        .unwrap();

    let tester = module
        .wrap(
            |(): (), kwargs: &Kwargs| Ok(*kwargs.get::<&'static str>("exported")?),
            Requirements::new().require("exported", "exported"),
        )
        .unwrap();

    let result = tester
        .call_with((), Kwargs::new().with("exported", "override"))
        .unwrap();
    assert_eq!(result, "override");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn property_injection() {
    let module = Module::new();
    module
        .export(ExportOptions::named("exported"), |_| Ok("test"))
        .unwrap();

    struct Tester {
        exported: InjectProperty,
    }

    let tester = Tester {
        exported: module
            .inject(Some("exported"), Requirements::new())
            .unwrap()
            .into_property()
            .unwrap(),
    };

    assert_eq!(*tester.exported.get::<&str>().unwrap(), "test");
    assert_eq!(tester.exported.export().name(), "exported");
    assert_eq!(tester.exported.export().scope(), &Scope::singleton());
}

#[test]
fn errors_carry_context() {
    let module = Module::new();
    module
        .export(ExportOptions::named("config:database"), |_| Ok(1u8))
        .unwrap();

    let unknown = module.load("config:databas").unwrap_err();
    let message = unknown.to_string();
    assert!(message.contains("config:databas"), "{message}");
    assert!(message.contains("config:database"), "{message}");

    let duplicate = module
        .export(ExportOptions::named("config:database"), |_| Ok(2u8))
        .unwrap_err();
    assert!(matches!(duplicate, RequireError::AlreadyRegistered(_)));

    let mismatch = module
        .load("config:database")
        .unwrap()
        .get::<String>()
        .unwrap_err();
    assert!(matches!(mismatch, RequireError::TypeMismatch { .. }));
}

#[test]
fn custom_scope() {
    // Caches per thread.
    fn per_thread(producer: require::scope::Producer) -> require::scope::Accessor {
        thread_local! {
            static CACHE: std::cell::RefCell<Option<Instance>> = const { std::cell::RefCell::new(None) };
        }
        Arc::new(move || -> Result<Instance> {
            if let Some(instance) = CACHE.with(|cache| cache.borrow().clone()) {
                return Ok(instance);
            }
            let instance = producer()?;
            CACHE.with(|cache| *cache.borrow_mut() = Some(instance.clone()));
            Ok(instance)
        })
    }

    let module = Arc::new(Module::new());
    module
        .export(
            ExportOptions::named("per-thread").scope(Scope::custom("thread", true, per_thread)),
            object_factory(),
        )
        .unwrap();

    let export = module.load("per-thread").unwrap();
    let here = export.call().unwrap();
    assert!(Arc::ptr_eq(&here, &export.call().unwrap()));

    let there = {
        let export = export.clone();
        thread::spawn(move || export.call().unwrap()).join().unwrap()
    };
    assert!(!Arc::ptr_eq(&here, &there));
    assert_eq!(export.scope().name(), "thread");
}

#[test]
fn describe_is_serializable_snapshot() {
    let module = Module::builder().label("describe").build();
    module
        .export(ExportOptions::named("b").scope(Scope::oneshot()), |_| Ok(1u8))
        .unwrap();
    module
        .export(ExportOptions::named("a"), |_| Ok(2u8))
        .unwrap();
    module
        .extend("a", Requirements::new(), |_: &mut u8, _: &Kwargs| Ok(None))
        .unwrap();

    let info = module.describe();
    assert_eq!(info.len(), 2);
    assert_eq!(info[0].name, "a");
    assert_eq!(info[0].scope, "singleton");
    assert_eq!(info[0].extenders, 1);
    assert!(!info[0].instantiated);
    assert_eq!(info[1].scope, "oneshot");
}

struct ConfigProvider;

impl Provider for ConfigProvider {
    fn register(&self, module: &Module) -> Result<()> {
        module.export(ExportOptions::named("config:greeting"), |_| {
            Ok(String::from("hello"))
        })?;
        Ok(())
    }
}

struct GreeterProvider;

impl Provider for GreeterProvider {
    fn register(&self, module: &Module) -> Result<()> {
        module.export(
            ExportOptions::named("greeter").require("greeting", "config:greeting"),
            |kwargs| Ok(format!("{}, world", kwargs.get::<String>("greeting")?)),
        )?;
        Ok(())
    }
}

// Registered out of order on purpose; `order` decides.
require::register_provider!(GreeterProvider, order = 10);
require::register_provider!(ConfigProvider);

#[test]
fn registered_providers_install_in_order() {
    common::init_tracing();
    let module = Module::new();

    assert_eq!(module.install_registered().unwrap(), 2);
    assert_eq!(
        *module.load("greeter").unwrap().get::<String>().unwrap(),
        "hello, world"
    );
}
