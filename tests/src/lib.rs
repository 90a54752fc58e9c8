//! Shared fixtures for the end-to-end tests: closure-backed module
//! bodies standing in for successive source revisions of one module.

use std::rc::Rc;

use serde_json::json;

use regraft_kernel::{Class, Entity, FnLoader, Function, HostResult, Module, ModuleLoader};

/// Module name used by the demo bodies.
pub const DEMO: &str = "demo";

/// Revision 1: `answer() -> 1`, `Greeter` with `greet` and `legacy`,
/// `LIMIT = 10`.
pub fn demo_v1(m: &Module) -> HostResult<()> {
    m.bind(
        "answer",
        Entity::Function(Function::new(
            "answer",
            m.name(),
            Rc::new(|_ctx, _args| Ok(json!(1))),
        )),
    );
    m.bind(
        "Greeter",
        Entity::Class(
            Class::new("Greeter", m.name())
                .with_member(
                    "greet",
                    Entity::Function(Function::new(
                        "greet",
                        m.name(),
                        Rc::new(|ctx, _args| {
                            let receiver = ctx.receiver.as_ref().expect("bound call");
                            let name = receiver.field("name").unwrap_or(json!("?"));
                            Ok(json!(format!("hi {}", name.as_str().unwrap_or("?"))))
                        }),
                    )),
                )
                .with_member(
                    "legacy",
                    Entity::Function(Function::new(
                        "legacy",
                        m.name(),
                        Rc::new(|_ctx, _args| Ok(json!("legacy"))),
                    )),
                ),
        ),
    );
    m.bind("LIMIT", Entity::Data(json!(10)));
    Ok(())
}

/// Revision 2: `answer() -> 2`, `Greeter` drops `legacy`, gains
/// `shout`, `greet` is louder, `LIMIT = 20`.
pub fn demo_v2(m: &Module) -> HostResult<()> {
    m.bind(
        "answer",
        Entity::Function(Function::new(
            "answer",
            m.name(),
            Rc::new(|_ctx, _args| Ok(json!(2))),
        )),
    );
    m.bind(
        "Greeter",
        Entity::Class(
            Class::new("Greeter", m.name())
                .with_member(
                    "greet",
                    Entity::Function(Function::new(
                        "greet",
                        m.name(),
                        Rc::new(|ctx, _args| {
                            let receiver = ctx.receiver.as_ref().expect("bound call");
                            let name = receiver.field("name").unwrap_or(json!("?"));
                            Ok(json!(format!("HI {}", name.as_str().unwrap_or("?"))))
                        }),
                    )),
                )
                .with_member(
                    "shout",
                    Entity::Function(Function::new(
                        "shout",
                        m.name(),
                        Rc::new(|_ctx, _args| Ok(json!("!!!"))),
                    )),
                ),
        ),
    );
    m.bind("LIMIT", Entity::Data(json!(20)));
    Ok(())
}

/// Revision 3: `answer() -> 3`, everything else as in revision 2.
pub fn demo_v3(m: &Module) -> HostResult<()> {
    demo_v2(m)?;
    m.bind(
        "answer",
        Entity::Function(Function::new(
            "answer",
            m.name(),
            Rc::new(|_ctx, _args| Ok(json!(3))),
        )),
    );
    Ok(())
}

/// Build a loaded `demo` module at revision 1, returning the module
/// and its body-swappable loader.
pub fn loaded_demo() -> (Module, Rc<FnLoader>) {
    let loader = Rc::new(FnLoader::new(demo_v1));
    let module = Module::new(DEMO);
    module.set_loader(loader.clone());
    loader
        .exec_module(&module)
        .expect("demo v1 body always succeeds");
    (module, loader)
}
