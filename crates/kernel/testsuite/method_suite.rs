// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Running methods: failures, the compiled-method cache, and state changes made from method code.

mod common;

use common::{child_of, methods, props, reopen, world};
use ember_common::model::MethodDef;
use ember_db::Store;
use ember_kernel::{CommandContext, ExecutionFailure, RuntimeError};
use ember_var::{E_INVARG, Obj, SYSTEM_OBJECT, v_int, v_list, v_obj, v_str};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::rc::Rc;

#[test]
fn test_uncompilable_method_names_the_method() {
    let (_, manager) = world();
    let object = manager
        .create(SYSTEM_OBJECT, BTreeMap::new(), methods(&[("foo", "return (;")]))
        .unwrap();

    let err = object.call("foo", vec![]).unwrap_err();
    assert!(err.to_string().contains("foo"), "{err}");
    assert!(matches!(
        err,
        RuntimeError::MethodFailed {
            cause: ExecutionFailure::Compile(_),
            ..
        }
    ));
    assert!(err.user_message().contains("foo"));
    assert_eq!(manager.compiled_len(), 0);
}

#[test]
fn test_missing_method() {
    let (_, manager) = world();
    let object = child_of(&manager, SYSTEM_OBJECT);
    let err = object.call("foo", vec![]).unwrap_err();
    assert!(matches!(err, RuntimeError::MethodNotFound(_, ref name) if name == "foo"));
    assert!(err.to_string().contains("foo"));
}

#[test]
fn test_raised_error_names_method_and_message() {
    let (_, manager) = world();
    let object = manager
        .create(
            SYSTEM_OBJECT,
            BTreeMap::new(),
            methods(&[("bar", r#"raise("boom");"#)]),
        )
        .unwrap();

    let err = object.call("bar", vec![]).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("bar"), "{text}");
    assert!(text.contains("boom"), "{text}");
    let RuntimeError::MethodFailed {
        cause: ExecutionFailure::Exception(exception),
        ..
    } = err
    else {
        panic!("expected an exception");
    };
    assert_eq!(exception.error.err_type, E_INVARG);
    assert_eq!(exception.trace.len(), 1);
}

#[test]
fn test_methods_compile_once() {
    let (_, manager) = world();
    let proto = manager
        .create(
            SYSTEM_OBJECT,
            BTreeMap::new(),
            methods(&[("double", "return args[1] * 2;")]),
        )
        .unwrap();
    let kid = child_of(&manager, proto.id());

    assert_eq!(proto.call("double", vec![v_int(2)]).unwrap(), v_int(4));
    let first = manager.compiled_method(proto.id(), "double").unwrap();
    assert_eq!(kid.call("double", vec![v_int(5)]).unwrap(), v_int(10));
    assert_eq!(proto.call("double", vec![v_int(6)]).unwrap(), v_int(12));
    let again = manager.compiled_method(proto.id(), "double").unwrap();

    assert!(Rc::ptr_eq(&first, &again));
    assert_eq!(manager.compilations(), 1);
    assert_eq!(manager.compiled_len(), 1);
}

#[test]
fn test_redefining_a_method_recompiles_only_it() {
    let (_, manager) = world();
    let proto = manager
        .create(
            SYSTEM_OBJECT,
            BTreeMap::new(),
            methods(&[("one", "return 1;"), ("two", "return 2;")]),
        )
        .unwrap();
    proto.call("one", vec![]).unwrap();
    proto.call("two", vec![]).unwrap();
    assert_eq!(manager.compilations(), 2);

    proto.set_method("one", MethodDef::new("return 11;"));
    assert_eq!(proto.call("one", vec![]).unwrap(), v_int(11));
    assert_eq!(proto.call("two", vec![]).unwrap(), v_int(2));
    assert_eq!(manager.compilations(), 3);

    manager.invalidate(proto.id());
    assert_eq!(manager.compiled_len(), 0);
}

#[test]
fn test_eval_is_not_cached() {
    let (_, manager) = world();
    assert_eq!(manager.eval(SYSTEM_OBJECT, "return 1 + 1;").unwrap(), v_int(2));
    assert_eq!(manager.eval(SYSTEM_OBJECT, "return 1 + 1;").unwrap(), v_int(2));
    assert_eq!(manager.compiled_len(), 0);
}

#[test]
fn test_heal_updates_the_receiver_only() {
    let (store, manager) = world();
    let a = manager
        .create(
            SYSTEM_OBJECT,
            props(&[("hp", v_int(100))]),
            methods(&[(
                "heal",
                r#"
                this.hp = this.hp + 10;
                return this.hp;
                "#,
            )]),
        )
        .unwrap();
    assert_eq!(a.call("heal", vec![]).unwrap(), v_int(110));
    manager.flush();
    assert_eq!(
        store.get(a.id()).unwrap().unwrap().properties.get("hp"),
        Some(&v_int(110))
    );

    let b = child_of(&manager, a.id());
    assert_eq!(b.get("hp").unwrap(), Some(v_int(110)));
    assert_eq!(b.call("heal", vec![]).unwrap(), v_int(120));
    assert_eq!(b.get_own("hp"), Some(v_int(120)));
    assert_eq!(a.get_own("hp"), Some(v_int(110)));

    manager.flush();
    assert_eq!(
        store.get(b.id()).unwrap().unwrap().properties.get("hp"),
        Some(&v_int(120))
    );
    assert_eq!(
        store.get(a.id()).unwrap().unwrap().properties.get("hp"),
        Some(&v_int(110))
    );

    let restarted = reopen(&store);
    assert_eq!(
        restarted.object(b.id()).unwrap().get_own("hp"),
        Some(v_int(120))
    );
}

#[test]
fn test_methods_call_each_other() {
    let (_, manager) = world();
    let proto = manager
        .create(
            SYSTEM_OBJECT,
            props(&[("name", v_str("orc"))]),
            methods(&[
                ("title", r#"return "the " + this.name;"#),
                ("greet", r#"return "hail, " + this:title() + "!";"#),
                ("greet_other", "return args[1]:greet();"),
            ]),
        )
        .unwrap();
    let kid = child_of(&manager, proto.id());
    kid.set("name", v_str("goblin"));

    assert_eq!(kid.call("greet", vec![]).unwrap(), v_str("hail, the goblin!"));
    assert_eq!(
        proto.call("greet_other", vec![v_obj(kid.id())]).unwrap(),
        v_str("hail, the goblin!")
    );
}

#[test]
fn test_commands_resolve_by_alias() {
    let (_, manager) = world();
    let proto = manager
        .create(SYSTEM_OBJECT, BTreeMap::new(), BTreeMap::new())
        .unwrap();
    proto.set_method(
        "look",
        MethodDef::new("return {player, argstr, this};")
            .callable()
            .with_aliases(["l", "examine"]),
    );
    let kid = child_of(&manager, proto.id());

    let player = Obj::mk_id(42);
    let context = CommandContext::new(player, "at the sky");
    let expected = v_list(&[v_obj(player), v_str("at the sky"), v_obj(kid.id())]);
    assert_eq!(kid.call_command("examine", vec![], &context).unwrap(), expected);
    assert_eq!(kid.call_command("look", vec![], &context).unwrap(), expected);
    assert!(matches!(
        kid.call_command("listen", vec![], &context),
        Err(RuntimeError::MethodNotFound(_, _))
    ));
}

#[test]
fn test_methods_persist_with_their_object() {
    let (store, manager) = world();
    let object = child_of(&manager, SYSTEM_OBJECT);
    object.set_method("answer", MethodDef::new("return 42;"));
    object.save().unwrap();

    let restarted = reopen(&store);
    let object = restarted.object(object.id()).unwrap();
    assert_eq!(object.call("answer", vec![]).unwrap(), v_int(42));
    assert!(object.own_method("answer").is_some());
}

#[test]
fn test_refresh_picks_up_edited_source() {
    let (store, manager) = world();
    let object = manager
        .create(SYSTEM_OBJECT, BTreeMap::new(), methods(&[("answer", "return 1;")]))
        .unwrap();
    assert_eq!(object.call("answer", vec![]).unwrap(), v_int(1));

    let mut record = store.get(object.id()).unwrap().unwrap();
    record
        .methods
        .insert("answer".into(), MethodDef::new("return 2;"));
    store.put(record).unwrap();
    assert_eq!(object.call("answer", vec![]).unwrap(), v_int(1));

    object.refresh().unwrap();
    assert_eq!(object.call("answer", vec![]).unwrap(), v_int(2));
    assert_eq!(manager.compilations(), 2);
}
