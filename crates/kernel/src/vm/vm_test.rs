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

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::errors::{ExecutionFailure, RuntimeError};
    use crate::manager::Manager;
    use crate::object::{CommandContext, ObjectHandle};
    use ember_common::model::MethodDef;
    use ember_db::{MemoryStore, Store};
    use ember_var::{
        E_ARGS, E_DIV, E_INVARG, E_INVIND, E_MAXREC, E_PERM, E_PROPNF, E_RANGE, E_RECMOVE,
        E_TYPE, E_VARNF, E_VERBNF, Error, ErrorCode, NOTHING, Obj, SYSTEM_OBJECT, Var, v_bool,
        v_empty_list, v_err, v_float, v_int, v_list, v_map, v_objid, v_str,
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use test_case::test_case;
    use unindent::unindent;

    fn world_with(config: RuntimeConfig) -> Manager {
        let manager = Manager::new(Arc::new(MemoryStore::new()), config).unwrap();
        manager.ensure_root().unwrap();
        manager
    }

    fn world() -> Manager {
        world_with(RuntimeConfig::default())
    }

    fn eval(source: &str) -> Var {
        world().eval(SYSTEM_OBJECT, &unindent(source)).unwrap()
    }

    fn exception_of(result: Result<Var, RuntimeError>) -> crate::errors::Exception {
        match result {
            Err(RuntimeError::MethodFailed {
                cause: ExecutionFailure::Exception(e),
                ..
            }) => e,
            other => panic!("expected an exception, got {other:?}"),
        }
    }

    fn eval_err(source: &str) -> Error {
        exception_of(world().eval(SYSTEM_OBJECT, &unindent(source))).error
    }

    /// #1 with the given methods, and #2 inheriting from it.
    fn prototype_and_child(
        manager: &Manager,
        methods: &[(&str, &str)],
    ) -> (ObjectHandle, ObjectHandle) {
        let methods: BTreeMap<String, MethodDef> = methods
            .iter()
            .map(|(name, source)| (name.to_string(), MethodDef::new(unindent(source))))
            .collect();
        let proto = manager.create(NOTHING, BTreeMap::new(), methods).unwrap();
        let child = manager
            .create(proto.id(), BTreeMap::new(), BTreeMap::new())
            .unwrap();
        (proto, child)
    }

    #[test_case("return 1 + 2 * 3;", v_int(7); "precedence")]
    #[test_case("return 7 % 3 + 2 ^ 10;", v_int(1025); "mod and exp")]
    #[test_case("return 7 / 2;", v_int(3); "integer division")]
    #[test_case("return 1.5 * 2;", v_float(3.0); "float coercion")]
    #[test_case("return -(3);", v_int(-3); "unary minus")]
    #[test_case(r#"return "ab" + "cd";"#, v_str("abcd"); "string concatenation")]
    #[test_case("return {1, 2} + {3};", v_list(&[v_int(1), v_int(2), v_int(3)]); "list concatenation")]
    #[test_case("return 1 < 2 && 2 < 3;", v_bool(true); "comparison")]
    #[test_case("return 0 && 1;", v_int(0); "and keeps falsy left side")]
    #[test_case(r#"return 0 || "x";"#, v_str("x"); "or yields right side")]
    #[test_case("return !1;", v_bool(false); "not")]
    #[test_case(r#"return 1 ? "yes" | "no";"#, v_str("yes"); "ternary")]
    #[test_case(r#"return "hello"[2];"#, v_str("e"); "string index")]
    #[test_case(r#"return "hello"[2..4];"#, v_str("ell"); "string range")]
    #[test_case("return {1, 2, 3}[3];", v_int(3); "list index")]
    #[test_case("return 2 in {1, 2, 3};", v_int(2); "membership")]
    #[test_case(r#"return ["a" -> 1]["a"];"#, v_int(1); "map index")]
    #[test_case("x = {1, 2}; return {0, @x, 3};", v_list(&[v_int(0), v_int(1), v_int(2), v_int(3)]); "splice")]
    #[test_case("return null;", Var::from_variant(ember_var::Variant::None); "null literal")]
    #[test_case("let x = 4; return x;", v_int(4); "let declaration")]
    fn test_expressions(source: &str, expected: Var) {
        assert_eq!(eval(source), expected);
    }

    #[test_case("return typeof(#1);", v_str("objref"); "typeof")]
    #[test_case(r#"return tostr("n=", 5, #2);"#, v_str("n=5#2"); "tostr")]
    #[test_case(r#"return length("abc") + length({1}) + length(["k" -> 1]);"#, v_int(5); "length")]
    #[test_case("return is_member(3, {1, 2, 3});", v_int(3); "is_member")]
    #[test_case("return listdelete(listappend({1}, 2), 1);", v_list(&[v_int(2)]); "list editing")]
    #[test_case("return min(3, 1.5, 2);", v_float(1.5); "min")]
    #[test_case("return max(3, 1.5, 2);", v_int(3); "max")]
    #[test_case("return abs(-4);", v_int(4); "abs")]
    #[test_case(r#"return toint(" 42 ") + toint(2.9);"#, v_int(44); "toint")]
    #[test_case("return tofloat(2);", v_float(2.0); "tofloat")]
    #[test_case(r#"return keys(["b" -> 1, "a" -> 2]);"#, v_list(&[v_str("a"), v_str("b")]); "keys")]
    #[test_case("r = random(3); return r >= 1 && r <= 3;", v_bool(true); "random")]
    #[test_case("return time() > 0;", v_bool(true); "time")]
    fn test_value_builtins(source: &str, expected: Var) {
        assert_eq!(eval(source), expected);
    }

    #[test_case("return 1 / 0;", E_DIV; "division by zero")]
    #[test_case("return {1}[5];", E_RANGE; "index out of range")]
    #[test_case(r#"return 1 + "a";"#, E_TYPE; "mismatched operands")]
    #[test_case("return never_assigned;", E_VARNF; "unset variable")]
    #[test_case("return #0.nope;", E_PROPNF; "missing property")]
    #[test_case("return #0:nope();", E_VERBNF; "missing method")]
    #[test_case("return #99.x;", E_INVIND; "missing object")]
    #[test_case("x = 5; return x.y;", E_TYPE; "property of a non-object")]
    #[test_case("raise(E_PERM);", E_PERM; "raise")]
    #[test_case("{a, b} = {1};", E_ARGS; "scatter too few")]
    #[test_case("#0.id = 3;", E_PERM; "reserved key")]
    #[test_case("return random(0);", E_INVARG; "random bound")]
    #[test_case("return {1, @2};", E_TYPE; "splice of a non-list")]
    #[test_case("return length(1);", E_TYPE; "length of a number")]
    #[test_case(r#"return abs("x");"#, E_TYPE; "builtin argument type")]
    #[test_case("return valid();", E_ARGS; "builtin arity")]
    #[test_case("return $nowhere;", E_PROPNF; "missing alias")]
    #[test_case(r#"set_method(#0, "bad", "return (;");"#, E_INVARG; "set_method compiles first")]
    #[test_case("a = create(); b = create(a); chparent(a, b);", E_RECMOVE; "parent cycle")]
    #[test_case("raise(E_CUSTOM_THING);", ErrorCode::ErrCustom("E_CUSTOM_THING".into()); "custom error")]
    fn test_errors(source: &str, expected: ErrorCode) {
        assert_eq!(eval_err(source).err_type, expected);
    }

    #[test]
    fn test_raise_non_error_uses_text_as_message() {
        let e = eval_err(r#"raise("boom");"#);
        assert_eq!(e.err_type, E_INVARG);
        assert_eq!(e.msg.as_deref(), Some("boom"));

        let e = eval_err(r#"raise(E_PERM, "keep out");"#);
        assert_eq!(e, E_PERM.msg("keep out"));
    }

    #[test]
    fn test_range_ending_at_max_int() {
        let result = eval(
            r#"
            n = 0;
            for x in [9223372036854775807..9223372036854775807]
              n = n + 1;
              last = x;
            endfor
            for y in [9223372036854775806..9223372036854775807]
              n = n + 10;
            endfor
            return {n, last};
            "#,
        );
        assert_eq!(result, v_list(&[v_int(21), v_int(i64::MAX)]));
    }

    #[test]
    fn test_loops() {
        let result = eval(
            r#"
            total = 0;
            for x in ({1, 2, 3, 4})
              if (x == 2)
                continue;
              endif
              total = total + x;
            endfor
            for i in [1..3]
              total = total + i * 100;
            endfor
            n = 0;
            while (1)
              n = n + 1;
              if (n > 4)
                break;
              endif
            endwhile
            return {total, n};
            "#,
        );
        assert_eq!(result, v_list(&[v_int(608), v_int(5)]));
    }

    #[test]
    fn test_if_elseif_else() {
        let source = r#"
            if (x == 1)
              return "one";
            elseif (x == 2)
              return "two";
            else
              return "many";
            endif
            "#;
        for (x, expected) in [(1, "one"), (2, "two"), (9, "many")] {
            assert_eq!(eval(&format!("x = {x};\n{}", unindent(source))), v_str(expected));
        }
    }

    #[test]
    fn test_try_except_binds_error() {
        let result = eval(
            r#"
            try
              x = 1 / 0;
            except e (E_DIV, E_RANGE)
              return {"caught", e};
            endtry
            return "missed";
            "#,
        );
        assert_eq!(result, v_list(&[v_str("caught"), v_err(E_DIV)]));
    }

    #[test]
    fn test_except_any_and_fallthrough() {
        let result = eval(
            r#"
            try
              raise(E_PERM, "nope");
            except (E_RANGE)
              r = "range";
            except e (ANY)
              r = e;
            endtry
            return r;
            "#,
        );
        assert_eq!(result, v_err(E_PERM));
    }

    #[test]
    fn test_uncaught_error_passes_through_handler() {
        let e = eval_err(
            r#"
            try
              return {}[1];
            except (E_DIV)
              return 0;
            endtry
            "#,
        );
        assert_eq!(e.err_type, E_RANGE);
    }

    #[test]
    fn test_break_inside_try_closes_the_scope() {
        let e = eval_err(
            r#"
            for x in ({1, 2, 3})
              try
                if (x == 2)
                  break;
                endif
              except (ANY)
                return "stale handler";
              endtry
            endfor
            return 1 / 0;
            "#,
        );
        assert_eq!(e.err_type, E_DIV);
    }

    #[test]
    fn test_scatter_with_defaults_and_rest() {
        let result = eval(
            r#"
            {a, ?b = 5, @rest} = {1};
            {c, ?d = 7} = {2, 3};
            return {a, b, rest, c, d};
            "#,
        );
        assert_eq!(
            result,
            v_list(&[v_int(1), v_int(5), v_empty_list(), v_int(2), v_int(3)])
        );
    }

    #[test]
    fn test_nested_index_assignment() {
        let result = eval(
            r#"
            l = {1, {2, 3}};
            l[2][1] = 9;
            m = ["k" -> 1];
            m["j"] = 2;
            return {l, m};
            "#,
        );
        assert_eq!(
            result,
            v_list(&[
                v_list(&[v_int(1), v_list(&[v_int(9), v_int(3)])]),
                v_map(&[("j", v_int(2)), ("k", v_int(1))]),
            ])
        );
    }

    #[test]
    fn test_property_assignment_persists() {
        let store = Arc::new(MemoryStore::new());
        let manager = Manager::new(store.clone(), RuntimeConfig::default()).unwrap();
        manager.ensure_root().unwrap();
        let result = manager
            .eval(
                SYSTEM_OBJECT,
                &unindent(
                    r#"
                    this.hp = 5;
                    this.stats = ["hp" -> 1];
                    this.stats["hp"] = 7;
                    return {this.hp, this.stats["hp"], this.id};
                    "#,
                ),
            )
            .unwrap();
        assert_eq!(result, v_list(&[v_int(5), v_int(7), v_objid(0)]));

        manager.flush();
        let stored = store.get(SYSTEM_OBJECT).unwrap().unwrap();
        assert_eq!(stored.properties.get("hp"), Some(&v_int(5)));
        assert_eq!(
            stored.properties.get("stats"),
            Some(&v_map(&[("hp", v_int(7))]))
        );
    }

    #[test]
    fn test_activation_variables() {
        let manager = world();
        let (_, child) = prototype_and_child(
            &manager,
            &[("describe", "return {this, verb, args, caller};")],
        );
        assert_eq!(
            child.call("describe", vec![v_int(1)]).unwrap(),
            v_list(&[v_objid(2), v_str("describe"), v_list(&[v_int(1)]), v_objid(2)])
        );
        assert_eq!(
            manager.eval(SYSTEM_OBJECT, "return #2:describe(3);").unwrap(),
            v_list(&[v_objid(2), v_str("describe"), v_list(&[v_int(3)]), v_objid(0)])
        );
    }

    #[test]
    fn test_command_call_binds_player_and_argstr() {
        let manager = world();
        let (proto, child) = prototype_and_child(&manager, &[]);
        proto.set_method(
            "look",
            MethodDef::new("return {player, argstr, verb};")
                .callable()
                .with_aliases(["l"]),
        );
        proto.set_method("secret", MethodDef::new("return 1;"));

        let context = CommandContext::new(Obj::mk_id(7), "at orc");
        assert_eq!(
            child.call_command("l", vec![], &context).unwrap(),
            v_list(&[v_objid(7), v_str("at orc"), v_str("look")])
        );
        assert!(matches!(
            child.call_command("secret", vec![], &context),
            Err(RuntimeError::MethodNotFound(_, _))
        ));
    }

    #[test]
    fn test_nested_errors_are_catchable_and_traced() {
        let manager = world();
        let (_, child) = prototype_and_child(
            &manager,
            &[
                ("inner", r#"raise(E_INVARG, "boom");"#),
                (
                    "outer",
                    r#"
                    try
                      return this:inner();
                    except e (E_INVARG)
                      return "handled";
                    endtry
                    "#,
                ),
                ("loud", "return this:inner();"),
            ],
        );
        assert_eq!(child.call("outer", vec![]).unwrap(), v_str("handled"));

        let err = child.call("loud", vec![]).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("loud"), "{text}");
        assert!(text.contains("boom"), "{text}");
        let exception = exception_of(Err(err));
        assert_eq!(
            exception.backtrace(),
            vec![
                "#2:inner (defined on #1), line 1".to_string(),
                "#2:loud (defined on #1), line 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_nested_compile_failure_is_invarg() {
        let manager = world();
        let (_, child) = prototype_and_child(
            &manager,
            &[("broken", "return (;"), ("caller", "return this:broken();")],
        );
        let e = exception_of(child.call("caller", vec![])).error;
        assert_eq!(e.err_type, E_INVARG);
        assert!(e.message().contains("does not compile"));

        assert!(matches!(
            child.call("broken", vec![]),
            Err(RuntimeError::MethodFailed {
                cause: ExecutionFailure::Compile(_),
                ..
            })
        ));
    }

    #[test]
    fn test_recursion_limit() {
        let manager = world_with(RuntimeConfig {
            max_stack_depth: 5,
            ..Default::default()
        });
        let (_, child) = prototype_and_child(&manager, &[("recurse", "return this:recurse();")]);
        let exception = exception_of(child.call("recurse", vec![]));
        assert_eq!(exception.error.err_type, E_MAXREC);
        assert_eq!(exception.trace.len(), 5);
    }

    #[test]
    fn test_object_builtins() {
        let result = eval(
            r#"
            o = create(#0, ["hp" -> 3]);
            set_method(o, "double", "return this.hp * 2;");
            kid = create(o);
            kid.hp = 10;
            return {kid:double(), o:double(), has_method(kid, "double"), properties(kid), parent(kid) == o, valid(#404)};
            "#,
        );
        assert_eq!(
            result,
            v_list(&[
                v_int(20),
                v_int(6),
                v_bool(true),
                v_list(&[v_str("hp")]),
                v_bool(true),
                v_bool(false),
            ])
        );
    }

    #[test]
    fn test_aliases_recycling_and_search() {
        let result = eval(
            r#"
            set_alias("room", create());
            same = $room == alias("room");
            a = create();
            a.kind = "orc";
            b = create(a);
            c = create();
            gone = create(a);
            recycle(gone);
            return {same, find_by_property("kind", "orc"), valid(gone)};
            "#,
        );
        assert_eq!(
            result,
            v_list(&[
                v_bool(true),
                v_list(&[v_objid(2), v_objid(3)]),
                v_bool(false),
            ])
        );
    }

    #[test]
    fn test_eval_compile_error() {
        let manager = world();
        let result = manager.eval(SYSTEM_OBJECT, "return (;");
        assert!(matches!(
            result,
            Err(RuntimeError::MethodFailed {
                cause: ExecutionFailure::Compile(_),
                ..
            })
        ));
        assert_eq!(manager.compiled_len(), 0);
    }
}
