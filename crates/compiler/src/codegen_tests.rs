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

mod tests {
    use crate::builtins::BUILTINS;
    use crate::codegen::compile;
    use crate::labels::{Label, Offset};
    use crate::names::{GlobalName, Name};
    use crate::opcode::Op::*;
    use crate::opcode::{ScatterArgs, ScatterLabel};
    use crate::CompileOptions;
    use ember_common::model::CompileError;
    use ember_var::{E_PROPNF, v_err, v_str};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_simple_add_expr() {
        let program = "1 + 2;";
        let binary = compile(program, CompileOptions::default()).unwrap();
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![ImmInt(1), ImmInt(2), Add, Pop, Done]
        );
    }

    #[test]
    fn test_var_assign_retr_expr() {
        let program = "a = 1 + 2; return a;";
        let binary = compile(program, CompileOptions::default()).unwrap();

        let a = binary.find_var("a");

        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![ImmInt(1), ImmInt(2), Add, Put(a), Pop, Push(a), Return, Done]
        );
    }

    #[test]
    fn test_if_stmt() {
        let program = "if (1 == 2) return 5; elseif (2 == 3) return 3; else return 6; endif";
        let binary = compile(program, CompileOptions::default()).unwrap();

        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                ImmInt(1),
                ImmInt(2),
                Eq,
                If(Label(1)),
                ImmInt(5),
                Return,
                Jump { label: Label(0) },
                ImmInt(2),
                ImmInt(3),
                Eq,
                If(Label(2)),
                ImmInt(3),
                Return,
                Jump { label: Label(0) },
                ImmInt(6),
                Return,
                Done
            ]
        );
        assert_eq!(binary.jump_labels[0].position, Offset(16));
        assert_eq!(binary.jump_labels[1].position, Offset(7));
        assert_eq!(binary.jump_labels[2].position, Offset(14));
    }

    #[test]
    fn test_while_stmt() {
        let program = "while (1) x = x + 1; endwhile";
        let binary = compile(program, CompileOptions::default()).unwrap();

        let x = binary.find_var("x");

        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                ImmInt(1),
                While(Label(1)),
                Push(x),
                ImmInt(1),
                Add,
                Put(x),
                Pop,
                Jump { label: Label(0) },
                Done
            ]
        );
        assert_eq!(binary.jump_labels[1].position, Offset(8));
    }

    #[test]
    fn test_for_list_stmt() {
        let program = "for x in ({1, 2}) y = x; endfor";
        let binary = compile(program, CompileOptions::default()).unwrap();

        let x = binary.find_var("x");
        let y = binary.find_var("y");

        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                ImmInt(1),
                MakeSingletonList,
                ImmInt(2),
                ListAddTail,
                ImmInt(0),
                ForList {
                    id: x,
                    end_label: Label(1)
                },
                Push(x),
                Put(y),
                Pop,
                Jump { label: Label(0) },
                Done
            ]
        );
        assert_eq!(binary.jump_labels[0].position, Offset(5));
        assert_eq!(binary.jump_labels[0].name, Some(x));
        assert_eq!(binary.jump_labels[1].position, Offset(10));
    }

    #[test]
    fn test_break_leaves_loop_with_its_stack() {
        let program = "for i in [1..3] while (1) break; endwhile continue; endfor";
        let binary = compile(program, CompileOptions::default()).unwrap();
        let i = binary.find_var("i");

        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                ImmInt(1),
                ImmInt(3),
                ForRange {
                    id: i,
                    end_label: Label(1)
                },
                ImmInt(1),
                While(Label(3)),
                Exit {
                    stack: Offset(2),
                    label: Label(3),
                    scope_depth: 0
                },
                Jump { label: Label(2) },
                Exit {
                    stack: Offset(2),
                    label: Label(0),
                    scope_depth: 0
                },
                Jump { label: Label(0) },
                Done
            ]
        );
    }

    #[test]
    fn test_break_inside_try_remembers_scope_depth() {
        let program = "while (1) try break; except (ANY) endtry endwhile";
        let binary = compile(program, CompileOptions::default()).unwrap();
        assert!(binary.main_vector.contains(&Exit {
            stack: Offset(0),
            label: Label(1),
            scope_depth: 0
        }));

        let program = "try while (1) break; endwhile except (ANY) endtry";
        let binary = compile(program, CompileOptions::default()).unwrap();
        assert!(
            binary
                .main_vector
                .iter()
                .any(|op| matches!(op, Exit { scope_depth: 1, .. }))
        );
    }

    #[test]
    fn test_index_set() {
        let program = "l[2] = 5;";
        let binary = compile(program, CompileOptions::default()).unwrap();
        let l = binary.find_var("l");
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Push(l),
                ImmInt(2),
                ImmInt(5),
                PutTemp,
                IndexSet,
                Put(l),
                Pop,
                PushTemp,
                Pop,
                Done
            ]
        );
    }

    #[test]
    fn test_nested_property_index_set() {
        let program = r#"this.stats["hp"] = 5;"#;
        let binary = compile(program, CompileOptions::default()).unwrap();
        let this = Name::from(GlobalName::This);
        let stats = binary.find_literal(v_str("stats"));
        let hp = binary.find_literal(v_str("hp"));
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Push(this),
                Imm(stats),
                PushGetProp,
                Imm(hp),
                ImmInt(5),
                PutTemp,
                IndexSet,
                PutProp,
                Pop,
                PushTemp,
                Pop,
                Done
            ]
        );
    }

    #[test]
    fn test_prop_assign() {
        let program = "this.hp = this.hp + 10;";
        let binary = compile(program, CompileOptions::default()).unwrap();
        let this = Name::from(GlobalName::This);
        assert_eq!(binary.literals, vec![v_str("hp")]);
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Push(this),
                Imm(Label(0)),
                Push(this),
                Imm(Label(0)),
                GetProp,
                ImmInt(10),
                Add,
                PutProp,
                Pop,
                Done
            ]
        );
    }

    #[test]
    fn test_verb_call() {
        let program = "this:heal(5);";
        let binary = compile(program, CompileOptions::default()).unwrap();
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Push(Name::from(GlobalName::This)),
                Imm(binary.find_literal(v_str("heal"))),
                ImmInt(5),
                MakeSingletonList,
                CallVerb,
                Pop,
                Done
            ]
        );
    }

    #[test]
    fn test_builtin_call_and_alias() {
        let program = "return tostr($room);";
        let binary = compile(program, CompileOptions::default()).unwrap();
        let tostr = BUILTINS.find_builtin("tostr").unwrap();
        let alias = BUILTINS.find_builtin("alias").unwrap();
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Imm(binary.find_literal(v_str("room"))),
                MakeSingletonList,
                FuncCall { id: alias },
                MakeSingletonList,
                FuncCall { id: tostr },
                Return,
                Done
            ]
        );
    }

    #[test]
    fn test_scatter_assign() {
        let program = "{a, ?b = 2, @c} = args;";
        let binary = compile(program, CompileOptions::default()).unwrap();
        let (a, b, c) = (
            binary.find_var("a"),
            binary.find_var("b"),
            binary.find_var("c"),
        );
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Push(Name::from(GlobalName::Args)),
                Scatter(Offset(0)),
                ImmInt(2),
                Put(b),
                Pop,
                Pop,
                Done
            ]
        );
        assert_eq!(
            binary.scatter_tables[0],
            ScatterArgs {
                labels: vec![
                    ScatterLabel::Required(a),
                    ScatterLabel::Optional(b, Some(Label(0))),
                    ScatterLabel::Rest(c),
                ],
                done: Label(1),
            }
        );
        assert_eq!(binary.jump_labels[0].position, Offset(2));
        assert_eq!(binary.jump_labels[1].position, Offset(5));
    }

    #[test]
    fn test_try_except() {
        let program = "try x = 1; except e (E_PROPNF) x = 2; endtry";
        let binary = compile(program, CompileOptions::default()).unwrap();
        let x = binary.find_var("x");
        let e = binary.find_var("e");
        assert_eq!(binary.literals, vec![v_err(E_PROPNF)]);
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![
                Imm(Label(0)),
                MakeSingletonList,
                PushCatchLabel(Label(0)),
                TryExcept {
                    num_excepts: 1,
                    end_label: Label(1)
                },
                ImmInt(1),
                Put(x),
                Pop,
                EndExcept(Label(1)),
                Put(e),
                Pop,
                ImmInt(2),
                Put(x),
                Pop,
                Done
            ]
        );
        assert_eq!(binary.jump_labels[0].position, Offset(8));
        assert_eq!(binary.jump_labels[1].position, Offset(13));
    }

    #[test]
    fn test_and_short_circuit() {
        let program = "return 1 && 2;";
        let binary = compile(program, CompileOptions::default()).unwrap();
        assert_eq!(
            *binary.main_vector.as_ref(),
            vec![ImmInt(1), And(Label(0)), ImmInt(2), Return, Done]
        );
        assert_eq!(binary.jump_labels[0].position, Offset(3));
    }

    #[test]
    fn test_line_number_spans() {
        let program = "x = 1;\n\ny = 2;";
        let binary = compile(program, CompileOptions::default()).unwrap();
        assert_eq!(binary.line_number_spans, vec![(0, 1), (3, 3)]);
        assert_eq!(binary.line_no_for(4), 3);
    }

    #[test_case("return frobnicate(1);", CompileError::UnknownBuiltinFunction("frobnicate".into()); "unknown builtin")]
    #[test_case("break;", CompileError::ExitOutsideLoop("break".into()); "break outside loop")]
    #[test_case("if (1) continue; endif", CompileError::ExitOutsideLoop("continue".into()); "continue outside loop")]
    #[test_case("1 = 2;", CompileError::InvalidAssignment; "assign to literal")]
    #[test_case("x[1..2] = 2;", CompileError::InvalidAssignment; "assign to range")]
    fn test_compile_errors(program: &str, expected: CompileError) {
        assert_eq!(
            compile(program, CompileOptions::default()).unwrap_err(),
            expected
        );
    }
}
