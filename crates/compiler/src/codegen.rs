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

//! Lowers the syntax tree to the flat opcode vector the VM runs.

use std::sync::Arc;

use ember_common::model::CompileError;
use ember_var::{Var, Variant};
use tracing::trace;

use crate::ast::{
    Arg, BinaryOp, CatchCodes, CondArm, ExceptArm, Expr, ScatterItem, ScatterKind, Stmt, StmtNode,
    UnaryOp,
};
use crate::builtins::BUILTINS;
use crate::labels::{JumpLabel, Label, Offset};
use crate::names::{Name, Names};
use crate::opcode::{Op, ScatterArgs, ScatterLabel};
use crate::parse::{CompileOptions, Parse, parse_program};
use crate::program::Program;

/// Where `continue` and `break` go from inside a loop, and how much of the value stack and how
/// many try scopes survive the jump.
struct LoopExits {
    continue_to: Label,
    continue_stack: Offset,
    break_to: Label,
    break_stack: Offset,
    open_scopes: u16,
}

#[derive(Clone, Copy)]
enum ExitKind {
    Break,
    Continue,
}

struct CodeGenerator {
    ops: Vec<Op>,
    labels: Vec<JumpLabel>,
    names: Names,
    literals: Vec<Var>,
    loops: Vec<LoopExits>,
    scatter_tables: Vec<ScatterArgs>,
    depth: usize,
    max_depth: usize,
    open_scopes: u16,
    spans: Vec<(usize, usize)>,
}

impl CodeGenerator {
    fn new(names: Names) -> Self {
        Self {
            ops: vec![],
            labels: vec![],
            names,
            literals: vec![],
            loops: vec![],
            scatter_tables: vec![],
            depth: 0,
            max_depth: 0,
            open_scopes: 0,
            spans: vec![],
        }
    }

    /// A new label, provisionally pointing at the next op.
    fn label(&mut self, owner: Option<Name>) -> Label {
        let id = Label(self.labels.len() as u16);
        self.labels.push(JumpLabel {
            id,
            name: owner,
            position: self.ops.len().into(),
        });
        id
    }

    /// Point `label` at the next op to be emitted.
    fn bind(&mut self, label: Label) {
        let here = self.ops.len().into();
        if let Some(jump) = self.labels.get_mut(label.0 as usize) {
            jump.position = here;
        }
    }

    fn literal(&mut self, v: &Var) -> Label {
        let slot = match self.literals.iter().position(|known| known == v) {
            Some(slot) => slot,
            None => {
                self.literals.push(v.clone());
                self.literals.len() - 1
            }
        };
        Label(slot as u16)
    }

    fn emit(&mut self, op: Op) {
        self.ops.push(op);
    }

    fn grow(&mut self, n: usize) {
        self.depth += n;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn shrink(&mut self, n: usize) {
        self.depth -= n;
    }

    /// Emit an op that leaves one more value on the stack.
    fn emit_push(&mut self, op: Op) {
        self.emit(op);
        self.grow(1);
    }

    /// Emit an op that consumes `n` more values than it produces.
    fn emit_consume(&mut self, op: Op, n: usize) {
        self.emit(op);
        self.shrink(n);
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        stmts.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    // Expressions

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Value(v) => {
                let op = match v.variant() {
                    Variant::None => Op::ImmNone,
                    Variant::Obj(o) => Op::ImmObjid(*o),
                    Variant::Int(i) => Op::ImmInt(*i),
                    Variant::Float(f) => Op::ImmFloat(*f),
                    _ => Op::Imm(self.literal(v)),
                };
                self.emit_push(op);
            }
            Expr::Id(name) => self.emit_push(Op::Push(*name)),
            Expr::And(left, right) => self.short_circuit(left, right, Op::And)?,
            Expr::Or(left, right) => self.short_circuit(left, right, Op::Or)?,
            Expr::Binary(op, left, right) => {
                self.expr(left)?;
                self.expr(right)?;
                self.emit_consume(binary_op(op), 1);
            }
            Expr::Unary(op, operand) => {
                self.expr(operand)?;
                self.emit(match op {
                    UnaryOp::Neg => Op::UnaryMinus,
                    UnaryOp::Not => Op::Not,
                });
            }
            Expr::Index(base, index) => {
                self.expr(base)?;
                self.expr(index)?;
                self.emit_consume(Op::Ref, 1);
            }
            Expr::Range { base, from, to } => {
                self.expr(base)?;
                self.expr(from)?;
                self.expr(to)?;
                self.emit_consume(Op::RangeRef, 2);
            }
            Expr::Prop { location, property } => {
                self.expr(location)?;
                self.expr(property)?;
                self.emit_consume(Op::GetProp, 1);
            }
            Expr::Call { function, args } => {
                let id = BUILTINS
                    .find_builtin(function)
                    .ok_or_else(|| CompileError::UnknownBuiltinFunction(function.clone()))?;
                self.args(args)?;
                self.emit(Op::FuncCall { id });
            }
            Expr::Verb {
                location,
                verb,
                args,
            } => {
                self.expr(location)?;
                self.expr(verb)?;
                self.args(args)?;
                self.emit_consume(Op::CallVerb, 2);
            }
            Expr::Cond {
                condition,
                consequence,
                alternative,
            } => {
                self.expr(condition)?;
                let otherwise = self.label(None);
                self.emit_consume(Op::IfQues(otherwise), 1);
                self.expr(consequence)?;
                let done = self.label(None);
                self.emit_consume(Op::Jump { label: done }, 1);
                self.bind(otherwise);
                self.expr(alternative)?;
                self.bind(done);
            }
            Expr::List(items) => self.args(items)?,
            Expr::Map(entries) => {
                self.emit_push(Op::MakeMap);
                for (key, value) in entries {
                    self.expr(key)?;
                    self.expr(value)?;
                    self.emit_consume(Op::MapInsert, 2);
                }
            }
            Expr::Scatter(items, source) => self.scatter(items, source)?,
            Expr::Assign { left, right } => self.assign(left, right)?,
        }
        Ok(())
    }

    /// `And`/`Or` leave the left value in place and jump when it decides the result; otherwise
    /// they drop it and the right side runs.
    fn short_circuit(
        &mut self,
        left: &Expr,
        right: &Expr,
        op: fn(Label) -> Op,
    ) -> Result<(), CompileError> {
        self.expr(left)?;
        let done = self.label(None);
        self.emit_consume(op(done), 1);
        self.expr(right)?;
        self.bind(done);
        Ok(())
    }

    /// Build a list from `args` on the stack, splicing `@` arguments.
    fn args(&mut self, args: &[Arg]) -> Result<(), CompileError> {
        let Some((first, rest)) = args.split_first() else {
            self.emit_push(Op::ImmEmptyList);
            return Ok(());
        };
        match first {
            Arg::Normal(e) => {
                self.expr(e)?;
                self.emit(Op::MakeSingletonList);
            }
            Arg::Splice(e) => {
                self.expr(e)?;
                self.emit(Op::CheckListForSplice);
            }
        }
        for arg in rest {
            match arg {
                Arg::Normal(e) => {
                    self.expr(e)?;
                    self.emit_consume(Op::ListAddTail, 1);
                }
                Arg::Splice(e) => {
                    self.expr(e)?;
                    self.emit_consume(Op::ListAppend, 1);
                }
            }
        }
        Ok(())
    }

    // Assignment

    fn assign(&mut self, target: &Expr, value: &Expr) -> Result<(), CompileError> {
        self.lvalue(target, false)?;
        self.expr(value)?;
        let indexed = matches!(target, Expr::Index(..));
        if indexed {
            self.emit(Op::PutTemp);
        }
        // Store back outwards: each index level rebuilds its container, ending at the variable
        // or property that holds the outermost one.
        let mut target = target;
        while let Expr::Index(base, _) = target {
            self.emit_consume(Op::IndexSet, 2);
            target = base;
        }
        match target {
            Expr::Id(name) => self.emit(Op::Put(*name)),
            Expr::Prop { .. } => self.emit_consume(Op::PutProp, 2),
            _ => return Err(CompileError::InvalidAssignment),
        }
        if indexed {
            self.emit(Op::Pop);
            self.emit(Op::PushTemp);
        }
        Ok(())
    }

    /// Push what an assignment to `target` needs underneath the new value. Containers are only
    /// fetched when a deeper index will be written into them.
    fn lvalue(&mut self, target: &Expr, nested: bool) -> Result<(), CompileError> {
        match target {
            Expr::Index(base, index) => {
                self.lvalue(base, true)?;
                self.expr(index)?;
                if nested {
                    self.emit_push(Op::PushRef);
                }
            }
            Expr::Id(name) => {
                if nested {
                    self.emit_push(Op::Push(*name));
                }
            }
            Expr::Prop { location, property } => {
                self.expr(location)?;
                self.expr(property)?;
                if nested {
                    self.emit_push(Op::PushGetProp);
                }
            }
            _ => return Err(CompileError::InvalidAssignment),
        }
        Ok(())
    }

    fn scatter(&mut self, items: &[ScatterItem], source: &Expr) -> Result<(), CompileError> {
        self.expr(source)?;
        let mut defaults = vec![];
        let mut table = vec![];
        for item in items {
            let entry = match item.kind {
                ScatterKind::Required => ScatterLabel::Required(item.id),
                ScatterKind::Rest => ScatterLabel::Rest(item.id),
                ScatterKind::Optional => {
                    let default = match &item.expr {
                        Some(default) => {
                            let label = self.label(None);
                            defaults.push((label, item.id, default));
                            Some(label)
                        }
                        None => None,
                    };
                    ScatterLabel::Optional(item.id, default)
                }
            };
            table.push(entry);
        }
        let done = self.label(None);
        let offset = Offset(self.scatter_tables.len() as u16);
        self.scatter_tables.push(ScatterArgs {
            labels: table,
            done,
        });
        self.emit(Op::Scatter(offset));
        for (label, id, default) in defaults {
            self.bind(label);
            self.expr(default)?;
            self.emit(Op::Put(id));
            self.emit_consume(Op::Pop, 1);
        }
        self.bind(done);
        Ok(())
    }

    // Statements

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.spans.push((self.ops.len(), stmt.line_col.0));
        match &stmt.node {
            StmtNode::Cond { arms, otherwise } => self.conditional(arms, otherwise.as_deref())?,
            StmtNode::ForList { id, expr, body } => {
                self.expr(expr)?;
                // Counter, 0-based.
                self.emit_push(Op::ImmInt(0));
                let top = self.label(Some(*id));
                let end = self.label(Some(*id));
                self.bind(top);
                self.emit(Op::ForList {
                    id: *id,
                    end_label: end,
                });
                self.loop_body(top, end, 2, body)?;
            }
            StmtNode::ForRange { from, to, id, body } => {
                self.expr(from)?;
                self.expr(to)?;
                let top = self.label(Some(*id));
                let end = self.label(Some(*id));
                self.bind(top);
                self.emit(Op::ForRange {
                    id: *id,
                    end_label: end,
                });
                self.loop_body(top, end, 2, body)?;
            }
            StmtNode::While { condition, body } => {
                let top = self.label(None);
                let end = self.label(None);
                self.bind(top);
                self.expr(condition)?;
                self.emit_consume(Op::While(end), 1);
                self.loop_body(top, end, 0, body)?;
            }
            StmtNode::TryExcept { body, excepts } => self.try_except(body, excepts)?,
            StmtNode::Break => self.exit(ExitKind::Break)?,
            StmtNode::Continue => self.exit(ExitKind::Continue)?,
            StmtNode::Return(Some(value)) => {
                self.expr(value)?;
                self.emit_consume(Op::Return, 1);
            }
            StmtNode::Return(None) => self.emit(Op::Return0),
            StmtNode::Expr(e) => {
                self.expr(e)?;
                self.emit_consume(Op::Pop, 1);
            }
        }
        Ok(())
    }

    fn conditional(
        &mut self,
        arms: &[CondArm],
        otherwise: Option<&[Stmt]>,
    ) -> Result<(), CompileError> {
        let end = self.label(None);
        for arm in arms {
            self.expr(&arm.condition)?;
            let next_arm = self.label(None);
            self.emit_consume(Op::If(next_arm), 1);
            self.block(&arm.statements)?;
            self.emit(Op::Jump { label: end });
            self.bind(next_arm);
        }
        if let Some(otherwise) = otherwise {
            self.block(otherwise)?;
        }
        self.bind(end);
        Ok(())
    }

    /// The body of a loop whose head op sits at `top` and leaves `loop_state` values (list and
    /// counter, or range bounds) on the stack while it runs.
    fn loop_body(
        &mut self,
        top: Label,
        end: Label,
        loop_state: usize,
        body: &[Stmt],
    ) -> Result<(), CompileError> {
        self.loops.push(LoopExits {
            continue_to: top,
            continue_stack: self.depth.into(),
            break_to: end,
            break_stack: (self.depth - loop_state).into(),
            open_scopes: self.open_scopes,
        });
        self.block(body)?;
        self.emit(Op::Jump { label: top });
        self.loops.pop();
        self.bind(end);
        self.shrink(loop_state);
        Ok(())
    }

    fn exit(&mut self, kind: ExitKind) -> Result<(), CompileError> {
        let Some(exits) = self.loops.last() else {
            let word = match kind {
                ExitKind::Break => "break",
                ExitKind::Continue => "continue",
            };
            return Err(CompileError::ExitOutsideLoop(word.to_string()));
        };
        let (stack, label) = match kind {
            ExitKind::Break => (exits.break_stack, exits.break_to),
            ExitKind::Continue => (exits.continue_stack, exits.continue_to),
        };
        let scope_depth = exits.open_scopes;
        self.emit(Op::Exit {
            stack,
            label,
            scope_depth,
        });
        Ok(())
    }

    fn try_except(&mut self, body: &[Stmt], excepts: &[ExceptArm]) -> Result<(), CompileError> {
        let mut handlers = Vec::with_capacity(excepts.len());
        for arm in excepts {
            match &arm.codes {
                CatchCodes::Codes(codes) => self.args(codes)?,
                CatchCodes::Any => self.emit_push(Op::ImmInt(0)),
            }
            let handler = self.label(None);
            self.emit(Op::PushCatchLabel(handler));
            handlers.push(handler);
        }
        self.shrink(excepts.len());
        let end = self.label(None);
        self.emit(Op::TryExcept {
            num_excepts: excepts.len() as u16,
            end_label: end,
        });

        self.open_scopes += 1;
        self.block(body)?;
        self.open_scopes -= 1;
        self.emit(Op::EndExcept(end));

        for (i, (arm, handler)) in excepts.iter().zip(handlers).enumerate() {
            // Handlers are entered with the raised error on the stack.
            self.bind(handler);
            self.grow(1);
            if let Some(id) = arm.id {
                self.emit(Op::Put(id));
            }
            self.emit_consume(Op::Pop, 1);
            self.block(&arm.statements)?;
            if i + 1 < excepts.len() {
                self.emit(Op::Jump { label: end });
            }
        }
        self.bind(end);
        Ok(())
    }

    fn finish(mut self) -> Program {
        self.emit(Op::Done);
        debug_assert_eq!(self.depth, 0, "value stack unbalanced after codegen");
        trace!(ops = self.ops.len(), max_depth = self.max_depth, "compiled program");
        Program {
            literals: self.literals,
            jump_labels: self.labels,
            var_names: self.names,
            scatter_tables: self.scatter_tables,
            main_vector: Arc::new(self.ops),
            line_number_spans: self.spans,
        }
    }
}

fn binary_op(op: &BinaryOp) -> Op {
    match op {
        BinaryOp::Add => Op::Add,
        BinaryOp::Sub => Op::Sub,
        BinaryOp::Mul => Op::Mul,
        BinaryOp::Div => Op::Div,
        BinaryOp::Mod => Op::Mod,
        BinaryOp::Exp => Op::Exp,
        BinaryOp::Eq => Op::Eq,
        BinaryOp::NEq => Op::Ne,
        BinaryOp::Lt => Op::Lt,
        BinaryOp::LtE => Op::Le,
        BinaryOp::Gt => Op::Gt,
        BinaryOp::GtE => Op::Ge,
        BinaryOp::In => Op::In,
    }
}

fn generate(parse: Parse) -> Result<Program, CompileError> {
    let mut codegen = CodeGenerator::new(parse.names);
    codegen.block(&parse.stmts)?;
    Ok(codegen.finish())
}

/// Compile method source into a program.
pub fn compile(source: &str, options: CompileOptions) -> Result<Program, CompileError> {
    generate(parse_program(source, options)?)
}
