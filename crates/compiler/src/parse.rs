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

/// Kicks off the Pest parser and converts it into our AST.
/// This is the main entry point for parsing.
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use ember_common::model::CompileError;
use ember_var::{ErrorCode, Obj, v_bool, v_err, v_float, v_int, v_none, v_obj, v_str, v_string};
use itertools::Itertools;
pub use pest::Parser as PestParser;
use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::Arg::{Normal, Splice};
use crate::ast::{
    Arg, BinaryOp, CatchCodes, CondArm, ExceptArm, Expr, ScatterItem, ScatterKind, Stmt,
    StmtNode, UnaryOp,
};
use crate::names::{Name, Names};
use crate::parse::ember::{EmberParser, Rule};

pub mod ember {
    #[derive(Parser)]
    #[grammar = "src/ember.pest"]
    pub struct EmberParser;
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompileOptions {
    /// Whether error literals outside the built-in set (`E_SOMETHING`) are accepted.
    pub custom_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            custom_errors: true,
        }
    }
}

pub struct TreeTransformer {
    // RefCell because the Pratt parser's closures all need to reach the name table at once.
    names: RefCell<Names>,
    declared: RefCell<HashSet<Name>>,
    options: CompileOptions,
}

impl TreeTransformer {
    pub fn new(options: CompileOptions) -> Rc<Self> {
        Rc::new(Self {
            names: RefCell::new(Names::new()),
            declared: RefCell::new(HashSet::new()),
            options,
        })
    }

    fn name(&self, ident: &str) -> Name {
        self.names.borrow_mut().find_or_add_name(ident.trim())
    }

    fn parse_atom(self: Rc<Self>, pair: Pair<Rule>) -> Result<Expr, CompileError> {
        match pair.as_rule() {
            Rule::ident => Ok(Expr::Id(self.name(pair.as_str()))),
            Rule::object => {
                let ostr = &pair.as_str()[1..];
                let oid = ostr.parse::<i64>().map_err(|e| {
                    CompileError::StringLexError(format!("invalid object literal '#{ostr}': {e}"))
                })?;
                Ok(Expr::Value(v_obj(Obj::mk_id(oid))))
            }
            Rule::integer => match pair.as_str().parse::<i64>() {
                Ok(int) => Ok(Expr::Value(v_int(int))),
                Err(e) => Err(CompileError::StringLexError(format!(
                    "invalid integer literal '{}': {e}",
                    pair.as_str()
                ))),
            },
            Rule::float => match pair.as_str().parse::<f64>() {
                Ok(float) => Ok(Expr::Value(v_float(float))),
                Err(e) => Err(CompileError::StringLexError(format!(
                    "invalid float literal '{}': {e}",
                    pair.as_str()
                ))),
            },
            Rule::string => {
                let string = pair.as_str();
                let parsed = unquote_str(string).map_err(|e| {
                    CompileError::StringLexError(format!("invalid string literal '{string}': {e}"))
                })?;
                Ok(Expr::Value(v_string(parsed)))
            }
            Rule::error_code => {
                let e = pair.as_str();
                let Some(code) = ErrorCode::parse_str(e) else {
                    return Err(CompileError::StringLexError(format!(
                        "invalid error value: {e}"
                    )));
                };
                if let ErrorCode::ErrCustom(_) = &code {
                    if !self.options.custom_errors {
                        return Err(CompileError::DisabledFeature(format!(
                            "custom error {e}"
                        )));
                    }
                }
                Ok(Expr::Value(v_err(code)))
            }
            Rule::boolean => {
                let b = pair.as_str().eq_ignore_ascii_case("true");
                Ok(Expr::Value(v_bool(b)))
            }
            Rule::null_value => Ok(Expr::Value(v_none())),
            _ => {
                panic!("Unimplemented atom: {pair:?}");
            }
        }
    }

    fn parse_exprlist(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<Vec<Arg>, CompileError> {
        let mut args = vec![];
        for pair in pairs {
            match pair.as_rule() {
                Rule::argument => {
                    let splice = pair.as_str().starts_with('@');
                    let expr = self
                        .clone()
                        .parse_expr(pair.into_inner().next().unwrap().into_inner())?;
                    args.push(if splice { Splice(expr) } else { Normal(expr) });
                }
                _ => {
                    panic!("Unimplemented exprlist: {pair:?}");
                }
            }
        }
        Ok(args)
    }

    fn parse_arglist(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<Vec<Arg>, CompileError> {
        let Some(first) = pairs.peek() else {
            return Ok(vec![]);
        };

        let Rule::exprlist = first.as_rule() else {
            panic!("Unimplemented arglist: {first:?}");
        };

        self.parse_exprlist(first.into_inner())
    }

    fn parse_except_codes(self: Rc<Self>, pair: Pair<Rule>) -> Result<CatchCodes, CompileError> {
        match pair.as_rule() {
            Rule::anycode => Ok(CatchCodes::Any),
            Rule::exprlist => Ok(CatchCodes::Codes(self.parse_exprlist(pair.into_inner())?)),
            _ => {
                panic!("Unimplemented except_codes: {pair:?}");
            }
        }
    }

    fn parse_expr(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<Expr, CompileError> {
        let pratt = PrattParser::new()
            // Precedence from lowest to highest.
            .op(Op::postfix(Rule::assign) | Op::prefix(Rule::scatter_assign))
            .op(Op::postfix(Rule::cond_expr))
            .op(Op::infix(Rule::lor, Assoc::Left))
            .op(Op::infix(Rule::land, Assoc::Left))
            .op(Op::infix(Rule::eq, Assoc::Left) | Op::infix(Rule::neq, Assoc::Left))
            .op(Op::infix(Rule::gt, Assoc::Left)
                | Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::gte, Assoc::Left)
                | Op::infix(Rule::lte, Assoc::Left))
            .op(Op::infix(Rule::in_op, Assoc::Left))
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left)
                | Op::infix(Rule::div, Assoc::Left)
                | Op::infix(Rule::modulus, Assoc::Left))
            .op(Op::infix(Rule::pow, Assoc::Right))
            .op(Op::prefix(Rule::neg) | Op::prefix(Rule::not))
            .op(Op::postfix(Rule::index_range)
                | Op::postfix(Rule::index_single)
                | Op::postfix(Rule::verb_call)
                | Op::postfix(Rule::verb_expr_call)
                | Op::postfix(Rule::prop)
                | Op::postfix(Rule::prop_expr));

        let primary_self = self.clone();
        let prefix_self = self.clone();
        let postfix_self = self.clone();

        pratt
            .map_primary(|primary| match primary.as_rule() {
                Rule::atom => {
                    let mut inner = primary.into_inner();
                    primary_self.clone().parse_atom(inner.next().unwrap())
                }
                Rule::paren_expr => {
                    let mut inner = primary.into_inner();
                    primary_self
                        .clone()
                        .parse_expr(inner.next().unwrap().into_inner())
                }
                Rule::sysprop => {
                    // `$name` is a lookup in the root object's alias table.
                    let mut inner = primary.into_inner();
                    let alias = inner.next().unwrap().as_str();
                    Ok(Expr::Call {
                        function: "alias".to_string(),
                        args: vec![Normal(Expr::Value(v_str(alias)))],
                    })
                }
                Rule::builtin_call => {
                    let mut inner = primary.into_inner();
                    let function = inner.next().unwrap().as_str().to_lowercase();
                    let args = primary_self
                        .clone()
                        .parse_arglist(inner.next().unwrap().into_inner())?;
                    Ok(Expr::Call { function, args })
                }
                Rule::list => {
                    let mut inner = primary.into_inner();
                    match inner.next() {
                        Some(exprlist) => Ok(Expr::List(
                            primary_self.clone().parse_exprlist(exprlist.into_inner())?,
                        )),
                        None => Ok(Expr::List(vec![])),
                    }
                }
                Rule::map => {
                    // Keys and values arrive as a flat run of expressions; pair them back up.
                    let elements = primary
                        .into_inner()
                        .map(|r| primary_self.clone().parse_expr(r.into_inner()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Expr::Map(elements.into_iter().tuples().collect()))
                }
                _ => todo!("Unimplemented primary: {:?}", primary.as_rule()),
            })
            .map_infix(|lhs, op, rhs| {
                let (lhs, rhs) = (Box::new(lhs?), Box::new(rhs?));
                let op = match op.as_rule() {
                    Rule::land => return Ok(Expr::And(lhs, rhs)),
                    Rule::lor => return Ok(Expr::Or(lhs, rhs)),
                    Rule::add => BinaryOp::Add,
                    Rule::sub => BinaryOp::Sub,
                    Rule::mul => BinaryOp::Mul,
                    Rule::div => BinaryOp::Div,
                    Rule::pow => BinaryOp::Exp,
                    Rule::modulus => BinaryOp::Mod,
                    Rule::eq => BinaryOp::Eq,
                    Rule::neq => BinaryOp::NEq,
                    Rule::lt => BinaryOp::Lt,
                    Rule::lte => BinaryOp::LtE,
                    Rule::gt => BinaryOp::Gt,
                    Rule::gte => BinaryOp::GtE,
                    Rule::in_op => BinaryOp::In,
                    _ => todo!("Unimplemented infix: {:?}", op.as_rule()),
                };
                Ok(Expr::Binary(op, lhs, rhs))
            })
            .map_prefix(|op, rhs| match op.as_rule() {
                Rule::scatter_assign => prefix_self.clone().parse_scatter_assign(op, rhs?),
                Rule::not => Ok(Expr::Unary(UnaryOp::Not, Box::new(rhs?))),
                Rule::neg => Ok(Expr::Unary(UnaryOp::Neg, Box::new(rhs?))),
                _ => todo!("Unimplemented prefix: {:?}", op.as_rule()),
            })
            .map_postfix(|lhs, op| match op.as_rule() {
                Rule::verb_call => {
                    let mut parts = op.into_inner();
                    let ident = parts.next().unwrap().as_str();
                    let args = postfix_self
                        .clone()
                        .parse_arglist(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Verb {
                        location: Box::new(lhs?),
                        verb: Box::new(Expr::Value(v_str(ident))),
                        args,
                    })
                }
                Rule::verb_expr_call => {
                    let mut parts = op.into_inner();
                    let verb = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    let args = postfix_self
                        .clone()
                        .parse_arglist(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Verb {
                        location: Box::new(lhs?),
                        verb: Box::new(verb),
                        args,
                    })
                }
                Rule::prop => {
                    let mut parts = op.into_inner();
                    let ident = parts.next().unwrap().as_str();
                    Ok(Expr::Prop {
                        location: Box::new(lhs?),
                        property: Box::new(Expr::Value(v_str(ident))),
                    })
                }
                Rule::prop_expr => {
                    let mut parts = op.into_inner();
                    let property = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Prop {
                        location: Box::new(lhs?),
                        property: Box::new(property),
                    })
                }
                Rule::assign => {
                    let mut parts = op.into_inner();
                    let right = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Assign {
                        left: Box::new(lhs?),
                        right: Box::new(right),
                    })
                }
                Rule::index_single => {
                    let mut parts = op.into_inner();
                    let index = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Index(Box::new(lhs?), Box::new(index)))
                }
                Rule::index_range => {
                    let mut parts = op.into_inner();
                    let from = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    let to = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Range {
                        base: Box::new(lhs?),
                        from: Box::new(from),
                        to: Box::new(to),
                    })
                }
                Rule::cond_expr => {
                    let mut parts = op.into_inner();
                    let consequence = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    let alternative = postfix_self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?;
                    Ok(Expr::Cond {
                        condition: Box::new(lhs?),
                        consequence: Box::new(consequence),
                        alternative: Box::new(alternative),
                    })
                }
                _ => todo!("Unimplemented postfix: {:?}", op.as_rule()),
            })
            .parse(pairs)
    }

    fn parse_statement(self: Rc<Self>, pair: Pair<Rule>) -> Result<Option<Stmt>, CompileError> {
        let line_col = pair.line_col();
        match pair.as_rule() {
            Rule::expr_statement => {
                let mut inner = pair.into_inner();
                if let Some(rule) = inner.next() {
                    let expr = self.parse_expr(rule.into_inner())?;
                    return Ok(Some(Stmt::new(StmtNode::Expr(expr), line_col)));
                }
                Ok(None)
            }
            Rule::if_statement => {
                let mut parts = pair.into_inner();
                let mut arms = vec![CondArm {
                    condition: self
                        .clone()
                        .parse_expr(parts.next().unwrap().into_inner())?,
                    statements: self
                        .clone()
                        .parse_statements(parts.next().unwrap().into_inner())?,
                }];
                let mut otherwise = None;
                for remainder in parts {
                    match remainder.as_rule() {
                        Rule::elseif_clause => {
                            let mut parts = remainder.into_inner();
                            arms.push(CondArm {
                                condition: self
                                    .clone()
                                    .parse_expr(parts.next().unwrap().into_inner())?,
                                statements: self
                                    .clone()
                                    .parse_statements(parts.next().unwrap().into_inner())?,
                            });
                        }
                        Rule::else_clause => {
                            let mut parts = remainder.into_inner();
                            otherwise = Some(
                                self.clone()
                                    .parse_statements(parts.next().unwrap().into_inner())?,
                            );
                        }
                        _ => panic!("Unimplemented if clause: {remainder:?}"),
                    }
                }
                Ok(Some(Stmt::new(StmtNode::Cond { arms, otherwise }, line_col)))
            }
            Rule::while_statement => {
                let mut parts = pair.into_inner();
                let condition = self
                    .clone()
                    .parse_expr(parts.next().unwrap().into_inner())?;
                let body = self.parse_statements(parts.next().unwrap().into_inner())?;
                Ok(Some(Stmt::new(StmtNode::While { condition, body }, line_col)))
            }
            Rule::for_in_statement => {
                let mut parts = pair.into_inner();
                let id = self.name(parts.next().unwrap().as_str());
                let expr = self
                    .clone()
                    .parse_expr(parts.next().unwrap().into_inner())?;
                let body = self.parse_statements(parts.next().unwrap().into_inner())?;
                Ok(Some(Stmt::new(StmtNode::ForList { id, expr, body }, line_col)))
            }
            Rule::for_range_statement => {
                let mut parts = pair.into_inner();
                let id = self.name(parts.next().unwrap().as_str());
                let from = self
                    .clone()
                    .parse_expr(parts.next().unwrap().into_inner())?;
                let to = self
                    .clone()
                    .parse_expr(parts.next().unwrap().into_inner())?;
                let body = self.parse_statements(parts.next().unwrap().into_inner())?;
                Ok(Some(Stmt::new(
                    StmtNode::ForRange { id, from, to, body },
                    line_col,
                )))
            }
            Rule::try_except_statement => {
                let mut parts = pair.into_inner();
                let body = self
                    .clone()
                    .parse_statements(parts.next().unwrap().into_inner())?;
                let mut excepts = vec![];
                for except in parts {
                    let mut id = None;
                    let mut codes = None;
                    let mut statements = vec![];
                    for part in except.into_inner() {
                        match part.as_rule() {
                            Rule::except_var => {
                                id = Some(self.name(part.into_inner().next().unwrap().as_str()));
                            }
                            Rule::except_codes => {
                                codes = Some(
                                    self.clone()
                                        .parse_except_codes(part.into_inner().next().unwrap())?,
                                );
                            }
                            Rule::statements => {
                                statements = self.clone().parse_statements(part.into_inner())?;
                            }
                            _ => panic!("Unimplemented except clause: {part:?}"),
                        }
                    }
                    excepts.push(ExceptArm {
                        id,
                        codes: codes.unwrap_or(CatchCodes::Any),
                        statements,
                    });
                }
                Ok(Some(Stmt::new(StmtNode::TryExcept { body, excepts }, line_col)))
            }
            Rule::break_statement => Ok(Some(Stmt::new(StmtNode::Break, line_col))),
            Rule::continue_statement => Ok(Some(Stmt::new(StmtNode::Continue, line_col))),
            Rule::return_statement => {
                let mut parts = pair.into_inner();
                let expr = match parts.next() {
                    Some(e) => Some(self.parse_expr(e.into_inner())?),
                    None => None,
                };
                Ok(Some(Stmt::new(StmtNode::Return(expr), line_col)))
            }
            Rule::let_statement => {
                let mut parts = pair.into_inner();
                let ident = parts.next().unwrap().as_str();
                let id = self.name(ident);
                if self.names.borrow().is_global(&id) || !self.declared.borrow_mut().insert(id) {
                    return Err(CompileError::DuplicateVariable(ident.to_string()));
                }
                let value = match parts.next() {
                    Some(e) => self.parse_expr(e.into_inner())?,
                    None => Expr::Value(v_none()),
                };
                let assign = Expr::Assign {
                    left: Box::new(Expr::Id(id)),
                    right: Box::new(value),
                };
                Ok(Some(Stmt::new(StmtNode::Expr(assign), line_col)))
            }
            _ => panic!("Unimplemented statement: {:?}", pair.as_rule()),
        }
    }

    fn parse_statements(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<Vec<Stmt>, CompileError> {
        let mut statements = vec![];
        for pair in pairs {
            match pair.as_rule() {
                Rule::statement => {
                    let stmt = self
                        .clone()
                        .parse_statement(pair.into_inner().next().unwrap())?;
                    if let Some(stmt) = stmt {
                        statements.push(stmt);
                    }
                }
                _ => {
                    panic!("Unexpected rule: {:?}", pair.as_rule());
                }
            }
        }
        Ok(statements)
    }

    fn parse_scatter_assign(self: Rc<Self>, op: Pair<Rule>, rhs: Expr) -> Result<Expr, CompileError> {
        let mut items = vec![];
        for scatter_item in op.into_inner() {
            let kind = match scatter_item.as_rule() {
                Rule::scatter_optional => ScatterKind::Optional,
                Rule::scatter_target => ScatterKind::Required,
                Rule::scatter_rest => ScatterKind::Rest,
                _ => panic!("Unimplemented scatter_item: {scatter_item:?}"),
            };
            let mut inner = scatter_item.into_inner();
            let id = self.name(inner.next().unwrap().as_str());
            let expr = match inner.next() {
                Some(e) => Some(self.clone().parse_expr(e.into_inner())?),
                None => None,
            };
            items.push(ScatterItem { kind, id, expr });
        }
        let rests = items
            .iter()
            .filter(|i| i.kind == ScatterKind::Rest)
            .count();
        if rests > 1 {
            return Err(CompileError::InvalidAssignment);
        }
        Ok(Expr::Scatter(items, Box::new(rhs)))
    }

    fn transform_tree(self: Rc<Self>, pairs: Pairs<Rule>) -> Result<Parse, CompileError> {
        let mut program = Vec::new();
        for pair in pairs {
            match pair.as_rule() {
                Rule::program => {
                    let inna = pair.into_inner().next().unwrap();
                    match inna.as_rule() {
                        Rule::statements => {
                            program.extend(self.clone().parse_statements(inna.into_inner())?);
                        }
                        _ => {
                            panic!("Unexpected rule: {:?}", inna.as_rule());
                        }
                    }
                }
                _ => {
                    panic!("Unexpected rule: {:?}", pair.as_rule());
                }
            }
        }

        Ok(Parse {
            stmts: program,
            names: self.names.borrow().clone(),
        })
    }
}

/// The emitted parse tree from the parse phase of the compiler.
#[derive(Debug)]
pub struct Parse {
    pub stmts: Vec<Stmt>,
    pub names: Names,
}

pub fn parse_program(program_text: &str, options: CompileOptions) -> Result<Parse, CompileError> {
    let pairs = match EmberParser::parse(Rule::program, program_text) {
        Ok(pairs) => pairs,
        Err(e) => {
            let (line, column) = match e.line_col {
                LineColLocation::Pos(lc) => lc,
                LineColLocation::Span(begin, _) => begin,
            };
            return Err(CompileError::ParseError {
                line,
                column,
                context: e.line().to_string(),
                message: e.variant.message().to_string(),
            });
        }
    };

    let tree_transform = TreeTransformer::new(options);
    tree_transform.transform_tree(pairs)
}

/// Lex a string literal. Expects `"` at both ends; `\n` and `\t` are the only escapes that
/// produce something other than the escaped character itself.
pub fn unquote_str(s: &str) -> Result<String, String> {
    let mut output = String::new();
    let mut chars = s.chars().peekable();
    let Some('"') = chars.next() else {
        return Err("Expected \" at beginning of string".to_string());
    };
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => output.push('\n'),
                Some('t') => output.push('\t'),
                Some(c) => output.push(c),
                None => {
                    return Err("Unexpected end of string".to_string());
                }
            },
            '"' => {
                if chars.peek().is_some() {
                    return Err("Unexpected \" in string".to_string());
                }
                return Ok(output);
            }
            c => output.push(c),
        }
    }
    Err("Unexpected end of string".to_string())
}

#[cfg(test)]
mod tests {
    use crate::CompileOptions;
    use crate::ast::Arg::{Normal, Splice};
    use crate::ast::{
        BinaryOp, CatchCodes, ExceptArm, Expr, ScatterItem, ScatterKind, Stmt,
        StmtNode,
    };
    use crate::names::{GlobalName, Name};
    use crate::parse::{parse_program, unquote_str};
    use ember_common::model::CompileError;
    use ember_var::{E_PROPNF, v_err, v_int, v_none, v_str};
    use pretty_assertions::assert_eq;
    use unindent::unindent;

    fn stripped_stmts(statements: &[Stmt]) -> Vec<StmtNode> {
        statements.iter().map(|s| s.node.clone()).collect()
    }

    fn int(i: i64) -> Box<Expr> {
        Box::new(Expr::Value(v_int(i)))
    }

    #[test]
    fn test_string_unquote() {
        assert_eq!(unquote_str(r#""foo""#).unwrap(), "foo");
        assert_eq!(unquote_str(r#""foo\"bar""#).unwrap(), r#"foo"bar"#);
        assert_eq!(unquote_str(r#""a\nb""#).unwrap(), "a\nb");
        assert!(unquote_str(r#""unterminated"#).is_err());
    }

    #[test]
    fn test_parse_simple_var_assignment_precedence() {
        let parse = parse_program("a = 1 + 2 * 3;", CompileOptions::default()).unwrap();
        let a = parse.names.find_name("a").unwrap();
        assert_eq!(
            stripped_stmts(&parse.stmts),
            vec![StmtNode::Expr(Expr::Assign {
                left: Box::new(Expr::Id(a)),
                right: Box::new(Expr::Binary(
                    BinaryOp::Add,
                    int(1),
                    Box::new(Expr::Binary(BinaryOp::Mul, int(2), int(3))),
                )),
            })]
        );
    }

    #[test]
    fn test_keyword_prefixed_identifiers() {
        let parse = parse_program(
            "returned = 5; iffy = returned; format = 1;",
            CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(parse.stmts.len(), 3);
        assert!(parse.names.find_name("returned").is_some());
        assert!(parse.names.find_name("iffy").is_some());
        assert!(parse.names.find_name("format").is_some());
    }

    #[test]
    fn test_sysprop_is_alias_lookup() {
        let parse = parse_program("$room:look(1, @rest);", CompileOptions::default()).unwrap();
        let rest = parse.names.find_name("rest").unwrap();
        assert_eq!(
            stripped_stmts(&parse.stmts),
            vec![StmtNode::Expr(Expr::Verb {
                location: Box::new(Expr::Call {
                    function: "alias".to_string(),
                    args: vec![Normal(Expr::Value(v_str("room")))],
                }),
                verb: Box::new(Expr::Value(v_str("look"))),
                args: vec![Normal(Expr::Value(v_int(1))), Splice(Expr::Id(rest))],
            })]
        );
    }

    #[test]
    fn test_parse_if_elseif_chain() {
        let program = unindent(
            r#"
            if (this.hp == 1)
              return 5;
            elseif (this.hp == 2)
              return 3;
            else
              return 6;
            endif
            "#,
        );
        let parse = parse_program(&program, CompileOptions::default()).unwrap();
        let this = Box::new(Expr::Id(Name::from(GlobalName::This)));
        let hp_is = |n| {
            Expr::Binary(
                BinaryOp::Eq,
                Box::new(Expr::Prop {
                    location: this.clone(),
                    property: Box::new(Expr::Value(v_str("hp"))),
                }),
                int(n),
            )
        };
        let StmtNode::Cond { arms, otherwise } = &parse.stmts[0].node else {
            panic!("expected conditional, got {:?}", parse.stmts[0]);
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].condition, hp_is(1));
        assert_eq!(arms[1].condition, hp_is(2));
        assert_eq!(
            stripped_stmts(&arms[1].statements),
            vec![StmtNode::Return(Some(Expr::Value(v_int(3))))]
        );
        assert_eq!(
            stripped_stmts(otherwise.as_ref().unwrap()),
            vec![StmtNode::Return(Some(Expr::Value(v_int(6))))]
        );
        // Statement positions come from the source.
        assert_eq!(arms[1].statements[0].line_col.0, 4);
    }

    #[test]
    fn test_parse_map_and_list_literals() {
        let parse = parse_program(r#"x = ["a" -> 1, "b" -> {2, null}];"#, CompileOptions::default())
            .unwrap();
        let StmtNode::Expr(Expr::Assign { right, .. }) = &parse.stmts[0].node else {
            panic!("expected assignment");
        };
        assert_eq!(
            **right,
            Expr::Map(vec![
                (Expr::Value(v_str("a")), Expr::Value(v_int(1))),
                (
                    Expr::Value(v_str("b")),
                    Expr::List(vec![
                        Normal(Expr::Value(v_int(2))),
                        Normal(Expr::Value(v_none()))
                    ])
                ),
            ])
        );
    }

    #[test]
    fn test_parse_scatter() {
        let parse =
            parse_program("{a, ?b = 2, @c} = args;", CompileOptions::default()).unwrap();
        let (a, b, c) = (
            parse.names.find_name("a").unwrap(),
            parse.names.find_name("b").unwrap(),
            parse.names.find_name("c").unwrap(),
        );
        assert_eq!(
            stripped_stmts(&parse.stmts),
            vec![StmtNode::Expr(Expr::Scatter(
                vec![
                    ScatterItem {
                        kind: ScatterKind::Required,
                        id: a,
                        expr: None,
                    },
                    ScatterItem {
                        kind: ScatterKind::Optional,
                        id: b,
                        expr: Some(Expr::Value(v_int(2))),
                    },
                    ScatterItem {
                        kind: ScatterKind::Rest,
                        id: c,
                        expr: None,
                    },
                ],
                Box::new(Expr::Id(Name::from(GlobalName::Args))),
            ))]
        );
    }

    #[test]
    fn test_parse_try_except() {
        let program = unindent(
            r#"
            try
              x = this.missing;
            except e (E_PROPNF)
              x = 0;
            except (ANY)
              x = 1;
            endtry
            "#,
        );
        let parse = parse_program(&program, CompileOptions::default()).unwrap();
        let e = parse.names.find_name("e").unwrap();
        let StmtNode::TryExcept { body, excepts } = &parse.stmts[0].node else {
            panic!("expected try/except");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(excepts.len(), 2);
        assert_eq!(excepts[0].id, Some(e));
        assert_eq!(
            excepts[0].codes,
            CatchCodes::Codes(vec![Normal(Expr::Value(v_err(E_PROPNF)))])
        );
        assert!(matches!(
            excepts[1],
            ExceptArm {
                id: None,
                codes: CatchCodes::Any,
                ..
            }
        ));
    }

    #[test]
    fn test_for_loops_parse() {
        let program = unindent(
            r#"
            for x in [1..3]
              continue;
            endfor
            for item in (this.items)
              break;
            endfor
            while (0)
            endwhile
            "#,
        );
        let parse = parse_program(&program, CompileOptions::default()).unwrap();
        let nodes = stripped_stmts(&parse.stmts);
        assert!(matches!(nodes[0], StmtNode::ForRange { .. }));
        assert!(matches!(nodes[1], StmtNode::ForList { .. }));
        assert!(matches!(nodes[2], StmtNode::While { .. }));
    }

    #[test]
    fn test_duplicate_let_rejected() {
        let result = parse_program("let x = 1; let x = 2;", CompileOptions::default());
        assert_eq!(
            result.unwrap_err(),
            CompileError::DuplicateVariable("x".to_string())
        );
        let result = parse_program("let this = 1;", CompileOptions::default());
        assert!(matches!(result, Err(CompileError::DuplicateVariable(_))));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let result = parse_program("x = 1;\ny = ;", CompileOptions::default());
        let Err(CompileError::ParseError { line, .. }) = result else {
            panic!("expected parse error, got {result:?}");
        };
        assert_eq!(line, 2);
    }

    #[test]
    fn test_custom_errors_can_be_disabled() {
        let options = CompileOptions {
            custom_errors: false,
        };
        assert!(matches!(
            parse_program("return E_BOOM;", options),
            Err(CompileError::DisabledFeature(_))
        ));
        assert!(parse_program("return E_BOOM;", CompileOptions::default()).is_ok());
    }
}
