//! A utility module for traversing a Rhai AST to extract the identifiers a
//! script references.
//!
//! The sandbox uses this as its second line of defence: after the raw source
//! has been screened, the compiled program is walked and every variable,
//! function, method and property name is collected so references to blocked
//! names can be rejected before evaluation starts.

use std::collections::{BTreeSet, HashSet};

use rhai::{AST, Expr, Stmt};

/// The identifiers referenced by a compiled script.
#[derive(Debug, Default)]
pub struct ReferenceAnalysis {
    /// Names read or written as plain variables.
    pub variables: HashSet<String>,

    /// Names of functions called directly, including operators.
    pub functions: HashSet<String>,

    /// Names of methods called with dot syntax.
    pub methods: HashSet<String>,

    /// Names of properties accessed with dot syntax.
    pub properties: HashSet<String>,

    /// Variables declared with `let`/`const` or bound by `for` loops.
    pub local_variables: HashSet<String>,
}

impl ReferenceAnalysis {
    /// Returns every referenced identifier that appears in `blocked`, sorted.
    pub fn blocked_references(&self, blocked: &BTreeSet<String>) -> Vec<String> {
        self.variables
            .iter()
            .chain(&self.functions)
            .chain(&self.methods)
            .chain(&self.properties)
            .filter(|name| blocked.contains(*name))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Traverses the top-level statements of a compiled `AST`.
///
/// Bodies of `fn` definitions are not visited; their source text goes through
/// static screening before it is compiled.
pub fn analyze_ast(ast: &AST) -> ReferenceAnalysis {
    let mut result = ReferenceAnalysis::default();
    for stmt in ast.statements() {
        walk_stmt(stmt, &mut result);
    }
    result
}

fn walk_block<'a>(stmts: impl IntoIterator<Item = &'a Stmt>, result: &mut ReferenceAnalysis) {
    for s in stmts {
        walk_stmt(s, result);
    }
}

/// Recursively walks a statement (`Stmt`) to find expressions.
fn walk_stmt(stmt: &Stmt, result: &mut ReferenceAnalysis) {
    match stmt {
        Stmt::Expr(expr) => walk_expr(expr, result),
        Stmt::Block(stmt_block) => walk_block(stmt_block.statements(), result),
        Stmt::If(flow_control, _) => {
            walk_expr(&flow_control.expr, result);
            walk_block(flow_control.body.statements(), result);
            walk_block(flow_control.branch.statements(), result);
        }
        Stmt::While(flow_control, _) => {
            walk_expr(&flow_control.expr, result);
            walk_block(flow_control.body.statements(), result);
        }
        Stmt::Do(flow_control, _, _) => {
            walk_block(flow_control.body.statements(), result);
            walk_expr(&flow_control.expr, result);
        }
        Stmt::For(for_loop, _) => {
            result.local_variables.insert(for_loop.0.name.to_string());
            if let Some(second_var) = &for_loop.1 {
                result.local_variables.insert(second_var.name.to_string());
            }

            walk_expr(&for_loop.2.expr, result);
            walk_block(for_loop.2.body.statements(), result);
        }
        Stmt::Var(var_definition, _, _) => {
            result.local_variables.insert(var_definition.0.name.to_string());
            walk_expr(&var_definition.1, result);
        }
        Stmt::Assignment(assignment) => {
            walk_expr(&assignment.1.lhs, result);
            walk_expr(&assignment.1.rhs, result);
        }
        Stmt::FnCall(fn_call_expr, _) => {
            result.functions.insert(fn_call_expr.name.to_string());
            for arg in &fn_call_expr.args {
                walk_expr(arg, result);
            }
        }
        Stmt::Switch(switch_data, _) => {
            let (expr, cases_collection) = &**switch_data;
            walk_expr(expr, result);
            for case_expr in &cases_collection.expressions {
                walk_expr(&case_expr.lhs, result);
                walk_expr(&case_expr.rhs, result);
            }
        }
        Stmt::TryCatch(flow_control, _) => {
            walk_block(flow_control.body.statements(), result);
            walk_block(flow_control.branch.statements(), result);
        }
        Stmt::Return(Some(expr), _, _) | Stmt::BreakLoop(Some(expr), _, _) =>
            walk_expr(expr, result),
        Stmt::Import(import_data, _) => walk_expr(&import_data.0, result),
        _ => {}
    }
}

/// Recursively walks an expression (`Expr`) recording every identifier.
fn walk_expr(expr: &Expr, result: &mut ReferenceAnalysis) {
    match expr {
        Expr::Variable(var_info, _, _) => {
            result.variables.insert(var_info.1.to_string());
        }
        Expr::Property(prop_info, _) => {
            result.properties.insert(prop_info.2.to_string());
        }
        Expr::Dot(binary_expr, _, _) | Expr::Index(binary_expr, _, _) => {
            walk_expr(&binary_expr.lhs, result);
            walk_expr(&binary_expr.rhs, result);
        }
        Expr::MethodCall(method_call_expr, _) => {
            result.methods.insert(method_call_expr.name.to_string());
            for arg in &method_call_expr.args {
                walk_expr(arg, result);
            }
        }
        Expr::FnCall(fn_call_expr, _) => {
            result.functions.insert(fn_call_expr.name.to_string());
            for arg in &fn_call_expr.args {
                walk_expr(arg, result);
            }
        }
        Expr::And(expr_vec, _) | Expr::Or(expr_vec, _) | Expr::Coalesce(expr_vec, _) =>
            for e in &**expr_vec {
                walk_expr(e, result);
            },
        Expr::Array(expr_vec, _) | Expr::InterpolatedString(expr_vec, _) =>
            for e in expr_vec {
                walk_expr(e, result);
            },
        Expr::Map(map_data, _) =>
            for (_, value_expr) in &map_data.0 {
                walk_expr(value_expr, result);
            },
        Expr::Stmt(stmt_block) => walk_block(stmt_block.statements(), result),
        Expr::Custom(custom_expr, _) =>
            for e in &custom_expr.inputs {
                walk_expr(e, result);
            },
        _ => {}
    }
}
