//! Textual emission of the Lua tree.
//!
//! A single-pass pretty printer. Rendering is pure: the same tree and the
//! same config produce byte-identical output. The renderer never rewrites
//! identifiers or restructures statements; adapters expand here and only
//! here.

use crate::lua::{
    expr::{BinaryExpr, CallExpr, IndexExpr, UnaryExpr},
    stmt::IfStmt,
    ContinueKind, FunctionExpr, GotoCaseAdapter, LuaBinaryOp, LuaBlock, LuaChunk, LuaExpr,
    LuaLiteral, LuaStmt, LuaTypeDecl, LuaUnaryOp, MemberAccess, PropertyAdapter, ReturnWrap,
    TableItem,
};
use crate::runtime;

/// Rendering configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Spaces per indent level.
    pub indent: usize,
    /// Classic dialect: no `goto`, no bitwise operators, no `//`; those
    /// constructs render as runtime helper calls instead.
    pub classic: bool,
    /// Terminate simple statements with `;`.
    pub semicolons: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            indent: 2,
            classic: false,
            semicolons: false,
        }
    }
}

/// Render a chunk to text.
pub fn render(chunk: &LuaChunk, config: RenderConfig) -> String {
    let mut r = Renderer::new(config);
    r.block_statements(&chunk.statements);
    r.out
}

/// Render a single expression; used by tests and the template engine.
pub fn render_expr(expr: &LuaExpr, config: RenderConfig) -> String {
    let mut r = Renderer::new(config);
    r.expr(expr);
    r.out
}

struct Renderer {
    out: String,
    level: usize,
    config: RenderConfig,
}

impl Renderer {
    fn new(config: RenderConfig) -> Self {
        Renderer {
            out: String::new(),
            level: 0,
            config,
        }
    }

    fn indent(&mut self) {
        self.level += 1;
    }

    fn dedent(&mut self) {
        debug_assert!(self.level > 0);
        self.level -= 1;
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.level * self.config.indent {
            self.out.push(' ');
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn terminator(&mut self) {
        if self.config.semicolons {
            self.out.push(';');
        }
        self.newline();
    }

    // Statements

    fn block(&mut self, block: &LuaBlock) {
        self.indent();
        self.block_statements(&block.statements);
        self.dedent();
    }

    fn block_statements(&mut self, statements: &[LuaStmt]) {
        let mut pending_blank: Option<u32> = None;
        for stmt in statements {
            if let LuaStmt::BlankLines(n) = stmt {
                // Adjacent blank-line statements coalesce to the larger run.
                pending_blank = Some(pending_blank.map_or(*n, |p| p.max(*n)));
                continue;
            }
            if let Some(n) = pending_blank.take() {
                for _ in 0..n {
                    self.newline();
                }
            }
            self.statement(stmt);
        }
        if let Some(n) = pending_blank {
            for _ in 0..n {
                self.newline();
            }
        }
    }

    fn statement(&mut self, stmt: &LuaStmt) {
        match stmt {
            LuaStmt::BlankLines(_) => unreachable!("coalesced in block_statements"),
            LuaStmt::Expr(e) => {
                self.write_indent();
                self.expr(e);
                self.terminator();
            }
            LuaStmt::Assign { targets, values } => self.assign(targets, values),
            LuaStmt::Local { names, values } => {
                self.write_indent();
                self.write("local ");
                self.write(&names.join(", "));
                if !values.is_empty() {
                    self.write(" = ");
                    self.expr_list(values);
                }
                self.terminator();
            }
            LuaStmt::LocalFunction { name, func } => {
                self.write_indent();
                self.write("local function ");
                self.write(name);
                self.function_tail(func);
                self.newline();
            }
            LuaStmt::If(s) => self.if_stmt(s),
            LuaStmt::While { condition, body } => {
                self.write_indent();
                self.write("while ");
                self.expr(condition);
                self.write(" do");
                self.newline();
                self.block(body);
                self.write_indent();
                self.write("end");
                self.newline();
            }
            LuaStmt::Repeat { body, until } => {
                self.write_indent();
                self.write("repeat");
                self.newline();
                self.block(body);
                self.write_indent();
                self.write("until ");
                self.expr(until);
                self.newline();
            }
            LuaStmt::NumericFor {
                var,
                start,
                limit,
                step,
                body,
            } => {
                self.write_indent();
                self.write("for ");
                self.write(var);
                self.write(" = ");
                self.expr(start);
                self.write(", ");
                self.expr(limit);
                if let Some(step) = step {
                    self.write(", ");
                    self.expr(step);
                }
                self.write(" do");
                self.newline();
                self.block(body);
                self.write_indent();
                self.write("end");
                self.newline();
            }
            LuaStmt::GenericFor { vars, exprs, body } => {
                self.write_indent();
                self.write("for ");
                self.write(&vars.join(", "));
                self.write(" in ");
                self.expr_list(exprs);
                self.write(" do");
                self.newline();
                self.block(body);
                self.write_indent();
                self.write("end");
                self.newline();
            }
            LuaStmt::Do(body) => {
                self.write_indent();
                self.write("do");
                self.newline();
                self.block(body);
                self.write_indent();
                self.write("end");
                self.newline();
            }
            LuaStmt::Break => {
                self.write_indent();
                self.write("break");
                self.terminator();
            }
            LuaStmt::Goto(label) => {
                self.write_indent();
                self.write("goto ");
                self.write(label);
                self.terminator();
            }
            LuaStmt::Label(label) => {
                self.write_indent();
                self.write("::");
                self.write(label);
                self.write("::");
                self.newline();
            }
            LuaStmt::Return(values) => {
                self.write_indent();
                self.write("return");
                if !values.is_empty() {
                    self.write(" ");
                    self.expr_list(values);
                }
                self.terminator();
            }
            LuaStmt::Comment(text) => {
                self.write_indent();
                self.write("-- ");
                self.write(text);
                self.newline();
            }
            LuaStmt::LongComment(text) => {
                self.write_indent();
                self.write("--[[ ");
                self.write(text);
                self.write(" ]]");
                self.newline();
            }
            LuaStmt::Doc(doc) => {
                for line in &doc.lines {
                    self.write_indent();
                    self.write("--- ");
                    self.write(line);
                    self.newline();
                }
            }
            LuaStmt::TypeDecl(decl) => self.type_decl(decl),
            LuaStmt::TryAdapter(adapter) => self.protected_call(&adapter.call, &adapter.wrap),
            LuaStmt::UsingAdapter(adapter) => self.protected_call(&adapter.call, &adapter.wrap),
            LuaStmt::ContinueAdapter(kind) => self.continue_adapter(kind),
            LuaStmt::GotoCaseAdapter(adapter) => self.goto_case(adapter),
        }
    }

    fn assign(&mut self, targets: &[LuaExpr], values: &[LuaExpr]) {
        // A lone accessor-backed property target renders as its setter call.
        if let [LuaExpr::Property(p)] = targets {
            if !p.field_like {
                self.write_indent();
                self.property_setter(p, &values[0]);
                self.terminator();
                return;
            }
        }
        self.write_indent();
        self.expr_list(targets);
        self.write(" = ");
        self.expr_list(values);
        self.terminator();
    }

    fn property_setter(&mut self, p: &PropertyAdapter, value: &LuaExpr) {
        let accessor = format!("{}{}", runtime::SET_PREFIX, p.name);
        match &p.target {
            Some(target) => {
                self.prefix_expr(target);
                self.write(if p.colon { ":" } else { "." });
                self.write(&accessor);
            }
            None => self.write(&accessor),
        }
        self.write("(");
        self.expr(value);
        self.write(")");
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        self.write_indent();
        self.write("if ");
        self.expr(&s.condition);
        self.write(" then");
        self.newline();
        self.block(&s.then_block);
        for (cond, body) in &s.elseifs {
            self.write_indent();
            self.write("elseif ");
            self.expr(cond);
            self.write(" then");
            self.newline();
            self.block(body);
        }
        if let Some(else_block) = &s.else_block {
            self.write_indent();
            self.write("else");
            self.newline();
            self.block(else_block);
        }
        self.write_indent();
        self.write("end");
        self.newline();
    }

    /// `System.try` / `System.using` call plus return propagation.
    fn protected_call(&mut self, call: &LuaExpr, wrap: &ReturnWrap) {
        match wrap {
            ReturnWrap::None => {
                self.write_indent();
                self.expr(call);
                self.terminator();
            }
            ReturnWrap::Check {
                ok,
                value,
                protected,
            } => {
                self.write_indent();
                self.write("local ");
                self.write(ok);
                if let Some(v) = value {
                    self.write(", ");
                    self.write(v);
                }
                self.write(" = ");
                self.expr(call);
                self.terminator();
                self.write_indent();
                self.write("if ");
                self.write(ok);
                self.write(" then return");
                match (protected, value) {
                    (true, Some(v)) => {
                        self.write(" true, ");
                        self.write(v);
                    }
                    (true, None) => self.write(" true"),
                    (false, Some(v)) => {
                        self.write(" ");
                        self.write(v);
                    }
                    (false, None) => {}
                }
                self.write(" end");
                self.newline();
            }
        }
    }

    fn continue_adapter(&mut self, kind: &ContinueKind) {
        match kind {
            ContinueKind::Goto(label) => {
                self.write_indent();
                self.write("goto ");
                self.write(label);
                self.terminator();
            }
            ContinueKind::Flag(flag) => {
                self.write_indent();
                self.write(flag);
                self.write(" = true");
                self.terminator();
                self.write_indent();
                self.write("break");
                self.terminator();
            }
        }
    }

    fn goto_case(&mut self, adapter: &GotoCaseAdapter) {
        if !adapter.flags.is_empty() {
            self.write_indent();
            self.write(&adapter.flags.join(", "));
            self.write(" = ");
            let trues: Vec<&str> = adapter.flags.iter().map(|_| "true").collect();
            self.write(&trues.join(", "));
            self.terminator();
        }
        self.write_indent();
        self.write("goto ");
        self.write(&adapter.label);
        self.terminator();
    }

    fn type_decl(&mut self, decl: &LuaTypeDecl) {
        for line in &decl.doc {
            self.write_indent();
            self.write("--- ");
            self.write(line);
            self.newline();
        }
        self.write_indent();
        self.write(runtime::NAMESPACE_PARAM);
        self.write(".");
        self.write(decl.kind.helper_name());
        self.write("(\"");
        self.write(&decl.name);
        self.write("\", function(");
        self.write(runtime::NAMESPACE_PARAM);
        for tp in &decl.type_params {
            self.write(", ");
            self.write(tp);
        }
        self.write(")");
        self.newline();
        self.indent();
        self.write_indent();
        self.write("return {");
        self.newline();
        self.indent();

        if !decl.inherits.is_empty() {
            self.write_indent();
            self.write(runtime::INHERITS);
            self.write(" = function(global) return { ");
            self.expr_list(&decl.inherits);
            self.write(" } end,");
            self.newline();
        }
        if let Some(static_ctor) = &decl.static_ctor {
            self.write_indent();
            self.write(runtime::STATIC_CTOR);
            self.write(" = ");
            self.write("function(");
            self.write(&static_ctor.params.join(", "));
            self.write(")");
            self.newline();
            self.block(&static_ctor.body);
            self.write_indent();
            self.write("end,");
            self.newline();
        }
        match decl.ctors.len() {
            0 => {}
            1 => {
                self.write_indent();
                self.write(runtime::CTOR);
                self.write(" = ");
                self.function_head(&decl.ctors[0].func);
                self.write(",");
                self.newline();
            }
            _ => {
                self.write_indent();
                self.write(runtime::CTOR);
                self.write(" = {");
                self.newline();
                self.indent();
                for ctor in &decl.ctors {
                    self.write_indent();
                    self.function_head(&ctor.func);
                    self.write(",");
                    self.newline();
                }
                self.dedent();
                self.write_indent();
                self.write("},");
                self.newline();
            }
        }
        for member in &decl.members {
            for line in &member.doc {
                self.write_indent();
                self.write("--- ");
                self.write(line);
                self.newline();
            }
            self.write_indent();
            self.write(&member.name);
            self.write(" = ");
            self.expr(&member.value);
            self.write(",");
            self.newline();
        }

        self.dedent();
        self.write_indent();
        self.write("}");
        self.newline();
        self.dedent();
        self.write_indent();
        self.write("end)");
        self.newline();
        for nested in &decl.nested {
            self.type_decl(nested);
        }
    }

    // Expressions

    fn expr(&mut self, expr: &LuaExpr) {
        match expr {
            LuaExpr::Name(n) => self.write(n),
            LuaExpr::Literal(lit) => self.literal(lit),
            LuaExpr::Binary(b) => self.binary(b),
            LuaExpr::Unary(u) => self.unary(u),
            LuaExpr::Member(m) => self.member(m),
            LuaExpr::Index(i) => self.index(i),
            LuaExpr::Call(c) => self.call(c),
            LuaExpr::Function(f) => self.function_head(f),
            LuaExpr::Paren(inner) => {
                self.write("(");
                self.expr(inner);
                self.write(")");
            }
            LuaExpr::Table(items) => self.table(items),
            LuaExpr::SeqList(items) => self.expr_list(items),
            LuaExpr::Property(p) => self.property_getter(p),
            LuaExpr::ArrayType(a) => {
                if a.rank <= 1 {
                    self.write(runtime::ARRAY);
                    self.write("(");
                    self.expr(&a.element);
                    self.write(")");
                } else {
                    self.write(runtime::MULTI_ARRAY);
                    self.write("(");
                    self.expr(&a.element);
                    self.write(", ");
                    self.write(&a.rank.to_string());
                    self.write(")");
                }
            }
            LuaExpr::Ctor(c) => self.function_head(&c.func),
        }
    }

    fn property_getter(&mut self, p: &PropertyAdapter) {
        if p.field_like {
            match &p.target {
                Some(target) => {
                    self.prefix_expr(target);
                    self.write(".");
                    self.write(&p.name);
                }
                None => self.write(&p.name),
            }
            return;
        }
        let accessor = format!("{}{}", runtime::GET_PREFIX, p.name);
        match &p.target {
            Some(target) => {
                self.prefix_expr(target);
                self.write(if p.colon { ":" } else { "." });
                self.write(&accessor);
            }
            None => self.write(&accessor),
        }
        self.write("()");
    }

    fn literal(&mut self, lit: &LuaLiteral) {
        match lit {
            LuaLiteral::Nil => self.write("nil"),
            LuaLiteral::True => self.write("true"),
            LuaLiteral::False => self.write("false"),
            LuaLiteral::Int(v) => self.write(&v.to_string()),
            LuaLiteral::Float(v) => self.write(&format!("{:?}", v)),
            LuaLiteral::Str(s) => {
                self.write("\"");
                let escaped = escape_string(s);
                self.write(&escaped);
                self.write("\"");
            }
            LuaLiteral::Char(c) => {
                self.write(&(*c as u32).to_string());
                self.write(" --[[ '");
                self.write(&c.to_string());
                self.write("' ]]");
            }
            LuaLiteral::Verbatim(v) => self.write(v),
        }
    }

    fn binary(&mut self, b: &BinaryExpr) {
        // Classic dialect has no bitwise or floor-division operators; those
        // shapes go through runtime helpers.
        if self.config.classic {
            if let Some(helper) = classic_helper(b.op) {
                self.write(helper);
                self.write("(");
                self.expr(&b.left);
                self.write(", ");
                self.expr(&b.right);
                self.write(")");
                return;
            }
        }
        let prec = binary_prec(b.op);
        self.operand(&b.left, prec, assoc_right(b.op));
        self.write(" ");
        self.write(binary_token(b.op));
        self.write(" ");
        self.operand(&b.right, prec, !assoc_right(b.op));
    }

    /// Render an operand of a binary expression at `parent_prec`,
    /// parenthesizing when precedence requires it.
    fn operand(&mut self, operand: &LuaExpr, parent_prec: u8, needs_paren_on_tie: bool) {
        let child_prec = match operand {
            LuaExpr::Binary(b) => Some(binary_prec(b.op)),
            _ => None,
        };
        let parenthesize = match child_prec {
            Some(p) if p < parent_prec => true,
            Some(p) if p == parent_prec => needs_paren_on_tie,
            _ => false,
        };
        if parenthesize {
            self.write("(");
            self.expr(operand);
            self.write(")");
        } else {
            self.expr(operand);
        }
    }

    fn unary(&mut self, u: &UnaryExpr) {
        if self.config.classic && u.op == LuaUnaryOp::BNot {
            self.write(runtime::BNOT);
            self.write("(");
            self.expr(&u.operand);
            self.write(")");
            return;
        }
        let token = match u.op {
            LuaUnaryOp::Neg => "-",
            LuaUnaryOp::Not => "not ",
            LuaUnaryOp::BNot => "~",
            LuaUnaryOp::Len => "#",
        };
        self.write(token);
        match &*u.operand {
            LuaExpr::Binary(_) => {
                self.write("(");
                self.expr(&u.operand);
                self.write(")");
            }
            _ => self.expr(&u.operand),
        }
    }

    fn member(&mut self, m: &MemberAccess) {
        self.prefix_expr(&m.target);
        self.write(if m.colon { ":" } else { "." });
        self.write(&m.name);
    }

    fn index(&mut self, i: &IndexExpr) {
        self.prefix_expr(&i.target);
        self.write("[");
        self.expr(&i.index);
        self.write("]");
    }

    fn call(&mut self, c: &CallExpr) {
        self.prefix_expr(&c.callee);
        // Single-table-argument calls use the `f{…}` sugar form.
        if let [LuaExpr::Table(items)] = c.args.as_slice() {
            self.table(items);
            return;
        }
        self.write("(");
        self.expr_list(&c.args);
        self.write(")");
    }

    /// Render an expression in Lua prefix-expression position (receiver of
    /// a call, member, or index), parenthesizing anything else.
    fn prefix_expr(&mut self, expr: &LuaExpr) {
        match expr {
            LuaExpr::Name(_)
            | LuaExpr::Member(_)
            | LuaExpr::Index(_)
            | LuaExpr::Call(_)
            | LuaExpr::Paren(_)
            | LuaExpr::Property(_) => self.expr(expr),
            _ => {
                self.write("(");
                self.expr(expr);
                self.write(")");
            }
        }
    }

    fn function_head(&mut self, f: &FunctionExpr) {
        self.write("function(");
        self.write(&f.params.join(", "));
        if f.is_vararg {
            if f.params.is_empty() {
                self.write("...");
            } else {
                self.write(", ...");
            }
        }
        self.write(")");
        if f.body.statements.is_empty() {
            self.write(" end");
            return;
        }
        self.newline();
        self.block(&f.body);
        self.write_indent();
        self.write("end");
    }

    /// `local function` tail: parameters and body after the name.
    fn function_tail(&mut self, f: &FunctionExpr) {
        self.write("(");
        self.write(&f.params.join(", "));
        self.write(")");
        self.newline();
        self.block(&f.body);
        self.write_indent();
        self.write("end");
    }

    fn table(&mut self, items: &[TableItem]) {
        if items.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{ ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match item {
                TableItem::Value(v) => self.expr(v),
                TableItem::KeyValue { key, value } => {
                    self.write("[");
                    self.expr(key);
                    self.write("] = ");
                    self.expr(value);
                }
                TableItem::StrKey { name, value } => {
                    self.write(name);
                    self.write(" = ");
                    self.expr(value);
                }
            }
        }
        self.write(" }");
    }

    fn expr_list(&mut self, exprs: &[LuaExpr]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(e);
        }
    }
}

fn binary_token(op: LuaBinaryOp) -> &'static str {
    match op {
        LuaBinaryOp::Add => "+",
        LuaBinaryOp::Sub => "-",
        LuaBinaryOp::Mul => "*",
        LuaBinaryOp::Div => "/",
        LuaBinaryOp::IDiv => "//",
        LuaBinaryOp::Mod => "%",
        LuaBinaryOp::Pow => "^",
        LuaBinaryOp::Concat => "..",
        LuaBinaryOp::Eq => "==",
        LuaBinaryOp::Ne => "~=",
        LuaBinaryOp::Lt => "<",
        LuaBinaryOp::Le => "<=",
        LuaBinaryOp::Gt => ">",
        LuaBinaryOp::Ge => ">=",
        LuaBinaryOp::And => "and",
        LuaBinaryOp::Or => "or",
        LuaBinaryOp::BAnd => "&",
        LuaBinaryOp::BOr => "|",
        LuaBinaryOp::BXor => "~",
        LuaBinaryOp::Shl => "<<",
        LuaBinaryOp::Shr => ">>",
    }
}

fn binary_prec(op: LuaBinaryOp) -> u8 {
    match op {
        LuaBinaryOp::Or => 1,
        LuaBinaryOp::And => 2,
        LuaBinaryOp::Eq
        | LuaBinaryOp::Ne
        | LuaBinaryOp::Lt
        | LuaBinaryOp::Le
        | LuaBinaryOp::Gt
        | LuaBinaryOp::Ge => 3,
        LuaBinaryOp::BOr => 4,
        LuaBinaryOp::BXor => 5,
        LuaBinaryOp::BAnd => 6,
        LuaBinaryOp::Shl | LuaBinaryOp::Shr => 7,
        LuaBinaryOp::Concat => 8,
        LuaBinaryOp::Add | LuaBinaryOp::Sub => 9,
        LuaBinaryOp::Mul | LuaBinaryOp::Div | LuaBinaryOp::IDiv | LuaBinaryOp::Mod => 10,
        LuaBinaryOp::Pow => 12,
    }
}

fn assoc_right(op: LuaBinaryOp) -> bool {
    matches!(op, LuaBinaryOp::Concat | LuaBinaryOp::Pow)
}

fn classic_helper(op: LuaBinaryOp) -> Option<&'static str> {
    match op {
        LuaBinaryOp::IDiv => Some(runtime::DIV),
        LuaBinaryOp::BAnd => Some(runtime::BAND),
        LuaBinaryOp::BOr => Some(runtime::BOR),
        LuaBinaryOp::BXor => Some(runtime::BXOR),
        LuaBinaryOp::Shl => Some(runtime::SHL),
        LuaBinaryOp::Shr => Some(runtime::SHR),
        _ => None,
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_parenthesizes_only_when_needed() {
        let e = LuaExpr::binary(
            LuaBinaryOp::Mul,
            LuaExpr::binary(LuaBinaryOp::Add, LuaExpr::int(1), LuaExpr::int(2)),
            LuaExpr::int(3),
        );
        assert_eq!(render_expr(&e, RenderConfig::default()), "(1 + 2) * 3");

        let e = LuaExpr::binary(
            LuaBinaryOp::Add,
            LuaExpr::binary(LuaBinaryOp::Mul, LuaExpr::int(1), LuaExpr::int(2)),
            LuaExpr::int(3),
        );
        assert_eq!(render_expr(&e, RenderConfig::default()), "1 * 2 + 3");
    }

    #[test]
    fn classic_bitwise_goes_through_helpers() {
        let e = LuaExpr::binary(LuaBinaryOp::BAnd, LuaExpr::name("a"), LuaExpr::name("b"));
        assert_eq!(render_expr(&e, RenderConfig::default()), "a & b");
        let classic = RenderConfig {
            classic: true,
            ..RenderConfig::default()
        };
        assert_eq!(render_expr(&e, classic), "System.band(a, b)");
    }

    #[test]
    fn string_method_call_parenthesizes_receiver() {
        let e = LuaExpr::call(
            LuaExpr::method(LuaExpr::string("hi {0}"), "format"),
            vec![LuaExpr::name("name")],
        );
        assert_eq!(
            render_expr(&e, RenderConfig::default()),
            "(\"hi {0}\"):format(name)"
        );
    }
}
