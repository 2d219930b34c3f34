use std::io::{self, Write};

use allocator_api2::vec::Vec;
use bumpalo::Bump;

use crate::ast::{Ast, Node, NodeId};
use crate::lexer::Token;

const INDENT_DELTA: usize = 4;

/// Pending emission steps. Because the stack unwinds LIFO, a handler pushes
/// the trailing fragments of its production before the leading ones, and
/// anything it writes directly to the sink comes out first of all.
enum RenderState {
    TopLevelDecl(NodeId),
    VarDecl(NodeId),
    FnProtoRParen(NodeId),
    ParamDecl(NodeId),
    Expression(NodeId),
    AddrOfExprBit(NodeId),
    Block(NodeId),
    Statement(NodeId),
    Text(&'static str),
    Indent(usize),
    PrintIndent,
}

/// Writes the canonical form of `ast` to `w`. Formatting a buffer that is
/// already canonical reproduces it byte-for-byte.
pub fn render<W: Write>(ast: &Ast, source: &str, w: &mut W) -> io::Result<()> {
    Renderer { ast, source, indent: 0 }.render(w)
}

struct Renderer<'a, 'ast> {
    ast: &'a Ast<'ast>,
    source: &'a str,
    indent: usize,
}

impl<'a, 'ast> Renderer<'a, 'ast> {
    fn render<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        let mut stack: Vec<RenderState, &Bump> = Vec::new_in(self.ast.arena());
        let Node::Root(root) = self.ast.node(self.ast.root) else {
            unreachable!("root id does not name a Root node");
        };
        for &decl in root.decls.iter().rev() {
            stack.push(RenderState::TopLevelDecl(decl));
        }
        while let Some(state) = stack.pop() {
            self.step(state, &mut stack, w)?;
        }
        Ok(())
    }

    fn token_slice(&self, token: Token) -> &'a str {
        token.slice(self.source)
    }

    fn step<W: Write>(
        &mut self,
        state: RenderState,
        stack: &mut Vec<RenderState, &'ast Bump>,
        w: &mut W,
    ) -> io::Result<()> {
        match state {
            RenderState::TopLevelDecl(id) => {
                stack.push(RenderState::Text("\n"));
                match self.ast.node(id) {
                    Node::VarDecl(_) => stack.push(RenderState::VarDecl(id)),
                    Node::FnProto(proto) => {
                        if let Some(token) = proto.visib_token {
                            write!(w, "{} ", self.token_slice(token))?;
                        }
                        if proto.extern_token.is_some() {
                            w.write_all(b"extern ")?;
                        }
                        if let Some(token) = proto.cc_token {
                            write!(w, "{} ", self.token_slice(token))?;
                        }
                        if proto.inline_token.is_some() {
                            w.write_all(b"inline ")?;
                        }
                        w.write_all(b"fn")?;
                        if let Some(token) = proto.name_token {
                            write!(w, " {}", self.token_slice(token))?;
                        }
                        w.write_all(b"(")?;
                        stack.push(RenderState::FnProtoRParen(id));
                        for (i, &param) in proto.params.iter().enumerate().rev() {
                            stack.push(RenderState::ParamDecl(param));
                            if i != 0 {
                                stack.push(RenderState::Text(", "));
                            }
                        }
                    }
                    node => unreachable!("{} at top level", node.kind_name()),
                }
            }
            RenderState::VarDecl(id) => {
                let Node::VarDecl(decl) = self.ast.node(id) else {
                    unreachable!("VarDecl render state on a different node");
                };
                if let Some(token) = decl.visib_token {
                    write!(w, "{} ", self.token_slice(token))?;
                }
                if decl.extern_token.is_some() {
                    w.write_all(b"extern ")?;
                }
                if decl.comptime_token.is_some() {
                    w.write_all(b"comptime ")?;
                }
                write!(
                    w,
                    "{} {}",
                    self.token_slice(decl.mut_token),
                    self.token_slice(decl.name_token)
                )?;
                stack.push(RenderState::Text(";"));
                if let Some(init) = decl.init_node {
                    stack.push(RenderState::Expression(init));
                    stack.push(RenderState::Text(" = "));
                }
                if let Some(align) = decl.align_node {
                    stack.push(RenderState::Text(")"));
                    stack.push(RenderState::Expression(align));
                    stack.push(RenderState::Text(" align("));
                }
                if let Some(type_node) = decl.type_node {
                    stack.push(RenderState::Expression(type_node));
                    stack.push(RenderState::Text(": "));
                }
            }
            RenderState::FnProtoRParen(id) => {
                let Node::FnProto(proto) = self.ast.node(id) else {
                    unreachable!("FnProtoRParen render state on a different node");
                };
                w.write_all(b")")?;
                match proto.body {
                    Some(body) => {
                        stack.push(RenderState::Block(body));
                        stack.push(RenderState::Text(" "));
                    }
                    None => stack.push(RenderState::Text(";")),
                }
                if let Some(return_type) = proto.return_type {
                    stack.push(RenderState::Expression(return_type));
                    stack.push(RenderState::Text(" -> "));
                }
            }
            RenderState::ParamDecl(id) => {
                let Node::ParamDecl(param) = self.ast.node(id) else {
                    unreachable!("ParamDecl render state on a different node");
                };
                if param.var_args_token.is_some() {
                    w.write_all(b"...")?;
                    return Ok(());
                }
                if param.comptime_token.is_some() {
                    w.write_all(b"comptime ")?;
                }
                if param.noalias_token.is_some() {
                    w.write_all(b"noalias ")?;
                }
                if let Some(token) = param.name_token {
                    write!(w, "{}: ", self.token_slice(token))?;
                }
                stack.push(RenderState::Expression(
                    param.type_node.expect("non-variadic parameter has a type"),
                ));
            }
            RenderState::Expression(id) => match self.ast.node(id) {
                Node::Ident(ident) => {
                    w.write_all(self.token_slice(ident.name_token).as_bytes())?;
                }
                Node::AddrOfExpr(addr_of) => {
                    w.write_all(b"&")?;
                    stack.push(RenderState::AddrOfExprBit(id));
                    if let Some(align) = addr_of.align_node {
                        stack.push(RenderState::Expression(align));
                        stack.push(RenderState::Text("align("));
                    }
                }
                node => unreachable!("{} is not an expression", node.kind_name()),
            },
            RenderState::AddrOfExprBit(id) => {
                let Node::AddrOfExpr(addr_of) = self.ast.node(id) else {
                    unreachable!("AddrOfExprBit render state on a different node");
                };
                if addr_of.align_node.is_some() {
                    if let (Some(start), Some(end)) =
                        (addr_of.bit_offset_start_token, addr_of.bit_offset_end_token)
                    {
                        write!(w, ":{}:{}", self.token_slice(start), self.token_slice(end))?;
                    }
                    w.write_all(b") ")?;
                }
                if addr_of.const_token.is_some() {
                    w.write_all(b"const ")?;
                }
                if addr_of.volatile_token.is_some() {
                    w.write_all(b"volatile ")?;
                }
                stack.push(RenderState::Expression(
                    addr_of.op_node.expect("address-of has an operand"),
                ));
            }
            RenderState::Block(id) => {
                let Node::Block(block) = self.ast.node(id) else {
                    unreachable!("Block render state on a different node");
                };
                w.write_all(b"{\n")?;
                let outer = self.indent;
                stack.push(RenderState::Text("}"));
                stack.push(RenderState::PrintIndent);
                stack.push(RenderState::Indent(outer));
                for &statement in block.statements.iter().rev() {
                    stack.push(RenderState::Text("\n"));
                    stack.push(RenderState::Statement(statement));
                    stack.push(RenderState::PrintIndent);
                }
                stack.push(RenderState::Indent(outer + INDENT_DELTA));
            }
            RenderState::Statement(id) => match self.ast.node(id) {
                Node::VarDecl(_) => stack.push(RenderState::VarDecl(id)),
                _ => {
                    stack.push(RenderState::Text(";"));
                    stack.push(RenderState::Expression(id));
                }
            },
            RenderState::Text(text) => w.write_all(text.as_bytes())?,
            RenderState::Indent(indent) => self.indent = indent,
            RenderState::PrintIndent => write_byte_n_times(w, b' ', self.indent)?,
        }
        Ok(())
    }
}

fn write_byte_n_times<W: Write>(w: &mut W, byte: u8, count: usize) -> io::Result<()> {
    for _ in 0..count {
        w.write_all(std::slice::from_ref(&byte))?;
    }
    Ok(())
}
