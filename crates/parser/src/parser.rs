use allocator_api2::vec::Vec;
use bumpalo::Bump;

use crate::ast::{
    AddrOfExpr, Ast, Block, FnProto, Ident, Node, NodeId, NodeList, ParamDecl, VarDecl,
};
use crate::lexer::{Lexer, SourceSpan, Token, TokenKind, token_description};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: &'static str },
    #[error("{construct} are not supported")]
    Unsupported { construct: &'static str },
}

impl ParseError {
    fn unexpected(expected: &'static str, found: Token) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedToken {
                expected,
                found: token_description(found.kind),
            },
            span: found.span,
        }
    }

    fn unsupported(construct: &'static str, span: SourceSpan) -> Self {
        Self { kind: ParseErrorKind::Unsupported { construct }, span }
    }
}

/// Fixed two-token lookahead buffer in front of the lexer. Every lookahead
/// decision in the grammar rewinds at most two tokens, so pushing a third
/// is a parser bug, not a recoverable condition.
#[derive(Debug, Default)]
struct Pushback {
    slots: [Option<Token>; 2],
    len: usize,
}

impl Pushback {
    fn push(&mut self, token: Token) {
        assert!(self.len < self.slots.len(), "token pushback overflow");
        self.slots[self.len] = Some(token);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Token> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        self.slots[self.len].take()
    }
}

/// Where a sub-rule stores the node it produces: a field slot of an
/// existing node, or the tail of one of its child lists. One destination
/// type lets the same expression states serve every syntactic context.
#[derive(Debug, Clone, Copy)]
enum Dest {
    Slot(NodeId, Slot),
    List(NodeId),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    VarDeclType,
    VarDeclAlign,
    VarDeclInit,
    FnProtoReturnType,
    ParamDeclType,
    AddrOfAlign,
    AddrOfOperand,
}

#[derive(Debug, Clone, Copy)]
struct VarDeclCtx {
    visib_token: Option<Token>,
    comptime_token: Option<Token>,
    extern_token: Option<Token>,
    mut_token: Token,
    dest: Dest,
}

/// Pending grammar continuations. The parser never recurses on the host
/// stack; nesting depth is bounded only by this heap-allocated work stack.
#[derive(Debug, Clone, Copy)]
enum State {
    TopLevel,
    TopLevelExtern { visib_token: Option<Token> },
    TopLevelDecl { visib_token: Option<Token>, extern_token: Option<Token> },
    Expression(Dest),
    GroupedExpression(Dest),
    UnwrapExpression(Dest),
    BoolOrExpression(Dest),
    BoolAndExpression(Dest),
    ComparisonExpression(Dest),
    BinaryOrExpression(Dest),
    BinaryXorExpression(Dest),
    BinaryAndExpression(Dest),
    BitShiftExpression(Dest),
    AdditionExpression(Dest),
    MultiplyExpression(Dest),
    BraceSuffixExpression(Dest),
    PrefixOpExpression(Dest),
    SuffixOpExpression(Dest),
    PrimaryExpression(Dest),
    TypeExpr(Dest),
    VarDecl(VarDeclCtx),
    VarDeclAlign(NodeId),
    VarDeclEq(NodeId),
    ExpectToken(TokenKind),
    FnProto(NodeId),
    FnProtoAlign(NodeId),
    ParamDecl(NodeId),
    ParamDeclComma(NodeId),
    FnDef(NodeId),
    Block(NodeId),
    Statement(NodeId),
}

pub fn parse<'src, 'ast>(source: &'src str, arena: &'ast Bump) -> Result<Ast<'ast>, ParseError> {
    Parser::new(source, arena).run()
}

struct Parser<'src, 'ast> {
    arena: &'ast Bump,
    #[allow(dead_code)]
    source: &'src str,
    lexer: Lexer<'src>,
    pushback: Pushback,
    ast: Ast<'ast>,
}

impl<'src, 'ast> Parser<'src, 'ast> {
    fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            arena,
            source,
            lexer: Lexer::new(source),
            pushback: Pushback::default(),
            ast: Ast::new(arena),
        }
    }

    fn run(mut self) -> Result<Ast<'ast>, ParseError> {
        // the work stack lives in the same arena as the nodes it builds
        let mut stack: Vec<State, &Bump> = Vec::with_capacity_in(32, self.arena);
        stack.push(State::TopLevel);
        while let Some(state) = stack.pop() {
            self.step(state, &mut stack)?;
        }
        Ok(self.ast)
    }

    fn next_token(&mut self) -> Token {
        self.pushback.pop().unwrap_or_else(|| self.lexer.next())
    }

    fn put_back(&mut self, token: Token) {
        self.pushback.push(token);
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.next_token();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::unexpected(token_description(kind), token))
        }
    }

    fn store(&mut self, dest: Dest, id: NodeId) {
        match dest {
            Dest::List(parent) => match &mut self.ast.nodes[parent] {
                Node::Root(root) => root.decls.push(id),
                Node::Block(block) => block.statements.push(id),
                node => unreachable!("{} has no child list", node.kind_name()),
            },
            Dest::Slot(parent, slot) => match (&mut self.ast.nodes[parent], slot) {
                (Node::VarDecl(decl), Slot::VarDeclType) => decl.type_node = Some(id),
                (Node::VarDecl(decl), Slot::VarDeclAlign) => decl.align_node = Some(id),
                (Node::VarDecl(decl), Slot::VarDeclInit) => decl.init_node = Some(id),
                (Node::FnProto(proto), Slot::FnProtoReturnType) => proto.return_type = Some(id),
                (Node::ParamDecl(param), Slot::ParamDeclType) => param.type_node = Some(id),
                (Node::AddrOfExpr(addr_of), Slot::AddrOfAlign) => addr_of.align_node = Some(id),
                (Node::AddrOfExpr(addr_of), Slot::AddrOfOperand) => addr_of.op_node = Some(id),
                (node, slot) => {
                    unreachable!("{} has no {:?} slot", node.kind_name(), slot)
                }
            },
        }
    }

    fn fn_proto_mut(&mut self, id: NodeId) -> &mut FnProto<'ast> {
        match &mut self.ast.nodes[id] {
            Node::FnProto(proto) => proto,
            node => unreachable!("expected FnProto, got {}", node.kind_name()),
        }
    }

    fn var_decl_mut(&mut self, id: NodeId) -> &mut VarDecl {
        match &mut self.ast.nodes[id] {
            Node::VarDecl(decl) => decl,
            node => unreachable!("expected VarDecl, got {}", node.kind_name()),
        }
    }

    fn addr_of_mut(&mut self, id: NodeId) -> &mut AddrOfExpr {
        match &mut self.ast.nodes[id] {
            Node::AddrOfExpr(addr_of) => addr_of,
            node => unreachable!("expected AddrOfExpr, got {}", node.kind_name()),
        }
    }

    fn block_mut(&mut self, id: NodeId) -> &mut Block<'ast> {
        match &mut self.ast.nodes[id] {
            Node::Block(block) => block,
            node => unreachable!("expected Block, got {}", node.kind_name()),
        }
    }

    fn create_fn_proto(
        &mut self,
        visib_token: Option<Token>,
        extern_token: Option<Token>,
        cc_token: Option<Token>,
        fn_token: Token,
    ) -> NodeId {
        let proto = self.ast.push(Node::FnProto(FnProto {
            visib_token,
            extern_token,
            cc_token,
            inline_token: None,
            fn_token,
            name_token: None,
            params: NodeList::new_in(self.arena),
            return_type: None,
            var_args_token: None,
            lib_name: None,
            align_node: None,
            body: None,
        }));
        self.store(Dest::List(self.ast.root), proto);
        proto
    }

    // Successor states are pushed in reverse: the last push runs first, so
    // to parse `A B C` left-to-right we push C, then B, then A.
    fn step(&mut self, state: State, stack: &mut Vec<State, &'ast Bump>) -> Result<(), ParseError> {
        match state {
            State::TopLevel => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::Eof => {}
                    TokenKind::KeywordPub | TokenKind::KeywordExport => {
                        stack.push(State::TopLevelExtern { visib_token: Some(token) });
                    }
                    _ => {
                        self.put_back(token);
                        stack.push(State::TopLevelExtern { visib_token: None });
                    }
                }
            }
            State::TopLevelExtern { visib_token } => {
                let token = self.next_token();
                if token.kind == TokenKind::KeywordExtern {
                    stack.push(State::TopLevelDecl { visib_token, extern_token: Some(token) });
                } else {
                    self.put_back(token);
                    stack.push(State::TopLevelDecl { visib_token, extern_token: None });
                }
            }
            State::TopLevelDecl { visib_token, extern_token } => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::KeywordVar | TokenKind::KeywordConst => {
                        stack.push(State::TopLevel);
                        stack.push(State::VarDecl(VarDeclCtx {
                            visib_token,
                            comptime_token: None,
                            extern_token,
                            mut_token: token,
                            dest: Dest::List(self.ast.root),
                        }));
                    }
                    TokenKind::KeywordFn => {
                        let proto = self.create_fn_proto(visib_token, extern_token, None, token);
                        stack.push(State::TopLevel);
                        stack.push(State::FnDef(proto));
                        stack.push(State::FnProto(proto));
                    }
                    TokenKind::KeywordColdcc
                    | TokenKind::KeywordNakedcc
                    | TokenKind::KeywordStdcallcc => {
                        let fn_token = self.expect(TokenKind::KeywordFn)?;
                        let proto =
                            self.create_fn_proto(visib_token, extern_token, Some(token), fn_token);
                        stack.push(State::TopLevel);
                        stack.push(State::FnDef(proto));
                        stack.push(State::FnProto(proto));
                    }
                    TokenKind::StrLit(_) if extern_token.is_some() => {
                        return Err(ParseError::unsupported(
                            "extern library name declarations",
                            token.span,
                        ));
                    }
                    _ => return Err(ParseError::unexpected("a top level declaration", token)),
                }
            }
            State::VarDecl(ctx) => {
                let name_token = self.expect(TokenKind::Ident)?;
                let var_decl = self.ast.push(Node::VarDecl(VarDecl {
                    visib_token: ctx.visib_token,
                    comptime_token: ctx.comptime_token,
                    extern_token: ctx.extern_token,
                    mut_token: ctx.mut_token,
                    name_token,
                    eq_token: None,
                    lib_name: None,
                    type_node: None,
                    align_node: None,
                    init_node: None,
                }));
                self.store(ctx.dest, var_decl);
                stack.push(State::VarDeclAlign(var_decl));
                let token = self.next_token();
                if token.kind == TokenKind::Colon {
                    stack.push(State::TypeExpr(Dest::Slot(var_decl, Slot::VarDeclType)));
                } else {
                    self.put_back(token);
                }
            }
            State::VarDeclAlign(var_decl) => {
                stack.push(State::VarDeclEq(var_decl));
                let token = self.next_token();
                if token.kind == TokenKind::KeywordAlign {
                    stack.push(State::GroupedExpression(Dest::Slot(
                        var_decl,
                        Slot::VarDeclAlign,
                    )));
                } else {
                    self.put_back(token);
                }
            }
            State::VarDeclEq(var_decl) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::Equal => {
                        self.var_decl_mut(var_decl).eq_token = Some(token);
                        stack.push(State::ExpectToken(TokenKind::Semicolon));
                        stack.push(State::Expression(Dest::Slot(var_decl, Slot::VarDeclInit)));
                    }
                    TokenKind::Semicolon => {}
                    _ => return Err(ParseError::unexpected("`=` or `;`", token)),
                }
            }
            State::ExpectToken(kind) => {
                self.expect(kind)?;
            }
            State::FnProto(proto) => {
                let mut token = self.next_token();
                if token.kind == TokenKind::Ident {
                    self.fn_proto_mut(proto).name_token = Some(token);
                    token = self.next_token();
                }
                if token.kind != TokenKind::LParen {
                    return Err(ParseError::unexpected("`(`", token));
                }
                let token = self.next_token();
                if token.kind == TokenKind::RParen {
                    stack.push(State::FnProtoAlign(proto));
                } else {
                    self.put_back(token);
                    stack.push(State::ParamDecl(proto));
                }
            }
            State::ParamDecl(proto) => {
                let mut comptime_token = None;
                let mut noalias_token = None;
                let mut token = self.next_token();
                match token.kind {
                    TokenKind::KeywordComptime => {
                        comptime_token = Some(token);
                        token = self.next_token();
                    }
                    TokenKind::KeywordNoalias => {
                        noalias_token = Some(token);
                        token = self.next_token();
                    }
                    _ => {}
                }
                // `name :` needs the second lookahead token: an identifier
                // alone may just be the start of the type expression
                let mut name_token = None;
                if token.kind == TokenKind::Ident {
                    let colon = self.next_token();
                    if colon.kind == TokenKind::Colon {
                        name_token = Some(token);
                        token = self.next_token();
                    } else {
                        self.put_back(colon);
                    }
                }
                let param = self.ast.push(Node::ParamDecl(ParamDecl {
                    comptime_token,
                    noalias_token,
                    name_token,
                    type_node: None,
                    var_args_token: None,
                }));
                self.fn_proto_mut(proto).params.push(param);
                if token.kind == TokenKind::Ellipsis3 {
                    match &mut self.ast.nodes[param] {
                        Node::ParamDecl(p) => p.var_args_token = Some(token),
                        _ => unreachable!(),
                    }
                    self.fn_proto_mut(proto).var_args_token = Some(token);
                    // a variadic marker must be the last parameter
                    stack.push(State::FnProtoAlign(proto));
                    stack.push(State::ExpectToken(TokenKind::RParen));
                } else {
                    self.put_back(token);
                    stack.push(State::ParamDeclComma(proto));
                    stack.push(State::TypeExpr(Dest::Slot(param, Slot::ParamDeclType)));
                }
            }
            State::ParamDeclComma(proto) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::Comma => stack.push(State::ParamDecl(proto)),
                    TokenKind::RParen => stack.push(State::FnProtoAlign(proto)),
                    _ => return Err(ParseError::unexpected("`,` or `)`", token)),
                }
            }
            State::FnProtoAlign(proto) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::KeywordAlign => {
                        return Err(ParseError::unsupported(
                            "`align` expressions on function prototypes",
                            token.span,
                        ));
                    }
                    TokenKind::Arrow => {
                        stack.push(State::TypeExpr(Dest::Slot(proto, Slot::FnProtoReturnType)));
                    }
                    _ => self.put_back(token),
                }
            }
            State::FnDef(proto) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::Semicolon => {}
                    TokenKind::LBrace => {
                        let block = self.ast.push(Node::Block(Block {
                            lbrace: token,
                            rbrace: None,
                            statements: NodeList::new_in(self.arena),
                        }));
                        self.fn_proto_mut(proto).body = Some(block);
                        stack.push(State::Block(block));
                    }
                    _ => return Err(ParseError::unexpected("`;` or `{`", token)),
                }
            }
            State::Block(block) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::RBrace => self.block_mut(block).rbrace = Some(token),
                    TokenKind::Eof => return Err(ParseError::unexpected("`}`", token)),
                    _ => {
                        self.put_back(token);
                        stack.push(State::Block(block));
                        stack.push(State::Statement(block));
                    }
                }
            }
            State::Statement(block) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::KeywordComptime => {
                        let mut_token = self.next_token();
                        match mut_token.kind {
                            TokenKind::KeywordVar | TokenKind::KeywordConst => {
                                stack.push(State::VarDecl(VarDeclCtx {
                                    visib_token: None,
                                    comptime_token: Some(token),
                                    extern_token: None,
                                    mut_token,
                                    dest: Dest::List(block),
                                }));
                            }
                            _ => {
                                return Err(ParseError::unexpected("`var` or `const`", mut_token));
                            }
                        }
                    }
                    TokenKind::KeywordVar | TokenKind::KeywordConst => {
                        stack.push(State::VarDecl(VarDeclCtx {
                            visib_token: None,
                            comptime_token: None,
                            extern_token: None,
                            mut_token: token,
                            dest: Dest::List(block),
                        }));
                    }
                    _ => {
                        self.put_back(token);
                        stack.push(State::ExpectToken(TokenKind::Semicolon));
                        stack.push(State::Expression(Dest::List(block)));
                    }
                }
            }
            // The expression grammar is a layered descent. Most layers are
            // pass-throughs today; each keeps its own state so new operators
            // slot in without restructuring the machine.
            State::Expression(dest) => stack.push(State::UnwrapExpression(dest)),
            State::UnwrapExpression(dest) => stack.push(State::BoolOrExpression(dest)),
            State::BoolOrExpression(dest) => stack.push(State::BoolAndExpression(dest)),
            State::BoolAndExpression(dest) => stack.push(State::ComparisonExpression(dest)),
            State::ComparisonExpression(dest) => stack.push(State::BinaryOrExpression(dest)),
            State::BinaryOrExpression(dest) => stack.push(State::BinaryXorExpression(dest)),
            State::BinaryXorExpression(dest) => stack.push(State::BinaryAndExpression(dest)),
            State::BinaryAndExpression(dest) => stack.push(State::BitShiftExpression(dest)),
            State::BitShiftExpression(dest) => stack.push(State::AdditionExpression(dest)),
            State::AdditionExpression(dest) => stack.push(State::MultiplyExpression(dest)),
            State::MultiplyExpression(dest) => stack.push(State::BraceSuffixExpression(dest)),
            State::BraceSuffixExpression(dest) => stack.push(State::PrefixOpExpression(dest)),
            State::PrefixOpExpression(dest) => {
                let token = self.next_token();
                if token.kind != TokenKind::Ampersand {
                    self.put_back(token);
                    stack.push(State::SuffixOpExpression(dest));
                    return Ok(());
                }
                let addr_of = self.ast.push(Node::AddrOfExpr(AddrOfExpr {
                    op_token: token,
                    align_node: None,
                    bit_offset_start_token: None,
                    bit_offset_end_token: None,
                    const_token: None,
                    volatile_token: None,
                    op_node: None,
                }));
                self.store(dest, addr_of);
                let mut align_pending = false;
                loop {
                    let token = self.next_token();
                    match token.kind {
                        TokenKind::KeywordAlign => {
                            align_pending = true;
                            break;
                        }
                        TokenKind::KeywordConst => {
                            self.addr_of_mut(addr_of).const_token = Some(token);
                        }
                        TokenKind::KeywordVolatile => {
                            self.addr_of_mut(addr_of).volatile_token = Some(token);
                        }
                        _ => {
                            self.put_back(token);
                            break;
                        }
                    }
                }
                stack.push(State::PrefixOpExpression(Dest::Slot(addr_of, Slot::AddrOfOperand)));
                if align_pending {
                    stack.push(State::GroupedExpression(Dest::Slot(addr_of, Slot::AddrOfAlign)));
                }
            }
            State::SuffixOpExpression(dest) => stack.push(State::PrimaryExpression(dest)),
            State::PrimaryExpression(dest) => {
                let token = self.next_token();
                match token.kind {
                    TokenKind::Ident => {
                        let ident = self.ast.push(Node::Ident(Ident { name_token: token }));
                        self.store(dest, ident);
                    }
                    _ => return Err(ParseError::unexpected("an expression", token)),
                }
            }
            State::TypeExpr(dest) => {
                let token = self.next_token();
                if token.kind == TokenKind::KeywordVar {
                    return Err(ParseError::unsupported("`var` type expressions", token.span));
                }
                self.put_back(token);
                stack.push(State::Expression(dest));
            }
            State::GroupedExpression(_dest) => {
                // would parse `( expr )` into the destination; nothing that
                // reaches here is implemented yet
                let token = self.next_token();
                return Err(ParseError::unsupported("grouped `align(...)` expressions", token.span));
            }
        }
        Ok(())
    }
}
