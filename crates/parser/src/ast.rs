use std::io::{self, Write};

use allocator_api2::vec::Vec;
use bumpalo::Bump;
use kata_data::{IndexVec, X32};

use crate::lexer::Token;

pub struct NodeIndex;
pub type NodeId = X32<NodeIndex>;

pub type NodeList<'ast> = Vec<NodeId, &'ast Bump>;

/// One syntax tree node. Every variant keeps the tokens that introduced it,
/// so the canonical renderer can recover identifier spellings from the
/// source buffer. Child nodes are referenced by [`NodeId`] into the owning
/// [`Ast`]; child lists are the sole owners of their entries.
#[derive(Debug)]
pub enum Node<'ast> {
    Root(Root<'ast>),
    VarDecl(VarDecl),
    Ident(Ident),
    FnProto(FnProto<'ast>),
    ParamDecl(ParamDecl),
    AddrOfExpr(AddrOfExpr),
    Block(Block<'ast>),
}

#[derive(Debug)]
pub struct Root<'ast> {
    pub decls: NodeList<'ast>,
}

#[derive(Debug)]
pub struct VarDecl {
    pub visib_token: Option<Token>,
    pub comptime_token: Option<Token>,
    pub extern_token: Option<Token>,
    pub mut_token: Token,
    pub name_token: Token,
    pub eq_token: Option<Token>,
    pub lib_name: Option<NodeId>,
    pub type_node: Option<NodeId>,
    pub align_node: Option<NodeId>,
    pub init_node: Option<NodeId>,
}

#[derive(Debug)]
pub struct Ident {
    pub name_token: Token,
}

#[derive(Debug)]
pub struct FnProto<'ast> {
    pub visib_token: Option<Token>,
    pub extern_token: Option<Token>,
    pub cc_token: Option<Token>,
    pub inline_token: Option<Token>,
    pub fn_token: Token,
    pub name_token: Option<Token>,
    pub params: NodeList<'ast>,
    pub return_type: Option<NodeId>,
    pub var_args_token: Option<Token>,
    pub lib_name: Option<NodeId>,
    pub align_node: Option<NodeId>,
    pub body: Option<NodeId>,
}

#[derive(Debug)]
pub struct ParamDecl {
    pub comptime_token: Option<Token>,
    pub noalias_token: Option<Token>,
    pub name_token: Option<Token>,
    /// Absent exactly when this is the trailing `...` parameter.
    pub type_node: Option<NodeId>,
    pub var_args_token: Option<Token>,
}

#[derive(Debug)]
pub struct AddrOfExpr {
    pub op_token: Token,
    pub align_node: Option<NodeId>,
    pub bit_offset_start_token: Option<Token>,
    pub bit_offset_end_token: Option<Token>,
    pub const_token: Option<Token>,
    pub volatile_token: Option<Token>,
    /// Filled in by the parser right after the node is created.
    pub op_node: Option<NodeId>,
}

#[derive(Debug)]
pub struct Block<'ast> {
    pub lbrace: Token,
    pub rbrace: Option<Token>,
    pub statements: NodeList<'ast>,
}

impl<'ast> Node<'ast> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Root(_) => "Root",
            Node::VarDecl(_) => "VarDecl",
            Node::Ident(_) => "Ident",
            Node::FnProto(_) => "FnProto",
            Node::ParamDecl(_) => "ParamDecl",
            Node::AddrOfExpr(_) => "AddrOfExpr",
            Node::Block(_) => "Block",
        }
    }

    fn name_token(&self) -> Option<Token> {
        match self {
            Node::VarDecl(decl) => Some(decl.name_token),
            Node::Ident(ident) => Some(ident.name_token),
            Node::FnProto(proto) => proto.name_token,
            Node::ParamDecl(param) => param.name_token,
            _ => None,
        }
    }
}

/// One parse session's tree: the node table and the root, all storage in a
/// single arena. Dropping the arena reclaims every node at once.
#[derive(Debug)]
pub struct Ast<'ast> {
    arena: &'ast Bump,
    pub nodes: IndexVec<NodeIndex, Node<'ast>, &'ast Bump>,
    pub root: NodeId,
}

impl<'ast> Ast<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        let mut nodes = IndexVec::with_capacity_in(16, arena);
        nodes.push(Node::Root(Root { decls: NodeList::new_in(arena) }));
        Self { arena, nodes, root: NodeId::ZERO }
    }

    pub fn arena(&self) -> &'ast Bump {
        self.arena
    }

    pub fn push(&mut self, node: Node<'ast>) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node<'ast> {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the `index`-th child of `id`, or `None` once the children are
    /// exhausted. Children come back in source order; both the post-order
    /// walk and the tree dump rely on that order being stable.
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        match &self.nodes[id] {
            Node::Root(root) => root.decls.get(index).copied(),
            Node::VarDecl(decl) => [decl.lib_name, decl.type_node, decl.align_node, decl.init_node]
                .into_iter()
                .flatten()
                .nth(index),
            Node::Ident(_) => None,
            Node::FnProto(proto) => {
                let mut index = index;
                if let Some(lib_name) = proto.lib_name {
                    if index == 0 {
                        return Some(lib_name);
                    }
                    index -= 1;
                }
                if index < proto.params.len() {
                    return Some(proto.params[index]);
                }
                index -= proto.params.len();
                [proto.align_node, proto.return_type, proto.body].into_iter().flatten().nth(index)
            }
            Node::ParamDecl(param) => match index {
                0 => param.type_node,
                _ => None,
            },
            Node::AddrOfExpr(addr_of) => {
                [addr_of.align_node, addr_of.op_node].into_iter().flatten().nth(index)
            }
            Node::Block(block) => block.statements.get(index).copied(),
        }
    }

    /// Iterative post-order traversal with an explicit work stack: leaves
    /// are visited the moment they are popped, interior nodes are pushed
    /// back and visited only after all of their children. Visits every node
    /// reachable from the root exactly once.
    pub fn walk_postorder(&self, mut visit: impl FnMut(NodeId)) {
        enum Step {
            Enter(NodeId),
            Visit(NodeId),
        }

        let mut stack: Vec<Step, &Bump> = Vec::new_in(self.arena);
        stack.push(Step::Enter(self.root));
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    if self.child_at(id, 0).is_none() {
                        visit(id);
                        continue;
                    }
                    stack.push(Step::Visit(id));
                    let children_from = stack.len();
                    let mut index = 0;
                    while let Some(child) = self.child_at(id, index) {
                        stack.push(Step::Enter(child));
                        index += 1;
                    }
                    // entered left-to-right, so reverse what we just pushed
                    stack[children_from..].reverse();
                }
                Step::Visit(id) => visit(id),
            }
        }
    }

    /// Renders the tree one node per line, children indented two spaces.
    pub fn dump<W: Write>(&self, source: &str, w: &mut W) -> io::Result<()> {
        let mut stack: Vec<(NodeId, usize), &Bump> = Vec::new_in(self.arena);
        stack.push((self.root, 0));
        while let Some((id, depth)) = stack.pop() {
            for _ in 0..depth {
                w.write_all(b"  ")?;
            }
            let node = &self.nodes[id];
            match node.name_token() {
                Some(token) => writeln!(w, "{} \"{}\"", node.kind_name(), token.slice(source))?,
                None => writeln!(w, "{}", node.kind_name())?,
            }
            let children_from = stack.len();
            let mut index = 0;
            while let Some(child) = self.child_at(id, index) {
                stack.push((child, depth + 1));
                index += 1;
            }
            stack[children_from..].reverse();
        }
        Ok(())
    }
}
