use std::collections::HashMap;

use bumpalo::Bump;

use crate::ast::NodeId;
use crate::parse;

const SAMPLE: &str = "extern fn puts(s: &const u8) -> c_int;\n\
                      pub const a: i32 = b;\n\
                      fn main(argc: c_int, argv: &&u8) -> c_int {\n    const a = b;\n}\n";

// The post-order walk must visit every allocated node exactly once, and
// never a parent before one of its children.
#[test]
fn test_walk_visits_every_node_once() {
    let arena = Bump::new();
    let ast = parse(SAMPLE, &arena).unwrap();

    let mut order: HashMap<NodeId, usize> = HashMap::new();
    ast.walk_postorder(|id| {
        let position = order.len();
        let previous = order.insert(id, position);
        assert!(previous.is_none(), "{:?} visited twice", id);
    });
    assert_eq!(order.len(), ast.node_count());

    for id in (0..ast.node_count() as u32).map(NodeId::new) {
        let mut index = 0;
        while let Some(child) = ast.child_at(id, index) {
            assert!(order[&child] < order[&id], "{:?} visited before its child {:?}", id, child);
            index += 1;
        }
    }
}

#[test]
fn test_walk_single_root() {
    let arena = Bump::new();
    let ast = parse("", &arena).unwrap();
    let mut visited = 0;
    ast.walk_postorder(|_| visited += 1);
    assert_eq!(visited, 1);
}

#[test]
fn test_child_enumeration_order() {
    let arena = Bump::new();
    let ast = parse("const a: i32 = b;", &arena).unwrap();
    let decl = ast.child_at(ast.root, 0).unwrap();
    let type_node = ast.child_at(decl, 0).unwrap();
    let init_node = ast.child_at(decl, 1).unwrap();
    assert!(ast.child_at(decl, 2).is_none());

    // children come back in source order
    let type_ident = match ast.node(type_node) {
        crate::ast::Node::Ident(ident) => ident.name_token,
        node => panic!("expected Ident, got {}", node.kind_name()),
    };
    let init_ident = match ast.node(init_node) {
        crate::ast::Node::Ident(ident) => ident.name_token,
        node => panic!("expected Ident, got {}", node.kind_name()),
    };
    assert!(type_ident.span.start < init_ident.span.start);
}

// Token offsets must be monotone along a pre-order traversal.
#[test]
fn test_pre_order_token_offsets_are_monotone() {
    let arena = Bump::new();
    let ast = parse(SAMPLE, &arena).unwrap();

    let mut stack = vec![ast.root];
    let mut last_start = 0u32;
    while let Some(id) = stack.pop() {
        use crate::ast::Node;
        let start = match ast.node(id) {
            Node::Root(_) => None,
            Node::VarDecl(decl) => Some(decl.mut_token.span.start),
            Node::Ident(ident) => Some(ident.name_token.span.start),
            Node::FnProto(proto) => Some(proto.fn_token.span.start),
            Node::ParamDecl(param) => {
                param.name_token.or(param.var_args_token).map(|t| t.span.start)
            }
            Node::AddrOfExpr(addr_of) => Some(addr_of.op_token.span.start),
            Node::Block(block) => Some(block.lbrace.span.start),
        };
        if let Some(start) = start {
            assert!(start >= last_start, "node tokens out of order at offset {}", start);
            last_start = start;
        }
        let from = stack.len();
        let mut index = 0;
        while let Some(child) = ast.child_at(id, index) {
            stack.push(child);
            index += 1;
        }
        stack[from..].reverse();
    }
}

#[test]
fn test_dump() {
    let arena = Bump::new();
    let source = "const a = b;\nfn f(x: T) {\n    const c = d;\n}\n";
    let ast = parse(source, &arena).unwrap();
    let mut out = Vec::new();
    ast.dump(source, &mut out).unwrap();
    let dump = String::from_utf8(out).unwrap();
    pretty_assertions::assert_str_eq!(
        dump,
        "Root\n\
         \x20 VarDecl \"a\"\n\
         \x20   Ident \"b\"\n\
         \x20 FnProto \"f\"\n\
         \x20   ParamDecl \"x\"\n\
         \x20     Ident \"T\"\n\
         \x20   Block\n\
         \x20     VarDecl \"c\"\n\
         \x20       Ident \"d\"\n"
    );
}
