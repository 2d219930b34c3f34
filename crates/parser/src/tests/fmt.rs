use super::{assert_canonical, assert_formats_to};
use crate::format_source;
use crate::lexer::{Lexer, TokenKind};

#[test]
fn test_extern_fn_proto_canonical() {
    assert_canonical("extern fn puts(s: &const u8) -> c_int;\n");
}

#[test]
fn test_var_decl_forms_canonical() {
    assert_canonical(
        "const a = b;\n\
         pub const a = b;\n\
         var a = b;\n\
         pub var a = b;\n\
         const a: i32 = b;\n\
         pub const a: i32 = b;\n\
         var a: i32 = b;\n\
         pub var a: i32 = b;\n",
    );
}

#[test]
fn test_extern_var_decl_canonical() {
    assert_canonical("extern var foo: c_int;\n");
}

#[test]
fn test_fn_with_body_canonical() {
    assert_canonical("fn main(argc: c_int, argv: &&u8) -> c_int {\n    const a = b;\n}\n");
}

#[test]
fn test_whitespace_is_canonicalised() {
    assert_formats_to("const  a  =  b ;", "const a = b;\n");
    assert_formats_to("\n\nconst a=b;", "const a = b;\n");
    assert_formats_to("const a\n= b;", "const a = b;\n");
}

#[test]
fn test_export_visibility() {
    assert_canonical("export var x = y;\n");
    assert_canonical("export fn f() {\n}\n");
}

#[test]
fn test_calling_convention_keywords() {
    assert_canonical("nakedcc fn irq() {\n}\n");
    assert_canonical("coldcc fn cold_path() -> c_int;\n");
    assert_canonical("stdcallcc fn winapi(h: HANDLE) -> BOOL;\n");
}

#[test]
fn test_fn_proto_without_name() {
    assert_canonical("fn(a: T);\n");
}

#[test]
fn test_param_forms() {
    assert_canonical("fn f(T) -> T;\n");
    assert_canonical("fn f(comptime T, noalias p: &volatile u8) -> T;\n");
    assert_canonical("fn printf(fmt: &const u8, ...) -> c_int;\n");
}

#[test]
fn test_addr_of_qualifiers() {
    assert_canonical("const p: &const volatile u8 = q;\n");
    assert_canonical("const p: &&&u8 = q;\n");
    assert_formats_to("const p: &  const   u8 = q;", "const p: &const u8 = q;\n");
}

#[test]
fn test_empty_block() {
    assert_canonical("fn f() {\n}\n");
}

#[test]
fn test_block_statements() {
    assert_canonical("fn f() {\n    const a = b;\n    comptime var c: u8 = d;\n    e;\n}\n");
}

#[test]
fn test_line_comments_are_dropped() {
    assert_formats_to("// leading\nconst a = b; // trailing\n", "const a = b;\n");
}

#[test]
fn test_idempotence() {
    let sources = [
        "const  a  =  b ;",
        "extern fn puts(s: &const u8) -> c_int;\n",
        "fn main(argc: c_int, argv: &&u8) -> c_int {\n    const a = b;\n}\n",
        "pub   var x\n:\ni32 = y;",
        "fn f(comptime T, noalias p: &volatile u8, ...) -> T {\n    comptime const a = b;\n}",
    ];
    for source in sources {
        let once = format_source(source).unwrap();
        let twice = format_source(&once).unwrap();
        pretty_assertions::assert_str_eq!(once, twice);
    }
}

fn lex_kinds(source: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(source);
    let mut kinds = Vec::new();
    loop {
        let token = lexer.next();
        if token.kind == TokenKind::Eof {
            return kinds;
        }
        kinds.push(token.kind);
    }
}

// Formatting only rewrites whitespace; the token sequence must come
// through unchanged.
#[test]
fn test_formatting_preserves_token_kinds() {
    let sources = [
        "const  a  =  b ;",
        "extern fn puts(s: &const u8) -> c_int;\n",
        "fn main(argc: c_int, argv: &&u8) -> c_int {\n    const a = b;\n}\n",
        "pub const a: i32 = b;\nexport var c = d;\n",
    ];
    for source in sources {
        let formatted = format_source(source).unwrap();
        assert_eq!(lex_kinds(source), lex_kinds(&formatted), "token mismatch for {:?}", source);
    }
}
