pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod render;

#[cfg(test)]
mod tests;

pub use parser::{ParseError, parse};
pub use render::render;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parses `source` and returns its canonical form. The arena backing the
/// tree lives only for the duration of the call; the session's nodes are
/// reclaimed wholesale when it drops.
pub fn format_source(source: &str) -> Result<String, Error> {
    let arena = bumpalo::Bump::new();
    let ast = parse(source, &arena)?;
    let mut out = Vec::new();
    render(&ast, source, &mut out)?;
    Ok(String::from_utf8(out).expect("renderer emits UTF-8"))
}
