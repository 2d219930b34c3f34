use std::io::{self, Write};
use std::process::ExitCode;

use bumpalo::Bump;
use kata_parser::lexer::{Lexer, TokenKind};
use kata_parser::{diagnostics, parse, render};

fn main() -> ExitCode {
    let mut args = std::env::args();
    args.next();
    let Some(path) = args.next() else {
        eprintln!("usage: katafmt [PATH]");
        return ExitCode::FAILURE;
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn write_failed(err: io::Error) -> String {
    format!("error: write to stderr failed: {err}")
}

fn run(path: &str) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|err| format!("error: unable to read {path}: {err}"))?;

    let mut out = io::stderr().lock();

    writeln!(out, "====input:====").map_err(write_failed)?;
    out.write_all(source.as_bytes()).map_err(write_failed)?;

    writeln!(out, "====tokenization:====").map_err(write_failed)?;
    let mut lexer = Lexer::new(&source);
    loop {
        let token = lexer.next();
        writeln!(out, "{:?} {}..{}", token.kind, token.span.start, token.span.end)
            .map_err(write_failed)?;
        if token.kind == TokenKind::Eof {
            break;
        }
    }

    writeln!(out, "====parse:====").map_err(write_failed)?;
    let arena = Bump::new();
    let ast = parse(&source, &arena)
        .map_err(|err| diagnostics::render_parse_error(&err, path, &source))?;
    ast.dump(&source, &mut out).map_err(write_failed)?;

    writeln!(out, "====fmt:====").map_err(write_failed)?;
    render(&ast, &source, &mut out).map_err(write_failed)?;

    Ok(())
}
