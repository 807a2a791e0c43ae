//! The compiler driver. Reads a MiniC source file, runs it through the
//! translation core, and writes either the textual IR or ARM32 assembly to
//! stdout.
//!
//! Lexing and parsing are an external collaborator this core only consumes
//! the output of; [`parse`] is the seam where that collaborator would plug
//! in.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use minic::back::code_gen;
use minic::common::error::CompileError;
use minic::front::{ast, lower};
use minic::middle::render::render_module;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// The MiniC source file to compile.
    file: String,
    /// The output format.
    #[arg(value_enum, short, long, default_value_t = Output::Asm)]
    out: Output,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Output {
    /// The textual IR.
    Ir,
    /// ARM32 assembly.
    Asm,
}

/// The lexical/syntactic frontend this core treats as an external
/// collaborator. Not implemented here — only the AST it would produce is
/// part of this core.
fn parse(_source: &str) -> Result<ast::CompileUnit, CompileError> {
    todo!("plug in a MiniC lexer/parser here; this core only consumes the AST it produces")
}

fn run(args: &Args) -> Result<String, Vec<CompileError>> {
    let source = std::fs::read_to_string(&args.file)
        .map_err(|e| vec![CompileError::internal(format!("reading '{}': {e}", args.file))])?;

    let unit = parse(&source).map_err(|e| vec![e])?;
    let module = lower(&unit)?;

    Ok(match args.out {
        Output::Ir => render_module(&module),
        Output::Asm => code_gen(&module).asm_code(),
    })
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for e in errors {
                eprintln!("{e}");
            }
            ExitCode::FAILURE
        }
    }
}
