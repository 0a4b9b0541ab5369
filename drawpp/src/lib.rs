pub mod backends;
pub mod builtins;
pub mod error;
pub mod ir;
pub mod parser;
pub mod semantic;
pub mod template;

pub use backends::{Backend, BackendType, GeneratedCode, Surface};
pub use error::CompileError;

use ir::ast;

/// Lexes, parses and analyzes `source`. Each stage only runs when the previous
/// one reported nothing.
pub fn check(source: &str) -> Result<ast::Program, CompileError> {
    let program = parser::parse(source)?;
    let errors = semantic::analyze(&program);
    if !errors.is_empty() {
        return Err(CompileError::Semantic(errors));
    }
    Ok(program)
}

/// Full pipeline with the C backend.
pub fn compile(source: &str, surface: Surface) -> Result<GeneratedCode, CompileError> {
    compile_for(BackendType::C, source, surface)
}

pub fn compile_for(target: BackendType, source: &str, surface: Surface) -> Result<GeneratedCode, CompileError> {
    let program = check(source)?;
    let mut backend = target.create(surface);
    Ok(backend.generate(&program)?)
}
