pub mod lexer;
pub mod parser;

use crate::error::CompileError;
use crate::ir::ast;

/// Source text to AST. Lexer errors stop before parsing, syntax errors are returned together.
pub fn parse(source: &str) -> Result<ast::Program, CompileError> {
    let (tokens, lex_errors) = lexer::tokenize(source);
    if !lex_errors.is_empty() {
        return Err(CompileError::Lex(lex_errors));
    }

    let (program, parse_errors) = parser::parse_tokens(tokens);
    if !parse_errors.is_empty() {
        return Err(CompileError::Syntax(parse_errors));
    }
    Ok(program)
}
