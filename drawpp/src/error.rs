use thiserror::Error;

/// Unrecognized input character. Lexing records it and keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Lexer error at line {line}: unexpected character '{lexeme}'")]
pub struct LexError {
    pub line: usize,
    pub lexeme: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Syntax error at line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Line {line}: {kind} '{name}' is already declared")]
    AlreadyDeclared {
        line: usize,
        name: String,
        kind: String,
    },

    #[error("Line {line}: undeclared variable '{name}'")]
    Undeclared { line: usize, name: String },

    #[error("Line {line}: '{name}' is not a cursor")]
    NotACursor { line: usize, name: String },

    #[error("Line {line}: unknown cursor method '{method}'")]
    UnknownCursorMethod { line: usize, method: String },

    #[error("Line {line}: cursor method '{method}' expects {expected} argument(s), got {found}")]
    CursorMethodArity {
        line: usize,
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: function '{function}' expects {expected} argument(s), got {found}")]
    FunctionArity {
        line: usize,
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: Cursor constructor expects {expected} argument(s), got {found}")]
    CursorConstructorArity {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: cannot assign to read-only constant '{name}'")]
    ReadOnlyAssignment { line: usize, name: String },

    #[error("Line {line}: arguments of '{function}' must be numeric constants")]
    NonConstantArgument { line: usize, function: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Line {line}: {construct} is not supported by the {target} backend")]
    Unsupported {
        construct: &'static str,
        target: &'static str,
        line: usize,
    },

    #[error("Line {line}: arguments of '{call}' must be numeric constants")]
    NonConstantArgument { call: String, line: usize },

    #[error("Line {line}: drawing call '{name}' cannot be used as a value")]
    DrawInExpression { name: String, line: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Template is missing the '{marker}' marker")]
pub struct TemplateError {
    pub marker: &'static str,
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{} lexer error(s)", .0.len())]
    Lex(Vec<LexError>),

    #[error("{} syntax error(s)", .0.len())]
    Syntax(Vec<ParseError>),

    #[error("{} semantic error(s)", .0.len())]
    Semantic(Vec<SemanticError>),

    #[error("Backend error: {0}")]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CompileError {
    /// One line per underlying diagnostic, in the order they were produced.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Self::Lex(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Syntax(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Semantic(errors) => errors.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }
}
