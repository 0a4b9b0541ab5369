use std::fmt;

pub use crate::parser::lexer::Number;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// var x: float = 1.5;
    VarDeclaration {
        name: String,
        var_type: Option<String>,
        initializer: Expression,
        line: usize,
    },
    /// Cursor c = Cursor(10, 20);
    CursorDeclaration {
        name: String,
        arguments: Vec<Expression>,
        line: usize,
    },
    /// function name(a, b) { ... }
    FunctionDeclaration {
        name: String,
        params: Vec<String>,
        body: Block,
        line: usize,
    },
    /// `else if` is stored as an else block holding the nested `If`.
    If {
        condition: Expression,
        then_block: Block,
        else_block: Option<Block>,
        line: usize,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        increment: Option<Expression>,
        body: Block,
        line: usize,
    },
    While {
        condition: Expression,
        body: Block,
        line: usize,
    },
    DoWhile {
        body: Block,
        condition: Expression,
        line: usize,
    },
    Return {
        value: Option<Expression>,
        line: usize,
    },
    /// copy(x, y, w, h) to (x2, y2);
    Copy {
        source: Vec<Expression>,
        destination: Vec<Expression>,
        line: usize,
    },
    /// animate(a, b) { ... }
    Animate {
        first: Expression,
        second: Expression,
        body: Block,
        line: usize,
    },
    /// c.drawCircle(5);
    CursorMethod {
        cursor: String,
        method: String,
        arguments: Vec<Expression>,
        line: usize,
    },
    Block(Block),
    Expression {
        expression: Expression,
        line: usize,
    },
    Empty {
        line: usize,
    },
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::VarDeclaration { line, .. }
            | Statement::CursorDeclaration { line, .. }
            | Statement::FunctionDeclaration { line, .. }
            | Statement::If { line, .. }
            | Statement::For { line, .. }
            | Statement::While { line, .. }
            | Statement::DoWhile { line, .. }
            | Statement::Return { line, .. }
            | Statement::Copy { line, .. }
            | Statement::Animate { line, .. }
            | Statement::CursorMethod { line, .. }
            | Statement::Expression { line, .. }
            | Statement::Empty { line } => *line,
            Statement::Block(block) => block.line,
        }
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            Statement::VarDeclaration { .. } => "var_declaration",
            Statement::CursorDeclaration { .. } => "cursor_declaration",
            Statement::FunctionDeclaration { .. } => "function_declaration",
            Statement::If { .. } => "if_statement",
            Statement::For { .. } => "for_statement",
            Statement::While { .. } => "while_statement",
            Statement::DoWhile { .. } => "do_while_statement",
            Statement::Return { .. } => "return_statement",
            Statement::Copy { .. } => "copy_statement",
            Statement::Animate { .. } => "animate_statement",
            Statement::CursorMethod { .. } => "cursor_method",
            Statement::Block(_) => "block",
            Statement::Expression { .. } => "expression_statement",
            Statement::Empty { .. } => "empty_statement",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// drawCircle(1, 2, 3), cos(a)
    Call {
        callee: String,
        arguments: Vec<Expression>,
    },
    /// a + b, x = 5
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// -x, !done
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Identifier(String),
    Number(Number),
    Str(String),
    Bool(bool),
}

impl Expression {
    /// Integer value of a numeric literal, optionally signed. Fractions are truncated.
    pub fn constant_value(&self) -> Option<i64> {
        match self {
            Expression::Number(Number::Int(n)) => Some(*n),
            Expression::Number(Number::Float(x)) => Some(*x as i64),
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                operand,
            } => operand.constant_value().map(i64::saturating_neg),
            Expression::UnaryOp {
                op: UnaryOperator::Plus,
                operand,
            } => operand.constant_value(),
            _ => None,
        }
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            Expression::Call { .. } => "call_expr",
            Expression::BinaryOp { .. } => "binary_op",
            Expression::UnaryOp { .. } => "unary_op",
            Expression::Identifier(_) => "identifier",
            Expression::Number(_) => "number",
            Expression::Str(_) => "string",
            Expression::Bool(_) => "bool_literal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Assign,   // =
    Or,       // ||
    And,      // &&
    Equal,    // ==
    NotEqual, // !=
    Less,     // <
    LessEq,   // <=
    Greater,  // >
    GreaterEq, // >=
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "=" => Self::Assign,
            "||" => Self::Or,
            "&&" => Self::And,
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::Less,
            "<=" => Self::LessEq,
            ">" => Self::Greater,
            ">=" => Self::GreaterEq,
            "+" => Self::Add,
            "-" => Self::Subtract,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            "%" => Self::Modulo,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Or => "||",
            Self::And => "&&",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,   // !
    Plus,  // +
    Minus, // -
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}
