use crate::error::ParseError;
use crate::ir::ast::{self, BinaryOperator, Block, Expression, Statement, UnaryOperator};
use super::lexer::{Literal, Token, TokenKind};

/// Upper bound on statement attempts, relative to the token count.
const MAX_STEPS_PER_TOKEN: usize = 8;

/// Blocks and sub-expressions deeper than this are rejected instead of
/// recursing further.
const MAX_NESTING_DEPTH: usize = 100;

const COPY_SOURCE_ARITY: usize = 4;
const COPY_DESTINATION_ARITY: usize = 2;

/// Keywords that can only start a statement; recovery stops in front of them.
const STATEMENT_KEYWORDS: &[&str] = &[
    "var", "Cursor", "function", "if", "for", "while", "do", "return", "copy", "animate",
];

type ParseResult<T> = Result<T, ParseError>;

/// Always returns a program, possibly partial, together with every syntax error found.
pub fn parse_tokens(tokens: Vec<Token>) -> (ast::Program, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.errors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    Block,
    If,
    For,
    While,
    DoWhile,
    Function,
    Animate,
}

impl Construct {
    fn describe(self) -> &'static str {
        match self {
            Construct::Block => "block",
            Construct::If => "if statement",
            Construct::For => "for loop",
            Construct::While => "while loop",
            Construct::DoWhile => "do-while loop",
            Construct::Function => "function",
            Construct::Animate => "animate block",
        }
    }
}

#[derive(Debug)]
struct Context {
    construct: Construct,
    start_line: usize,
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<ParseError>,
    contexts: Vec<Context>,
    steps: usize,
    max_steps: usize,
    depth: usize,
    /// Set once an unclosed construct has been reported; parsing unwinds and stops.
    halted: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let max_steps = (tokens.len() + 1) * MAX_STEPS_PER_TOKEN;
        Self {
            tokens,
            position: 0,
            errors: Vec::new(),
            contexts: Vec::new(),
            steps: 0,
            max_steps,
            depth: 0,
            halted: false,
        }
    }

    fn parse_program(&mut self) -> ast::Program {
        let mut statements = Vec::new();

        while !self.is_at_end() && !self.halted {
            if self.tick() {
                let error = self.unclosed_construct();
                self.errors.push(error);
                break;
            }

            let start = self.position;
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.errors.push(error);
                    if !self.halted {
                        self.synchronize(start);
                    }
                }
            }
        }

        ast::Program { statements }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let Some(token) = self.peek() else {
            return Err(ParseError::new(
                self.last_line(),
                "Expected a statement, but reached end of input",
            ));
        };
        let line = token.line;

        if token.kind == TokenKind::Keyword {
            let keyword = token.to_string();
            return match keyword.as_str() {
                "var" => self.parse_var_declaration(true),
                "Cursor" => self.parse_cursor_declaration(),
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => self.parse_while(),
                "do" => self.parse_do_while(),
                "function" => self.parse_function(),
                "return" => self.parse_return(),
                "copy" => self.parse_copy(),
                "animate" => self.parse_animate(),
                _ => Err(ParseError::new(
                    line,
                    format!("Unexpected keyword '{}'", keyword),
                )),
            };
        }

        if self.check(TokenKind::Delimiter, ";") {
            self.advance();
            return Ok(Statement::Empty { line });
        }
        if self.check(TokenKind::Delimiter, "{") {
            let block = self.within(Construct::Block, line, |p| p.parse_block())?;
            return Ok(Statement::Block(block));
        }
        if self.is_cursor_method_call() {
            return self.parse_cursor_method();
        }

        self.parse_expression_statement()
    }

    fn parse_var_declaration(&mut self, require_semicolon: bool) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "var")?;
        let name = self.expect_identifier("after 'var'")?;

        let mut var_type = None;
        if self.check(TokenKind::Delimiter, ":") {
            self.advance(); // consume ':'
            var_type = Some(self.expect_identifier("as type annotation")?);
        }

        if !self.check(TokenKind::Assign, "=") {
            return Err(ParseError::new(
                self.current_line(),
                format!("Expected '=' in declaration of '{}'", name),
            ));
        }
        self.advance(); // consume '='

        let initializer = self.parse_expression()?;
        if require_semicolon {
            self.expect_semicolon(&format!("declaration of '{}'", name))?;
        }

        let var_type = var_type.or_else(|| infer_literal_type(&initializer));
        Ok(Statement::VarDeclaration {
            name,
            var_type,
            initializer,
            line,
        })
    }

    fn parse_cursor_declaration(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "Cursor")?;
        let name = self.expect_identifier("after 'Cursor'")?;
        self.expect(TokenKind::Assign, "=")?;
        self.expect(TokenKind::Keyword, "Cursor")?;
        let arguments = self.parse_arguments()?;
        self.expect_semicolon(&format!("declaration of cursor '{}'", name))?;

        Ok(Statement::CursorDeclaration {
            name,
            arguments,
            line,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "if")?;
        self.within(Construct::If, line, |p| {
            let condition = p.parse_condition()?;
            let then_block = p.parse_block()?;

            let else_block = if p.check(TokenKind::Keyword, "else") {
                let else_line = p.current_line();
                p.advance(); // consume 'else'
                if p.check(TokenKind::Keyword, "if") {
                    let nested = p.parse_if()?;
                    Some(Block {
                        statements: vec![nested],
                        line: else_line,
                    })
                } else {
                    Some(p.parse_block()?)
                }
            } else {
                None
            };

            Ok(Statement::If {
                condition,
                then_block,
                else_block,
                line,
            })
        })
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "for")?;
        self.within(Construct::For, line, |p| {
            p.expect(TokenKind::Delimiter, "(")?;

            let init = if p.check(TokenKind::Delimiter, ";") {
                None
            } else if p.check(TokenKind::Keyword, "var") {
                Some(Box::new(p.parse_var_declaration(false)?))
            } else {
                let init_line = p.current_line();
                let expression = p.parse_expression()?;
                Some(Box::new(Statement::Expression {
                    expression,
                    line: init_line,
                }))
            };
            p.expect(TokenKind::Delimiter, ";")?;

            let condition = if p.check(TokenKind::Delimiter, ";") {
                None
            } else {
                Some(p.parse_expression()?)
            };
            p.expect(TokenKind::Delimiter, ";")?;

            let increment = if p.check(TokenKind::Delimiter, ")") {
                None
            } else {
                Some(p.parse_expression()?)
            };
            p.expect(TokenKind::Delimiter, ")")?;

            let body = p.parse_block()?;
            Ok(Statement::For {
                init,
                condition,
                increment,
                body,
                line,
            })
        })
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "while")?;
        self.within(Construct::While, line, |p| {
            let condition = p.parse_condition()?;
            let body = p.parse_block()?;
            Ok(Statement::While {
                condition,
                body,
                line,
            })
        })
    }

    fn parse_do_while(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "do")?;
        self.within(Construct::DoWhile, line, |p| {
            let body = p.parse_block()?;
            p.expect(TokenKind::Keyword, "while")?;
            let condition = p.parse_condition()?;
            p.expect_semicolon("do-while condition")?;
            Ok(Statement::DoWhile {
                body,
                condition,
                line,
            })
        })
    }

    fn parse_function(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "function")?;
        self.within(Construct::Function, line, |p| {
            let name = p.expect_identifier("after 'function'")?;
            p.expect(TokenKind::Delimiter, "(")?;

            let mut params = Vec::new();
            if !p.check(TokenKind::Delimiter, ")") {
                loop {
                    params.push(p.expect_identifier("as parameter name")?);
                    if !p.check(TokenKind::Delimiter, ",") {
                        break;
                    }
                    p.advance(); // consume ','
                }
            }
            p.expect(TokenKind::Delimiter, ")")?;

            let body = p.parse_block()?;
            Ok(Statement::FunctionDeclaration {
                name,
                params,
                body,
                line,
            })
        })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "return")?;
        let value = if self.check(TokenKind::Delimiter, ";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon("return statement")?;
        Ok(Statement::Return { value, line })
    }

    fn parse_copy(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "copy")?;
        let source = self.parse_arguments()?;
        if source.len() != COPY_SOURCE_ARITY {
            return Err(ParseError::new(
                line,
                format!(
                    "copy expects {} source arguments, found {}",
                    COPY_SOURCE_ARITY,
                    source.len()
                ),
            ));
        }

        self.expect(TokenKind::Keyword, "to")?;
        let destination = self.parse_arguments()?;
        if destination.len() != COPY_DESTINATION_ARITY {
            return Err(ParseError::new(
                line,
                format!(
                    "copy expects {} destination arguments, found {}",
                    COPY_DESTINATION_ARITY,
                    destination.len()
                ),
            ));
        }
        self.expect_semicolon("copy statement")?;

        Ok(Statement::Copy {
            source,
            destination,
            line,
        })
    }

    fn parse_animate(&mut self) -> ParseResult<Statement> {
        let line = self.expect(TokenKind::Keyword, "animate")?;
        self.within(Construct::Animate, line, |p| {
            p.expect(TokenKind::Delimiter, "(")?;
            let first = p.parse_expression()?;
            p.expect(TokenKind::Delimiter, ",")?;
            let second = p.parse_expression()?;
            p.expect(TokenKind::Delimiter, ")")?;
            let body = p.parse_block()?;
            Ok(Statement::Animate {
                first,
                second,
                body,
                line,
            })
        })
    }

    /// identifier '.' identifier '(' ... ')' ';'
    fn parse_cursor_method(&mut self) -> ParseResult<Statement> {
        let line = self.current_line();
        let cursor = self.expect_identifier("as cursor name")?;
        self.expect(TokenKind::AccessOperator, ".")?;
        let method = self.expect_identifier("as method name")?;
        let arguments = self.parse_arguments()?;
        self.expect_semicolon(&format!("call to '{}.{}'", cursor, method))?;

        Ok(Statement::CursorMethod {
            cursor,
            method,
            arguments,
            line,
        })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let line = self.current_line();
        let expression = self.parse_expression()?;
        self.expect_semicolon("expression")?;
        Ok(Statement::Expression { expression, line })
    }

    fn parse_condition(&mut self) -> ParseResult<Expression> {
        self.expect(TokenKind::Delimiter, "(")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Delimiter, ")")?;
        Ok(condition)
    }

    /// Parses `{ ... }`, recovering from bad statements inside it. Reaching the end
    /// of input first reports the innermost open construct.
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.nested("Block", Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> ParseResult<Block> {
        let line = self.expect(TokenKind::Delimiter, "{")?;
        let mut statements = Vec::new();

        loop {
            if self.check(TokenKind::Delimiter, "}") {
                self.advance(); // consume '}'
                break;
            }
            if self.is_at_end() || self.tick() {
                return Err(self.unclosed_construct());
            }

            let start = self.position;
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) if self.halted => return Err(error),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize(start);
                }
            }
        }

        Ok(Block { statements, line })
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect(TokenKind::Delimiter, "(")?;
        let mut arguments = Vec::new();

        if !self.check(TokenKind::Delimiter, ")") {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.check(TokenKind::Delimiter, ",") {
                    break;
                }
                self.advance(); // consume ','
            }
        }

        self.expect(TokenKind::Delimiter, ")")?;
        Ok(arguments)
    }

    // Expressions, lowest binding first.

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let target = self.parse_logical_or()?;

        if self.check(TokenKind::Assign, "=") {
            let line = self.current_line();
            self.advance(); // consume '='
            let value = self.parse_assignment()?;
            return match target {
                Expression::Identifier(_) => Ok(Expression::BinaryOp {
                    op: BinaryOperator::Assign,
                    left: Box::new(target),
                    right: Box::new(value),
                }),
                other => Err(ParseError::new(
                    line,
                    format!("Invalid assignment target: {}", other.node_type()),
                )),
            };
        }

        Ok(target)
    }

    fn parse_logical_or(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&["||"], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&["&&"], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&["==", "!="], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&["<", "<=", ">", ">="], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(&["*", "/", "%"], Self::parse_unary)
    }

    /// Left-associative fold of one precedence level.
    fn parse_binary_level(
        &mut self,
        operators: &[&str],
        next: fn(&mut Self) -> ParseResult<Expression>,
    ) -> ParseResult<Expression> {
        let mut left = next(self)?;

        while let Some(op) = self.match_operator(operators) {
            let right = next(self)?;
            left = Expression::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn match_operator(&mut self, operators: &[&str]) -> Option<BinaryOperator> {
        let token = self.peek()?;
        if token.kind != TokenKind::Operator {
            return None;
        }
        let symbol = token.text()?;
        if !operators.contains(&symbol) {
            return None;
        }
        let op = BinaryOperator::from_symbol(symbol)?;
        self.advance();
        Some(op)
    }

    /// Every nested sub-expression passes through here, so this is where depth is counted.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        self.nested("Expression", Self::parse_prefix)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        let op = match self.peek() {
            Some(token) if token.kind == TokenKind::Operator => match token.text() {
                Some("!") => Some(UnaryOperator::Not),
                Some("+") => Some(UnaryOperator::Plus),
                Some("-") => Some(UnaryOperator::Minus),
                _ => None,
            },
            _ => None,
        };

        if let Some(op) = op {
            self.advance(); // consume operator
            let operand = self.parse_unary()?;
            return Ok(Expression::UnaryOp {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::new(
                self.last_line(),
                "Expected an expression, but reached end of input",
            ));
        };

        match (token.kind, token.value) {
            (TokenKind::Number, Literal::Number(n)) => {
                self.advance();
                Ok(Expression::Number(n))
            }
            (TokenKind::String, Literal::Str(s)) => {
                self.advance();
                Ok(Expression::Str(s))
            }
            (TokenKind::Boolean, Literal::Bool(b)) => {
                self.advance();
                Ok(Expression::Bool(b))
            }
            (TokenKind::Delimiter, Literal::Lexeme(ref s)) if s == "(" => {
                self.advance(); // consume '('
                let expression = self.parse_expression()?;
                self.expect(TokenKind::Delimiter, ")")?;
                Ok(expression)
            }
            (TokenKind::Identifier, Literal::Lexeme(name)) => {
                self.advance();
                if self.check(TokenKind::Delimiter, "(") {
                    let arguments = self.parse_arguments()?;
                    Ok(Expression::Call {
                        callee: name,
                        arguments,
                    })
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            (_, value) => {
                let found = Token {
                    kind: token.kind,
                    value,
                    line: token.line,
                };
                Err(ParseError::new(
                    token.line,
                    format!("Expected an expression, found '{}'", found),
                ))
            }
        }
    }

    // Recovery

    /// Skips past the next ';', or up to a '}' or a statement keyword. Always moves
    /// at least one token past `start` so a bad statement cannot stall the parser.
    fn synchronize(&mut self, start: usize) {
        while let Some(token) = self.peek() {
            if token.is(TokenKind::Delimiter, ";") {
                self.advance();
                break;
            }
            if token.is(TokenKind::Delimiter, "}") {
                break;
            }
            if self.position > start
                && token.kind == TokenKind::Keyword
                && STATEMENT_KEYWORDS.iter().any(|k| token.is(TokenKind::Keyword, k))
            {
                break;
            }
            self.advance();
        }

        if self.position == start {
            self.advance();
        }
    }

    fn within<T>(
        &mut self,
        construct: Construct,
        start_line: usize,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.contexts.push(Context {
            construct,
            start_line,
        });
        let result = parse(self);
        self.contexts.pop();
        result
    }

    fn nested<T>(
        &mut self,
        what: &str,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                self.current_line(),
                format!("{} nested too deeply", what),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Safety net only: every statement attempt consumes at least one token, so
    /// the bound is not reached by any input under the default limit.
    fn tick(&mut self) -> bool {
        self.steps += 1;
        self.steps > self.max_steps
    }

    fn unclosed_construct(&mut self) -> ParseError {
        self.halted = true;
        match self.contexts.last() {
            Some(context) => ParseError::new(
                context.start_line,
                format!(
                    "{} starting at line {} is not properly closed",
                    context.construct.describe(),
                    context.start_line
                ),
            ),
            None => ParseError::new(self.current_line(), "Parser iteration limit reached"),
        }
    }

    // Token helpers

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn lookahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(kind, text))
    }

    /// Consumes the expected token and returns its line.
    fn expect(&mut self, kind: TokenKind, text: &str) -> ParseResult<usize> {
        match self.peek() {
            Some(token) if token.is(kind, text) => {
                let line = token.line;
                self.advance();
                Ok(line)
            }
            Some(token) => Err(ParseError::new(
                token.line,
                format!("Expected '{}', found '{}'", text, token),
            )),
            None => Err(ParseError::new(
                self.last_line(),
                format!("Expected '{}', but reached end of input", text),
            )),
        }
    }

    fn expect_identifier(&mut self, context: &str) -> ParseResult<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let name = token.to_string();
                self.advance();
                Ok(name)
            }
            Some(token) => Err(ParseError::new(
                token.line,
                format!("Expected identifier {}, found '{}'", context, token),
            )),
            None => Err(ParseError::new(
                self.last_line(),
                format!("Expected identifier {}, but reached end of input", context),
            )),
        }
    }

    /// A missing ';' is reported on the line of the token it should follow.
    fn expect_semicolon(&mut self, after: &str) -> ParseResult<()> {
        if self.check(TokenKind::Delimiter, ";") {
            self.advance();
            return Ok(());
        }
        Err(ParseError::new(
            self.previous_line(),
            format!("Missing ';' after {}", after),
        ))
    }

    fn is_cursor_method_call(&self) -> bool {
        match (self.peek(), self.lookahead(1), self.lookahead(2), self.lookahead(3)) {
            (Some(receiver), Some(dot), Some(method), Some(paren)) => {
                receiver.kind == TokenKind::Identifier
                    && dot.kind == TokenKind::AccessOperator
                    && method.kind == TokenKind::Identifier
                    && paren.is(TokenKind::Delimiter, "(")
            }
            _ => false,
        }
    }

    fn current_line(&self) -> usize {
        self.peek().map_or_else(|| self.last_line(), |t| t.line)
    }

    fn previous_line(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(1, |t| t.line)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }
}

/// Type implied by a literal initializer; anything else is left to the backend.
fn infer_literal_type(initializer: &Expression) -> Option<String> {
    match initializer {
        Expression::Number(n) if n.is_integral() => Some("int".to_string()),
        Expression::Number(_) => Some("float".to_string()),
        Expression::Bool(_) => Some("bool".to_string()),
        _ => None,
    }
}
