pub mod scope;

use crate::builtins;
use crate::error::SemanticError;
use crate::ir::ast::{self, BinaryOperator, Block, Expression, Statement};
use scope::{SymbolKind, SymbolTable};

/// Walks the program once, pre-order, and collects every semantic problem.
/// Never fails: an empty list means the program may go to code generation.
pub fn analyze(program: &ast::Program) -> Vec<SemanticError> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.analyze_statements(&program.statements);
    analyzer.errors
}

struct SemanticAnalyzer {
    symbols: SymbolTable,
    errors: Vec<SemanticError>,
}

impl SemanticAnalyzer {
    fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            errors: Vec::new(),
        }
    }

    fn analyze_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.analyze_statement(statement);
        }
    }

    fn analyze_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VarDeclaration {
                name,
                initializer,
                line,
                ..
            } => {
                // The initializer cannot see the name it initializes.
                self.analyze_expression(initializer, *line);
                self.declare(name, SymbolKind::Number, *line);
            }
            Statement::CursorDeclaration {
                name,
                arguments,
                line,
            } => {
                self.analyze_expressions(arguments, *line);
                if arguments.len() != builtins::CURSOR_CONSTRUCTOR_ARITY {
                    self.errors.push(SemanticError::CursorConstructorArity {
                        line: *line,
                        expected: builtins::CURSOR_CONSTRUCTOR_ARITY,
                        found: arguments.len(),
                    });
                }
                self.declare(name, SymbolKind::Cursor, *line);
            }
            Statement::FunctionDeclaration {
                name,
                params,
                body,
                line,
            } => {
                self.declare(name, SymbolKind::Function, *line);
                self.symbols.enter_scope();
                for param in params {
                    self.declare(param, SymbolKind::Number, *line);
                }
                self.analyze_statements(&body.statements);
                self.symbols.exit_scope();
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                line,
            } => {
                self.analyze_expression(condition, *line);
                self.analyze_block(then_block);
                if let Some(else_block) = else_block {
                    self.analyze_block(else_block);
                }
            }
            Statement::For {
                init,
                condition,
                increment,
                body,
                line,
            } => {
                self.symbols.enter_scope();
                if let Some(init) = init {
                    self.analyze_statement(init);
                }
                if let Some(condition) = condition {
                    self.analyze_expression(condition, *line);
                }
                if let Some(increment) = increment {
                    self.analyze_expression(increment, *line);
                }
                self.analyze_block(body);
                self.symbols.exit_scope();
            }
            Statement::While {
                condition,
                body,
                line,
            } => {
                self.analyze_expression(condition, *line);
                self.analyze_block(body);
            }
            Statement::DoWhile {
                body,
                condition,
                line,
            } => {
                self.analyze_block(body);
                self.analyze_expression(condition, *line);
            }
            Statement::Return { value, line } => {
                if let Some(value) = value {
                    self.analyze_expression(value, *line);
                }
            }
            Statement::Copy {
                source,
                destination,
                line,
            } => {
                self.analyze_expressions(source, *line);
                self.analyze_expressions(destination, *line);
            }
            Statement::Animate {
                first,
                second,
                body,
                line,
            } => {
                self.analyze_expression(first, *line);
                self.analyze_expression(second, *line);
                self.analyze_block(body);
            }
            Statement::CursorMethod {
                cursor,
                method,
                arguments,
                line,
            } => {
                self.analyze_expressions(arguments, *line);
                self.check_cursor_method(cursor, method, arguments, *line);
            }
            Statement::Block(block) => self.analyze_block(block),
            Statement::Expression { expression, line } => {
                self.analyze_expression(expression, *line);
            }
            Statement::Empty { .. } => {}
        }
    }

    fn analyze_block(&mut self, block: &Block) {
        self.symbols.enter_scope();
        self.analyze_statements(&block.statements);
        self.symbols.exit_scope();
    }

    fn analyze_expressions(&mut self, expressions: &[Expression], line: usize) {
        for expression in expressions {
            self.analyze_expression(expression, line);
        }
    }

    /// `line` is the line of the enclosing statement.
    fn analyze_expression(&mut self, expression: &Expression, line: usize) {
        match expression {
            Expression::Call { callee, arguments } => {
                if let Some(function) = builtins::draw_function(callee) {
                    if arguments.len() != function.arity {
                        self.errors.push(SemanticError::FunctionArity {
                            line,
                            function: callee.clone(),
                            expected: function.arity,
                            found: arguments.len(),
                        });
                    }
                    if function.action.needs_constant_arguments() {
                        self.check_constant_arguments(callee, arguments, line);
                    }
                }
                self.analyze_expressions(arguments, line);
            }
            Expression::BinaryOp { op, left, right } => {
                if *op == BinaryOperator::Assign {
                    if let Expression::Identifier(name) = left.as_ref() {
                        if builtins::builtin_constant(name).is_some() {
                            self.errors.push(SemanticError::ReadOnlyAssignment {
                                line,
                                name: name.clone(),
                            });
                        }
                    }
                }
                self.analyze_expression(left, line);
                self.analyze_expression(right, line);
            }
            Expression::UnaryOp { operand, .. } => self.analyze_expression(operand, line),
            Expression::Identifier(name) => {
                if builtins::builtin_constant(name).is_none() && self.symbols.lookup(name).is_none() {
                    self.errors.push(SemanticError::Undeclared {
                        line,
                        name: name.clone(),
                    });
                }
            }
            Expression::Number(_) | Expression::Str(_) | Expression::Bool(_) => {}
        }
    }

    fn check_cursor_method(&mut self, cursor: &str, method: &str, arguments: &[Expression], line: usize) {
        match self.symbols.lookup(cursor) {
            Some(SymbolKind::Cursor) => {}
            Some(_) => {
                self.errors.push(SemanticError::NotACursor {
                    line,
                    name: cursor.to_string(),
                });
                return;
            }
            None => {
                self.errors.push(SemanticError::Undeclared {
                    line,
                    name: cursor.to_string(),
                });
                return;
            }
        }

        let Some(spec) = builtins::cursor_method(method) else {
            self.errors.push(SemanticError::UnknownCursorMethod {
                line,
                method: method.to_string(),
            });
            return;
        };

        if arguments.len() != spec.arity {
            self.errors.push(SemanticError::CursorMethodArity {
                line,
                method: method.to_string(),
                expected: spec.arity,
                found: arguments.len(),
            });
        }
        if spec.action.needs_constant_arguments() {
            self.check_constant_arguments(method, arguments, line);
        }
    }

    /// One error per call, however many arguments are not literals.
    fn check_constant_arguments(&mut self, function: &str, arguments: &[Expression], line: usize) {
        if arguments.iter().any(|a| a.constant_value().is_none()) {
            self.errors.push(SemanticError::NonConstantArgument {
                line,
                function: function.to_string(),
            });
        }
    }

    fn declare(&mut self, name: &str, kind: SymbolKind, line: usize) {
        let taken = builtins::builtin_constant(name).is_some() || self.symbols.declare(name, kind).is_err();
        if taken {
            self.errors.push(SemanticError::AlreadyDeclared {
                line,
                name: name.to_string(),
                kind: kind.noun().to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn errors_for(source: &str) -> Vec<SemanticError> {
        let program = parser::parse(source).expect("source should parse");
        analyze(&program)
    }

    #[test]
    fn redeclaration_names_the_variable_and_line() {
        let errors = errors_for("var x = 1;\nvar x = 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            SemanticError::AlreadyDeclared {
                line: 2,
                name: "x".to_string(),
                kind: "variable".to_string(),
            }
        );
        assert_eq!(errors[0].to_string(), "Line 2: variable 'x' is already declared");
    }

    #[test]
    fn draw_function_arity_is_checked() {
        let errors = errors_for("drawCircle(1, 2);");
        assert_eq!(
            errors,
            vec![SemanticError::FunctionArity {
                line: 1,
                function: "drawCircle".to_string(),
                expected: 3,
                found: 2,
            }]
        );
    }

    #[test]
    fn unknown_callees_are_not_arity_checked() {
        assert!(errors_for("var a = cos(1, 2, 3); myShape();").is_empty());
    }

    #[test]
    fn undeclared_identifiers() {
        let errors = errors_for("var a = 1;\nb = a + c;");
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, SemanticError::Undeclared { line: 2, .. })));
        assert!(errors[1].to_string().contains("'c'"));
    }

    #[test]
    fn initializer_cannot_reference_itself() {
        let errors = errors_for("var x = x + 1;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SemanticError::Undeclared { name, .. } if name == "x"));
    }

    #[test]
    fn builtin_constants_are_readable_but_not_writable() {
        assert!(errors_for("var w = CANVAS_WIDTH / 2 + CANVAS_HEIGHT;").is_empty());

        let errors = errors_for("CANVAS_WIDTH = 3;\nvar CANVAS_HEIGHT = 1;");
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], SemanticError::ReadOnlyAssignment { line: 1, .. }));
        assert!(matches!(errors[1], SemanticError::AlreadyDeclared { line: 2, .. }));
    }

    #[test]
    fn cursor_method_rules() {
        let source = "var n = 1;\n\
                      n.move(1, 2);\n\
                      ghost.move(1, 2);\n\
                      Cursor p = Cursor(1, 2);\n\
                      p.fly();\n\
                      p.move(1);\n\
                      p.drawCircle(5);";
        let errors = errors_for(source);
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], SemanticError::NotACursor { line: 2, .. }));
        assert!(matches!(errors[1], SemanticError::Undeclared { line: 3, .. }));
        assert!(matches!(errors[2], SemanticError::UnknownCursorMethod { line: 5, .. }));
        assert!(matches!(
            errors[3],
            SemanticError::CursorMethodArity { line: 6, expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn context_setters_take_literal_arguments() {
        assert!(errors_for("setRGBA(300, -10, +0, 2.5);\nsetThickness(-3);").is_empty());

        let source = "var red = 255;\n\
                      setRGBA(red, 0, 0, 255);\n\
                      for (var i = 1; i < 3; i = i + 1) { setThickness(i); }\n\
                      Cursor p = Cursor(0, 0);\n\
                      p.setRGBA(0, red + 1, 0, 0);\n\
                      p.setThickness(red);";
        let errors = errors_for(source);
        assert_eq!(
            errors,
            vec![
                SemanticError::NonConstantArgument {
                    line: 2,
                    function: "setRGBA".to_string(),
                },
                SemanticError::NonConstantArgument {
                    line: 3,
                    function: "setThickness".to_string(),
                },
                SemanticError::NonConstantArgument {
                    line: 5,
                    function: "setRGBA".to_string(),
                },
            ]
        );
        assert_eq!(errors[0].to_string(), "Line 2: arguments of 'setRGBA' must be numeric constants");
    }

    #[test]
    fn cursor_constructor_takes_two_arguments() {
        let errors = errors_for("Cursor p = Cursor(1);");
        assert_eq!(
            errors,
            vec![SemanticError::CursorConstructorArity {
                line: 1,
                expected: 2,
                found: 1,
            }]
        );
    }

    #[test]
    fn blocks_open_scopes() {
        assert!(errors_for("var a = 1; { var a = 2; a = 3; }").is_empty());
        assert!(errors_for("for (var i = 0; i < 3; i = i + 1) { } var i = 5;").is_empty());

        let errors = errors_for("if (true) { var inner = 1; }\ninner = 2;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SemanticError::Undeclared { line: 2, .. }));
    }

    #[test]
    fn functions_and_parameters() {
        assert!(errors_for("function f(a, b) { return a + b; } f(1, 2);").is_empty());

        let errors = errors_for("function f(a) { var a = 1; }\nfunction f() { }");
        assert_eq!(errors.len(), 2);
        assert!(errors[1].to_string().contains("function 'f' is already declared"));
    }

    #[test]
    fn nested_constructs_are_visited() {
        let source = "while (x) { do { y = 1; } while (z); }\n\
                      animate(q, 1) { drawPoint(1); }\n\
                      copy(a, 0, 0, 0) to (0, b);";
        let errors = errors_for(source);
        let names: Vec<String> = errors
            .iter()
            .filter_map(|e| match e {
                SemanticError::Undeclared { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["x", "y", "z", "q", "a", "b"]);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::FunctionArity { function, .. } if function == "drawPoint")));
    }
}
