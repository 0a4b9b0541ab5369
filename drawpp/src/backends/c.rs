use crate::builtins::{self, CursorAction, DrawAction};
use crate::error::CodegenError;
use crate::ir::ast::{self, BinaryOperator, Block, Expression, Statement, UnaryOperator};

use super::{Backend, GeneratedCode, Surface};

const TARGET: &str = "C";
const INDENT: &str = "    ";
const OUTPUT_PATTERN: &str = "Data/Outputs/drawing_%d.bmp";
const DEFAULT_THICKNESS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: i64,
    pub g: i64,
    pub b: i64,
    pub a: i64,
}

impl Default for Rgba {
    fn default() -> Self {
        Self { r: 0, g: 0, b: 0, a: 255 }
    }
}

/// Folds a colour component into 0..=255: values above 255 wrap back below
/// it, negatives are mirrored, anything still too large saturates.
pub fn normalize_channel(value: i64) -> i64 {
    let value = if value > 255 { 255 - value } else { value };
    let value = if value < 0 { value.saturating_neg() } else { value };
    value.min(255)
}

pub struct CBackend {
    surface: Surface,
    color: Rgba,
    thickness: i64,
    indent: usize,
    output: String,
}

impl Backend for CBackend {
    fn generate(&mut self, program: &ast::Program) -> Result<GeneratedCode, CodegenError> {
        self.generate_program(program)
    }
}

impl CBackend {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            color: Rgba::default(),
            thickness: DEFAULT_THICKNESS,
            indent: 1,
            output: String::new(),
        }
    }

    pub fn generate_program(&mut self, program: &ast::Program) -> Result<GeneratedCode, CodegenError> {
        self.color = Rgba::default();
        self.thickness = DEFAULT_THICKNESS;
        self.indent = 1;
        self.output.clear();

        // Top-level variables go to the declarations section, everything else keeps its order.
        let (declarations, operations): (Vec<&Statement>, Vec<&Statement>) = program
            .statements
            .iter()
            .partition(|s| matches!(s, Statement::VarDeclaration { .. }));

        for statement in declarations {
            self.compile_statement(statement)?;
        }
        let declarations = std::mem::take(&mut self.output);

        for statement in operations {
            self.compile_statement(statement)?;
        }
        let operations = std::mem::take(&mut self.output);

        Ok(GeneratedCode {
            declarations,
            operations,
            header: self.header(),
        })
    }

    fn header(&self) -> String {
        format!(
            "#define SCREEN_WIDTH {}\n#define SCREEN_HEIGHT {}\n",
            self.surface.width, self.surface.height
        )
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::VarDeclaration {
                name,
                var_type,
                initializer,
                line,
            } => {
                let declaration = declaration(name, var_type.as_deref(), initializer, *line)?;
                self.emit_line(&format!("{};", declaration));
            }
            Statement::CursorDeclaration {
                name,
                arguments,
                line,
            } => {
                let arguments = argument_list(arguments, *line)?;
                self.emit_line(&format!(
                    "Cursor* {} = {}({});",
                    name,
                    builtins::CURSOR_CONSTRUCTOR,
                    arguments.join(", ")
                ));
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                line,
            } => {
                self.emit_line(&format!("if ({})", render_bare(condition, *line)?));
                self.compile_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.emit_line("else");
                    self.compile_block(else_block)?;
                }
            }
            Statement::For {
                init,
                condition,
                increment,
                body,
                line,
            } => {
                let init = match init.as_deref() {
                    None => String::new(),
                    Some(Statement::VarDeclaration {
                        name,
                        var_type,
                        initializer,
                        line,
                    }) => declaration(name, var_type.as_deref(), initializer, *line)?,
                    Some(Statement::Expression { expression, line }) => {
                        render_bare(expression, *line)?
                    }
                    Some(other) => return Err(unsupported(other)),
                };
                let condition = optional_expression(condition.as_ref(), *line)?;
                let increment = optional_expression(increment.as_ref(), *line)?;
                self.emit_line(&format!("for ({}; {}; {})", init, condition, increment));
                self.compile_block(body)?;
            }
            Statement::While {
                condition,
                body,
                line,
            } => {
                self.emit_line(&format!("while ({})", render_bare(condition, *line)?));
                self.compile_block(body)?;
            }
            Statement::DoWhile {
                body,
                condition,
                line,
            } => {
                self.emit_line("do");
                self.compile_block(body)?;
                self.emit_line(&format!("while ({});", render_bare(condition, *line)?));
            }
            Statement::CursorMethod {
                cursor,
                method,
                arguments,
                line,
            } => {
                self.compile_cursor_method(cursor, method, arguments, *line)?;
            }
            Statement::Block(block) => self.compile_block(block)?,
            Statement::Expression { expression, line } => {
                self.compile_expression_statement(expression, *line)?;
            }
            Statement::Empty { .. } => {}
            Statement::FunctionDeclaration { .. }
            | Statement::Return { .. }
            | Statement::Copy { .. }
            | Statement::Animate { .. } => return Err(unsupported(statement)),
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.emit_line("{");
        self.indent += 1;
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        self.indent -= 1;
        self.emit_line("}");
        Ok(())
    }

    fn compile_expression_statement(&mut self, expression: &Expression, line: usize) -> Result<(), CodegenError> {
        if let Expression::Call { callee, arguments } = expression {
            if let Some(function) = builtins::draw_function(callee) {
                return self.compile_draw_call(function.name, function.action, arguments, line);
            }
        }
        self.emit_line(&format!("{};", render_bare(expression, line)?));
        Ok(())
    }

    fn compile_draw_call(
        &mut self,
        name: &str,
        action: DrawAction,
        arguments: &[Expression],
        line: usize,
    ) -> Result<(), CodegenError> {
        match action {
            DrawAction::SetColor => {
                self.color = constant_color(name, arguments, line)?;
            }
            DrawAction::SetThickness => {
                if let Some(value) = arguments.first() {
                    self.thickness = value.constant_value().ok_or_else(|| CodegenError::NonConstantArgument {
                        call: name.to_string(),
                        line,
                    })?;
                }
            }
            DrawAction::Shape { runtime, thickness } => {
                let mut call_arguments = vec!["renderer".to_string()];
                let shape_arguments = argument_list(arguments, line)?;
                let anchor_x = shape_arguments.first().cloned().unwrap_or_else(|| "0".to_string());
                let anchor_y = shape_arguments.get(1).cloned().unwrap_or_else(|| "0".to_string());
                call_arguments.extend(shape_arguments);
                if thickness {
                    call_arguments.push(self.thickness.to_string());
                }
                let Rgba { r, g, b, a } = self.color;
                call_arguments.extend([r, g, b, a].iter().map(ToString::to_string));
                call_arguments.push("filename".to_string());

                let call = format!("{}({});", runtime, call_arguments.join(", "));
                self.emit_drawing(&call, &anchor_x, &anchor_y);
            }
        }
        Ok(())
    }

    fn compile_cursor_method(
        &mut self,
        cursor: &str,
        method: &str,
        arguments: &[Expression],
        line: usize,
    ) -> Result<(), CodegenError> {
        let Some(spec) = builtins::cursor_method(method) else {
            return Err(CodegenError::Unsupported {
                construct: "unknown cursor method",
                target: TARGET,
                line,
            });
        };

        let mut call_arguments = vec![cursor.to_string()];
        match spec.action {
            CursorAction::SetColor => {
                let Rgba { r, g, b, a } = constant_color(method, arguments, line)?;
                call_arguments.extend([r, g, b, a].iter().map(ToString::to_string));
                self.emit_line(&format!("{}({});", spec.runtime, call_arguments.join(", ")));
            }
            CursorAction::Move | CursorAction::Rotate | CursorAction::SetThickness => {
                call_arguments.extend(argument_list(arguments, line)?);
                self.emit_line(&format!("{}({});", spec.runtime, call_arguments.join(", ")));
            }
            CursorAction::Draw => {
                call_arguments.push("renderer".to_string());
                call_arguments.extend(argument_list(arguments, line)?);
                call_arguments.push("filename".to_string());
                let call = format!("{}({});", spec.runtime, call_arguments.join(", "));
                self.emit_drawing(&call, &format!("{}->x", cursor), &format!("{}->y", cursor));
            }
        }
        Ok(())
    }

    /// Every drawing saves its own numbered image and logs where it was anchored.
    fn emit_drawing(&mut self, call: &str, x: &str, y: &str) {
        self.emit_line(&format!("sprintf(filename, \"{}\", drawing_index);", OUTPUT_PATTERN));
        self.emit_line(call);
        self.emit_line(&format!("fprintf(file, \"%d %d\\n\", (int)({}), (int)({}));", x, y));
        self.emit_line("drawing_index++;");
    }

    fn emit_line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }
}

fn unsupported(statement: &Statement) -> CodegenError {
    CodegenError::Unsupported {
        construct: statement.node_type(),
        target: TARGET,
        line: statement.line(),
    }
}

fn declaration(
    name: &str,
    var_type: Option<&str>,
    initializer: &Expression,
    line: usize,
) -> Result<String, CodegenError> {
    let c_type = match var_type {
        Some(annotated) => c_type(annotated),
        None => infer_c_type(initializer),
    };
    Ok(format!("{} {} = {}", c_type, name, render_bare(initializer, line)?))
}

fn c_type(annotated: &str) -> &str {
    match annotated {
        "string" => "char*",
        "number" => "float",
        other => other,
    }
}

fn infer_c_type(expression: &Expression) -> &'static str {
    match expression {
        Expression::Number(n) if n.is_integral() => "int",
        Expression::Number(_) => "float",
        Expression::Bool(_) => "bool",
        Expression::Str(_) => "char*",
        Expression::BinaryOp {
            op: BinaryOperator::Assign,
            right,
            ..
        } => infer_c_type(right),
        Expression::BinaryOp { op, .. } if op.is_arithmetic() => "float",
        Expression::BinaryOp { .. } => "bool",
        Expression::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => "bool",
        Expression::UnaryOp { operand, .. } => infer_c_type(operand),
        Expression::Identifier(_) | Expression::Call { .. } => "float",
    }
}

fn render(expression: &Expression, line: usize) -> Result<String, CodegenError> {
    let text = match expression {
        Expression::Number(n) => n.to_string(),
        Expression::Str(s) => format!("\"{}\"", s),
        Expression::Bool(b) => b.to_string(),
        Expression::Identifier(name) => builtins::builtin_constant(name).unwrap_or(name.as_str()).to_string(),
        Expression::BinaryOp { op, left, right } => format!(
            "({} {} {})",
            render(left, line)?,
            op.symbol(),
            render(right, line)?
        ),
        Expression::UnaryOp { op, operand } => {
            format!("({}{})", op.symbol(), render(operand, line)?)
        }
        Expression::Call { callee, arguments } => {
            if builtins::draw_function(callee).is_some() {
                return Err(CodegenError::DrawInExpression {
                    name: callee.clone(),
                    line,
                });
            }
            format!("{}({})", callee, argument_list(arguments, line)?.join(", "))
        }
    };
    Ok(text)
}

/// Same as `render` without the outermost parentheses of a binary operation.
fn render_bare(expression: &Expression, line: usize) -> Result<String, CodegenError> {
    let text = render(expression, line)?;
    match expression {
        Expression::BinaryOp { .. } => Ok(text[1..text.len() - 1].to_string()),
        _ => Ok(text),
    }
}

fn optional_expression(expression: Option<&Expression>, line: usize) -> Result<String, CodegenError> {
    match expression {
        Some(expression) => render_bare(expression, line),
        None => Ok(String::new()),
    }
}

fn argument_list(arguments: &[Expression], line: usize) -> Result<Vec<String>, CodegenError> {
    arguments.iter().map(|a| render_bare(a, line)).collect()
}

fn constant_color(call: &str, arguments: &[Expression], line: usize) -> Result<Rgba, CodegenError> {
    let mut channels = [0i64; 4];
    for (channel, argument) in channels.iter_mut().zip(arguments) {
        let value = argument.constant_value().ok_or_else(|| CodegenError::NonConstantArgument {
            call: call.to_string(),
            line,
        })?;
        *channel = normalize_channel(value);
    }
    let [r, g, b, a] = channels;
    Ok(Rgba { r, g, b, a })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn generate(source: &str) -> Result<GeneratedCode, CodegenError> {
        let program = parser::parse(source).expect("source should parse");
        CBackend::new(Surface::default()).generate(&program)
    }

    fn generated(source: &str) -> GeneratedCode {
        generate(source).expect("generation should succeed")
    }

    #[test]
    fn channel_normalization() {
        assert_eq!(normalize_channel(300), 45);
        assert_eq!(normalize_channel(-10), 10);
        assert_eq!(normalize_channel(128), 128);
        assert_eq!(normalize_channel(255), 255);
        assert_eq!(normalize_channel(256), 1);
        assert_eq!(normalize_channel(1000), 255);
        assert_eq!(normalize_channel(-400), 255);
    }

    #[test]
    fn declarations_infer_c_types() {
        let code = generated("var x = 5;\nvar y = 5 / 2;\nvar f = 1.5;\nvar ok = 1 < 2;\nvar s = \"hi\";\nvar m = -3;");
        assert_eq!(
            code.declarations,
            "    int x = 5;\n    float y = 5 / 2;\n    float f = 1.5;\n    bool ok = 1 < 2;\n    char* s = \"hi\";\n    int m = (-3);\n"
        );
        assert!(code.operations.is_empty());
    }

    #[test]
    fn top_level_variables_are_hoisted() {
        let code = generated("drawPoint(1, 2);\nvar a = 1;\na = a + 1;");
        assert_eq!(code.declarations, "    int a = 1;\n");
        assert!(!code.operations.contains("int a"));
        assert!(code.operations.ends_with("    a = (a + 1);\n"));
    }

    #[test]
    fn global_drawing_uses_current_color() {
        let code = generated("drawCircle(1, 2, 3);\nsetRGBA(300, -10, 0, 0);\ndrawCircle(4, 5, 6);");
        let expected = "    sprintf(filename, \"Data/Outputs/drawing_%d.bmp\", drawing_index);\n\
                        \x20   drawCircle(renderer, 1, 2, 3, 0, 0, 0, 255, filename);\n\
                        \x20   fprintf(file, \"%d %d\\n\", (int)(1), (int)(2));\n\
                        \x20   drawing_index++;\n\
                        \x20   sprintf(filename, \"Data/Outputs/drawing_%d.bmp\", drawing_index);\n\
                        \x20   drawCircle(renderer, 4, 5, 6, 45, 10, 0, 0, filename);\n\
                        \x20   fprintf(file, \"%d %d\\n\", (int)(4), (int)(5));\n\
                        \x20   drawing_index++;\n";
        assert_eq!(code.operations, expected);
    }

    #[test]
    fn segments_carry_the_current_thickness() {
        let code = generated("drawSegment(0, 0, 10, 10);\nsetThickness(3);\ndrawSegment(0, 0, 5, 5);");
        assert!(code.operations.contains("drawSegment(renderer, 0, 0, 10, 10, 1, 0, 0, 0, 255, filename);"));
        assert!(code.operations.contains("drawSegment(renderer, 0, 0, 5, 5, 3, 0, 0, 0, 255, filename);"));
    }

    #[test]
    fn context_setters_need_constants() {
        let err = generate("var x = 1;\nsetRGBA(x, 0, 0, 0);").unwrap_err();
        assert_eq!(
            err,
            CodegenError::NonConstantArgument {
                call: "setRGBA".to_string(),
                line: 2,
            }
        );

        let err = generate("for (var i = 1; i < 3; i = i + 1) {\n  setThickness(i);\n  drawSegment(0, 0, 9, 9);\n}")
            .unwrap_err();
        assert_eq!(
            err,
            CodegenError::NonConstantArgument {
                call: "setThickness".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn thickness_is_folded_from_signed_literals() {
        let code = generated("setThickness(-2);\ndrawSegment(0, 0, 1, 1);\nsetThickness(+4.5);\ndrawSegment(0, 0, 2, 2);");
        assert!(code.operations.contains("drawSegment(renderer, 0, 0, 1, 1, -2, 0, 0, 0, 255, filename);"));
        assert!(code.operations.contains("drawSegment(renderer, 0, 0, 2, 2, 4, 0, 0, 0, 255, filename);"));
    }

    #[test]
    fn huge_integral_literals_stay_floats() {
        let code = generated("var big = 100000000000000000000;");
        assert_eq!(code.declarations, "    float big = 100000000000000000000.0;\n");
    }

    #[test]
    fn control_flow_lowering() {
        let code = generated("var n = 3;\nfor (var i = 0; i < n; i = i + 1) {\n  drawCircle(i, i, 5);\n}");
        assert_eq!(code.declarations, "    int n = 3;\n");
        let expected = "    for (int i = 0; i < n; i = (i + 1))\n\
                        \x20   {\n\
                        \x20       sprintf(filename, \"Data/Outputs/drawing_%d.bmp\", drawing_index);\n\
                        \x20       drawCircle(renderer, i, i, 5, 0, 0, 0, 255, filename);\n\
                        \x20       fprintf(file, \"%d %d\\n\", (int)(i), (int)(i));\n\
                        \x20       drawing_index++;\n\
                        \x20   }\n";
        assert_eq!(code.operations, expected);

        let code = generated("var k = 0;\nif (k == 0) { k = 1; } else { k = 2; }\nwhile (k < 5) { k = k + 1; }\ndo { k = k - 1; } while (k > 0);");
        assert_eq!(
            code.operations,
            "    if (k == 0)\n    {\n        k = 1;\n    }\n    else\n    {\n        k = 2;\n    }\n\
             \x20   while (k < 5)\n    {\n        k = (k + 1);\n    }\n\
             \x20   do\n    {\n        k = (k - 1);\n    }\n    while (k > 0);\n"
        );
    }

    #[test]
    fn builtin_constants_map_to_macros() {
        let code = generated("var w = CANVAS_WIDTH / 2;\ndrawPoint(CANVAS_WIDTH, CANVAS_HEIGHT);");
        assert_eq!(code.declarations, "    float w = SCREEN_WIDTH / 2;\n");
        assert!(code.operations.contains("drawPoint(renderer, SCREEN_WIDTH, SCREEN_HEIGHT, 0, 0, 0, 255, filename);"));
    }

    #[test]
    fn cursor_lowering() {
        let code = generated(
            "Cursor c = Cursor(10, 20);\nc.setRGBA(255, 300, -1, 255);\nc.move(5, 0);\nc.rotate(90);\nc.drawCircle(15);\nc.drawPoint();",
        );
        let lines: Vec<&str> = code.operations.lines().map(str::trim).collect();
        assert_eq!(lines[0], "Cursor* c = Cursor_Constructor(10, 20);");
        assert_eq!(lines[1], "Cursor_SetColor(c, 255, 45, 1, 255);");
        assert_eq!(lines[2], "Cursor_Move(c, 5, 0);");
        assert_eq!(lines[3], "Cursor_Rotate(c, 90);");
        assert_eq!(lines[5], "Cursor_DrawCircle(c, renderer, 15, filename);");
        assert_eq!(lines[6], "fprintf(file, \"%d %d\\n\", (int)(c->x), (int)(c->y));");
        assert_eq!(lines[9], "Cursor_DrawPoint(c, renderer, filename);");
    }

    #[test]
    fn unsupported_constructs_are_errors() {
        let err = generate("var a = 1;\nanimate(a, 2) { }").unwrap_err();
        assert_eq!(
            err,
            CodegenError::Unsupported {
                construct: "animate_statement",
                target: "C",
                line: 2,
            }
        );
        assert!(matches!(
            generate("function f() { }"),
            Err(CodegenError::Unsupported { line: 1, .. })
        ));
    }

    #[test]
    fn drawing_calls_are_not_values() {
        let err = generate("var a = drawPoint(1, 2);").unwrap_err();
        assert_eq!(
            err,
            CodegenError::DrawInExpression {
                name: "drawPoint".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn header_and_reuse() {
        let program = parser::parse("setRGBA(1, 2, 3, 4);\ndrawPoint(0, 0);").unwrap();
        let mut backend = CBackend::new(Surface { width: 320, height: 200 });
        let first = backend.generate(&program).unwrap();
        let second = backend.generate(&program).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.header, "#define SCREEN_WIDTH 320\n#define SCREEN_HEIGHT 200\n");

        let again = backend.generate(&parser::parse("drawPoint(0, 0);").unwrap()).unwrap();
        assert!(again.operations.contains("0, 0, 0, 255, filename"));
    }
}
