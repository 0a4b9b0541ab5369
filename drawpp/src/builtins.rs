//! Fixed catalogs shared by the semantic analyzer and the code generator.

/// What a global drawing-library call does during code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawAction {
    /// Lowers to the runtime primitive; `thickness` appends the current stroke width.
    Shape {
        runtime: &'static str,
        thickness: bool,
    },
    SetColor,
    SetThickness,
}

impl DrawAction {
    /// Context setters are folded at compile time, so their arguments must be literals.
    pub fn needs_constant_arguments(&self) -> bool {
        matches!(self, DrawAction::SetColor | DrawAction::SetThickness)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawFunction {
    pub name: &'static str,
    pub arity: usize,
    pub action: DrawAction,
}

const fn shape(name: &'static str, arity: usize) -> DrawFunction {
    DrawFunction {
        name,
        arity,
        action: DrawAction::Shape {
            runtime: name,
            thickness: false,
        },
    }
}

pub const DRAW_FUNCTIONS: &[DrawFunction] = &[
    shape("drawCircle", 3),           // x, y, radius
    shape("drawFilledCircle", 3),     // x, y, radius
    shape("drawEllipse", 5),          // x, y, rx, ry, angle
    shape("drawFilledEllipse", 5),    // x, y, rx, ry, angle
    shape("drawRoundedRectangle", 6), // x, y, width, height, radius, angle
    shape("drawBox", 5),              // x, y, width, height, angle
    shape("drawRoundedBox", 6),       // x, y, width, height, radius, angle
    DrawFunction {
        name: "drawSegment", // x0, y0, x1, y1
        arity: 4,
        action: DrawAction::Shape {
            runtime: "drawSegment",
            thickness: true,
        },
    },
    shape("drawTriangle", 7),  // x1, y1, x2, y2, x3, y3, angle
    shape("drawRectangle", 5), // x, y, width, height, angle
    shape("drawPoint", 2),     // x, y
    DrawFunction {
        name: "setRGBA",
        arity: 4,
        action: DrawAction::SetColor,
    },
    DrawFunction {
        name: "setThickness",
        arity: 1,
        action: DrawAction::SetThickness,
    },
];

pub fn draw_function(name: &str) -> Option<&'static DrawFunction> {
    DRAW_FUNCTIONS.iter().find(|f| f.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAction {
    /// Produces an output artifact and a position log entry.
    Draw,
    Move,
    Rotate,
    SetColor,
    SetThickness,
}

impl CursorAction {
    /// Colour components are clamped at compile time.
    pub fn needs_constant_arguments(&self) -> bool {
        matches!(self, CursorAction::SetColor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMethod {
    pub name: &'static str,
    pub arity: usize,
    pub runtime: &'static str,
    pub action: CursorAction,
}

const fn cursor_draw(name: &'static str, arity: usize, runtime: &'static str) -> CursorMethod {
    CursorMethod {
        name,
        arity,
        runtime,
        action: CursorAction::Draw,
    }
}

pub const CURSOR_METHODS: &[CursorMethod] = &[
    CursorMethod {
        name: "move",
        arity: 2,
        runtime: "Cursor_Move",
        action: CursorAction::Move,
    },
    CursorMethod {
        name: "rotate",
        arity: 1,
        runtime: "Cursor_Rotate",
        action: CursorAction::Rotate,
    },
    CursorMethod {
        name: "setRGBA",
        arity: 4,
        runtime: "Cursor_SetColor",
        action: CursorAction::SetColor,
    },
    CursorMethod {
        name: "setThickness",
        arity: 1,
        runtime: "Cursor_SetThickness",
        action: CursorAction::SetThickness,
    },
    cursor_draw("drawCircle", 1, "Cursor_DrawCircle"),
    cursor_draw("drawFilledCircle", 1, "Cursor_DrawFilledCircle"),
    cursor_draw("drawEllipse", 2, "Cursor_DrawEllipse"),
    cursor_draw("drawFilledEllipse", 2, "Cursor_DrawFilledEllipse"),
    cursor_draw("drawRoundedRectangle", 3, "Cursor_DrawRoundedRectangle"),
    cursor_draw("drawBox", 2, "Cursor_DrawBox"),
    cursor_draw("drawRoundedBox", 3, "Cursor_DrawRoundedBox"),
    cursor_draw("drawSegment", 1, "Cursor_DrawSegment"),
    cursor_draw("drawTriangle", 4, "Cursor_DrawTriangle"),
    cursor_draw("drawRectangle", 2, "Cursor_DrawRectangle"),
    cursor_draw("drawPoint", 0, "Cursor_DrawPoint"),
];

pub fn cursor_method(name: &str) -> Option<&'static CursorMethod> {
    CURSOR_METHODS.iter().find(|m| m.name == name)
}

pub const CURSOR_CONSTRUCTOR: &str = "Cursor_Constructor";
pub const CURSOR_CONSTRUCTOR_ARITY: usize = 2;

/// Read-only script globals and the C macro each one stands for.
pub const BUILTIN_CONSTANTS: &[(&str, &str)] = &[
    ("CANVAS_WIDTH", "SCREEN_WIDTH"),
    ("CANVAS_HEIGHT", "SCREEN_HEIGHT"),
];

pub fn builtin_constant(name: &str) -> Option<&'static str> {
    BUILTIN_CONSTANTS
        .iter()
        .find(|(script, _)| *script == name)
        .map(|(_, macro_name)| *macro_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookups() {
        assert_eq!(draw_function("drawCircle").map(|f| f.arity), Some(3));
        assert_eq!(draw_function("setRGBA").map(|f| f.action), Some(DrawAction::SetColor));
        assert!(draw_function("cos").is_none());
        assert_eq!(cursor_method("move").map(|m| m.arity), Some(2));
        assert_eq!(cursor_method("drawPoint").map(|m| m.arity), Some(0));
        assert!(cursor_method("fly").is_none());
        assert_eq!(builtin_constant("CANVAS_HEIGHT"), Some("SCREEN_HEIGHT"));
        assert_eq!(builtin_constant("WIDTH"), None);
        assert!(DrawAction::SetThickness.needs_constant_arguments());
        assert!(!CursorAction::SetThickness.needs_constant_arguments());
    }
}
