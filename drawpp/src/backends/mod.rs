pub mod c;

use crate::error::CodegenError;
use crate::ir::ast;

pub trait Backend {
    fn generate(&mut self, program: &ast::Program) -> Result<GeneratedCode, CodegenError>;
}

/// Generated text, ready to be spliced into the body template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    pub declarations: String,
    pub operations: String,
    pub header: String,
}

/// Dimensions of the output surface the generated program draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub const DEFAULT_WIDTH: u32 = 800;
    pub const DEFAULT_HEIGHT: u32 = 600;

    /// Missing dimensions fall back to the defaults independently.
    pub fn resolve(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.unwrap_or(Self::DEFAULT_WIDTH),
            height: height.unwrap_or(Self::DEFAULT_HEIGHT),
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BackendType {
    C,
}

impl BackendType {
    pub fn all() -> Vec<Self> {
        vec![Self::C]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::C => "c",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::C => "C source for the SDL2 drawing runtime",
        }
    }

    pub fn create(&self, surface: Surface) -> Box<dyn Backend> {
        match self {
            Self::C => Box::new(c::CBackend::new(surface)),
        }
    }
}
