use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use drawpp::backends::{BackendType, Surface};
use drawpp::error::CompileError;
use drawpp::{parser, template};

#[derive(Parser)]
#[command(name = "drawpp")]
#[command(about = "Draw++ script compiler targeting a C drawing runtime", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compiles a script and writes main.c and globals.h
    Compile {
        /// Script file
        input: PathBuf,

        /// Code generation target
        #[arg(short, long, default_value = "c")]
        target: String,

        /// Output directory, the input's directory by default
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Surface width in pixels
        #[arg(long, env = "DRAWPP_WIDTH")]
        width: Option<u32>,

        /// Surface height in pixels
        #[arg(long, env = "DRAWPP_HEIGHT")]
        height: Option<u32>,

        /// Body template to use instead of the bundled one
        #[arg(long)]
        template: Option<PathBuf>,

        /// Show ast
        #[arg(long)]
        show_ast: bool,
    },

    /// Shows tokens and ast without compiling
    Parse {
        /// Script file
        input: PathBuf,
    },

    /// Reports lexer, syntax and semantic errors without generating code
    Check {
        /// Script file
        input: PathBuf,
    },

    /// Lists supported targets
    Targets,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            input,
            target,
            output,
            width,
            height,
            template,
            show_ast,
        } => compile(
            &input,
            &target,
            output,
            Surface::resolve(width, height),
            template,
            show_ast,
        ),
        Commands::Parse { input } => parse(&input),
        Commands::Check { input } => check(&input),
        Commands::Targets => {
            println!("Supported targets:");
            for backend in BackendType::all() {
                println!("  {:8} - {}", backend.name(), backend.description());
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

fn compile(
    input: &Path,
    target: &str,
    output: Option<PathBuf>,
    surface: Surface,
    template_path: Option<PathBuf>,
    show_ast: bool,
) -> Result<(), CompileError> {
    println!("Compiling {} for {}...", input.display(), target);

    let backend_type = BackendType::all()
        .into_iter()
        .find(|b| b.name() == target)
        .ok_or_else(|| CompileError::UnknownTarget(target.to_string()))?;

    let source = fs::read_to_string(input)?;
    let program = drawpp::check(&source)?;

    if show_ast {
        println!("=== AST ===");
        println!("{:#?}", program);
    }

    let mut backend = backend_type.create(surface);
    let code = backend.generate(&program)?;

    let body = match template_path {
        Some(path) => fs::read_to_string(path)?,
        None => template::BODY_TEMPLATE.to_string(),
    };
    let main_source = template::splice(&body, &code)?;

    let directory = output.unwrap_or_else(|| {
        input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });
    fs::create_dir_all(&directory)?;

    let main_path = directory.join(template::BODY_FILE);
    let header_path = directory.join(template::HEADER_FILE);
    fs::write(&main_path, &main_source)?;
    fs::write(&header_path, template::header_file(&code.header))?;

    println!("Surface: {}x{}", surface.width, surface.height);
    println!("Compiled to: {}", main_path.display());
    println!("Header: {}", header_path.display());
    println!(
        "Generated {} declaration line(s), {} operation line(s)",
        code.declarations.lines().count(),
        code.operations.lines().count()
    );
    Ok(())
}

fn parse(input: &Path) -> Result<(), CompileError> {
    println!("Parsing {}...", input.display());

    let source = fs::read_to_string(input)?;

    println!("=== SOURCE ===");
    println!("{}", source);
    println!("=== TOKENS ===");

    let (tokens, lex_errors) = parser::lexer::tokenize(&source);
    for token in &tokens {
        println!("{:4}  {:?}  {}", token.line, token.kind, token);
    }

    println!("=== AST ===");
    let (program, parse_errors) = parser::parser::parse_tokens(tokens);
    println!("{:#?}", program);

    if !lex_errors.is_empty() {
        return Err(CompileError::Lex(lex_errors));
    }
    if !parse_errors.is_empty() {
        return Err(CompileError::Syntax(parse_errors));
    }
    Ok(())
}

fn check(input: &Path) -> Result<(), CompileError> {
    println!("Checking {}...", input.display());

    let source = fs::read_to_string(input)?;
    let program = drawpp::check(&source)?;

    println!("No problems found ({} top-level statement(s))", program.statements.len());
    Ok(())
}

fn report(error: &CompileError) {
    for diagnostic in error.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    if let CompileError::Lex(_) | CompileError::Syntax(_) | CompileError::Semantic(_) = error {
        eprintln!("{}", error);
    }
}
