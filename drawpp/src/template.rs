use std::borrow::Cow;

use crate::backends::GeneratedCode;
use crate::error::TemplateError;

pub const VARIABLES_MARKER: &str = "// INSERT VARIABLES";
pub const DRAWINGS_MARKER: &str = "// INSERT DRAWINGS";

pub const BODY_FILE: &str = "main.c";
pub const HEADER_FILE: &str = "globals.h";

/// Program skeleton shipped with the compiler.
pub const BODY_TEMPLATE: &str = include_str!("../templates/body.c");

/// Inserts declarations on the line after the variables marker and operations
/// on the line after the drawings marker. Markers are located in the template
/// before anything is inserted.
pub fn splice(template: &str, code: &GeneratedCode) -> Result<String, TemplateError> {
    let template: Cow<'_, str> = if template.ends_with('\n') {
        Cow::Borrowed(template)
    } else {
        Cow::Owned(format!("{}\n", template))
    };

    let mut insertions = [
        (insertion_point(&template, VARIABLES_MARKER)?, code.declarations.as_str()),
        (insertion_point(&template, DRAWINGS_MARKER)?, code.operations.as_str()),
    ];
    insertions.sort_by_key(|(at, _)| *at);

    let mut out = String::with_capacity(
        template.len() + code.declarations.len() + code.operations.len(),
    );
    let mut copied = 0;
    for (at, text) in insertions {
        out.push_str(&template[copied..at]);
        out.push_str(text);
        copied = at;
    }
    out.push_str(&template[copied..]);
    Ok(out)
}

/// Start of the line following `marker`.
fn insertion_point(template: &str, marker: &'static str) -> Result<usize, TemplateError> {
    let start = template.find(marker).ok_or(TemplateError { marker })?;
    Ok(template[start..]
        .find('\n')
        .map_or(template.len(), |offset| start + offset + 1))
}

pub fn header_file(header: &str) -> String {
    format!("#ifndef GLOBALS_H\n#define GLOBALS_H\n\n{}\n#endif\n", header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> GeneratedCode {
        GeneratedCode {
            declarations: "    int x = 5;\n".to_string(),
            operations: "    x = (x + 1);\n".to_string(),
            header: "#define SCREEN_WIDTH 800\n#define SCREEN_HEIGHT 600\n".to_string(),
        }
    }

    #[test]
    fn inserts_after_each_marker() {
        let template = "int main()\n{\n    // INSERT VARIABLES\n    // INSERT DRAWINGS\n}\n";
        assert_eq!(
            splice(template, &code()).unwrap(),
            "int main()\n{\n    // INSERT VARIABLES\n    int x = 5;\n    // INSERT DRAWINGS\n    x = (x + 1);\n}\n"
        );
    }

    #[test]
    fn marker_on_last_line_without_newline() {
        let template = "// INSERT VARIABLES\n// INSERT DRAWINGS";
        assert_eq!(
            splice(template, &code()).unwrap(),
            "// INSERT VARIABLES\n    int x = 5;\n// INSERT DRAWINGS\n    x = (x + 1);\n"
        );
    }

    #[test]
    fn missing_marker_is_reported() {
        let err = splice("// INSERT VARIABLES\n", &code()).unwrap_err();
        assert_eq!(err, TemplateError { marker: DRAWINGS_MARKER });
    }

    #[test]
    fn bundled_template_has_both_markers() {
        let body = splice(BODY_TEMPLATE, &code()).unwrap();
        assert!(body.contains("#include \"globals.h\""));
        let declaration = body.find("int x = 5;").unwrap();
        let operation = body.find("x = (x + 1);").unwrap();
        assert!(declaration < operation);
    }

    #[test]
    fn header_is_guarded() {
        let header = header_file(&code().header);
        assert!(header.starts_with("#ifndef GLOBALS_H\n#define GLOBALS_H\n"));
        assert!(header.contains("#define SCREEN_WIDTH 800\n"));
        assert!(header.ends_with("#endif\n"));
    }
}
