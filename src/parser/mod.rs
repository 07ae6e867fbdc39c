//
//  mod.rs
//  RouteLens
//

pub mod helpers;
pub mod language;
pub mod syntax;

use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

pub use language::SupportedLanguage;
pub use syntax::Syntax;

use crate::error::{Result, RouteLensError};

/// One parsed source file: the text it came from plus its syntax tree.
///
/// Line numbers handed out by this crate always refer to `source` as read
/// from disk, so callers can slice the original text for display.
pub struct SourceFile {
    path: PathBuf,
    source: String,
    tree: Tree,
    language: SupportedLanguage,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> SupportedLanguage {
        self.language
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Lines `start..=end` (1-based, inclusive) of the original text.
    pub fn line_range(&self, start: usize, end: usize) -> String {
        self.source
            .lines()
            .skip(start.saturating_sub(1))
            .take(end.saturating_sub(start) + 1)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Read and parse a file, choosing the grammar from its extension.
pub fn parse_file(path: &Path) -> Result<SourceFile> {
    let language = SupportedLanguage::from_path(path)
        .ok_or_else(|| RouteLensError::UnsupportedLanguage(path.to_path_buf()))?;
    let source = std::fs::read_to_string(path)?;
    parse_source(path, source, language)
}

/// Parse already-loaded source text.
///
/// Tree-sitter recovers from syntax errors by inserting ERROR nodes; a file
/// with any of those is rejected so that no half-understood route leaks out.
pub fn parse_source(path: &Path, source: String, language: SupportedLanguage) -> Result<SourceFile> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| RouteLensError::ParserInitError(path.to_path_buf(), e.to_string()))?;

    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| RouteLensError::TreeSitterParseFailed(path.to_path_buf()))?;

    if let Some(line) = helpers::first_error_line(tree.root_node()) {
        return Err(RouteLensError::SyntaxError {
            path: path.to_path_buf(),
            line,
        });
    }

    Ok(SourceFile {
        path: path.to_path_buf(),
        source,
        tree,
        language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_typescript_with_decorators() {
        let src = r#"
import { Controller, Get } from '@nestjs/common';

@Controller('users')
export class UsersController {
  @Get(':id')
  find(id: string): Promise<User> { return this.svc.find(id); }
}
"#;
        let file = parse_source(Path::new("users.ts"), src.to_string(), SupportedLanguage::TypeScript);
        assert!(file.is_ok());
    }

    #[test]
    fn test_parse_jsx() {
        let src = "const App = () => <div className=\"x\">{items.map(i => <Item key={i} />)}</div>;";
        let file = parse_source(Path::new("app.jsx"), src.to_string(), SupportedLanguage::JavaScript);
        assert!(file.is_ok());
    }

    #[test]
    fn test_syntax_error_is_reported_with_line() {
        let src = "const a = 1;\nrouter.get('/x', (req, res => {\n";
        let err = parse_source(Path::new("bad.js"), src.to_string(), SupportedLanguage::JavaScript)
            .err()
            .unwrap();
        assert!(matches!(err, RouteLensError::SyntaxError { .. }));
    }

    #[test]
    fn test_parse_file_and_line_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "line1();\nline2();\nline3();\n").unwrap();

        let file = parse_file(&path).unwrap();
        assert_eq!(file.line_range(2, 3), "line2();\nline3();");
        assert_eq!(file.line_range(1, 1), "line1();");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_file(Path::new("notes.md")).err().unwrap();
        assert!(matches!(err, RouteLensError::UnsupportedLanguage(_)));
    }
}
