//
//  resolve.rs
//  RouteLens
//

use std::path::{Component, Path, PathBuf};

/// Extensions tried, in order, when an import omits one.
const EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];

/// Whether an import specifier points inside the project.
pub fn is_relative_specifier(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

/// Resolve a relative import/require specifier against the importing file.
///
/// Tries the literal path, then each extension appended, then
/// `index.<ext>` inside it as a directory. Package imports return `None`.
pub fn resolve_import(from_file: &Path, spec: &str) -> Option<PathBuf> {
    if !is_relative_specifier(spec) {
        return None;
    }
    let dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    let base = normalize_path(&dir.join(spec));

    if base.is_file() {
        return Some(base);
    }
    for ext in EXTENSIONS {
        let mut candidate = base.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for ext in EXTENSIONS {
        let candidate = base.join(format!("index.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Lexically collapse `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/p/routes/../controllers/./users.js")),
            PathBuf::from("/p/controllers/users.js")
        );
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn test_relative_specifiers() {
        assert!(is_relative_specifier("./users"));
        assert!(is_relative_specifier("../controllers/users"));
        assert!(!is_relative_specifier("express"));
        assert!(!is_relative_specifier("@app/controllers"));
        assert!(!is_relative_specifier("/abs/path"));
    }

    #[test]
    fn test_resolution_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::create_dir_all(root.join("controllers/orders")).unwrap();
        fs::write(root.join("routes/index.js"), "").unwrap();
        fs::write(root.join("controllers/users.ts"), "").unwrap();
        fs::write(root.join("controllers/users.js"), "").unwrap();
        fs::write(root.join("controllers/orders/index.tsx"), "").unwrap();
        fs::write(root.join("controllers/literal.js"), "").unwrap();

        let from = root.join("routes/index.js");
        assert_eq!(
            resolve_import(&from, "../controllers/users"),
            Some(root.join("controllers/users.js"))
        );
        assert_eq!(
            resolve_import(&from, "../controllers/orders"),
            Some(root.join("controllers/orders/index.tsx"))
        );
        assert_eq!(
            resolve_import(&from, "../controllers/literal.js"),
            Some(root.join("controllers/literal.js"))
        );
        assert_eq!(resolve_import(&from, "../controllers/missing"), None);
        assert_eq!(resolve_import(&from, "express"), None);
    }
}
