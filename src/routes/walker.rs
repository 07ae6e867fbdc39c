//
//  walker.rs
//  RouteLens
//

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::warn;

use super::resolve::normalize_path;
use crate::parser::SupportedLanguage;

/// Directories that never hold project route code.
const BUILTIN_IGNORE: &[&str] = &[
    "node_modules",
    "bower_components",
    "jspm_packages",
    "dist",
    "build",
    "out",
    ".git",
    ".next",
    ".nuxt",
    ".output",
    ".turbo",
    ".cache",
    "coverage",
    "vendor",
];

/// Where Express-style projects keep route registrations.
const ROUTE_FILE_GLOBS: &[&str] = &[
    "**/app.{js,ts,mjs,cjs}",
    "**/server.{js,ts,mjs,cjs}",
    "**/index.{js,ts,mjs,cjs}",
    "**/routes/**/*.{js,ts,jsx,tsx,mjs,cjs}",
    "**/router/**/*.{js,ts,jsx,tsx,mjs,cjs}",
    "**/controllers/**/*.{js,ts,jsx,tsx,mjs,cjs}",
    "**/*router*.{js,ts,jsx,tsx,mjs,cjs}",
    "**/*route*.{js,ts,jsx,tsx,mjs,cjs}",
];

/// File-naming conventions used to pick candidate route files.
#[derive(Debug, Clone)]
pub struct RouteFileConventions {
    globs: GlobSet,
    ignored_dirs: Vec<String>,
}

impl RouteFileConventions {
    pub fn new(extra_ignored: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in ROUTE_FILE_GLOBS {
            match GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(true)
                .build()
            {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!(pattern, error = %e, "invalid route-file glob"),
            }
        }
        let globs = builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "failed to compile route-file globs");
            GlobSet::empty()
        });

        let mut ignored_dirs: Vec<String> = BUILTIN_IGNORE.iter().map(|s| s.to_string()).collect();
        ignored_dirs.extend(extra_ignored.iter().cloned());

        Self {
            globs,
            ignored_dirs,
        }
    }

    /// Whether a path (relative to the workspace root) looks like route code.
    pub fn matches(&self, relative: &Path) -> bool {
        SupportedLanguage::from_path(relative).is_some()
            && !self.is_ignored(relative)
            && self.globs.is_match(relative)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|c| match c {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                self.ignored_dirs.iter().any(|d| *d == name)
            }
            _ => false,
        })
    }
}

impl Default for RouteFileConventions {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Every candidate route file under `root`, sorted.
///
/// Respects .gitignore on top of the built-in dependency-directory list.
pub fn find_route_files(root: &Path, conventions: &RouteFileConventions) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            conventions.matches(relative)
        })
        .map(|entry| normalize_path(entry.path()))
        .collect();
    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_conventions() {
        let c = RouteFileConventions::default();
        assert!(c.matches(Path::new("app.js")));
        assert!(c.matches(Path::new("src/server.ts")));
        assert!(c.matches(Path::new("src/index.js")));
        assert!(c.matches(Path::new("src/routes/users.js")));
        assert!(c.matches(Path::new("src/routes/v1/orders.ts")));
        assert!(c.matches(Path::new("api/router/index.mjs")));
        assert!(c.matches(Path::new("src/controllers/userController.js")));
        assert!(c.matches(Path::new("src/userRouter.ts")));
        assert!(c.matches(Path::new("src/api/productRoutes.js")));
        assert!(c.matches(Path::new("src/user.routes.js")));

        assert!(!c.matches(Path::new("src/models/user.js")));
        assert!(!c.matches(Path::new("src/routes/readme.md")));
        assert!(!c.matches(Path::new("node_modules/express/lib/router/index.js")));
        assert!(!c.matches(Path::new("dist/routes/users.js")));
    }

    #[test]
    fn test_extra_ignored_dirs() {
        let c = RouteFileConventions::new(&["legacy".to_string()]);
        assert!(!c.matches(Path::new("legacy/routes/users.js")));
        assert!(c.matches(Path::new("routes/users.js")));
    }

    #[test]
    fn test_find_route_files_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::create_dir_all(root.join("models")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("app.js"), "").unwrap();
        fs::write(root.join("routes/users.js"), "").unwrap();
        fs::write(root.join("routes/auth.js"), "").unwrap();
        fs::write(root.join("models/user.js"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();

        let files = find_route_files(root, &RouteFileConventions::default());
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["app.js", "routes/auth.js", "routes/users.js"]);
    }
}
