//
//  inflect.rs
//  RouteLens
//
//  Suffix-table singular/plural conversion. Irregular nouns pass through
//  unchanged ("people" stays "people"); callers score these guesses, they
//  don't trust them.
//

/// `categories -> category`, `shelves -> shelf`, `users -> user`.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = word.strip_suffix("ves") {
        if !stem.is_empty() {
            return format!("{stem}f");
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// `category -> categories`, `shelf -> shelves`, `user -> users`.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || is_plural(word) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        return format!("{stem}ies");
    }
    if let Some(stem) = word.strip_suffix('f') {
        return format!("{stem}ves");
    }
    format!("{word}s")
}

pub fn is_plural(word: &str) -> bool {
    word.len() > 1 && word.ends_with('s')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("products"), "product");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("shelves"), "shelf");
        assert_eq!(singularize("user"), "user");
        assert_eq!(singularize("s"), "s");
        // Known imprecision, kept on purpose.
        assert_eq!(singularize("children"), "children");
        assert_eq!(singularize("people"), "people");
        assert_eq!(singularize("statuses"), "statuse");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("product"), "products");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("shelf"), "shelves");
        assert_eq!(pluralize("users"), "users");
        assert_eq!(pluralize(""), "");
    }
}
