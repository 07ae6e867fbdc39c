//
//  prompt.rs
//  RouteLens
//

use std::fmt::Write as _;

use crate::controller::ControllerContext;
use crate::routes::DetectedRoute;

const RESPONSE_SHAPE: &str = r#"{
  "fields": [
    { "name": "string", "type": "string|number|boolean|object|array|ObjectId|Date", "required": true, "example": "any", "description": "string" }
  ],
  "headers": [
    { "name": "string", "value": "string", "description": "string", "required": true }
  ]
}"#;

/// Natural-language prompt for one route.
pub fn build_prompt(route: &DetectedRoute, context: Option<&ControllerContext>) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are analysing an Express-style HTTP endpoint. Predict the JSON request body a client must send."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Method: {}", route.method);
    let _ = writeln!(prompt, "Path: {}", route.path);
    if !route.middlewares.is_empty() {
        let _ = writeln!(prompt, "Middlewares: {}", route.middlewares.join(", "));
    }
    let _ = writeln!(prompt, "Handler: {}", route.handler);

    if let Some(context) = context {
        if !context.req_body_fields.is_empty() {
            let _ = writeln!(
                prompt,
                "Fields read from the request body: {}",
                context.req_body_fields.join(", ")
            );
        }
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Handler source ({}):", context.function_name);
        let _ = writeln!(prompt, "```");
        let _ = writeln!(prompt, "{}", context.controller_code);
        let _ = writeln!(prompt, "```");
    } else {
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "The handler source is not available; infer from the route alone.");
    }

    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Include headers the endpoint needs (for example Authorization when auth middleware is present)."
    );
    let _ = writeln!(prompt, "Answer with JSON only, in exactly this shape:");
    prompt.push_str(RESPONSE_SHAPE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::HttpMethod;
    use std::path::PathBuf;

    fn route() -> DetectedRoute {
        DetectedRoute {
            method: HttpMethod::Post,
            path: "/api/users".to_string(),
            file_path: PathBuf::from("/app/routes/users.js"),
            line: 4,
            middlewares: vec!["auth".to_string()],
            handler: "createUser".to_string(),
            router_prefix: Some("/api".to_string()),
            controller_file_path: None,
            controller_function: None,
            inline_span: None,
        }
    }

    #[test]
    fn test_prompt_with_context() {
        let context = ControllerContext {
            route: route(),
            req_body_fields: vec!["email".to_string(), "name".to_string()],
            controller_code: "function createUser(req, res) {}".to_string(),
            function_name: "createUser".to_string(),
            file_path: PathBuf::from("/app/routes/users.js"),
            start_line: 1,
            end_line: 1,
        };
        let prompt = build_prompt(&route(), Some(&context));
        assert!(prompt.contains("Method: POST"));
        assert!(prompt.contains("Path: /api/users"));
        assert!(prompt.contains("Middlewares: auth"));
        assert!(prompt.contains("email, name"));
        assert!(prompt.contains("function createUser(req, res) {}"));
        assert!(prompt.contains("\"fields\""));
    }

    #[test]
    fn test_prompt_without_context() {
        let prompt = build_prompt(&route(), None);
        assert!(prompt.contains("not available"));
        assert!(!prompt.contains("```"));
    }
}
