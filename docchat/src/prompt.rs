pub const SYSTEM_PROMPT: &str = "You are an assistant who answers based on uploaded documents.";

/// What gets sent to the backend. Document text, when there is any, is
/// framed ahead of the query.
pub fn generation_prompt(document: &str, query: &str) -> String {
    if document.is_empty() {
        query.to_string()
    } else {
        format!("The user uploaded the following document:\n\n{document}\n\nUser query: {query}")
    }
}

/// What gets stored as the user's side of the turn. Never contains the
/// document body.
pub fn recorded_user_text(file_label: Option<&str>, query: &str) -> String {
    match file_label {
        Some(label) if !label.is_empty() => format!("User query: {query}"),
        _ => query.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_document_is_query() {
        assert_eq!(generation_prompt("", "what is this?"), "what is this?");
    }

    #[test]
    fn test_prompt_with_document() {
        assert_eq!(
            generation_prompt("a, b\n1, 2", "sum column b"),
            "The user uploaded the following document:\n\na, b\n1, 2\n\nUser query: sum column b"
        );
    }

    #[test]
    fn test_recorded_text_depends_on_label_only() {
        assert_eq!(recorded_user_text(Some("data.csv"), "sum"), "User query: sum");
        assert_eq!(recorded_user_text(None, "sum"), "sum");
        assert_eq!(recorded_user_text(Some(""), "sum"), "sum");
    }
}
