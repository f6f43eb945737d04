use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Recipe bodies are free text that clients render as HTML. Sanitization keeps
/// safe tags (like <b>, <p>) while stripping dangerous tags (like <script>,
/// <iframe>) and attributes (like onclick) before the text is persisted.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
