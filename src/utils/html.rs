// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Question texts, option texts and display names are rendered by the quiz
/// and admin clients, so markup is whitelisted before it is stored: safe
/// tags (like <b>, <p>) stay, <script>/<iframe> and event attributes go.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// `clean_html` plus surrounding whitespace removal, for single-line fields.
pub fn clean_text(input: &str) -> String {
    clean_html(input.trim())
}
