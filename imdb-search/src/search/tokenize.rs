/// Split a free-form query into tokens.
///
/// Tokens are separated by whitespace, except inside of `{...}` directives,
/// which are always returned as a single token (braces included). Directives
/// may nest, so `{show:{years:1989-} simpsons}` is one token.
///
/// This never fails. Malformed nesting degrades gracefully: an unterminated
/// directive at the end of the query is returned as whatever was buffered,
/// and a `}` without a matching `{` is treated as an ordinary character.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = vec![];
    let mut buf = String::new();
    let mut depth = 0usize;
    for c in query.chars() {
        match c {
            '{' => {
                if depth == 0 && !buf.is_empty() {
                    tokens.push(std::mem::take(&mut buf));
                }
                depth += 1;
                buf.push(c);
            }
            '}' if depth > 0 => {
                depth -= 1;
                buf.push(c);
                if depth == 0 {
                    tokens.push(std::mem::take(&mut buf));
                }
            }
            ' ' | '\t' | '\r' | '\n' if depth == 0 => {
                if !buf.is_empty() {
                    tokens.push(std::mem::take(&mut buf));
                }
            }
            _ => buf.push(c),
        }
    }
    if !buf.is_empty() {
        tokens.push(buf);
    }
    tokens
}
