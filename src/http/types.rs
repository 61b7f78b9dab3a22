//! Protocol helpers shared by request routing and response writing.

use memchr::memmem;

/// The only method this server implements. Matched case-insensitively,
/// anything else is answered `501`.
#[inline]
pub(crate) fn is_get(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET")
}

// CONTENT TYPE

/// Infers the `Content-Type` from the file name, by substring.
#[inline]
pub(crate) fn content_type(filename: &str) -> &'static str {
    let name = filename.as_bytes();
    if memmem::find(name, b".html").is_some() {
        "text/html"
    } else if memmem::find(name, b".gif").is_some() {
        "image/gif"
    } else if memmem::find(name, b".jpg").is_some() {
        "image/jpeg"
    } else {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_case_insensitive() {
        assert!(is_get("GET"));
        assert!(is_get("get"));
        assert!(is_get("GeT"));

        assert!(!is_get("POST"));
        assert!(!is_get("GETX"));
        assert!(!is_get(""));
    }

    #[test]
    fn content_types() {
        #[rustfmt::skip]
        let cases = [
            ("./public/home.html",    "text/html"),
            ("./public/cat.gif",      "image/gif"),
            ("./public/photo.jpg",    "image/jpeg"),
            ("./public/notes.txt",    "text/plain"),
            ("./public/archive.jpeg", "text/plain"),
            ("./public/html.d/file",  "text/plain"),
            ("./public/page.html.bak", "text/html"),
        ];

        for (filename, expected) in cases {
            assert_eq!(content_type(filename), expected, "for {filename}");
        }
    }
}
