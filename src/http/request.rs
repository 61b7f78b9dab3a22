//! Request-line reading and URI-to-file routing.

use memchr::{memchr, memmem};
use std::borrow::Cow;
use std::io::{self, BufRead};

/// The three tokens of an HTTP/1.0 request line.
///
/// Tokens the client failed to supply come back empty; downstream checks
/// (GET match, routing) then take the error path instead of this parser
/// rejecting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestLine {
    pub(crate) method: String,
    pub(crate) uri: String,
    pub(crate) version: String,
}

/// Reads and tokenizes the request line.
///
/// The line is validated as UTF-8 on the fast path; invalid bytes fall
/// back to a lossy conversion so a garbage first line still produces a
/// parseable (and rejectable) method token.
pub(crate) fn read_request_line<R: BufRead>(reader: &mut R) -> io::Result<RequestLine> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;

    let text: Cow<'_, str> = match simdutf8::basic::from_utf8(&line) {
        Ok(valid) => Cow::Borrowed(valid),
        Err(_) => String::from_utf8_lossy(&line),
    };

    let mut tokens = text.split_whitespace();
    Ok(RequestLine {
        method: tokens.next().unwrap_or_default().to_owned(),
        uri: tokens.next().unwrap_or_default().to_owned(),
        version: tokens.next().unwrap_or_default().to_owned(),
    })
}

/// Reads and discards header lines up to (and including) the blank line.
///
/// EOF before the blank line also terminates the drain; the request is
/// handled with whatever was read.
pub(crate) fn drain_headers<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if line == b"\r\n" || line == b"\n" {
            return Ok(());
        }
    }
}

// ROUTING

/// Where a URI resolves: a static file or a CGI program plus its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    Static { filename: String },
    Dynamic { filename: String, query: String },
}

/// Resolves a request URI against the content root.
///
/// - a URI containing `..` is rewritten to the root's `home.html`;
/// - a URI containing `cgi` is dynamic, with the query split off at the
///   first `?`;
/// - anything else is a static path under the root, a trailing `/`
///   resolving to `home.html`.
pub(crate) fn resolve(root: &str, uri: &str) -> Route {
    let bytes = uri.as_bytes();

    if memmem::find(bytes, b"..").is_some() {
        return Route::Static {
            filename: format!("{root}/home.html"),
        };
    }

    if memmem::find(bytes, b"cgi").is_none() {
        let mut filename = format!("{root}/{uri}");
        if filename.ends_with('/') {
            filename.push_str("home.html");
        }
        Route::Static { filename }
    } else {
        let (path, query) = match memchr(b'?', bytes) {
            Some(mark) => (&uri[..mark], &uri[mark + 1..]),
            None => (uri, ""),
        };
        Route::Dynamic {
            filename: format!("{root}/{path}"),
            query: query.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_request_line() {
        let mut input = Cursor::new(b"GET /index.html HTTP/1.0\r\nHost: x\r\n\r\n".to_vec());
        let line = read_request_line(&mut input).unwrap();

        assert_eq!(line.method, "GET");
        assert_eq!(line.uri, "/index.html");
        assert_eq!(line.version, "HTTP/1.0");
    }

    #[test]
    fn tolerates_short_and_garbage_lines() {
        let mut input = Cursor::new(b"\r\n".to_vec());
        let line = read_request_line(&mut input).unwrap();
        assert_eq!(line.method, "");
        assert_eq!(line.uri, "");

        let mut input = Cursor::new(vec![0xff, 0xfe, b' ', b'/', b'\r', b'\n']);
        let line = read_request_line(&mut input).unwrap();
        assert_ne!(line.method, "GET");
        assert_eq!(line.uri, "/");
    }

    #[test]
    fn drains_headers_to_blank_line() {
        let mut input =
            Cursor::new(b"Host: x\r\nAccept: */*\r\n\r\nGET /next HTTP/1.0\r\n".to_vec());
        drain_headers(&mut input).unwrap();

        let line = read_request_line(&mut input).unwrap();
        assert_eq!(line.uri, "/next");
    }

    #[test]
    fn drains_headers_at_eof() {
        let mut input = Cursor::new(b"Host: x\r\n".to_vec());
        drain_headers(&mut input).unwrap();
    }

    #[test]
    fn routes() {
        #[rustfmt::skip]
        let cases = [
            // traversal attempts collapse to the home page
            ("/..%/x",            Route::Static { filename: "./public/home.html".into() }),
            ("/a/../b",           Route::Static { filename: "./public/home.html".into() }),
            // plain static, trailing slash resolves to the home page
            ("/index.html",       Route::Static { filename: "./public//index.html".into() }),
            ("/",                 Route::Static { filename: "./public//home.html".into() }),
            ("/img/",             Route::Static { filename: "./public//img/home.html".into() }),
            // `cgi` anywhere in the URI makes the request dynamic
            ("/cgi/add?x=1&y=2",  Route::Dynamic { filename: "./public//cgi/add".into(), query: "x=1&y=2".into() }),
            ("/cgi/add",          Route::Dynamic { filename: "./public//cgi/add".into(), query: "".into() }),
            ("/tools/mycgiapp",   Route::Dynamic { filename: "./public//tools/mycgiapp".into(), query: "".into() }),
        ];

        for (uri, expected) in cases {
            assert_eq!(resolve("./public", uri), expected, "for {uri}");
        }
    }

    #[test]
    fn query_splits_at_first_question_mark() {
        let route = resolve("./public", "/cgi/echo?a=1?b=2");
        assert_eq!(
            route,
            Route::Dynamic {
                filename: "./public//cgi/echo".into(),
                query: "a=1?b=2".into(),
            }
        );
    }
}
