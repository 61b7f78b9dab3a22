use std::io;
use thiserror::Error;

/// Startup and acceptor-level failures.
///
/// Everything past startup is contained: per-request failures are logged by
/// the worker that hit them and never propagate here.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// HTTP-level request errors, answered with a full header block and a small
/// HTML body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HttpError {
    /// Any method other than GET.
    NotImplemented,
    /// The resolved file does not exist.
    NotFound,
    /// Static target is not a regular, owner-readable file.
    Unreadable,
    /// Dynamic target is not a regular, owner-executable file.
    NotExecutable,
}

macro_rules! http_errors {
    ($($name:ident: $code:literal, $short:literal => $detail:literal;)*) => {
        /// Numeric status code and reason phrase for the status line.
        pub(crate) const fn status(&self) -> (&'static str, &'static str) {
            match self {
                $(Self::$name => ($code, $short),)*
            }
        }

        /// Human-readable detail for the error page body.
        pub(crate) const fn detail(&self) -> &'static str {
            match self {
                $(Self::$name => $detail,)*
            }
        }
    };
}

impl HttpError {
    http_errors! {
        NotImplemented: "501", "Not Implemented" => "floodgate does not implement this method";
        NotFound:       "404", "Not found"       => "floodgate could not find this file";
        Unreadable:     "403", "Forbidden"       => "floodgate could not read this file";
        NotExecutable:  "403", "Forbidden"       => "floodgate could not run this CGI program";
    }
}
