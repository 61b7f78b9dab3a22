//! The file/CGI responder: request in, HTTP/1.0 response out.
//!
//! Every response this module writes, success or error, carries six
//! `Stat-*::` headers: the request's arrival time, its dispatch delay, and
//! the serving worker's three counters. The counters are bumped *before*
//! the header block is composed, so the numbers a client sees already
//! include the response carrying them.

use crate::errors::HttpError;
use crate::http::request::{self, Route};
use crate::http::types;
use crate::server::connection::Conn;
use crate::server::server_impl::Responder;
use crate::server::worker::WorkerStats;
use std::fs;
use std::io::{self, BufReader, Write};
use std::os::fd::OwnedFd;
use std::os::unix::fs::PermissionsExt;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::info;

const SERVER_NAME: &str = "floodgate";

/// Serves static files and CGI programs from a content root.
///
/// Static requests stream the file after the header block. Dynamic
/// requests (URI containing `cgi`) launch the target program with the
/// query string in `QUERY_STRING` and the client socket as stdout; the
/// CGI program finishes the header block itself.
///
/// # Examples
///
/// ```no_run
/// use floodgate::{FileResponder, Policy, Server};
///
/// Server::builder()
///     .listener(Server::bind(8080).unwrap())
///     .responder(FileResponder::new("./public"))
///     .build()
///     .unwrap()
///     .launch();
/// ```
pub struct FileResponder {
    root: String,
}

impl FileResponder {
    /// A responder serving from `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FileResponder {
    /// Serves from `./public`.
    fn default() -> Self {
        Self::new("./public")
    }
}

impl Responder for FileResponder {
    fn respond(&self, conn: &mut Conn, stats: &mut WorkerStats) -> io::Result<()> {
        let mut reader = BufReader::new(conn.stream());
        let line = request::read_request_line(&mut reader)?;
        info!("{} {} {}", line.method, line.uri, line.version);

        if !types::is_get(&line.method) {
            return send_error(conn, stats, HttpError::NotImplemented, &line.method);
        }
        request::drain_headers(&mut reader)?;
        drop(reader);

        match request::resolve(&self.root, &line.uri) {
            Route::Static { filename } => serve_static(conn, stats, &filename),
            Route::Dynamic { filename, query } => serve_dynamic(conn, stats, &filename, &query),
        }
    }
}

fn serve_static(conn: &Conn, stats: &mut WorkerStats, filename: &str) -> io::Result<()> {
    let meta = match fs::metadata(filename) {
        Ok(meta) => meta,
        Err(_) => return send_error(conn, stats, HttpError::NotFound, filename),
    };
    if !meta.is_file() || meta.permissions().mode() & 0o400 == 0 {
        return send_error(conn, stats, HttpError::Unreadable, filename);
    }

    let body = fs::read(filename)?;
    stats.record_static();

    let head = format!(
        "HTTP/1.0 200 OK\r\nServer: {SERVER_NAME}\r\nContent-Length: {}\r\nContent-Type: {}\r\n{}\r\n",
        body.len(),
        types::content_type(filename),
        stat_block(conn, stats),
    );
    let mut stream = conn.stream();
    stream.write_all(head.as_bytes())?;
    stream.write_all(&body)
}

fn serve_dynamic(conn: &Conn, stats: &mut WorkerStats, filename: &str, query: &str) -> io::Result<()> {
    let meta = match fs::metadata(filename) {
        Ok(meta) => meta,
        Err(_) => return send_error(conn, stats, HttpError::NotFound, filename),
    };
    if !meta.is_file() || meta.permissions().mode() & 0o100 == 0 {
        return send_error(conn, stats, HttpError::NotExecutable, filename);
    }

    stats.record_dynamic();

    // Anything beyond this block (content type, body) is the CGI
    // program's to write; its stdout is the client socket itself.
    let head = format!(
        "HTTP/1.0 200 OK\r\nServer: {SERVER_NAME}\r\n{}\r\n",
        stat_block(conn, stats),
    );
    let mut stream = conn.stream();
    stream.write_all(head.as_bytes())?;

    let stdout = Stdio::from(OwnedFd::from(conn.stream().try_clone()?));
    Command::new(filename)
        .env("QUERY_STRING", query)
        .stdout(stdout)
        .spawn()?
        .wait()?;
    Ok(())
}

fn send_error(
    conn: &Conn,
    stats: &mut WorkerStats,
    error: HttpError,
    cause: &str,
) -> io::Result<()> {
    stats.record_error();

    let (code, short) = error.status();
    let body = format!(
        "<html><title>{SERVER_NAME} error</title><body bgcolor=\"fffff\">\r\n\
         {code}: {short}\r\n\
         <p>{}: {cause}\r\n\
         <hr>{SERVER_NAME}\r\n",
        error.detail(),
    );
    let head = format!(
        "HTTP/1.0 {code} {short}\r\nContent-Type: text/html\r\nContent-Length: {}\r\n{}\r\n",
        body.len(),
        stat_block(conn, stats),
    );
    info!("{code} {short}: {cause}");

    let mut stream = conn.stream();
    stream.write_all(head.as_bytes())?;
    stream.write_all(body.as_bytes())
}

// STAT HEADERS

#[inline]
fn stat_block(conn: &Conn, stats: &WorkerStats) -> String {
    format_stats(conn.arrival_epoch(), conn.dispatch_delay(), stats)
}

/// The six stat headers, in their fixed order. The dispatch stat is an
/// elapsed interval, not an absolute time; microseconds are zero-padded
/// to six digits.
fn format_stats(arrival: Duration, dispatch: Duration, stats: &WorkerStats) -> String {
    format!(
        "Stat-Req-Arrival:: {}.{:06}\r\n\
         Stat-Req-Dispatch:: {}.{:06}\r\n\
         Stat-Thread-Id:: {}\r\n\
         Stat-Thread-Count:: {}\r\n\
         Stat-Thread-Static:: {}\r\n\
         Stat-Thread-Dynamic:: {}\r\n",
        arrival.as_secs(),
        arrival.subsec_micros(),
        dispatch.as_secs(),
        dispatch.subsec_micros(),
        stats.id(),
        stats.handled(),
        stats.static_hits(),
        stats.dynamic_hits(),
    )
}
