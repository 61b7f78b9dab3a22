//! floodgate - threaded HTTP/1.0 file server with bounded admission
//!
//! A small serving engine built around an admission-control core: every
//! accepted connection passes through a bounded intake that multiplexes it
//! over a fixed pool of worker threads. When offered load exceeds capacity,
//! one of four overload policies decides what happens to the new arrival:
//! park the acceptor, reject the arrival, evict the oldest waiter, or purge
//! the older half of the waiters.
//!
//! # Architecture
//!
//! ```text
//! [ accept ] --> [ admission (policy) ] --> [ bounded FIFO ] --> [ worker pool ]
//!                       |                                              |
//!                       \--- drop / evict on overload                  \--> respond, close
//! ```
//!
//! One acceptor thread and `n` worker threads share a single mutex and two
//! condition variables. The acceptor may park under the [`Policy::Block`]
//! policy; workers park while no work is queued. The lock is never held
//! across I/O.
//!
//! # Quick Start
//!
//! ```no_run
//! use floodgate::{FileResponder, Policy, Server};
//!
//! let listener = Server::bind(8080).unwrap();
//!
//! Server::builder()
//!     .listener(listener)
//!     .responder(FileResponder::default())
//!     .workers(8)
//!     .capacity(32)
//!     .policy(Policy::DropHead)
//!     .build()
//!     .unwrap()
//!     .launch();
//! ```
//!
//! The binary target wires the same pieces to the legacy command line
//! `server <port> <threads> <queue_size> <schedalg>`.
//!
//! # Protocol surface
//!
//! HTTP/1.0, GET only. Static files are served from a content root
//! (`./public` by default); URIs containing `cgi` are executed as CGI
//! programs with the query string in `QUERY_STRING` and the client socket as
//! stdout. Every response (success or error) carries six `Stat-*::`
//! headers reporting arrival time, dispatch delay, and the serving worker's
//! request counters.
pub(crate) mod http {
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod admission;
    pub(crate) mod connection;
    pub(crate) mod queue;
    pub(crate) mod server_impl;
    pub(crate) mod worker;
}
pub mod config;
pub(crate) mod errors;

pub use crate::{
    config::{Config, Policy},
    errors::ServerError,
    http::response::FileResponder,
    server::{
        connection::Conn,
        server_impl::{Responder, Server, ServerBuilder},
        worker::WorkerStats,
    },
};
