use crate::config::Policy;
use crate::errors::ServerError;
use crate::server::admission::Intake;
use crate::server::connection::Conn;
use crate::server::worker::{self, WorkerStats};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use tracing::{trace, warn};

/// Produces one HTTP response on an accepted connection.
///
/// Invoked by a worker thread outside the intake lock, with the worker's
/// own [`WorkerStats`]. Implementations must update the stats counters
/// before composing response headers; the counters appear verbatim in
/// the header block. The worker closes the socket afterwards regardless
/// of the outcome, so implementations never need to.
///
/// # Examples
///
/// ```
/// use floodgate::{Conn, Responder, WorkerStats};
/// use std::io::{self, Write};
///
/// struct Teapot;
///
/// impl Responder for Teapot {
///     fn respond(&self, conn: &mut Conn, stats: &mut WorkerStats) -> io::Result<()> {
///         stats.record_error();
///         let mut stream = conn.stream();
///         stream.write_all(b"HTTP/1.0 418 I'm a teapot\r\n\r\n")
///     }
/// }
/// ```
pub trait Responder: Send + Sync + 'static {
    /// Reads the request from `conn`'s socket and writes the response.
    ///
    /// # Errors
    ///
    /// I/O failures are logged by the calling worker and otherwise
    /// ignored; they never terminate the worker.
    fn respond(&self, conn: &mut Conn, stats: &mut WorkerStats) -> io::Result<()>;
}

/// The assembled server: a listening socket, a bounded intake, and an
/// already-running worker pool.
///
/// Built via [`Server::builder`]; [`Server::launch`] turns the calling
/// thread into the acceptor and never returns.
pub struct Server {
    listener: TcpListener,
    intake: Arc<Intake>,
}

impl Server {
    /// Creates a listening socket on `port` (all IPv4 interfaces), with
    /// address reuse enabled.
    pub fn bind(port: u16) -> Result<TcpListener, ServerError> {
        let address = SocketAddr::from(([0, 0, 0, 0], port));
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .and_then(|socket| {
                socket.set_reuse_address(true)?;
                socket.bind(&address.into())?;
                socket.listen(1024)?;
                Ok(socket)
            })
            .map_err(|source| ServerError::Bind { port, source })?;
        Ok(socket.into())
    }

    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder<R: Responder>() -> ServerBuilder<R> {
        ServerBuilder {
            listener: None,
            responder: None,
            workers: 4,
            capacity: 16,
            policy: Policy::Block,
        }
    }

    /// Runs the acceptor loop on the calling thread.
    ///
    /// Accept, stamp the arrival time, hand the record to admission;
    /// nothing else happens on this thread. Accept failures are logged
    /// and skipped. There is no shutdown path: the process runs until
    /// killed, and in-flight requests are not drained.
    pub fn launch(self) -> ! {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    trace!(%peer, "accepted connection");
                    self.intake.admit(Conn::accepted(stream));
                }
                Err(err) => warn!(%err, "accept failed"),
            }
        }
    }
}

/// Builder for configuring and creating [`Server`] instances.
///
/// `listener` and `responder` are required; `workers` (default 4),
/// `capacity` (default 16) and `policy` (default [`Policy::Block`]) have
/// working defaults. `build` spawns the worker pool.
pub struct ServerBuilder<R: Responder> {
    listener: Option<TcpListener>,
    responder: Option<Arc<R>>,
    workers: usize,
    capacity: usize,
    policy: Policy,
}

impl<R: Responder> ServerBuilder<R> {
    /// Sets the TCP listener the acceptor loop will drain.
    ///
    /// **This is a required component.**
    #[inline]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the responder invoked by workers for each dispatched request.
    ///
    /// **This is a required component.**
    #[inline]
    pub fn responder(mut self, responder: R) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Sets the number of worker threads.
    #[inline]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the intake capacity: waiting plus in-flight requests.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the overload policy applied when the intake is at capacity.
    #[inline]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawns the worker pool and assembles the [`Server`].
    ///
    /// # Panics
    ///
    /// Panics when [`listener`](Self::listener) or
    /// [`responder`](Self::responder) was not called.
    ///
    /// # Errors
    ///
    /// Fails if a worker thread cannot be spawned; startup failures are
    /// loud, never silent.
    #[track_caller]
    pub fn build(self) -> Result<Server, ServerError> {
        let listener = self
            .listener
            .expect("the `listener` method must be called before `build`");
        let responder = self
            .responder
            .expect("the `responder` method must be called before `build`");

        let intake = Arc::new(Intake::new(self.capacity, self.policy));
        for id in 0..self.workers {
            let intake = Arc::clone(&intake);
            let responder = Arc::clone(&responder);
            thread::Builder::new()
                .name(format!("floodgate-worker-{id}"))
                .spawn(move || worker::run(intake, responder, id))
                .map_err(ServerError::Spawn)?;
        }

        Ok(Server { listener, intake })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::FileResponder;
    use crate::tools::assert_peer_closed;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn launch(server: Server) -> SocketAddr {
        let addr = server.listener.local_addr().unwrap();
        thread::spawn(move || server.launch());
        addr
    }

    #[test]
    fn serves_a_missing_file_as_404_with_stat_headers() {
        let server = Server::builder()
            .listener(TcpListener::bind("127.0.0.1:0").unwrap())
            .responder(FileResponder::new("./no-such-content-root"))
            .workers(2)
            .capacity(4)
            .policy(Policy::Block)
            .build()
            .unwrap();
        let addr = launch(server);

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /nothing.html HTTP/1.0\r\nHost: test\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(
            response.starts_with("HTTP/1.0 404 Not found"),
            "unexpected response: {response}"
        );
        #[rustfmt::skip]
        let headers = [
            "Stat-Req-Arrival:: ",
            "Stat-Req-Dispatch:: ",
            "Stat-Thread-Id:: ",
            "Stat-Thread-Count:: 1",
            "Stat-Thread-Static:: 0",
            "Stat-Thread-Dynamic:: 0",
        ];
        for header in headers {
            assert!(response.contains(header), "missing {header:?} in {response}");
        }
    }

    struct Panicky;

    impl Responder for Panicky {
        fn respond(&self, _: &mut Conn, _: &mut WorkerStats) -> io::Result<()> {
            panic!("nope");
        }
    }

    #[test]
    fn worker_pool_survives_responder_panics() {
        let server = Server::builder()
            .listener(TcpListener::bind("127.0.0.1:0").unwrap())
            .responder(Panicky)
            .workers(1)
            .capacity(2)
            .policy(Policy::Block)
            .build()
            .unwrap();
        let addr = launch(server);

        // The single worker panics on both requests; if the first panic
        // killed it, the second socket would never be closed.
        for _ in 0..2 {
            let mut client = TcpStream::connect(addr).unwrap();
            client.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
            assert_peer_closed(&mut client);
        }
    }
}
