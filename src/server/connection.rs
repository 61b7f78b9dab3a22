use std::net::TcpStream;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One accepted TCP connection, from `accept` to socket close.
///
/// Exactly one holder owns a `Conn` at any time: the acceptor between
/// accept and admission, the intake FIFO while the request waits, and a
/// single worker from dequeue to close. Dropping the record closes the
/// socket, so eviction and queue teardown release the client without any
/// extra bookkeeping.
#[derive(Debug)]
pub struct Conn {
    pub(crate) stream: TcpStream,
    arrival: SystemTime,
    dispatch: Option<SystemTime>,
}

impl Conn {
    /// Wraps a freshly accepted stream, stamping the arrival time.
    #[inline]
    pub(crate) fn accepted(stream: TcpStream) -> Self {
        Self {
            stream,
            arrival: SystemTime::now(),
            dispatch: None,
        }
    }

    /// Stamps the dispatch time. Called by the worker that dequeued the
    /// record, while the intake lock is still held.
    #[inline]
    pub(crate) fn mark_dispatched(&mut self) {
        self.dispatch = Some(SystemTime::now());
    }

    /// The client socket. The responder reads the request from it and
    /// writes the response to it.
    #[inline]
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Arrival instant as a duration since the Unix epoch.
    #[inline]
    pub fn arrival_epoch(&self) -> Duration {
        self.arrival
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }

    /// Elapsed interval between arrival and dispatch.
    ///
    /// Zero if the record has not been dispatched, or if the wall clock
    /// stepped backwards in between.
    #[inline]
    pub fn dispatch_delay(&self) -> Duration {
        self.dispatch
            .and_then(|dispatch| dispatch.duration_since(self.arrival).ok())
            .unwrap_or(Duration::ZERO)
    }

    #[cfg(test)]
    pub(crate) fn with_times(
        stream: TcpStream,
        arrival: SystemTime,
        dispatch: Option<SystemTime>,
    ) -> Self {
        Self {
            stream,
            arrival,
            dispatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{assert_peer_closed, socket_pair};

    #[test]
    fn drop_closes_socket() {
        let (mut client, server) = socket_pair();
        let conn = Conn::accepted(server);

        drop(conn);
        assert_peer_closed(&mut client);
    }

    #[test]
    fn dispatch_delay_is_elapsed_interval() {
        let (_client, server) = socket_pair();
        let arrival = UNIX_EPOCH + Duration::new(100, 250_000);
        let dispatch = arrival + Duration::new(2, 500_000);
        let conn = Conn::with_times(server, arrival, Some(dispatch));

        assert_eq!(conn.arrival_epoch(), Duration::new(100, 250_000));
        assert_eq!(conn.dispatch_delay(), Duration::new(2, 500_000));
    }

    #[test]
    fn dispatch_delay_defaults_to_zero() {
        let (_client, server) = socket_pair();
        let conn = Conn::accepted(server);

        assert_eq!(conn.dispatch_delay(), Duration::ZERO);
    }
}
