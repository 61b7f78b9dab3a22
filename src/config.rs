//! Command-line configuration and the overload policy selector.

use clap::Parser;
use std::num::NonZeroUsize;
use std::{env, process};

/// Server configuration, parsed from the legacy positional command line:
///
/// ```text
/// server <port> <threads> <queue_size> <schedalg>
/// ```
///
/// - `port`: TCP port to listen on.
/// - `threads`: number of worker threads (≥ 1).
/// - `queue_size`: total capacity, waiters plus in-flight requests (must be at least 1).
/// - `schedalg`: overload policy, one of `block`, `dt`, `dh`, `random`.
///
/// Anything the command line fails to supply (or supplies malformed) prints
/// the usage line to stderr and exits with code 1.
#[derive(Parser, Debug, Clone)]
#[command(name = "server")]
pub struct Config {
    /// TCP port to listen on
    pub port: u16,

    /// Number of worker threads
    pub threads: NonZeroUsize,

    /// Total capacity: waiting + in-flight requests
    pub queue_size: NonZeroUsize,

    /// Overload policy: block | dt | dh | random
    pub schedalg: String,
}

impl Config {
    /// Parses the process arguments, exiting with the usage line on failure.
    pub fn from_args() -> Self {
        Self::try_parse().unwrap_or_else(|_| {
            let program = env::args().next().unwrap_or_else(|| "server".into());
            eprintln!("Usage: {program} <port> <threads> <queue_size> <schedalg>");
            process::exit(1);
        })
    }

    /// The overload policy selected by `schedalg`.
    #[inline]
    pub fn policy(&self) -> Policy {
        Policy::from_arg(&self.schedalg)
    }
}

/// Rule applied when a new arrival would exceed the intake capacity.
///
/// Fixed at startup; dispatched inline inside the admission critical
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Park the acceptor until a slot frees, then admit the arrival.
    Block,
    /// Reject the new arrival; the wait queue is unchanged.
    DropTail,
    /// Evict the oldest waiter and admit the new arrival in its place.
    DropHead,
    /// Evict the older half of the waiters (`⌈W/2⌉`), then admit the
    /// new arrival.
    RandomHalf,
    /// Selected by unrecognized `schedalg` strings: every overload-branch
    /// arrival is dropped.
    Unknown,
}

impl Policy {
    /// Maps a `schedalg` argument to a policy. Unknown strings select
    /// [`Policy::Unknown`] rather than failing, matching the legacy
    /// command-line contract.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "block" => Policy::Block,
            "dt" => Policy::DropTail,
            "dh" => Policy::DropHead,
            "random" => Policy::RandomHalf,
            _ => Policy::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_from_arg() {
        #[rustfmt::skip]
        let cases = [
            ("block",  Policy::Block),
            ("dt",     Policy::DropTail),
            ("dh",     Policy::DropHead),
            ("random", Policy::RandomHalf),

            ("",       Policy::Unknown),
            ("BLOCK",  Policy::Unknown),
            ("drop",   Policy::Unknown),
            ("rand",   Policy::Unknown),
        ];

        for (arg, expected) in cases {
            assert_eq!(Policy::from_arg(arg), expected);
        }
    }

    #[test]
    fn parses_positional_arguments() {
        let config =
            Config::try_parse_from(["server", "8080", "4", "16", "dh"]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.threads.get(), 4);
        assert_eq!(config.queue_size.get(), 16);
        assert_eq!(config.policy(), Policy::DropHead);
    }

    #[test]
    fn rejects_missing_and_malformed_arguments() {
        assert!(Config::try_parse_from(["server", "8080", "4", "16"]).is_err());
        assert!(Config::try_parse_from(["server", "8080", "0", "16", "dt"]).is_err());
        assert!(Config::try_parse_from(["server", "8080", "4", "0", "dt"]).is_err());
        assert!(Config::try_parse_from(["server", "not-a-port", "4", "16", "dt"]).is_err());
    }
}
