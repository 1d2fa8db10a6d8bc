//! Various options usable by modules
//!
//! The structs in this module allow other modules to flatten them into
//! their own options struct. This allows for a unified yet non-cluttered
//! option set.

use crate::library::helpers::parse_seconds;
use std::time::Duration;
use structopt::StructOpt;

/// Options for connecting to the Redis server
#[derive(Debug, StructOpt)]
pub struct RedisOptions {
    /// Redis database server URL
    #[structopt(
        short = "r",
        long = "redis",
        env = "REDIS",
        default_value = "redis://localhost/",
        value_name = "url"
    )]
    pub url: String,
}

/// Options relevant for message queueing
#[derive(Debug, StructOpt)]
pub struct QueueingOptions {
    /// Unique and stable identifier for this instance.
    /// It is used to identify and resume work after a crash
    /// or deliberate restart, thus it may not change across
    /// executions!
    #[structopt(long, env)]
    pub id: String,
}

/// Options for article lookups over the broker
#[derive(Debug, StructOpt)]
pub struct LookupOptions {
    /// Seconds to wait for a reply before treating the article as unavailable
    #[structopt(
        long = "timeout",
        env = "LOOKUP_TIMEOUT",
        default_value = "10",
        parse(try_from_str = parse_seconds),
        value_name = "seconds"
    )]
    pub timeout: Duration,
}
