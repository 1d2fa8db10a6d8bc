use crate::library::helpers::parse_seconds;
use crate::module::options::{QueueingOptions, RedisOptions};
use std::time::Duration;
use structopt::StructOpt;

/// Options for the responder module
#[derive(Debug, StructOpt)]
pub struct Options {
    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub queueing: QueueingOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    /// Base URL of the catalog REST API
    #[structopt(
        long = "catalog-url",
        env = "CATALOG_URL",
        default_value = "http://localhost:3002",
        value_name = "url"
    )]
    pub catalog_url: String,

    /// Seconds the catalog may take to answer a single lookup
    #[structopt(
        long = "upstream-timeout",
        env = "UPSTREAM_TIMEOUT",
        default_value = "5",
        parse(try_from_str = parse_seconds),
        value_name = "seconds"
    )]
    pub upstream_timeout: Duration,
}
