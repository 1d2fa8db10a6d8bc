use crate::module::options::{LookupOptions, RedisOptions};
use structopt::StructOpt;

/// Options for the lookup module
#[derive(Debug, StructOpt)]
pub struct Options {
    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub lookup: LookupOptions,

    /// Credential forwarded to the catalog, with or without `Bearer ` scheme
    #[structopt(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Identifier of the article to look up
    #[structopt(name = "article-id")]
    pub article_id: String,
}
