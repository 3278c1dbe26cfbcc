use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cloudstash_core::UrlType;

/// Cloudstash CLI - terminal client for the configured object container
#[derive(Parser, Debug)]
#[command(name = "cloudstash")]
#[command(author = "Cloudstash Team")]
#[command(version)]
#[command(about = "Manage objects in a Cloud Files container", long_about = None)]
pub struct Cli {
    /// Emit JSON log lines (overrides log.json)
    #[arg(long = "json-logs", global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List objects, optionally restricted to a name prefix
    List {
        /// Name prefix
        prefix: Option<String>,
    },

    /// Check whether an object exists
    Has {
        /// Object name
        name: String,
    },

    /// Print object metadata as JSON
    Stat {
        /// Object name
        name: String,
    },

    /// Upload an object from a file or inline text
    Put {
        /// Object name
        name: String,

        /// Local file to upload
        #[arg(short = 'f', long = "file", conflicts_with = "data")]
        file: Option<PathBuf>,

        /// Inline content to upload
        #[arg(short = 'd', long = "data")]
        data: Option<String>,

        /// Content type stored with the object
        #[arg(short = 't', long = "content-type")]
        content_type: String,
    },

    /// Delete an object
    Rm {
        /// Object name
        name: String,
    },

    /// Purge an object from the CDN cache
    Purge {
        /// Object name
        name: String,
    },

    /// Print the public URL of an object
    Url {
        /// Object name
        name: String,

        /// Delivery variant (ssl, streaming, ios)
        #[arg(long = "type")]
        url_type: Option<UrlType>,
    },

    /// Print the base URL of the container
    ContainerUrl {
        /// Use https instead of http
        #[arg(long = "secure")]
        secure: bool,
    },
}
