use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dlx_engine::ProxyType;

#[derive(Parser, Debug)]
#[command(name = "dlx", author, version, about = "Resumable multi-part media downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level for dlx itself (trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download media from one or more URLs
    Download {
        /// Page or media URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Stream id to download instead of the largest one
        #[arg(short = 'f', long)]
        stream: Option<String>,

        /// Output directory
        #[arg(short = 'o', long, default_value = ".")]
        output_dir: PathBuf,

        /// Output file name, without extension
        #[arg(short = 'O', long)]
        output_name: Option<String>,

        /// Merge tool executable
        #[arg(long, default_value = dlx_engine::DEFAULT_MERGE_TOOL)]
        ffmpeg: PathBuf,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// List the streams of one or more URLs without downloading
    Info {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Cookie header value or Netscape cookie-file contents
    #[arg(short = 'c', long, env = "DLX_COOKIE")]
    pub cookie: Option<String>,

    /// User-Agent override
    #[arg(short = 'u', long, env = "DLX_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Referer sent with every request
    #[arg(short = 'r', long)]
    pub referer: Option<String>,

    /// Attempts per HTTP request
    #[arg(long = "retry", default_value_t = 5)]
    pub retry: u32,

    /// Log every HTTP request
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Skip TLS certificate validation
    #[arg(long)]
    pub insecure: bool,

    /// Proxy server URL
    #[arg(long)]
    pub proxy: Option<String>,

    /// Proxy protocol
    #[arg(long, value_enum, default_value = "http")]
    pub proxy_type: ProxyType,

    /// Proxy username
    #[arg(long, requires = "proxy")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, requires = "proxy_user")]
    pub proxy_pass: Option<String>,

    /// Ignore system proxy settings
    #[arg(long)]
    pub no_system_proxy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Extract the whole playlist
    #[arg(short = 'p', long)]
    pub playlist: bool,

    /// Playlist items to fetch, e.g. 1,5,6,8-10
    #[arg(long)]
    pub items: Option<String>,

    /// First playlist item
    #[arg(long)]
    pub item_start: Option<u32>,

    /// Last playlist item
    #[arg(long)]
    pub item_end: Option<u32>,

    /// Concurrent extraction requests for playlists
    #[arg(short = 'n', long)]
    pub threads: Option<usize>,

    /// Name episode files by episode title only
    #[arg(long)]
    pub episode_title_only: bool,

    /// Site token as key=value (repeatable)
    #[arg(long = "token", value_name = "KEY=VALUE")]
    pub tokens: Vec<String>,
}
