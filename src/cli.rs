use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scroll a reader open in a WebDriver session and save the book.
    Crawl(CrawlArgs),
    /// Build a book from a recorded reader session (JSON lines).
    Replay(ReplayArgs),
    /// Transform one saved chapter and print the result as JSON.
    Transform(TransformArgs),
}

/// Settings shared by every command that drives a reader.
#[derive(Debug, Args)]
pub struct CrawlOptions {
    /// YAML config file (reader profile, book layout, crawl settings).
    #[arg(long)]
    pub config: Option<String>,

    /// Consecutive 100% readings required before stopping.
    #[arg(long)]
    pub completion_threshold: Option<u32>,

    /// Scroll by this multiple of the page height per step.
    #[arg(long, conflicts_with = "scroll_pixels")]
    pub scroll_factor: Option<f64>,

    /// Scroll by a fixed number of pixels per step.
    #[arg(long)]
    pub scroll_pixels: Option<i64>,

    /// Pause between steps.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Id of an existing WebDriver session showing the reader.
    #[arg(long)]
    pub session: String,

    /// WebDriver endpoint (overrides SCROLLBOOK_WEBDRIVER_URL and the config).
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Output directory for the book (must not exist).
    #[arg(long, conflicts_with = "root")]
    pub out: Option<String>,

    /// Without --out, the book goes to a folder named after the title here.
    #[arg(long)]
    pub root: Option<String>,

    /// Book title (defaults to the page title).
    #[arg(long)]
    pub title: Option<String>,

    /// Timeout for each WebDriver request.
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    #[command(flatten)]
    pub options: CrawlOptions,
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Recording file, one `{"percent", "html"}` frame per line.
    #[arg(long)]
    pub recording: String,

    /// Output directory for the book (must not exist).
    #[arg(long, conflicts_with = "root")]
    pub out: Option<String>,

    /// Without --out, the book goes to a folder named after the title here.
    #[arg(long)]
    pub root: Option<String>,

    /// Book title.
    #[arg(long, default_value = "Book")]
    pub title: String,

    #[command(flatten)]
    pub options: CrawlOptions,
}

#[derive(Debug, Args)]
pub struct TransformArgs {
    /// Chapter markup file.
    #[arg(long)]
    pub input: String,

    /// YAML config file.
    #[arg(long)]
    pub config: Option<String>,

    /// Directory written into manifest entries (defaults to the image folder).
    #[arg(long)]
    pub image_dir: Option<String>,

    /// Use deterministic heading ids instead of random ones.
    #[arg(long)]
    pub sequential_ids: bool,
}
