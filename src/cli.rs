use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipserve")]
#[command(version)]
#[command(about = "Serve the contents of a ZIP archive over HTTP", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipserve site.zip                      serve site.zip on 127.0.0.1:8080\n  \
  zipserve site.zip --prefix /static     serve under /static/\n  \
  zipserve -l site.zip                   list files in site.zip\n  \
  zipserve -p site.zip docs | more       print docs/index.html via pipe into more")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Files to print with -p (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print files to stdout instead of serving
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8080", env = "ZIPSERVE_LISTEN")]
    pub listen: SocketAddr,

    /// URL prefix the archive is mounted under
    #[arg(long, default_value = "/", env = "ZIPSERVE_PREFIX")]
    pub prefix: String,

    /// Refuse to start unless the archive declares this content type
    #[arg(long, value_name = "MIME", env = "ZIPSERVE_CONTENT_TYPE")]
    pub content_type: Option<String>,
}

impl Cli {
    pub fn is_listing(&self) -> bool {
        self.list || self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    /// Default tracing directives; `RUST_LOG` adds to these.
    pub fn log_directives(&self) -> &'static [&'static str] {
        if !self.is_quiet() {
            &["zipserve=info", "tower_http=info"]
        } else if self.quiet <= 1 {
            &["zipserve=warn", "tower_http=warn"]
        } else {
            &["zipserve=error", "tower_http=error"]
        }
    }
}
