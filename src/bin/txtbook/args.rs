//! Command-line surface for `txtbook`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

#[derive(Parser, Debug)]
#[command(name = "txtbook", version, about = "Compile illustrated text novels into EPUB", long_about = None)]
#[command(after_help = "EXAMPLES:
    txtbook build novel.txt                 Build novel.epub using ./pics
    txtbook fetch https://host/a/185077.jpg Download numbered images into ./pics
    txtbook retitle *.epub                  Set each title to its file name
    txtbook batch                           Fetch and build every .txt here")]
pub struct Cli {
    /// Extra configuration file, layered over ./txtbook.toml
    #[arg(long, global = true, env = "TXTBOOK_CONFIG_FILE", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a text file and its images into an EPUB
    Build(BuildArgs),
    /// Download a numbered image sequence
    Fetch(FetchArgs),
    /// Rewrite the title of existing EPUB files
    Retitle(RetitleArgs),
    /// Fetch images and build every .txt file in a directory
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Source text file
    #[arg(value_name = "TXT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output EPUB (defaults to the input with an .epub extension)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Directory holding 1.jpg, 2.png, ...
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub images: Option<PathBuf>,

    /// Book title (defaults to the file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Source encoding label, e.g. gbk or big5
    #[arg(long)]
    pub encoding: Option<String>,

    /// Print the build report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Full URL of the first image
    #[arg(value_name = "URL", value_hint = ValueHint::Url)]
    pub url: String,

    /// Output directory (defaults to the configured image directory)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out: Option<PathBuf>,

    /// Stop after this many failures in a row
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_failures: Option<u32>,
}

#[derive(Args, Debug)]
pub struct RetitleArgs {
    /// EPUB files to patch
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// New title (defaults to each file's name)
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory to scan for .txt files
    #[arg(default_value = ".", value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,

    /// Only process these files (1-based, comma separated)
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<usize>,

    /// Do not clear the image directory before each download
    #[arg(long)]
    pub keep_images: bool,

    /// Source encoding label
    #[arg(long)]
    pub encoding: Option<String>,
}
