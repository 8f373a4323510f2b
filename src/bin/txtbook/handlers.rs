//! Subcommand implementations.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::util::TryInitError;
use txtbook::download::{DownloadOptions, Downloader, Fetch, ImageSeries};
use txtbook::epub::retitle_epub;
use txtbook::pipeline::{
    BuildOptions, BuildReport, build_epub, clean_image_dir, find_txt_files, title_from_path,
};

use crate::args::{BatchArgs, BuildArgs, FetchArgs, RetitleArgs};
use crate::settings::{LoadError, Settings};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Txtbook(#[from] txtbook::Error),
    #[error(transparent)]
    Settings(#[from] LoadError),
    #[error("failed to install logging: {0}")]
    Telemetry(#[from] TryInitError),
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("no images were downloaded")]
    NoImages,
    #[error("{succeeded}/{total} succeeded")]
    Partial { succeeded: usize, total: usize },
}

pub fn build(args: BuildArgs, settings: &Settings) -> Result<(), CliError> {
    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("epub"));
    let options = BuildOptions {
        title: args.title,
        encoding: args.encoding,
        images_dir: args.images.unwrap_or_else(|| settings.images_dir.clone()),
        ..build_options(settings)
    };

    let report = build_epub(&args.input, &output, &options)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

pub fn fetch(args: FetchArgs, settings: &Settings) -> Result<(), CliError> {
    let series = ImageSeries::parse(&args.url)?;
    let out = args.out.unwrap_or_else(|| settings.images_dir.clone());
    let options = DownloadOptions {
        max_failures: args.max_failures.unwrap_or(settings.download.max_failures),
        ..settings.download.clone()
    };

    println!("prefix:  {}", series.prefix);
    println!("start:   {}", series.start);
    println!("format:  {}", series.extension);

    let report = Downloader::http(options)?.run(&series, &out)?;
    println!("saved {} images to {}", report.saved, out.display());
    if report.saved == 0 {
        return Err(CliError::NoImages);
    }
    Ok(())
}

pub fn retitle(args: RetitleArgs) -> Result<(), CliError> {
    let total = args.files.len();
    let mut succeeded = 0;

    for file in &args.files {
        let title = match args.title {
            Some(ref title) => title.clone(),
            None => title_from_path(file),
        };
        match retitle_epub(file, &title) {
            Ok(()) => {
                println!("{} -> {title}", file.display());
                succeeded += 1;
            }
            Err(e) => eprintln!("error: {}: {e}", file.display()),
        }
    }

    finish(succeeded, total)
}

pub fn batch(args: BatchArgs, settings: &Settings) -> Result<(), CliError> {
    let files = find_txt_files(&args.dir)?;
    if files.is_empty() {
        println!("no .txt files found in {}", args.dir.display());
        return Ok(());
    }

    println!("found {} .txt files:", files.len());
    for (i, file) in files.iter().enumerate() {
        println!("  {}. {}", i + 1, display_name(file));
    }

    let selected = select_files(&files, &args.select);
    if selected.is_empty() {
        println!("nothing to process");
        return Ok(());
    }

    let downloader = Downloader::http(settings.download.clone())?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    let mut succeeded = 0;
    for file in &selected {
        println!();
        println!("== {}", display_name(file));
        let Some(url) = prompt_url(&mut input, &mut stdout)? else {
            println!("skipped {}", display_name(file));
            continue;
        };

        match process_file(file, &url, &downloader, &args, settings) {
            Ok(report) => {
                print_report(&report);
                succeeded += 1;
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "batch item failed");
                eprintln!("error: {}: {e}", display_name(file));
            }
        }
    }

    println!();
    finish(succeeded, selected.len())
}

/// Fetch the images for one source file and build it.
fn process_file<F: Fetch>(
    file: &Path,
    url: &str,
    downloader: &Downloader<F>,
    args: &BatchArgs,
    settings: &Settings,
) -> Result<BuildReport, CliError> {
    let series = ImageSeries::parse(url)?;
    if !args.keep_images {
        clean_image_dir(&settings.images_dir)?;
    }

    let download = downloader.run(&series, &settings.images_dir)?;
    if download.saved == 0 {
        return Err(CliError::NoImages);
    }
    println!("downloaded {} images", download.saved);

    let options = BuildOptions {
        encoding: args.encoding.clone(),
        ..build_options(settings)
    };
    Ok(build_epub(file, &file.with_extension("epub"), &options)?)
}

/// Ask for the first image URL. `None` on empty input or end of input.
fn prompt_url<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<String>> {
    write!(out, "first image URL (empty to skip): ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let url = line.trim();
    Ok((!url.is_empty()).then(|| url.to_string()))
}

/// Files picked by 1-based index, in the order given. Empty selection means all.
fn select_files(files: &[PathBuf], select: &[usize]) -> Vec<PathBuf> {
    if select.is_empty() {
        return files.to_vec();
    }
    select
        .iter()
        .filter_map(|&index| {
            let file = index.checked_sub(1).and_then(|i| files.get(i));
            if file.is_none() {
                tracing::warn!(index, "selection out of range");
            }
            file.cloned()
        })
        .collect()
}

fn build_options(settings: &Settings) -> BuildOptions {
    BuildOptions {
        author: settings.book.author.clone(),
        language: settings.book.language.clone(),
        identifier: settings.book.identifier.clone(),
        images_dir: settings.images_dir.clone(),
        ..Default::default()
    }
}

fn print_report(report: &BuildReport) {
    println!(
        "built {} ({} chapters, {} headings, {} images{})",
        report.output.display(),
        report.chapters,
        report.headings,
        report.images,
        if report.has_cover { ", cover" } else { "" }
    );
}

fn finish(succeeded: usize, total: usize) -> Result<(), CliError> {
    println!("done: {succeeded}/{total} succeeded");
    if succeeded < total {
        return Err(CliError::Partial { succeeded, total });
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
