//! PDF Studio CLI tool
//!
//! Runs each PDF operation on local files, or serves them all over HTTP.

use std::fs;
use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use tracing_subscriber::EnvFilter;

use pdf_studio::color::Rgb;
use pdf_studio::config::{ServiceConfig, DEFAULT_MAX_UPLOAD_BYTES};
use pdf_studio::convert::tools::DEFAULT_DPI;
use pdf_studio::convert::{Artifact, TargetFormat};
use pdf_studio::layout::Placement;
use pdf_studio::ops::{self, EncryptOptions, RotateOptions, WatermarkOptions};
use pdf_studio::pdf::{extract_metadata, FontBook};
use pdf_studio::server::Server;
use pdf_studio::session::SessionRoot;

/// PDF Studio - Split, merge, rotate, protect, watermark and edit PDFs
#[derive(Parser)]
#[command(name = "pdf-studio")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Keep pages 1-3 and 5
    pdf-studio split report.pdf --pages 1-3,5 -o excerpt.pdf

    # Merge numbered PDFs in order
    pdf-studio merge \"[0-9]*.pdf\" -o handout.pdf

    # Tile a diagonal DRAFT stamp over every page
    pdf-studio watermark report.pdf --text DRAFT --position tile --rotation 45 -o draft.pdf

    # Start the local service on the first free port from 3000
    pdf-studio serve")]
struct Cli {
    /// Directory with *-Regular / *-Bold .ttf or .otf fonts (default: Helvetica)
    #[arg(long, global = true, env = "PDF_STUDIO_FONTS_DIR")]
    fonts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract pages into a new PDF
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Pages to keep, e.g. "1-3,5,7-9" or "all"
        #[arg(short, long)]
        pages: String,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rotate pages clockwise
    Rotate {
        /// Input PDF file
        input: PathBuf,

        /// Pages to rotate, e.g. "1-2" or "all"
        #[arg(short, long, default_value = "all")]
        pages: String,

        /// Degrees: 90, 180 or 270
        #[arg(short, long, default_value_t = 90)]
        angle: i64,

        /// Leave out the pages that are not rotated
        #[arg(long)]
        drop_unspecified: bool,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp a text or image watermark
    Watermark {
        /// Input PDF file
        input: PathBuf,

        #[command(flatten)]
        stamp: StampArgs,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Draw text, signatures and checkboxes from a JSON element list
    Edit {
        /// Input PDF file
        input: PathBuf,

        /// JSON file holding the element array
        #[arg(short, long)]
        elements: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Protect a PDF with a password
    Encrypt {
        /// Input PDF file
        input: PathBuf,

        #[arg(long, env = "PDF_STUDIO_PASSWORD", hide_env_values = true)]
        password: String,

        /// Forbid printing
        #[arg(long)]
        no_printing: bool,

        /// Forbid adding annotations
        #[arg(long)]
        no_commenting: bool,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove password protection
    Decrypt {
        /// Input PDF file
        input: PathBuf,

        #[arg(long, env = "PDF_STUDIO_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert a PDF to docx/png/jpg, or text and images to PDF
    Convert {
        /// Input files; several only when converting images to PDF
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target format: pdf, docx, png or jpg
        #[arg(short, long)]
        to: String,

        /// Output file path (default: the generated name next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, env = "PDF_STUDIO_PDFTOPPM", default_value = "pdftoppm")]
        pdftoppm: PathBuf,

        #[arg(long, env = "PDF_STUDIO_SOFFICE")]
        soffice: Option<PathBuf>,

        /// Raster resolution for png/jpg
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u32,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },

    /// Run the local HTTP service
    Serve {
        #[arg(long, env = "PDF_STUDIO_HOST", default_value = "127.0.0.1")]
        host: IpAddr,

        /// 0 finds the first free port from 3000
        #[arg(long, env = "PDF_STUDIO_PORT", default_value_t = 0)]
        port: u16,

        /// Parent of per-request working directories
        #[arg(long, env = "PDF_STUDIO_TEMP_ROOT")]
        temp_root: Option<PathBuf>,

        #[arg(long, env = "PDF_STUDIO_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: usize,

        #[arg(long, env = "PDF_STUDIO_PDFTOPPM", default_value = "pdftoppm")]
        pdftoppm: PathBuf,

        #[arg(long, env = "PDF_STUDIO_SOFFICE")]
        soffice: Option<PathBuf>,

        #[arg(long, env = "PDF_STUDIO_RASTER_DPI", default_value_t = DEFAULT_DPI)]
        dpi: u32,
    },
}

#[derive(Args)]
struct StampArgs {
    /// Watermark text (use \n for line breaks)
    #[arg(long, conflicts_with = "image", required_unless_present = "image")]
    text: Option<String>,

    /// PNG or JPEG watermark image
    #[arg(long)]
    image: Option<PathBuf>,

    /// 0.0 to 1.0
    #[arg(long, default_value_t = 0.5)]
    opacity: f32,

    /// Degrees counter-clockwise
    #[arg(long, default_value_t = 0.0)]
    rotation: f32,

    /// center, top-left, top-right, bottom-left, bottom-right or tile
    #[arg(long, default_value = "center")]
    position: Placement,

    #[arg(long, default_value_t = 40.0)]
    font_size: f32,

    /// #RRGGBB
    #[arg(long, default_value = "#000000")]
    font_color: Rgb,

    #[arg(long)]
    bold: bool,

    /// Pages to stamp, e.g. "1-3" or "all"
    #[arg(short, long, default_value = "all")]
    pages: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Logs go to stderr; stdout carries the PORT= handshake
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdf_studio=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let fonts_dir = cli.fonts_dir;
    let fonts = || match &fonts_dir {
        Some(dir) => FontBook::from_dir(dir),
        None => FontBook::standard(),
    };

    match cli.command {
        Commands::Split { input, pages, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &ops::split(&bytes, &pages)?)
        }
        Commands::Merge { inputs, output } => cmd_merge(inputs, output),
        Commands::Rotate {
            input,
            pages,
            angle,
            drop_unspecified,
            output,
        } => {
            let options = RotateOptions {
                pages,
                angle,
                include_unspecified: !drop_unspecified,
            };
            let bytes = read_input(&input)?;
            write_output(&output, &ops::rotate(&bytes, &options)?)
        }
        Commands::Watermark { input, stamp, output } => {
            let options = stamp.into_options()?;
            let bytes = read_input(&input)?;
            write_output(&output, &ops::add_watermark(&bytes, &options, &fonts())?)
        }
        Commands::Edit {
            input,
            elements,
            output,
        } => {
            let json = fs::read_to_string(&elements)
                .with_context(|| format!("Cannot read elements file {}", elements.display()))?;
            let bytes = read_input(&input)?;
            write_output(&output, &ops::edit(&bytes, &json, &fonts())?)
        }
        Commands::Encrypt {
            input,
            password,
            no_printing,
            no_commenting,
            output,
        } => {
            let options = EncryptOptions {
                password,
                allow_printing: !no_printing,
                allow_commenting: !no_commenting,
            };
            let bytes = read_input(&input)?;
            write_output(&output, &ops::encrypt(&bytes, &options)?)
        }
        Commands::Decrypt {
            input,
            password,
            output,
        } => {
            let bytes = read_input(&input)?;
            write_output(&output, &ops::decrypt(&bytes, &password)?)
        }
        Commands::Convert {
            inputs,
            to,
            output,
            pdftoppm,
            soffice,
            dpi,
        } => {
            let mut config = ServiceConfig {
                pdftoppm,
                raster_dpi: dpi,
                ..ServiceConfig::default()
            };
            if let Some(soffice) = soffice {
                config.soffice = soffice;
            }
            cmd_convert(&config, &fonts(), inputs, &to, output)
        }
        Commands::Info { input } => cmd_info(&input),
        Commands::Serve {
            host,
            port,
            temp_root,
            max_upload_bytes,
            pdftoppm,
            soffice,
            dpi,
        } => {
            let mut config = ServiceConfig {
                host,
                port,
                fonts_dir: fonts_dir.clone(),
                max_upload_bytes,
                pdftoppm,
                raster_dpi: dpi,
                ..ServiceConfig::default()
            };
            if let Some(temp_root) = temp_root {
                config.temp_root = temp_root;
            }
            if let Some(soffice) = soffice {
                config.soffice = soffice;
            }
            cmd_serve(config)
        }
    }
}

impl StampArgs {
    fn into_options(self) -> anyhow::Result<WatermarkOptions> {
        let mut options = match (self.text, self.image) {
            (Some(text), _) => WatermarkOptions::text(text.replace("\\n", "\n")),
            (None, Some(path)) => WatermarkOptions::image(read_input(&path)?),
            (None, None) => bail!("Either --text or --image is required"),
        };
        options.opacity = self.opacity;
        options.rotation = self.rotation;
        options.position = self.position;
        options.font_size = self.font_size;
        options.font_color = self.font_color;
        options.bold = self.bold;
        options.pages = self.pages;
        Ok(options)
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if !path.exists() {
        bail!("Input file not found: {}", path.display());
    }
    fs::read(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::write(path, bytes).with_context(|| format!("Cannot write {}", path.display()))?;
    eprintln!("Output: {}", path.display());
    Ok(())
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

fn cmd_merge(inputs: Vec<String>, output: PathBuf) -> anyhow::Result<()> {
    let inputs = expand_globs(inputs)?;

    eprintln!("Merging {} PDF files...", inputs.len());
    let contents = inputs
        .iter()
        .map(|path| read_input(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    write_output(&output, &ops::merge(&contents)?)
}

fn cmd_convert(
    config: &ServiceConfig,
    fonts: &FontBook,
    inputs: Vec<PathBuf>,
    to: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let Some(first) = inputs.first().cloned() else {
        bail!("No input files");
    };

    let artifact: Artifact = if to.trim().eq_ignore_ascii_case("pdf") {
        let files = inputs
            .iter()
            .map(|path| Ok((display_name(path), read_input(path)?)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        ops::convert_to_pdf(&files, fonts)?
    } else {
        if inputs.len() > 1 {
            bail!("Only one PDF can be converted at a time");
        }
        let target: TargetFormat = to.parse()?;
        let bytes = read_input(&first)?;
        let session = SessionRoot::new(&config.temp_root)?.acquire()?;
        let artifact = ops::convert_from_pdf(&config.converters(), &session, &display_name(&first), &bytes, target)?;
        session.close()?;
        artifact
    };

    let output = output.unwrap_or_else(|| first.with_file_name(&artifact.name));
    write_output(&output, &artifact.bytes)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn cmd_info(input: &Path) -> anyhow::Result<()> {
    let metadata = extract_metadata(&read_input(input)?)?;

    println!("File: {}", input.display());
    println!("Version: {}", metadata.version);
    println!("Pages: {}", metadata.page_count);
    println!("Encrypted: {}", if metadata.encrypted { "yes" } else { "no" });

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}

fn cmd_serve(config: ServiceConfig) -> anyhow::Result<()> {
    let server = Server::bind(&config).context("Cannot start server")?;
    let port = server.local_addr()?.port();

    // The desktop shell reads this line to learn where to connect
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "PORT={port}")?;
    stdout.flush()?;
    drop(stdout);

    let runtime = tokio::runtime::Runtime::new().context("Cannot start async runtime")?;
    runtime.block_on(server.run())?;
    Ok(())
}
