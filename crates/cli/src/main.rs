use region_caption_core::{
    config::{Config, ConfigBuilder},
    geometry::{DisplayRect, Point},
    source::ImageSource,
    CaptionFormat, RegionCaption, Session,
};
use anyhow::{bail, Context, Result};
use arboard::Clipboard;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mark a region on an image and caption it", long_about = None)]
struct Args {
    /// Local image file to caption
    #[arg(long, conflicts_with_all = ["url", "gallery"])]
    image: Option<PathBuf>,

    /// Remote image URL to caption
    #[arg(long, conflicts_with = "gallery")]
    url: Option<String>,

    /// Gallery item to caption (1-based, see --list-gallery)
    #[arg(long)]
    gallery: Option<usize>,

    /// Box to draw, as x0,y0,x1,y1 drag corners
    #[arg(long, value_parser = parse_corners)]
    select: Option<[f32; 4]>,

    /// Interpret --select in a display of this size (WxH) instead of buffer pixels
    #[arg(long, value_parser = parse_size, requires = "select")]
    display: Option<(f32, f32)>,

    /// Override the caption endpoint defined in .env
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Replace " - " with ", " in returned captions
    #[arg(long, default_value_t = false)]
    dash_to_comma: bool,

    /// Truncate returned captions to this many words
    #[arg(long)]
    max_words: Option<usize>,

    /// Write the composite PNG to this path
    #[arg(long)]
    save_composite: Option<PathBuf>,

    /// Build the composite but do not contact the caption service
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Copy the primary caption to clipboard automatically
    #[arg(short, long, default_value_t = false)]
    copy: bool,

    /// List gallery images and exit
    #[arg(long)]
    list_gallery: bool,

    /// Open the interactive window
    #[arg(long)]
    gui: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    debug!(?args, "parsed arguments");

    let config = build_config(&args)?;
    let app = RegionCaption::with_config(config).context("Failed to initialize")?;

    // Handle --list-gallery
    if args.list_gallery {
        if app.gallery().is_empty() {
            println!("Gallery is empty.");
        }
        for (i, url) in app.gallery().iter().enumerate() {
            println!("{:>3}  {}", i + 1, url);
        }
        return Ok(());
    }

    let source = image_source(&args)?;

    if args.gui {
        // eframe needs the main thread; background work uses its own runtimes.
        return app
            .run_interactive(source)
            .context("Failed to run the interactive window");
    }

    let Some(source) = source else {
        bail!("No image given. Use --image, --url, --gallery, or --gui");
    };

    // Load
    let image = app
        .load(&source)
        .await
        .with_context(|| format!("Failed to load {}", source))?;
    let mut session = app.session();
    session.set_image(&image).context("Failed to prepare image")?;

    if let Some(corners) = args.select {
        apply_selection(&mut session, corners, args.display);
    }

    if let Some(path) = &args.save_composite {
        let png = session
            .composite_png()?
            .context("No image loaded")?;
        std::fs::write(path, png)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Composite written to {}", path.display());
    }

    if args.dry_run {
        return Ok(());
    }

    // Submit
    let Some(image_data) = session.begin_submission() else {
        bail!("{}", session.status());
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Captioning with {}...", app.config().endpoint));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = app.caption(&image_data).await;
    spinner.finish_and_clear();
    session.finish_submission(result);

    let status = session.status();
    if status.is_error() {
        bail!("{}", status);
    }

    let captions = session.captions();
    match &captions.primary {
        Some(primary) => {
            println!("{}", primary);
            if !captions.alternates.is_empty() {
                println!();
                println!("Other captions:");
                for (i, caption) in captions.alternates.iter().enumerate() {
                    println!("  {}. {}", i + 1, caption);
                }
            }

            if args.copy {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(primary.clone()) {
                            eprintln!("Warning: Failed to copy to clipboard: {}", e);
                        } else {
                            println!("(Copied to clipboard)");
                        }
                    }
                    Err(e) => eprintln!("Warning: Could not access clipboard: {}", e),
                }
            }
        }
        None => println!("{}", status),
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<Config> {
    let mut builder = ConfigBuilder::from(Config::load().context("Failed to load configuration")?);
    if let Some(endpoint) = &args.endpoint {
        builder = builder.with_endpoint(endpoint.clone());
    }
    if let Some(secs) = args.timeout {
        builder = builder.with_timeout(Duration::from_secs(secs));
    }
    if args.dash_to_comma || args.max_words.is_some() {
        let format = if args.dash_to_comma {
            CaptionFormat::dash_to_comma()
        } else {
            CaptionFormat::default()
        };
        builder = builder.with_caption_format(format.with_max_words(args.max_words));
    }
    builder.build().context("Invalid configuration")
}

fn image_source(args: &Args) -> Result<Option<ImageSource>> {
    if let Some(path) = &args.image {
        return Ok(Some(ImageSource::File(path.clone())));
    }
    if let Some(raw) = &args.url {
        let url = raw.parse().with_context(|| format!("Invalid URL '{}'", raw))?;
        return Ok(Some(ImageSource::Url(url)));
    }
    if let Some(index) = args.gallery {
        if index == 0 {
            bail!("Gallery items are numbered from 1");
        }
        return Ok(Some(ImageSource::Gallery(index - 1)));
    }
    Ok(None)
}

/// Drives the selection through the same pointer path the window uses.
fn apply_selection(session: &mut Session, corners: [f32; 4], display: Option<(f32, f32)>) {
    let Some(geometry) = session.geometry() else {
        return;
    };
    let display = match display {
        Some((width, height)) => DisplayRect::new(0.0, 0.0, width, height),
        None => DisplayRect::identity(geometry.buffer_size()),
    };
    let [x0, y0, x1, y1] = corners;
    session.pointer_down(Point::new(x0, y0), display);
    session.pointer_move(Point::new(x1, y1), display);
    session.pointer_up();
}

fn parse_corners(raw: &str) -> std::result::Result<[f32; 4], String> {
    let values: Vec<f32> = raw
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("'{}': {}", v, e)))
        .collect::<std::result::Result<_, _>>()?;
    values
        .try_into()
        .map_err(|_| "expected four comma-separated numbers: x0,y0,x1,y1".to_string())
}

fn parse_size(raw: &str) -> std::result::Result<(f32, f32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width: f32 = w.trim().parse().map_err(|e| format!("width: {}", e))?;
    let height: f32 = h.trim().parse().map_err(|e| format!("height: {}", e))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("display size must be positive".to_string());
    }
    Ok((width, height))
}
