mod logger;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use cover_runtime::{AppConfig, CoverCommand, CoverUpdate, Secrets, WorkerContext, spawn_worker};
use logger::CliLogger;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "coverj", about = "Put a cover on PDF ebooks and copy them to an e-reader", version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search online for cover art
    Search {
        /// Search terms; derived from --file when omitted
        query: Option<String>,

        /// Derive the search terms from this document's file name
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum number of results (defaults to cover_search_results)
        #[arg(long)]
        max: Option<usize>,

        /// Download the full image of result number N (1-based) ...
        #[arg(long, requires = "save")]
        pick: Option<usize>,

        /// ... and save it here
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// List detected e-readers and the default export directory
    Devices,

    /// Render an image onto a single cover page
    Compose {
        /// Cover image
        #[arg(short, long)]
        image: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Page size (defaults to cover_page_size)
        #[arg(long, value_enum)]
        page_size: Option<PageSizeArg>,

        /// Resolution hint in DPI (defaults to cover_dpi)
        #[arg(long)]
        dpi: Option<u16>,
    },

    /// Add a cover to PDF files and copy them to a destination
    Inject {
        /// Input PDF file(s)
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Cover image
        #[arg(short, long)]
        cover: PathBuf,

        /// Directory, device name, or a label printed by `devices`
        #[arg(short, long)]
        destination: String,

        /// Replace the original first page instead of keeping it
        #[arg(long)]
        drop_first_page: bool,
    },

    /// Generate cover art with an AI image model
    Generate {
        /// Book title used to build the default prompt
        #[arg(short, long, required_unless_present = "prompt")]
        title: Option<String>,

        /// Full prompt, overriding the default one
        #[arg(short, long)]
        prompt: Option<String>,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Save a preview of a document's first page
    Preview {
        /// Input PDF file
        input: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<PageSizeArg> for pdf_cover::PageGeometry {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::A3 => Self::A3,
            PageSizeArg::A4 => Self::A4,
            PageSizeArg::A5 => Self::A5,
            PageSizeArg::Letter => Self::Letter,
            PageSizeArg::Legal => Self::Legal,
            PageSizeArg::Tabloid => Self::Tabloid,
        }
    }
}

/// Send one command and wait for its result, printing progress on the way.
async fn run(
    command_tx: &mpsc::UnboundedSender<CoverCommand>,
    update_rx: &mut mpsc::UnboundedReceiver<CoverUpdate>,
    command: CoverCommand,
) -> Result<CoverUpdate> {
    command_tx
        .send(command)
        .map_err(|_| anyhow::anyhow!("worker stopped"))?;

    while let Some(update) = update_rx.recv().await {
        match update {
            CoverUpdate::Progress {
                operation,
                current,
                total,
            } => eprintln!("[{current}/{total}] {operation}"),
            CoverUpdate::Error { message } => bail!(message),
            other => return Ok(other),
        }
    }
    bail!("worker stopped")
}

fn load_cover(path: &Path) -> Result<cover_runtime::RasterImage> {
    let image = image::open(path).with_context(|| format!("open cover image {}", path.display()))?;
    Ok(image.to_rgb8())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logger = CliLogger::new();
    logger.clone().init()?;
    let config = AppConfig::load(&cli.config).await;
    logger
        .configure(config.log_level_filter(), config.log_file.as_deref())
        .context("open log file")?;
    log::info!("Starting coverj");

    let secrets = Secrets::load(config.api_keys_path(&cli.config)).await;
    let context = WorkerContext::from_config(config, secrets)?;
    let config = context.config.clone();
    let (command_tx, mut update_rx) = spawn_worker(context);

    match cli.command {
        Commands::Search {
            query,
            file,
            max,
            pick,
            save,
        } => {
            let query = match (query, file) {
                (Some(query), _) => query,
                (None, Some(file)) => cover_search::derive_query(&file.to_string_lossy()),
                (None, None) => bail!("Give search terms or --file"),
            };
            let max_results = max.unwrap_or(config.cover_search_results);

            let command = CoverCommand::SearchCovers {
                query: query.clone(),
                max_results,
            };
            let CoverUpdate::CandidatesFound { candidates, .. } =
                run(&command_tx, &mut update_rx, command).await?
            else {
                bail!("unexpected worker reply");
            };

            if candidates.is_empty() {
                println!("No covers found for '{query}'");
                return Ok(());
            }
            for (i, candidate) in candidates.iter().enumerate() {
                let thumbnail = match &candidate.thumbnail_image {
                    Some(image) => format!("{}x{}", image.width(), image.height()),
                    None => "no thumbnail".to_string(),
                };
                println!(
                    "{:>2}. {} — {} [{}] ({})",
                    i + 1,
                    candidate.title,
                    candidate.author,
                    candidate.source_name,
                    thumbnail
                );
                println!("    {}", candidate.full_resolution_url);
            }

            if let Some(save) = save {
                let index = pick.unwrap_or(1);
                let Some(candidate) = index.checked_sub(1).and_then(|i| candidates.get(i)) else {
                    bail!("No result number {index}");
                };
                let command = CoverCommand::FetchFullImage {
                    candidate: candidate.clone(),
                };
                let CoverUpdate::FullImageReady { image, .. } =
                    run(&command_tx, &mut update_rx, command).await?
                else {
                    bail!("unexpected worker reply");
                };
                image.save(&save)?;
                println!("Saved cover {}x{} → {}", image.width(), image.height(), save.display());
            }
        }

        Commands::Devices => {
            let CoverUpdate::DestinationsListed { destinations } =
                run(&command_tx, &mut update_rx, CoverCommand::ListDestinations).await?
            else {
                bail!("unexpected worker reply");
            };
            if destinations.is_empty() {
                println!("No ebook readers detected. Pass a directory to `inject --destination`.");
            }
            for destination in &destinations {
                println!("{}", destination.label());
            }
        }

        Commands::Compose {
            image,
            output,
            page_size,
            dpi,
        } => {
            let cover = load_cover(&image)?;
            let page_size = match page_size {
                Some(arg) => pdf_cover::PageGeometry::from(arg).name().to_string(),
                None => config.cover_page_size.clone(),
            };
            let dpi = dpi.unwrap_or(config.cover_dpi);

            let bytes = tokio::task::spawn_blocking(move || {
                pdf_cover::compose_cover_page(&cover, &page_size, dpi)
            })
            .await??;
            tokio::fs::write(&output, bytes).await?;
            println!("Cover page → {}", output.display());
        }

        Commands::Inject {
            input,
            cover,
            destination,
            drop_first_page,
        } => {
            let cover = load_cover(&cover)?;

            let CoverUpdate::DestinationsListed { destinations } =
                run(&command_tx, &mut update_rx, CoverCommand::ListDestinations).await?
            else {
                bail!("unexpected worker reply");
            };
            let Some(directory) = cover_delivery::resolve_destination(&destination, &destinations)
            else {
                bail!("Unknown destination '{destination}'. Run `coverj devices` or pass a directory.");
            };

            let command = CoverCommand::InjectBatch {
                sources: input,
                cover,
                destination: directory.clone(),
                drop_original_first_page: drop_first_page,
            };
            let CoverUpdate::BatchComplete { exported, failures } =
                run(&command_tx, &mut update_rx, command).await?
            else {
                bail!("unexpected worker reply");
            };

            if !exported.is_empty() {
                println!(
                    "Successfully exported {} file(s) to {}:",
                    exported.len(),
                    directory.display()
                );
                for path in &exported {
                    println!("  • {}", path.display());
                }
            }
            if !failures.is_empty() {
                println!("{} error(s):", failures.len());
                for (name, message) in &failures {
                    println!("  ✗ {name}: {message}");
                }
                bail!("{} of {} file(s) failed", failures.len(), failures.len() + exported.len());
            }
        }

        Commands::Generate {
            title,
            prompt,
            output,
        } => {
            let prompt = match (prompt, title) {
                (Some(prompt), _) => prompt,
                (None, Some(title)) => cover_search::build_default_prompt(&title),
                (None, None) => bail!("Give --title or --prompt"),
            };
            let CoverUpdate::CoverGenerated { image } =
                run(&command_tx, &mut update_rx, CoverCommand::GenerateCover { prompt }).await?
            else {
                bail!("unexpected worker reply");
            };
            image.save(&output)?;
            println!("Generated cover {}x{} → {}", image.width(), image.height(), output.display());
        }

        Commands::Preview { input, output } => {
            let command = CoverCommand::PreviewFirstPage { path: input.clone() };
            let CoverUpdate::FirstPagePreview { image, .. } =
                run(&command_tx, &mut update_rx, command).await?
            else {
                bail!("unexpected worker reply");
            };
            let Some(image) = image else {
                bail!("Could not render the first page of {}", input.display());
            };
            image.save(&output)?;
            println!("Preview → {}", output.display());
        }
    }

    Ok(())
}
