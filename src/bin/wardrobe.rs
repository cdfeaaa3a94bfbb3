use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wardrobe_palette::service::{GarmentRef, GarmentUpload, SaveOutfitRequest};
use wardrobe_palette::visualize::render_palette_visualization;
use wardrobe_palette::{
    Category, JsonFileStore, OutfitRequest, OutfitsResponse, Season, Wardrobe, WardrobeConfig,
    WardrobeStore, extract_palette,
};

/// Manage a garment wardrobe and get outfit suggestions.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Wardrobe store file (overrides the configuration)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Directory image paths are relative to (overrides the configuration)
    #[arg(long, global = true)]
    static_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dominant colors of an image without storing it
    Analyze {
        image: PathBuf,

        /// Number of colors to extract
        #[arg(short = 'k', long)]
        n_colors: Option<usize>,

        /// Write a palette preview PNG here
        #[arg(short, long)]
        visualize: Option<PathBuf>,
    },
    /// Add a garment photo to the wardrobe
    Add {
        image: PathBuf,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long, default_value = "all")]
        season: Season,
    },
    /// List garments, newest first
    List {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        season: Option<Season>,
    },
    /// Delete a garment and its photo
    Delete { id: u64 },
    /// Suggest outfits
    Outfits {
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        style: Option<String>,
        /// How many outfits to propose (defaults to the configuration)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Seed for reproducible suggestions
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Save an outfit made of existing garments
    SaveOutfit {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        top: u64,
        #[arg(long)]
        bottom: u64,
        #[arg(long)]
        outerwear: Option<u64>,
        #[arg(long)]
        footwear: Option<u64>,
        #[arg(long)]
        accessory: Option<u64>,
    },
    /// List saved outfits, newest first
    Saved,
    /// Delete a saved outfit
    DeleteOutfit { id: u64 },
    /// Normalize stored image paths into the upload folder
    FixPaths,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WardrobeConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => WardrobeConfig::default(),
    };
    if let Some(store) = args.store {
        config.store_path = store;
    }
    if let Some(root) = args.static_root {
        config.static_root = root;
    }

    let store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("opening store {}", config.store_path.display()))?;
    let mut wardrobe = Wardrobe::new(store, config)?;

    match args.command {
        Command::Analyze { image, n_colors, visualize } => {
            let bytes = fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let mut options = wardrobe.config().palette.clone();
            if let Some(k) = n_colors {
                options.colors = k;
            }
            let samples = extract_palette(&bytes, &options).context("palette extraction failed")?;
            if let Some(out) = visualize {
                let png = render_palette_visualization(
                    &bytes,
                    &samples,
                    &wardrobe.config().visualization,
                    wardrobe.label_font(),
                )
                .context("rendering palette preview failed")?;
                fs::write(&out, png)?;
                info!(path = %out.display(), "saved palette preview");
            }
            print_json(&samples)?;
        }
        Command::Add { image, name, category, color, season } => {
            let filename = image
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .context("image path has no file name")?;
            let bytes = fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let record = wardrobe.add_garment(GarmentUpload { filename, bytes, name, category, color, season })?;
            print_json(&record)?;
        }
        Command::List { category, season } => {
            let garments = match (category, season) {
                (Some(c), None) => wardrobe.store().list_garments_by_category(c)?,
                (None, Some(s)) => wardrobe.store().list_garments_by_season(s)?,
                (Some(c), Some(s)) => wardrobe
                    .store()
                    .list_garments_by_season(s)?
                    .into_iter()
                    .filter(|g| g.category == c)
                    .collect(),
                (None, None) => wardrobe.wardrobe()?,
            };
            print_json(&garments)?;
        }
        Command::Delete { id } => {
            let removed = wardrobe.delete_garment(id)?;
            println!("Deleted {} ({})", removed.name, removed.id);
        }
        Command::Outfits { season, style, count, seed } => {
            let request = OutfitRequest { season, style, color_scheme: None };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let count = count.unwrap_or(wardrobe.config().outfits_per_request);
            let response = wardrobe.generate_outfit_batch(&request, count, &mut rng)?;
            print_json(&response)?;
            if let OutfitsResponse::Error { error } = response {
                bail!(error);
            }
        }
        Command::SaveOutfit { name, top, bottom, outerwear, footwear, accessory } => {
            let response = wardrobe.save_outfit(SaveOutfitRequest {
                name,
                tops: GarmentRef { id: top },
                bottoms: GarmentRef { id: bottom },
                outerwear: outerwear.map(|id| GarmentRef { id }),
                footwear: footwear.map(|id| GarmentRef { id }),
                accessories: accessory.map(|id| GarmentRef { id }),
            });
            print_json(&response)?;
            if let Some(error) = response.error {
                bail!(error);
            }
        }
        Command::Saved => print_json(&wardrobe.saved_outfits()?)?,
        Command::DeleteOutfit { id } => {
            wardrobe.delete_saved_outfit(id)?;
            println!("Deleted outfit {id}");
        }
        Command::FixPaths => {
            let fixed = wardrobe.fix_image_paths()?;
            if fixed > 0 {
                println!("Fixed {fixed} image paths");
            } else {
                println!("No paths needed fixing");
            }
        }
    }

    Ok(())
}
