//! Command-line interface.

use crate::command::EditCommand;
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::session::EditorSession;
use crate::source::FsImageSource;
use bannerink_core::document::{Document, ExportFormat, ImageRef, ResolutionPreset};
use bannerink_core::loader::{CachedSource, ImageSource};
use bannerink_core::storage::{FileStorage, MemoryStorage, Storage, create_default_storage};
use bannerink_core::wire::ProjectPayload;
use bannerink_render::RendererError;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "bannerink")]
#[command(about = "Compose image grids with text into banners")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a project to an image file
    Render(RenderArgs),
    /// Create a blank project file
    New {
        /// Where to write the project
        project: PathBuf,

        /// Project name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// Output resolution (1080p, 2K, 4K)
        #[arg(short, long)]
        resolution: Option<ResolutionPreset>,
    },
    /// Validate a project and print a summary
    Check {
        /// Project file (document JSON or project bundle)
        project: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Project file (document JSON or project bundle)
    pub project: PathBuf,

    /// Output file (defaults to the project name next to the project file)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output resolution (1080p, 2K, 4K)
    #[arg(short, long)]
    pub resolution: Option<ResolutionPreset>,

    /// Output format (png, jpg)
    #[arg(short, long)]
    pub format: Option<ExportFormat>,

    /// JPEG quality, 10-100
    #[arg(short, long)]
    pub quality: Option<u32>,

    /// JSON array of edits applied before rendering
    #[arg(long)]
    pub edits: Option<PathBuf>,

    /// Save the edited project to the project store
    #[arg(long)]
    pub save: bool,

    /// Project store directory (defaults to the platform data directory)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,
}

/// A project as handed over by the projects API: the wire payload plus the
/// image catalog it refers to.
#[derive(Debug, Deserialize)]
struct ProjectBundle {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    assets: Vec<ImageRef>,
    #[serde(flatten)]
    payload: ProjectPayload,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "banner".to_string())
}

/// Read a project file. Values are returned as stored, without clamping.
pub async fn load_project(path: &Path) -> AppResult<Document> {
    let json = tokio::fs::read_to_string(path).await?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let is_bundle = value.get("assets").is_some() || value.get("grid_size").is_some();
    if !is_bundle {
        return Ok(serde_json::from_value(value)?);
    }

    let bundle: ProjectBundle = serde_json::from_value(value)?;
    let assets: HashMap<_, _> = bundle.assets.into_iter().map(|image| (image.id.clone(), image)).collect();
    let id = bundle.id.unwrap_or_else(|| file_stem(path));
    let name = bundle.name.unwrap_or_else(|| file_stem(path));
    Ok(Document::from_payload(id, name, bundle.payload, |image_id| {
        assets.get(image_id).cloned()
    }))
}

pub async fn run(cli: Cli) -> AppResult<()> {
    match cli.command {
        Command::Render(args) => render(args).await,
        Command::New {
            project,
            name,
            resolution,
        } => create(&project, name, resolution).await,
        Command::Check { project } => check(&project).await,
    }
}

async fn create(path: &Path, name: Option<String>, resolution: Option<ResolutionPreset>) -> AppResult<()> {
    let mut config = AppConfig::default();
    if let Some(resolution) = resolution {
        config.default_resolution = resolution;
    }
    let document = config
        .new_document()
        .with_name(name.unwrap_or_else(|| file_stem(path)));
    tokio::fs::write(path, document.to_json()?).await?;
    println!("Created {} ({})", path.display(), document.id);
    Ok(())
}

async fn check(path: &Path) -> AppResult<()> {
    let document = load_project(path).await?;
    let settings = document.export_settings();
    let (width, height) = settings.resolution.dimensions();
    println!("{} ({})", document.name, document.id);
    println!("  grid:       {}", document.grid());
    println!(
        "  images:     {} placed of {}",
        document.placed_images().len(),
        document.images().len()
    );
    println!("  text:       {}", document.text_overlays().len());
    println!("  background: {}", document.background());
    println!(
        "  export:     {} {}x{} quality {}",
        settings.format.extension(),
        width,
        height,
        settings.quality
    );
    document.validate()?;
    println!("OK");
    Ok(())
}

async fn render(args: RenderArgs) -> AppResult<()> {
    let mut document = load_project(&args.project).await?;
    if let Err(err) = document.validate() {
        log::warn!("Clamping project values: {err}");
        document.sanitize();
    }

    let config = AppConfig {
        storage_dir: args.storage_dir.clone(),
        image_root: args.project.parent().map(Path::to_path_buf),
        ..AppConfig::default()
    };
    if !args.save {
        return render_with(document, &args, &config, Arc::new(MemoryStorage::new())).await;
    }
    let storage = match &config.storage_dir {
        Some(dir) => Arc::new(FileStorage::new(dir.clone())?),
        None => create_default_storage()?,
    };
    render_with(document, &args, &config, storage).await
}

async fn render_with<St: Storage>(
    document: Document,
    args: &RenderArgs,
    config: &AppConfig,
    storage: Arc<St>,
) -> AppResult<()> {
    let source: Arc<dyn ImageSource> = Arc::new(CachedSource::new(FsImageSource::new(config.image_root.clone())));
    let mut session = EditorSession::new(document, source, storage, config);
    if !session.mount() {
        let reason = session
            .notices()
            .active()
            .last()
            .map(|notice| notice.message.clone())
            .unwrap_or_else(|| "the canvas could not be created".to_string());
        return Err(RendererError::RenderUnavailable(reason).into());
    }

    if let Some(path) = &args.edits {
        let script = tokio::fs::read_to_string(path).await?;
        for command in EditCommand::parse_script(&script)? {
            session.edit(command)?;
        }
    }
    if args.format.is_some() || args.quality.is_some() || args.resolution.is_some() {
        session.edit(EditCommand::SetExport {
            format: args.format,
            quality: args.quality,
            resolution: args.resolution,
        })?;
    }

    session.settle().await;
    for notice in session.notices().active() {
        eprintln!("warning: {notice}");
    }

    let exported = session.export()?;
    let out = match &args.out {
        Some(out) => out.clone(),
        None => {
            let dir = config.image_root.clone().unwrap_or_default();
            dir.join(exported.suggested_filename(&session.document().name))
        }
    };
    tokio::fs::write(&out, &exported.bytes).await?;
    println!(
        "Wrote {} ({}x{}, {} bytes)",
        out.display(),
        exported.width,
        exported.height,
        exported.bytes.len()
    );

    if args.save {
        session.save_now().await?;
        println!("Saved project {}", session.document().id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::source::tests::png_data_uri;
    use bannerink_core::color::{Background, Rgba};
    use clap::CommandFactory;
    use std::ffi::OsString;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_args() {
        let cli = Cli::try_parse_from([
            "bannerink",
            "render",
            "promo.json",
            "--resolution",
            "1080p",
            "--format",
            "jpg",
            "--quality",
            "80",
        ])
        .unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.project, PathBuf::from("promo.json"));
        assert_eq!(args.resolution, Some(ResolutionPreset::Hd1080));
        assert_eq!(args.format, Some(ExportFormat::Jpeg));
        assert_eq!(args.quality, Some(80));
        assert!(!args.save);

        assert!(Cli::try_parse_from(["bannerink", "render", "p.json", "--resolution", "8K"]).is_err());
    }

    #[tokio::test]
    async fn test_load_bundle_resolves_assets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summer.json");
        let bundle = serde_json::json!({
            "name": "Summer Sale",
            "assets": [
                {"id": "a", "source_uri": "a.png"},
                {"id": "b", "source_uri": "b.png"}
            ],
            "images": ["a", "ghost", "b"],
            "grid_size": {"rows": 9, "cols": 2},
            "background_color": "#00ff00",
            "text_overlays": [],
            "export_settings": {"format": "jpg", "quality": 5, "resolution": "4K"}
        });
        tokio::fs::write(&path, bundle.to_string()).await.unwrap();

        let doc = load_project(&path).await.unwrap();
        assert_eq!(doc.id, "summer");
        assert_eq!(doc.name, "Summer Sale");
        let ids: Vec<&str> = doc.images().iter().map(|image| image.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(doc.grid().rows, 6);
        assert_eq!(doc.background(), Background::Solid(Rgba::rgb(0, 255, 0)));
        assert_eq!(doc.export_settings().quality, 10);
    }

    #[tokio::test]
    async fn test_render_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new().with_name("Tiny banner");
        doc.add_images([
            ImageRef::new("red", png_data_uri(8, 8, [255, 0, 0, 255])),
            ImageRef::new("blue", png_data_uri(8, 4, [0, 0, 255, 255])),
        ]);
        let project = dir.path().join("tiny.json");
        tokio::fs::write(&project, doc.to_json().unwrap()).await.unwrap();

        let edits = dir.path().join("edits.json");
        tokio::fs::write(&edits, r#"[{"type": "set_grid", "rows": 1, "cols": 2}]"#)
            .await
            .unwrap();

        let cli = Cli::try_parse_from([
            OsString::from("bannerink"),
            OsString::from("render"),
            project.into_os_string(),
            OsString::from("--resolution"),
            OsString::from("1080p"),
            OsString::from("--edits"),
            edits.into_os_string(),
        ])
        .unwrap();
        run(cli).await.unwrap();

        let out = dir.path().join("Tiny_banner.png");
        let pixels = image::open(&out).unwrap().to_rgba8();
        assert_eq!(pixels.dimensions(), (1920, 1080));
        let red = pixels.get_pixel(480, 540).0;
        assert!(red[0] > 240 && red[2] < 15, "{red:?}");
        let blue = pixels.get_pixel(1440, 540).0;
        assert!(blue[2] > 240 && blue[0] < 15, "{blue:?}");
    }

    #[tokio::test]
    async fn test_new_writes_blank_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launch.json");
        let cli = Cli::try_parse_from([
            OsString::from("bannerink"),
            OsString::from("new"),
            path.clone().into_os_string(),
            OsString::from("--resolution"),
            OsString::from("4K"),
        ])
        .unwrap();
        run(cli).await.unwrap();

        let doc = load_project(&path).await.unwrap();
        assert_eq!(doc.name, "launch");
        assert_eq!(doc.export_settings().resolution, ResolutionPreset::Square4k);
        assert!(doc.validate().is_ok());
        check(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_rejects_out_of_range_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::new();
        let mut raw: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        raw["grid"]["cols"] = serde_json::json!(7);
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, raw.to_string()).await.unwrap();

        let result = check(&path).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
