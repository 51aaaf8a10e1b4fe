use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use doc_model::{
    apply_view_action, notes_for_page, Note, NoteId, NotePatch, PageGeometry, Rotation, ViewAction,
    ViewState, DEFAULT_SCALE,
};
use pdf_engine::{default_engine, DocumentSource, LocalSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use storage::{FileBackend, NotesStore};
use viewer_core::{
    capture_selection, render_overlays, rendered_page_size, HighlightOverlay, RenderedPageSize,
    ScreenRect, SelectionSurface,
};

#[derive(Debug, Parser)]
#[command(name = "pdf-notes")]
#[command(about = "Notes anchored to text selections on PDF pages")]
pub struct Cli {
    /// Directory of the notes store. Defaults to the platform data directory.
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable page geometry of a PDF.
    Info {
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
    /// Manage stored notes.
    #[command(subcommand)]
    Notes(NotesCommand),
    /// Print the highlight rectangles of a page under a given view.
    Overlay {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum NotesCommand {
    /// List notes, optionally only those of one page.
    List {
        #[arg(long)]
        page: Option<u32>,
    },
    /// Capture a selection made on screen and store it as a note.
    Add {
        /// Selected text.
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "")]
        note: String,
        /// Selection rectangle relative to the rendered page, in screen pixels.
        #[arg(long, value_name = "LEFT,TOP,WIDTH,HEIGHT", value_parser = parse_rect, allow_hyphen_values = true)]
        rect: ScreenRect,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Replace the text of a note.
    Edit {
        id: String,
        #[arg(long)]
        note: String,
    },
    /// Delete a note.
    Remove { id: String },
}

/// View the page is shown in, plus where its size comes from.
#[derive(Debug, Args)]
struct ViewArgs {
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = DEFAULT_SCALE)]
    scale: f64,
    /// Clockwise rotation in degrees, a multiple of 90.
    #[arg(long, default_value = "0", value_parser = parse_rotation, allow_hyphen_values = true)]
    rotation: Rotation,
    /// Unrotated page size at scale 1.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_page_size, conflicts_with = "file")]
    page_size: Option<PageGeometry>,
    /// Read the page size from this PDF.
    #[arg(long, value_name = "FILE_OR_URL")]
    file: Option<String>,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    name: String,
    page_count: u32,
    pages: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
struct OverlayOutput {
    page: u32,
    scale: f64,
    rotation: u16,
    rendered_page: Option<RenderedPageSize>,
    overlays: Vec<HighlightOverlay>,
}

#[derive(Debug, Serialize)]
struct RemoveOutput {
    id: NoteId,
    removed: bool,
    remaining: usize,
}

/// A selection handed over on the command line. The rectangle is already
/// relative to the page, so the page container sits at the origin.
struct CommandLineSelection {
    text: String,
    rect: ScreenRect,
}

impl SelectionSurface for CommandLineSelection {
    fn is_collapsed(&self) -> bool {
        self.text.is_empty()
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn bounding_rect(&self) -> Option<ScreenRect> {
        Some(self.rect)
    }

    fn page_container_rect(&self) -> Option<ScreenRect> {
        Some(ScreenRect::default())
    }

    fn clear(&mut self) {
        self.text.clear();
    }
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { source } => run_info(&source),
        Commands::Notes(command) => {
            let store = open_store(cli.store.as_deref())?;
            run_notes(&store, command)
        }
        Commands::Overlay { view } => {
            let store = open_store(cli.store.as_deref())?;
            run_overlay(&store, &view)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_store(dir: Option<&Path>) -> Result<NotesStore<FileBackend>> {
    let backend = match dir {
        Some(dir) => FileBackend::with_root(dir),
        None => FileBackend::from_default_project()
            .context("failed to resolve the notes store directory")?,
    };

    let root = backend.root().to_path_buf();
    let store = NotesStore::new(backend);
    log::debug!("notes store at {} (slot `{}`)", root.display(), store.slot());

    Ok(store)
}

fn run_info(input: &str) -> Result<()> {
    let source = DocumentSource::parse(input);
    if let DocumentSource::Local(LocalSource::Path(path)) = &source {
        ensure_pdf_exists(path)?;
    }

    let name = source.display_name();
    let mut engine = default_engine();
    let loaded = engine.open(source).context("failed to open PDF")?;

    let pages = (0..loaded.page_count)
        .map(|index| {
            engine
                .page_geometry(loaded.handle, index)
                .map(|geometry| PageSizeOutput { width: geometry.width, height: geometry.height })
        })
        .collect::<Result<Vec<_>, _>>()?;

    print_json(&InfoOutput {
        path: input.trim().to_owned(),
        name,
        page_count: loaded.page_count,
        pages,
    })?;

    engine.close(loaded.handle)?;

    Ok(())
}

fn run_notes(store: &NotesStore<FileBackend>, command: NotesCommand) -> Result<()> {
    match command {
        NotesCommand::List { page } => {
            let notes = store.load_all();
            match page {
                Some(page) => print_json(&notes_for_page(&notes, page)),
                None => print_json(&notes),
            }
        }
        NotesCommand::Add { text, note, rect, view } => {
            let view = view_state(&view)?;
            let mut surface = CommandLineSelection { text, rect };

            let selection = capture_selection(&mut surface, &view).ok_or_else(|| {
                anyhow!(
                    "nothing captured: the selection is blank or the page size is unknown \
                     (pass --page-size or --file)"
                )
            })?;

            let note = Note::from_selection(&selection, &note).context("invalid note")?;
            store.add(note.clone());
            print_json(&note)
        }
        NotesCommand::Edit { id, note } => {
            let id = NoteId::from(id);
            let notes = store.update_by_id(&id, &NotePatch::note_text(note.trim()));
            let updated = notes
                .into_iter()
                .find(|candidate| candidate.id == id)
                .ok_or_else(|| anyhow!("no note with id {id}"))?;
            print_json(&updated)
        }
        NotesCommand::Remove { id } => {
            let id = NoteId::from(id);
            let removed = store.find(&id).is_some();
            let remaining = store.remove_by_id(&id).len();
            print_json(&RemoveOutput { id, removed, remaining })
        }
    }
}

fn run_overlay(store: &NotesStore<FileBackend>, args: &ViewArgs) -> Result<()> {
    let view = view_state(args)?;
    let notes = store.load_all();

    print_json(&OverlayOutput {
        page: view.current_page,
        scale: view.scale,
        rotation: view.rotation.as_degrees(),
        rendered_page: rendered_page_size(&view),
        overlays: render_overlays(&notes, &view),
    })
}

fn view_state(args: &ViewArgs) -> Result<ViewState> {
    if args.page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    if !args.scale.is_finite() || args.scale <= 0.0 {
        anyhow::bail!("--scale must be a positive number");
    }

    let mut view = ViewState { scale: args.scale, rotation: args.rotation, ..ViewState::default() };

    let (page_count, geometry) = match (&args.page_size, &args.file) {
        (Some(size), _) => (args.page, Some(*size)),
        (None, Some(file)) => {
            let (page_count, geometry) = measure_page(file, args.page)?;
            (page_count, Some(geometry))
        }
        (None, None) => (args.page, None),
    };

    apply_view_action(&mut view, ViewAction::DocumentLoaded { page_count });
    apply_view_action(&mut view, ViewAction::GoToPage(args.page));
    apply_view_action(&mut view, ViewAction::SetPageGeometry(geometry));

    Ok(view)
}

fn measure_page(input: &str, page: u32) -> Result<(u32, PageGeometry)> {
    let source = DocumentSource::parse(input);
    if let DocumentSource::Local(LocalSource::Path(path)) = &source {
        ensure_pdf_exists(path)?;
    }

    let mut engine = default_engine();
    let loaded = engine.open(source).context("failed to open PDF")?;

    if page > loaded.page_count {
        anyhow::bail!("page {page} out of range (page_count={})", loaded.page_count);
    }

    let geometry = engine.page_geometry(loaded.handle, page - 1)?;
    engine.close(loaded.handle)?;

    Ok((loaded.page_count, geometry))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn parse_rect(value: &str) -> Result<ScreenRect, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|error| format!("{part:?}: {error}")))
        .collect::<Result<Vec<_>, _>>()?;

    let [left, top, width, height] = parts[..] else {
        return Err(format!("expected LEFT,TOP,WIDTH,HEIGHT, got {value:?}"));
    };

    let rect = ScreenRect::new(left, top, width, height);
    if !rect.is_finite() || width < 0.0 || height < 0.0 {
        return Err(format!("rectangle must be finite with non-negative size, got {value:?}"));
    }

    Ok(rect)
}

fn parse_page_size(value: &str) -> Result<PageGeometry, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;

    let width = width.trim().parse::<f64>().map_err(|error| error.to_string())?;
    let height = height.trim().parse::<f64>().map_err(|error| error.to_string())?;

    let geometry = PageGeometry::new(width, height);
    if !geometry.is_measured() {
        return Err(format!("page size must be positive, got {value:?}"));
    }

    Ok(geometry)
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    let degrees = value.trim().parse::<i64>().map_err(|error| error.to_string())?;
    Rotation::from_degrees(degrees).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_parser_accepts_four_numbers() {
        assert_eq!(parse_rect("100, 50,40,20"), Ok(ScreenRect::new(100.0, 50.0, 40.0, 20.0)));
        assert_eq!(parse_rect("-5,0,1,1"), Ok(ScreenRect::new(-5.0, 0.0, 1.0, 1.0)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,3,x").is_err());
        assert!(parse_rect("1,2,-3,4").is_err());
    }

    #[test]
    fn page_size_parser_requires_positive_dimensions() {
        assert_eq!(parse_page_size("600x800"), Ok(PageGeometry::new(600.0, 800.0)));
        assert_eq!(parse_page_size("612.5X792"), Ok(PageGeometry::new(612.5, 792.0)));
        assert!(parse_page_size("600").is_err());
        assert!(parse_page_size("0x800").is_err());
    }

    #[test]
    fn rotation_parser_normalises_degrees() {
        assert_eq!(parse_rotation("270"), Ok(Rotation::Deg270));
        assert_eq!(parse_rotation("-90"), Ok(Rotation::Deg270));
        assert!(parse_rotation("45").is_err());
    }

    #[test]
    fn view_without_geometry_source_is_unmeasured() {
        let args = ViewArgs {
            page: 3,
            scale: 2.0,
            rotation: Rotation::Deg90,
            page_size: None,
            file: None,
        };

        let view = view_state(&args).expect("view should build");
        assert_eq!(view.current_page, 3);
        assert_eq!(view.page_geometry, None);
        assert_eq!(view.rotation, Rotation::Deg90);
    }

    #[test]
    fn view_rejects_page_zero_and_bad_scale() {
        let args = ViewArgs {
            page: 0,
            scale: 1.0,
            rotation: Rotation::Deg0,
            page_size: Some(PageGeometry::new(600.0, 800.0)),
            file: None,
        };
        assert!(view_state(&args).is_err());

        let args = ViewArgs { page: 1, scale: 0.0, ..args };
        assert!(view_state(&args).is_err());
    }

    #[test]
    fn command_line_selection_is_captured_relative_to_page() {
        let args = ViewArgs {
            page: 1,
            scale: 1.0,
            rotation: Rotation::Deg0,
            page_size: Some(PageGeometry::new(600.0, 800.0)),
            file: None,
        };
        let view = view_state(&args).expect("view should build");
        let mut surface = CommandLineSelection {
            text: "hello".to_owned(),
            rect: ScreenRect::new(100.0, 50.0, 40.0, 20.0),
        };

        let selection = capture_selection(&mut surface, &view).expect("selection expected");
        assert_eq!(selection.position.x, 100.0);
        assert_eq!(selection.position.width, 40.0);
        assert!(surface.text.is_empty());
    }
}
