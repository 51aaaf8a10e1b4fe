use doc_model::{PageGeometry, Rotation};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_FILE_NAME: &str = "document.pdf";
const LETTER: PageGeometry = PageGeometry { width: 612.0, height: 792.0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Where a document comes from. Acquisition itself belongs to the shell; the
/// engine only turns either variant into page geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Local(LocalSource),
    Remote(String),
}

impl DocumentSource {
    /// `http(s)://` input is remote, anything else a local path.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Remote(input.to_owned())
        } else {
            Self::Local(LocalSource::Path(PathBuf::from(input)))
        }
    }

    pub fn display_name(&self) -> String {
        let name = match self {
            Self::Local(LocalSource::Path(path)) => {
                path.file_name().map(|name| name.to_string_lossy().into_owned())
            }
            Self::Local(LocalSource::Bytes(_)) => None,
            Self::Remote(url) => {
                let path = url.split(['?', '#']).next().unwrap_or_default();
                path.rsplit('/').next().map(str::to_owned)
            }
        };

        name.filter(|name| !name.is_empty()).unwrap_or_else(|| DEFAULT_FILE_NAME.to_owned())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(value: PathBuf) -> Self {
        Self::Local(LocalSource::Path(value))
    }
}

impl From<&Path> for DocumentSource {
    fn from(value: &Path) -> Self {
        Self::Local(LocalSource::Path(value.to_path_buf()))
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Local(LocalSource::Bytes(value))
    }
}

/// Load-complete signal of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLoaded {
    pub handle: DocumentHandle,
    pub page_count: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("no fetcher configured for remote document {0}")]
    RemoteUnavailable(String),
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Page host as seen by the notes core: page count and measured page size.
pub trait PdfEngine {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentLoaded, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    /// Size at scale 1 as the page is displayed at view rotation 0, i.e. with
    /// the page's own `/Rotate` already applied. `page_index` is 0-based.
    fn page_geometry(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageGeometry, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

/// Resolves a remote URL to document bytes.
pub type Fetcher = Box<dyn Fn(&str) -> Result<Vec<u8>, String>>;

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_geometry: Vec<PageGeometry>,
}

#[derive(Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
    fetcher: Option<Fetcher>,
}

impl fmt::Debug for LopdfEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LopdfEngine")
            .field("next_handle", &self.next_handle)
            .field("docs", &self.docs.len())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    fn source_bytes(&self, source: DocumentSource) -> Result<Vec<u8>, PdfEngineError> {
        match source {
            DocumentSource::Local(LocalSource::Path(path)) => Ok(fs::read(path)?),
            DocumentSource::Local(LocalSource::Bytes(bytes)) => Ok(bytes),
            DocumentSource::Remote(url) => {
                let fetcher =
                    self.fetcher.as_ref().ok_or(PdfEngineError::RemoteUnavailable(url.clone()))?;
                fetcher(&url).map_err(|reason| PdfEngineError::Fetch { url, reason })
            }
        }
    }

    fn parse_geometry(bytes: &[u8]) -> Result<Vec<PageGeometry>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut geometry = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let media_box = inherited(&doc, object_id, b"MediaBox")
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = number(&array[0])?;
                    let y0 = number(&array[1])?;
                    let x1 = number(&array[2])?;
                    let y1 = number(&array[3])?;
                    Some(PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs()))
                })
                .filter(PageGeometry::is_measured)
                .unwrap_or(LETTER);

            let rotation = inherited(&doc, object_id, b"Rotate")
                .and_then(|obj| obj.as_i64().ok())
                .and_then(|degrees| match Rotation::from_degrees(degrees) {
                    Ok(rotation) => Some(rotation),
                    Err(error) => {
                        log::warn!("ignoring page /Rotate: {error}");
                        None
                    }
                })
                .unwrap_or_default();

            geometry.push(if rotation.swaps_axes() {
                PageGeometry::new(media_box.height, media_box.width)
            } else {
                media_box
            });
        }

        if geometry.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(geometry)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Looks `key` up on the page, then along its `/Parent` chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;

    // bounded walk; malformed files can contain parent cycles
    for _ in 0..64 {
        let dict = doc.get_object(current).and_then(Object::as_dict).ok()?;

        if let Ok(value) = dict.get(key) {
            return Some(value);
        }

        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }

    None
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentLoaded, PdfEngineError> {
        let name = source.display_name();
        let bytes = self.source_bytes(source)?;
        let page_geometry = Self::parse_geometry(&bytes)?;
        let page_count = page_geometry.len() as u32;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, DocumentRecord { page_geometry });

        log::debug!("opened {name} as handle {} with {page_count} pages", handle.raw());

        Ok(DocumentLoaded { handle, page_count })
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_geometry.len() as u32)
    }

    fn page_geometry(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageGeometry, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_geometry.get(page_index as usize).copied().ok_or(
            PdfEngineError::PageOutOfRange {
                page: page_index,
                page_count: record.page_geometry.len() as u32,
            },
        )
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Numeric PDF object as f64. Reals are parsed as f32, so they go through their
/// shortest decimal form to keep `595.276` from widening to `595.2760009765625`.
fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => value.to_string().parse().ok(),
        _ => None,
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}
