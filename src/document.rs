//! Read-only view of a source PDF.
//!
//! `PdfDocument` owns the original bytes and never modifies them. Every
//! change the certifier makes is staged in a
//! [`IncrementalUpdate`](crate::writer::IncrementalUpdate) and appended
//! after these bytes.

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::parse_object_stream;
use crate::parser::parse_indirect_object;
use crate::xref::{parse_xref, CrossRefTable, XRefEntry, XRefKind};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Depth limit when walking the page tree.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Media box used when neither a page nor its ancestors declare one (A4).
pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 595.0, 842.0];

/// A leaf of the page tree with its inheritable attributes resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// Reference to the `/Type /Page` dictionary
    pub reference: ObjectRef,
    /// Page tree node that lists this page in its `/Kids`
    pub parent: ObjectRef,
    /// `[llx lly urx ury]`
    pub media_box: [f64; 4],
    /// Rotation in degrees
    pub rotate: i64,
}

impl PageInfo {
    /// Page width in default user space units.
    pub fn width(&self) -> f64 {
        (self.media_box[2] - self.media_box[0]).abs()
    }

    /// Page height in default user space units.
    pub fn height(&self) -> f64 {
        (self.media_box[3] - self.media_box[1]).abs()
    }
}

/// PDF document.
///
/// ```
/// use pdf_certifier::document::parse_header;
/// assert_eq!(parse_header(b"%PDF-1.7\n").unwrap(), (1, 7));
/// ```
pub struct PdfDocument {
    data: Vec<u8>,
    version: (u8, u8),
    xref: CrossRefTable,
    /// Decoded object streams keyed by stream object number
    objstm_cache: RefCell<HashMap<u32, HashMap<u32, Object>>>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.version)
            .field("len", &self.data.len())
            .field("xref_entries", &self.xref.len())
            .field("xref_kind", &self.xref.kind())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Parse a document held in memory.
    ///
    /// Fails for a missing header, an unreadable cross-reference chain, a
    /// missing `/Root`, or an encrypted file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let version = parse_header(&data)?;
        let xref = parse_xref(&data)?;

        if xref.trailer().contains_key("Encrypt") {
            return Err(Error::Unsupported("encrypted documents".to_string()));
        }
        if xref.trailer().get("Root").and_then(|o| o.as_reference()).is_none() {
            return Err(Error::InvalidPdf("trailer has no /Root reference".to_string()));
        }

        log::debug!(
            "Opened PDF {}.{} ({} bytes, {} xref entries, {:?})",
            version.0,
            version.1,
            data.len(),
            xref.len(),
            xref.kind()
        );

        Ok(Self {
            data,
            version,
            xref,
            objstm_cache: RefCell::new(HashMap::new()),
        })
    }

    /// The original bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give back the original bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Header version (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Trailer dictionary of the newest cross-reference section.
    pub fn trailer(&self) -> &Dict {
        self.xref.trailer()
    }

    /// Syntax of the newest cross-reference section.
    pub fn xref_kind(&self) -> XRefKind {
        self.xref.kind()
    }

    /// Offset of the newest cross-reference section.
    pub fn startxref(&self) -> u64 {
        self.xref.startxref()
    }

    /// First object number not used by the document.
    pub fn next_object_id(&self) -> u32 {
        let size = self
            .trailer()
            .get("Size")
            .and_then(|o| o.as_integer())
            .unwrap_or(0)
            .max(0) as u32;
        size.max(self.xref.max_object_number() + 1)
    }

    /// Reference to the document catalog.
    pub fn root_ref(&self) -> Result<ObjectRef> {
        self.trailer()
            .get("Root")
            .and_then(|o| o.as_reference())
            .ok_or_else(|| Error::InvalidPdf("trailer has no /Root reference".to_string()))
    }

    /// Load an indirect object.
    pub fn load_object(&self, obj_ref: ObjectRef) -> Result<Object> {
        match self.xref.get(obj_ref.id) {
            Some(XRefEntry::InUse { offset, .. }) => {
                let start = usize::try_from(*offset)
                    .ok()
                    .filter(|o| *o < self.data.len())
                    .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;
                let (found, object, _) = parse_indirect_object(&self.data[start..]).map_err(|e| match e {
                    Error::ParseError { reason, .. } => Error::ParseError {
                        offset: start,
                        reason,
                    },
                    other => other,
                })?;
                if found.id != obj_ref.id {
                    return Err(Error::InvalidPdf(format!(
                        "xref entry for {} points at object {}",
                        obj_ref, found
                    )));
                }
                Ok(object)
            },
            Some(XRefEntry::Compressed { stream_id, .. }) => self.load_compressed(obj_ref, *stream_id),
            Some(XRefEntry::Free) | None => Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen)),
        }
    }

    fn load_compressed(&self, obj_ref: ObjectRef, stream_id: u32) -> Result<Object> {
        if let Some(obj) = self
            .objstm_cache
            .borrow()
            .get(&stream_id)
            .and_then(|objects| objects.get(&obj_ref.id))
        {
            return Ok(obj.clone());
        }

        let stream = match self.xref.get(stream_id) {
            Some(XRefEntry::InUse { .. }) => self.load_object(ObjectRef::new(stream_id, 0))?,
            _ => return Err(Error::ObjectNotFound(stream_id, 0)),
        };
        let objects = parse_object_stream(&stream)?;
        let found = objects.get(&obj_ref.id).cloned();
        self.objstm_cache.borrow_mut().insert(stream_id, objects);
        found.ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    /// Follow a reference chain until a direct object is reached.
    pub fn resolve(&self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        let mut seen = HashSet::new();
        while let Object::Reference(r) = current {
            if !seen.insert(r) {
                return Err(Error::CircularReference(r));
            }
            current = self.load_object(r)?;
        }
        Ok(current)
    }

    /// Load an indirect object that must be a dictionary (or stream).
    pub fn load_dict(&self, obj_ref: ObjectRef) -> Result<Dict> {
        let obj = self.load_object(obj_ref)?;
        obj.as_dict().cloned().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: obj.type_name().to_string(),
        })
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<Dict> {
        self.load_dict(self.root_ref()?)
    }

    /// Reference to the root `/Pages` node.
    pub fn pages_root(&self) -> Result<ObjectRef> {
        self.catalog()?
            .get("Pages")
            .and_then(|o| o.as_reference())
            .ok_or_else(|| Error::InvalidPdf("catalog /Pages is not a reference".to_string()))
    }

    /// All pages in document order with inherited attributes applied.
    pub fn pages(&self) -> Result<Vec<PageInfo>> {
        let root = self.pages_root()?;
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(root, root, (None, None), 0, &mut visited, &mut pages)?;
        Ok(pages)
    }

    /// Number of leaf pages.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    fn collect_pages(
        &self,
        node_ref: ObjectRef,
        parent: ObjectRef,
        inherited: (Option<[f64; 4]>, Option<i64>),
        depth: usize,
        visited: &mut HashSet<ObjectRef>,
        out: &mut Vec<PageInfo>,
    ) -> Result<()> {
        if depth > MAX_PAGE_TREE_DEPTH {
            return Err(Error::InvalidPdf("page tree too deep".to_string()));
        }
        if !visited.insert(node_ref) {
            return Err(Error::CircularReference(node_ref));
        }

        let node = self.load_dict(node_ref)?;
        let media_box = match node.get("MediaBox") {
            Some(obj) => Some(self.read_rect(obj)?),
            None => None,
        };
        let rotate = match node.get("Rotate") {
            Some(obj) => self.resolve(obj)?.as_integer(),
            None => None,
        };
        let media_box = media_box.or(inherited.0);
        let rotate = rotate.or(inherited.1);

        let is_page = match node.get("Type").and_then(|o| o.as_name()) {
            Some("Page") => true,
            Some("Pages") => false,
            _ => !node.contains_key("Kids"),
        };

        if is_page {
            out.push(PageInfo {
                reference: node_ref,
                parent,
                media_box: media_box.unwrap_or(DEFAULT_MEDIA_BOX),
                rotate: rotate.unwrap_or(0),
            });
            return Ok(());
        }

        let kids = match node.get("Kids") {
            Some(kids) => self.resolve(kids)?,
            None => Object::Array(Vec::new()),
        };
        let kids = kids
            .as_array()
            .ok_or_else(|| Error::InvalidPdf(format!("/Kids of {} is not an array", node_ref)))?;

        for kid in kids {
            let kid_ref = kid
                .as_reference()
                .ok_or_else(|| Error::InvalidPdf(format!("page tree kid of {} is not a reference", node_ref)))?;
            self.collect_pages(kid_ref, node_ref, (media_box, rotate), depth + 1, visited, out)?;
        }
        Ok(())
    }

    /// Read a rectangle array, resolving indirect entries.
    pub fn read_rect(&self, obj: &Object) -> Result<[f64; 4]> {
        let resolved = self.resolve(obj)?;
        let arr = resolved.as_array().ok_or_else(|| Error::InvalidObjectType {
            expected: "Array".to_string(),
            found: resolved.type_name().to_string(),
        })?;
        if arr.len() != 4 {
            return Err(Error::InvalidPdf(format!("rectangle with {} entries", arr.len())));
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(arr) {
            *slot = self
                .resolve(value)?
                .as_number()
                .ok_or_else(|| Error::InvalidPdf("non-numeric rectangle entry".to_string()))?;
        }
        Ok(rect)
    }
}

/// Parse the `%PDF-M.m` header.
///
/// The header may be preceded by junk within the first 1024 bytes.
pub fn parse_header(data: &[u8]) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(1024)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| {
            Error::InvalidHeader(String::from_utf8_lossy(&data[..data.len().min(8)]).into_owned())
        })?;

    let version = &data[pos + 5..data.len().min(pos + 8)];
    match version {
        [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok((major - b'0', minor - b'0'))
        },
        _ => Err(Error::InvalidHeader(
            String::from_utf8_lossy(&data[pos..data.len().min(pos + 8)]).into_owned(),
        )),
    }
}
