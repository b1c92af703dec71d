//! Incremental updates.
//!
//! The original file is copied unchanged and followed by the new and
//! replaced objects, a cross-reference section in the same syntax as
//! the newest original section, and a trailer chaining to it via
//! `/Prev`.

use super::object_serializer::ObjectSerializer;
use crate::decoders::flate_encode;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::xref::XRefKind;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};

/// Objects staged for appending to a document.
#[derive(Debug, Clone)]
pub struct IncrementalUpdate {
    next_id: u32,
    objects: BTreeMap<ObjectRef, Object>,
}

/// Output of [`IncrementalUpdate::write`].
///
/// The original file is not copied; `delta` holds only what follows it.
#[derive(Debug, Clone)]
pub struct WrittenUpdate {
    /// Length of the original file
    pub base_len: usize,
    /// Bytes appended after the original file
    pub delta: Vec<u8>,
    /// Absolute offset of each appended object
    pub offsets: HashMap<ObjectRef, usize>,
}

impl WrittenUpdate {
    /// Total length of original plus update.
    pub fn len(&self) -> usize {
        self.base_len + self.delta.len()
    }

    /// Whether nothing at all was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute byte range of an appended object, from `N G obj` to `endobj`.
    pub fn object_span(&self, obj_ref: ObjectRef) -> Option<std::ops::Range<usize>> {
        let start = *self.offsets.get(&obj_ref)?;
        let local = start.checked_sub(self.base_len)?;
        let end = find(&self.delta[local..], b"endobj")? + start;
        Some(start..end)
    }

    /// Slice of the delta at an absolute range.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Option<&[u8]> {
        let start = range.start.checked_sub(self.base_len)?;
        let end = range.end.checked_sub(self.base_len)?;
        self.delta.get(start..end)
    }

    /// Join the update to the original file it was written against.
    pub fn concat(&self, original: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(original.len() + self.delta.len());
        out.extend_from_slice(original);
        out.extend_from_slice(&self.delta);
        out
    }
}

impl IncrementalUpdate {
    /// Start an update whose new objects are numbered after the
    /// document's existing ones.
    pub fn new(doc: &PdfDocument) -> Self {
        Self {
            next_id: doc.next_object_id(),
            objects: BTreeMap::new(),
        }
    }

    /// Reserve a new object number without staging content yet.
    pub fn allocate(&mut self) -> ObjectRef {
        let obj_ref = ObjectRef::new(self.next_id, 0);
        self.next_id += 1;
        obj_ref
    }

    /// Stage a new object.
    pub fn add(&mut self, obj: Object) -> ObjectRef {
        let obj_ref = self.allocate();
        self.objects.insert(obj_ref, obj);
        obj_ref
    }

    /// Stage content for an allocated object or a replacement for an
    /// existing one.
    pub fn set(&mut self, obj_ref: ObjectRef, obj: Object) {
        self.objects.insert(obj_ref, obj);
    }

    /// Staged version of an object, if any.
    pub fn get(&self, obj_ref: ObjectRef) -> Option<&Object> {
        self.objects.get(&obj_ref)
    }

    /// Current view of an object: the staged version, else the original.
    pub fn fetch(&self, doc: &PdfDocument, obj_ref: ObjectRef) -> Result<Object> {
        match self.objects.get(&obj_ref) {
            Some(obj) => Ok(obj.clone()),
            None => doc.load_object(obj_ref),
        }
    }

    /// Current view of a dictionary object.
    pub fn fetch_dict(&self, doc: &PdfDocument, obj_ref: ObjectRef) -> Result<Dict> {
        match self.fetch(doc, obj_ref)? {
            Object::Dictionary(dict) => Ok(dict),
            other => Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Resolve a value against the staged objects and the document.
    pub fn resolve(&self, doc: &PdfDocument, obj: &Object) -> Result<Object> {
        match obj {
            Object::Reference(r) => self.fetch(doc, *r),
            other => Ok(other.clone()),
        }
    }

    /// Number of staged objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Serialise the staged objects as an update to the document's bytes.
    pub fn write(&self, doc: &PdfDocument) -> Result<WrittenUpdate> {
        let original = doc.bytes();
        let base_len = original.len();
        let mut out = Vec::with_capacity(16 * 1024);
        if !matches!(original.last(), Some(b'\n') | Some(b'\r')) {
            out.push(b'\n');
        }

        let serializer = ObjectSerializer::new();
        let mut offsets = HashMap::with_capacity(self.objects.len());
        for (obj_ref, obj) in &self.objects {
            offsets.insert(*obj_ref, base_len + out.len());
            out.extend_from_slice(&serializer.serialize_indirect(obj_ref.id, obj_ref.gen, obj));
        }

        let mut trailer = Dict::new();
        for key in ["Root", "Info", "ID"] {
            if let Some(value) = doc.trailer().get(key) {
                trailer.insert(key.to_string(), value.clone());
            }
        }
        trailer.insert("Prev".into(), Object::Integer(doc.startxref() as i64));

        let xref_offset = base_len + out.len();
        match doc.xref_kind() {
            XRefKind::Table => {
                let mut sized = Dict::new();
                sized.insert("Size".into(), Object::Integer(self.next_id as i64));
                sized.extend(trailer);
                let mut entries: Vec<(ObjectRef, usize)> = offsets.iter().map(|(r, o)| (*r, *o)).collect();
                entries.sort();
                write_xref_table(&mut out, &entries);
                out.extend_from_slice(b"trailer\n");
                out.extend_from_slice(&serializer.serialize(&Object::Dictionary(sized)));
                out.push(b'\n');
            },
            XRefKind::Stream => {
                let xref_ref = ObjectRef::new(self.next_id, 0);
                let mut entries: Vec<(ObjectRef, usize)> = offsets.iter().map(|(r, o)| (*r, *o)).collect();
                entries.push((xref_ref, xref_offset));
                entries.sort();
                let stream = xref_stream(entries, xref_ref.id + 1, trailer)?;
                out.extend_from_slice(&serializer.serialize_indirect(xref_ref.id, 0, &stream));
            },
        }
        out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        log::debug!(
            "Wrote incremental update: {} objects, {} bytes appended, {:?} xref",
            self.objects.len(),
            out.len(),
            doc.xref_kind()
        );

        Ok(WrittenUpdate {
            base_len,
            delta: out,
            offsets,
        })
    }
}

/// Group sorted entries into runs of consecutive object numbers.
fn subsections(entries: &[(ObjectRef, usize)]) -> Vec<&[(ObjectRef, usize)]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=entries.len() {
        if i == entries.len() || entries[i].0.id != entries[i - 1].0.id + 1 {
            runs.push(&entries[start..i]);
            start = i;
        }
    }
    runs
}

fn write_xref_table(out: &mut Vec<u8>, entries: &[(ObjectRef, usize)]) {
    out.extend_from_slice(b"xref\n");
    for run in subsections(entries) {
        out.extend_from_slice(format!("{} {}\n", run[0].0.id, run.len()).as_bytes());
        for (obj_ref, offset) in run {
            out.extend_from_slice(format!("{:010} {:05} n\r\n", offset, obj_ref.gen).as_bytes());
        }
    }
}

fn xref_stream(entries: Vec<(ObjectRef, usize)>, size: u32, trailer: Dict) -> Result<Object> {
    let mut index = Vec::new();
    let mut rows = Vec::with_capacity(entries.len() * 7);
    for run in subsections(&entries) {
        index.push(Object::Integer(run[0].0.id as i64));
        index.push(Object::Integer(run.len() as i64));
        for (obj_ref, offset) in run {
            let offset = u32::try_from(*offset)
                .map_err(|_| Error::Unsupported("xref stream offsets beyond 4 GiB".to_string()))?;
            rows.push(1u8);
            rows.extend_from_slice(&offset.to_be_bytes());
            rows.extend_from_slice(&obj_ref.gen.to_be_bytes());
        }
    }

    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("XRef".into()));
    dict.insert("Size".into(), Object::Integer(size as i64));
    dict.insert("Index".into(), Object::Array(index));
    dict.insert(
        "W".into(),
        Object::Array(vec![Object::Integer(1), Object::Integer(4), Object::Integer(2)]),
    );
    dict.insert("Filter".into(), Object::Name("FlateDecode".into()));
    dict.extend(trailer);

    Ok(Object::Stream {
        dict,
        data: Bytes::from(flate_encode(&rows)?),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
