//! Splitting a file of concatenated XML documents.
//!
//! Some producers append complete documents, each with its own XML
//! declaration, to a single file. A [`SequenceRegistry`] hands out one
//! [`SequenceStream`] per document: each stream reads from a buffer shared
//! by all streams of the same file and reports end of input right before the
//! next `<?xml` declaration. Feed the stream to a tokenizer to parse one
//! document at a time:
//!
//! ```no_run
//! use std::io::BufReader;
//! use xml_cursor::{Cursor, ElementCursor, QuickXmlTokenizer, SequenceRegistry, XmlCursor};
//!
//! # fn main() -> xml_cursor::Result<()> {
//! let mut registry = SequenceRegistry::new();
//! while registry.not_at_end_of_sequence("xmlseq://events.xml") {
//!     let stream = registry.open("xmlseq://events.xml")?;
//!     let mut base = XmlCursor::new(QuickXmlTokenizer::from_reader(BufReader::new(stream)));
//!     let mut events = ElementCursor::named(&mut base, "event");
//!     while events.advance()? {
//!         println!("{}", events.read_outer_xml()?);
//!     }
//! }
//! registry.clean();
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use memchr::memmem;
use tracing::debug;

use crate::config::SequenceOptions;
use crate::{Error, Result};

/// URL scheme accepted by [`SequenceRegistry::open`].
pub const SCHEME: &str = "xmlseq";

const DECLARATION: &[u8] = b"<?xml";

/// Path part of an `xmlseq://` location; other strings are taken as paths.
pub fn strip_scheme(location: &str) -> PathBuf {
    location
        .strip_prefix(SCHEME)
        .and_then(|rest| rest.strip_prefix("://"))
        .unwrap_or(location)
        .into()
}

/// Offset of the first declaration at or after `from`. The declaration must
/// be followed by XML whitespace so `<?xml-stylesheet` does not count.
fn find_declaration(bytes: &[u8], from: usize) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    memmem::find_iter(&bytes[from..], DECLARATION)
        .map(|offset| offset + from)
        .find(|&position| {
            bytes
                .get(position + DECLARATION.len())
                .is_some_and(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        })
}

/// Unread bytes of one file, shared by every stream over it.
#[derive(Debug)]
struct SharedBuffer {
    path: PathBuf,
    file: Option<File>,
    bytes: Vec<u8>,
    eof: bool,
}

impl SharedBuffer {
    fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file: Some(file),
            bytes: Vec::new(),
            eof: false,
        }
    }

    /// Read until at least `want` bytes are buffered or the file ends.
    fn fill(&mut self, want: usize) -> io::Result<()> {
        while !self.eof && self.bytes.len() < want {
            let Some(file) = self.file.as_mut() else {
                self.eof = true;
                break;
            };
            let start = self.bytes.len();
            self.bytes.resize(want, 0);
            match file.read(&mut self.bytes[start..]) {
                Ok(0) => {
                    self.bytes.truncate(start);
                    self.eof = true;
                }
                Ok(read) => self.bytes.truncate(start + read),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    self.bytes.truncate(start);
                }
                Err(err) => {
                    self.bytes.truncate(start);
                    return Err(err);
                }
            }
        }
        if self.eof {
            self.file = None;
        }
        Ok(())
    }

    fn exhausted(&self) -> bool {
        self.eof && self.bytes.is_empty()
    }
}

/// Tracks the shared buffer of every file opened through it.
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    options: SequenceOptions,
    buffers: HashMap<PathBuf, Rc<RefCell<SharedBuffer>>>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SequenceOptions) -> Self {
        Self {
            options,
            buffers: HashMap::new(),
        }
    }

    pub fn options(&self) -> &SequenceOptions {
        &self.options
    }

    /// Open a stream over the next document of `location`.
    ///
    /// The first open of a path opens the file; later opens continue where
    /// the previous stream of the same path stopped.
    pub fn open(&mut self, location: &str) -> Result<SequenceStream> {
        let path = strip_scheme(location);
        let shared = match self.buffers.get(&path) {
            Some(shared) => Rc::clone(shared),
            None => {
                let file = File::open(&path).map_err(|source| Error::Open {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), "opened XML sequence");
                let shared = Rc::new(RefCell::new(SharedBuffer::new(path.clone(), file)));
                self.buffers.insert(path, Rc::clone(&shared));
                shared
            }
        };
        Ok(SequenceStream::new(shared, self.options.read_ahead))
    }

    /// Whether another document may follow. True for paths that were never
    /// opened; false once the file is consumed and its buffer is empty.
    pub fn not_at_end_of_sequence(&self, location: &str) -> bool {
        self.buffers
            .get(&strip_scheme(location))
            .is_none_or(|shared| !shared.borrow().exhausted())
    }

    pub fn is_open(&self, location: &str) -> bool {
        self.buffers.contains_key(&strip_scheme(location))
    }

    /// Forget the buffer of one path. Returns whether it was registered.
    pub fn close_buffer(&mut self, location: &str) -> bool {
        let path = strip_scheme(location);
        let removed = self.buffers.remove(&path).is_some();
        if removed {
            debug!(path = %path.display(), "closed XML sequence");
        }
        removed
    }

    /// Forget every buffer.
    pub fn clean(&mut self) {
        debug!(count = self.buffers.len(), "cleaning XML sequence buffers");
        self.buffers.clear();
    }

    /// Read every remaining document of `location` into memory and close
    /// its buffer.
    pub fn documents(&mut self, location: &str) -> Result<Vec<Vec<u8>>> {
        let mut documents = Vec::new();
        while self.not_at_end_of_sequence(location) {
            let mut stream = self.open(location)?;
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).map_err(Error::from_io)?;
            if !bytes.is_empty() {
                documents.push(bytes);
            }
        }
        self.close_buffer(location);
        Ok(documents)
    }
}

/// One logical document of a sequence, readable through [`io::Read`].
///
/// Dropping a stream before its end discards the rest of its document, so
/// the next stream always starts at a declaration.
#[derive(Debug)]
pub struct SequenceStream {
    shared: Rc<RefCell<SharedBuffer>>,
    read_ahead: usize,
    served: usize,
    done: bool,
    /// Whether this document begins with its own declaration. Only such a
    /// document may end at the next one.
    declared: bool,
}

impl SequenceStream {
    fn new(shared: Rc<RefCell<SharedBuffer>>, read_ahead: usize) -> Self {
        Self {
            shared,
            read_ahead,
            served: 0,
            done: false,
            declared: false,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.shared.borrow().path.clone()
    }

    /// Bytes of this document served so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Whether this stream has reached the end of its document.
    pub fn is_eof(&self) -> bool {
        self.done || self.shared.borrow().exhausted()
    }

    /// Discard the rest of this document.
    pub fn finish(&mut self) -> io::Result<()> {
        let mut sink = [0u8; 512];
        while self.read(&mut sink)? > 0 {}
        Ok(())
    }

    fn serve(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.done || out.is_empty() {
            return Ok(0);
        }
        let mut shared = self.shared.borrow_mut();
        shared.fill(out.len() + self.read_ahead.max(DECLARATION.len()))?;

        if self.served == 0 {
            self.declared = find_declaration(&shared.bytes, 0) == Some(0);
        }

        let from = usize::from(self.served == 0);
        let boundary = find_declaration(&shared.bytes, from);
        if let Some(position) = boundary.filter(|_| !self.declared) {
            return Err(Error::MalformedSequence {
                path: shared.path.clone(),
                message: format!(
                    "XML declaration at offset {}, expected at the start of the document",
                    self.served + position
                ),
            });
        }
        let available = match boundary {
            Some(position) => position,
            None if shared.eof => shared.bytes.len(),
            None => shared.bytes.len().saturating_sub(DECLARATION.len()),
        };
        let count = available.min(out.len());
        out[..count].copy_from_slice(&shared.bytes[..count]);
        shared.bytes.drain(..count);
        self.served += count;

        if count == 0 || boundary == Some(count) {
            self.done = true;
            debug!(
                path = %shared.path.display(),
                bytes = self.served,
                "end of document in XML sequence"
            );
        }
        Ok(count)
    }
}

impl Read for SequenceStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.serve(out).map_err(|err| match err {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        })
    }
}

impl Drop for SequenceStream {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(err) = self.finish() {
            debug!(error = %err, "failed to discard the rest of a sequence document");
        }
    }
}

/// Convenience for reading a whole sequence file without a registry.
pub fn split_file(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>> {
    let location = path.as_ref().to_string_lossy().into_owned();
    SequenceRegistry::new().documents(&location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sequence_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn location(file: &tempfile::NamedTempFile) -> String {
        format!("xmlseq://{}", file.path().display())
    }

    const TWO_DOCS: &str = "<?xml version=\"1.0\"?>\n<a>1</a>\n<?xml version=\"1.0\"?>\n<b>2</b>\n";

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("xmlseq:///tmp/x.xml"), PathBuf::from("/tmp/x.xml"));
        assert_eq!(strip_scheme("plain/path.xml"), PathBuf::from("plain/path.xml"));
    }

    #[test]
    fn test_find_declaration_requires_whitespace() {
        assert_eq!(find_declaration(b"<?xml-stylesheet x?><?xml v", 0), Some(20));
        assert_eq!(find_declaration(b"ab<?xml", 0), None);
    }

    #[test]
    fn test_documents_are_split_at_declarations() {
        let file = sequence_file(TWO_DOCS);
        let documents = SequenceRegistry::new().documents(&location(&file)).unwrap();
        let documents: Vec<String> = documents
            .into_iter()
            .map(|d| String::from_utf8(d).unwrap())
            .collect();
        assert_eq!(
            documents,
            [
                "<?xml version=\"1.0\"?>\n<a>1</a>\n",
                "<?xml version=\"1.0\"?>\n<b>2</b>\n",
            ]
        );
    }

    #[test]
    fn test_small_reads_and_read_ahead() {
        let file = sequence_file(TWO_DOCS);
        let options = SequenceOptions { read_ahead: 0 };
        let mut registry = SequenceRegistry::with_options(options);
        let mut stream = registry.open(&location(&file)).unwrap();
        let mut first = Vec::new();
        let mut byte = [0u8; 1];
        while stream.read(&mut byte).unwrap() > 0 {
            first.push(byte[0]);
        }
        assert_eq!(first, b"<?xml version=\"1.0\"?>\n<a>1</a>\n");
        assert!(stream.is_eof());
        assert!(registry.not_at_end_of_sequence(&location(&file)));
    }

    #[test]
    fn test_dropping_a_stream_discards_its_document() {
        let file = sequence_file(TWO_DOCS);
        let mut registry = SequenceRegistry::new();
        {
            let mut stream = registry.open(&location(&file)).unwrap();
            let mut head = [0u8; 4];
            stream.read_exact(&mut head).unwrap();
        }
        let mut second = String::new();
        registry
            .open(&location(&file))
            .unwrap()
            .read_to_string(&mut second)
            .unwrap();
        assert_eq!(second, "<?xml version=\"1.0\"?>\n<b>2</b>\n");
        assert!(!registry.not_at_end_of_sequence(&location(&file)));
    }

    #[test]
    fn test_declaration_after_leading_bytes_is_malformed() {
        let file = sequence_file("junk<?xml version=\"1.0\"?><a/>");
        let mut registry = SequenceRegistry::new();
        let mut stream = registry.open(&location(&file)).unwrap();
        let mut buf = Vec::new();
        let err = stream.read_to_end(&mut buf).unwrap_err();
        assert!(matches!(Error::from_io(err), Error::MalformedSequence { .. }));
    }

    #[test]
    fn test_stray_declaration_is_malformed_with_byte_reads() {
        let file = sequence_file("junk<?xml version=\"1.0\"?><a/>");
        let mut registry = SequenceRegistry::with_options(SequenceOptions { read_ahead: 0 });
        let mut stream = registry.open(&location(&file)).unwrap();
        let mut served = Vec::new();
        let mut byte = [0u8; 1];
        let err = loop {
            match stream.read(&mut byte) {
                Ok(0) => panic!("document ended after {served:?}"),
                Ok(_) => served.push(byte[0]),
                Err(err) => break err,
            }
        };
        assert_eq!(served, b"junk");
        match Error::from_io(err) {
            Error::MalformedSequence { message, .. } => assert!(message.contains("offset 4")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let mut registry = SequenceRegistry::new();
        assert!(matches!(
            registry.open("xmlseq:///definitely/not/here.xml"),
            Err(Error::Open { .. })
        ));
        assert!(registry.not_at_end_of_sequence("xmlseq:///definitely/not/here.xml"));
    }

    #[test]
    fn test_close_and_clean() {
        let file = sequence_file(TWO_DOCS);
        let mut registry = SequenceRegistry::new();
        drop(registry.open(&location(&file)).unwrap());
        assert!(registry.is_open(&location(&file)));
        assert!(registry.close_buffer(&location(&file)));
        assert!(!registry.close_buffer(&location(&file)));
        drop(registry.open(&location(&file)).unwrap());
        registry.clean();
        assert!(!registry.is_open(&location(&file)));
    }
}
