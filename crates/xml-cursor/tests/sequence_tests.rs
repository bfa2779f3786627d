//! Reading concatenated documents through the sequence registry.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use xml_cursor::{
    Cursor, ElementCursor, Error, QuickXmlTokenizer, SequenceOptions, SequenceRegistry, XmlCursor,
    split_file,
};

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test-fixtures")
        .join(name)
}

fn location(name: &str) -> String {
    format!("xmlseq://{}", fixture_path(name).display())
}

/// `(batch number, event kinds)` for every document of the sequence.
fn batches(registry: &mut SequenceRegistry, location: &str) -> Vec<(String, Vec<String>)> {
    let mut batches = Vec::new();
    while registry.not_at_end_of_sequence(location) {
        let stream = registry.open(location).unwrap();
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_reader(BufReader::new(stream)));
        let mut batch = ElementCursor::named(&mut base, "batch");
        assert!(batch.advance().unwrap());
        let number = batch.node().unwrap().attribute("n").unwrap().to_string();
        let mut events = batch.child_elements(Some("event"), false).unwrap();
        let mut kinds = Vec::new();
        while events.advance().unwrap() {
            kinds.push(events.node().unwrap().attribute("kind").unwrap().to_string());
        }
        batches.push((number, kinds));
    }
    batches
}

#[test]
fn test_each_document_parses_on_its_own() {
    let mut registry = SequenceRegistry::new();
    let batches = batches(&mut registry, &location("sequence.xml"));
    assert_eq!(
        batches,
        vec![
            ("1".to_string(), vec!["start".to_string(), "stop".to_string()]),
            ("2".to_string(), vec!["tick".to_string()]),
            ("3".to_string(), vec![]),
        ]
    );
    registry.clean();
    assert!(!registry.is_open(&location("sequence.xml")));
}

#[test]
fn test_tiny_read_ahead_gives_the_same_documents() {
    let mut registry = SequenceRegistry::with_options(SequenceOptions { read_ahead: 0 });
    let batches = batches(&mut registry, &location("sequence.xml"));
    let numbers: Vec<&str> = batches.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(numbers, ["1", "2", "3"]);
}

#[test]
fn test_split_file() {
    let documents = split_file(fixture_path("sequence.xml")).unwrap();
    assert_eq!(documents.len(), 3);
    for document in &documents {
        assert!(document.starts_with(b"<?xml version=\"1.0\"?>"));
    }
    let joined: Vec<u8> = documents.concat();
    assert_eq!(joined, std::fs::read(fixture_path("sequence.xml")).unwrap());
}

#[test]
fn test_single_document_without_declaration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.xml");
    std::fs::write(&path, "<root><item/></root>").unwrap();

    let mut registry = SequenceRegistry::new();
    let location = format!("xmlseq://{}", path.display());
    let mut stream = registry.open(&location).unwrap();
    let mut content = String::new();
    stream.read_to_string(&mut content).unwrap();
    assert_eq!(content, "<root><item/></root>");
    assert!(stream.is_eof());
    assert!(!registry.not_at_end_of_sequence(&location));
}

#[test]
fn test_malformed_sequence_surfaces_through_tokenizer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xml");
    std::fs::write(&path, "<a/>\n<?xml version=\"1.0\"?>\n<b/>").unwrap();

    let mut registry = SequenceRegistry::new();
    let stream = registry.open(&format!("xmlseq://{}", path.display())).unwrap();
    let mut base = XmlCursor::new(QuickXmlTokenizer::from_reader(BufReader::new(stream)));
    let err = base.rewind().unwrap_err();
    assert!(
        matches!(err, Error::MalformedSequence { .. }),
        "unexpected error: {err}"
    );
}
