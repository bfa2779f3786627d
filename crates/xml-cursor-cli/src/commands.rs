//! Subcommand implementations. Each writes its report to `out`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use xml_cursor::{
    AttributeFilter, AttributePattern, Config, Cursor, ElementCursor, ElementStack, FilterCursor, Node,
    NodeWriter, Predicate, QuickXmlTokenizer, SequenceRegistry, XPathFilter, XmlCursor,
    copy_document,
};

type FileCursor = XmlCursor<QuickXmlTokenizer<BufReader<File>>>;

fn open(file: &Path, config: &Config) -> Result<FileCursor> {
    let tokenizer = QuickXmlTokenizer::open_with_options(file, config.reader.clone())?;
    Ok(XmlCursor::new(tokenizer))
}

pub fn dump(file: &Path, config: &Config, out: &mut dyn Write) -> Result<()> {
    let mut cursor = open(file, config)?;
    for node in cursor.nodes() {
        let node = node?;
        writeln!(out, "{}{}", "  ".repeat(node.depth), node.dump_label())?;
    }
    Ok(())
}

/// Filters for the `elements` subcommand.
#[derive(Debug, Default)]
pub struct ElementQuery {
    pub name: Option<String>,
    pub attr: Option<String>,
    pub pattern: Option<String>,
    pub xpath: Option<String>,
    pub paths: bool,
}

/// Accepts a node only if every predicate does.
struct AllOf(Vec<Box<dyn Predicate>>);

impl Predicate for AllOf {
    fn accept(&self, node: &Node, elements: &ElementStack) -> xml_cursor::Result<bool> {
        for predicate in &self.0 {
            if !predicate.accept(node, elements)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn split_assignment<'a>(flag: &str, value: &'a str) -> Result<(&'a str, &'a str)> {
    match value.split_once('=') {
        Some((name, rest)) if !name.is_empty() => Ok((name, rest)),
        _ => bail!("--{flag} expects NAME=VALUE, got '{value}'"),
    }
}

impl ElementQuery {
    fn predicates(&self) -> Result<AllOf> {
        let mut predicates: Vec<Box<dyn Predicate>> = Vec::new();
        if let Some(attr) = &self.attr {
            let (name, values) = split_assignment("attr", attr)?;
            let values: Vec<&str> = values.split(',').collect();
            predicates.push(Box::new(AttributeFilter::new(name, &values)));
        }
        if let Some(pattern) = &self.pattern {
            let (name, regex) = split_assignment("pattern", pattern)?;
            predicates.push(Box::new(AttributePattern::new(name, regex)?));
        }
        if let Some(xpath) = &self.xpath {
            predicates.push(Box::new(XPathFilter::new(xpath)?));
        }
        Ok(AllOf(predicates))
    }
}

pub fn elements(file: &Path, config: &Config, query: &ElementQuery, out: &mut dyn Write) -> Result<()> {
    let predicates = query.predicates()?;
    let mut base = open(file, config)?;
    let mut matches = FilterCursor::new(
        ElementCursor::new(&mut base, query.name.as_deref()),
        predicates,
    );
    let mut count = 0;
    while matches.advance()? {
        if query.paths {
            writeln!(out, "{}", matches.node_path())?;
        } else {
            writeln!(out, "{}", matches.read_outer_xml()?)?;
        }
        count += 1;
    }
    info!(file = %file.display(), count, "matched elements");
    Ok(())
}

pub fn children(
    file: &Path,
    config: &Config,
    parent: &str,
    name: Option<&str>,
    descendants: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut base = open(file, config)?;
    let mut parents = ElementCursor::named(&mut base, parent);
    while parents.advance()? {
        let key = parents.key().unwrap_or_default();
        writeln!(out, "{parent}[{key}]")?;
        let mut children = parents.child_elements(name, descendants)?;
        while children.advance()? {
            if let Some(node) = children.node() {
                let indent = "  ".repeat(node.depth.saturating_sub(children.root_depth().unwrap_or(0)));
                writeln!(out, "{indent}{}", node.name)?;
            }
        }
    }
    Ok(())
}

/// Write every document of a sequence file to `out_dir`. Returns the
/// written paths.
pub fn split(file: &Path, config: &Config, out_dir: &Path, out: &mut dyn Write) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let mut registry = SequenceRegistry::with_options(config.sequence.clone());
    let location = format!("{}://{}", xml_cursor::SCHEME, file.display());
    let documents = registry.documents(&location)?;

    let mut written = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        let path = out_dir.join(format!("{stem}-{}.xml", index + 1));
        std::fs::write(&path, document)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writeln!(out, "{}", path.display())?;
        written.push(path);
    }
    info!(file = %file.display(), documents = written.len(), "split XML sequence");
    Ok(written)
}

pub fn copy(file: &Path, config: &Config, output: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let mut cursor = open(file, config)?;
    let written = match output {
        Some(path) => {
            let target = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = NodeWriter::new(BufWriter::new(target));
            let written = copy_document(&mut cursor, &mut writer)?;
            writer.into_inner().flush()?;
            written
        }
        None => {
            let mut writer = NodeWriter::new(out);
            copy_document(&mut cursor, &mut writer)?
        }
    };
    info!(file = %file.display(), nodes = written, "copied document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn output(run: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        run(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    const SHOP: &str = r#"<shop>
  <item sku="a1" tag="new">Apple</item>
  <item sku="b2">Banana</item>
  <crate><item sku="c3" tag="old">Cherry</item></crate>
</shop>"#;

    #[test]
    fn test_dump_indents_by_depth() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "a.xml", "<r><a>t</a></r>");
        let text = output(|out| dump(&file, &Config::default(), out));
        assert_eq!(
            text,
            "(#1) ELEMENT <r> (isEmptyElement: No)\n\
             \x20 (#1) ELEMENT <a> (isEmptyElement: No)\n\
             \x20   (#3) TEXT \"t\"\n\
             \x20 (#15) END_ELEMENT </a>\n\
             (#15) END_ELEMENT </r>\n"
        );
    }

    #[test]
    fn test_elements_with_attribute_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "shop.xml", SHOP);
        let query = ElementQuery {
            name: Some("item".to_string()),
            attr: Some("tag=new,old".to_string()),
            ..ElementQuery::default()
        };
        let text = output(|out| elements(&file, &Config::default(), &query, out));
        assert_eq!(
            text,
            "<item sku=\"a1\" tag=\"new\">Apple</item>\n<item sku=\"c3\" tag=\"old\">Cherry</item>\n"
        );
    }

    #[test]
    fn test_elements_paths_with_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "shop.xml", SHOP);
        let query = ElementQuery {
            name: Some("item".to_string()),
            pattern: Some("sku=^[bc]".to_string()),
            paths: true,
            ..ElementQuery::default()
        };
        let text = output(|out| elements(&file, &Config::default(), &query, out));
        assert_eq!(text, "/shop/item\n/shop/crate/item\n");
    }

    #[test]
    fn test_bad_assignment_is_reported() {
        let query = ElementQuery {
            attr: Some("novalue".to_string()),
            ..ElementQuery::default()
        };
        assert!(query.predicates().is_err());
    }

    #[test]
    fn test_children_lists_direct_children() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "shop.xml", SHOP);
        let text = output(|out| children(&file, &Config::default(), "shop", None, false, out));
        assert_eq!(text, "shop[0]\n  item\n  item\n  crate\n");
    }

    #[test]
    fn test_split_writes_one_file_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "log.xml",
            "<?xml version=\"1.0\"?>\n<a/>\n<?xml version=\"1.0\"?>\n<b/>\n",
        );
        let out_dir = dir.path().join("out");
        let mut sink = Vec::new();
        let written = split(&file, &Config::default(), &out_dir, &mut sink).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(&written[1]).unwrap(),
            "<?xml version=\"1.0\"?>\n<b/>\n"
        );
        assert!(written[0].ends_with("log-1.xml"));
    }

    #[test]
    fn test_copy_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "shop.xml", SHOP);
        let target = dir.path().join("copy.xml");
        let mut sink = Vec::new();
        copy(&file, &Config::default(), Some(&target), &mut sink).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), SHOP);
        assert!(sink.is_empty());
    }
}
