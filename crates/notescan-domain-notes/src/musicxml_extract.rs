use notescan_ports::types::{NoteRecord, REST_PITCH, UNKNOWN_DURATION};
use roxmltree::{Document, Node, ParsingOptions};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationParseError {
    #[error("io error: {0}")]
    Io(String),
    #[error("xml error: {0}")]
    Xml(String),
    #[error("unexpected root element <{0}>, expected <score-partwise>")]
    UnexpectedRoot(String),
    #[error("no parts found in document")]
    MissingParts,
    #[error("archive error: {0}")]
    Archive(String),
}

/// Partwise score with every collection normalized to a list, whether the
/// source held one child element or many.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartwiseScore {
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Part {
    pub measures: Vec<Measure>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Measure {
    pub notes: Vec<RawNote>,
}

/// Note fields as they appear in the document, before sentinels are applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawNote {
    pub step: Option<String>,
    pub octave: Option<String>,
    pub duration: Option<String>,
}

impl RawNote {
    pub fn to_record(&self) -> NoteRecord {
        let pitch = match (&self.step, &self.octave) {
            (Some(step), Some(octave)) => format!("{step}{octave}"),
            (Some(step), None) => step.clone(),
            (None, _) => REST_PITCH.to_string(),
        };
        let duration = self
            .duration
            .clone()
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string());
        NoteRecord::new(pitch, duration)
    }
}

impl PartwiseScore {
    /// Flattens parts, then measures, then notes, preserving document order.
    pub fn note_records(&self) -> Vec<NoteRecord> {
        self.parts
            .iter()
            .flat_map(|part| part.measures.iter())
            .flat_map(|measure| measure.notes.iter())
            .map(RawNote::to_record)
            .collect()
    }

    pub fn measure_count(&self) -> usize {
        self.parts.iter().map(|part| part.measures.len()).sum()
    }
}

pub fn extract_notes_path(path: &Path) -> Result<Vec<NoteRecord>, NotationParseError> {
    let score = parse_partwise_path(path)?;
    let notes = score.note_records();
    log::debug!(
        "event=notes_extracted path={} parts={} measures={} notes={}",
        path.display(),
        score.parts.len(),
        score.measure_count(),
        notes.len()
    );
    Ok(notes)
}

pub fn extract_notes_str(xml: &str) -> Result<Vec<NoteRecord>, NotationParseError> {
    Ok(parse_partwise_str(xml)?.note_records())
}

pub fn parse_partwise_path(path: &Path) -> Result<PartwiseScore, NotationParseError> {
    if !path.exists() {
        return Err(NotationParseError::Io(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let data = read_musicxml_file(path)?;
    parse_partwise_str(&data)
}

pub fn parse_partwise_str(xml: &str) -> Result<PartwiseScore, NotationParseError> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    // Engine exports carry a MusicXML DOCTYPE.
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| NotationParseError::Xml(e.to_string()))?;

    let root = doc.root_element();
    if !root.has_tag_name("score-partwise") {
        return Err(NotationParseError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let parts: Vec<Part> = child_elements(root, "part").map(parse_part).collect();
    if parts.is_empty() {
        return Err(NotationParseError::MissingParts);
    }

    Ok(PartwiseScore { parts })
}

fn parse_part(part: Node) -> Part {
    Part {
        measures: child_elements(part, "measure").map(parse_measure).collect(),
    }
}

fn parse_measure(measure: Node) -> Measure {
    Measure {
        notes: child_elements(measure, "note").map(parse_raw_note).collect(),
    }
}

fn parse_raw_note(note: Node) -> RawNote {
    let pitch = child_elements(note, "pitch").next();
    RawNote {
        step: pitch.and_then(|pitch| child_text(pitch, "step")),
        octave: pitch.and_then(|pitch| child_text(pitch, "octave")),
        duration: child_raw_text(note, "duration"),
    }
}

fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(name))
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child_elements(node, name)
        .next()
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Text exactly as written; whitespace-only content counts as absent.
fn child_raw_text(node: Node, name: &str) -> Option<String> {
    child_elements(node, name)
        .next()
        .and_then(|child| child.text())
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn read_musicxml_file(path: &Path) -> Result<String, NotationParseError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    if ext.eq_ignore_ascii_case("mxl") {
        return read_mxl_archive(path);
    }
    std::fs::read_to_string(path).map_err(|e| NotationParseError::Io(e.to_string()))
}

const MXL_CONTAINER: &str = "META-INF/container.xml";

type MxlArchive = ZipArchive<std::io::Cursor<Vec<u8>>>;

/// Score document of a compressed archive: the container's declared rootfile,
/// else the first `.xml` entry outside `META-INF/`.
fn read_mxl_archive(path: &Path) -> Result<String, NotationParseError> {
    let data = std::fs::read(path).map_err(|e| NotationParseError::Io(e.to_string()))?;
    let mut archive = ZipArchive::new(std::io::Cursor::new(data))
        .map_err(|e| NotationParseError::Archive(e.to_string()))?;

    if let Some(rootfile) = read_zip_entry(&mut archive, MXL_CONTAINER)?
        .as_deref()
        .and_then(container_rootfile)
    {
        match read_zip_entry(&mut archive, &rootfile)? {
            Some(xml) => return Ok(xml),
            None => log::warn!(
                "event=mxl_rootfile_missing path={} rootfile={}",
                path.display(),
                rootfile
            ),
        }
    }

    let payload = (0..archive.len())
        .filter_map(|idx| archive.by_index(idx).ok().map(|entry| entry.name().to_string()))
        .find(|name| name.ends_with(".xml") && !name.starts_with("META-INF/"));
    match payload {
        Some(name) => read_zip_entry(&mut archive, &name)?
            .ok_or_else(|| NotationParseError::Archive(format!("unreadable entry {name}"))),
        None => Err(NotationParseError::Archive(
            "mxl archive missing MusicXML payload".to_string(),
        )),
    }
}

/// `None` when the archive has no entry of that name.
fn read_zip_entry(
    archive: &mut MxlArchive,
    name: &str,
) -> Result<Option<String>, NotationParseError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(NotationParseError::Archive(e.to_string())),
    };
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| NotationParseError::Io(e.to_string()))?;
    Ok(Some(text))
}

fn container_rootfile(container_xml: &str) -> Option<String> {
    let doc = Document::parse(container_xml).ok()?;
    doc.descendants()
        .find(|node| node.has_tag_name("rootfile"))
        .and_then(|node| node.attribute("full-path"))
        .map(str::to_string)
}
