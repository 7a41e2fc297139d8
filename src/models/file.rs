use hashbrown::HashMap;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single named text file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub content: String,
    /// Opaque explanation supplied by the generator; never read by the engine.
    pub purpose: Option<String>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            purpose: None,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    /// BLAKE3 hash of the current content.
    pub fn hash(&self) -> String {
        content_hash(&self.content)
    }
}

/// Compute the BLAKE3 hash of file content.
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Insertion-ordered collection of files keyed by exact, case-sensitive name.
///
/// Updating an existing name keeps its position; new names are appended.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    entries: Vec<FileEntry>,
    index: HashMap<String, usize>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn content(&self, name: &str) -> Option<&str> {
        self.get(name).map(|e| e.content.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Replace the content of an existing file, keeping its purpose. Unknown names are ignored.
    pub fn set_content(&mut self, name: &str, content: String) {
        if let Some(&i) = self.index.get(name) {
            self.entries[i].content = content;
        }
    }

    /// Insert a file, or overwrite content and purpose of an existing one in place.
    pub fn upsert(&mut self, entry: FileEntry) {
        match self.index.get(&entry.name) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

impl PartialEq for FileSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for FileSet {}

impl FromIterator<FileEntry> for FileSet {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for entry in iter {
            set.upsert(entry);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Serde: `{ "name": { "content": ..., "purpose": ... } }` in insertion order
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EntryBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryRepr {
    Text(String),
    Full {
        #[serde(default)]
        content: String,
        #[serde(default)]
        purpose: Option<String>,
    },
}

#[derive(Deserialize)]
struct NamedEntry {
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    purpose: Option<String>,
}

impl Serialize for FileSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(
                &entry.name,
                &EntryBody {
                    content: &entry.content,
                    purpose: entry.purpose.as_deref(),
                },
            )?;
        }
        map.end()
    }
}

struct FileSetVisitor;

impl<'de> Visitor<'de> for FileSetVisitor {
    type Value = FileSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of file name to content, or a list of named files")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FileSet, A::Error> {
        let mut set = FileSet::new();
        while let Some((name, repr)) = access.next_entry::<String, EntryRepr>()? {
            let entry = match repr {
                EntryRepr::Text(content) => FileEntry::new(name, content),
                EntryRepr::Full { content, purpose } => FileEntry {
                    name,
                    content,
                    purpose,
                },
            };
            set.upsert(entry);
        }
        Ok(set)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<FileSet, A::Error> {
        let mut set = FileSet::new();
        while let Some(named) = access.next_element::<NamedEntry>()? {
            set.upsert(FileEntry {
                name: named.name,
                content: named.content,
                purpose: named.purpose,
            });
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for FileSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FileSetVisitor)
    }
}
