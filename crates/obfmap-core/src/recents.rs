//! Recently opened mapping files, most recently used first.
//!
//! A file's identity is its filename compared case-insensitively. Each entry
//! carries single-valued properties (persisted as attributes of its `<Item>`)
//! and named lists of values (persisted as repeated child elements), e.g. the
//! PDB files the user attached to a mapping.

use std::path::Path;

use indexmap::IndexMap;

use crate::document::Element;

const FILENAME_ATTRIBUTE: &str = "filename";
const ITEM_ELEMENT: &str = "Item";
const PDB_KEY: &str = "Pdb";

/// Case-insensitive filename comparison used for every lookup.
pub fn same_file(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// One tracked file plus its metadata. Properties and lists keep the order
/// they were first added in, so a loaded `<Item>` saves back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentEntry {
    filename: String,
    properties: IndexMap<String, String>,
    additional: IndexMap<String, Vec<String>>,
}

impl RecentEntry {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Rebuilds an entry from an `<Item>` element. Returns `None` without a filename.
    pub fn from_element(el: &Element) -> Option<Self> {
        let mut entry = RecentEntry::new(el.attribute(FILENAME_ATTRIBUTE)?);
        for (name, value) in el.attributes() {
            if name != FILENAME_ATTRIBUTE {
                entry.properties.insert(name.to_string(), value.to_string());
            }
        }
        for child in el.children() {
            entry.push_additional(child.name(), child.text());
        }
        Some(entry)
    }

    /// Writes filename, then properties as attributes, then one child per additional value.
    pub fn save(&self, el: &mut Element) {
        el.set_attribute(FILENAME_ATTRIBUTE, self.filename.as_str());
        for (key, value) in &self.properties {
            el.set_attribute(key.as_str(), value.as_str());
        }
        for (key, values) in &self.additional {
            for value in values {
                el.append_value(key.as_str(), value.as_str());
            }
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Whether this entry is the given file.
    pub fn is(&self, filename: &str) -> bool {
        same_file(&self.filename, filename)
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Values stored under `key`, in insertion order. Empty if there are none.
    pub fn additional(&self, key: &str) -> &[String] {
        self.additional.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All additional lists by key.
    pub fn additional_lists(&self) -> &IndexMap<String, Vec<String>> {
        &self.additional
    }

    pub fn push_additional(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.additional.entry(key.into()).or_default().push(value.into());
    }

    /// Removes the first occurrence of `value` under `key`. Returns whether one was removed.
    pub fn remove_additional(&mut self, key: &str, value: &str) -> bool {
        let Some(list) = self.additional.get_mut(key) else {
            return false;
        };
        match list.iter().position(|v| v == value) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// MRU-ordered registry of [`RecentEntry`]. No two entries share an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentRegistry {
    entries: Vec<RecentEntry>,
}

impl RecentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `filename` to the front, creating an entry for it if needed.
    pub fn touch(&mut self, filename: &str) {
        let entry = match self.position(filename) {
            Some(pos) => self.entries.remove(pos),
            None => RecentEntry::new(filename),
        };
        tracing::trace!(filename, "promoting recent file");
        self.entries.insert(0, entry);
    }

    pub fn get(&self, filename: &str) -> Option<&RecentEntry> {
        self.entries.iter().find(|e| e.is(filename))
    }

    fn get_mut(&mut self, filename: &str) -> Option<&mut RecentEntry> {
        self.entries.iter_mut().find(|e| e.is(filename))
    }

    fn position(&self, filename: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.is(filename))
    }

    /// Appends `value` to the `key` list of `filename`. No-op for unknown files.
    pub fn add_additional(&mut self, filename: &str, key: &str, value: &str) {
        if let Some(entry) = self.get_mut(filename) {
            entry.push_additional(key, value);
        }
    }

    /// Removes the first `value` from the `key` list of `filename`. No-op for unknown files.
    pub fn remove_additional(&mut self, filename: &str, key: &str, value: &str) {
        if let Some(entry) = self.get_mut(filename) {
            entry.remove_additional(key, value);
        }
    }

    /// The `key` list of `filename`, or `None` when the file is not tracked.
    pub fn additional(&self, filename: &str, key: &str) -> Option<&[String]> {
        self.get(filename).map(|e| e.additional(key))
    }

    pub fn add_pdb(&mut self, filename: &str, pdb: &str) {
        self.add_additional(filename, PDB_KEY, pdb);
    }

    pub fn pdbs(&self, filename: &str) -> Option<&[String]> {
        self.additional(filename, PDB_KEY)
    }

    pub fn remove_pdb(&mut self, filename: &str, pdb: &str) {
        self.remove_additional(filename, PDB_KEY, pdb);
    }

    /// Sets a property of `filename`. No-op for unknown files.
    pub fn set_property(&mut self, filename: &str, key: &str, value: &str) {
        if let Some(entry) = self.get_mut(filename) {
            entry.set_property(key, value);
        }
    }

    pub fn property(&self, filename: &str, key: &str) -> Option<&str> {
        self.get(filename).and_then(|e| e.property(key))
    }

    /// Filenames in MRU order. Each call walks the current state.
    pub fn list(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(RecentEntry::filename)
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry whose file `exists` reports as gone and returns how many
    /// were dropped. This loses their metadata for good.
    pub fn prune_missing(&mut self, exists: impl Fn(&Path) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| still_exists(e, &exists));
        before - self.entries.len()
    }

    /// Appends the items of a `<Recents>` element after the current entries and
    /// returns how many were dropped because their file is gone. Missing files are
    /// filtered before identities are compared. Items without a filename, or naming a file already tracked, are
    /// skipped.
    pub fn load(&mut self, el: &Element, exists: impl Fn(&Path) -> bool) -> usize {
        let mut dropped = 0;
        for item in el.children() {
            let Some(entry) = RecentEntry::from_element(item) else {
                tracing::warn!("skipping recent item without a filename");
                continue;
            };
            if !still_exists(&entry, &exists) {
                dropped += 1;
                continue;
            }
            if self.position(entry.filename()).is_some() {
                continue;
            }
            self.entries.push(entry);
        }
        dropped
    }

    /// Writes one `<Item>` per entry, MRU first.
    pub fn save(&self, el: &mut Element) {
        for entry in &self.entries {
            entry.save(el.append_child(Element::new(ITEM_ELEMENT)));
        }
    }
}

fn still_exists(entry: &RecentEntry, exists: &impl Fn(&Path) -> bool) -> bool {
    let keep = exists(Path::new(&entry.filename));
    if !keep {
        tracing::debug!(filename = %entry.filename, "dropping recent file that no longer exists");
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(files: &[&str]) -> RecentRegistry {
        let mut r = RecentRegistry::new();
        for f in files.iter().rev() {
            r.touch(f);
        }
        r
    }

    fn listed(r: &RecentRegistry) -> Vec<&str> {
        r.list().collect()
    }

    #[test]
    fn touch_moves_to_front_and_keeps_others_in_order() {
        let mut r = registry(&["a.xml", "b.xml", "c.xml"]);
        r.touch("c.xml");
        assert_eq!(listed(&r), vec!["c.xml", "a.xml", "b.xml"]);
        r.touch("d.xml");
        assert_eq!(listed(&r), vec!["d.xml", "c.xml", "a.xml", "b.xml"]);
    }

    #[test]
    fn touch_never_duplicates_case_variants() {
        let mut r = RecentRegistry::new();
        for f in ["Map.xml", "MAP.XML", "other.xml", "map.xml", "Other.XML"] {
            r.touch(f);
        }
        assert_eq!(r.len(), 2);
        // The entry keeps the spelling it was first created with.
        assert_eq!(listed(&r), vec!["other.xml", "Map.xml"]);
    }

    #[test]
    fn touch_keeps_entry_metadata() {
        let mut r = registry(&["a.xml", "b.xml"]);
        r.set_property("b.xml", "k", "v");
        r.touch("B.XML");
        assert_eq!(r.property("b.xml", "k"), Some("v"));
    }

    #[test]
    fn properties_are_scoped_per_entry() {
        let mut r = registry(&["a.txt", "b.txt"]);
        r.set_property("a.txt", "k", "v");
        assert_eq!(r.property("A.TXT", "k"), Some("v"));
        assert_eq!(r.property("b.txt", "k"), None);
        r.set_property("a.txt", "k", "w");
        assert_eq!(r.property("a.txt", "k"), Some("w"));
    }

    #[test]
    fn empty_property_is_not_missing() {
        let mut r = registry(&["a.txt"]);
        r.set_property("a.txt", "k", "");
        assert_eq!(r.property("a.txt", "k"), Some(""));
        assert_eq!(r.property("a.txt", "other"), None);
    }

    #[test]
    fn additional_values_keep_append_order() {
        let mut r = registry(&["f.xml"]);
        r.add_pdb("f.xml", "x");
        r.add_pdb("f.xml", "y");
        r.add_pdb("f.xml", "x");
        assert_eq!(r.pdbs("f.xml").unwrap(), ["x", "y", "x"]);
        r.remove_pdb("f.xml", "x");
        assert_eq!(r.pdbs("f.xml").unwrap(), ["y", "x"]);
        r.remove_additional("f.xml", "Pdb", "x");
        assert_eq!(r.additional("f.xml", "Pdb").unwrap(), ["y"]);
    }

    #[test]
    fn operations_on_unknown_files_are_no_ops() {
        let mut r = registry(&["f.xml"]);
        r.add_additional("g.xml", "Pdb", "x");
        r.set_property("g.xml", "k", "v");
        r.remove_additional("g.xml", "Pdb", "x");
        assert_eq!(r.len(), 1);
        assert_eq!(r.additional("g.xml", "Pdb"), None);
        assert_eq!(r.additional("f.xml", "Pdb"), Some(&[][..]));
    }

    #[test]
    fn list_reflects_current_state() {
        let mut r = registry(&["a", "b"]);
        assert_eq!(listed(&r), vec!["a", "b"]);
        r.touch("b");
        assert_eq!(listed(&r), vec!["b", "a"]);
        assert!(!r.is_empty());
        assert!(RecentRegistry::new().is_empty());
    }

    #[test]
    fn save_then_load_reproduces_entries() {
        let mut r = registry(&["one.xml", "two.xml"]);
        r.set_property("one.xml", "Offset", "12");
        r.add_pdb("one.xml", "a.pdb");
        r.add_pdb("one.xml", "b.pdb");
        r.add_additional("one.xml", "Source", "src");
        let mut el = Element::new("Recents");
        r.save(&mut el);

        let item = &el.children()[0];
        assert_eq!(item.attribute("filename"), Some("one.xml"));
        assert_eq!(item.attribute("Offset"), Some("12"));
        assert_eq!(item.children().len(), 3);

        let mut loaded = RecentRegistry::new();
        loaded.load(&el, |_| true);
        assert_eq!(loaded, r);
    }

    #[test]
    fn load_skips_known_and_nameless_items() {
        let mut el = Element::new("Recents");
        el.append_child(Element::new("Item")).set_attribute("filename", "a.xml");
        el.append_child(Element::new("Item"));
        el.append_child(Element::new("Item")).set_attribute("filename", "A.XML");
        let mut r = registry(&["b.xml"]);
        r.load(&el, |_| true);
        assert_eq!(listed(&r), vec!["b.xml", "a.xml"]);
    }

    #[test]
    fn load_then_save_keeps_item_order() {
        let doc = Element::parse(
            r#"<Recents><Item filename="m.xml" zeta="1" alpha="2"><Source>s</Source><Pdb>p</Pdb><Source>t</Source></Item></Recents>"#,
        )
        .unwrap();
        let mut r = RecentRegistry::new();
        r.load(&doc, |_| true);

        let mut saved = Element::new("Recents");
        r.save(&mut saved);
        let item = &saved.children()[0];
        let attrs: Vec<_> = item.attributes().map(|(k, _)| k).collect();
        assert_eq!(attrs, vec!["filename", "zeta", "alpha"]);
        let kids: Vec<_> = item.children().iter().map(Element::name).collect();
        assert_eq!(kids, vec!["Source", "Source", "Pdb"]);
    }

    #[test]
    fn whitespace_values_survive_a_file_round_trip() {
        let mut r = registry(&["m.xml"]);
        r.add_additional("m.xml", "Arg", " ");
        r.set_property("m.xml", "Indent", "  ");
        let mut el = Element::new("Recents");
        r.save(&mut el);

        let reparsed = Element::parse(&el.to_xml_string().unwrap()).unwrap();
        let mut loaded = RecentRegistry::new();
        loaded.load(&reparsed, |_| true);
        assert_eq!(loaded.additional("m.xml", "Arg").unwrap(), [" "]);
        assert_eq!(loaded, r);
    }

    #[test]
    fn stale_item_does_not_hide_a_live_case_variant() {
        let mut el = Element::new("Recents");
        el.append_child(Element::new("Item")).set_attribute("filename", "a.xml");
        el.append_child(Element::new("Item")).set_attribute("filename", "A.XML");
        let mut r = RecentRegistry::new();
        let dropped = r.load(&el, |p| p == Path::new("A.XML"));
        assert_eq!(dropped, 1);
        assert_eq!(listed(&r), vec!["A.XML"]);
    }

    #[test]
    fn load_leaves_existing_entries_alone() {
        let mut el = Element::new("Recents");
        el.append_child(Element::new("Item")).set_attribute("filename", "new.xml");
        let mut r = registry(&["kept.xml"]);
        r.load(&el, |p| p != Path::new("kept.xml"));
        assert_eq!(listed(&r), vec!["kept.xml", "new.xml"]);
    }

    #[test]
    fn prune_missing_drops_only_vanished_files() {
        let mut r = registry(&["keep.xml", "gone.xml", "keep2.xml"]);
        let dropped = r.prune_missing(|p| !p.to_string_lossy().starts_with("gone"));
        assert_eq!(dropped, 1);
        assert_eq!(listed(&r), vec!["keep.xml", "keep2.xml"]);
    }

    #[test]
    fn same_file_ignores_case_beyond_ascii() {
        assert!(same_file("C:\\Maps\\ÄÖ.xml", "c:\\maps\\äö.XML"));
        assert!(!same_file("a.xml", "a.xm"));
    }
}
