use oxrdf::NamedNodeRef;

/// An ordered prefix → namespace IRI table used for IRI compaction.
///
/// Entries are matched in insertion order with the longest namespace winning,
/// so overlapping namespaces behave predictably.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    entries: Vec<(String, String)>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prefix. A prefix registered twice keeps the latest
    /// namespace, mirroring how SPARQL `PREFIX` redeclarations behave.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let prefix = prefix.into();
        let namespace = namespace.into();
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            entry.1 = namespace;
        } else {
            self.entries.push((prefix, namespace));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// Compacts an IRI into `prefix:local` form.
    ///
    /// Returns `None` when no namespace matches or when the remaining local
    /// part cannot be spelled as a prefixed name, in which case callers fall
    /// back to the `<...>` form.
    pub fn compact(&self, iri: NamedNodeRef<'_>) -> Option<(String, String)> {
        let iri = iri.as_str();
        let mut best: Option<(&str, &str)> = None;
        for (prefix, namespace) in self.iter() {
            if iri.starts_with(namespace)
                && best.map_or(true, |(_, b)| namespace.len() > b.len())
            {
                best = Some((prefix, namespace));
            }
        }
        let (prefix, namespace) = best?;
        let local = &iri[namespace.len()..];
        if is_pn_local(local) {
            Some((prefix.to_owned(), local.to_owned()))
        } else {
            None
        }
    }
}

impl FromIterator<(String, String)> for PrefixMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (prefix, namespace) in iter {
            map.insert(prefix, namespace);
        }
        map
    }
}

/// Conservative PN_LOCAL check: accepts the unescaped subset of the grammar
/// production so a compacted name never needs local escapes.
fn is_pn_local(local: &str) -> bool {
    if local.is_empty() {
        // `prefix:` is a valid prefixed name.
        return true;
    }
    let chars: Vec<char> = local.chars().collect();
    if chars[0] == '.' || chars[chars.len() - 1] == '.' {
        return false;
    }
    chars
        .iter()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::NamedNode;

    #[test]
    fn compacts_with_longest_namespace() {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ex", "http://example.org/");
        prefixes.insert("exv", "http://example.org/vocab/");
        let iri = NamedNode::new("http://example.org/vocab/name").unwrap();
        assert_eq!(
            prefixes.compact(iri.as_ref()),
            Some(("exv".to_owned(), "name".to_owned()))
        );
    }

    #[test]
    fn rejects_unspellable_local_parts() {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ex", "http://example.org/");
        let iri = NamedNode::new("http://example.org/a/b#c").unwrap();
        assert_eq!(prefixes.compact(iri.as_ref()), None);
    }

    #[test]
    fn empty_local_part_is_valid() {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ex", "http://example.org/");
        let iri = NamedNode::new("http://example.org/").unwrap();
        assert_eq!(
            prefixes.compact(iri.as_ref()),
            Some(("ex".to_owned(), String::new()))
        );
    }
}
