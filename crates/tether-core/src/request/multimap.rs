//! Ordered multi-valued string mapping used for headers and query parameters.

/// An insertion-ordered mapping where each key may carry several values.
///
/// Lookups are linear; header and parameter sets are small enough that a
/// flat vector beats a hashed index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<(String, String)>,
}

impl MultiMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`, keeping any existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value under `key`, comparing keys ASCII case-insensitively.
    ///
    /// HTTP header names are case-insensitive.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value stored under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over all `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored pairs (not distinct keys).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the pairs as `application/x-www-form-urlencoded`.
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for MultiMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let mut map = MultiMap::new();
        map.append("tag", "a");
        map.append("id", "7");
        map.append("tag", "b");

        assert_eq!(map.get("tag"), Some("a"));
        assert_eq!(map.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.len(), 3);
        assert_eq!(
            map.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["tag", "id", "tag"]
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let map: MultiMap = [("content-type", "text/plain")].into_iter().collect();
        assert_eq!(map.get_ignore_case("Content-Type"), Some("text/plain"));
        assert_eq!(map.get("Content-Type"), None);
    }

    #[test]
    fn query_string_is_url_encoded() {
        let map: MultiMap = [("q", "a b&c"), ("page", "2")].into_iter().collect();
        assert_eq!(map.to_query_string(), "q=a%20b%26c&page=2");
    }
}
