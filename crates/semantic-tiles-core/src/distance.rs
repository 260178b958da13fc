//! Sparse pairwise semantic distances between sibling domains.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};

use crate::domain::DomainId;

/// Mapping from an unordered domain pair to a distance in `[0, 1]`.
///
/// On the wire this is a JSON object keyed by `"<idA>,<idB>"`, or by the
/// quoted tuple form `"('<idA>', '<idB>')"` when an id is not plain (see
/// [`pair_key`]). Keys are kept verbatim; they are only parsed when links
/// are built, so entries for domains that are not loaded yet survive a round
/// trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceMap {
    entries: BTreeMap<String, f64>,
}

impl DistanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a distance for the pair `(a, b)`, replacing either orientation.
    pub fn insert(&mut self, a: impl Into<DomainId>, b: impl Into<DomainId>, distance: f64) {
        let (a, b) = (a.into(), b.into());
        self.entries.remove(&pair_key(&b, &a));
        self.entries.insert(pair_key(&a, &b), distance);
    }

    /// Builder-style [`DistanceMap::insert`].
    pub fn with(mut self, a: impl Into<DomainId>, b: impl Into<DomainId>, distance: f64) -> Self {
        self.insert(a, b, distance);
        self
    }

    /// Insert a raw, unparsed key as received from a store.
    pub fn insert_raw(&mut self, key: impl Into<String>, distance: f64) {
        self.entries.insert(key.into(), distance);
    }

    /// Distance for the unordered pair, if present.
    pub fn get(&self, a: &DomainId, b: &DomainId) -> Option<f64> {
        self.entries
            .get(&pair_key(a, b))
            .or_else(|| self.entries.get(&pair_key(b, a)))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entries in key order.
    pub fn raw_entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Parsed entries in key order; unparsable keys are skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (DomainId, DomainId, f64)> + '_ {
        self.entries
            .iter()
            .filter_map(|(key, &d)| parse_pair_key(key).map(|(a, b)| (a, b, d)))
    }

    /// Keep only entries whose both ids satisfy `keep`.
    pub fn retain_ids(&mut self, mut keep: impl FnMut(&DomainId) -> bool) {
        self.entries.retain(|key, _| match parse_pair_key(key) {
            Some((a, b)) => keep(&a) && keep(&b),
            None => false,
        });
    }
}

impl FromIterator<(DomainId, DomainId, f64)> for DistanceMap {
    fn from_iter<T: IntoIterator<Item = (DomainId, DomainId, f64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (a, b, d) in iter {
            map.insert(a, b, d);
        }
        map
    }
}

/// Wire key for the pair `(a, b)`.
///
/// Plain ids give `"a,b"`. Ids containing separators, quotes, parentheses,
/// backslashes or surrounding whitespace give `"('a', 'b')"` with `\\` and
/// `'` escaped, so every key parses back to the ids it was built from.
pub fn pair_key(a: &DomainId, b: &DomainId) -> String {
    if is_plain(a.as_str()) && is_plain(b.as_str()) {
        format!("{a},{b}")
    } else {
        format!("('{}', '{}')", escape(a.as_str()), escape(b.as_str()))
    }
}

fn is_plain(id: &str) -> bool {
    !id.is_empty()
        && id.trim() == id
        && !id
            .chars()
            .any(|c| matches!(c, ',' | '\'' | '"' | '\\' | '(' | ')'))
}

fn escape(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split a pair key into its two ids.
///
/// Accepts `"a,b"` as well as the tuple form `"('a', 'b')"`, whose quoted
/// ids may contain commas and backslash escapes. Returns `None` for keys
/// without a separator, with an empty side, or naming the same id twice.
pub fn parse_pair_key(key: &str) -> Option<(DomainId, DomainId)> {
    let trimmed = key.trim();
    let (a, b) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => parse_tuple(inner)?,
        None => {
            let (a, b) = trimmed.split_once(',')?;
            (clean_id(a)?.to_string(), clean_id(b)?.to_string())
        }
    };
    if a == b {
        return None;
    }
    Some((DomainId::new(a), DomainId::new(b)))
}

/// Like [`parse_pair_key`], but only yields ids accepted by `is_known`.
///
/// Unquoted keys whose ids contain commas (`"Physics, Applied,Biology"`) are
/// split at whichever comma leaves a known id on both sides.
pub fn resolve_pair_key(
    key: &str,
    is_known: impl Fn(&str) -> bool,
) -> Option<(DomainId, DomainId)> {
    if let Some((a, b)) = parse_pair_key(key) {
        if is_known(a.as_str()) && is_known(b.as_str()) {
            return Some((a, b));
        }
    }
    let trimmed = key.trim();
    trimmed.match_indices(',').find_map(|(i, _)| {
        let a = clean_id(&trimmed[..i])?;
        let b = clean_id(&trimmed[i + 1..])?;
        (a != b && is_known(a) && is_known(b)).then(|| (DomainId::new(a), DomainId::new(b)))
    })
}

fn parse_tuple(inner: &str) -> Option<(String, String)> {
    let mut chars = inner.chars().peekable();
    let a = read_token(&mut chars, true)?;
    skip_whitespace(&mut chars);
    if chars.next() != Some(',') {
        return None;
    }
    let b = read_token(&mut chars, false)?;
    skip_whitespace(&mut chars);
    if chars.next().is_some() {
        return None;
    }
    Some((a, b))
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// One tuple element: a quoted string with escapes, or a bare token.
fn read_token(chars: &mut Peekable<Chars<'_>>, stop_at_comma: bool) -> Option<String> {
    skip_whitespace(chars);
    let mut out = String::new();
    match chars.peek().copied() {
        Some(quote @ ('\'' | '"')) => {
            chars.next();
            loop {
                match chars.next()? {
                    '\\' => out.push(chars.next()?),
                    c if c == quote => break,
                    c => out.push(c),
                }
            }
        }
        _ => {
            while let Some(c) = chars.next_if(|&c| !(stop_at_comma && c == ',')) {
                out.push(c);
            }
            out = out.trim().to_string();
        }
    }
    (!out.is_empty()).then_some(out)
}

fn clean_id(raw: &str) -> Option<&str> {
    let s = raw.trim().trim_matches(|c: char| c == '\'' || c == '"').trim();
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair_key_forms() {
        let ab = Some((DomainId::from("a"), DomainId::from("b")));
        assert_eq!(parse_pair_key("a,b"), ab);
        assert_eq!(parse_pair_key(" a , b "), ab);
        assert_eq!(parse_pair_key("('a', 'b')"), ab);
        assert_eq!(
            parse_pair_key("(3, 14)"),
            Some((DomainId::from(3u64), DomainId::from(14u64)))
        );
        assert_eq!(parse_pair_key("a"), None);
        assert_eq!(parse_pair_key("a,"), None);
        assert_eq!(parse_pair_key("a,a"), None);
    }

    #[test]
    fn test_insert_replaces_reverse_orientation() {
        let mut map = DistanceMap::new();
        map.insert("a", "b", 0.2);
        map.insert("b", "a", 0.7);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"a".into(), &"b".into()), Some(0.7));
    }

    #[test]
    fn test_wire_format_is_flat_object() {
        let map = DistanceMap::new().with("x", "y", 0.5);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"x,y":0.5}"#);
        let back: DistanceMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_ids_with_commas_and_quotes_survive_the_wire() {
        let map = DistanceMap::new()
            .with("Physics, Applied", "Biology", 1.0)
            .with("O'Brien", "back\\slash", 0.25);
        let json = serde_json::to_string(&map).unwrap();
        let back: DistanceMap = serde_json::from_str(&json).unwrap();

        let applied = DomainId::from("Physics, Applied");
        let biology = DomainId::from("Biology");
        assert_eq!(back.get(&biology, &applied), Some(1.0));
        assert_eq!(back.get(&"O'Brien".into(), &"back\\slash".into()), Some(0.25));

        let mut pairs: Vec<_> = back.pairs().collect();
        pairs.sort_by(|x, y| x.2.total_cmp(&y.2));
        assert_eq!(pairs[0], ("O'Brien".into(), "back\\slash".into(), 0.25));
        assert_eq!(pairs[1], (applied, biology, 1.0));
    }

    #[test]
    fn test_pair_key_is_plain_when_possible() {
        assert_eq!(pair_key(&"a".into(), &"b".into()), "a,b");
        assert_eq!(pair_key(&"a,1".into(), &"b".into()), "('a,1', 'b')");
        assert_eq!(pair_key(&" a".into(), &"b".into()), "(' a', 'b')");
    }

    #[test]
    fn test_resolve_unquoted_key_against_known_ids() {
        let known = |id: &str| matches!(id, "Physics, Applied" | "Biology");
        assert_eq!(
            resolve_pair_key("Physics, Applied,Biology", known),
            Some(("Physics, Applied".into(), "Biology".into()))
        );
        assert_eq!(
            resolve_pair_key("('Biology', 'Physics, Applied')", known),
            Some(("Biology".into(), "Physics, Applied".into()))
        );
        assert_eq!(resolve_pair_key("Physics,Biology", known), None);
    }

    #[test]
    fn test_retain_ids_drops_unknown_and_garbage() {
        let mut map = DistanceMap::new().with("a", "b", 0.1).with("a", "z", 0.4);
        map.insert_raw("garbage", 0.3);
        map.retain_ids(|id| id.as_str() != "z");
        assert_eq!(map.len(), 1);
        assert_eq!(map.pairs().count(), 1);
    }
}
