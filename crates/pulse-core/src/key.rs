//! Tagged metric keys.
//!
//! A metric is registered under a single string key that carries both its
//! name and its tag set:
//!
//! ```text
//! requests[method="GET",status="200"]
//! ```
//!
//! Tags are emitted in sorted key order, so equal tag sets always produce
//! the same key. An untagged metric's key is its (escaped) name, which keeps
//! plain lookups working. Characters that collide with the key syntax are
//! percent-escaped so decoding is lossless.

use std::borrow::Cow;

use crate::tags::Tags;

const ESCAPE: char = '%';
const TAGS_START: char = '[';
const TAGS_END: char = ']';
const PAIR_SEPARATOR: char = ',';
const KEY_VALUE_SEPARATOR: char = '=';
const QUOTE: char = '"';

/// Characters escaped inside a metric name (besides the escape char).
const NAME_RESERVED: &[char] = &[TAGS_START];

/// Characters escaped inside tag keys and values (besides the escape char).
const TAG_RESERVED: &[char] = &[QUOTE, KEY_VALUE_SEPARATOR, PAIR_SEPARATOR, TAGS_START, TAGS_END];

/// Encode a metric name and its tags into a registry key.
pub fn encode_key(name: &str, tags: &Tags) -> String {
    let mut key = escape(name, NAME_RESERVED).into_owned();
    if tags.is_empty() {
        return key;
    }

    key.push(TAGS_START);
    for (i, (k, v)) in tags.iter().enumerate() {
        if i > 0 {
            key.push(PAIR_SEPARATOR);
        }
        key.push_str(&escape(k, TAG_RESERVED));
        key.push(KEY_VALUE_SEPARATOR);
        key.push(QUOTE);
        key.push_str(&escape(v, TAG_RESERVED));
        key.push(QUOTE);
    }
    key.push(TAGS_END);
    key
}

/// Decode a registry key back into the metric name and its tags.
///
/// Keys without a tag block decode to `(name, {})`. A tag block that does not
/// parse is dropped rather than reported: the name is still returned.
pub fn decode_key(key: &str) -> (String, Tags) {
    let Some((raw_name, block)) = key.split_once(TAGS_START) else {
        return (unescape_or_raw(key), Tags::new());
    };

    let name = unescape_or_raw(raw_name);
    let tags = parse_tag_block(block).unwrap_or_default();
    (name, tags)
}

fn parse_tag_block(block: &str) -> Option<Tags> {
    let body = block.strip_suffix(TAGS_END)?;
    let mut tags = Tags::new();
    if body.is_empty() {
        return Some(tags);
    }

    for pair in body.split(PAIR_SEPARATOR) {
        let (k, quoted) = pair.split_once(KEY_VALUE_SEPARATOR)?;
        let v = quoted.strip_prefix(QUOTE)?.strip_suffix(QUOTE)?;
        tags.insert(unescape(k)?, unescape(v)?);
    }
    Some(tags)
}

fn escape<'a>(s: &'a str, reserved: &[char]) -> Cow<'a, str> {
    let needs_escape = |c: char| c == ESCAPE || reserved.contains(&c);
    if !s.contains(needs_escape) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if needs_escape(c) {
            // Every reserved character is ASCII, so one byte covers it.
            out.push(ESCAPE);
            out.push_str(&format!("{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn unescape(s: &str) -> Option<String> {
    if !s.contains(ESCAPE) {
        return Some(s.to_string());
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == ESCAPE as u8 {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn unescape_or_raw(s: &str) -> String {
    unescape(s).unwrap_or_else(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::tags;

    #[test]
    fn round_trip_with_special_characters() {
        let name = "met.ri[]c na$&me";
        let tags = tags([("env", "test"), ("k=e&y[pp]", "val=ue&va[lu]e")]);

        let key = encode_key(name, &tags);
        let (decoded_name, decoded_tags) = decode_key(&key);

        assert_eq!(decoded_name, name);
        assert_eq!(decoded_tags, tags);
    }

    #[test]
    fn round_trip_with_quotes_commas_and_percent() {
        let name = "100%[done]";
        let tags = tags([
            ("quote\"key", "a,b,c"),
            ("pct%", "%41 is not A"),
            ("", "empty key"),
            ("empty value", ""),
        ]);

        let key = encode_key(name, &tags);
        assert_eq!(decode_key(&key), (name.to_string(), tags));
    }

    #[test]
    fn round_trip_unicode() {
        let name = "\u{2206}latency";
        let tags = tags([("région", "île-de-france"), ("emoji", "\u{1F680}[x]")]);

        let key = encode_key(name, &tags);
        assert_eq!(decode_key(&key), (name.to_string(), tags));
    }

    #[test]
    fn tag_order_does_not_matter() {
        let first = tags([("key2", "val2"), ("key1", "val1"), ("key0", "val0")]);
        let second = tags([("key0", "val0"), ("key2", "val2"), ("key1", "val1")]);

        assert_eq!(encode_key("foo", &first), encode_key("foo", &second));
    }

    #[test]
    fn key_format_is_sorted_and_quoted() {
        let key = encode_key("requests", &tags([("status", "200"), ("method", "GET")]));
        assert_eq!(key, r#"requests[method="GET",status="200"]"#);
    }

    #[test]
    fn empty_tags_leave_name_untouched() {
        let key = encode_key("metric.name", &Tags::new());
        assert_eq!(key, "metric.name");
        assert!(!key.contains('['));

        let (name, tags) = decode_key(&key);
        assert_eq!(name, "metric.name");
        assert!(tags.is_empty());
    }

    #[test]
    fn bracket_in_untagged_name_round_trips() {
        let key = encode_key("queue[0].depth", &Tags::new());
        assert_eq!(decode_key(&key), ("queue[0].depth".to_string(), Tags::new()));
    }

    #[test]
    fn plain_key_without_block_decodes_to_no_tags() {
        let (name, tags) = decode_key("cpu.user");
        assert_eq!(name, "cpu.user");
        assert!(tags.is_empty());
    }

    #[test]
    fn malformed_block_degrades_to_no_tags() {
        let (name, tags) = decode_key("disk[unterminated");
        assert_eq!(name, "disk");
        assert!(tags.is_empty());

        let (name, tags) = decode_key("disk[novalue]");
        assert_eq!(name, "disk");
        assert!(tags.is_empty());
    }

    #[test]
    fn invalid_escape_is_kept_verbatim() {
        let (name, _) = decode_key("cpu%zz");
        assert_eq!(name, "cpu%zz");
    }
}
