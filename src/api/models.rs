use std::collections::HashMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};

use crate::error::Result;

/// Body of `POST /render`.
///
/// Decoding is lenient in the way loosely typed JSON clients expect: keys
/// match their field case-insensitively, a later key overrides an earlier
/// one, and `null` leaves a scalar field at its default. A `null` for
/// `replace` clears the mapping and a `null` inside it replaces with the
/// empty string.
#[derive(Debug, Default, PartialEq)]
pub struct RenderRequest {
    pub source: String,
    pub remove_hyphens: bool,
    pub replace: HashMap<String, String>,
}

impl RenderRequest {
    /// Parses a request body. A bare `null` decodes to the empty request.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let parsed: Option<RenderRequest> = serde_json::from_slice(body)?;
        Ok(parsed.unwrap_or_default())
    }
}

enum Field {
    Source,
    RemoveHyphens,
    Replace,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        let folded = fold_key(key);
        match folded.as_str() {
            "source" => Some(Field::Source),
            "removehyphens" => Some(Field::RemoveHyphens),
            "replace" => Some(Field::Replace),
            _ => None,
        }
    }
}

// ASCII is folded to lowercase. The Kelvin sign and long s are the only
// non-ASCII characters that fold onto ASCII letters.
fn fold_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '\u{212A}' => 'k',
            '\u{017F}' => 's',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

impl<'de> Deserialize<'de> for RenderRequest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RenderRequestVisitor)
    }
}

struct RenderRequestVisitor;

impl<'de> Visitor<'de> for RenderRequestVisitor {
    type Value = RenderRequest;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a render request object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut req = RenderRequest::default();
        while let Some(key) = map.next_key::<String>()? {
            match Field::from_key(&key) {
                Some(Field::Source) => {
                    if let Some(source) = map.next_value::<Option<String>>()? {
                        req.source = source;
                    }
                }
                Some(Field::RemoveHyphens) => {
                    if let Some(flag) = map.next_value::<Option<bool>>()? {
                        req.remove_hyphens = flag;
                    }
                }
                Some(Field::Replace) => {
                    match map.next_value::<Option<HashMap<String, Option<String>>>>()? {
                        Some(entries) => req.replace.extend(
                            entries
                                .into_iter()
                                .map(|(placeholder, value)| (placeholder, value.unwrap_or_default())),
                        ),
                        None => req.replace.clear(),
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn parses_full_payload() {
        let req = RenderRequest::from_slice(
            br##"{"source":"http://host/a.svg","removehyphens":true,"replace":{"#NAME#":"World"}}"##,
        )
        .unwrap();
        assert_eq!(req.source, "http://host/a.svg");
        assert!(req.remove_hyphens);
        assert_eq!(req.replace.get("#NAME#").map(String::as_str), Some("World"));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let req = RenderRequest::from_slice(
            br##"{"Source":"http://host/a.svg","RemoveHyphens":true,"REPLACE":{"#A#":"b"}}"##,
        )
        .unwrap();
        assert_eq!(req.source, "http://host/a.svg");
        assert!(req.remove_hyphens);
        assert_eq!(req.replace.get("#A#").map(String::as_str), Some("b"));

        let req = RenderRequest::from_slice("{\"\u{017F}ource\":\"x\"}".as_bytes()).unwrap();
        assert_eq!(req.source, "x");
    }

    #[test]
    fn later_duplicate_key_wins() {
        let req =
            RenderRequest::from_slice(br#"{"removehyphens":true,"removeHyphens":false}"#).unwrap();
        assert!(!req.remove_hyphens);

        let req = RenderRequest::from_slice(br#"{"source":"a","source":"b"}"#).unwrap();
        assert_eq!(req.source, "b");
    }

    #[test]
    fn null_leaves_earlier_scalar_value() {
        let req = RenderRequest::from_slice(br#"{"source":"a","Source":null}"#).unwrap();
        assert_eq!(req.source, "a");
    }

    #[test]
    fn null_replacement_value_is_empty_string() {
        let req = RenderRequest::from_slice(br##"{"replace":{"#A#":null}}"##).unwrap();
        assert_eq!(req.replace.get("#A#").map(String::as_str), Some(""));
    }

    #[test]
    fn repeated_replace_maps_merge_and_null_clears() {
        let req = RenderRequest::from_slice(
            br##"{"replace":{"#A#":"1"},"Replace":{"#B#":"2","#A#":"3"}}"##,
        )
        .unwrap();
        assert_eq!(req.replace.len(), 2);
        assert_eq!(req.replace.get("#A#").map(String::as_str), Some("3"));

        let req = RenderRequest::from_slice(br##"{"replace":{"#A#":"1"},"replace":null}"##).unwrap();
        assert!(req.replace.is_empty());
    }

    #[test]
    fn missing_and_null_fields_default() {
        let req = RenderRequest::from_slice(br#"{"source":null,"replace":null}"#).unwrap();
        assert_eq!(req, RenderRequest::default());
        assert_eq!(RenderRequest::from_slice(b"{}").unwrap(), RenderRequest::default());
        assert_eq!(RenderRequest::from_slice(b"null").unwrap(), RenderRequest::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req = RenderRequest::from_slice(br#"{"source":"x","extra":[1,2]}"#).unwrap();
        assert_eq!(req.source, "x");
    }

    #[test]
    fn wrong_types_are_malformed() {
        for body in [
            &br#"{"source":42}"#[..],
            br#"{"removehyphens":"yes"}"#,
            br##"{"replace":{"#A#":1}}"##,
            br#"{"replace":[]}"#,
            br#"[]"#,
            br#""source""#,
            b"",
            b"{not json",
        ] {
            let err = RenderRequest::from_slice(body).unwrap_err();
            assert!(matches!(err, AppError::MalformedPayload(_)), "body {:?}", body);
        }
    }
}
