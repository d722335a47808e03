use crate::error::Error;
use encoding_rs::{Encoding, IBM866, WINDOWS_1251};
use tracing::{debug, warn};

/// What the archive claims about an entry name's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingHint {
    /// The entry carries the zip UTF-8 name flag.
    Utf8,
    /// No declaration; legacy code pages are worth trying.
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    /// Decoded name with `/` as the only separator.
    pub text: String,
    /// Encoding that produced `text`, or `None` when replacement characters were substituted.
    pub encoding: Option<&'static str>,
}

impl DecodedName {
    pub fn is_substituted(&self) -> bool {
        self.encoding.is_none()
    }
}

/// Fallback chain: strict UTF-8, then the legacy code pages, then lossy
/// replacement. Decoding never fails. Among legacy pages that decode a name
/// cleanly the one producing the most letters is used, earlier pages first
/// on a tie.
#[derive(Debug, Clone)]
pub struct FilenameDecoder {
    legacy: Vec<&'static Encoding>,
}

impl Default for FilenameDecoder {
    fn default() -> Self {
        Self {
            legacy: vec![IBM866, WINDOWS_1251],
        }
    }
}

fn plausible(text: &str) -> bool {
    !text.chars().any(char::is_control)
}

/// Non-ASCII letters in `text`. Single-byte code pages decode almost any
/// byte string, so the page that yields the most letters wins.
fn letter_score(text: &str) -> usize {
    text.chars()
        .filter(|c| !c.is_ascii() && c.is_alphabetic())
        .count()
}

fn normalize_separators(text: &str) -> String {
    text.replace('\\', "/")
}

impl FilenameDecoder {
    pub fn new(legacy: Vec<&'static Encoding>) -> Self {
        Self { legacy }
    }

    /// Build the chain from WHATWG labels such as `ibm866` or `cp1251`.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, Error> {
        let legacy = labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| Error::Other(format!("Unknown encoding label '{}'", label)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { legacy })
    }

    pub fn decode(&self, raw: &[u8], hint: EncodingHint) -> DecodedName {
        if let Ok(text) = std::str::from_utf8(raw) {
            if plausible(text) {
                return DecodedName {
                    text: normalize_separators(text),
                    encoding: Some("UTF-8"),
                };
            }
        }

        if hint == EncodingHint::Unspecified {
            let mut best: Option<(&'static Encoding, usize, String)> = None;
            for &encoding in &self.legacy {
                let text = match encoding.decode_without_bom_handling_and_without_replacement(raw) {
                    Some(text) if plausible(&text) => text,
                    _ => continue,
                };
                let score = letter_score(&text);
                // Earlier pages keep ties.
                if best.as_ref().map_or(true, |(_, top, _)| score > *top) {
                    best = Some((encoding, score, text.into_owned()));
                }
            }
            if let Some((encoding, _, text)) = best {
                debug!("Decoded entry name using {}: {}", encoding.name(), text);
                return DecodedName {
                    text: normalize_separators(&text),
                    encoding: Some(encoding.name()),
                };
            }
        }

        let text: String = String::from_utf8_lossy(raw)
            .chars()
            .map(|c| if c.is_control() { char::REPLACEMENT_CHARACTER } else { c })
            .collect();
        let text = normalize_separators(&text);
        warn!(
            "{}; using '{}'",
            Error::DecodeFailure { raw: raw.to_vec() },
            text
        );
        DecodedName {
            text,
            encoding: None,
        }
    }
}
