//! Converting binary data to and from `data:` URLs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::Regex;
use std::sync::OnceLock;

/// Regex for parsing a base64 `data:` URL.
const DATA_URL_RE: &str = r"^data:(?P<mime_type>[^;,]+);base64,(?P<data>.+)$";

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(data))
}

/// Split a `data:` URL into its MIME type and base64 payload.
pub fn parse_data_url(data_url: &str) -> Option<(&str, &str)> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(DATA_URL_RE).ok()).as_ref()?;
    let caps = re.captures(data_url)?;
    let mime_type = caps.name("mime_type")?.as_str();
    let data = caps.name("data")?.as_str();
    Some((mime_type, data))
}

/// Decode the payload of a `data:` URL back into bytes.
pub fn decode_data_url(data_url: &str) -> anyhow::Result<(String, Vec<u8>)> {
    let (mime_type, data) =
        parse_data_url(data_url).ok_or_else(|| anyhow::anyhow!("not a base64 data URL"))?;
    let bytes = BASE64.decode(data)?;
    Ok((mime_type.to_string(), bytes))
}
