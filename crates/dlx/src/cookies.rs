//! Cookie string handling for the transport.
//!
//! Users either paste a browser `Cookie` header value (`a=1; b=2`) or the
//! contents of a Netscape `cookies.txt` export. The latter is parsed into
//! discrete name/value pairs; anything else is sent verbatim.

/// Name and value of one Netscape cookie-file line. Domain, path and flags
/// are not kept; every configured cookie goes out with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Parse Netscape cookie-file text.
///
/// Each data line has seven tab-separated fields:
/// `domain  include-subdomains  path  secure  expiry  name  value`.
/// Comment and malformed lines are skipped.
pub fn parse_netscape(raw: &str) -> Vec<Cookie> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            let line = line.strip_prefix(HTTP_ONLY_PREFIX).unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 7 || fields[5].is_empty() {
                return None;
            }
            Some(Cookie {
                name: fields[5].to_string(),
                value: fields[6].to_string(),
            })
        })
        .collect()
}

/// Turn a configured cookie string into a `Cookie` header value.
///
/// Netscape cookie files are flattened into `name=value; ...`; any other
/// input is returned trimmed but otherwise unchanged.
pub fn cookie_header_value(raw: &str) -> String {
    let cookies = parse_netscape(raw);
    if cookies.is_empty() {
        return raw.trim().to_string();
    }
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}
