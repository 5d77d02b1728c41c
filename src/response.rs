//! Field extraction from information responses.
//!
//! Replies such as `+CPSI: LTE CAT-M1,Online,...` are located by their
//! prefix and split into comma separated fields. Indexing is bounds checked,
//! a missing field is `None` rather than a fixed offset into the line.
//! Replies with a fixed layout are decoded into the command's typed response
//! instead, see [`parse_info`].

use atat::AtatCmd;

/// Find the first line of `text` starting with `prefix`, prefix included.
pub fn find_line<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.split(|c: char| matches!(c, '\r' | '\n' | '\0'))
        .map(str::trim_start)
        .find(|line| line.starts_with(prefix))
}

/// Find the first line of `text` starting with `prefix` (e.g. `"+CPSI:"`) and
/// return what follows the prefix, without leading whitespace.
pub fn info_line<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    find_line(text, prefix)
        .and_then(|line| line.strip_prefix(prefix))
        .map(str::trim_start)
}

/// Decode the `prefix` line of a reply frame into `cmd`'s response.
pub fn parse_info<Cmd: AtatCmd>(cmd: &Cmd, text: &str, prefix: &str) -> Option<Cmd::Response> {
    let line = find_line(text, prefix)?;
    match cmd.parse(Ok(line.as_bytes())) {
        Ok(resp) => Some(resp),
        Err(_) => {
            warn!("Malformed {} reply: {:?}", prefix, line);
            None
        }
    }
}

/// Comma separated fields of an information response body.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    body: &'a str,
}

impl<'a> Fields<'a> {
    pub const fn new(body: &'a str) -> Self {
        Self { body }
    }

    /// Field at zero based `index`, as written on the wire.
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.body.split(',').nth(index)
    }

    /// Field at `index` with surrounding whitespace and quotes removed.
    pub fn get_unquoted(&self, index: usize) -> Option<&'a str> {
        self.get(index).map(|f| f.trim().trim_matches('"'))
    }

    pub fn len(&self) -> usize {
        if self.body.is_empty() {
            return 0;
        }
        self.body.split(',').count()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
