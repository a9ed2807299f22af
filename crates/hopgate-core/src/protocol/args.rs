//! Session argument strings (panic-free).
//!
//! Format: comma-separated `key=value` pairs. Values may be double-quoted, in
//! which case they can contain commas and `\"` escapes:
//!
//! ```text
//! ram_quota=4096, cap_quota=3, label="app -> nic"
//! ```
//!
//! Parsing is lenient: a fragment without `=` or with an empty key is skipped,
//! an unterminated quote runs to the end of the input. Nothing here fails.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Arg {
    key: String,
    value: String,
    quoted: bool,
}

/// Parsed session arguments, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionArgs {
    args: Vec<Arg>,
}

impl SessionArgs {
    pub fn parse(s: &str) -> Self {
        let mut args = Vec::new();
        for fragment in split_unquoted(s) {
            let Some((key, value)) = fragment.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let (value, quoted) = unquote(value.trim());
            args.push(Arg { key: key.to_string(), value, quoted });
        }
        Self { args }
    }

    /// Raw (unquoted) value of the first argument named `key`.
    pub fn find(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Numeric value of `key`. Accepts `K`, `M` and `G` size suffixes.
    /// Returns `None` if absent, malformed, or overflowing.
    pub fn ulong(&self, key: &str) -> Option<u64> {
        self.find(key).and_then(parse_ulong)
    }

    /// Set `key` to a numeric value, replacing an existing entry in place or
    /// appending a new one.
    pub fn set_ulong(&mut self, key: &str, value: u64) {
        let value = value.to_string();
        match self.args.iter_mut().find(|a| a.key == key) {
            Some(arg) => {
                arg.value = value;
                arg.quoted = false;
            }
            None => self.args.push(Arg { key: key.to_string(), value, quoted: false }),
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Display for SessionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if arg.quoted || needs_quotes(&arg.value) {
                write!(f, "{}=\"{}\"", arg.key, arg.value.replace('"', "\\\""))?;
            } else {
                write!(f, "{}={}", arg.key, arg.value)?;
            }
        }
        Ok(())
    }
}

/// Split at commas that are not inside double quotes.
fn split_unquoted(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

fn unquote(v: &str) -> (String, bool) {
    let Some(inner) = v.strip_prefix('"') else {
        return (v.to_string(), false);
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        out.push(c);
    }
    (out, true)
}

fn needs_quotes(v: &str) -> bool {
    v.is_empty() || v.contains([',', ' ', '"', '='])
}

fn parse_ulong(v: &str) -> Option<u64> {
    let v = v.trim();
    let (digits, shift) = match v.as_bytes().last()? {
        b'K' => (&v[..v.len() - 1], 10),
        b'M' => (&v[..v.len() - 1], 20),
        b'G' => (&v[..v.len() - 1], 30),
        _ => (v, 0),
    };
    let base: u64 = digits.parse().ok()?;
    base.checked_mul(1u64 << shift)
}
