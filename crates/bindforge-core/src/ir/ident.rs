use std::fmt;

use serde::{Deserialize, Serialize};

/// A camelCase identifier and the names derived from it.
///
/// The wrapped string is never modified; every form is computed on demand.
/// All case handling is ASCII-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    pub fn new(ident: impl Into<String>) -> Self {
        Self(ident.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `srcPos` → `SrcPos`.
    pub fn class_name(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => {
                let mut out = String::with_capacity(self.0.len());
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
                out
            }
            None => String::new(),
        }
    }

    /// Upper snake case: `srcPos` → `SRC_POS`, `SrcPosF` → `SRC_POS_F`,
    /// `SrcPos1` → `SRC_POS_1`.
    ///
    /// Every uppercase letter and digit gets its own leading separator, so
    /// runs are split character by character.
    pub fn constant(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for c in self.0.chars() {
            if c.is_ascii_uppercase() || c.is_ascii_digit() {
                out.push('_');
            }
            out.push(c.to_ascii_uppercase());
        }
        out.trim_matches('_').to_string()
    }

    pub fn method(&self) -> &str {
        &self.0
    }

    /// Member-field form: `srcPos` → `m_srcPos`.
    pub fn attribute(&self) -> String {
        format!("m_{}", self.method())
    }

    pub fn upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    pub fn lower(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Whether the identifier can be used verbatim as a C-family identifier
    /// (XID_Start or `_`, followed by XID_Continue).
    pub fn is_valid(&self) -> bool {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
                chars.all(unicode_ident::is_xid_continue)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}
