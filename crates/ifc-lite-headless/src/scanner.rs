// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast STEP entity scanner
//!
//! Scans IFC files to discover entities without full parsing. Only the bits
//! the headless engine needs are decoded: type names, the root attributes
//! (GlobalId, Name), cartesian point coordinates and colours.

use memchr::memchr;

/// Signature every STEP physical file starts with
const STEP_SIGNATURE: &str = "ISO-10303-21";

/// One scanned entity
#[derive(Clone, Debug, PartialEq)]
pub struct ScannedEntity<'a> {
    pub id: u32,
    pub type_name: &'a str,
    /// Raw attribute list without the enclosing parentheses
    pub attributes: &'a str,
}

impl<'a> ScannedEntity<'a> {
    /// Top-level attributes, split at commas outside strings and lists
    pub fn attribute_list(&self) -> Vec<&'a str> {
        split_attributes(self.attributes)
    }

    /// String value of the attribute at `index`, if it is a quoted string
    pub fn string_attribute(&self, index: usize) -> Option<String> {
        let list = self.attribute_list();
        decode_string(list.get(index)?)
    }

    /// Whether this entity derives from IfcRoot (first attribute is a GlobalId)
    pub fn is_rooted(&self) -> bool {
        self.attribute_list()
            .first()
            .is_some_and(|first| first.trim_start().starts_with('\''))
    }

    /// Real number at `index`
    pub fn real_attribute(&self, index: usize) -> Option<f64> {
        let list = self.attribute_list();
        lexical_core::parse(list.get(index)?.as_bytes()).ok()
    }

    /// Components of an IFCCOLOURRGB, each in 0.0-1.0
    pub fn colour_rgb(&self) -> Option<[f64; 3]> {
        if !self.type_name.eq_ignore_ascii_case("IFCCOLOURRGB") {
            return None;
        }
        Some([
            self.real_attribute(1)?,
            self.real_attribute(2)?,
            self.real_attribute(3)?,
        ])
    }

    /// Coordinates of an IFCCARTESIANPOINT
    pub fn cartesian_point(&self) -> Option<[f64; 3]> {
        if !self.type_name.eq_ignore_ascii_case("IFCCARTESIANPOINT") {
            return None;
        }
        let inner = self.attributes.trim();
        let inner = inner.strip_prefix('(')?.strip_suffix(')')?;

        let mut coords = [0.0f64; 3];
        let mut count = 0;
        for num_str in inner.split(',') {
            let num_str = num_str.trim();
            if num_str.is_empty() {
                continue;
            }
            if count == 3 {
                return None;
            }
            coords[count] = lexical_core::parse(num_str.as_bytes()).ok()?;
            count += 1;
        }
        // 2D points sit on the ground plane
        (count >= 2).then_some(coords)
    }
}

/// Check the STEP signature and locate the DATA section
///
/// Returns the byte offset just after `DATA;`.
pub fn validate(content: &str) -> Result<usize, String> {
    if !content.trim_start().starts_with(STEP_SIGNATURE) {
        return Err(format!("missing {STEP_SIGNATURE} signature"));
    }
    let data = content
        .find("DATA;")
        .ok_or_else(|| "missing DATA section".to_string())?;
    Ok(data + 5)
}

/// Entity scanner over the DATA section
pub struct EntityScanner<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner for the given content
    pub fn new(content: &'a str) -> Self {
        // Skip header section (find DATA; line)
        let pos = content.find("DATA;").map(|p| p + 5).unwrap_or(0);
        Self { content, pos }
    }

    /// Scan to find the next entity
    pub fn next_entity(&mut self) -> Option<ScannedEntity<'a>> {
        let bytes = self.content.as_bytes();

        while self.pos < bytes.len() {
            let hash_pos = memchr(b'#', &bytes[self.pos..])?;
            self.pos += hash_pos;

            // Entity definitions start a line; other #s are references
            let is_entity_start = self.pos == 0
                || matches!(bytes[self.pos - 1], b'\n' | b'\r' | b';' | b' ' | b'\t')
                    && self.line_prefix_is_blank();

            if !is_entity_start {
                self.pos += 1;
                continue;
            }

            self.pos += 1;
            let id_start = self.pos;
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            if self.pos == id_start {
                continue;
            }
            let id: u32 = match lexical_core::parse(&bytes[id_start..self.pos]) {
                Ok(id) => id,
                Err(_) => continue,
            };

            self.skip_blanks();
            if self.pos >= bytes.len() || bytes[self.pos] != b'=' {
                continue;
            }
            self.pos += 1;
            self.skip_blanks();

            let type_start = self.pos;
            while self.pos < bytes.len()
                && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
            {
                self.pos += 1;
            }
            if self.pos == type_start {
                continue;
            }
            let type_name = &self.content[type_start..self.pos];

            let attr_start = self.pos;
            let end = self.find_entity_end()?;
            let body = self.content[attr_start..end - 1].trim();
            let attributes = body
                .strip_prefix('(')
                .and_then(|b| b.strip_suffix(')'))
                .unwrap_or(body);

            return Some(ScannedEntity {
                id,
                type_name,
                attributes,
            });
        }

        None
    }

    fn skip_blanks(&mut self) {
        let bytes = self.content.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
            self.pos += 1;
        }
    }

    fn line_prefix_is_blank(&self) -> bool {
        let bytes = self.content.as_bytes();
        let mut i = self.pos;
        while i > 0 {
            match bytes[i - 1] {
                b' ' | b'\t' => i -= 1,
                b'\n' | b'\r' | b';' => return true,
                _ => return false,
            }
        }
        true
    }

    /// Find the end of an entity (semicolon), handling quoted strings
    fn find_entity_end(&mut self) -> Option<usize> {
        let bytes = self.content.as_bytes();
        let mut in_string = false;

        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' => {
                    // Escaped quote ''
                    if in_string && self.pos + 1 < bytes.len() && bytes[self.pos + 1] == b'\'' {
                        self.pos += 2;
                        continue;
                    }
                    in_string = !in_string;
                }
                b';' if !in_string => {
                    self.pos += 1;
                    return Some(self.pos);
                }
                _ => {}
            }
            self.pos += 1;
        }

        None
    }
}

impl<'a> Iterator for EntityScanner<'a> {
    type Item = ScannedEntity<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entity()
    }
}

fn split_attributes(attributes: &str) -> Vec<&str> {
    let bytes = attributes.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                if in_string && i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                in_string = !in_string;
            }
            b'(' if !in_string => depth += 1,
            b')' if !in_string => depth = depth.saturating_sub(1),
            b',' if !in_string && depth == 0 => {
                parts.push(attributes[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < attributes.len() || !parts.is_empty() {
        parts.push(attributes[start..].trim());
    }
    parts
}

fn decode_string(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}
