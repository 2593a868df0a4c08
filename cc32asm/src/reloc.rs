use std::fmt;

/// Patch kinds the linker understands. The 16-bit pair patches the
/// two halves of a double-word constant load; the 32-bit kinds patch
/// whole words, with the negative variant subtracting the resolved
/// address instead of adding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    R16High,
    R16Low,
    R32,
    R32Negative,
}

impl RelocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelocKind::R16High => "R_16_high",
            RelocKind::R16Low => "R_16_low",
            RelocKind::R32 => "R_32",
            RelocKind::R32Negative => "R_32_negative",
        }
    }
}

impl fmt::Display for RelocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `value` is a section ordinal for a local target and a symbol
/// ordinal for a global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationEntry {
    pub offset: i32,
    pub kind: RelocKind,
    pub value: u32,
}

/// Append-only patch list for one section, in discovery order.
pub struct RelocationTable {
    section_name: String,
    entries: Vec<RelocationEntry>,
}

impl RelocationTable {
    pub fn new(section_name: &str) -> Self {
        RelocationTable {
            section_name: section_name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: RelocationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RelocationEntry] {
        &self.entries
    }
}

impl fmt::Display for RelocationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n\n#{}\n", self.section_name)?;
        write!(f, "\n{:>10}{:>15}{:>15}\n\n", "Offset", "Type", "Value")?;
        for entry in &self.entries {
            writeln!(
                f,
                "{:>10}{:>15}{:>15}",
                format!("{:08X}", entry.offset),
                entry.kind.as_str(),
                entry.value
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_their_wire_names() {
        assert_eq!(RelocKind::R16High.to_string(), "R_16_high");
        assert_eq!(RelocKind::R32Negative.to_string(), "R_32_negative");
    }

    #[test]
    fn renders_header_and_hex_offsets() {
        let mut table = RelocationTable::new(".text");
        table.push(RelocationEntry {
            offset: 3,
            kind: RelocKind::R16High,
            value: 2,
        });
        table.push(RelocationEntry {
            offset: 7,
            kind: RelocKind::R16Low,
            value: 2,
        });
        let rendered = table.to_string();
        let mut lines = rendered.lines();
        assert_eq!(lines.next().unwrap(), "");
        assert_eq!(lines.next().unwrap(), "");
        assert_eq!(lines.next().unwrap(), "#.text");
        assert_eq!(lines.next().unwrap(), "");
        assert_eq!(
            lines.next().unwrap(),
            "    Offset           Type          Value"
        );
        assert_eq!(lines.next().unwrap(), "");
        assert_eq!(
            lines.next().unwrap(),
            "  00000003      R_16_high              2"
        );
        assert_eq!(
            lines.next().unwrap(),
            "  00000007       R_16_low              2"
        );
    }
}
