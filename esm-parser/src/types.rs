//! Core identifier types shared across the parser

use std::fmt;

/// 32-bit record identifier. The high byte is the load-order index of the
/// owning master, the low 24 bits identify the record within it. Treated
/// as an opaque key everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormId(pub u32);

impl FormId {
    /// Load-order index (high byte).
    pub fn load_order(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Record id local to the owning master (low 24 bits).
    pub fn local_id(self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    /// Parse `0x`-prefixed hex or plain decimal.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u32::from_str_radix(hex, 16).ok().map(FormId)
        } else {
            s.parse::<u32>().ok().map(FormId)
        }
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// 4-ASCII-byte record or subrecord tag. Unknown tags are carried opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordType(pub [u8; 4]);

impl RecordType {
    pub const TES4: Self = Self(*b"TES4");
    pub const GRUP: Self = Self(*b"GRUP");
    pub const WEAP: Self = Self(*b"WEAP");
    pub const ARMO: Self = Self(*b"ARMO");
    pub const ALCH: Self = Self(*b"ALCH");
    pub const AMMO: Self = Self(*b"AMMO");
    pub const NPC_: Self = Self(*b"NPC_");
    pub const QUST: Self = Self(*b"QUST");
    pub const COBJ: Self = Self(*b"COBJ");
    pub const MISC: Self = Self(*b"MISC");
    pub const BOOK: Self = Self(*b"BOOK");
    pub const KEYM: Self = Self(*b"KEYM");
    pub const GMST: Self = Self(*b"GMST");
    pub const GLOB: Self = Self(*b"GLOB");
    pub const CONT: Self = Self(*b"CONT");
    pub const FLOR: Self = Self(*b"FLOR");
    pub const KYWD: Self = Self(*b"KYWD");
    pub const REFR: Self = Self(*b"REFR");
    pub const NAVM: Self = Self(*b"NAVM");
    pub const ACHR: Self = Self(*b"ACHR");
    pub const EDID: Self = Self(*b"EDID");
    pub const FULL: Self = Self(*b"FULL");
    pub const XXXX: Self = Self(*b"XXXX");

    /// Tag as a string, with non-ASCII bytes escaped.
    pub fn as_str(&self) -> String {
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            String::from_utf8_lossy(&self.0).into_owned()
        } else {
            format!("{:02X}{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2], self.0[3])
        }
    }

    /// Parse a 4-character ASCII tag, e.g. from a CLI `--type` flag.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() == 4 && bytes.iter().all(u8::is_ascii) {
            let mut tag = [0; 4];
            tag.copy_from_slice(bytes);
            Some(Self(tag))
        } else {
            None
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}
