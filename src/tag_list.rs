//! Symbol-class walk parsing and tag-list records.
//!
//! GetTagList pages through class 0x6B (Symbol) instances with service 0x55.
//! Each reply entry carries the instance id, the symbol name and the 16-bit
//! symbol type word plus the three array dimension sizes requested as
//! attribute 8. This module decodes those entries; the paging loop lives on
//! the client.

use crate::error::{LogixError, Result};

/// Name fragments that mark internal symbols the tag list drops.
const FILTERED_FRAGMENTS: &[&str] = &["__", "Routine:", "Map:", "Task:", "UDI:"];

/// One entry of a controller or program tag list.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Symbol name, qualified with its `Program:<Name>.` prefix when the
    /// tag is program-scoped.
    pub name: String,
    /// Symbol instance id within class 0x6B.
    pub instance_id: u16,
    /// Low byte of the symbol type word.
    pub symbol_type: u8,
    /// Lower 12 bits of the symbol type word: the data type.
    pub data_type_value: u16,
    /// Number of array dimensions, 0 to 3.
    pub array_dim: u8,
    /// Bit 15 of the symbol type word: the tag is a structure.
    pub is_struct: bool,
    /// Total element count for arrays, 0 for scalars.
    pub element_count: u32,
}

impl Tag {
    /// Splits the 16-bit symbol type word into its parts and computes the
    /// element count from the reported dimension sizes.
    pub fn from_entry(name: String, instance_id: u32, symbol_type: u16, dims: [u32; 3]) -> Self {
        let data_type_value = symbol_type & 0x0FFF;
        let array_dim = ((symbol_type & 0x6000) >> 13) as u8;
        let is_struct = (symbol_type & 0x8000) != 0;
        let element_count = match array_dim {
            0 => 0,
            1 => dims[0],
            2 => dims[0] * dims[1],
            _ => dims[0] * dims[1] * dims[2],
        };
        Tag {
            name,
            instance_id: instance_id as u16,
            symbol_type: (symbol_type & 0xFF) as u8,
            data_type_value,
            array_dim,
            is_struct,
            element_count,
        }
    }

    /// The atomic CIP type code of this tag, when it is not a structure.
    pub fn atomic_type(&self) -> Option<u8> {
        if self.is_struct || self.data_type_value > 0xFF {
            None
        } else {
            Some(self.data_type_value as u8)
        }
    }
}

/// True when a symbol name belongs to an internal object the tag list
/// filters out.
pub fn is_filtered(name: &str) -> bool {
    FILTERED_FRAGMENTS.iter().any(|f| name.contains(f))
}

/// Parses the data of one Get Instance Attribute List reply page.
///
/// `data` starts at the first instance entry. Each entry is the instance id
/// (u32), the name length (u16) and name bytes, the symbol type (u16) and
/// three dimension sizes (u32 each). `program` qualifies names with a
/// program prefix. Filtered names are skipped but still advance the cursor.
///
/// Returns the surviving tags and the highest instance id seen, which the
/// caller advances past for the next page.
pub fn parse_walk_page(data: &[u8], program: Option<&str>) -> Result<(Vec<Tag>, u32)> {
    let mut tags = Vec::new();
    let mut last_instance = 0u32;
    let mut offset = 0usize;

    while offset < data.len() {
        if offset + 6 > data.len() {
            return Err(LogixError::Protocol(format!(
                "tag list entry truncated at offset {}",
                offset
            )));
        }
        let instance_id = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        let name_len =
            u16::from_le_bytes([data[offset + 4], data[offset + 5]]) as usize;
        offset += 6;

        if offset + name_len + 14 > data.len() {
            return Err(LogixError::Protocol(format!(
                "tag list name truncated at offset {}",
                offset
            )));
        }
        let raw_name = String::from_utf8_lossy(&data[offset..offset + name_len]).to_string();
        offset += name_len;

        let symbol_type = u16::from_le_bytes([data[offset], data[offset + 1]]);
        offset += 2;
        let mut dims = [0u32; 3];
        for dim in dims.iter_mut() {
            *dim = u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]);
            offset += 4;
        }

        last_instance = last_instance.max(instance_id);

        if is_filtered(&raw_name) {
            continue;
        }
        let name = match program {
            Some(program) => format!("{}.{}", program, raw_name),
            None => raw_name,
        };
        tags.push(Tag::from_entry(name, instance_id, symbol_type, dims));
    }

    Ok((tags, last_instance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(instance: u32, name: &str, symbol_type: u16, dims: [u32; 3]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&instance.to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(name.as_bytes());
        bytes.extend_from_slice(&symbol_type.to_le_bytes());
        for dim in dims {
            bytes.extend_from_slice(&dim.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_symbol_type_word_decomposition() {
        // Plain DINT.
        let tag = Tag::from_entry("Counter".to_string(), 9, 0x00C4, [0, 0, 0]);
        assert_eq!(tag.data_type_value, 0x00C4);
        assert_eq!(tag.symbol_type, 0xC4);
        assert_eq!(tag.array_dim, 0);
        assert!(!tag.is_struct);
        assert_eq!(tag.element_count, 0);
        assert_eq!(tag.atomic_type(), Some(0xC4));

        // One-dimensional REAL array of 50 elements.
        let tag = Tag::from_entry("Temps".to_string(), 10, 0x20CA, [50, 0, 0]);
        assert_eq!(tag.data_type_value, 0x00CA);
        assert_eq!(tag.array_dim, 1);
        assert_eq!(tag.element_count, 50);

        // Two-dimensional array.
        let tag = Tag::from_entry("Grid".to_string(), 11, 0x40C4, [4, 8, 0]);
        assert_eq!(tag.array_dim, 2);
        assert_eq!(tag.element_count, 32);

        // Structure bit set.
        let tag = Tag::from_entry("Recipe".to_string(), 12, 0x8FCE, [0, 0, 0]);
        assert!(tag.is_struct);
        assert_eq!(tag.data_type_value, 0x0FCE);
        assert_eq!(tag.atomic_type(), None);
    }

    #[test]
    fn test_parse_walk_page() {
        let mut data = entry(1, "HeartBeat", 0x00C4, [0, 0, 0]);
        data.extend_from_slice(&entry(5, "Temps", 0x20CA, [50, 0, 0]));
        data.extend_from_slice(&entry(9, "Recipe", 0x8FCE, [0, 0, 0]));

        let (tags, last) = parse_walk_page(&data, None).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(last, 9);
        assert_eq!(tags[0].name, "HeartBeat");
        assert_eq!(tags[1].element_count, 50);
        assert!(tags[2].is_struct);
        // Instance ids are strictly increasing across a page.
        assert!(tags.windows(2).all(|w| w[0].instance_id < w[1].instance_id));
    }

    #[test]
    fn test_filtered_names_are_dropped_but_advance_cursor() {
        let mut data = entry(3, "Task:MainTask", 0x1068, [0, 0, 0]);
        data.extend_from_slice(&entry(7, "__InternalMap", 0x00C4, [0, 0, 0]));
        data.extend_from_slice(&entry(11, "Routine:Init", 0x1068, [0, 0, 0]));
        data.extend_from_slice(&entry(12, "Map:Local", 0x1068, [0, 0, 0]));
        data.extend_from_slice(&entry(13, "UDI:Thing", 0x1068, [0, 0, 0]));
        data.extend_from_slice(&entry(20, "Visible", 0x00C4, [0, 0, 0]));

        let (tags, last) = parse_walk_page(&data, None).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Visible");
        assert_eq!(last, 20);
    }

    #[test]
    fn test_program_scope_qualifies_names() {
        let data = entry(2, "Count", 0x00C4, [0, 0, 0]);
        let (tags, _) = parse_walk_page(&data, Some("Program:MainProgram")).unwrap();
        assert_eq!(tags[0].name, "Program:MainProgram.Count");
    }

    #[test]
    fn test_truncated_page_is_a_protocol_error() {
        let data = entry(1, "HeartBeat", 0x00C4, [0, 0, 0]);
        assert!(parse_walk_page(&data[..data.len() - 3], None).is_err());
        assert!(parse_walk_page(&data[..5], None).is_err());
    }

    #[test]
    fn test_name_filter() {
        assert!(is_filtered("Program:Main.__hidden"));
        assert!(is_filtered("Routine:Startup"));
        assert!(is_filtered("Map:IoMap"));
        assert!(is_filtered("Task:Fast"));
        assert!(is_filtered("UDI:Defn"));
        assert!(!is_filtered("Program:Main.Visible"));
        assert!(!is_filtered("Plain_Tag"));
    }
}
