// SPDX-License-Identifier: MIT

//! The binary form of report descriptor items. This module splits
//! a report descriptor byte stream into its [Item]s and turns those
//! items back into bytes. Interpretation of the resulting
//! [Item]s is left to the [ReportDescriptor](crate::ReportDescriptor).
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).
//!
//! # Itemizing HID Report Descriptors
//!
//! ```
//! # use hidrdesc::hid::*;
//! let bytes = [0x05, 0x01, 0x09, 0x02, 0xa1, 0x01, 0xc0];
//! let items = itemize(&bytes).unwrap();
//! assert_eq!(items.len(), 4);
//! assert_eq!(items[0].tag(), Tag::UsagePage);
//! assert_eq!(items[2].offset(), 4);
//!
//! let serialized: Vec<u8> = items.iter().flat_map(|i| i.as_bytes()).collect();
//! assert_eq!(serialized, bytes);
//! ```
//!
//! A short item is a header byte followed by 0, 1, 2 or 4 bytes of payload:
//!
//! ```text
//! +---------+---+---+---+---+---+---+---+---+
//! | bit     | 7 | 6 | 5 | 4 | 3 | 2 | 1 | 0 |
//! +---------+---+---+---+---+---+---+---+---+
//! |         |  tag          | type  | size  |
//! +---------+---------------+-------+-------+
//! ```
//!
//! A size of `0b11` means a 4-byte payload. Long items (Section 6.2.2.3)
//! have no defined tags and are rejected like any other unknown tag.

use crate::{ensure, ParserError};

use log::{trace, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidError {
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
    #[error("Insufficient data")]
    InsufficientData,
}

type Result<T> = std::result::Result<T, HidError>;

/// The minimal little-endian payload for a number, 1, 2 or 4 bytes.
struct HidBytes(Vec<u8>);

impl HidBytes {
    fn take(self) -> Vec<u8> {
        self.0
    }
}

impl From<u32> for HidBytes {
    fn from(value: u32) -> HidBytes {
        let bytes = value.to_le_bytes();
        let cutoff = match value {
            0..=0xff => 1,
            0x100..=0xffff => 2,
            _ => 4,
        };
        HidBytes(bytes[0..cutoff].to_vec())
    }
}

impl From<i32> for HidBytes {
    fn from(value: i32) -> HidBytes {
        const MIN16: i32 = i16::MIN as i32;
        const MAX16: i32 = i16::MAX as i32;
        let bytes = match value {
            -128..=127 => (value as i8).to_le_bytes().to_vec(),
            MIN16..=MAX16 => (value as i16).to_le_bytes().to_vec(),
            _ => value.to_le_bytes().to_vec(),
        };
        HidBytes(bytes)
    }
}

/// Represents one value extracted from a set of (LE) payload bytes.
struct HidValue {
    value: u32,
    nbytes: usize,
}

impl HidValue {
    fn unsigned(&self) -> u32 {
        self.value
    }

    /// The two's complement interpretation over `nbytes * 8` bits.
    fn signed(&self) -> i32 {
        match self.nbytes {
            0 => 0,
            1 => (self.value as u8) as i8 as i32,
            2 => (self.value as u16) as i16 as i32,
            _ => self.value as i32,
        }
    }
}

impl TryFrom<&[u8]> for HidValue {
    type Error = HidError;

    fn try_from(bytes: &[u8]) -> Result<HidValue> {
        let value = match *bytes {
            [] => 0,
            [b0] => u32::from(b0),
            [b0, b1] => u32::from(u16::from_le_bytes([b0, b1])),
            [b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
            _ => {
                return Err(HidError::InvalidData {
                    message: format!("Payload of {} bytes cannot happen", bytes.len()),
                })
            }
        };
        Ok(HidValue {
            value,
            nbytes: bytes.len(),
        })
    }
}

/// The class of an item, encoded in bits 3..2 of the header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemClass {
    Main,
    Global,
    Local,
}

impl std::fmt::Display for ItemClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemClass::Main => "Main",
            ItemClass::Global => "Global",
            ItemClass::Local => "Local",
        };
        write!(f, "{s}")
    }
}

/// The fixed set of item tags this crate understands, see Sections 6.2.2.4
/// (Main), 6.2.2.7 (Global) and 6.2.2.8 (Local).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Input,
    Output,
    Feature,
    Collection,
    EndCollection,
    UsagePage,
    LogicalMinimum,
    LogicalMaximum,
    PhysicalMinimum,
    PhysicalMaximum,
    UnitExponent,
    Unit,
    ReportSize,
    ReportId,
    ReportCount,
    Push,
    Pop,
    Usage,
    UsageMinimum,
    UsageMaximum,
    DesignatorIndex,
    DesignatorMinimum,
    DesignatorMaximum,
    StringIndex,
    StringMinimum,
    StringMaximum,
    Delimiter,
}

const TAGS: [Tag; 27] = [
    Tag::Input,
    Tag::Output,
    Tag::Feature,
    Tag::Collection,
    Tag::EndCollection,
    Tag::UsagePage,
    Tag::LogicalMinimum,
    Tag::LogicalMaximum,
    Tag::PhysicalMinimum,
    Tag::PhysicalMaximum,
    Tag::UnitExponent,
    Tag::Unit,
    Tag::ReportSize,
    Tag::ReportId,
    Tag::ReportCount,
    Tag::Push,
    Tag::Pop,
    Tag::Usage,
    Tag::UsageMinimum,
    Tag::UsageMaximum,
    Tag::DesignatorIndex,
    Tag::DesignatorMinimum,
    Tag::DesignatorMaximum,
    Tag::StringIndex,
    Tag::StringMinimum,
    Tag::StringMaximum,
    Tag::Delimiter,
];

impl Tag {
    /// The header byte of this tag with the two size bits cleared.
    pub fn prefix(&self) -> u8 {
        match self {
            Tag::Input => 0b10000000,
            Tag::Output => 0b10010000,
            Tag::Feature => 0b10110000,
            Tag::Collection => 0b10100000,
            Tag::EndCollection => 0b11000000,
            Tag::UsagePage => 0b00000100,
            Tag::LogicalMinimum => 0b00010100,
            Tag::LogicalMaximum => 0b00100100,
            Tag::PhysicalMinimum => 0b00110100,
            Tag::PhysicalMaximum => 0b01000100,
            Tag::UnitExponent => 0b01010100,
            Tag::Unit => 0b01100100,
            Tag::ReportSize => 0b01110100,
            Tag::ReportId => 0b10000100,
            Tag::ReportCount => 0b10010100,
            Tag::Push => 0b10100100,
            Tag::Pop => 0b10110100,
            Tag::Usage => 0b00001000,
            Tag::UsageMinimum => 0b00011000,
            Tag::UsageMaximum => 0b00101000,
            Tag::DesignatorIndex => 0b00111000,
            Tag::DesignatorMinimum => 0b01001000,
            Tag::DesignatorMaximum => 0b01011000,
            Tag::StringIndex => 0b01111000,
            Tag::StringMinimum => 0b10001000,
            Tag::StringMaximum => 0b10011000,
            Tag::Delimiter => 0b10101000,
        }
    }

    /// Look up the tag for the given header byte, ignoring the size bits.
    pub fn from_header(header: u8) -> Option<Tag> {
        let prefix = header & 0b11111100;
        TAGS.iter().find(|t| t.prefix() == prefix).copied()
    }

    /// The human-readable name, e.g. "Usage Page".
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Input => "Input",
            Tag::Output => "Output",
            Tag::Feature => "Feature",
            Tag::Collection => "Collection",
            Tag::EndCollection => "End Collection",
            Tag::UsagePage => "Usage Page",
            Tag::LogicalMinimum => "Logical Minimum",
            Tag::LogicalMaximum => "Logical Maximum",
            Tag::PhysicalMinimum => "Physical Minimum",
            Tag::PhysicalMaximum => "Physical Maximum",
            Tag::UnitExponent => "Unit Exponent",
            Tag::Unit => "Unit",
            Tag::ReportSize => "Report Size",
            Tag::ReportId => "Report ID",
            Tag::ReportCount => "Report Count",
            Tag::Push => "Push",
            Tag::Pop => "Pop",
            Tag::Usage => "Usage",
            Tag::UsageMinimum => "Usage Minimum",
            Tag::UsageMaximum => "Usage Maximum",
            Tag::DesignatorIndex => "Designator Index",
            Tag::DesignatorMinimum => "Designator Minimum",
            Tag::DesignatorMaximum => "Designator Maximum",
            Tag::StringIndex => "String Index",
            Tag::StringMinimum => "String Minimum",
            Tag::StringMaximum => "String Maximum",
            Tag::Delimiter => "Delimiter",
        }
    }

    /// The inverse of [Tag::name].
    pub fn from_name(name: &str) -> Option<Tag> {
        TAGS.iter().find(|t| t.name() == name).copied()
    }

    pub fn class(&self) -> ItemClass {
        match (self.prefix() & 0b1100) >> 2 {
            0 => ItemClass::Main,
            1 => ItemClass::Global,
            _ => ItemClass::Local,
        }
    }

    /// True for the data-type Main items that create fields.
    pub fn is_data_item(&self) -> bool {
        matches!(self, Tag::Input | Tag::Output | Tag::Feature)
    }

    /// The minimum items are stored as two's complement over the
    /// payload size even though the bytes themselves are unsigned.
    fn is_signed(&self) -> bool {
        matches!(self, Tag::LogicalMinimum | Tag::PhysicalMinimum)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Interpret the payload for the given tag.
fn decode_value(tag: Tag, data: &[u8]) -> Result<i64> {
    let value = HidValue::try_from(data)?;
    let v = match tag {
        t if t.is_signed() => i64::from(value.signed()),
        // Unit Exponent is a signed nibble
        Tag::UnitExponent => match value.unsigned() {
            v @ 8..=15 => i64::from(v) - 16,
            v => i64::from(v),
        },
        _ => i64::from(value.unsigned()),
    };
    Ok(v)
}

/// Encode the value in the smallest payload that decodes back to it.
fn encode_value(tag: Tag, value: i64) -> Result<Vec<u8>> {
    let out_of_range = || HidError::InvalidData {
        message: format!("{tag} value {value} does not fit into 32 bits"),
    };
    let bytes = match tag {
        Tag::UnitExponent if (-8..0).contains(&value) => HidBytes(vec![(value + 16) as u8]),
        t if t.is_signed() => HidBytes::from(i32::try_from(value).map_err(|_| out_of_range())?),
        _ if value >= 0 => HidBytes::from(u32::try_from(value).map_err(|_| out_of_range())?),
        _ => HidBytes::from(i32::try_from(value).map_err(|_| out_of_range())?),
    }
    .take();
    Ok(bytes)
}

/// The flags of an Input, Output or Feature item, see Section 6.2.2.5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MainFlags(pub u32);

impl MainFlags {
    /// Keyword pairs for the flag bits 0..=8 as used in the text dialect,
    /// the first entry is the keyword for an unset bit (if any).
    pub const KEYWORDS: [(Option<&'static str>, &'static str); 9] = [
        (Some("Data"), "Cnst"),
        (Some("Arr"), "Var"),
        (Some("Abs"), "Rel"),
        (None, "Wrap"),
        (None, "NonLin"),
        (None, "NoPref"),
        (None, "Null"),
        (None, "Vol"),
        (None, "Buff"),
    ];

    fn is_set(&self, bit: u32) -> bool {
        self.0 & (1 << bit) != 0
    }
}

impl From<MainFlags> for u32 {
    fn from(flags: MainFlags) -> u32 {
        flags.0
    }
}

/// The properties shared by the Main data items Input, Output and
/// Feature, see Section 6.2.2.5. Each flag bit selects one of two
/// states, both states have an accessor.
pub trait MainDataItem {
    fn flags(&self) -> MainFlags;

    /// Padding or otherwise constant data, usually ignored.
    fn is_constant(&self) -> bool {
        self.flags().is_set(0)
    }

    fn is_data(&self) -> bool {
        !self.is_constant()
    }

    /// One value per Report Count, each with its own usage.
    fn is_variable(&self) -> bool {
        self.flags().is_set(1)
    }

    /// Report Count indices into the list of usages.
    fn is_array(&self) -> bool {
        !self.is_variable()
    }

    /// Values relative to the previous report, e.g. mouse movement.
    fn is_relative(&self) -> bool {
        self.flags().is_set(2)
    }

    fn is_absolute(&self) -> bool {
        !self.is_relative()
    }

    /// Values roll over at the logical limits.
    fn wraps(&self) -> bool {
        self.flags().is_set(3)
    }

    fn is_nonlinear(&self) -> bool {
        self.flags().is_set(4)
    }

    fn has_no_preferred_state(&self) -> bool {
        self.flags().is_set(5)
    }

    /// Values outside the logical range mean "no value".
    fn has_null_state(&self) -> bool {
        self.flags().is_set(6)
    }

    /// Only meaningful for Output and Feature items.
    fn is_volatile(&self) -> bool {
        self.flags().is_set(7)
    }

    fn is_buffered_bytes(&self) -> bool {
        self.flags().is_set(8)
    }
}

impl MainDataItem for MainFlags {
    fn flags(&self) -> MainFlags {
        *self
    }
}

/// A single item in a report descriptor. Items are created once,
/// either parsed from bytes with [Item::parse_one] or constructed
/// with [Item::new], and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    offset: usize,
    tag: Tag,
    data: Vec<u8>,
    value: i64,
}

impl Item {
    /// Create a new item with the smallest payload able to carry `value`.
    ///
    /// ```
    /// # use hidrdesc::hid::*;
    /// let item = Item::new(Tag::LogicalMinimum, 128).unwrap();
    /// // 128 is signed and needs two bytes
    /// assert_eq!(item.as_bytes(), vec![0b00010100 + 2, 0x80, 0x00]);
    /// ```
    ///
    /// [Tag::EndCollection], [Tag::Push] and [Tag::Pop] with a value
    /// of zero get no payload at all.
    pub fn new(tag: Tag, value: i64) -> Result<Item> {
        let data = match tag {
            Tag::EndCollection | Tag::Push | Tag::Pop if value == 0 => vec![],
            _ => encode_value(tag, value)?,
        };
        let decoded = decode_value(tag, &data)?;
        ensure!(
            decoded == value,
            HidError::InvalidData {
                message: format!("{tag} value {value} has no encoding"),
            }
        );
        Ok(Item {
            offset: 0,
            tag,
            data,
            value,
        })
    }

    /// Create a Usage, Usage Minimum or Usage Maximum item with a
    /// 4-byte payload. The Usage Page is the upper 16 bits of `usage`
    /// and replaces the global Usage Page for this item, even where
    /// it is zero.
    pub fn new_extended(tag: Tag, usage: u32) -> Result<Item> {
        ensure!(
            matches!(tag, Tag::Usage | Tag::UsageMinimum | Tag::UsageMaximum),
            HidError::InvalidData {
                message: format!("{tag} cannot carry a Usage Page"),
            }
        );
        Ok(Item {
            offset: 0,
            tag,
            data: usage.to_le_bytes().to_vec(),
            value: i64::from(usage),
        })
    }

    /// Create a new item with no payload.
    pub fn without_data(tag: Tag) -> Item {
        Item {
            offset: 0,
            tag,
            data: vec![],
            value: 0,
        }
    }

    /// Parse the single item starting at `offset` in `bytes`.
    /// Returns the item and the number of bytes it occupies.
    pub fn parse_one(bytes: &[u8], offset: usize) -> crate::Result<(Item, usize)> {
        let header = *bytes
            .get(offset)
            .ok_or(ParserError::InsufficientData { offset })?;
        let size = match header & 0b11 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        let tag = Tag::from_header(header).ok_or(ParserError::UnknownTag { offset, header })?;
        ensure!(
            bytes.len() > offset + size,
            ParserError::InsufficientData { offset }
        );
        let data = bytes[offset + 1..offset + 1 + size].to_vec();
        let value = decode_value(tag, &data).map_err(|e| ParserError::InvalidData {
            offset,
            data: u32::from(header),
            message: format!("{e}"),
        })?;
        Ok((
            Item {
                offset,
                tag,
                data,
                value,
            },
            size + 1,
        ))
    }

    /// The offset of this item in the report descriptor it was
    /// extracted from. Items that were not parsed from bytes have an
    /// offset of zero until they are part of a [ReportDescriptor](crate::ReportDescriptor).
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn with_offset(self, offset: usize) -> Item {
        Item { offset, ..self }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn class(&self) -> ItemClass {
        self.tag.class()
    }

    /// The header byte, i.e. the tag's prefix plus the size bits.
    pub fn header(&self) -> u8 {
        let size = match self.data.len() {
            4 => 0b11,
            n => n as u8,
        };
        self.tag.prefix() | size
    }

    /// The raw payload bytes, LSB first.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The payload as a single number. Logical and Physical Minimum are
    /// sign-extended from the payload size, the Unit Exponent from its
    /// low nibble. All other values are unsigned.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// The size in bytes, including the header byte.
    pub fn size(&self) -> usize {
        1 + self.data.len()
    }

    /// The flags of an Input, Output or Feature item.
    pub fn main_flags(&self) -> Option<MainFlags> {
        if self.tag.is_data_item() {
            Some(MainFlags(self.value as u32))
        } else {
            None
        }
    }

    /// This item in its original byte format, i.e. a header byte
    /// followed by (if any) payload bytes.
    pub fn as_bytes(&self) -> Vec<u8> {
        [vec![self.header()], self.data.clone()].concat()
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes: Vec<String> = self.as_bytes().iter().map(|b| format!("{b:02x}")).collect();
        write!(f, "{}", bytes.join(" "))
    }
}

/// Split the HID Report Descriptor represented by bytes into its set of
/// items. A single trailing zero byte, as some devices append one, is
/// dropped.
pub fn itemize(bytes: &[u8]) -> crate::Result<Vec<Item>> {
    let mut offset = 0;
    let mut items: Vec<Item> = Vec::new();
    while offset < bytes.len() {
        if bytes[offset] == 0 && offset == bytes.len() - 1 {
            warn!("Ignoring trailing zero byte at offset {offset}");
            break;
        }
        let (item, size) = Item::parse_one(bytes, offset)?;
        trace!("{offset:4}: {item} {}", item.tag());
        offset += size;
        items.push(item);
    }
    Ok(items)
}
