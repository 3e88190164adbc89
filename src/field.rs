// SPDX-License-Identifier: MIT

//! A [Field] is one bit-addressable value, or a set of repeated
//! values, inside a HID Report. Fields are created by the
//! [ReportDescriptor](crate::ReportDescriptor) parser from the state
//! at the time of each Input, Output or Feature item, see
//! [fields_for_main_item].
//!
//! Fields know how to read their values from and write their values
//! into a report buffer. Values are not byte-aligned:
//!
//! ```
//! # use hidrdesc::field::*;
//! # use hidrdesc::hid::MainFlags;
//! let state = FieldState {
//!     logical_range: LogicalRange { minimum: -8, maximum: 7 },
//!     report_size: 4,
//!     report_count: 1,
//!     ..Default::default()
//! };
//! let mut field = fields_for_main_item(&state, MainFlags(0b10)).remove(0);
//! field.bit_offset = 2;
//!
//! let mut buffer = [0u8; 1];
//! field.fill_values(&mut buffer, &[-3]).unwrap();
//! assert_eq!(buffer, [0b00110100]);
//! assert_eq!(field.get_values(&buffer).unwrap(), vec![-3]);
//! ```

use crate::hid::{MainDataItem, MainFlags};
use crate::types::{ReportId, Usage, UsagePage};
use crate::usages::{self, UsageNames};
use crate::{ensure, ReportType};
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Value {value} is outside the logical range of {field}")]
    Range { field: Box<Field>, value: i64 },
    #[error("Expected {expected} values but got {actual}")]
    ValueCount { expected: usize, actual: usize },
    #[error("Value {value} does not fit into {bits} bits")]
    ValueTooLarge { value: i64, bits: usize },
    #[error("Bits {start}..{end} are out of bounds for a report of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("Values wider than 64 bits are not supported ({bits} bits)")]
    UnsupportedWidth { bits: usize },
    #[error("No data left for {usage}")]
    MissingData { usage: String },
    #[error("Report ID {actual} does not match expected Report ID {expected}")]
    ReportIdMismatch { expected: u8, actual: u8 },
    #[error("No matching report")]
    NoSuchReport,
}

type Result<T> = std::result::Result<T, ReportError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogicalRange {
    pub minimum: i64,
    pub maximum: i64,
}

impl LogicalRange {
    pub fn contains(&self, value: i64) -> bool {
        (self.minimum..=self.maximum).contains(&value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhysicalRange {
    pub minimum: i64,
    pub maximum: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Variable,
    Array,
    Constant,
}

/// The position of a field in the collection hierarchy, expressed as
/// the number of Application, Physical and Logical collections opened
/// so far in the report descriptor. End Collection does not decrease
/// these counters so every collection has a unique path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub application: u32,
    pub physical: u32,
    pub logical: u32,
}

/// The parser state a data Main item creates its fields from.
#[derive(Clone, Debug, Default)]
pub struct FieldState {
    pub report_id: Option<ReportId>,
    pub report_type: ReportType,
    pub usage_page: UsagePage,
    pub usages: Vec<Usage>,
    pub usage_minimum: Option<Usage>,
    pub usage_maximum: Option<Usage>,
    pub logical_range: LogicalRange,
    pub physical_range: PhysicalRange,
    pub unit: u32,
    pub unit_exponent: i64,
    pub report_size: usize,
    pub report_count: usize,
    pub collection: CollectionPath,
    pub application: Option<Usage>,
    pub physical: Option<Usage>,
    pub logical: Option<Usage>,
}

/// A single field in a report, see the [module documentation](self).
///
/// A field covers the bits `bit_offset..bit_offset + bit_width * count`
/// of its report. Variable fields have a count of one, Array fields
/// have one value per Report Count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub report_id: Option<ReportId>,
    pub report_type: ReportType,
    pub kind: FieldKind,
    pub flags: MainFlags,
    pub bit_offset: usize,
    pub bit_width: usize,
    pub count: usize,
    pub usage_page: UsagePage,
    /// The usage of a Variable field, the first usage of an Array field
    pub usage: Usage,
    /// The usages of an Array field, indexed by `value - logical_minimum`
    pub usages: Vec<Usage>,
    pub logical_range: LogicalRange,
    pub physical_range: PhysicalRange,
    pub unit: u32,
    pub unit_exponent: i64,
    pub collection: CollectionPath,
    /// The usage of the enclosing Application collection
    pub application: Option<Usage>,
    /// The usage of the enclosing Physical collection
    pub physical: Option<Usage>,
    /// The usage of the enclosing Logical collection
    pub logical: Option<Usage>,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = self.bits();
        write!(
            f,
            "{:?} field 0x{:08x} at bits {}..{} (logical range {}..={})",
            self.kind,
            u32::from(self.usage),
            bits.start,
            bits.end,
            self.logical_range.minimum,
            self.logical_range.maximum
        )
    }
}

fn mask(bits: usize) -> u128 {
    (1u128 << bits) - 1
}

fn sign_extend(raw: u64, bits: usize) -> i64 {
    if bits > 0 && raw & (1 << (bits - 1)) != 0 {
        (i128::from(raw) - (1i128 << bits)) as i64
    } else {
        raw as i64
    }
}

/// Check the bit span against the buffer and return the covering byte range
fn byte_span(buffer: &[u8], start: usize, bits: usize) -> Result<Range<usize>> {
    ensure!(bits <= 64, ReportError::UnsupportedWidth { bits });
    let end = start + bits;
    let span = start / 8..end.div_ceil(8);
    ensure!(
        span.end <= buffer.len(),
        ReportError::OutOfBounds {
            start,
            end,
            len: buffer.len()
        }
    );
    Ok(span)
}

fn read_bits(buffer: &[u8], start: usize, bits: usize) -> Result<u64> {
    let span = byte_span(buffer, start, bits)?;
    let acc = buffer[span]
        .iter()
        .rev()
        .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
    Ok(((acc >> (start % 8)) & mask(bits)) as u64)
}

fn write_bits(buffer: &mut [u8], start: usize, bits: usize, value: u64) -> Result<()> {
    let span = byte_span(buffer, start, bits)?;
    let bytes = &mut buffer[span];
    let acc = bytes
        .iter()
        .rev()
        .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
    let shift = start % 8;
    let m = mask(bits) << shift;
    let acc = (acc & !m) | ((u128::from(value) << shift) & m);
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (acc >> (8 * i)) as u8;
    }
    Ok(())
}

impl Field {
    /// The bits in the report this field covers.
    pub fn bits(&self) -> Range<usize> {
        let end = self.bit_width.saturating_mul(self.count);
        self.bit_offset..self.bit_offset.saturating_add(end)
    }

    pub fn is_constant(&self) -> bool {
        self.kind == FieldKind::Constant
    }

    pub fn is_array(&self) -> bool {
        self.kind == FieldKind::Array
    }

    pub fn is_variable(&self) -> bool {
        self.kind == FieldKind::Variable
    }

    /// True if the values are two's complement over `bit_width` bits.
    pub fn is_signed(&self) -> bool {
        self.logical_range.minimum < 0
    }

    /// Contact Identifier, Contact Count and Contact Count Maximum are
    /// not checked against the logical range, devices routinely
    /// declare ranges these values exceed.
    fn is_range_exempt(&self) -> bool {
        self.usage.usage_page == UsagePage::DIGITIZERS
            && matches!(u16::from(self.usage.usage_id), 0x51 | 0x54 | 0x55)
    }

    fn get_value(&self, buffer: &[u8], idx: usize) -> Result<i64> {
        let start = self.bit_offset + self.bit_width * idx;
        let raw = read_bits(buffer, start, self.bit_width)?;
        if self.is_signed() && self.bit_width > 1 {
            Ok(sign_extend(raw, self.bit_width))
        } else {
            Ok(raw as i64)
        }
    }

    /// Extract this field's values from the report buffer, one per
    /// Report Count. For an Array field these are the array indices,
    /// see [Field::get_usages].
    pub fn get_values(&self, buffer: &[u8]) -> Result<Vec<i64>> {
        (0..self.count)
            .map(|idx| self.get_value(buffer, idx))
            .collect()
    }

    /// Like [Field::get_values] but resolves each value to a usage. For
    /// Array fields a value outside the logical range (or without a
    /// matching usage) resolves to `None`, a Variable field's values all
    /// resolve to the field's usage.
    pub fn get_usages(&self, buffer: &[u8]) -> Result<Vec<Option<Usage>>> {
        let values = self.get_values(buffer)?;
        let usages = values
            .into_iter()
            .map(|v| match self.kind {
                FieldKind::Array if self.logical_range.contains(v) => usize::try_from(
                    v - self.logical_range.minimum,
                )
                .ok()
                .and_then(|idx| self.usages.get(idx).copied()),
                FieldKind::Array | FieldKind::Constant => None,
                FieldKind::Variable => Some(self.usage),
            })
            .collect();
        Ok(usages)
    }

    fn to_raw(&self, value: i64) -> Result<u64> {
        let bits = self.bit_width;
        ensure!(bits <= 64, ReportError::UnsupportedWidth { bits });
        let too_large = ReportError::ValueTooLarge { value, bits };
        if value < 0 {
            ensure!(self.is_signed() && bits > 0, too_large);
            ensure!(
                bits >= 64 || i128::from(value) >= -(1i128 << (bits - 1)),
                too_large
            );
            Ok((value as u64) & (mask(bits) as u64))
        } else {
            let raw = value as u64;
            ensure!(bits >= 64 || raw >> bits == 0, too_large);
            Ok(raw)
        }
    }

    /// Write the values into the report buffer, one value per Report
    /// Count. Only this field's bits are modified.
    ///
    /// Values outside the logical range are rejected with
    /// [ReportError::Range]. Values already written by an earlier
    /// call for other fields stay written.
    pub fn fill_values(&self, buffer: &mut [u8], values: &[i64]) -> Result<()> {
        ensure!(
            values.len() == self.count,
            ReportError::ValueCount {
                expected: self.count,
                actual: values.len()
            }
        );
        for (idx, &value) in values.iter().enumerate() {
            if !self.is_range_exempt() {
                ensure!(
                    self.logical_range.contains(value),
                    ReportError::Range {
                        field: Box::new(self.clone()),
                        value
                    }
                );
            }
            let raw = self.to_raw(value)?;
            let start = self.bit_offset + self.bit_width * idx;
            write_bits(buffer, start, self.bit_width, raw)?;
        }
        Ok(())
    }

    /// The name of this field's usage, e.g. "X" or "B1".
    pub fn usage_name(&self, names: &dyn UsageNames) -> String {
        usages::usage_name(names, self.usage)
    }

    /// The name of the usage at `index` of an Array field.
    pub fn get_usage_name(&self, index: usize, names: &dyn UsageNames) -> Option<String> {
        self.usages
            .get(index)
            .map(|u| usages::usage_name(names, *u))
    }

    /// The Usage Page name, e.g. "Generic Desktop".
    pub fn usage_page_name(&self, names: &dyn UsageNames) -> Option<String> {
        names.usage_page_name(self.usage_page)
    }

    /// The name of the enclosing Physical collection's usage, if any.
    pub fn physical_name(&self, names: &dyn UsageNames) -> Option<String> {
        self.physical.map(|u| {
            names
                .usage_name(u)
                .unwrap_or_else(|| format!("0x{:04x}", u32::from(u)))
        })
    }
}

/// Create the fields for an Input, Output or Feature item with the
/// given flags from the current parser state.
///
/// - a Constant item is a single field covering `report_size * report_count` bits
/// - a Variable item with Usage Minimum and Maximum is one field per
///   Report Count, with usages counting up from the minimum and stopping
///   at the maximum
/// - a Variable item with a list of usages is one field per Report Count,
///   the last usage repeats where the list is shorter than the count
/// - an Array item is a single field with all usages and a count of
///   Report Count
///
/// All fields start at bit offset zero, the [Report](crate::report::Report)
/// assigns the final offsets.
pub fn fields_for_main_item(state: &FieldState, flags: MainFlags) -> Vec<Field> {
    let usage = state
        .usages
        .first()
        .copied()
        .or(state.usage_minimum)
        .unwrap_or_default();

    let template = Field {
        report_id: state.report_id,
        report_type: state.report_type,
        kind: FieldKind::Variable,
        flags,
        bit_offset: 0,
        bit_width: state.report_size,
        count: 1,
        usage_page: state.usage_page,
        usage,
        usages: vec![],
        logical_range: state.logical_range,
        physical_range: state.physical_range,
        unit: state.unit,
        unit_exponent: state.unit_exponent,
        collection: state.collection,
        application: state.application,
        physical: state.physical,
        logical: state.logical,
    };

    if flags.is_constant() {
        return vec![Field {
            kind: FieldKind::Constant,
            bit_width: state.report_size.saturating_mul(state.report_count),
            ..template
        }];
    }

    let range = match (state.usage_minimum, state.usage_maximum) {
        (Some(min), Some(max)) => {
            let (min, max) = (u32::from(min), u32::from(max));
            // never leave the minimum's usage page
            Some((min, max.min(min | 0xFFFF)))
        }
        _ => None,
    };

    if flags.is_variable() {
        (0..state.report_count)
            .map(|i| {
                let usage = match range {
                    Some((min, max)) => {
                        let step = (i as u32).min(max.saturating_sub(min));
                        Usage::from(min + step)
                    }
                    None => state
                        .usages
                        .get(i)
                        .or(state.usages.last())
                        .copied()
                        .unwrap_or(usage),
                };
                Field {
                    usage,
                    ..template.clone()
                }
            })
            .collect()
    } else {
        let usages = match range {
            Some((min, max)) => (min..=max).map(Usage::from).collect(),
            None => state.usages.clone(),
        };
        vec![Field {
            kind: FieldKind::Array,
            count: state.report_count,
            usages,
            ..template
        }]
    }
}
