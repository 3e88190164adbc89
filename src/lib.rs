// SPDX-License-Identifier: MIT

//! This crate interprets HID Report Descriptors and reads and writes
//! the HID Reports they describe.
//!
//! A [ReportDescriptor] is parsed from bytes (or from the human-readable
//! form, see [human]) and resolves into a set of [Report]s per
//! [ReportType], keyed by their Report ID. Each [Report] is an ordered
//! list of [Field]s with a fixed bit offset, bit width and logical range.
//!
//! ```
//! # use hidrdesc::*;
//! let bytes = [
//!     0x05, 0x01, // Usage Page (Generic Desktop)
//!     0x09, 0x02, // Usage (Mouse)
//!     0xa1, 0x01, // Collection (Application)
//!     0x09, 0x01, //  Usage (Pointer)
//!     0xa1, 0x00, //  Collection (Physical)
//!     0x05, 0x09, //   Usage Page (Button)
//!     0x19, 0x01, //   Usage Minimum (1)
//!     0x29, 0x03, //   Usage Maximum (3)
//!     0x15, 0x00, //   Logical Minimum (0)
//!     0x25, 0x01, //   Logical Maximum (1)
//!     0x95, 0x03, //   Report Count (3)
//!     0x75, 0x01, //   Report Size (1)
//!     0x81, 0x02, //   Input (Data,Var,Abs)
//!     0x95, 0x01, //   Report Count (1)
//!     0x75, 0x05, //   Report Size (5)
//!     0x81, 0x03, //   Input (Cnst,Var,Abs)
//!     0xc0,       //  End Collection
//!     0xc0,       // End Collection
//! ];
//!
//! let rdesc = ReportDescriptor::try_from(bytes.as_slice()).unwrap();
//! assert_eq!(rdesc.input_reports().len(), 1);
//!
//! let report = rdesc.get(0, 1).unwrap();
//! assert_eq!(report.size(), 1);
//! assert_eq!(report.fields().len(), 4);
//!
//! let values = report.fields()[2].get_values(&[0b100]).unwrap();
//! assert_eq!(values, vec![1]);
//! ```
//!
//! Diagnostics are emitted through the [log](https://docs.rs/log) crate,
//! human-readable names come from a [usages::UsageNames] dictionary.

use log::{debug, trace, warn};
use std::collections::BTreeMap;
use thiserror::Error;

/// Return early with the given error unless the condition holds.
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
pub(crate) use ensure;

pub mod field;
pub mod hid;
pub mod human;
pub mod report;
pub mod types;
pub mod usages;

use field::{fields_for_main_item, CollectionPath, FieldState, LogicalRange, PhysicalRange};
pub use field::{Field, ReportError};
use hid::{Item, Tag};
pub use report::{Report, ReportData};
pub use types::*;
use usages::UsageNames;

/// The vendor usage that marks a device as Windows 8 compatible
/// when it is the last usage of a Feature item.
const WINDOWS8_USAGE: u32 = 0xff0000c5;

/// The largest report accepted, in bits. This is the largest report
/// buffer the Linux kernel handles (16 KiB).
const MAX_REPORT_BITS: usize = 16384 * 8;

/// The type of a report, determined by the Main item declaring its fields.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReportType {
    #[default]
    Input,
    Output,
    Feature,
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Unknown item header 0x{header:02x} at offset {offset}")]
    UnknownTag { offset: usize, header: u8 },
    #[error("Insufficient data for the item at offset {offset}")]
    InsufficientData { offset: usize },
    #[error("Invalid data {data} at offset {offset}: {message}")]
    InvalidData {
        offset: usize,
        data: u32,
        message: String,
    },
    #[error("Unknown symbol '{symbol}' in line '{line}'")]
    UnknownSymbol { line: String, symbol: String },
    #[error("Invalid line '{line}': {message}")]
    InvalidLine { line: String, message: String },
    #[error("Invalid hex string: {message}")]
    InvalidHex { message: String },
}

type Result<T> = std::result::Result<T, ParserError>;

/// The global items, saved and restored as a whole by Push and Pop.
#[derive(Clone, Debug, Default)]
struct Globals {
    usage_page: UsagePage,
    logical_range: LogicalRange,
    physical_range: PhysicalRange,
    unit: u32,
    unit_exponent: i64,
    report_size: usize,
    report_count: usize,
    application: Option<Usage>,
    physical: Option<Usage>,
    logical: Option<Usage>,
}

/// The local items. The usages are reset by every Main item and
/// Usage Page, the Report ID persists until changed.
#[derive(Clone, Debug, Default)]
struct Locals {
    usages: Vec<Usage>,
    usage_minimum: Option<Usage>,
    usage_maximum: Option<Usage>,
    report_id: Option<ReportId>,
}

impl Locals {
    fn clear_usages(&mut self) {
        self.usages.clear();
        self.usage_minimum = None;
        self.usage_maximum = None;
    }
}

#[derive(Debug, Default)]
struct Stack {
    globals: Globals,
    saved: Vec<Globals>,
    locals: Locals,
    collection: CollectionPath,
    depth: usize,
}

impl Stack {
    fn push(&mut self) {
        self.saved.push(self.globals.clone());
    }

    fn pop(&mut self) {
        match self.saved.pop() {
            Some(globals) => self.globals = globals,
            None => warn!("Pop without Push, keeping the current global state"),
        }
    }

    /// Usages with a 4-byte payload carry their own Usage Page,
    /// all others use the global one.
    fn usage(&self, item: &Item) -> Usage {
        if item.data().len() == 4 {
            Usage::from(item.value() as u32)
        } else {
            Usage::from((self.globals.usage_page, UsageId(item.value() as u16)))
        }
    }

    fn open_collection(&mut self, kind: i64) {
        let anchor = self.locals.usages.last().copied();
        let (counter, usage) = match kind {
            0 => (&mut self.collection.physical, &mut self.globals.physical),
            1 => (&mut self.collection.application, &mut self.globals.application),
            2 => (&mut self.collection.logical, &mut self.globals.logical),
            _ => {
                warn!("Collection type {kind} handled like a Logical collection");
                (&mut self.collection.logical, &mut self.globals.logical)
            }
        };
        *counter += 1;
        if anchor.is_some() {
            *usage = anchor;
        }
        self.depth += 1;
        self.locals.clear_usages();
    }

    fn close_collection(&mut self) {
        match self.depth.checked_sub(1) {
            Some(depth) => self.depth = depth,
            None => warn!("End Collection without Collection"),
        }
    }

    fn field_state(&self, report_type: ReportType) -> FieldState {
        let globals = &self.globals;
        FieldState {
            report_id: self.locals.report_id,
            report_type,
            usage_page: globals.usage_page,
            usages: self.locals.usages.clone(),
            usage_minimum: self.locals.usage_minimum,
            usage_maximum: self.locals.usage_maximum,
            logical_range: globals.logical_range,
            physical_range: globals.physical_range,
            unit: globals.unit,
            unit_exponent: globals.unit_exponent,
            report_size: globals.report_size,
            report_count: globals.report_count,
            collection: self.collection,
            application: globals.application,
            physical: globals.physical,
            logical: globals.logical,
        }
    }
}

/// A fully parsed HID Report Descriptor. It owns the [Item]s it was
/// parsed from and the [Report]s for each [ReportType], keyed by
/// Report ID (`None` for reports without a Report ID).
///
/// A [ReportDescriptor] is immutable once parsed.
#[derive(Debug, Default, Clone)]
pub struct ReportDescriptor {
    items: Vec<Item>,
    input_reports: BTreeMap<Option<ReportId>, Report>,
    output_reports: BTreeMap<Option<ReportId>, Report>,
    feature_reports: BTreeMap<Option<ReportId>, Report>,
    windows8_compatible: bool,
}

impl TryFrom<&[u8]> for ReportDescriptor {
    type Error = ParserError;

    fn try_from(bytes: &[u8]) -> Result<ReportDescriptor> {
        ReportDescriptor::from_bytes(bytes)
    }
}

impl ReportDescriptor {
    /// Parse the report descriptor bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<ReportDescriptor> {
        ReportDescriptor::from_items(hid::itemize(bytes)?)
    }

    /// Parse a string of hexadecimal bytes where the first number is
    /// the number of bytes that follow, e.g. `"3 05 01 c0"`.
    pub fn from_hidraw_string(s: &str) -> Result<ReportDescriptor> {
        let mut tokens = s.split_whitespace();
        let count = tokens.next().ok_or(ParserError::InvalidHex {
            message: "Empty string".into(),
        })?;
        let count = count.parse::<usize>().map_err(|e| ParserError::InvalidHex {
            message: format!("Invalid byte count '{count}': {e}"),
        })?;
        let bytes = tokens
            .map(|b| {
                u8::from_str_radix(b, 16).map_err(|e| ParserError::InvalidHex {
                    message: format!("Invalid byte '{b}': {e}"),
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        if bytes.len() != count {
            warn!("Byte count {count} does not match the {} bytes given", bytes.len());
        }
        ReportDescriptor::from_bytes(&bytes)
    }

    /// Parse the human-readable form, one item per line, see [human].
    /// Empty lines are ignored.
    pub fn from_human_descr(text: &str, names: &dyn UsageNames) -> Result<ReportDescriptor> {
        let mut usage_page = UsagePage::default();
        let items = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let item = human::parse_human_line(line, usage_page, names)?;
                if item.tag() == Tag::UsagePage {
                    usage_page = UsagePage(item.value() as u16);
                }
                Ok(item)
            })
            .collect::<Result<Vec<Item>>>()?;
        ReportDescriptor::from_items(items)
    }

    /// Interpret the sequence of items. The items' offsets are
    /// recalculated from their position in the sequence.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Result<ReportDescriptor> {
        let mut offset = 0;
        let items = items
            .into_iter()
            .map(|item| {
                let item = item.with_offset(offset);
                offset += item.size();
                item
            })
            .collect();
        parse_report_descriptor(items)
    }

    /// The items of this report descriptor in order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The size of this report descriptor in bytes.
    pub fn size(&self) -> usize {
        self.items.iter().map(|i| i.size()).sum()
    }

    /// This report descriptor as bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.items.iter().flat_map(|i| i.as_bytes()).collect()
    }

    /// This report descriptor in the human-readable form, one item per line.
    pub fn to_human(&self, names: &dyn UsageNames) -> String {
        let mut indent = 0;
        let mut usage_page = UsagePage::default();
        self.items
            .iter()
            .map(|item| {
                if item.tag() == Tag::UsagePage {
                    usage_page = UsagePage(item.value() as u16);
                }
                let (line, next) = human::render_human(item, indent, usage_page, names);
                indent = next;
                line
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn input_reports(&self) -> &BTreeMap<Option<ReportId>, Report> {
        &self.input_reports
    }

    pub fn output_reports(&self) -> &BTreeMap<Option<ReportId>, Report> {
        &self.output_reports
    }

    pub fn feature_reports(&self) -> &BTreeMap<Option<ReportId>, Report> {
        &self.feature_reports
    }

    pub fn reports(&self, report_type: ReportType) -> &BTreeMap<Option<ReportId>, Report> {
        match report_type {
            ReportType::Input => &self.input_reports,
            ReportType::Output => &self.output_reports,
            ReportType::Feature => &self.feature_reports,
        }
    }

    fn reports_mut(&mut self, report_type: ReportType) -> &mut BTreeMap<Option<ReportId>, Report> {
        match report_type {
            ReportType::Input => &mut self.input_reports,
            ReportType::Output => &mut self.output_reports,
            ReportType::Feature => &mut self.feature_reports,
        }
    }

    /// True if a Feature item's last usage is the Windows 8
    /// compatibility usage `0xff0000c5`.
    pub fn is_windows8_compatible(&self) -> bool {
        self.windows8_compatible
    }

    /// The Input report with the given Report ID, or the unnumbered
    /// report if there is no such Report ID. `None` if the report is
    /// smaller than `size` bytes.
    pub fn get(&self, report_id: u8, size: usize) -> Option<&Report> {
        self.input_reports
            .get(&Some(ReportId(report_id)))
            .or_else(|| self.input_reports.get(&None))
            .filter(|r| r.size() >= size)
    }

    /// The first Input report declared in the Application collection
    /// with the given usage.
    pub fn get_by_application(&self, application: Usage) -> Option<&Report> {
        self.input_reports
            .values()
            .find(|r| r.application() == Some(application))
    }

    /// Like [ReportDescriptor::get_by_application] but by the
    /// application usage's name, e.g. "Mouse".
    pub fn get_by_application_name(&self, name: &str, names: &dyn UsageNames) -> Option<&Report> {
        self.input_reports
            .values()
            .find(|r| r.application_name(names) == name)
    }

    /// Convert the data into the Input report with the given Report ID,
    /// see [Report::create_report].
    pub fn create_report<D: ReportData>(
        &self,
        report_id: Option<ReportId>,
        data: &[D],
        fallback: Option<&D>,
        names: &dyn UsageNames,
    ) -> std::result::Result<Vec<u8>, ReportError> {
        self.input_reports
            .get(&report_id)
            .ok_or(ReportError::NoSuchReport)?
            .create_report(data, fallback, names)
    }

    /// Format the Input report in the buffer, see [Report::format_report].
    /// The report is looked up with [ReportDescriptor::get] using the
    /// first byte as Report ID.
    pub fn format_report(
        &self,
        buffer: &[u8],
        split_lines: bool,
        names: &dyn UsageNames,
    ) -> std::result::Result<String, ReportError> {
        let report_id = buffer.first().copied().unwrap_or_default();
        self.get(report_id, buffer.len())
            .ok_or(ReportError::NoSuchReport)?
            .format_report(buffer, split_lines, names)
    }
}

fn handle_main_item(item: &Item, stack: &Stack, rdesc: &mut ReportDescriptor) -> Result<()> {
    let report_type = match item.tag() {
        Tag::Input => ReportType::Input,
        Tag::Output => ReportType::Output,
        Tag::Feature => ReportType::Feature,
        _ => return Ok(()),
    };
    let flags = item.main_flags().unwrap_or_default();
    let report_id = stack.locals.report_id;
    let application = stack.globals.application;

    let (size, count) = (stack.globals.report_size, stack.globals.report_count);
    let start = match rdesc.reports(report_type).get(&report_id) {
        Some(report) => report.bit_size(),
        None if report_id.is_some() => 8,
        None => 0,
    };
    let end = size
        .checked_mul(count)
        .and_then(|bits| bits.checked_add(start))
        .filter(|&bits| bits <= MAX_REPORT_BITS && count <= MAX_REPORT_BITS);
    ensure!(
        end.is_some(),
        ParserError::InvalidData {
            offset: item.offset(),
            data: u32::try_from(count).unwrap_or(u32::MAX),
            message: format!(
                "Report Size {size} and Report Count {count} exceed the maximum report size"
            ),
        }
    );

    let report = rdesc
        .reports_mut(report_type)
        .entry(report_id)
        .or_insert_with(|| {
            debug!("New {report_type:?} report with Report ID {report_id:?}");
            Report::new(report_id, report_type, application)
        });
    report.extend(fields_for_main_item(&stack.field_state(report_type), flags));

    if report_type == ReportType::Feature
        && stack.locals.usages.last() == Some(&Usage::from(WINDOWS8_USAGE))
    {
        rdesc.windows8_compatible = true;
    }
    Ok(())
}

fn parse_report_descriptor(items: Vec<Item>) -> Result<ReportDescriptor> {
    let mut stack = Stack::default();
    let mut rdesc = ReportDescriptor::default();

    for item in items.iter() {
        trace!("{:4}: {} ({})", item.offset(), item.tag(), item.value());
        let value = item.value();
        match item.tag() {
            Tag::ReportId => {
                let id = u8::try_from(value).map_err(|_| ParserError::InvalidData {
                    offset: item.offset(),
                    data: value as u32,
                    message: "Report ID exceeds 255".into(),
                })?;
                stack.locals.report_id = Some(ReportId(id));
            }
            Tag::Push => stack.push(),
            Tag::Pop => stack.pop(),
            Tag::UsagePage => {
                stack.globals.usage_page = UsagePage(value as u16);
                stack.locals.clear_usages();
            }
            Tag::Collection => stack.open_collection(value),
            Tag::EndCollection => stack.close_collection(),
            Tag::Usage => {
                let usage = stack.usage(item);
                stack.locals.usages.push(usage);
            }
            Tag::UsageMinimum => stack.locals.usage_minimum = Some(stack.usage(item)),
            Tag::UsageMaximum => stack.locals.usage_maximum = Some(stack.usage(item)),
            Tag::LogicalMinimum => stack.globals.logical_range.minimum = value,
            Tag::LogicalMaximum => stack.globals.logical_range.maximum = value,
            Tag::PhysicalMinimum => stack.globals.physical_range.minimum = value,
            Tag::PhysicalMaximum => stack.globals.physical_range.maximum = value,
            Tag::Unit => stack.globals.unit = value as u32,
            Tag::UnitExponent => stack.globals.unit_exponent = value,
            Tag::ReportSize => stack.globals.report_size = value as usize,
            Tag::ReportCount => stack.globals.report_count = value as usize,
            Tag::Input | Tag::Output | Tag::Feature => {
                handle_main_item(item, &stack, &mut rdesc)?;
                stack.locals.clear_usages();
            }
            Tag::DesignatorIndex
            | Tag::DesignatorMinimum
            | Tag::DesignatorMaximum
            | Tag::StringIndex
            | Tag::StringMinimum
            | Tag::StringMaximum
            | Tag::Delimiter => {}
        }
    }

    if stack.depth > 0 {
        warn!("{} collection(s) still open at the end", stack.depth);
    }
    if !stack.saved.is_empty() {
        warn!("{} Push without Pop", stack.saved.len());
    }

    rdesc.items = items;
    Ok(rdesc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const MOUSE: [u8; 34] = [
        0x05, 0x01, 0x09, 0x02, 0xa1, 0x01, 0x09, 0x01, 0xa1, 0x00,
        0x05, 0x09, 0x19, 0x01, 0x29, 0x03, 0x15, 0x00, 0x25, 0x01,
        0x95, 0x03, 0x75, 0x01, 0x81, 0x02, 0x95, 0x01, 0x75, 0x05,
        0x81, 0x03, 0xc0, 0xc0,
    ];

    #[test]
    fn mouse() {
        let rdesc = ReportDescriptor::try_from(MOUSE.as_slice()).unwrap();
        assert_eq!(rdesc.size(), MOUSE.len());
        assert_eq!(rdesc.bytes(), MOUSE);
        assert!(rdesc.output_reports().is_empty());
        assert!(rdesc.feature_reports().is_empty());

        let report = &rdesc.input_reports()[&None];
        assert!(!report.is_numbered());
        assert_eq!(report.size(), 1);
        assert_eq!(report.application(), Some(Usage::new(0x1, 0x2)));

        let fields = report.fields();
        assert_eq!(fields.len(), 4);
        for (i, field) in fields[..3].iter().enumerate() {
            assert!(field.is_variable());
            assert_eq!(field.bit_width, 1);
            assert_eq!(field.bit_offset, i);
            assert_eq!(field.usage, Usage::new(0x9, i as u16 + 1));
            assert_eq!(field.physical, Some(Usage::new(0x1, 0x1)));
        }
        assert!(fields[3].is_constant());
        assert_eq!(fields[3].bits(), 3..8);
    }

    #[test]
    fn push_pop() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, 0x09, 0x02, 0xa1, 0x01,
            0x15, 0x00, 0x25, 0x01, 0x75, 0x08, 0x95, 0x01,
            0x09, 0x30, 0x81, 0x02,
            0xa4,               // Push
            0x26, 0xff, 0x00,   // Logical Maximum (255)
            0x09, 0x31, 0x81, 0x02,
            0xb4,               // Pop
            0x09, 0x38, 0x81, 0x02,
            0xc0,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        let fields = rdesc.input_reports()[&None].fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].logical_range.maximum, 1);
        assert_eq!(fields[1].logical_range.maximum, 255);
        assert_eq!(fields[2].logical_range.maximum, 1);
        assert_eq!(fields[2].usage, Usage::new(0x1, 0x38));
    }

    #[test]
    fn pop_without_push() {
        let bytes = [0x25, 0x05, 0xb4, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        let field = &rdesc.input_reports()[&None].fields()[0];
        assert_eq!(field.logical_range.maximum, 5);
    }

    #[test]
    fn unknown_tag() {
        let mut bytes = MOUSE.to_vec();
        bytes[20] = 0xf5;
        let e = ReportDescriptor::try_from(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            e,
            ParserError::UnknownTag {
                offset: 20,
                header: 0xf5
            }
        ));
    }

    #[test]
    fn numbered_reports() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, 0x09, 0x02, 0xa1, 0x01,
            0x85, 0x01,                         // Report ID (1)
            0x15, 0x81, 0x25, 0x7f, 0x75, 0x08, 0x95, 0x02,
            0x09, 0x30, 0x09, 0x31, 0x81, 0x06,
            0x85, 0x02,                         // Report ID (2)
            0x09, 0x38, 0x95, 0x01, 0x81, 0x06,
            0x91, 0x02,                         // Output, still Report ID 2
            0xc0,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(rdesc.input_reports().len(), 2);
        assert_eq!(rdesc.output_reports().len(), 1);

        let r1 = &rdesc.input_reports()[&Some(ReportId(1))];
        assert_eq!(r1.size(), 3);
        assert_eq!(r1.fields()[0].bit_offset, 8);
        assert_eq!(r1.fields()[0].logical_range.minimum, -127);

        assert!(rdesc.output_reports().contains_key(&Some(ReportId(2))));

        assert_eq!(rdesc.get(1, 3), Some(r1));
        assert_eq!(rdesc.get(1, 4), None);
        assert!(rdesc.get(3, 1).is_none());
        assert_eq!(rdesc.get_by_application(Usage::new(0x1, 0x2)), Some(r1));
        assert!(rdesc.get_by_application(Usage::new(0x1, 0x6)).is_none());
    }

    #[test]
    fn report_id_too_large() {
        let bytes = [0x86, 0x00, 0x01];
        let e = ReportDescriptor::from_bytes(&bytes).unwrap_err();
        assert!(matches!(e, ParserError::InvalidData { offset: 0, .. }));
    }

    #[test]
    fn oversized_report() {
        #[rustfmt::skip]
        let bytes = [
            0x77, 0xff, 0xff, 0xff, 0xff,   // Report Size (4294967295)
            0x97, 0xff, 0xff, 0xff, 0xff,   // Report Count (4294967295)
            0x81, 0x01,
            0x81, 0x01,
        ];
        let e = ReportDescriptor::from_bytes(&bytes).unwrap_err();
        assert!(matches!(e, ParserError::InvalidData { offset: 10, .. }));

        // one byte too many, one field per count would be 16385 fields
        let bytes = [0x75, 0x08, 0x96, 0x01, 0x40, 0x81, 0x02];
        let e = ReportDescriptor::from_bytes(&bytes).unwrap_err();
        assert!(matches!(e, ParserError::InvalidData { offset: 5, data: 0x4001, .. }));

        // the limit accumulates across items of the same report
        let bytes = [0x75, 0x08, 0x96, 0x00, 0x20, 0x81, 0x03, 0x81, 0x03, 0x81, 0x03];
        let e = ReportDescriptor::from_bytes(&bytes).unwrap_err();
        assert!(matches!(e, ParserError::InvalidData { offset: 9, .. }));

        let bytes = [0x75, 0x08, 0x96, 0x00, 0x40, 0x81, 0x03];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(rdesc.input_reports()[&None].size(), 16384);
    }

    #[test]
    fn usage_page_clears_usages() {
        #[rustfmt::skip]
        let bytes = [
            0x09, 0x30,             // Usage (X), page 0
            0x05, 0x01,             // Usage Page (Generic Desktop)
            0x19, 0x01, 0x29, 0x02, // Usage Minimum/Maximum
            0x05, 0x09,             // Usage Page (Button)
            0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        let field = &rdesc.input_reports()[&None].fields()[0];
        assert_eq!(field.usage, Usage::default());
        assert_eq!(field.usage_page, UsagePage::BUTTON);
    }

    #[test]
    fn extended_usage() {
        #[rustfmt::skip]
        let bytes = [
            0x06, 0x00, 0xff,                   // Usage Page (Vendor)
            0x0b, 0x38, 0x00, 0x01, 0x00,       // Usage (Generic Desktop, Wheel)
            0x09, 0x01,
            0x75, 0x08, 0x95, 0x02, 0x81, 0x02,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        let fields = rdesc.input_reports()[&None].fields();
        assert_eq!(fields[0].usage, Usage::new(0x1, 0x38));
        assert_eq!(fields[1].usage, Usage::new(0xff00, 0x1));

        let names = usages::NoUsageNames;
        let text = rdesc.to_human(&names);
        let reparsed = ReportDescriptor::from_human_descr(&text, &names).unwrap();
        assert_eq!(reparsed.bytes(), rdesc.bytes());

        // a usage on page zero keeps its page across the text form
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01,
            0x0b, 0x30, 0x00, 0x00, 0x00,       // Usage (0x30) on page zero
            0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        let text = rdesc.to_human(&names);
        assert!(text.contains("Usage (0x00000030)"), "{text}");
        let reparsed = ReportDescriptor::from_human_descr(&text, &names).unwrap();
        assert_eq!(reparsed.bytes(), bytes);
        assert_eq!(reparsed.input_reports()[&None].fields()[0].usage, Usage::new(0, 0x30));
    }

    #[test]
    fn windows8() {
        #[rustfmt::skip]
        let bytes = [
            0x06, 0x00, 0xff, 0x09, 0xc5, 0x85, 0x05,
            0x15, 0x00, 0x26, 0xff, 0x00, 0x75, 0x08, 0x96, 0x00, 0x01,
            0xb1, 0x02,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        assert!(rdesc.is_windows8_compatible());
        assert_eq!(rdesc.feature_reports()[&Some(ReportId(5))].size(), 257);

        let rdesc = ReportDescriptor::from_bytes(&MOUSE).unwrap();
        assert!(!rdesc.is_windows8_compatible());
    }

    #[test]
    fn collection_anchors() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x0d, 0x09, 0x04, 0xa1, 0x01,     // Touch Screen, Application
            0x09, 0x22, 0xa1, 0x02,                 // Finger, Logical
            0x75, 0x08, 0x95, 0x01, 0x09, 0x51, 0x81, 0x02,
            0xc0,
            0x09, 0x22, 0xa1, 0x02,
            0x09, 0x51, 0x81, 0x02,
            0xc0,
            0x09, 0x54, 0x81, 0x02,
            0xc0,
        ];
        let rdesc = ReportDescriptor::from_bytes(&bytes).unwrap();
        let fields = rdesc.input_reports()[&None].fields();
        let paths: Vec<(u32, u32, u32)> = fields
            .iter()
            .map(|f| (f.collection.application, f.collection.physical, f.collection.logical))
            .collect();
        assert_eq!(paths, vec![(1, 0, 1), (1, 0, 2), (1, 0, 2)]);
        assert_eq!(fields[0].logical, Some(Usage::new(0xd, 0x22)));
        assert_eq!(fields[0].application, Some(Usage::new(0xd, 0x4)));
    }

    #[test]
    fn hidraw_string() {
        let rdesc = ReportDescriptor::from_hidraw_string("4 05 01 c0 00").unwrap();
        assert_eq!(rdesc.bytes(), vec![0x05, 0x01, 0xc0]);

        let e = ReportDescriptor::from_hidraw_string("2 05 zz").unwrap_err();
        assert!(matches!(e, ParserError::InvalidHex { .. }));
        assert!(ReportDescriptor::from_hidraw_string("").is_err());
    }

    #[test]
    fn from_items() {
        let items = vec![
            Item::new(Tag::UsagePage, 1).unwrap(),
            Item::new(Tag::ReportSize, 8).unwrap(),
            Item::new(Tag::ReportCount, 2).unwrap(),
            Item::new(Tag::Input, 2).unwrap(),
        ];
        let rdesc = ReportDescriptor::from_items(items).unwrap();
        assert_eq!(rdesc.items()[3].offset(), 6);
        assert_eq!(rdesc.input_reports()[&None].size(), 2);
    }
}
