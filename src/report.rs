// SPDX-License-Identifier: MIT

//! A [Report] is the ordered set of [Field]s that share a Report ID
//! and a [ReportType]. Reports are created by the
//! [ReportDescriptor](crate::ReportDescriptor) parser and can convert
//! named values into a report buffer ([Report::create_report]) and a
//! report buffer into a human-readable string ([Report::format_report]).
//!
//! Values are matched to fields by the field's usage name, reduced to an
//! identifier with [normalized_name]: the value for the "Tip Switch"
//! field is looked up as `tipswitch`, buttons are `b1`, `b2`, etc.

use crate::field::{CollectionPath, Field, ReportError};
use crate::types::{ReportId, Usage, UsagePage};
use crate::usages::{normalized_name, usage_name, UsageNames};
use crate::{ensure, ReportType};
use log::debug;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, ReportError>;

/// A source of values for [Report::create_report]. The name is the
/// normalized usage name of the field, see [normalized_name].
pub trait ReportData {
    /// The values for the field with the given name, one per Report Count,
    /// or `None` if this data has no such value.
    fn values_for(&self, name: &str) -> Option<Vec<i64>>;
}

impl ReportData for HashMap<String, i64> {
    fn values_for(&self, name: &str) -> Option<Vec<i64>> {
        HashMap::get(self, name).map(|v| vec![*v])
    }
}

impl ReportData for HashMap<&str, i64> {
    fn values_for(&self, name: &str) -> Option<Vec<i64>> {
        HashMap::get(self, name).map(|v| vec![*v])
    }
}

impl ReportData for HashMap<String, Vec<i64>> {
    fn values_for(&self, name: &str) -> Option<Vec<i64>> {
        HashMap::get(self, name).cloned()
    }
}

/// Multitouch devices often have both X/Y for the contact and another
/// X/Y for the whole device. A repeated X (or Y) within the same group
/// of fields is the contact's CX (CY).
fn fix_xy(usage: String, seen: &[String]) -> String {
    let has = |name: &str| seen.iter().any(|s| s == name);
    if !has(&usage) {
        return usage;
    }
    match usage.as_str() {
        "X" if !has("Y") || has("CY") => "CX".to_string(),
        "Y" if !has("X") || has("CX") => "CY".to_string(),
        _ => usage,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    report_id: Option<ReportId>,
    report_type: ReportType,
    application: Option<Usage>,
    fields: Vec<Field>,
    bit_size: usize,
}

impl Report {
    /// A new empty report. A numbered report reserves the first byte
    /// for the Report ID.
    pub fn new(
        report_id: Option<ReportId>,
        report_type: ReportType,
        application: Option<Usage>,
    ) -> Report {
        Report {
            report_id,
            report_type,
            application,
            fields: vec![],
            bit_size: if report_id.is_some() { 8 } else { 0 },
        }
    }

    /// Append the field at the current end of the report.
    pub fn append(&mut self, mut field: Field) {
        field.bit_offset = self.bit_size;
        self.bit_size = self
            .bit_size
            .saturating_add(field.bit_width.saturating_mul(field.count));
        debug!(
            "{:?} report {:?}: {:?} field at bits {:?}",
            self.report_type,
            self.report_id,
            field.kind,
            field.bits()
        );
        self.fields.push(field);
    }

    /// Append all fields in order.
    pub fn extend(&mut self, fields: impl IntoIterator<Item = Field>) {
        for field in fields {
            self.append(field);
        }
    }

    pub fn report_id(&self) -> Option<ReportId> {
        self.report_id
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    /// True if this report is prefixed by its Report ID.
    pub fn is_numbered(&self) -> bool {
        self.report_id.is_some()
    }

    /// The usage of the Application collection this report was
    /// first declared in.
    pub fn application(&self) -> Option<Usage> {
        self.application
    }

    /// The name of the application usage, "Vendor" where unknown.
    pub fn application_name(&self, names: &dyn UsageNames) -> String {
        self.application
            .and_then(|u| names.usage_name(u))
            .unwrap_or_else(|| "Vendor".to_string())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The size of this report in bits, including the Report ID (if any).
    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// The size of this report in bytes, including the Report ID (if any).
    pub fn size(&self) -> usize {
        self.bit_size.div_ceil(8)
    }

    /// Convert the data into a report buffer.
    ///
    /// Each non-constant field takes its values from the current element of
    /// `data`, then from `fallback`, and finally defaults to zero. When a
    /// field begins a new collection and its usage was already filled from
    /// the current element, the next element of `data` becomes current.
    /// This fills a repeated group of fields (e.g. one per multitouch
    /// contact) from one element each.
    ///
    /// ```
    /// # use hidrdesc::*;
    /// # use std::collections::HashMap;
    /// let bytes = [
    ///     0x05, 0x01, 0x09, 0x02, 0xa1, 0x01, 0x09, 0x01, 0xa1, 0x00,
    ///     0x05, 0x09, 0x19, 0x01, 0x29, 0x03, 0x15, 0x00, 0x25, 0x01,
    ///     0x95, 0x03, 0x75, 0x01, 0x81, 0x02, 0x95, 0x01, 0x75, 0x05,
    ///     0x81, 0x03, 0xc0, 0xc0,
    /// ];
    /// let rdesc = ReportDescriptor::try_from(bytes.as_slice()).unwrap();
    /// let report = &rdesc.input_reports()[&None];
    ///
    /// let data = HashMap::from([("b1", 1i64), ("b3", 1)]);
    /// let buffer = report.create_report(&[data], None, usages::default_names()).unwrap();
    /// assert_eq!(buffer, vec![0b101]);
    /// ```
    pub fn create_report<D: ReportData>(
        &self,
        data: &[D],
        fallback: Option<&D>,
        names: &dyn UsageNames,
    ) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.size()];
        if let Some(id) = self.report_id {
            buffer[0] = id.into();
        }

        let mut cursor = 0;
        let mut seen: Vec<String> = vec![];
        let mut prev_collection: Option<CollectionPath> = None;

        for field in self.fields.iter().filter(|f| !f.is_constant()) {
            let name = fix_xy(field.usage_name(names), &seen);
            if prev_collection.is_some_and(|c| c != field.collection) && seen.contains(&name) {
                cursor += 1;
                seen.clear();
            }

            let attr = normalized_name(&name);
            let values = data
                .get(cursor)
                .and_then(|d| d.values_for(&attr))
                .or_else(|| fallback.and_then(|d| d.values_for(&attr)));
            let values = match values {
                Some(values) => values,
                None => {
                    ensure!(
                        cursor < data.len() || fallback.is_some(),
                        ReportError::MissingData { usage: name }
                    );
                    vec![0; field.count]
                }
            };

            field.fill_values(&mut buffer, &values)?;
            prev_collection = Some(field.collection);
            seen.push(name);
        }

        Ok(buffer)
    }

    /// Format the report buffer in a human-readable form, e.g. for a mouse
    /// with 3 buttons and a wheel:
    ///
    /// ```text
    ///  Button: 1  0  0 | # | X:    5 | Y:   -2 | Wheel:    0
    /// ```
    ///
    /// Where `split_lines` is true, a field that starts a new collection
    /// starts a new line. Fields beyond the end of a short buffer are
    /// printed as `<.>`.
    pub fn format_report(
        &self,
        buffer: &[u8],
        split_lines: bool,
        names: &dyn UsageNames,
    ) -> Result<String> {
        let mut output = String::new();
        let mut sep = "";

        if let Some(id) = self.report_id {
            let actual = *buffer.first().ok_or(ReportError::OutOfBounds {
                start: 0,
                end: 8,
                len: 0,
            })?;
            ensure!(
                actual == u8::from(id),
                ReportError::ReportIdMismatch {
                    expected: id.into(),
                    actual
                }
            );
            output.push_str(&format!("ReportID: {id} "));
            sep = "/";
        }

        let mut prev: Option<&Field> = None;
        let mut prev_collection: Option<CollectionPath> = None;
        let mut seen: Vec<String> = vec![];

        for field in &self.fields {
            if field.is_constant() {
                output.push_str(&format!("{sep} # "));
                continue;
            }

            let values = match field.get_values(buffer) {
                Ok(values) => Some(values),
                Err(ReportError::OutOfBounds { .. }) => None,
                Err(e) => return Err(e),
            };

            if field.is_array() {
                let page_name = field
                    .usage_page_name(names)
                    .unwrap_or_else(|| "Array".to_string());
                let entries: Vec<String> = match values {
                    None => vec!["<.>".to_string()],
                    Some(values) => values
                        .iter()
                        .map(|&v| format!("'{}'", self.array_entry(field, v, names)))
                        .collect(),
                };
                output.push_str(&format!("{sep}{page_name} [{}] ", entries.join(", ")));
            } else {
                let value = match values.as_deref() {
                    Some([v, ..]) if field.bit_width > 1 && field.bit_width <= 64 => {
                        let width = (1u128 << field.bit_width).to_string().len() + 1;
                        format!("{v:>width$}")
                    }
                    Some([v, ..]) => format!("{v}"),
                    _ => "<.>".to_string(),
                };

                let (name, mut label) = if field.usage_page == UsagePage::BUTTON {
                    if field.usage == Usage::new(UsagePage::BUTTON.0, 1) {
                        ("Button".to_string(), " Button:".to_string())
                    } else {
                        sep = "";
                        (String::new(), String::new())
                    }
                } else {
                    let name = fix_xy(field.usage_name(names), &seen);
                    let label = format!(" {name}:");
                    (name, label)
                };

                if split_lines && prev_collection.is_some_and(|c| c != field.collection) {
                    seen.clear();
                    output.push('\n');
                }
                prev_collection = Some(field.collection);
                seen.push(name);

                // a repeated usage is only labelled once
                if prev.is_some_and(|p| p.flags == field.flags && p.usage == field.usage) {
                    sep = ",";
                    label.clear();
                }
                output.push_str(&format!("{sep}{label} {value} "));
            }
            sep = "|";
            prev = Some(field);
        }

        Ok(output)
    }

    /// One entry of an array field: the usage name for the value or
    /// an empty string for values that are out of range or mean
    /// "no event".
    fn array_entry(&self, field: &Field, value: i64, names: &dyn UsageNames) -> String {
        if !field.logical_range.contains(value) {
            return String::new();
        }
        let usage = usize::try_from(value - field.logical_range.minimum)
            .ok()
            .and_then(|idx| field.usages.get(idx));
        match usage {
            Some(u) if u16::from(u.usage_id) == 0 => String::new(),
            Some(u) if !u.usage_page.is_vendor_defined() => {
                let name = usage_name(names, *u);
                if name.to_lowercase().contains("no event indicated") {
                    String::new()
                } else {
                    name
                }
            }
            _ => format!("{value:02x}"),
        }
    }
}
