// SPDX-License-Identifier: MIT

//! The human-readable form of report descriptor items, one item per line:
//!
//! ```text
//! Usage Page (Digitizers)
//! Usage (Finger)
//! Collection (Logical)
//!  Report Size (1)
//!  Report Count (1)
//!  Logical Minimum (0)
//!  Logical Maximum (1)
//!  Usage (Tip Switch)
//!  Input (Data,Var,Abs)
//! End Collection
//! ```
//!
//! Each line is `<Item Name> (<data>)` where data is a number (decimal or
//! `0x`-prefixed hexadecimal) or a symbolic name. Symbols are Usage
//! Page and Usage names (resolved through [UsageNames]), collection types,
//! Main item flags and units. Items without data omit the parentheses.
//!
//! ```
//! # use hidrdesc::human::*;
//! # use hidrdesc::hid::*;
//! # use hidrdesc::types::*;
//! # use hidrdesc::usages::NoUsageNames;
//! let item = parse_human_line(" Input (Data,Var,Rel)", UsagePage(0x1), &NoUsageNames).unwrap();
//! assert_eq!(item.tag(), Tag::Input);
//! assert_eq!(item.value(), 0b110);
//!
//! let (line, indent) = render_human(&item, 1, UsagePage(0x1), &NoUsageNames);
//! assert_eq!(line, " Input (Data,Var,Rel)");
//! assert_eq!(indent, 1);
//! ```

use crate::hid::{Item, MainFlags, Tag};
use crate::types::{Usage, UsageId, UsagePage};
use crate::usages::UsageNames;
use crate::{ensure, ParserError};

const COLLECTIONS: [&str; 7] = [
    "Physical",
    "Application",
    "Logical",
    "Report",
    "Named Array",
    "Usage Switch",
    "Usage Modifier",
];

const SYSTEMS: [&str; 5] = ["None", "SILinear", "SIRotation", "EngLinear", "EngRotation"];

/// Unit names per nibble (length, mass, time, temperature, current,
/// luminous intensity), indexed by system.
const UNITS: [[&str; 5]; 6] = [
    ["None", "Centimeter", "Radians", "Inch", "Degrees"],
    ["None", "Gram", "Gram", "Slug", "Slug"],
    ["Seconds"; 5],
    ["None", "Kelvin", "Kelvin", "Fahrenheit", "Fahrenheit"],
    ["Ampere"; 5],
    ["Candela"; 5],
];

/// Sensor page usage modifiers, keyed by bits 15..12 of the usage id.
const SENSOR_MODIFIERS: [&str; 16] = [
    "Mod None",
    "Mod Change Sensitivity Abs",
    "Mod Max",
    "Mod Min",
    "Mod Accuracy",
    "Mod Resolution",
    "Mod Threshold High",
    "Mod Threshold Low",
    "Mod Calibration Offset",
    "Mod Calibration Multiplier",
    "Mod Report Interval",
    "Mod Frequency Max",
    "Mod Period Max",
    "Mod Change Sensitivity Range Percent",
    "Mod Change Sensitivity Rel Percent",
    "Mod Vendor Reserved",
];

const VENDOR_USAGE_PAGE: &str = "Vendor Usage Page ";
const VENDOR_USAGE: &str = "Vendor Usage ";
const UNKNOWN_USAGE: &str = "Unknown Usage ";

fn parse_number(s: &str) -> Option<i64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => s.parse::<i64>().ok(),
    }
}

fn render_flags(value: i64) -> String {
    if !(0..0x200).contains(&value) {
        return format!("{value}");
    }
    MainFlags::KEYWORDS
        .iter()
        .enumerate()
        .filter_map(|(bit, (unset, set))| {
            if value & (1 << bit) != 0 {
                Some(*set)
            } else {
                *unset
            }
        })
        .collect::<Vec<&str>>()
        .join(",")
}

fn parse_flags(data: &str) -> Option<i64> {
    data.split(',').map(str::trim).try_fold(0, |acc, token| {
        MainFlags::KEYWORDS
            .iter()
            .enumerate()
            .find_map(|(bit, (unset, set))| {
                if *set == token {
                    Some(acc | (1 << bit))
                } else if *unset == Some(token) {
                    Some(acc)
                } else {
                    None
                }
            })
    })
}

/// Render the Unit value, e.g. `Centimeter,Seconds^-2,SILinear`.
/// Values without a known system are rendered in hex.
fn render_unit(value: i64) -> String {
    if value == 0 {
        return SYSTEMS[0].into();
    }
    let system = (value & 0xf) as usize;
    if system == 0 || system >= SYSTEMS.len() || value >> 28 != 0 {
        return format!("0x{value:x}");
    }
    let mut parts: Vec<String> = UNITS
        .iter()
        .enumerate()
        .filter_map(|(i, table)| {
            let nibble = (value >> ((i + 1) * 4)) & 0xf;
            let exp = if nibble >= 8 { nibble - 16 } else { nibble };
            match exp {
                0 => None,
                1 => Some(table[system].to_string()),
                _ => Some(format!("{}^{exp}", table[system])),
            }
        })
        .collect();
    parts.push(SYSTEMS[system].into());
    parts.join(",")
}

fn parse_unit(data: &str) -> Option<i64> {
    let parts: Vec<&str> = data.split(',').map(str::trim).collect();
    let (system, components) = parts.split_last()?;
    let system = SYSTEMS.iter().position(|s| s == system)?;
    components.iter().try_fold(system as i64, |value, component| {
        let (unit, exp) = match component.split_once('^') {
            Some((unit, exp)) => (unit, exp.parse::<i64>().ok()?),
            None => (*component, 1),
        };
        if exp == 0 || !(-8..=7).contains(&exp) {
            return None;
        }
        let idx = UNITS
            .iter()
            .position(|table| table.iter().skip(1).any(|u| *u == unit))?;
        Some(value | ((exp & 0xf) << ((idx + 1) * 4)))
    })
}

fn render_usage(item: &Item, usage_page: UsagePage, names: &dyn UsageNames) -> String {
    let value = item.value();
    // Extended usages carry their own page
    if item.data().len() == 4 {
        return format!("0x{value:08x}");
    }
    let usage = Usage::from((usage_page, UsageId(value as u16)));
    if let Some(name) = names.usage_name(usage) {
        return name;
    }
    if usage_page == UsagePage::SENSOR {
        let modifier = SENSOR_MODIFIERS[((value & 0xF000) >> 12) as usize];
        let base = Usage::from((usage_page, UsageId((value & 0x0FFF) as u16)));
        match names.usage_name(base) {
            Some(name) => format!("{name} | {modifier}"),
            None => format!("{UNKNOWN_USAGE}0x{value:02x}"),
        }
    } else {
        format!("{VENDOR_USAGE}0x{value:02x}")
    }
}

fn parse_usage(data: &str, usage_page: UsagePage, names: &dyn UsageNames) -> Option<i64> {
    if let Some(v) = data
        .strip_prefix(VENDOR_USAGE)
        .or_else(|| data.strip_prefix(UNKNOWN_USAGE))
    {
        return parse_number(v);
    }
    if let Some(usage) = names.usage_from_name(usage_page, data) {
        return Some(i64::from(u16::from(usage.usage_id)));
    }
    let (base, modifier) = data.split_once(" | ")?;
    let modifier = SENSOR_MODIFIERS.iter().position(|m| *m == modifier)? as i64;
    let base = names.usage_from_name(usage_page, base.trim())?;
    Some(i64::from(u16::from(base.usage_id)) | (modifier << 12))
}

/// Parse a single line of the human-readable form into an [Item].
///
/// `usage_page` is the Usage Page in effect for this line, it is
/// needed to resolve Usage names. Leading and trailing whitespace
/// is ignored.
pub fn parse_human_line(
    line: &str,
    usage_page: UsagePage,
    names: &dyn UsageNames,
) -> crate::Result<Item> {
    let text = line.trim();
    let invalid = |message: &str| ParserError::InvalidLine {
        line: line.to_string(),
        message: message.to_string(),
    };
    let unknown = |symbol: &str| ParserError::UnknownSymbol {
        line: line.to_string(),
        symbol: symbol.to_string(),
    };

    ensure!(!text.is_empty(), invalid("Empty line"));

    let (name, data) = match text.split_once('(') {
        Some((name, rest)) => {
            let data = rest
                .strip_suffix(')')
                .ok_or_else(|| invalid("Missing closing parenthesis"))?;
            (name.trim(), Some(data.trim()))
        }
        None => (text, None),
    };

    let tag = Tag::from_name(name).ok_or_else(|| unknown(name))?;
    let Some(data) = data else {
        return Ok(Item::without_data(tag));
    };

    let value = match parse_number(data) {
        Some(v) => Some(v),
        None => match tag {
            Tag::UsagePage => names
                .usage_page_from_name(data)
                .map(|up| i64::from(u16::from(up)))
                .or_else(|| data.strip_prefix(VENDOR_USAGE_PAGE).and_then(parse_number)),
            Tag::Usage => parse_usage(data, usage_page, names),
            Tag::Collection => COLLECTIONS
                .iter()
                .position(|c| c.eq_ignore_ascii_case(data))
                .map(|c| c as i64),
            Tag::Input | Tag::Output | Tag::Feature => parse_flags(data),
            Tag::Unit => parse_unit(data),
            _ => None,
        },
    };
    let value = value.ok_or_else(|| unknown(data))?;

    let item = if is_extended_usage(tag, data) {
        let usage = u32::try_from(value).map_err(|_| invalid("Usage exceeds 32 bits"))?;
        Item::new_extended(tag, usage)
    } else {
        Item::new(tag, value)
    };
    item.map_err(|e| invalid(&format!("{e}")))
}

/// Usages written with all eight hex digits keep their 4-byte payload
/// and with it their own Usage Page.
fn is_extended_usage(tag: Tag, data: &str) -> bool {
    matches!(tag, Tag::Usage | Tag::UsageMinimum | Tag::UsageMaximum)
        && data
            .strip_prefix("0x")
            .is_some_and(|hex| hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Render the item as one line in the human-readable form, prefixed
/// by `indent` spaces. Returns the line and the indentation for the
/// next line: a Collection increases the indentation, an End Collection
/// decreases it (and is itself rendered at the decreased level).
///
/// `usage_page` is the Usage Page in effect for this item, needed
/// to render Usage names.
pub fn render_human(
    item: &Item,
    indent: usize,
    usage_page: UsagePage,
    names: &dyn UsageNames,
) -> (String, usize) {
    let value = item.value();
    let mut indent = indent;
    let mut next_indent = indent;
    let data = match item.tag() {
        Tag::Collection => {
            next_indent += 1;
            Some(match COLLECTIONS.get(value as usize) {
                Some(name) => name.to_string(),
                None => format!("{value}"),
            })
        }
        Tag::EndCollection | Tag::Push | Tag::Pop => {
            if item.tag() == Tag::EndCollection {
                indent = indent.saturating_sub(1);
                next_indent = indent;
            }
            if item.data().is_empty() {
                None
            } else {
                Some(format!("{value}"))
            }
        }
        Tag::UsagePage if value <= 0xFFFF => Some(
            names
                .usage_page_name(UsagePage(value as u16))
                .unwrap_or_else(|| format!("{VENDOR_USAGE_PAGE}0x{value:02x}")),
        ),
        Tag::Usage => Some(render_usage(item, usage_page, names)),
        Tag::UsageMinimum | Tag::UsageMaximum if item.data().len() == 4 => {
            Some(format!("0x{value:08x}"))
        }
        Tag::Input | Tag::Output | Tag::Feature => Some(render_flags(value)),
        Tag::Unit => Some(render_unit(value)),
        _ => Some(format!("{value}")),
    };

    let name = item.tag().name();
    let line = match data {
        Some(data) => format!("{:indent$}{name} ({data})", ""),
        None => format!("{:indent$}{name}", ""),
    };
    (line, next_indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::itemize;
    use crate::usages::NoUsageNames;

    fn line(s: &str) -> Item {
        parse_human_line(s, UsagePage::GENERIC_DESKTOP, &NoUsageNames).unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(line("Report Count (3)").as_bytes(), vec![0x95, 0x03]);
        assert_eq!(line("Logical Maximum (0x7fff)").as_bytes(), vec![0x26, 0xff, 0x7f]);
        assert_eq!(line("Logical Minimum (-127)").as_bytes(), vec![0x15, 0x81]);
        assert_eq!(line("Logical Minimum (0)").as_bytes(), vec![0x15, 0x00]);
        assert_eq!(line("Unit Exponent (-2)").as_bytes(), vec![0x55, 0x0e]);
        assert_eq!(line("Usage Page (0xff00)").as_bytes(), vec![0x06, 0x00, 0xff]);
    }

    #[test]
    fn no_data() {
        assert_eq!(line("End Collection").as_bytes(), vec![0xc0]);
        assert_eq!(line("   Push").as_bytes(), vec![0xa4]);
        assert_eq!(line("Pop").as_bytes(), vec![0xb4]);
    }

    #[test]
    fn collections() {
        assert_eq!(line("Collection (Application)").value(), 1);
        assert_eq!(line("Collection (Named Array)").value(), 4);
        assert_eq!(line("Collection (0x80)").value(), 0x80);

        let item = Item::new(Tag::Collection, 6).unwrap();
        let (text, indent) = render_human(&item, 2, UsagePage(1), &NoUsageNames);
        assert_eq!(text, "  Collection (Usage Modifier)");
        assert_eq!(indent, 3);

        let item = Item::new(Tag::EndCollection, 0).unwrap();
        let (text, indent) = render_human(&item, 3, UsagePage(1), &NoUsageNames);
        assert_eq!(text, "  End Collection");
        assert_eq!(indent, 2);
    }

    #[test]
    fn flags() {
        assert_eq!(line("Input (Data,Var,Abs)").value(), 0b10);
        assert_eq!(line("Input (Cnst,Arr,Abs)").value(), 0b1);
        assert_eq!(line("Feature (Data,Var,Abs,NoPref,Vol)").value(), 0b10100010);
        assert_eq!(line("Output (Buff)").value(), 0x100);

        let e = parse_human_line("Input (Data,Var,Absolute)", UsagePage(1), &NoUsageNames)
            .unwrap_err();
        assert!(matches!(e, ParserError::UnknownSymbol { symbol, .. } if symbol == "Data,Var,Absolute"));

        assert_eq!(render_flags(0x163), "Cnst,Var,Abs,NoPref,Null,Buff");
        assert_eq!(render_flags(0), "Data,Arr,Abs");
    }

    #[test]
    fn units() {
        assert_eq!(render_unit(0x11), "Centimeter,SILinear");
        assert_eq!(render_unit(0xF011), "Centimeter,Seconds^-1,SILinear");
        assert_eq!(render_unit(0x14), "Degrees,EngRotation");
        assert_eq!(render_unit(0xE121), "Centimeter^2,Gram,Seconds^-2,SILinear");
        assert_eq!(render_unit(0), "None");
        assert_eq!(render_unit(0x10), "0x10");

        assert_eq!(parse_unit("Centimeter,SILinear"), Some(0x11));
        assert_eq!(parse_unit("Centimeter,Seconds^-1,SILinear"), Some(0xF011));
        assert_eq!(parse_unit("None"), Some(0));
        assert_eq!(parse_unit("Centimeter,Parsecs"), None);
        assert_eq!(parse_unit("Lightyears,SILinear"), None);
        assert_eq!(parse_unit("Seconds^9,SILinear"), None);

        assert_eq!(line("Unit (Degrees,EngRotation)").as_bytes(), vec![0x65, 0x14]);
    }

    #[test]
    fn vendor_fallbacks() {
        let item = Item::new(Tag::UsagePage, 0xff01).unwrap();
        let (text, _) = render_human(&item, 0, UsagePage(1), &NoUsageNames);
        assert_eq!(text, "Usage Page (Vendor Usage Page 0xff01)");
        assert_eq!(line(&text), item);

        let item = Item::new(Tag::Usage, 0x30).unwrap();
        let (text, _) = render_human(&item, 0, UsagePage(1), &NoUsageNames);
        assert_eq!(text, "Usage (Vendor Usage 0x30)");
        assert_eq!(line(&text), item);

        let item = Item::new(Tag::Usage, 0xff0000c5).unwrap();
        let (text, _) = render_human(&item, 0, UsagePage(1), &NoUsageNames);
        assert_eq!(text, "Usage (0xff0000c5)");
        assert_eq!(line(&text), item);
    }

    #[test]
    fn extended_usages() {
        for tag in [Tag::Usage, Tag::UsageMinimum, Tag::UsageMaximum] {
            let item = Item::new_extended(tag, 0x30).unwrap();
            let (text, _) = render_human(&item, 0, UsagePage(1), &NoUsageNames);
            assert_eq!(text, format!("{} (0x00000030)", tag.name()));
            let parsed = line(&text);
            assert_eq!(parsed, item);
            assert_eq!(parsed.data().len(), 4);
        }

        // fewer digits is a plain usage on the global Usage Page
        assert_eq!(line("Usage (0x0030)").as_bytes(), vec![0x09, 0x30]);
    }

    #[test]
    fn unknown_symbols() {
        let e = parse_human_line("Usage Pages (1)", UsagePage(1), &NoUsageNames).unwrap_err();
        assert!(matches!(e, ParserError::UnknownSymbol { symbol, .. } if symbol == "Usage Pages"));

        let e = parse_human_line("Usage (Mouse)", UsagePage(1), &NoUsageNames).unwrap_err();
        assert!(matches!(e, ParserError::UnknownSymbol { .. }));

        let e = parse_human_line("Usage (1", UsagePage(1), &NoUsageNames).unwrap_err();
        assert!(matches!(e, ParserError::InvalidLine { .. }));

        let e = parse_human_line("   ", UsagePage(1), &NoUsageNames).unwrap_err();
        assert!(matches!(e, ParserError::InvalidLine { .. }));
    }

    #[test]
    fn render_then_parse() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x0d, 0x09, 0x04, 0xa1, 0x01, 0x85, 0x02, 0x09, 0x22, 0xa1, 0x02,
            0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x95, 0x01, 0x09, 0x42, 0x81, 0x02,
            0x95, 0x07, 0x81, 0x03, 0x75, 0x08, 0x09, 0x51, 0x81, 0x02, 0xa4,
            0x05, 0x01, 0x26, 0xff, 0x0f, 0x75, 0x10, 0x55, 0x0e, 0x65, 0x11,
            0x09, 0x30, 0x35, 0x00, 0x46, 0xb5, 0x04, 0x81, 0x02, 0xb4,
            0xc0, 0xc0,
        ];
        let items = itemize(&bytes).unwrap();
        let mut indent = 0;
        let mut usage_page = UsagePage(0);
        for item in items {
            if item.tag() == Tag::UsagePage {
                usage_page = UsagePage(item.value() as u16);
            }
            let (text, next) = render_human(&item, indent, usage_page, &NoUsageNames);
            indent = next;
            let parsed = parse_human_line(&text, usage_page, &NoUsageNames).unwrap();
            assert_eq!(parsed.tag(), item.tag(), "{text}");
            assert_eq!(parsed.value(), item.value(), "{text}");
        }
        assert_eq!(indent, 0);
    }

    #[cfg(feature = "hut")]
    #[test]
    fn usage_names() {
        use crate::usages::HutUsageNames;

        let names = HutUsageNames;
        let item = parse_human_line("Usage Page (Digitizers)", UsagePage(0), &names).unwrap();
        assert_eq!(item.as_bytes(), vec![0x05, 0x0d]);

        let item = parse_human_line(" Usage (Tip Switch)", UsagePage::DIGITIZERS, &names).unwrap();
        assert_eq!(item.as_bytes(), vec![0x09, 0x42]);
        let (text, _) = render_human(&item, 1, UsagePage::DIGITIZERS, &names);
        assert_eq!(text, " Usage (Tip Switch)");
    }
}
