// SPDX-License-Identifier: MIT

//! Standalone HID types that exist for type safety only.
//! These are simple wrappers around their underlying integer data type.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).

/// Creates a `From<Foo> for u32` and `From<u32> for Foo` implementation for the given `Foo` type.
/// Use like this: `impl_from(Foo, Foo, u32)`.
macro_rules! impl_from {
    ($tipo:ty, $tipo_expr:expr, $to:ty) => {
        impl From<$tipo> for $to {
            fn from(f: $tipo) -> $to {
                f.0
            }
        }
        impl From<&$tipo> for $to {
            fn from(f: &$tipo) -> $to {
                f.0
            }
        }
        impl From<$to> for $tipo {
            fn from(f: $to) -> Self {
                $tipo_expr(f)
            }
        }
    };
}

/// Creates a `impl Display for Foo` that just converts into the underlying number.
/// Use like this: `impl_fmt(Foo, u32)`.
macro_rules! impl_fmt {
    ($tipo:ty, $to:ty) => {
        impl std::fmt::Display for $tipo {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let v: $to = self.into();
                write!(f, "{v}")
            }
        }
    };
}

/// The 16-bit Usage Page, see Section 6.2.2.7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UsagePage(pub u16);

impl_from!(UsagePage, UsagePage, u16);
impl_fmt!(UsagePage, u16);

impl UsagePage {
    pub const GENERIC_DESKTOP: UsagePage = UsagePage(0x01);
    pub const BUTTON: UsagePage = UsagePage(0x09);
    pub const DIGITIZERS: UsagePage = UsagePage(0x0D);
    pub const SENSOR: UsagePage = UsagePage(0x20);

    /// True for the vendor-defined range `0xFF00..=0xFFFF`.
    pub fn is_vendor_defined(&self) -> bool {
        self.0 >= 0xFF00
    }
}

/// The 16-bit Usage ID within a [UsagePage].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UsageId(pub u16);

impl_from!(UsageId, UsageId, u16);
impl_fmt!(UsageId, u16);

/// A fully qualified usage, i.e. the combination of [UsagePage] and
/// [UsageId]. On the wire (and in an extended Usage item) this is a
/// 32-bit value with the Usage Page in the upper 16 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usage {
    pub usage_page: UsagePage,
    pub usage_id: UsageId,
}

impl Usage {
    pub fn new(usage_page: u16, usage_id: u16) -> Usage {
        Usage {
            usage_page: UsagePage(usage_page),
            usage_id: UsageId(usage_id),
        }
    }
}

impl From<u32> for Usage {
    fn from(usage: u32) -> Usage {
        Usage::new((usage >> 16) as u16, (usage & 0xFFFF) as u16)
    }
}

impl From<&Usage> for u32 {
    fn from(usage: &Usage) -> u32 {
        (u32::from(u16::from(usage.usage_page)) << 16) | u32::from(u16::from(usage.usage_id))
    }
}

impl From<Usage> for u32 {
    fn from(usage: Usage) -> u32 {
        u32::from(&usage)
    }
}

impl From<(UsagePage, UsageId)> for Usage {
    fn from((usage_page, usage_id): (UsagePage, UsageId)) -> Usage {
        Usage {
            usage_page,
            usage_id,
        }
    }
}

impl_fmt!(Usage, u32);

/// The Report ID prefixing a numbered report, see Section 6.2.2.7.
/// Reports without a Report ID use `None` wherever an `Option<ReportId>`
/// is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportId(pub u8);

impl_from!(ReportId, ReportId, u8);
impl_fmt!(ReportId, u8);
