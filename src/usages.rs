// SPDX-License-Identifier: MIT

//! Human-readable names for Usage Pages and Usages.
//!
//! Names are only needed to render items, reports and report data in
//! a human-readable form and to parse the human-readable form back.
//! The [UsageNames] trait is the seam to whatever dictionary is
//! available; with the default `hut` feature this is the
//! [HID Usage Tables](https://usb.org/document-library/hid-usage-tables-15)
//! as provided by the [hut](https://docs.rs/hut) crate.
//!
//! ```
//! # use hidrdesc::usages::*;
//! # use hidrdesc::types::*;
//! let names = default_names();
//! let name = usage_name(names, Usage::new(0x9, 3));
//! assert_eq!(name, "B3");
//! ```

use crate::types::{Usage, UsageId, UsagePage};
#[cfg(feature = "hut")]
use std::collections::HashMap;
#[cfg(feature = "hut")]
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A dictionary of Usage Page and Usage names. All lookups are
/// fallible, callers are expected to fall back to a numerical
/// representation.
pub trait UsageNames {
    /// The name of the given Usage Page, e.g. "Generic Desktop".
    fn usage_page_name(&self, usage_page: UsagePage) -> Option<String>;

    /// The name of the given Usage, e.g. "X".
    fn usage_name(&self, usage: Usage) -> Option<String>;

    /// The inverse of [UsageNames::usage_page_name].
    fn usage_page_from_name(&self, name: &str) -> Option<UsagePage>;

    /// The inverse of [UsageNames::usage_name] within the given Usage Page.
    fn usage_from_name(&self, usage_page: UsagePage, name: &str) -> Option<Usage>;
}

/// A dictionary without any names.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUsageNames;

impl UsageNames for NoUsageNames {
    fn usage_page_name(&self, _: UsagePage) -> Option<String> {
        None
    }

    fn usage_name(&self, _: Usage) -> Option<String> {
        None
    }

    fn usage_page_from_name(&self, _: &str) -> Option<UsagePage> {
        None
    }

    fn usage_from_name(&self, _: UsagePage, _: &str) -> Option<Usage> {
        None
    }
}

/// The HID Usage Tables as shipped by the `hut` crate.
///
/// Vendor-defined pages have no names, even where `hut` would
/// generate one.
#[cfg(feature = "hut")]
#[derive(Debug, Default, Clone, Copy)]
pub struct HutUsageNames;

#[cfg(feature = "hut")]
impl UsageNames for HutUsageNames {
    fn usage_page_name(&self, usage_page: UsagePage) -> Option<String> {
        if usage_page.is_vendor_defined() {
            return None;
        }
        hut::UsagePage::from_usage_page_value(usage_page.0)
            .ok()
            .map(|up| up.name())
    }

    fn usage_name(&self, usage: Usage) -> Option<String> {
        if usage.usage_page.is_vendor_defined() {
            return None;
        }
        hut::Usage::new_from_page_and_id(usage.usage_page.0, usage.usage_id.0)
            .ok()
            .map(|u| u.name())
    }

    fn usage_page_from_name(&self, name: &str) -> Option<UsagePage> {
        HutUsageNames::page_names().get(name).copied()
    }

    fn usage_from_name(&self, usage_page: UsagePage, name: &str) -> Option<Usage> {
        if usage_page.is_vendor_defined() {
            return None;
        }
        HutUsageNames::usage_ids(usage_page)
            .get(name)
            .map(|&id| Usage::from((usage_page, id)))
    }
}

#[cfg(feature = "hut")]
impl HutUsageNames {
    /// All Usage Page names, built on first use. Where two pages share
    /// a name the lower page wins.
    fn page_names() -> &'static HashMap<String, UsagePage> {
        static PAGES: OnceLock<HashMap<String, UsagePage>> = OnceLock::new();
        PAGES.get_or_init(|| {
            let mut pages = HashMap::new();
            for up in (0..0xFF00u16).map(UsagePage) {
                if let Some(name) = HutUsageNames.usage_page_name(up) {
                    pages.entry(name).or_insert(up);
                }
            }
            pages
        })
    }

    /// The Usage names of one Usage Page, built on the first lookup
    /// in that page. Where two usages share a name the lower id wins.
    fn usage_ids(usage_page: UsagePage) -> Arc<HashMap<String, UsageId>> {
        type Cache = Mutex<HashMap<UsagePage, Arc<HashMap<String, UsageId>>>>;
        static USAGES: OnceLock<Cache> = OnceLock::new();

        let mut cache = USAGES
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ids = cache.entry(usage_page).or_insert_with(|| {
            let mut ids = HashMap::new();
            for id in (0..=u16::MAX).map(UsageId) {
                if let Some(name) = HutUsageNames.usage_name(Usage::from((usage_page, id))) {
                    ids.entry(name).or_insert(id);
                }
            }
            Arc::new(ids)
        });
        Arc::clone(ids)
    }
}

/// The best dictionary available with the enabled features.
pub fn default_names() -> &'static dyn UsageNames {
    #[cfg(feature = "hut")]
    {
        &HutUsageNames
    }
    #[cfg(not(feature = "hut"))]
    {
        &NoUsageNames
    }
}

/// The name of a usage as used in reports: buttons are `B1`, `B2`, ...,
/// everything else is the dictionary name or the hexadecimal 32-bit usage.
pub fn usage_name(names: &dyn UsageNames, usage: Usage) -> String {
    if usage.usage_page == UsagePage::BUTTON {
        return format!("B{}", usage.usage_id);
    }
    names
        .usage_name(usage)
        .unwrap_or_else(|| format!("0x{:04x}", u32::from(usage)))
}

/// The name reduced to an identifier: spaces removed, lowercase.
/// "Tip Switch" becomes "tipswitch".
pub fn normalized_name(name: &str) -> String {
    name.replace(' ', "").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names() {
        assert_eq!(usage_name(&NoUsageNames, Usage::new(0x9, 1)), "B1");
        assert_eq!(usage_name(&NoUsageNames, Usage::new(0x9, 12)), "B12");
    }

    #[test]
    fn hex_fallback() {
        assert_eq!(
            usage_name(&NoUsageNames, Usage::new(0x1, 0x30)),
            "0x10030"
        );
        assert_eq!(
            usage_name(&NoUsageNames, Usage::new(0xff00, 0x1)),
            "0xff000001"
        );
        assert_eq!(usage_name(&NoUsageNames, Usage::new(0, 0x1)), "0x0001");
    }

    #[test]
    fn normalize() {
        assert_eq!(normalized_name("Tip Switch"), "tipswitch");
        assert_eq!(normalized_name("X"), "x");
        assert_eq!(normalized_name("B1"), "b1");
    }

    #[cfg(feature = "hut")]
    #[test]
    fn hut_names() {
        let names = HutUsageNames;
        assert_eq!(
            names.usage_page_name(UsagePage::GENERIC_DESKTOP).as_deref(),
            Some("Generic Desktop")
        );
        assert_eq!(
            names.usage_name(Usage::new(0x1, 0x30)).as_deref(),
            Some("X")
        );
        assert_eq!(usage_name(&names, Usage::new(0xd, 0x42)), "Tip Switch");
        assert_eq!(
            names.usage_page_from_name("Generic Desktop"),
            Some(UsagePage::GENERIC_DESKTOP)
        );
        assert_eq!(
            names.usage_from_name(UsagePage::GENERIC_DESKTOP, "Y"),
            Some(Usage::new(0x1, 0x31))
        );
        assert_eq!(names.usage_page_name(UsagePage(0xff00)), None);
        assert_eq!(names.usage_from_name(UsagePage::GENERIC_DESKTOP, "Nope"), None);
    }

    #[cfg(feature = "hut")]
    #[test]
    fn hut_reverse_lookups_are_cached() {
        let first = HutUsageNames::usage_ids(UsagePage::DIGITIZERS);
        let second = HutUsageNames::usage_ids(UsagePage::DIGITIZERS);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("Tip Switch"), Some(&UsageId(0x42)));

        let names = HutUsageNames;
        for _ in 0..3 {
            assert_eq!(
                names.usage_from_name(UsagePage::DIGITIZERS, "Contact Count"),
                Some(Usage::new(0xd, 0x54))
            );
            assert_eq!(
                names.usage_page_from_name("Digitizers"),
                Some(UsagePage::DIGITIZERS)
            );
        }
        assert_eq!(names.usage_from_name(UsagePage(0xff00), "Tip Switch"), None);
    }
}
