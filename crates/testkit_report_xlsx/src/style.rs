//! Style palette registry and zebra style selection.
//!
//! Indices are a contract with the document sink's stylesheet:
//! `6/7` text, `10/11` number, `12/13` hyperlink (alternating pairs) and
//! `14..=17` group headers in `Test Cases, Requirements, Bugs, CRs` order.

use std::collections::BTreeMap;

use crate::conf::derive_default_style_formats;
use crate::spec::{EnumColumnGroup, ReportCompileError, Result, SpecCellFormat};

/// Closed set of style indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum EnumStyleId {
    /// Plain bordered cell.
    Default = 0,
    /// Field-header row cell.
    FieldHeader = 1,
    /// Suite title row cell.
    SuiteTitle = 2,
    /// Date cell, first zebra tone.
    DateA = 4,
    /// Date cell, second zebra tone.
    DateB = 5,
    /// Text cell, first zebra tone.
    TextA = 6,
    /// Text cell, second zebra tone.
    TextB = 7,
    /// Wrapped multi-line text, first zebra tone.
    TextWrapA = 8,
    /// Wrapped multi-line text, second zebra tone.
    TextWrapB = 9,
    /// Number cell, first zebra tone.
    NumberA = 10,
    /// Number cell, second zebra tone.
    NumberB = 11,
    /// Hyperlink cell, first zebra tone.
    HyperlinkA = 12,
    /// Hyperlink cell, second zebra tone.
    HyperlinkB = 13,
    /// `Test Cases` group header.
    GroupHeaderTestCases = 14,
    /// `Requirements` group header.
    GroupHeaderRequirements = 15,
    /// `Bugs` group header.
    GroupHeaderBugs = 16,
    /// `CRs` group header.
    GroupHeaderCrs = 17,
}

impl EnumStyleId {
    /// Every style index, ascending.
    pub const ALL: [EnumStyleId; 17] = [
        Self::Default,
        Self::FieldHeader,
        Self::SuiteTitle,
        Self::DateA,
        Self::DateB,
        Self::TextA,
        Self::TextB,
        Self::TextWrapA,
        Self::TextWrapB,
        Self::NumberA,
        Self::NumberB,
        Self::HyperlinkA,
        Self::HyperlinkB,
        Self::GroupHeaderTestCases,
        Self::GroupHeaderRequirements,
        Self::GroupHeaderBugs,
        Self::GroupHeaderCrs,
    ];

    /// Numeric index shared with the stylesheet.
    pub fn index(self) -> u16 {
        self as u16
    }

    /// Reverse lookup of [`Self::index`].
    pub fn from_index(index: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.index() == index)
    }
}

/// Data kind of a rendered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCellKind {
    /// Single-line text (also blanks and placeholders).
    Text,
    /// Multi-line text.
    TextWrap,
    /// Number.
    Number,
    /// Date-time.
    Date,
    /// Hyperlink.
    Hyperlink,
}

/// Pick the data-cell style for `kind` and the zebra tone.
pub fn select_data_style(kind: EnumCellKind, if_zebra_alt: bool) -> EnumStyleId {
    match (kind, if_zebra_alt) {
        (EnumCellKind::Text, false) => EnumStyleId::TextA,
        (EnumCellKind::Text, true) => EnumStyleId::TextB,
        (EnumCellKind::TextWrap, false) => EnumStyleId::TextWrapA,
        (EnumCellKind::TextWrap, true) => EnumStyleId::TextWrapB,
        (EnumCellKind::Number, false) => EnumStyleId::NumberA,
        (EnumCellKind::Number, true) => EnumStyleId::NumberB,
        (EnumCellKind::Date, false) => EnumStyleId::DateA,
        (EnumCellKind::Date, true) => EnumStyleId::DateB,
        (EnumCellKind::Hyperlink, false) => EnumStyleId::HyperlinkA,
        (EnumCellKind::Hyperlink, true) => EnumStyleId::HyperlinkB,
    }
}

/// Pick the group-header style of `group`.
pub fn select_group_header_style(group: EnumColumnGroup) -> EnumStyleId {
    match group {
        EnumColumnGroup::TestCases => EnumStyleId::GroupHeaderTestCases,
        EnumColumnGroup::Requirements => EnumStyleId::GroupHeaderRequirements,
        EnumColumnGroup::Bugs => EnumStyleId::GroupHeaderBugs,
        EnumColumnGroup::Crs => EnumStyleId::GroupHeaderCrs,
    }
}

/// Whether `style` is the second zebra tone of a data pair.
pub fn is_zebra_alt_style(style: EnumStyleId) -> bool {
    matches!(
        style,
        EnumStyleId::DateB
            | EnumStyleId::TextB
            | EnumStyleId::TextWrapB
            | EnumStyleId::NumberB
            | EnumStyleId::HyperlinkB
    )
}

/// Read-only palette: style index -> cell format.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRegistry {
    dict_formats: BTreeMap<EnumStyleId, SpecCellFormat>,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new(derive_default_style_formats())
    }
}

impl StyleRegistry {
    /// Wrap a palette.
    pub fn new(dict_formats: BTreeMap<EnumStyleId, SpecCellFormat>) -> Self {
        Self { dict_formats }
    }

    /// Format bound to `style`.
    pub fn get(&self, style: EnumStyleId) -> Option<&SpecCellFormat> {
        self.dict_formats.get(&style)
    }

    /// Iterate `(style, format)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (EnumStyleId, &SpecCellFormat)> {
        self.dict_formats.iter().map(|(id, fmt)| (*id, fmt))
    }

    /// Fail when any index of the contract is missing.
    pub fn validate(&self) -> Result<()> {
        match EnumStyleId::ALL
            .iter()
            .find(|id| !self.dict_formats.contains_key(id))
        {
            Some(id) => Err(ReportCompileError::StyleMissing(id.index())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_index_contract() {
        assert_eq!(EnumStyleId::TextA.index(), 6);
        assert_eq!(EnumStyleId::TextB.index(), 7);
        assert_eq!(EnumStyleId::NumberA.index(), 10);
        assert_eq!(EnumStyleId::NumberB.index(), 11);
        assert_eq!(EnumStyleId::HyperlinkA.index(), 12);
        assert_eq!(EnumStyleId::HyperlinkB.index(), 13);
        assert_eq!(
            select_group_header_style(EnumColumnGroup::TestCases).index(),
            14
        );
        assert_eq!(select_group_header_style(EnumColumnGroup::Crs).index(), 17);
        assert_eq!(EnumStyleId::from_index(16), Some(EnumStyleId::GroupHeaderBugs));
        assert_eq!(EnumStyleId::from_index(3), None);
    }

    #[test]
    fn test_zebra_pairs_differ_only_by_tone() {
        for kind in [
            EnumCellKind::Text,
            EnumCellKind::TextWrap,
            EnumCellKind::Number,
            EnumCellKind::Date,
            EnumCellKind::Hyperlink,
        ] {
            let style_a = select_data_style(kind, false);
            let style_b = select_data_style(kind, true);
            assert_eq!(style_a.index() + 1, style_b.index());
            assert!(!is_zebra_alt_style(style_a));
            assert!(is_zebra_alt_style(style_b));
        }
    }

    #[test]
    fn test_default_registry_covers_contract() {
        let registry = StyleRegistry::default();
        assert!(registry.validate().is_ok());
        assert_eq!(registry.iter().count(), EnumStyleId::ALL.len());

        let mut dict_partial = derive_default_style_formats();
        dict_partial.remove(&EnumStyleId::HyperlinkB);
        assert!(matches!(
            StyleRegistry::new(dict_partial).validate(),
            Err(ReportCompileError::StyleMissing(13))
        ));
    }
}
