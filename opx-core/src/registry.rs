//! Format-handler registry (spec §4.10): a one-shot, lazily-built table
//! mapping each [`FormatTag`] to whether it yields lines or packets.
//!
//! The table itself never changes at runtime; it exists so callers (the
//! CLI, the façade) can ask "is this format packet-based?" without
//! hard-coding the match everywhere. A tag absent from the table is a
//! programmer error, not a data error — the kernel only ever receives
//! tags that passed [`crate::model::FormatTag::from_extension`], so a miss
//! here means a new tag was added to the enum without a registry entry.

use crate::model::FormatTag;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Lines,
    Packets,
    Export,
}

static REGISTRY: Lazy<HashMap<FormatTag, HandlerKind>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(FormatTag::T42, HandlerKind::Lines);
    map.insert(FormatTag::Vbi, HandlerKind::Lines);
    map.insert(FormatTag::VbiDouble, HandlerKind::Lines);
    map.insert(FormatTag::Anc, HandlerKind::Packets);
    map.insert(FormatTag::Mxf, HandlerKind::Packets);
    map.insert(FormatTag::Ts, HandlerKind::Packets);
    map.insert(FormatTag::Rcwt, HandlerKind::Export);
    map.insert(FormatTag::Stl, HandlerKind::Export);
    map
});

/// Looks up the handler kind for `tag`. Panics if `tag` has no registry
/// entry: every tag reachable from [`FormatTag::from_extension`] is
/// registered above, so a miss means the enum grew without this table
/// growing with it.
pub fn handler_kind(tag: FormatTag) -> HandlerKind {
    *REGISTRY
        .get(&tag)
        .unwrap_or_else(|| panic!("no handler registered for format tag {tag:?}"))
}

pub fn is_registered(tag: FormatTag) -> bool {
    REGISTRY.contains_key(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_tag_except_unknown_is_registered() {
        for tag in [
            FormatTag::T42,
            FormatTag::Vbi,
            FormatTag::VbiDouble,
            FormatTag::Anc,
            FormatTag::Mxf,
            FormatTag::Ts,
            FormatTag::Rcwt,
            FormatTag::Stl,
        ] {
            assert!(is_registered(tag), "{tag:?} missing from registry");
        }
        assert!(!is_registered(FormatTag::Unknown));
    }

    #[test]
    fn packet_formats_are_classified_correctly() {
        assert_eq!(handler_kind(FormatTag::Mxf), HandlerKind::Packets);
        assert_eq!(handler_kind(FormatTag::T42), HandlerKind::Lines);
        assert_eq!(handler_kind(FormatTag::Stl), HandlerKind::Export);
    }

    #[test]
    #[should_panic(expected = "no handler registered")]
    fn unknown_tag_panics() {
        handler_kind(FormatTag::Unknown);
    }
}
