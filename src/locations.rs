use lazy_static::lazy_static;
use std::collections::BTreeMap;

pub const BLACK_MARKET: &str = "BlackMarket";

lazy_static! {
    /// Short codes accepted anywhere a location is named on the CLI.
    pub static ref SHORTNAME: BTreeMap<&'static str, &'static str> = BTreeMap::from([
        ("bw", "Bridgewatch"),
        ("tf", "Thetford"),
        ("ml", "Martlock"),
        ("lh", "Lymhurst"),
        ("fs", "FortSterling"),
        ("cl", "Caerleon"),
        ("bm", BLACK_MARKET),
        ("br", "Brecilien"),
    ]);

    /// Numeric market ids as they appear in collected data, including the
    /// portal-market aliases that map onto the same royal city.
    pub static ref LOCATIONS: BTreeMap<&'static str, &'static str> = BTreeMap::from([
        ("0007", "Thetford"),
        ("1002", "Lymhurst"),
        ("2004", "Bridgewatch"),
        ("3008", "Martlock"),
        ("4002", "FortSterling"),
        ("3005", "Caerleon"),
        ("3003", BLACK_MARKET),
        ("0301", "Thetford"),
        ("1301", "Lymhurst"),
        ("2301", "Bridgewatch"),
        ("3301", "Martlock"),
        ("4301", "FortSterling"),
        ("5003", "Brecilien"),
    ]);
}

/// Resolves a short code or numeric id to the canonical display name.
/// Unknown input is passed through so already-canonical names keep working.
pub fn resolve(location: &str) -> String {
    if let Some(full) = SHORTNAME.get(location) {
        return (*full).to_string();
    }
    if let Some(full) = LOCATIONS.get(location) {
        return (*full).to_string();
    }
    location.to_string()
}

/// Whether the name is known to the catalog at all.
pub fn is_known(location: &str) -> bool {
    let name = resolve(location);
    SHORTNAME.values().any(|v| *v == name)
}

/// The short-code catalog for display, ordered by code.
pub fn list_locations() -> &'static BTreeMap<&'static str, &'static str> {
    &SHORTNAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_short_code() {
        assert_eq!(resolve("bm"), "BlackMarket");
        assert_eq!(resolve("lh"), "Lymhurst");
    }

    #[test]
    fn test_resolve_numeric_id_and_passthrough() {
        assert_eq!(resolve("3003"), "BlackMarket");
        assert_eq!(resolve("Caerleon"), "Caerleon");
        assert_eq!(resolve("Atlantis"), "Atlantis");
        assert!(!is_known("Atlantis"));
    }
}
