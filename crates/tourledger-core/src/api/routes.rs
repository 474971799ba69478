//! Collection router: logical collection name to remote resource path.

/// Collections whose resource path differs from their name, or that are
/// pinned explicitly.
const KNOWN_ROUTES: &[(&str, &str)] = &[
    ("reservations", "/reservations"),
    ("quotations", "/quotations"),
    ("offers", "/offers"),
    ("tourPackages", "/tour-packages"),
    ("hotelRates", "/hotel-rates"),
    ("transportRates", "/transport-rates"),
];

/// Resource path for a collection. Unknown names map to `/{name}`.
pub fn endpoint_for(collection: &str) -> String {
    KNOWN_ROUTES
        .iter()
        .find(|(name, _)| *name == collection)
        .map(|(_, path)| path.to_string())
        .unwrap_or_else(|| format!("/{}", collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_collections() {
        assert_eq!(endpoint_for("quotations"), "/quotations");
        assert_eq!(endpoint_for("hotelRates"), "/hotel-rates");
        assert_eq!(endpoint_for("tourPackages"), "/tour-packages");
    }

    #[test]
    fn test_unknown_collection_falls_back_to_name() {
        assert_eq!(endpoint_for("invoices"), "/invoices");
        assert_eq!(endpoint_for(""), "/");
    }
}
