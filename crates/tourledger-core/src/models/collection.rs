//! Well-known collection names.

pub const RESERVATIONS: &str = "reservations";
pub const QUOTATIONS: &str = "quotations";
pub const OFFERS: &str = "offers";
pub const TOUR_PACKAGES: &str = "tourPackages";
pub const HOTEL_RATES: &str = "hotelRates";
pub const TRANSPORT_RATES: &str = "transportRates";

/// Collections refreshed together by `SyncGateway::refresh_all` callers.
pub const ALL: &[&str] = &[
    RESERVATIONS,
    QUOTATIONS,
    OFFERS,
    TOUR_PACKAGES,
    HOTEL_RATES,
    TRANSPORT_RATES,
];
