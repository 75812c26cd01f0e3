/// Column-name constants for the catchnet tables.
/// Single source of truth - also exported to Python when the `python` feature is on.

// ── Raw dwell / ping columns ────────────────────────────────────────────────
pub mod dwell {
    pub const TABLE: &str = "dwell_events";
    pub const VESSEL_NAME: &str = "vessel_name";
    pub const LOCATION_NAME: &str = "location_name";
    pub const KIND: &str = "kind";
    pub const ARRIVAL_TIME: &str = "arrival_time";
    pub const TIME: &str = "time";
    pub const DWELL: &str = "dwell";
    pub const ARRIVAL_PORT: &str = "arrival_port";
    pub const SOURCE: &str = "source";
    pub const TARGET: &str = "target";
}

// ── Columns added by the dwell preparer ─────────────────────────────────────
pub mod prepared {
    pub const AREA_TYPE: &str = "area_type";
    pub const DATE: &str = "date";
    pub const TONNAGE: &str = "tonnage";
}

// ── Vessel registry columns ─────────────────────────────────────────────────
pub mod vessel {
    pub const TABLE: &str = "vessels";
    pub const VESSEL_ID: &str = "vessel_id";
    pub const TONNAGE: &str = "tonnage";
}

// ── Export transaction columns ──────────────────────────────────────────────
pub mod transaction {
    pub const TABLE: &str = "transactions";
    pub const SOURCE: &str = "source";
    pub const FISH_ID: &str = "fish_id";
    pub const QTY_TONS: &str = "qty_tons";
    pub const TARGET_HARBOR: &str = "target_harbor";
    pub const DATE: &str = "date";
}

// ── Fish and habitat columns ────────────────────────────────────────────────
pub mod fish {
    pub const TABLE: &str = "fish";
    pub const LOCATIONS_TABLE: &str = "fish_locations";
    pub const ID: &str = "id";
    pub const ENTITY_NAME: &str = "entity_name";
    pub const LOCATION_ID: &str = "location_id";
}

// ── Attribution pipeline columns ────────────────────────────────────────────
pub mod attribution {
    pub const CARGO_ID: &str = "cargo_id";
    pub const WEIGHT: &str = "weight";
    pub const TOTAL_WEIGHT: &str = "total_weight";
    pub const ESTIMATED_TONS: &str = "estimated_tons";
    pub const SHARE_PERCENT: &str = "share_percent";
    pub const EXPORTS_TONS: &str = "exports_tons";
}

// ── Baseline columns ────────────────────────────────────────────────────────
pub mod baseline {
    pub const AVG_DWELL: &str = "avg_dwell";
    pub const VESSEL_DWELL: &str = "vessel_dwell";
}
