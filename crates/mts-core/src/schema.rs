//! Column names of the CSV artefacts written by the benchmark executable.
//!
//! The driver never reads these files; the constants document the contract
//! that downstream plotting consumes so renames show up in one place.

/// Periodic time-series columns (one row per sample interval).
pub mod periodic {
    pub const LATENCY_NS: &str = "Latency(ns)";
    pub const THROUGHPUT: &str = "Throughput(ops/s)";
    pub const LOCAL_ACCESS: &str = "LocalAccess";
    pub const REMOTE_ACCESS: &str = "RemoteAccess";
    pub const PMEM_ACCESS: &str = "PmemAccess";
    pub const TOTAL_ACCESS: &str = "TotalAccess";
    pub const LOCAL_COUNT: &str = "LocalCount";
    pub const REMOTE_COUNT: &str = "RemoteCount";
    pub const PMEM_COUNT: &str = "PmemCount";

    /// Page migration counters between tiers.
    pub const TRANSFERS: [&str; 6] = [
        "local2remote",
        "remote2local",
        "remote2pmem",
        "pmem2remote",
        "local2pmem",
        "pmem2local",
    ];

    /// Every periodic column, transfer counters last.
    pub fn columns() -> Vec<&'static str> {
        let mut columns = vec![
            LATENCY_NS,
            THROUGHPUT,
            LOCAL_ACCESS,
            REMOTE_ACCESS,
            PMEM_ACCESS,
            TOTAL_ACCESS,
            LOCAL_COUNT,
            REMOTE_COUNT,
            PMEM_COUNT,
        ];
        columns.extend(TRANSFERS);
        columns
    }
}

/// Latency distribution columns.
pub mod cdf {
    pub const PERCENTILE: &str = "percentile";
    pub const LATENCY_NS: &str = "latency_ns";

    /// Non-numeric tokens allowed in the percentile column.
    pub const SUMMARY_TOKENS: [&str; 3] = ["Min", "Max", "Mean"];

    pub fn columns() -> Vec<&'static str> {
        vec![PERCENTILE, LATENCY_NS]
    }
}

/// Extension shared by both artefacts.
pub const OUTPUT_EXTENSION: &str = "csv";

/// File name prefix of the latency distribution artefact.
pub const CDF_PREFIX: &str = "cdf";

/// File name prefix of the periodic time-series artefact.
pub const PERIODIC_PREFIX: &str = "periodic";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_exposes_fifteen_columns() {
        let columns = periodic::columns();
        assert_eq!(columns.len(), 15);
        assert_eq!(columns[0], "Latency(ns)");
        assert_eq!(columns[14], "pmem2local");
    }
}
