//! DNS MX resolution helpers.
//!
//! The public entry point is [`check_mx`], which performs a synchronous
//! lookup using the system resolver and returns a [`MxStatus`] describing
//! the outcome. A domain without a resolvable mail route yields
//! [`MxStatus::NoRecords`] rather than an error.

mod error;
pub(crate) mod resolver;

pub use error::MxError as Error;
pub use resolver::check_mx;


/// One hop of a domain's mail route: the exchange host to dial and the
/// priority DNS assigned to it. Lower priority dials first.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub priority: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(priority: u16, exchange: impl Into<String>) -> Self {
        let exchange = exchange.into();
        Self { priority, exchange }
    }
}

/// A domain's mail route as the verifier consumes it. NXDOMAIN, an empty
/// answer section and lookup failures all collapse into
/// [`MxStatus::NoRecords`]: a domain whose route cannot be resolved has no
/// route, and the classic implicit-MX fallback to A/AAAA records is
/// deliberately not applied.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxStatus {
    /// Records in dialing order.
    Records(Vec<MxRecord>),
    NoRecords,
}

impl MxStatus {
    /// Builds the route from whatever a lookup produced. Records are put
    /// in dialing order (ascending priority; the sort is stable, so equal
    /// priorities keep the resolver's order), exact duplicates are
    /// dropped, and an empty set collapses to [`MxStatus::NoRecords`].
    pub fn from_lookup(mut records: Vec<MxRecord>) -> Self {
        records.sort_by_key(|record| record.priority);
        records.dedup();
        if records.is_empty() {
            Self::NoRecords
        } else {
            Self::Records(records)
        }
    }

    pub fn records(&self) -> &[MxRecord] {
        if let Self::Records(records) = self {
            records
        } else {
            &[]
        }
    }
}
