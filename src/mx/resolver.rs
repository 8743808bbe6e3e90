use tracing::{debug, warn};
use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
};

use super::{Error, MxRecord, MxStatus};

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is lowercased and IDNA-converted before querying DNS. The
/// resulting [`MxStatus`] contains the record list sorted by ascending
/// priority; any lookup failure yields [`MxStatus::NoRecords`].
pub fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    let resolver = Resolver::from_system_conf().map_err(Error::resolver_init)?;
    Ok(resolve_with(&resolver, domain))
}

pub(crate) fn resolve_with<R>(resolver: &R, domain: &str) -> MxStatus
where
    R: LookupMx,
{
    let ascii = normalize_domain(domain);
    let found = match resolver.lookup_mx(&ascii) {
        Ok(records) => records,
        Err(err) => {
            if !matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                warn!(domain = %ascii, error = %err, "MX lookup failed");
            }
            Vec::new()
        }
    };

    let status = MxStatus::from_lookup(found);
    if !status.records().is_empty() {
        debug!(domain = %ascii, count = status.records().len(), "resolved MX records");
    }
    status
}

/// Lowercase and IDNA-encode `domain` for the DNS query. Input that cannot
/// be encoded falls back to the lowercased form and fails at lookup time.
pub(crate) fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().trim_end_matches('.').to_lowercase();
    match idna::domain_to_ascii(&lowered) {
        Ok(ascii) => ascii,
        Err(_) => lowered,
    }
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

pub(crate) trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        let records = lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(mx.exchange().to_utf8())))
            .collect();
        Ok(records)
    }
}
