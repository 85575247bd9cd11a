// Relay selection: ask the directory where each candidate name lives, then keep
// the lowest-latency distinct relay.

use futures::future::join_all;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::errors::ResolutionError;
use crate::domain::identity::{Identity, candidate_names};
use crate::domain::ports::{Directory, LatencyMeter};

/// Relay chosen for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Physical relay address (`host:port`).
    pub address: String,
    /// Directory name that resolved to it; the transport registers under this name.
    pub name: Identity,
    /// Measured latency, `None` when the ping got no answer.
    pub latency: Option<Duration>,
}

pub struct AddressResolver<D, P> {
    pub directory: D,
    pub meter: P,
}

impl<D, P> AddressResolver<D, P>
where
    D: Directory,
    P: LatencyMeter,
{
    pub fn new(directory: D, meter: P) -> Self {
        Self { directory, meter }
    }

    pub async fn resolve(&self, identity: &Identity) -> Result<Resolved, ResolutionError> {
        let names = candidate_names(identity);
        let lookups = join_all(names.iter().map(|name| self.directory.lookup(name.as_str()))).await;

        // Keep the first name per distinct address, in candidate order.
        let mut seen = HashSet::new();
        let mut distinct: Vec<(Identity, String)> = Vec::new();
        for (name, lookup) in names.iter().zip(lookups) {
            match lookup {
                Ok(Some(address)) => {
                    if seen.insert(address.clone()) {
                        distinct.push((name.clone(), address));
                    } else {
                        debug!(%name, %address, "duplicate relay address; skipping");
                    }
                }
                Ok(None) => debug!(%name, "directory miss"),
                Err(error) => warn!(%name, %error, "directory lookup failed"),
            }
        }

        if distinct.is_empty() {
            return Err(ResolutionError {
                identity: identity.to_string(),
                attempted: names.len(),
            });
        }

        let latencies = join_all(
            distinct
                .iter()
                .map(|(_, address)| self.meter.measure(address.as_str())),
        )
        .await;

        // Strict `<` keeps the first-seen candidate on ties; unanswered pings rank last.
        let mut best: Option<(usize, Option<Duration>)> = None;
        for (idx, latency) in latencies.iter().enumerate() {
            let better = match best {
                None => true,
                Some((_, None)) => latency.is_some(),
                Some((_, Some(current))) => latency.is_some_and(|l| l < current),
            };
            if better {
                best = Some((idx, *latency));
            }
        }

        let (idx, latency) = best.ok_or_else(|| ResolutionError {
            identity: identity.to_string(),
            attempted: names.len(),
        })?;
        let (name, address) = distinct.swap_remove(idx);

        info!(
            %name,
            %address,
            latency_ms = latency.map(|l| l.as_millis() as u64),
            candidates = distinct.len() + 1,
            "relay selected"
        );

        Ok(Resolved {
            address,
            name,
            latency,
        })
    }
}
