//! The semantic router and its add/sync protocol.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use semroute_encoders::{DenseEncoder, Embedding};

use crate::error::{Result, RouterError};
use crate::hash::StateHash;
use crate::index::{IndexBatch, RouteIndex};
use crate::route::{Route, RouteBatch, RouteDetails, Utterance};

/// How the index hash was reconciled after an add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashStatus {
    /// Local and index state agreed before the add; the index now holds
    /// this hash.
    Written(StateHash),

    /// Local and index state disagreed before the add; the index hash was
    /// left as is.
    Diverged { local: StateHash, remote: StateHash },
}

impl HashStatus {
    /// Whether the index hash was updated.
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// Result of a successful add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// Routes appended to the local route set.
    pub routes: usize,

    /// Utterances written to the index.
    pub utterances: usize,

    /// Hash reconciliation result.
    pub hash: HashStatus,
}

/// Phases of a single add call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddPhase {
    HashRead,
    Encoding,
    IndexWrite,
    HashReconcile,
}

impl fmt::Display for AddPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HashRead => "hash read",
            Self::Encoding => "encoding",
            Self::IndexWrite => "index write",
            Self::HashReconcile => "hash reconcile",
        };
        f.write_str(name)
    }
}

/// Everything read before encoding starts.
struct PendingAdd {
    routes: Vec<Route>,
    details: RouteDetails,
    local: StateHash,
    remote: StateHash,
}

/// Routes utterances against a set of routes kept in sync with an index.
///
/// Every add embeds the new utterances with `encoder`, stores them in
/// `index`, appends the routes locally and then reconciles the state hash.
/// The index hash is only written when local and index state agreed before
/// the add, so a concurrent writer is never silently overwritten.
pub struct SemanticRouter<E, I> {
    encoder: E,
    index: I,
    routes: Vec<Route>,
}

impl<E, I> SemanticRouter<E, I>
where
    E: DenseEncoder,
    I: RouteIndex,
{
    /// Create a router with no routes.
    pub fn new(encoder: E, index: I) -> Self {
        Self {
            encoder,
            index,
            routes: Vec::new(),
        }
    }

    /// Create a router and add `routes` through the blocking encoder path.
    pub fn with_routes(encoder: E, index: I, routes: impl Into<RouteBatch>) -> Result<Self> {
        let mut router = Self::new(encoder, index);
        router.add(routes)?;
        Ok(router)
    }

    /// Create a router and add `routes` through the async encoder path.
    pub async fn awith_routes(
        encoder: E,
        index: I,
        routes: impl Into<RouteBatch>,
    ) -> Result<Self> {
        let mut router = Self::new(encoder, index);
        router.aadd(routes).await?;
        Ok(router)
    }

    /// Local routes, in the order they were added.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// The index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Mutable access to the index.
    pub fn index_mut(&mut self) -> &mut I {
        &mut self.index
    }

    /// Add one or more routes, encoding on the current thread.
    pub fn add(&mut self, routes: impl Into<RouteBatch>) -> Result<AddOutcome> {
        let pending = self.begin_add(routes.into())?;

        let embeddings = if pending.details.is_empty() {
            Vec::new()
        } else {
            debug!("Route add phase: {}", AddPhase::Encoding);
            self.encoder.encode(&pending.details.utterances)?
        };

        self.finish_add(pending, embeddings)
    }

    /// Add one or more routes, encoding asynchronously.
    pub async fn aadd(&mut self, routes: impl Into<RouteBatch>) -> Result<AddOutcome> {
        let pending = self.begin_add(routes.into())?;

        let embeddings = if pending.details.is_empty() {
            Vec::new()
        } else {
            debug!("Route add phase: {}", AddPhase::Encoding);
            self.encoder.aencode(&pending.details.utterances).await?
        };

        self.finish_add(pending, embeddings)
    }

    fn begin_add(&self, batch: RouteBatch) -> Result<PendingAdd> {
        debug!("Route add phase: {}", AddPhase::HashRead);
        let local = self.get_hash()?;
        let mut remote = self.index.read_hash()?;
        if remote.is_uninitialized() {
            debug!("Index has no state hash yet, treating it as {local}");
            remote = local.clone();
        }

        let routes = batch.into_routes();
        let details = RouteDetails::extract(&routes);
        Ok(PendingAdd {
            routes,
            details,
            local,
            remote,
        })
    }

    fn finish_add(
        &mut self,
        pending: PendingAdd,
        embeddings: Vec<Embedding>,
    ) -> Result<AddOutcome> {
        let PendingAdd {
            routes,
            details,
            local,
            remote,
        } = pending;

        debug!("Route add phase: {}", AddPhase::IndexWrite);
        if embeddings.len() != details.len() {
            return Err(RouterError::InvalidInput(format!(
                "encoder returned {} vectors for {} utterances",
                embeddings.len(),
                details.len()
            )));
        }
        let utterances = details.len();
        if !details.is_empty() {
            self.index.add(IndexBatch::new(embeddings, details))?;
        }

        let added = routes.len();
        self.routes.extend(routes);

        debug!("Route add phase: {}", AddPhase::HashReconcile);
        let hash = if local == remote {
            let updated = self.get_hash()?;
            self.index.write_hash(updated.clone())?;
            HashStatus::Written(updated)
        } else {
            warn!(
                "Local and remote route layers were not aligned. Remote hash not updated. \
                 Use `SemanticRouter::get_utterance_diff()` to see details."
            );
            HashStatus::Diverged { local, remote }
        };

        info!("Added {added} routes with {utterances} utterances");
        Ok(AddOutcome {
            routes: added,
            utterances,
            hash,
        })
    }

    /// Encode query text with the router's encoder.
    pub fn encode(&self, text: &[String]) -> Result<Vec<Embedding>> {
        Ok(self.encoder.encode(text)?)
    }

    /// Encode query text asynchronously.
    pub async fn aencode(&self, text: &[String]) -> Result<Vec<Embedding>> {
        Ok(self.encoder.aencode(text).await?)
    }

    /// Hash of the local route set.
    pub fn get_hash(&self) -> Result<StateHash> {
        Ok(StateHash::compute(&self.routes)?)
    }

    /// Whether the index holds the hash of the local route set.
    pub fn is_synced(&self) -> Result<bool> {
        Ok(self.get_hash()? == self.index.read_hash()?)
    }

    /// Compare local utterances with the ones stored in the index.
    ///
    /// Lines start with `"  "` when both sides have the utterance, `"+ "`
    /// when only the local route set has it and `"- "` when only the index
    /// has it. Lines are sorted by route, then utterance.
    pub fn get_utterance_diff(&self, include_metadata: bool) -> Result<Vec<String>> {
        let keyed = |utterances: Vec<Utterance>| -> BTreeSet<(String, String, String)> {
            utterances
                .into_iter()
                .map(|u| {
                    let line = u.to_line(include_metadata);
                    (u.route, u.utterance, line)
                })
                .collect()
        };

        let local = keyed(self.routes.iter().flat_map(Route::to_utterances).collect());
        let remote = keyed(self.index.utterances()?);

        Ok(local
            .union(&remote)
            .map(|key| {
                let marker = match (local.contains(key), remote.contains(key)) {
                    (true, true) => ' ',
                    (true, false) => '+',
                    _ => '-',
                };
                format!("{marker} {}", key.2)
            })
            .collect())
    }
}
