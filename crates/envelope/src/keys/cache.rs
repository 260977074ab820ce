//! [`CachingKeyProvider`]: memoised key handles in front of another provider.
//!
//! The cache is an ordinary value owned by the caller, never process-wide
//! state. Dropping it releases every cached handle.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use common::EnvelopeError;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, warn};

use super::{CertificateId, KeyProvider};

type HandleMap<K> = ArcSwap<HashMap<CertificateId, Arc<K>>>;

/// Lock-free cache of key handles, keyed by certificate identifier.
///
/// Reads go through [`ArcSwap`] so concurrent lookups never block. A miss
/// asks the wrapped provider and publishes the result with a
/// read-copy-update. Failures are never cached.
pub struct CachingKeyProvider<P> {
    inner: P,
    public: HandleMap<RsaPublicKey>,
    private: HandleMap<RsaPrivateKey>,
}

impl<P: KeyProvider> CachingKeyProvider<P> {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            public: ArcSwap::from_pointee(HashMap::new()),
            private: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached handles, public and private combined.
    pub fn len(&self) -> usize {
        self.public.load().len() + self.private.load().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached handle.
    pub fn clear(&self) {
        self.public.store(Arc::new(HashMap::new()));
        self.private.store(Arc::new(HashMap::new()));
    }
}

fn cached<K>(
    map: &HandleMap<K>,
    id: &CertificateId,
    fetch: impl FnOnce() -> Result<Arc<K>, EnvelopeError>,
) -> Result<Arc<K>, EnvelopeError> {
    if let Some(handle) = map.load().get(id) {
        return Ok(Arc::clone(handle));
    }

    debug!(%id, "key handle cache miss");
    let handle = fetch().inspect_err(|e| warn!(%id, error = %e, "key provider failed"))?;
    map.rcu(|current| {
        let mut next = HashMap::clone(current);
        next.insert(id.clone(), Arc::clone(&handle));
        next
    });
    Ok(handle)
}

impl<P: KeyProvider> KeyProvider for CachingKeyProvider<P> {
    fn public_key(&self, id: &CertificateId) -> Result<Arc<RsaPublicKey>, EnvelopeError> {
        cached(&self.public, id, || self.inner.public_key(id))
    }

    fn private_key(&self, id: &CertificateId) -> Result<Arc<RsaPrivateKey>, EnvelopeError> {
        cached(&self.private, id, || self.inner.private_key(id))
    }
}
