//! SMTP connection pooling and endpoint caching.
//!
//! [`PoolManager`] keeps one [`SmtpPool`] for the configured endpoint and
//! drops it when the settings source reports a change. [`SmtpPool`] bounds
//! concurrent transactions and reuses connections between them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use mailgate_mime::Envelope;
use mailgate_smtp::connection::{connect, connect_tls};
use mailgate_smtp::{Address, Client, Connected, SmtpConnection};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::{DispatchConfig, PoolConfig};
use crate::endpoint::{EndpointConfig, EndpointResolver};
use crate::error::{Error, Result};
use crate::settings::{SettingChange, SettingsObserver, SettingsStore};

/// Bounded set of reusable connections to one endpoint.
pub struct SmtpPool {
    endpoint: EndpointConfig,
    config: PoolConfig,
    permits: Semaphore,
    idle: Mutex<Vec<Client<Connected>>>,
}

impl fmt::Debug for SmtpPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpPool")
            .field("endpoint", &self.endpoint)
            .field("available", &self.permits.available_permits())
            .field("idle", &self.idle_count())
            .finish_non_exhaustive()
    }
}

impl SmtpPool {
    /// Creates an empty pool. Connections are opened on demand.
    #[must_use]
    pub fn new(endpoint: EndpointConfig, config: PoolConfig) -> Self {
        Self {
            permits: Semaphore::new(config.max_connections.max(1)),
            endpoint,
            config,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Endpoint this pool connects to.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Number of connections waiting for reuse.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .map_or(0, |idle| idle.len())
    }

    /// Runs one SMTP transaction delivering `wire` to every envelope
    /// recipient. `wire` must already be dot-stuffed.
    ///
    /// Waits for a free slot when `max_connections` transactions are in
    /// flight. The connection is kept for reuse only if the transaction
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unusable envelope addresses,
    /// [`Error::ConnectTimeout`] when the server is unreachable in time, and
    /// [`Error::Transport`] for any SMTP failure.
    pub async fn send(&self, envelope: &Envelope, wire: &[u8]) -> Result<()> {
        let from = envelope
            .from
            .as_deref()
            .ok_or_else(|| Error::Validation("missing envelope sender".into()))
            .and_then(envelope_address)?;
        let recipients = envelope
            .to
            .iter()
            .map(|to| envelope_address(to))
            .collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Err(Error::Validation("no recipients".into()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| mailgate_smtp::Error::ConnectionClosed)?;

        let client = self.checkout().await?;
        if let Some(limit) = client.server_info().max_message_size() {
            if wire.len() > limit {
                self.checkin(client);
                return Err(mailgate_smtp::Error::MessageTooLarge {
                    size: wire.len(),
                    limit,
                }
                .into());
            }
        }

        debug!(
            endpoint = %self.endpoint,
            recipients = recipients.len(),
            bytes = wire.len(),
            "Sending mail"
        );
        let client = transact(client, from, recipients, wire).await?;
        self.checkin(client);
        Ok(())
    }

    /// Sends QUIT on every idle connection and forgets them.
    pub async fn close(&self) {
        let idle = self
            .idle
            .lock()
            .map(|mut idle| std::mem::take(&mut *idle))
            .unwrap_or_default();
        for client in idle {
            if let Err(e) = client.quit().await {
                debug!(error = %e, "QUIT failed on idle connection");
            }
        }
    }

    async fn checkout(&self) -> Result<Client<Connected>> {
        let timeout = self.config.connect_timeout();

        while let Some(mut client) = self.pop_idle() {
            match tokio::time::timeout(timeout, client.noop()).await {
                Ok(Ok(())) => {
                    debug!(endpoint = %self.endpoint, "Reusing idle connection");
                    return Ok(client);
                }
                Ok(Err(e)) => debug!(error = %e, "Discarding stale connection"),
                Err(_) => debug!(endpoint = %self.endpoint, "Idle connection did not answer NOOP"),
            }
        }

        tokio::time::timeout(timeout, self.open())
            .await
            .map_err(|_| Error::ConnectTimeout {
                host: self.endpoint.host.clone(),
                port: self.endpoint.port,
            })?
    }

    async fn open(&self) -> Result<Client<Connected>> {
        let EndpointConfig {
            host,
            port,
            implicit_tls,
            credentials,
        } = &self.endpoint;

        let stream = if *implicit_tls {
            connect_tls(host, *port).await?
        } else {
            connect(host, *port).await?
        };

        let mut client = Client::from_stream(stream)
            .await?
            .greet(&self.config.client_hostname)
            .await?;

        if !implicit_tls && self.config.starttls && client.server_info().supports_starttls() {
            client = client.starttls(host, &self.config.client_hostname).await?;
        }

        let client = match credentials {
            Some(credentials) => client
                .authenticate(&credentials.username, &credentials.password)
                .await?
                .into_connected(),
            None => client,
        };

        info!(endpoint = %self.endpoint, server = %client.server_info().hostname, "Opened SMTP connection");
        Ok(client)
    }

    fn pop_idle(&self) -> Option<Client<Connected>> {
        self.idle.lock().ok()?.pop()
    }

    fn checkin(&self, client: Client<Connected>) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.config.max_idle {
                idle.push(client);
            }
        }
    }
}

fn envelope_address(address: &str) -> Result<Address> {
    Address::new(address).map_err(|e| Error::Validation(e.to_string()))
}

async fn transact(
    client: Client<Connected>,
    from: Address,
    recipients: Vec<Address>,
    wire: &[u8],
) -> Result<Client<Connected>> {
    let mut recipients = recipients.into_iter();
    let Some(first) = recipients.next() else {
        return Err(Error::Validation("no recipients".into()));
    };

    let mut client = client
        .mail_from(from, Some(wire.len()))
        .await?
        .rcpt_to(first)
        .await?;
    for recipient in recipients {
        client = client.rcpt_to(recipient).await?;
    }

    Ok(client.data().await?.send_message(wire).await?)
}

/// Tracks whether the cached endpoint is still current.
///
/// Every change to the watched setting bumps the epoch. A pool resolved at an
/// older epoch is stale, so a change that lands while a resolution is running
/// forces another one on the next send.
#[derive(Debug, Default)]
pub struct ConfigurationState {
    epoch: AtomicU64,
}

impl ConfigurationState {
    /// Current epoch.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Marks any earlier resolution stale.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

impl SettingsObserver for ConfigurationState {
    fn setting_changed(&self, key: &str, change: SettingChange) {
        debug!(key, ?change, "SMTP endpoint setting changed, invalidating pool");
        self.invalidate();
    }
}

#[derive(Debug, Default)]
struct CachedPool {
    pool: Option<Arc<SmtpPool>>,
    resolved_at: Option<u64>,
}

/// Owns the pool for the configured endpoint.
pub struct PoolManager {
    resolver: EndpointResolver,
    config: PoolConfig,
    state: Arc<ConfigurationState>,
    cached: RwLock<CachedPool>,
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("resolver", &self.resolver)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PoolManager {
    /// Creates a manager and subscribes it to changes of the endpoint setting.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, config: &DispatchConfig) -> Self {
        let resolver = EndpointResolver::new(Arc::clone(&settings), config);
        let state = Arc::new(ConfigurationState::default());
        let observer: Arc<dyn SettingsObserver> = state.clone();
        settings.observe(resolver.setting_key(), Arc::downgrade(&observer));

        Self {
            resolver,
            config: config.pool.clone(),
            state,
            cached: RwLock::new(CachedPool::default()),
        }
    }

    /// Configuration change tracker.
    #[must_use]
    pub fn state(&self) -> &ConfigurationState {
        &self.state
    }

    /// Returns the pool to send through.
    ///
    /// An explicit URL always gets a new pool that is not cached. Otherwise
    /// the cached pool is returned, re-resolving the endpoint first if the
    /// configuration changed since it was resolved. When resolution finds
    /// nothing, the previous pool (if any) stays in use.
    ///
    /// Resolution runs without a lock; callers racing on a change each build
    /// and use their own pool and the last one stored wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the explicit or configured URL
    /// is unusable.
    pub fn get_pool(&self, explicit: Option<&str>) -> Result<Option<Arc<SmtpPool>>> {
        if let Some(url) = explicit.filter(|url| !url.trim().is_empty()) {
            let endpoint = EndpointConfig::parse(url)?;
            debug!(%endpoint, "Using per-request SMTP endpoint");
            return Ok(Some(Arc::new(SmtpPool::new(endpoint, self.config.clone()))));
        }

        let epoch = self.state.current();
        {
            let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
            if cached.resolved_at == Some(epoch) {
                return Ok(cached.pool.clone());
            }
        }

        let resolved = self.resolver.resolve()?;

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        cached.resolved_at = Some(epoch);
        match resolved {
            Some(endpoint) => {
                info!(%endpoint, "Resolved SMTP endpoint");
                let pool = Arc::new(SmtpPool::new(endpoint, self.config.clone()));
                cached.pool = Some(Arc::clone(&pool));
                Ok(Some(pool))
            }
            None => {
                debug!("No SMTP endpoint configured");
                Ok(cached.pool.clone())
            }
        }
    }
}
