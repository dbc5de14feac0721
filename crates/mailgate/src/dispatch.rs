//! Public entry point.

use std::sync::Arc;

use mailgate_mime::Compose;
use tracing::{debug, info};

use crate::builder::compose;
use crate::config::DispatchConfig;
use crate::console::ConsoleSink;
use crate::error::{Error, Result};
use crate::pool::PoolManager;
use crate::request::MailRequest;
use crate::settings::SettingsStore;
use crate::wire::escape_body;

/// Sends mail through the configured SMTP endpoint.
///
/// Without an endpoint, sends fail with [`Error::NoEndpoint`] unless the
/// console fallback is enabled, in which case messages are printed instead.
#[derive(Debug)]
pub struct Dispatcher {
    pools: PoolManager,
    console: Option<ConsoleSink>,
}

impl Dispatcher {
    /// Creates a dispatcher reading its endpoint from `settings`.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, config: &DispatchConfig) -> Self {
        let console = config
            .console_fallback
            .then(|| ConsoleSink::stdout(config.fallback_env.clone()));
        Self {
            pools: PoolManager::new(settings, config),
            console,
        }
    }

    /// Enables the console fallback with a custom sink.
    #[must_use]
    pub fn with_console(mut self, console: ConsoleSink) -> Self {
        self.console = Some(console);
        self
    }

    /// Pool manager behind this dispatcher.
    #[must_use]
    pub const fn pools(&self) -> &PoolManager {
        &self.pools
    }

    /// Validates, composes and delivers `request`. Completes once the server
    /// accepted the message (or the console block was written).
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unusable request, a configuration
    /// error for a bad or missing endpoint, and a transport error if the
    /// SMTP transaction fails.
    pub async fn send(&self, request: MailRequest) -> Result<()> {
        request.validate()?;
        let message = compose(&request)?;
        self.send_raw(&message, request.smtp_url.as_deref()).await
    }

    /// Delivers an already composed message, through `smtp_url` when given.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::send`].
    pub async fn send_raw<M>(&self, message: &M, smtp_url: Option<&str>) -> Result<()>
    where
        M: Compose + Sync + ?Sized,
    {
        let envelope = message.envelope();
        let wire = escape_body(&message.render()?);

        let dedicated = smtp_url.is_some_and(|url| !url.trim().is_empty());
        let Some(pool) = self.pools.get_pool(smtp_url)? else {
            return match &self.console {
                Some(console) => {
                    let id = console.dump(wire).await;
                    debug!(id, "No SMTP endpoint, mail written to console");
                    Ok(())
                }
                None => Err(Error::NoEndpoint),
            };
        };

        let sent = pool.send(&envelope, wire.as_bytes()).await;
        if dedicated {
            pool.close().await;
        }
        sent?;

        info!(
            endpoint = %pool.endpoint(),
            recipients = envelope.to.len(),
            "Mail sent"
        );
        Ok(())
    }
}
