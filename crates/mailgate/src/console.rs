//! Console fallback: prints messages instead of sending them.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes each message between numbered BEGIN/END markers.
pub struct ConsoleSink {
    writer: SharedWriter,
    next_id: AtomicU64,
    fallback_env: String,
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("next_id", &self.next_id)
            .field("fallback_env", &self.fallback_env)
            .finish_non_exhaustive()
    }
}

impl ConsoleSink {
    /// Creates a sink writing to stdout. `fallback_env` is named in the
    /// notice line.
    #[must_use]
    pub fn stdout(fallback_env: impl Into<String>) -> Self {
        Self::with_writer(io::stdout(), fallback_env)
    }

    /// Creates a sink writing to `writer`.
    #[must_use]
    pub fn with_writer(writer: impl Write + Send + 'static, fallback_env: impl Into<String>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            next_id: AtomicU64::new(0),
            fallback_env: fallback_env.into(),
        }
    }

    /// Writes `wire` as one block and returns its id. The write happens on the
    /// blocking pool; failures are logged, never returned.
    pub async fn dump(&self, wire: String) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let writer = Arc::clone(&self.writer);
        let notice = format!(
            "(Mail not sent; to enable sending, set the {} environment variable.)",
            self.fallback_env
        );

        let written = tokio::task::spawn_blocking(move || {
            let mut writer = writer
                .lock()
                .map_err(|_| io::Error::other("console writer lock poisoned"))?;
            write_block(&mut **writer, id, &notice, &wire)
        })
        .await;

        match written {
            Ok(Ok(())) => debug!(id, "Mail written to console"),
            Ok(Err(e)) => warn!(id, error = %e, "Failed to write mail to console"),
            Err(e) => warn!(id, error = %e, "Console write task failed"),
        }
        id
    }
}

fn write_block(out: &mut dyn Write, id: u64, notice: &str, wire: &str) -> io::Result<()> {
    writeln!(out, "====== BEGIN MAIL #{id} ======")?;
    writeln!(out, "{notice}")?;
    out.write_all(wire.as_bytes())?;
    if !wire.ends_with('\n') {
        writeln!(out)?;
    }
    writeln!(out, "====== END MAIL #{id} ======")?;
    out.flush()
}
