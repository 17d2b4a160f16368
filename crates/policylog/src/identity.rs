//! Process-wide identity captured once at startup

use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<ProcessIdentity>> = OnceLock::new();

/// Host and process identity shared by every record of this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    host_id: String,
    process_id: u32,
}

impl ProcessIdentity {
    /// Explicit identity, mainly for tests and embedding.
    pub fn new(host_id: impl Into<String>, process_id: u32) -> Self {
        Self {
            host_id: host_id.into(),
            process_id,
        }
    }

    /// Capture the identity of the running process.
    pub fn capture() -> Self {
        Self {
            host_id: detect_host_id(),
            process_id: std::process::id(),
        }
    }

    /// The identity captured on first use. Read-only afterwards.
    pub fn global() -> Arc<ProcessIdentity> {
        GLOBAL.get_or_init(|| Arc::new(Self::capture())).clone()
    }

    /// Host identifier.
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// Process identifier.
    pub fn process_id(&self) -> u32 {
        self.process_id
    }
}

/// Machine-id prefix on Linux, then `HOSTNAME`, then a random fragment.
fn detect_host_id() -> String {
    if let Ok(id) = std::fs::read_to_string("/etc/machine-id") {
        if let Some(prefix) = id.trim().get(..12) {
            return format!("host-{}", prefix);
        }
    }

    if let Ok(hostname) = std::env::var("HOSTNAME") {
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            return hostname.to_string();
        }
    }

    format!("host-{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Identifier of the calling thread: its name, else its `ThreadId`.
pub fn current_thread_id() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
