// Shared test doubles for the capture backend

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use shiro_notes::audio::{
    CaptureBackend, CaptureHandle, CaptureOptions, CaptureStatus, FinalizedCapture, Permission,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Pauses a backend call until the test lets it continue
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    proceed: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait until the backend is blocked inside the gated call
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.proceed.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.proceed.notified().await;
    }
}

#[derive(Default)]
struct Ledger {
    open: HashSet<CaptureHandle>,
    max_open: usize,
    opened: usize,
    released: Vec<CaptureHandle>,
    finalized: usize,
    options: Vec<CaptureOptions>,
    started_at: Option<Instant>,
    failed_reads: usize,
}

/// Capture backend whose answers are set up by the test
pub struct ScriptedCapture {
    pub permission: Permission,
    /// dB value reported by every status read; `None` = no metering
    pub metering_db: Option<f32>,
    pub finalize_duration_ms: u64,
    pub fail_finalize: bool,
    pub fail_release: bool,
    /// Number of status reads on an open capture that fail before reads succeed
    pub fail_status_reads: usize,
    pub permission_gate: Option<Arc<Gate>>,
    pub start_gate: Option<Arc<Gate>>,
    pub finalize_gate: Option<Arc<Gate>>,
    pub ledger: Mutex<Ledger>,
}

impl Default for ScriptedCapture {
    fn default() -> Self {
        Self {
            permission: Permission::Granted,
            metering_db: Some(-40.0),
            finalize_duration_ms: 12000,
            fail_finalize: false,
            fail_release: false,
            fail_status_reads: 0,
            permission_gate: None,
            start_gate: None,
            finalize_gate: None,
            ledger: Mutex::new(Ledger::default()),
        }
    }
}

impl ScriptedCapture {
    pub fn open_count(&self) -> usize {
        self.ledger.lock().unwrap().open.len()
    }

    pub fn max_open(&self) -> usize {
        self.ledger.lock().unwrap().max_open
    }

    pub fn opened(&self) -> usize {
        self.ledger.lock().unwrap().opened
    }

    pub fn released(&self) -> Vec<CaptureHandle> {
        self.ledger.lock().unwrap().released.clone()
    }

    pub fn finalized(&self) -> usize {
        self.ledger.lock().unwrap().finalized
    }

    pub fn failed_reads(&self) -> usize {
        self.ledger.lock().unwrap().failed_reads
    }

    pub fn options(&self) -> Vec<CaptureOptions> {
        self.ledger.lock().unwrap().options.clone()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedCapture {
    async fn request_permission(&self) -> Result<Permission> {
        if let Some(gate) = &self.permission_gate {
            gate.pass().await;
        }
        Ok(self.permission)
    }

    async fn start_capture(&self, options: CaptureOptions) -> Result<CaptureHandle> {
        if let Some(gate) = &self.start_gate {
            gate.pass().await;
        }

        let handle = CaptureHandle::new_random();
        let mut ledger = self.ledger.lock().unwrap();
        ledger.open.insert(handle.clone());
        ledger.max_open = ledger.max_open.max(ledger.open.len());
        ledger.opened += 1;
        ledger.options.push(options);
        ledger.started_at = Some(Instant::now());
        Ok(handle)
    }

    async fn read_status(&self, handle: &CaptureHandle) -> Result<CaptureStatus> {
        let mut ledger = self.ledger.lock().unwrap();
        if !ledger.open.contains(handle) {
            return Err(anyhow!("capture {} is not open", handle));
        }
        if ledger.failed_reads < self.fail_status_reads {
            ledger.failed_reads += 1;
            return Err(anyhow!("audio route changed"));
        }
        let elapsed_ms = ledger
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        Ok(CaptureStatus {
            elapsed_ms,
            metering_db: self.metering_db,
        })
    }

    async fn finalize(&self, handle: &CaptureHandle) -> Result<FinalizedCapture> {
        if let Some(gate) = &self.finalize_gate {
            gate.pass().await;
        }
        if self.fail_finalize {
            return Err(anyhow!("disk full"));
        }
        self.ledger.lock().unwrap().finalized += 1;
        Ok(FinalizedCapture {
            uri: format!("file:///recordings/{}.m4a", handle),
            duration_ms: self.finalize_duration_ms,
        })
    }

    async fn release(&self, handle: &CaptureHandle) -> Result<()> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.open.remove(handle);
        ledger.released.push(handle.clone());
        if self.fail_release {
            return Err(anyhow!("audio session busy"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
