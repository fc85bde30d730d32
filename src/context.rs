//! Installed backend for an engine instance
//!
//! [`SimdContext`] replaces a process-wide "current SIMD processor" global.
//! The engine owns one context, initializes it once at startup and hands out
//! `&SimdContext` (or the `&dyn SimdProcessor` it yields) to every caller.
//! Installing or removing a backend needs `&mut SimdContext`, so the borrow
//! checker enforces a single writer and many readers.

use std::fmt;

use crate::backends::{GenericProcessor, SimdProcessor};
use crate::caps::CpuCaps;
use crate::error::{RayoError, Result};
use crate::{detect, registry};

/// A selected processor plus the capability mask it was chosen for
pub struct BackendHandle {
    processor: Box<dyn SimdProcessor>,
    caps: CpuCaps,
}

impl BackendHandle {
    pub fn new(processor: Box<dyn SimdProcessor>, caps: CpuCaps) -> Self {
        Self { processor, caps }
    }

    pub fn processor(&self) -> &dyn SimdProcessor {
        self.processor.as_ref()
    }

    /// Mask used for selection, kept for diagnostics
    pub fn caps(&self) -> &CpuCaps {
        &self.caps
    }

    pub fn name(&self) -> &'static str {
        self.processor.name()
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("backend", &self.name())
            .field("caps", &self.caps)
            .finish()
    }
}

/// What [`SimdContext::init_best`] detected and chose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionReport {
    module: String,
    caps: CpuCaps,
    backend: &'static str,
}

impl SelectionReport {
    pub fn caps(&self) -> &CpuCaps {
        &self.caps
    }

    /// Name of the installed backend
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// `Found {vendor} CPU, features: ...`
    pub fn found_line(&self) -> String {
        format!("Found {}", self.caps)
    }

    /// `{module} using {backend} for SIMD processing.`
    pub fn using_line(&self) -> String {
        format!("{} using {} for SIMD processing.", self.module, self.backend)
    }
}

impl fmt::Display for SelectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.found_line())?;
        write!(f, "{}", self.using_line())
    }
}

/// Owner of the installed backend
///
/// Starts empty. [`processor`](Self::processor) fails until one of the
/// `init*` methods runs, and again after [`shutdown`](Self::shutdown).
#[derive(Debug, Default)]
pub struct SimdContext {
    active: Option<BackendHandle>,
}

impl SimdContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the reference backend unconditionally
    pub fn init(&mut self) {
        tracing::debug!("installing reference SIMD backend");
        self.active = Some(BackendHandle::new(Box::new(GenericProcessor), CpuCaps::default()));
    }

    /// Probe the host, select the best backend and install it
    ///
    /// `forced` names a backend to prefer; it is ignored when the host cannot
    /// run it. Replaces any backend already installed.
    pub fn init_best(&mut self, module: &str, forced: Option<&str>) -> SelectionReport {
        self.init_best_with_caps(module, forced, detect::detect())
    }

    /// [`init_best`](Self::init_best) with a caller-supplied capability mask
    pub fn init_best_with_caps(
        &mut self,
        module: &str,
        forced: Option<&str>,
        caps: CpuCaps,
    ) -> SelectionReport {
        let handle = registry::select(&caps, forced);
        let report = SelectionReport {
            module: module.to_string(),
            caps,
            backend: handle.name(),
        };

        tracing::info!("{}", report.found_line());
        tracing::info!("{}", report.using_line());

        self.active = Some(handle);
        report
    }

    /// Drop the installed backend
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.active.take() {
            tracing::debug!(backend = handle.name(), "SIMD backend released");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    pub fn handle(&self) -> Option<&BackendHandle> {
        self.active.as_ref()
    }

    /// The installed processor
    ///
    /// # Errors
    ///
    /// `NotInitialized` when no backend is installed
    pub fn processor(&self) -> Result<&dyn SimdProcessor> {
        self.active
            .as_ref()
            .map(BackendHandle::processor)
            .ok_or(RayoError::NotInitialized)
    }
}
