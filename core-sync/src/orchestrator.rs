//! # Sync Orchestrator
//!
//! Drives one sync run: resolve destinations, iterate photos, compose.
//!
//! ## Workflow
//!
//! 1. Resolve every configured destination; failures deactivate that
//!    destination only
//! 2. Iterate the album's photos in order, attempting each file against
//!    every still-active destination independently
//! 3. Finalize each active destination; the content destination composes
//!    its collection entry iff at least one asset succeeded
//!
//! Execution is sequential. There is no persistence across runs; the
//! idempotent folder resolution in Drive is the rerun recovery mechanism.

use crate::album::LocalAlbum;
use crate::destination::{Destination, ProgressObserver};
use crate::error::SyncError;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Unique identifier for one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of a sync run, logged as the run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Init,
    DestinationsResolved,
    Iterating,
    Composing,
    Done,
}

/// Result of a single upload attempt.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_name: String,
    pub destination: String,
    /// `None` on success, otherwise the failure description
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a completed sync run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: SyncRunId,
    pub album: String,
    pub year: String,
    pub photo_count: usize,
    /// Per-file, per-destination attempt results
    pub outcomes: Vec<UploadOutcome>,
    /// Destinations deactivated before or during the run, with reasons
    pub deactivated: Vec<(String, String)>,
    /// Identifier of the composed collection entry, when one was created
    pub collection_id: Option<String>,
}

impl RunReport {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}

/// Tracks one destination's activity over the run.
struct Slot {
    destination: Box<dyn Destination>,
    active: bool,
}

/// Orchestrates one sync run over a set of destinations.
pub struct SyncOrchestrator {
    album: LocalAlbum,
    slots: Vec<Slot>,
}

impl SyncOrchestrator {
    pub fn new(album: LocalAlbum, destinations: Vec<Box<dyn Destination>>) -> Self {
        let slots = destinations
            .into_iter()
            .map(|destination| Slot {
                destination,
                active: true,
            })
            .collect();
        Self { album, slots }
    }

    /// Execute the run to completion.
    ///
    /// Never returns an error: every failure is isolated to its
    /// destination or file and recorded in the report.
    pub async fn run(mut self, progress: &dyn ProgressObserver) -> RunReport {
        let run_id = SyncRunId::new();
        let mut state = RunState::Init;
        debug!(run_id = %run_id, state = ?state, "Run created");
        let mut outcomes = Vec::new();
        let mut deactivated = Vec::new();
        let mut collection_id = None;

        info!(
            run_id = %run_id,
            album = %self.album.name,
            year = %self.album.year,
            photos = self.album.photos.len(),
            destinations = self.slots.len(),
            "Starting sync run"
        );

        // Resolve each destination, deactivating failures
        for slot in &mut self.slots {
            let name = slot.destination.name();
            if let Err(e) = slot.destination.resolve().await {
                warn!(destination = name, error = %e, "Destination deactivated during resolve");
                deactivated.push((name.to_string(), e.to_string()));
                slot.active = false;
            }
        }
        state = RunState::DestinationsResolved;
        debug!(run_id = %run_id, state = ?state, "Destinations resolved");

        // Attempt each photo against every still-active destination
        state = RunState::Iterating;
        debug!(run_id = %run_id, state = ?state, "Iterating photos");
        for photo in &self.album.photos {
            for slot in &mut self.slots {
                if !slot.active {
                    continue;
                }
                let name = slot.destination.name();

                match slot.destination.upload(photo, progress).await {
                    Ok(()) => {
                        debug!(file = %photo.file_name, destination = name, "Upload succeeded");
                        outcomes.push(UploadOutcome {
                            file_name: photo.file_name.clone(),
                            destination: name.to_string(),
                            error: None,
                        });
                    }
                    Err(e @ SyncError::MetadataExtraction { .. }) => {
                        // Composition needs a capture date, the whole
                        // content path is disabled
                        warn!(
                            destination = name,
                            error = %e,
                            "Destination deactivated, capture date unavailable"
                        );
                        outcomes.push(UploadOutcome {
                            file_name: photo.file_name.clone(),
                            destination: name.to_string(),
                            error: Some(e.to_string()),
                        });
                        deactivated.push((name.to_string(), e.to_string()));
                        slot.active = false;
                    }
                    Err(e) => {
                        warn!(
                            file = %photo.file_name,
                            destination = name,
                            error = %e,
                            "Upload failed, continuing"
                        );
                        outcomes.push(UploadOutcome {
                            file_name: photo.file_name.clone(),
                            destination: name.to_string(),
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
        }

        // Finalize active destinations
        state = RunState::Composing;
        debug!(run_id = %run_id, state = ?state, "Composing");
        for slot in &mut self.slots {
            if !slot.active {
                continue;
            }
            let name = slot.destination.name();

            match slot.destination.finalize().await {
                Ok(outcome) => {
                    match &outcome.collection_id {
                        Some(id) => {
                            info!(destination = name, collection_id = %id, "Destination finalized")
                        }
                        None => debug!(destination = name, "Destination finalized"),
                    }
                    for failure in outcome.publish_failures {
                        warn!(destination = name, error = %failure, "Asset publish failed");
                        let file_name = match &failure {
                            SyncError::AssetPublish { asset, .. } => asset.clone(),
                            _ => String::new(),
                        };
                        outcomes.push(UploadOutcome {
                            file_name,
                            destination: name.to_string(),
                            error: Some(failure.to_string()),
                        });
                    }
                    if let Some(id) = outcome.collection_id {
                        collection_id = Some(id);
                    }
                }
                Err(e) => {
                    warn!(destination = name, error = %e, "Finalize failed");
                    deactivated.push((name.to_string(), e.to_string()));
                }
            }
        }

        state = RunState::Done;
        let report = RunReport {
            run_id,
            album: self.album.name.clone(),
            year: self.album.year.clone(),
            photo_count: self.album.photos.len(),
            outcomes,
            deactivated,
            collection_id,
        };

        info!(
            run_id = %run_id,
            state = ?state,
            successes = report.successes(),
            failures = report.failures(),
            collection = report.collection_id.as_deref().unwrap_or("none"),
            "Sync run complete"
        );
        report
    }
}
