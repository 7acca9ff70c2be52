//! Background work for file reads and image processing.
//!
//! Work that touches the disk or decodes pixels runs off the UI loop:
//! 1. The app asks the [`TaskSpawner`] to start a job
//! 2. The job runs on tokio's blocking pool
//! 3. Its result comes back as a [`TaskMessage`] on an unbounded channel
//! 4. The main loop drains the channel with `try_recv()` between frames
//!
//! All table mutation stays on the main loop; tasks only produce values.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ImageSettings;
use crate::csv::{self, CsvDocument};
use crate::error::AppError;
use crate::imaging::{self, ProcessedImage};

/// Results sent from background tasks to the main loop.
#[derive(Debug)]
pub enum TaskMessage {
    /// A CSV file was read and parsed.
    CsvLoaded {
        path: PathBuf,
        result: Result<CsvDocument, String>,
    },

    /// An image was processed for the cell `(row_id, field)`.
    ImageProcessed {
        row_id: u64,
        field: String,
        result: Result<ProcessedImage, String>,
    },
}

/// Spawns background tasks.
#[derive(Clone)]
pub struct TaskSpawner {
    tx: mpsc::UnboundedSender<TaskMessage>,
}

impl TaskSpawner {
    pub fn new(tx: mpsc::UnboundedSender<TaskMessage>) -> Self {
        Self { tx }
    }

    /// Read and parse a CSV file.
    pub fn spawn_read_csv(&self, path: PathBuf, has_header: bool) {
        let tx = self.tx.clone();
        debug!(path = %path.display(), has_header, "Reading CSV in background");
        tokio::task::spawn_blocking(move || {
            let result = load_csv(&path, has_header);
            if tx.send(TaskMessage::CsvLoaded { path, result }).is_err() {
                warn!("CSV result dropped, receiver closed");
            }
        });
    }

    /// Validate, scale and encode an image for a cell.
    pub fn spawn_process_image(
        &self,
        row_id: u64,
        field: String,
        path: PathBuf,
        settings: ImageSettings,
    ) {
        let tx = self.tx.clone();
        debug!(row_id, field = %field, path = %path.display(), "Processing image in background");
        tokio::task::spawn_blocking(move || {
            let result = load_image(&path, &settings);
            let message = TaskMessage::ImageProcessed {
                row_id,
                field,
                result,
            };
            if tx.send(message).is_err() {
                warn!(row_id, "Image result dropped, receiver closed");
            }
        });
    }
}

/// Read and parse a CSV file, reporting failures as user-facing text.
///
/// Runs on the blocking pool, or inline when no spawner is available.
pub fn load_csv(path: &Path, has_header: bool) -> Result<CsvDocument, String> {
    csv::read_file(path)
        .and_then(|text| csv::parse_document(&text, has_header))
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Could not load CSV");
            AppError::from(e).user_message()
        })
}

/// Process an image file for a cell, reporting failures as user-facing text.
pub fn load_image(path: &Path, settings: &ImageSettings) -> Result<ProcessedImage, String> {
    imaging::process_file(path, settings).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Could not process image");
        AppError::from(e).user_message()
    })
}

/// Create a task channel and spawner.
///
/// The receiver is polled in the main loop.
pub fn create_task_channel() -> (mpsc::UnboundedReceiver<TaskMessage>, TaskSpawner) {
    let (tx, rx) = mpsc::unbounded_channel();
    (rx, TaskSpawner::new(tx))
}
