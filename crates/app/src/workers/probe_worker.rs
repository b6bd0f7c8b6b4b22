use std::sync::mpsc;

use narrate_media::metadata::{probe, MediaMetadata};
use narrate_media::MediaError;
use narrate_state::source::{MediaLocator, SourceId};

pub struct ProbeResult {
    pub source: SourceId,
    pub outcome: Result<MediaMetadata, MediaError>,
}

/// Probes one source on a short-lived thread; the result is tagged with the
/// source id so a probe for a replaced source can be ignored.
pub fn spawn_probe(source: SourceId, locator: MediaLocator, tx: mpsc::Sender<ProbeResult>) {
    let spawned = std::thread::Builder::new()
        .name("probe".into())
        .spawn(move || {
            let outcome = probe(&locator);
            let _ = tx.send(ProbeResult { source, outcome });
        });
    if let Err(e) = spawned {
        log::error!("failed to spawn probe thread: {e}");
    }
}
