use std::sync::mpsc;

use narrate_media::{decoder_for, MediaError, PeakExtractor, PeakOutcome, SharedFetcher};
use narrate_state::cancel::GenerationId;
use narrate_state::config::DecoderBackend;
use narrate_state::controller::PeakRequest;
use narrate_state::track::TrackKind;

pub struct PeakResult {
    pub track: TrackKind,
    pub generation: GenerationId,
    pub outcome: Result<PeakOutcome, MediaError>,
}

pub struct PeakWorkerChannels {
    pub req_tx: mpsc::Sender<PeakRequest>,
    pub result_rx: mpsc::Receiver<PeakResult>,
}

/// One thread serving both audio lanes in request order. Requests whose
/// token was cancelled while queued are skipped, and cancelled runs send
/// nothing back.
pub fn spawn_peak_worker(backend: DecoderBackend, fetcher: SharedFetcher) -> PeakWorkerChannels {
    let (req_tx, req_rx) = mpsc::channel::<PeakRequest>();
    let (result_tx, result_rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("peak-worker".into())
        .spawn(move || {
            let mut extractor = PeakExtractor::new(fetcher, decoder_for(backend));
            while let Ok(req) = req_rx.recv() {
                if req.cancel.is_cancelled() {
                    continue;
                }
                let outcome = extractor.extract(&req.source.locator, req.peak_count, &req.cancel);
                if matches!(outcome, Err(MediaError::Cancelled)) || req.cancel.is_cancelled() {
                    log::debug!("peaks for {:?} abandoned", req.track);
                    continue;
                }
                let result = PeakResult {
                    track: req.track,
                    generation: req.generation,
                    outcome,
                };
                if result_tx.send(result).is_err() {
                    return;
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| log::error!("failed to spawn peak worker: {e}"));

    PeakWorkerChannels { req_tx, result_rx }
}
