use std::sync::mpsc;

use narrate_media::{GstFrameGrabber, MediaError, MediaFetcher, SharedFetcher, ThumbnailSampler};
use narrate_state::cancel::GenerationId;
use narrate_state::controller::ThumbnailRequest;
use narrate_state::filmstrip::ThumbnailSlot;

pub enum ThumbnailEvent {
    Slot(GenerationId, ThumbnailSlot),
    Finished(GenerationId, Option<String>),
}

pub struct ThumbnailWorkerChannels {
    pub req_tx: mpsc::Sender<ThumbnailRequest>,
    pub event_rx: mpsc::Receiver<ThumbnailEvent>,
}

/// Keeps only the newest pending request; anything older was superseded
/// (and cancelled) by the controller before it got here.
fn newest(first: ThumbnailRequest, rx: &mpsc::Receiver<ThumbnailRequest>) -> ThumbnailRequest {
    let mut req = first;
    while let Ok(next) = rx.try_recv() {
        req = next;
    }
    req
}

pub fn spawn_thumbnail_worker(fetcher: SharedFetcher) -> ThumbnailWorkerChannels {
    let (req_tx, req_rx) = mpsc::channel::<ThumbnailRequest>();
    let (event_tx, event_rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("thumbnail-worker".into())
        .spawn(move || {
            while let Ok(first) = req_rx.recv() {
                let req = newest(first, &req_rx);
                if req.cancel.is_cancelled() {
                    continue;
                }
                let generation = req.generation;
                let error = match run(&fetcher, &req, &event_tx) {
                    Ok(count) => {
                        log::info!("filmstrip generation {} complete ({count} slots)", generation.0);
                        None
                    }
                    Err(MediaError::Cancelled) => continue,
                    Err(e) => {
                        log::warn!("{e}");
                        Some(e.to_string())
                    }
                };
                if event_tx.send(ThumbnailEvent::Finished(generation, error)).is_err() {
                    return;
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| log::error!("failed to spawn thumbnail worker: {e}"));

    ThumbnailWorkerChannels { req_tx, event_rx }
}

fn run(
    fetcher: &SharedFetcher,
    req: &ThumbnailRequest,
    event_tx: &mpsc::Sender<ThumbnailEvent>,
) -> Result<usize, MediaError> {
    let media = fetcher.fetch(&req.source.locator, &req.cancel)?;
    if req.cancel.is_cancelled() {
        return Err(MediaError::Cancelled);
    }

    let sampler = ThumbnailSampler::new(req.plan, req.cell, req.dpr);
    let (_, capture_h) = sampler.pixel_size();
    let mut grabber = GstFrameGrabber::open(media.path(), capture_h)
        .map_err(|reason| MediaError::Thumbnail { slot_index: 0, reason })?;

    let generation = req.generation;
    sampler.run(&mut grabber, &req.cancel, |slot| {
        let _ = event_tx.send(ThumbnailEvent::Slot(generation, slot));
    })
}
