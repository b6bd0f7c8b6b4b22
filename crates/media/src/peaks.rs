use narrate_state::cancel::CancelToken;
use narrate_state::peaks::{bucket_peaks, placeholder_peaks, truncated_samples, PeakSample};
use narrate_state::source::MediaLocator;

use crate::decode::PcmDecoder;
use crate::error::{MediaError, MediaResult};
use crate::fetch::MediaFetcher;

#[derive(Debug, Clone)]
pub struct PeakOutcome {
    pub peaks: Vec<PeakSample>,
    pub warning: Option<String>,
}

pub struct PeakExtractor<F, D> {
    fetcher: F,
    decoder: D,
}

impl<F: MediaFetcher, D: PcmDecoder> PeakExtractor<F, D> {
    pub fn new(fetcher: F, decoder: D) -> Self {
        Self { fetcher, decoder }
    }

    pub fn extract(
        &mut self,
        locator: &MediaLocator,
        count: usize,
        cancel: &CancelToken,
    ) -> MediaResult<PeakOutcome> {
        let media = self.fetcher.fetch(locator, cancel)?;
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let pcm = match self.decoder.decode_reference_channel(&media, cancel) {
            Ok(pcm) => pcm,
            Err(MediaError::Cancelled) => return Err(MediaError::Cancelled),
            Err(e) => {
                log::warn!("{e}; showing placeholder waveform");
                return Ok(PeakOutcome {
                    peaks: placeholder_peaks(count),
                    warning: Some(e.to_string()),
                });
            }
        };

        let dropped = truncated_samples(pcm.samples.len(), count);
        if dropped > 0 {
            log::trace!("{dropped} trailing samples of {locator} fall outside the last bucket");
        }
        Ok(PeakOutcome {
            peaks: bucket_peaks(&pcm.samples, count),
            warning: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodedPcm;
    use crate::fetch::FetchedMedia;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Serves one real temp file for every locator.
    struct LocalFixture(NamedTempFile);

    impl LocalFixture {
        fn new() -> Self {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(b"not really audio").unwrap();
            Self(file)
        }
    }

    impl MediaFetcher for LocalFixture {
        fn fetch(&self, _: &MediaLocator, cancel: &CancelToken) -> MediaResult<FetchedMedia> {
            let local = MediaLocator::File(self.0.path().to_path_buf());
            crate::fetch::DefaultFetcher::default().fetch(&local, cancel)
        }
    }

    struct FailingFetcher;

    impl MediaFetcher for FailingFetcher {
        fn fetch(&self, locator: &MediaLocator, _: &CancelToken) -> MediaResult<FetchedMedia> {
            Err(MediaError::fetch(locator, "HTTP 404"))
        }
    }

    struct ToneDecoder {
        rate: u32,
        seconds: u32,
    }

    impl PcmDecoder for ToneDecoder {
        fn decode_reference_channel(
            &mut self,
            _: &FetchedMedia,
            _: &CancelToken,
        ) -> MediaResult<DecodedPcm> {
            let len = (self.rate * self.seconds) as usize;
            Ok(DecodedPcm {
                samples: (0..len).map(|i| ((i as f32) * 0.02).sin() * 0.8).collect(),
                sample_rate: self.rate,
                channels: 1,
            })
        }
    }

    struct BrokenDecoder;

    impl PcmDecoder for BrokenDecoder {
        fn decode_reference_channel(
            &mut self,
            media: &FetchedMedia,
            _: &CancelToken,
        ) -> MediaResult<DecodedPcm> {
            Err(MediaError::decode(media.locator(), "unsupported codec"))
        }
    }

    fn locator() -> MediaLocator {
        MediaLocator::parse("https://cdn.example.com/clip.mp4")
    }

    #[test]
    fn decoded_audio_yields_requested_count() {
        for rate in [44_100, 16_000] {
            let mut extractor =
                PeakExtractor::new(LocalFixture::new(), ToneDecoder { rate, seconds: 120 });
            let out = extractor.extract(&locator(), 2000, &CancelToken::new()).unwrap();
            assert_eq!(out.peaks.len(), 2000);
            assert!(out.warning.is_none());
            assert!(out.peaks.iter().any(|p| p.max > 0.5));
        }
    }

    #[test]
    fn decode_failure_yields_placeholder_of_same_length() {
        let mut extractor = PeakExtractor::new(LocalFixture::new(), BrokenDecoder);
        let out = extractor.extract(&locator(), 2000, &CancelToken::new()).unwrap();
        assert_eq!(out.peaks.len(), 2000);
        assert!(out.peaks.iter().all(|p| p.max > 0.0 && p.min < 0.0));
        assert!(out.warning.unwrap().contains("unsupported codec"));
    }

    #[test]
    fn fetch_failure_is_an_error() {
        let mut extractor =
            PeakExtractor::new(FailingFetcher, ToneDecoder { rate: 8000, seconds: 1 });
        let err = extractor
            .extract(&locator(), 100, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, MediaError::Fetch { .. }));
    }

    #[test]
    fn cancelled_extraction_produces_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut extractor =
            PeakExtractor::new(LocalFixture::new(), ToneDecoder { rate: 8000, seconds: 1 });
        assert!(extractor.extract(&locator(), 100, &cancel).unwrap_err().is_cancelled());
    }
}
