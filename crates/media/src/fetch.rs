use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use narrate_state::cancel::CancelToken;
use narrate_state::source::MediaLocator;
use tempfile::NamedTempFile;

use crate::error::{MediaError, MediaResult};

const DOWNLOAD_CHUNK: usize = 256 * 1024;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const SHARED_DOWNLOADS: usize = 4;

/// A resource that is fully available on local disk. Downloads live in a
/// temp file that is removed when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    locator: MediaLocator,
    path: PathBuf,
    byte_len: u64,
    _download: Option<Arc<NamedTempFile>>,
}

impl FetchedMedia {
    pub fn locator(&self) -> &MediaLocator {
        &self.locator
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }
}

pub trait MediaFetcher: Send {
    fn fetch(&self, locator: &MediaLocator, cancel: &CancelToken) -> MediaResult<FetchedMedia>;
}

pub struct DefaultFetcher {
    agent: ureq::Agent,
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(10))
                .timeout_read(DOWNLOAD_TIMEOUT)
                .build(),
        }
    }
}

impl MediaFetcher for DefaultFetcher {
    fn fetch(&self, locator: &MediaLocator, cancel: &CancelToken) -> MediaResult<FetchedMedia> {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        match locator {
            MediaLocator::File(path) => fetch_local(locator, path),
            MediaLocator::Url(url) => self.download(locator, url, cancel),
        }
    }
}

impl DefaultFetcher {
    fn download(
        &self,
        locator: &MediaLocator,
        url: &str,
        cancel: &CancelToken,
    ) -> MediaResult<FetchedMedia> {
        log::debug!("downloading {url}");
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => MediaError::fetch(locator, format!("HTTP {code}")),
            ureq::Error::Transport(t) => MediaError::fetch(locator, t.to_string()),
        })?;

        let mut file = tempfile::Builder::new()
            .prefix("narrate-")
            .tempfile()
            .map_err(|e| MediaError::fetch(locator, format!("temp file: {e}")))?;
        let byte_len = copy_cancellable(&mut response.into_reader(), file.as_file_mut(), cancel)
            .map_err(|e| match e {
                CopyError::Cancelled => MediaError::Cancelled,
                CopyError::Io(e) => MediaError::fetch(locator, e.to_string()),
            })?;
        if byte_len == 0 {
            return Err(MediaError::fetch(locator, "empty response body"));
        }

        log::debug!("downloaded {byte_len} bytes from {url}");
        Ok(FetchedMedia {
            locator: locator.clone(),
            path: file.path().to_path_buf(),
            byte_len,
            _download: Some(Arc::new(file)),
        })
    }
}

type DownloadSlot = Arc<Mutex<Option<FetchedMedia>>>;

/// Lets several workers share downloads. Local files go straight to the
/// inner fetcher; each URL is downloaded once and kept while it is among
/// the most recently requested.
pub struct SharedFetcher<F = DefaultFetcher> {
    inner: Arc<F>,
    downloads: Arc<Mutex<VecDeque<(String, DownloadSlot)>>>,
}

impl<F> Clone for SharedFetcher<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            downloads: Arc::clone(&self.downloads),
        }
    }
}

impl<F: Default> Default for SharedFetcher<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F> SharedFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner: Arc::new(inner),
            downloads: Arc::default(),
        }
    }

    fn slot(&self, url: &str) -> DownloadSlot {
        let mut downloads = self.downloads.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = downloads.iter().position(|(u, _)| u == url) {
            if let Some(entry) = downloads.remove(pos) {
                let slot = Arc::clone(&entry.1);
                downloads.push_back(entry);
                return slot;
            }
        }
        let slot = DownloadSlot::default();
        downloads.push_back((url.to_string(), Arc::clone(&slot)));
        while downloads.len() > SHARED_DOWNLOADS {
            downloads.pop_front();
        }
        slot
    }
}

impl<F: MediaFetcher + Sync> MediaFetcher for SharedFetcher<F> {
    fn fetch(&self, locator: &MediaLocator, cancel: &CancelToken) -> MediaResult<FetchedMedia> {
        let MediaLocator::Url(url) = locator else {
            return self.inner.fetch(locator, cancel);
        };
        let slot = self.slot(url);
        // Held across the download so a second request for the same URL
        // waits for the first instead of starting its own.
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(media) = entry.as_ref() {
            log::debug!("reusing download of {url}");
            return Ok(media.clone());
        }
        let media = self.inner.fetch(locator, cancel)?;
        *entry = Some(media.clone());
        Ok(media)
    }
}

fn fetch_local(locator: &MediaLocator, path: &Path) -> MediaResult<FetchedMedia> {
    let meta = std::fs::metadata(path).map_err(|e| MediaError::fetch(locator, e.to_string()))?;
    if !meta.is_file() {
        return Err(MediaError::fetch(locator, "not a regular file"));
    }
    if meta.len() == 0 {
        return Err(MediaError::fetch(locator, "file is empty"));
    }
    // Opening proves read permission before a decoder gets involved.
    File::open(path).map_err(|e| MediaError::fetch(locator, e.to_string()))?;
    Ok(FetchedMedia {
        locator: locator.clone(),
        path: path.to_path_buf(),
        byte_len: meta.len(),
        _download: None,
    })
}

enum CopyError {
    Cancelled,
    Io(std::io::Error),
}

fn copy_cancellable(
    reader: &mut dyn Read,
    writer: &mut File,
    cancel: &CancelToken,
) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; DOWNLOAD_CHUNK];
    let mut total = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(CopyError::Cancelled);
        }
        let n = reader.read(&mut buf).map_err(CopyError::Io)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).map_err(CopyError::Io)?;
        total += n as u64;
    }
    writer.flush().map_err(CopyError::Io)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl MediaFetcher for CountingFetcher {
        fn fetch(&self, locator: &MediaLocator, cancel: &CancelToken) -> MediaResult<FetchedMedia> {
            if cancel.is_cancelled() {
                return Err(MediaError::Cancelled);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(FetchedMedia {
                locator: locator.clone(),
                path: PathBuf::from(format!("/tmp/narrate-download-{n}")),
                byte_len: 1,
                _download: None,
            })
        }
    }

    fn url(n: usize) -> MediaLocator {
        MediaLocator::Url(format!("https://media.example/{n}.mp4"))
    }

    #[test]
    fn local_file_is_used_in_place() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RIFF....WAVE").unwrap();
        let locator = MediaLocator::File(file.path().to_path_buf());

        let fetched = DefaultFetcher::default()
            .fetch(&locator, &CancelToken::new())
            .unwrap();
        assert_eq!(fetched.path(), file.path());
        assert_eq!(fetched.byte_len(), 12);
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let locator = MediaLocator::File("/definitely/not/here.mp4".into());
        let err = DefaultFetcher::default()
            .fetch(&locator, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, MediaError::Fetch { .. }), "{err}");
    }

    #[test]
    fn empty_file_is_a_fetch_error() {
        let file = NamedTempFile::new().unwrap();
        let locator = MediaLocator::File(file.path().to_path_buf());
        let err = DefaultFetcher::default()
            .fetch(&locator, &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn cancelled_fetch_does_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let locator = MediaLocator::Url("http://127.0.0.1:9/never".into());
        let err = DefaultFetcher::default().fetch(&locator, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn copy_stops_when_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut reader: &[u8] = &[1, 2, 3];
        let mut out = tempfile::tempfile().unwrap();
        assert!(matches!(
            copy_cancellable(&mut reader, &mut out, &cancel),
            Err(CopyError::Cancelled)
        ));
    }

    #[test]
    fn workers_share_one_download_per_url() {
        let shared = SharedFetcher::new(CountingFetcher::default());
        let (a, b) = std::thread::scope(|scope| {
            let peaks = shared.clone();
            let thumbs = shared.clone();
            let a = scope.spawn(move || peaks.fetch(&url(1), &CancelToken::new()));
            let b = scope.spawn(move || thumbs.fetch(&url(1), &CancelToken::new()));
            (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
        });
        assert_eq!(a.path(), b.path());
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), 1);

        shared.fetch(&url(1), &CancelToken::new()).unwrap();
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn local_files_are_not_cached() {
        let shared = SharedFetcher::new(CountingFetcher::default());
        let local = MediaLocator::File("/media/v.mp4".into());
        shared.fetch(&local, &CancelToken::new()).unwrap();
        shared.fetch(&local, &CancelToken::new()).unwrap();
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancelled_download_is_not_remembered() {
        let shared = SharedFetcher::new(CountingFetcher::default());
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(shared.fetch(&url(1), &cancel).unwrap_err().is_cancelled());
        shared.fetch(&url(1), &CancelToken::new()).unwrap();
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn old_downloads_are_released() {
        let shared = SharedFetcher::new(CountingFetcher::default());
        for n in 0..=SHARED_DOWNLOADS {
            shared.fetch(&url(n), &CancelToken::new()).unwrap();
        }
        shared.fetch(&url(SHARED_DOWNLOADS), &CancelToken::new()).unwrap();
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), SHARED_DOWNLOADS + 1);
        shared.fetch(&url(0), &CancelToken::new()).unwrap();
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), SHARED_DOWNLOADS + 2);
    }
}
