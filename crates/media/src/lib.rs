pub mod decode;
pub mod error;
pub mod fetch;
pub mod frame_grabber;
pub mod gst_init;
pub mod import;
pub mod metadata;
pub mod peaks;
pub mod thumbnails;

pub use decode::{decoder_for, DecodedPcm, FfmpegPcmDecoder, GstPcmDecoder, PcmDecoder};
pub use error::{MediaError, MediaResult};
pub use fetch::{DefaultFetcher, FetchedMedia, MediaFetcher, SharedFetcher};
pub use frame_grabber::{FrameGrabber, GstFrameGrabber};
pub use peaks::{PeakExtractor, PeakOutcome};
pub use thumbnails::ThumbnailSampler;
