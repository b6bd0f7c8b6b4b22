use crate::filmstrip::Filmstrip;
use crate::peaks::PeakSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    OriginalAudio,
    AdAudio,
    VideoThumbnails,
}

impl TrackKind {
    pub const ALL: [TrackKind; 3] = [
        TrackKind::OriginalAudio,
        TrackKind::AdAudio,
        TrackKind::VideoThumbnails,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TrackKind::OriginalAudio => "Audio",
            TrackKind::AdAudio => "AD",
            TrackKind::VideoThumbnails => "Video",
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(self, TrackKind::OriginalAudio | TrackKind::AdAudio)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackStatus {
    #[default]
    Empty,
    Loading,
    Ready,
    Warning(String),
    Failed(String),
}

impl TrackStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, TrackStatus::Loading)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TrackStatus::Warning(m) | TrackStatus::Failed(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TrackContent {
    Peaks(Option<PeakSequence>),
    Slots(Filmstrip),
}

#[derive(Debug, Clone)]
pub struct Track {
    pub kind: TrackKind,
    pub height: f32,
    pub status: TrackStatus,
    pub content: TrackContent,
}

impl Track {
    pub fn new(kind: TrackKind, height: f32) -> Self {
        Self {
            kind,
            height,
            status: TrackStatus::Empty,
            content: Self::empty_content(kind),
        }
    }

    fn empty_content(kind: TrackKind) -> TrackContent {
        if kind.is_audio() {
            TrackContent::Peaks(None)
        } else {
            TrackContent::Slots(Filmstrip::default())
        }
    }

    pub fn clear(&mut self) {
        self.content = Self::empty_content(self.kind);
    }

    pub fn peaks(&self) -> Option<&PeakSequence> {
        match &self.content {
            TrackContent::Peaks(p) => p.as_ref(),
            TrackContent::Slots(_) => None,
        }
    }

    pub fn filmstrip(&self) -> Option<&Filmstrip> {
        match &self.content {
            TrackContent::Slots(f) => Some(f),
            TrackContent::Peaks(_) => None,
        }
    }
}

pub fn default_tracks(height: f32) -> Vec<Track> {
    TrackKind::ALL
        .iter()
        .map(|&kind| Track::new(kind, height))
        .collect()
}
