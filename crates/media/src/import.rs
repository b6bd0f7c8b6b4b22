use std::path::Path;

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "webm", "m4v", "ts", "mts", "m2ts", "flv", "wmv", "mpg", "mpeg",
    "3gp", "ogv",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "aac", "flac", "ogg", "m4a", "wma", "aiff", "aif", "opus",
];

pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Audio description tracks may also be delivered muxed in a container.
pub fn is_ad_audio_extension(ext: &str) -> bool {
    let lower = ext.to_lowercase();
    AUDIO_EXTENSIONS.contains(&lower.as_str()) || VIDEO_EXTENSIONS.contains(&lower.as_str())
}

pub fn has_extension(path: &Path, pred: fn(&str) -> bool) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(pred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_checks_are_case_insensitive() {
        assert!(has_extension(Path::new("/tmp/Clip.MP4"), is_video_extension));
        assert!(!has_extension(Path::new("/tmp/ad.wav"), is_video_extension));
        assert!(has_extension(Path::new("/tmp/ad.WAV"), is_ad_audio_extension));
        assert!(!has_extension(Path::new("/tmp/notes"), is_ad_audio_extension));
    }
}
