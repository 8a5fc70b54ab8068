// Track and chapter metadata exposed by the dummy engine

use mediaplay_core::features::MediaMetadata;
use mediaplay_core::media::MediaExtraFiles;
use mediaplay_core::track::{
    AudioTrack, Chapter, MutableTrackGroup, SubtitleTrack, TrackGroup, TrackLabel,
};
use std::sync::Arc;

const OPENING_MILLIS: u64 = 90_000;

pub struct DummyMetadata {
    pub(crate) audio: Arc<MutableTrackGroup<AudioTrack>>,
    pub(crate) subtitles: Arc<MutableTrackGroup<SubtitleTrack>>,
    chapters: Vec<Chapter>,
}

impl DummyMetadata {
    pub fn new(duration_millis: Option<u64>) -> Self {
        let duration = duration_millis.unwrap_or(0);
        Self {
            audio: Arc::new(MutableTrackGroup::new(vec![default_audio_track()])),
            subtitles: Arc::new(MutableTrackGroup::default()),
            chapters: vec![
                Chapter {
                    name: "Opening".to_string(),
                    duration_millis: OPENING_MILLIS.min(duration),
                    offset_millis: 0,
                },
                Chapter {
                    name: "Main".to_string(),
                    duration_millis: duration.saturating_sub(OPENING_MILLIS),
                    offset_millis: OPENING_MILLIS.min(duration),
                },
            ],
        }
    }

    /// Refresh subtitle candidates from the files shipped with the media
    pub(crate) fn load(&self, extra_files: &MediaExtraFiles) {
        let tracks = extra_files
            .subtitles
            .iter()
            .enumerate()
            .map(|(index, subtitle)| SubtitleTrack {
                id: format!("external-{}", index),
                internal_id: subtitle.uri.clone(),
                language: subtitle.language.clone(),
                labels: subtitle
                    .label
                    .iter()
                    .map(|label| TrackLabel {
                        language: subtitle.language.clone(),
                        value: label.clone(),
                    })
                    .collect(),
            })
            .collect();
        self.subtitles.set_candidates(tracks);
    }

    pub(crate) fn unload(&self) {
        self.subtitles.select(None);
        self.subtitles.set_candidates(Vec::new());
    }
}

impl MediaMetadata for DummyMetadata {
    fn audio_tracks(&self) -> Option<Arc<dyn TrackGroup<AudioTrack>>> {
        Some(self.audio.clone())
    }

    fn subtitle_tracks(&self) -> Option<Arc<dyn TrackGroup<SubtitleTrack>>> {
        Some(self.subtitles.clone())
    }

    fn chapters(&self) -> Option<Vec<Chapter>> {
        Some(self.chapters.clone())
    }
}

fn default_audio_track() -> AudioTrack {
    AudioTrack {
        id: "main".to_string(),
        internal_id: "0".to_string(),
        name: Some("Main".to_string()),
        labels: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaplay_core::media::Subtitle;

    #[test]
    fn test_chapters_cover_duration() {
        let metadata = DummyMetadata::new(Some(300_000));
        let chapters = metadata.chapters().unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].offset_millis, 90_000);
        let total: u64 = chapters.iter().map(|c| c.duration_millis).sum();
        assert_eq!(total, 300_000);
    }

    #[test]
    fn test_load_builds_subtitle_candidates() {
        let metadata = DummyMetadata::new(None);
        metadata.load(&MediaExtraFiles {
            subtitles: vec![Subtitle {
                uri: "file:///a.ass".to_string(),
                language: Some("ja".to_string()),
                mime_type: None,
                label: Some("JP".to_string()),
            }],
        });

        let group = metadata.subtitle_tracks().unwrap();
        let candidates = group.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].labels[0].value, "JP");
        assert!(group.select(Some(candidates[0].clone())));

        metadata.unload();
        assert_eq!(group.selected(), None);
        assert!(group.candidates().is_empty());
    }
}
