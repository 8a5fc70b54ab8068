// Media payloads handed to the player and the properties engines report back

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek};
use std::sync::Arc;

/// External subtitle file shipped next to the media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub uri: String,
    pub language: Option<String>,
    pub mime_type: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaExtraFiles {
    pub subtitles: Vec<Subtitle>,
}

impl MediaExtraFiles {
    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }
}

/// Media addressed by URI, with optional request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriMediaData {
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub extra_files: MediaExtraFiles,
    /// Engine-specific raw options; engines may ignore them
    pub options: Vec<String>,
}

impl UriMediaData {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: Subtitle) -> Self {
        self.extra_files.subtitles.push(subtitle);
        self
    }
}

/// Byte source that supports random access
pub trait SeekableInput: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableInput for T {}

/// Media read through a seekable byte source (e.g. a file being downloaded)
pub trait SeekableInputMediaData: Send + Sync {
    fn uri(&self) -> &str;

    /// Length in bytes, if known
    fn file_length(&self) -> std::io::Result<Option<u64>>;

    /// Open a new input. The previous input must be dropped before the next
    /// one is created.
    fn create_input(&self) -> std::io::Result<Box<dyn SeekableInput>>;

    fn extra_files(&self) -> &MediaExtraFiles;

    /// Free underlying resources. Must be idempotent.
    fn close(&self);
}

/// What to play. The set of variants is closed; engines match on it.
#[derive(Clone)]
pub enum MediaData {
    Uri(UriMediaData),
    SeekableInput(Arc<dyn SeekableInputMediaData>),
}

impl MediaData {
    pub fn uri(&self) -> &str {
        match self {
            MediaData::Uri(data) => &data.uri,
            MediaData::SeekableInput(data) => data.uri(),
        }
    }

    pub fn extra_files(&self) -> &MediaExtraFiles {
        match self {
            MediaData::Uri(data) => &data.extra_files,
            MediaData::SeekableInput(data) => data.extra_files(),
        }
    }

    /// Close the underlying input, if any; idempotent
    pub fn close(&self) {
        if let MediaData::SeekableInput(data) = self {
            data.close();
        }
    }
}

impl From<UriMediaData> for MediaData {
    fn from(data: UriMediaData) -> Self {
        MediaData::Uri(data)
    }
}

impl fmt::Debug for MediaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaData::Uri(data) => f.debug_tuple("Uri").field(&data.uri).finish(),
            MediaData::SeekableInput(data) => {
                f.debug_tuple("SeekableInput").field(&data.uri()).finish()
            }
        }
    }
}

/// Properties of the media being played, as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaProperties {
    pub title: Option<String>,
    /// `None` while the duration is unknown
    pub duration_millis: Option<u64>,
}

impl MediaProperties {
    pub const EMPTY: MediaProperties = MediaProperties {
        title: None,
        duration_millis: None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct InMemory {
        bytes: Vec<u8>,
        extra: MediaExtraFiles,
        closes: AtomicUsize,
    }

    impl SeekableInputMediaData for InMemory {
        fn uri(&self) -> &str {
            "memory://clip"
        }

        fn file_length(&self) -> std::io::Result<Option<u64>> {
            Ok(Some(self.bytes.len() as u64))
        }

        fn create_input(&self) -> std::io::Result<Box<dyn SeekableInput>> {
            Ok(Box::new(Cursor::new(self.bytes.clone())))
        }

        fn extra_files(&self) -> &MediaExtraFiles {
            &self.extra
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_uri_media_data_builder() {
        let data = UriMediaData::new("https://example.com/a.mkv")
            .with_header("Referer", "https://example.com")
            .with_subtitle(Subtitle {
                uri: "https://example.com/a.ass".to_string(),
                language: Some("ja".to_string()),
                mime_type: None,
                label: None,
            });
        let media: MediaData = data.into();
        assert_eq!(media.uri(), "https://example.com/a.mkv");
        assert_eq!(media.extra_files().subtitles.len(), 1);
        media.close();
    }

    #[test]
    fn test_seekable_input_close_is_forwarded() {
        let input = Arc::new(InMemory {
            bytes: vec![1, 2, 3, 4],
            extra: MediaExtraFiles::default(),
            closes: AtomicUsize::new(0),
        });
        let media = MediaData::SeekableInput(input.clone());
        assert_eq!(media.uri(), "memory://clip");

        let mut reader = input.create_input().unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4]);

        media.close();
        assert_eq!(input.closes.load(Ordering::SeqCst), 1);
        assert!(media.extra_files().is_empty());
    }
}
