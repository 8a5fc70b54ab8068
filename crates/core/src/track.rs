// Selectable track groups and track metadata

use crate::cell::{StateCell, Subscription};

/// Label attached to a track, e.g. "CHS" in language "zh"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackLabel {
    pub language: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtitleTrack {
    pub id: String,
    /// Identifier understood by the engine
    pub internal_id: String,
    pub language: Option<String>,
    pub labels: Vec<TrackLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioTrack {
    pub id: String,
    pub internal_id: String,
    pub name: Option<String>,
    pub labels: Vec<TrackLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub name: String,
    pub duration_millis: u64,
    pub offset_millis: u64,
}

/// A set of candidate tracks with at most one selected.
///
/// A selection must be a member of the candidates when it is made. Replacing
/// the candidates does not revalidate it, so the selection may dangle.
pub trait TrackGroup<T>: Send + Sync {
    fn selected(&self) -> Option<T>;

    fn candidates(&self) -> Vec<T>;

    /// Select `track`, or clear the selection with `None`.
    /// Returns `false` and keeps the selection when `track` is not a candidate.
    fn select(&self, track: Option<T>) -> bool;

    fn subscribe_selected(&self) -> Subscription<Option<T>>;

    fn subscribe_candidates(&self) -> Subscription<Vec<T>>;
}

/// Track group whose candidates are fed by the engine
pub struct MutableTrackGroup<T> {
    selected: StateCell<Option<T>>,
    candidates: StateCell<Vec<T>>,
}

impl<T> MutableTrackGroup<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(candidates: Vec<T>) -> Self {
        Self {
            selected: StateCell::new(None),
            candidates: StateCell::new(candidates),
        }
    }

    pub fn set_candidates(&self, candidates: Vec<T>) {
        self.candidates.set(candidates);
    }
}

impl<T> Default for MutableTrackGroup<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> TrackGroup<T> for MutableTrackGroup<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn selected(&self) -> Option<T> {
        self.selected.get()
    }

    fn candidates(&self) -> Vec<T> {
        self.candidates.get()
    }

    fn select(&self, track: Option<T>) -> bool {
        match track {
            None => {
                self.selected.set(None);
                true
            }
            Some(track) => {
                if !self.candidates.get().contains(&track) {
                    return false;
                }
                self.selected.set(Some(track));
                true
            }
        }
    }

    fn subscribe_selected(&self) -> Subscription<Option<T>> {
        self.selected.subscribe()
    }

    fn subscribe_candidates(&self) -> Subscription<Vec<T>> {
        self.candidates.subscribe()
    }
}

/// Group for engines without track support: nothing can be selected
pub struct EmptyTrackGroup<T> {
    selected: StateCell<Option<T>>,
    candidates: StateCell<Vec<T>>,
}

impl<T: Clone + Send + 'static> EmptyTrackGroup<T> {
    pub fn new() -> Self {
        Self {
            selected: StateCell::new(None),
            candidates: StateCell::new(Vec::new()),
        }
    }
}

impl<T: Clone + Send + 'static> Default for EmptyTrackGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> TrackGroup<T> for EmptyTrackGroup<T> {
    fn selected(&self) -> Option<T> {
        None
    }

    fn candidates(&self) -> Vec<T> {
        Vec::new()
    }

    fn select(&self, track: Option<T>) -> bool {
        track.is_none()
    }

    fn subscribe_selected(&self) -> Subscription<Option<T>> {
        self.selected.subscribe()
    }

    fn subscribe_candidates(&self) -> Subscription<Vec<T>> {
        self.candidates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtitle(id: &str) -> SubtitleTrack {
        SubtitleTrack {
            id: id.to_string(),
            internal_id: format!("engine-{}", id),
            language: Some("en".to_string()),
            labels: vec![TrackLabel {
                language: Some("en".to_string()),
                value: id.to_uppercase(),
            }],
        }
    }

    #[test]
    fn test_select_requires_membership() {
        let group = MutableTrackGroup::new(vec![subtitle("a"), subtitle("b")]);
        assert!(group.select(Some(subtitle("a"))));
        assert_eq!(group.selected(), Some(subtitle("a")));

        assert!(!group.select(Some(subtitle("z"))));
        assert_eq!(group.selected(), Some(subtitle("a")));
    }

    #[test]
    fn test_deselect_always_succeeds() {
        let group: MutableTrackGroup<SubtitleTrack> = MutableTrackGroup::default();
        assert!(group.select(None));
        assert_eq!(group.selected(), None);

        let empty: EmptyTrackGroup<SubtitleTrack> = EmptyTrackGroup::new();
        assert!(empty.select(None));
        assert!(!empty.select(Some(subtitle("a"))));
    }

    #[test]
    fn test_replacing_candidates_keeps_dangling_selection() {
        let group = MutableTrackGroup::new(vec![subtitle("a")]);
        assert!(group.select(Some(subtitle("a"))));

        group.set_candidates(vec![subtitle("b")]);
        assert_eq!(group.selected(), Some(subtitle("a")));
        assert!(!group.candidates().contains(&subtitle("a")));
    }

    #[test]
    fn test_selection_is_observable() {
        let group = MutableTrackGroup::new(vec![subtitle("a")]);
        let stream = group.subscribe_selected();
        assert_eq!(stream.try_recv(), Some(None));
        group.select(Some(subtitle("a")));
        assert_eq!(stream.try_recv(), Some(Some(subtitle("a"))));
    }
}
