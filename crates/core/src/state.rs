// Playback state and the transition rules every backend obeys

use std::fmt;

/// Player state.
///
/// Variants are declared in ascending order and the derived `Ord` follows
/// that order, so guards such as `state >= PlaybackState::Ready` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaybackState {
    /// Player is closed and every resource is released. Terminal.
    Destroyed,
    /// The last open or the engine failed. A new media can recover from here.
    Error,
    /// Initial state, no media set yet
    Created,
    /// Playback stopped or reached the end of the stream
    Finished,
    /// Media is opened and the engine can start at any time
    Ready,
    /// Paused by the user
    Paused,
    /// Playing
    Playing,
    /// Playing, but stalled waiting for data
    Buffering,
}

impl PlaybackState {
    pub const ALL: [PlaybackState; 8] = [
        PlaybackState::Destroyed,
        PlaybackState::Error,
        PlaybackState::Created,
        PlaybackState::Finished,
        PlaybackState::Ready,
        PlaybackState::Paused,
        PlaybackState::Playing,
        PlaybackState::Buffering,
    ];

    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }

    /// The engine is driving a resource (paused, playing or buffering)
    pub fn is_playback_running(self) -> bool {
        self >= PlaybackState::Paused
    }

    pub fn is_terminal(self) -> bool {
        self == PlaybackState::Destroyed
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PlaybackState::Destroyed => "DESTROYED",
            PlaybackState::Error => "ERROR",
            PlaybackState::Created => "CREATED",
            PlaybackState::Finished => "FINISHED",
            PlaybackState::Ready => "READY",
            PlaybackState::Paused => "PAUSED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Buffering => "BUFFERING",
        };
        f.write_str(name)
    }
}

/// Commands accepted by the player facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SetMediaData,
    Resume,
    Pause,
    StopPlayback,
    Seek,
    Close,
}

impl Command {
    /// Whether the command has an effect when issued in `state`.
    /// Commands outside their legal states are silently ignored by the player.
    pub fn is_legal_from(self, state: PlaybackState) -> bool {
        use PlaybackState::*;
        match self {
            Command::SetMediaData | Command::Close => state != Destroyed,
            Command::Resume => matches!(state, Ready | Paused),
            Command::Pause => state > Paused,
            Command::StopPlayback | Command::Seek => state >= Ready,
        }
    }

    /// State published once the command completes successfully
    pub fn target_state(self, from: PlaybackState) -> PlaybackState {
        use PlaybackState::*;
        match self {
            Command::SetMediaData => Ready,
            Command::Resume => Playing,
            Command::Pause => Paused,
            Command::StopPlayback => Finished,
            Command::Seek => from,
            Command::Close => Destroyed,
        }
    }
}

/// Every edge an observer may see on the state stream.
///
/// Covers command edges plus the edges the engine can drive on its own:
/// errors, end of stream, and stalls while playing.
pub fn is_valid_transition(from: PlaybackState, to: PlaybackState) -> bool {
    use PlaybackState::*;

    if from == to {
        return true;
    }

    match (from, to) {
        (Destroyed, _) => false,
        (_, Destroyed) => true,

        // setMediaData from any live state, including a failed open
        (_, Ready) | (_, Error) => true,

        (Ready | Paused, Playing) => true,
        (Playing | Buffering, Paused) => true,
        (f, Finished) => f >= Ready,

        (Playing, Buffering) | (Buffering, Playing) => true,

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaybackState::*;

    #[test]
    fn test_state_ordering() {
        assert!(Destroyed < Error);
        assert!(Error < Created);
        assert!(Created < Finished);
        assert!(Finished < Ready);
        assert!(Ready < Paused);
        assert!(Paused < Playing);
        assert!(Playing < Buffering);

        let mut sorted = PlaybackState::ALL;
        sorted.sort();
        assert_eq!(sorted, PlaybackState::ALL);
    }

    #[test]
    fn test_command_legality_table() {
        for state in PlaybackState::ALL {
            assert_eq!(Command::SetMediaData.is_legal_from(state), state != Destroyed);
            assert_eq!(Command::Close.is_legal_from(state), state != Destroyed);
            assert_eq!(
                Command::Resume.is_legal_from(state),
                state == Ready || state == Paused
            );
            assert_eq!(
                Command::Pause.is_legal_from(state),
                state == Playing || state == Buffering
            );
            assert_eq!(Command::StopPlayback.is_legal_from(state), state >= Ready);
            assert_eq!(Command::Seek.is_legal_from(state), state >= Ready);
        }
    }

    #[test]
    fn test_command_edges_are_valid_transitions() {
        let commands = [
            Command::SetMediaData,
            Command::Resume,
            Command::Pause,
            Command::StopPlayback,
            Command::Seek,
            Command::Close,
        ];
        for state in PlaybackState::ALL {
            for command in commands {
                if command.is_legal_from(state) {
                    let to = command.target_state(state);
                    assert!(
                        is_valid_transition(state, to),
                        "{:?} from {} to {} should be valid",
                        command,
                        state,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn test_destroyed_is_terminal() {
        for to in PlaybackState::ALL {
            if to != Destroyed {
                assert!(!is_valid_transition(Destroyed, to));
            }
        }
        assert!(Destroyed.is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!is_valid_transition(Created, Playing));
        assert!(!is_valid_transition(Finished, Playing));
        assert!(!is_valid_transition(Created, Finished));
        assert!(!is_valid_transition(Ready, Buffering));
        assert!(!is_valid_transition(Playing, Created));
    }

    #[test]
    fn test_playback_running() {
        assert!(!Ready.is_playback_running());
        assert!(Paused.is_playback_running());
        assert!(Buffering.is_playback_running());
        assert!(Playing.is_playing());
        assert!(!Buffering.is_playing());
    }
}
