//! Sound selection and playback fallback.
//!
//! [`resolve_sound_source`] picks a recording for an animal. The
//! [`AudioController`] owns the single "current sound", the mute flag and the
//! shared [`ToneGenerator`] that covers every playback failure.

mod tone;

use std::sync::{Arc, Mutex, MutexGuard};

pub use tone::{ToneBuffer, ToneGenerator};

use crate::catalogue::{Animal, Catalogue};
use crate::config::AudioConfig;
use crate::{ExplorerError, Result};

/// Recording to use for an animal: its own sound, else the first other
/// animal of the same category (catalogue order) that has one.
pub fn resolve_sound_source<'a>(animal: &'a Animal, catalogue: &'a Catalogue) -> Option<&'a str> {
    own_sound(animal).or_else(|| {
        catalogue
            .animals()
            .iter()
            .filter(|other| other.id != animal.id && other.category == animal.category)
            .find_map(own_sound)
    })
}

fn own_sound(animal: &Animal) -> Option<&str> {
    animal
        .sound
        .as_deref()
        .map(str::trim)
        .filter(|sound| !sound.is_empty())
}

/// Sound decision shown next to an animal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    Recording(String),
    /// No recording anywhere in the category; only the synthesized tone.
    Tone,
}

impl SoundSource {
    pub fn for_animal(animal: &Animal, catalogue: &Catalogue) -> Self {
        match resolve_sound_source(animal, catalogue) {
            Some(url) => Self::Recording(url.to_string()),
            None => Self::Tone,
        }
    }
}

/// Why a recording could not be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackFailure {
    Network,
    Decode,
    /// The platform refused to start playback without a user gesture.
    AutoplayBlocked,
}

/// Completion reported by the playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Started,
    Failed(PlaybackFailure),
}

/// What the caller should play for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundAction {
    Play { url: String, gain: f32 },
    Tone(ToneBuffer),
}

/// Result of [`AudioController::request`].
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    pub ticket: u64,
    /// Ticket of the sound that must be stopped before this one starts.
    pub halted: Option<u64>,
    pub action: SoundAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SoundKind {
    Recording,
    Tone,
}

#[derive(Debug)]
struct CurrentSound {
    ticket: u64,
    kind: SoundKind,
    fallback_issued: bool,
}

#[derive(Debug)]
struct AudioState {
    muted: bool,
    next_ticket: u64,
    current: Option<CurrentSound>,
    tone: ToneGenerator,
}

/// Session-wide audio context. Clones share the same state, so there is only
/// ever one current sound.
#[derive(Debug, Clone)]
pub struct AudioController {
    recording_gain: f32,
    state: Arc<Mutex<AudioState>>,
}

impl AudioController {
    pub fn new(config: &AudioConfig) -> Self {
        let state = AudioState {
            muted: config.start_muted,
            next_ticket: 1,
            current: None,
            tone: ToneGenerator::new(config.sample_rate, config.tone.clone()),
        };
        Self {
            recording_gain: config.recording_gain,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn is_muted(&self) -> Result<bool> {
        Ok(self.lock()?.muted)
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.lock()?.muted = muted;
        tracing::debug!(muted, "mute flag changed");
        Ok(())
    }

    /// Flips the mute flag and returns the new value.
    pub fn toggle_mute(&self) -> Result<bool> {
        let mut state = self.lock()?;
        state.muted = !state.muted;
        tracing::debug!(muted = state.muted, "mute flag changed");
        Ok(state.muted)
    }

    /// Gain applied to recordings right now.
    pub fn gain(&self) -> Result<f32> {
        let muted = self.lock()?.muted;
        Ok(if muted { 0.0 } else { self.recording_gain })
    }

    /// Starts a new sound for `animal`, superseding whatever was playing.
    pub fn request(&self, animal: &Animal, catalogue: &Catalogue) -> Result<SoundRequest> {
        let mut state = self.lock()?;
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        let halted = state.current.take().map(|current| current.ticket);

        let (kind, action) = match resolve_sound_source(animal, catalogue) {
            Some(url) => {
                let gain = if state.muted { 0.0 } else { self.recording_gain };
                (
                    SoundKind::Recording,
                    SoundAction::Play {
                        url: url.to_string(),
                        gain,
                    },
                )
            }
            None => {
                tracing::info!(animal = %animal.id, "no recording in category, using tone");
                let muted = state.muted;
                (SoundKind::Tone, SoundAction::Tone(state.tone.render(muted)))
            }
        };

        state.current = Some(CurrentSound {
            ticket,
            kind,
            fallback_issued: false,
        });
        tracing::debug!(animal = %animal.id, ticket, ?halted, "sound requested");

        Ok(SoundRequest {
            ticket,
            halted,
            action,
        })
    }

    /// Reports how playback for `ticket` went. A failure of the current
    /// recording yields the fallback tone, once; everything else (success,
    /// superseded tickets, repeated failures) yields `None`.
    pub fn on_playback_outcome(&self, ticket: u64, outcome: PlaybackOutcome) -> Result<Option<ToneBuffer>> {
        let PlaybackOutcome::Failed(failure) = outcome else {
            return Ok(None);
        };

        let mut state = self.lock()?;
        let muted = state.muted;
        let Some(current) = state.current.as_mut() else {
            return Ok(None);
        };
        if current.ticket != ticket || current.kind != SoundKind::Recording || current.fallback_issued {
            tracing::debug!(ticket, ?failure, "ignoring stale playback failure");
            return Ok(None);
        }

        current.fallback_issued = true;
        tracing::warn!(ticket, ?failure, "playback failed, falling back to tone");
        Ok(Some(state.tone.render(muted)))
    }

    /// Renders the fallback tone directly, honouring the mute flag.
    pub fn synthesize_tone(&self) -> Result<ToneBuffer> {
        let mut state = self.lock()?;
        let muted = state.muted;
        Ok(state.tone.render(muted))
    }

    /// Stops the current sound, returning its ticket.
    pub fn stop(&self) -> Result<Option<u64>> {
        Ok(self.lock()?.current.take().map(|current| current.ticket))
    }

    /// Ticket of the sound currently playing, if any.
    pub fn current_ticket(&self) -> Result<Option<u64>> {
        Ok(self.lock()?.current.as_ref().map(|current| current.ticket))
    }

    pub fn tone_contexts_created(&self) -> Result<usize> {
        Ok(self.lock()?.tone.contexts_created())
    }

    fn lock(&self) -> Result<MutexGuard<'_, AudioState>> {
        self.state
            .lock()
            .map_err(|_| ExplorerError::msg("audio state has been poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::tests::fixture;

    fn controller() -> AudioController {
        AudioController::new(&AudioConfig::default())
    }

    #[test]
    fn prefers_own_sound() {
        let catalogue = fixture();
        let owl = catalogue.find("owl").unwrap();
        assert_eq!(resolve_sound_source(owl, &catalogue), Some("sounds/owl.mp3"));
    }

    #[test]
    fn borrows_sibling_sound() {
        let catalogue = fixture();
        let eagle = catalogue.find("eagle").unwrap();
        assert_eq!(resolve_sound_source(eagle, &catalogue), Some("sounds/owl.mp3"));

        let wolf = catalogue.find("wolf").unwrap();
        assert_eq!(
            SoundSource::for_animal(wolf, &catalogue),
            SoundSource::Recording("sounds/lion.mp3".to_string())
        );
    }

    #[test]
    fn lonely_animal_has_no_source() {
        let catalogue = fixture();
        let gecko = catalogue.find("gecko").unwrap();
        assert_eq!(resolve_sound_source(gecko, &catalogue), None);
        assert_eq!(SoundSource::for_animal(gecko, &catalogue), SoundSource::Tone);
    }

    #[test]
    fn new_request_halts_previous() {
        let catalogue = fixture();
        let audio = controller();

        let first = audio.request(catalogue.find("owl").unwrap(), &catalogue).unwrap();
        assert_eq!(first.halted, None);
        let second = audio.request(catalogue.find("lion").unwrap(), &catalogue).unwrap();
        assert_eq!(second.halted, Some(first.ticket));
        assert_eq!(audio.current_ticket().unwrap(), Some(second.ticket));
        assert_eq!(
            second.action,
            SoundAction::Play {
                url: "sounds/lion.mp3".to_string(),
                gain: 1.0
            }
        );
    }

    #[test]
    fn failure_falls_back_to_tone_once() {
        let catalogue = fixture();
        let audio = controller();
        let request = audio.request(catalogue.find("owl").unwrap(), &catalogue).unwrap();

        assert_eq!(
            audio
                .on_playback_outcome(request.ticket, PlaybackOutcome::Started)
                .unwrap(),
            None
        );
        for failure in [PlaybackFailure::Network, PlaybackFailure::Decode] {
            let tone = audio
                .on_playback_outcome(request.ticket, PlaybackOutcome::Failed(failure))
                .unwrap();
            assert_eq!(tone.is_some(), failure == PlaybackFailure::Network);
        }
    }

    #[test]
    fn stale_failures_are_ignored() {
        let catalogue = fixture();
        let audio = controller();
        let first = audio.request(catalogue.find("owl").unwrap(), &catalogue).unwrap();
        audio.request(catalogue.find("lion").unwrap(), &catalogue).unwrap();

        let outcome = PlaybackOutcome::Failed(PlaybackFailure::AutoplayBlocked);
        assert_eq!(audio.on_playback_outcome(first.ticket, outcome).unwrap(), None);

        audio.stop().unwrap();
        assert_eq!(audio.on_playback_outcome(first.ticket + 1, outcome).unwrap(), None);
    }

    #[test]
    fn missing_source_plays_tone_immediately() {
        let catalogue = fixture();
        let audio = controller();
        let request = audio.request(catalogue.find("gecko").unwrap(), &catalogue).unwrap();

        match request.action {
            SoundAction::Tone(tone) => assert!(!tone.is_silent()),
            other => panic!("expected tone, got {other:?}"),
        }
        let outcome = PlaybackOutcome::Failed(PlaybackFailure::Decode);
        assert_eq!(audio.on_playback_outcome(request.ticket, outcome).unwrap(), None);
    }

    #[test]
    fn mute_zeroes_gain_but_still_plays() {
        let catalogue = fixture();
        let audio = controller();
        assert!(audio.toggle_mute().unwrap());
        assert_eq!(audio.gain().unwrap(), 0.0);

        let request = audio.request(catalogue.find("owl").unwrap(), &catalogue).unwrap();
        assert!(matches!(request.action, SoundAction::Play { gain, .. } if gain == 0.0));

        let tone = audio
            .on_playback_outcome(request.ticket, PlaybackOutcome::Failed(PlaybackFailure::Network))
            .unwrap()
            .expect("muted failures still produce a tone");
        assert!(tone.is_silent());
        assert!(!tone.samples.is_empty());

        audio.set_muted(false).unwrap();
        assert!(!audio.synthesize_tone().unwrap().is_silent());
    }

    #[test]
    fn clones_share_one_tone_context() {
        let catalogue = fixture();
        let audio = controller();
        let other = audio.clone();

        audio.synthesize_tone().unwrap();
        other.request(catalogue.find("gecko").unwrap(), &catalogue).unwrap();
        other.synthesize_tone().unwrap();

        assert_eq!(audio.tone_contexts_created().unwrap(), 1);
        assert_eq!(audio.current_ticket().unwrap(), other.current_ticket().unwrap());
    }
}
