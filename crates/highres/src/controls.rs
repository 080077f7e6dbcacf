//! Keyboard trigger surface.
//!
//! `+` arms color captures and `-` arms depth captures. While armed, a digit
//! key captures at that scale factor (clamped to what the GPU allows, `0`
//! meaning the current viewport size) and `Escape` disarms. `Escape` reports an
//! exit to the observer even when the surface was not armed. Every finished
//! capture disarms the surface again. Keys pressed while a capture is in
//! flight are ignored.

use std::cell::Cell;

use highres_core::{
    CaptureMode, CaptureObserver, CaptureRenderer, CaptureRequest, CaptureSession, EncodedImage,
    ImageSink,
};

use crate::error::Result;

/// A key the trigger surface reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKey {
    /// `0` through `9`.
    Digit(u8),
    Plus,
    Minus,
    Escape,
}

impl TriggerKey {
    /// Maps a key name to a trigger key. Accepts single characters and `"Escape"`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "+" | "=" => Some(Self::Plus),
            "-" | "_" => Some(Self::Minus),
            "Escape" | "Esc" => Some(Self::Escape),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c.to_digit(10).map(|d| Self::Digit(d as u8)),
                    _ => None,
                }
            }
        }
    }
}

/// Result of handling one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key had no effect.
    Ignored,
    /// The surface was armed in this mode.
    Activated(CaptureMode),
    /// The surface was disarmed without capturing.
    Deactivated,
    /// A capture finished.
    Captured(EncodedImage),
}

/// Armed/disarmed state of the trigger surface.
#[derive(Debug, Default)]
pub struct CaptureControls {
    mode: Cell<Option<CaptureMode>>,
}

impl CaptureControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode the surface is armed in, if any.
    pub fn mode(&self) -> Option<CaptureMode> {
        self.mode.get()
    }

    pub fn is_active(&self) -> bool {
        self.mode.get().is_some()
    }

    pub fn activate(&self, mode: CaptureMode) {
        self.mode.set(Some(mode));
    }

    /// Disarms the surface. Returns whether it was armed.
    pub fn deactivate(&self) -> bool {
        self.mode.take().is_some()
    }
}

/// A capture session driven by keyboard triggers.
pub struct Highres<R: CaptureRenderer, S, O = ()> {
    session: CaptureSession<R, S, O>,
    controls: CaptureControls,
}

impl<R, S, O> Highres<R, S, O>
where
    R: CaptureRenderer,
    S: ImageSink,
    O: CaptureObserver,
{
    pub fn new(session: CaptureSession<R, S, O>) -> Self {
        Self {
            session,
            controls: CaptureControls::new(),
        }
    }

    pub fn session(&self) -> &CaptureSession<R, S, O> {
        &self.session
    }

    pub fn controls(&self) -> &CaptureControls {
        &self.controls
    }

    /// Reacts to `key`.
    ///
    /// A capture error is returned after the surface has been disarmed.
    pub async fn handle_key(&self, key: TriggerKey) -> Result<KeyOutcome> {
        if self.session.is_busy() {
            log::debug!("Ignoring {key:?}: capture in progress");
            return Ok(KeyOutcome::Ignored);
        }

        match key {
            TriggerKey::Plus => Ok(self.activate(CaptureMode::Color)),
            TriggerKey::Minus => Ok(self.activate(CaptureMode::Depth)),
            TriggerKey::Escape => {
                let was_active = self.controls.deactivate();
                self.session.observer().on_exit();
                if was_active {
                    log::info!("Highres capture mode exited");
                    Ok(KeyOutcome::Deactivated)
                } else {
                    Ok(KeyOutcome::Ignored)
                }
            }
            TriggerKey::Digit(digit) => {
                let Some(mode) = self.controls.mode() else {
                    log::warn!("Highres capture not active: press + or - to activate");
                    return Ok(KeyOutcome::Ignored);
                };
                let request =
                    CaptureRequest::clamped(u32::from(digit), mode, self.session.max_factor());
                let result = self.session.capture(request).await;
                self.deactivate();
                match result? {
                    Some(image) => Ok(KeyOutcome::Captured(image)),
                    None => Ok(KeyOutcome::Ignored),
                }
            }
        }
    }

    fn activate(&self, mode: CaptureMode) -> KeyOutcome {
        self.controls.activate(mode);
        self.session.observer().on_start(mode);
        log::info!(
            "Highres {} mode: press 1-{} to capture at that scale, 0 for the viewport size, Escape to exit",
            mode.name(),
            self.session.max_factor().min(9)
        );
        KeyOutcome::Activated(mode)
    }

    fn deactivate(&self) -> bool {
        let was_active = self.controls.deactivate();
        if was_active {
            self.session.observer().on_exit();
            log::info!("Highres capture mode exited");
        }
        was_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_trigger_key_from_key() {
        assert_eq!(TriggerKey::from_key("+"), Some(TriggerKey::Plus));
        assert_eq!(TriggerKey::from_key("="), Some(TriggerKey::Plus));
        assert_eq!(TriggerKey::from_key("-"), Some(TriggerKey::Minus));
        assert_eq!(TriggerKey::from_key("Escape"), Some(TriggerKey::Escape));
        assert_eq!(TriggerKey::from_key("0"), Some(TriggerKey::Digit(0)));
        assert_eq!(TriggerKey::from_key("7"), Some(TriggerKey::Digit(7)));
        assert_eq!(TriggerKey::from_key("12"), None);
        assert_eq!(TriggerKey::from_key("a"), None);
        assert_eq!(TriggerKey::from_key(""), None);
    }

    #[test]
    fn test_controls_activate_deactivate() {
        let controls = CaptureControls::new();
        assert!(!controls.is_active());
        assert!(!controls.deactivate());

        controls.activate(CaptureMode::Depth);
        assert_eq!(controls.mode(), Some(CaptureMode::Depth));
        controls.activate(CaptureMode::Color);
        assert_eq!(controls.mode(), Some(CaptureMode::Color));

        assert!(controls.deactivate());
        assert_eq!(controls.mode(), None);
    }

    proptest! {
        #[test]
        fn prop_single_digits_map_to_factor(digit in 0u8..10) {
            let key = digit.to_string();
            prop_assert_eq!(TriggerKey::from_key(&key), Some(TriggerKey::Digit(digit)));
        }

        #[test]
        fn prop_multi_char_names_other_than_escape_ignored(name in "[a-zA-Z0-9]{2,8}") {
            prop_assume!(name != "Escape" && name != "Esc");
            prop_assert_eq!(TriggerKey::from_key(&name), None);
        }
    }
}
