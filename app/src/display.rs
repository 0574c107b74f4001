//! Display mode state and change detection.

use bitflags::bitflags;
use gitech_graphics::Extent2d;

bitflags! {
    /// Which parts of the display mode differ between two settings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DisplayChanges: u8 {
        const RESOLUTION = 1 << 0;
        const FULLSCREEN = 1 << 1;
        const VSYNC = 1 << 2;
    }
}

/// Requested display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
        }
    }
}

impl DisplaySettings {
    /// Back-buffer size for this mode.
    pub fn back_buffer(&self) -> Extent2d {
        Extent2d::new(self.width, self.height)
    }

    /// What changes going from `self` to `next`.
    pub fn changes_to(&self, next: &DisplaySettings) -> DisplayChanges {
        let mut changes = DisplayChanges::empty();
        changes.set(
            DisplayChanges::RESOLUTION,
            self.width != next.width || self.height != next.height,
        );
        changes.set(DisplayChanges::FULLSCREEN, self.fullscreen != next.fullscreen);
        changes.set(DisplayChanges::VSYNC, self.vsync != next.vsync);
        changes
    }

    /// Reject modes no device can present.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "display resolution {}x{} has a zero side",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for DisplaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} {} vsync {}",
            self.width,
            self.height,
            if self.fullscreen { "fullscreen" } else { "windowed" },
            if self.vsync { "on" } else { "off" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::same(DisplaySettings::default(), DisplayChanges::empty())]
    #[case::resolution(
        DisplaySettings { width: 1920, height: 1080, ..Default::default() },
        DisplayChanges::RESOLUTION
    )]
    #[case::fullscreen_and_vsync(
        DisplaySettings { fullscreen: true, vsync: false, ..Default::default() },
        DisplayChanges::FULLSCREEN | DisplayChanges::VSYNC
    )]
    fn test_changes(#[case] next: DisplaySettings, #[case] expected: DisplayChanges) {
        assert_eq!(DisplaySettings::default().changes_to(&next), expected);
    }

    #[test]
    fn test_validate_and_display() {
        assert!(DisplaySettings::default().validate().is_ok());
        let bad = DisplaySettings {
            width: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert_eq!(
            DisplaySettings::default().to_string(),
            "1280x720 windowed vsync on"
        );
        assert_eq!(
            DisplaySettings::default().back_buffer(),
            Extent2d::new(1280, 720)
        );
    }
}
