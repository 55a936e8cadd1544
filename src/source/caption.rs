//! Recover a track title from a player's window caption.
//!
//! Many players show `"<title> - <Player>"` (or `"<Player> - <title>"`) in
//! their title bar. Adapters that can read that text use [`CaptionFormat`] as
//! a last-resort title source.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Placement {
    /// `"<title><sep><player>"`
    Suffix,
    /// `"<player><sep><title>"`
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFormat {
    pub player: String,
    pub separator: String,
    pub placement: Placement,
}

impl CaptionFormat {
    pub fn suffix(player: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            separator: separator.into(),
            placement: Placement::Suffix,
        }
    }

    pub fn prefix(player: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            separator: separator.into(),
            placement: Placement::Prefix,
        }
    }

    /// Extract the title part of `caption`.
    ///
    /// Returns `None` when the player marker is absent (the window is showing
    /// something else) or when nothing is left once it is removed.
    pub fn title(&self, caption: &str) -> Option<String> {
        let title = match self.placement {
            Placement::Suffix => {
                let marker = format!("{}{}", self.separator, self.player);
                let end = caption.rfind(&marker)?;
                &caption[..end]
            }
            Placement::Prefix => {
                let marker = format!("{}{}", self.player, self.separator);
                caption.strip_prefix(marker.as_str())?
            }
        };

        let title = title.trim();
        if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        }
    }
}
