//! Client-side integrity signals for an active attempt.
//!
//! Everything here is a best-effort deterrent, not a security guarantee. The
//! host environment reports visibility changes and clipboard/context-menu
//! events; a determined student can bypass all of it. Tab-away counts are
//! recorded on the attempt for later review and never pause timers,
//! invalidate an attempt, or change its score.

use serde::{Deserialize, Serialize};

/// Default actions on the exam surface the host may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceAction {
    Copy,
    Paste,
    ContextMenu,
}

/// What the host should do with an intercepted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// Suppress the default action.
    PreventDefault,
    Allow,
}

/// Counts of suppressed actions, for review alongside the tab-away count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedActions {
    pub copy: u32,
    pub paste: u32,
    pub context_menu: u32,
}

#[derive(Debug, Clone, Default)]
pub struct IntegrityMonitor {
    active: bool,
    tab_away_count: u32,
    blocked: BlockedActions,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin observing. Counters start from zero for every attempt.
    pub fn activate(&mut self) {
        *self = Self {
            active: true,
            ..Self::default()
        };
    }

    /// Stop observing; counters are kept for the attempt record.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record a visibility change of the exam surface.
    pub fn on_visibility_change(&mut self, hidden: bool) {
        if self.active && hidden {
            self.tab_away_count += 1;
            tracing::debug!(count = self.tab_away_count, "exam surface hidden");
        }
    }

    /// Decide whether a clipboard or context-menu action is suppressed.
    pub fn intercept(&mut self, action: SurfaceAction) -> Interception {
        if !self.active {
            return Interception::Allow;
        }
        match action {
            SurfaceAction::Copy => self.blocked.copy += 1,
            SurfaceAction::Paste => self.blocked.paste += 1,
            SurfaceAction::ContextMenu => self.blocked.context_menu += 1,
        }
        tracing::debug!(?action, "suppressed default action on exam surface");
        Interception::PreventDefault
    }

    pub fn tab_away_count(&self) -> u32 {
        self.tab_away_count
    }

    pub fn blocked(&self) -> BlockedActions {
        self.blocked
    }
}
