// SPDX-License-Identifier: MIT

//! View router: finite state machine over the client's named screens.
//!
//! Holds no session state of its own; every decision takes the current
//! `Session` as input. Effects that touch the outside world (provider
//! sign-out) are returned to the caller instead of executed here, which
//! keeps transitions synchronous and testable.

use crate::models::ViewState;
use crate::session::Session;

/// Side effect a navigation decision asks the caller to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEffect {
    None,
    /// Navigating to `Landing` while signed in is an explicit logout.
    SignOut,
}

/// Client-side router over [`ViewState`].
pub struct ViewRouter {
    current: ViewState,
    /// Invoked on every view change; the embedding view layer resets scroll
    /// position here.
    scroll_reset: Option<Box<dyn Fn() + Send + Sync>>,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRouter {
    pub fn new() -> Self {
        Self {
            current: ViewState::Landing,
            scroll_reset: None,
        }
    }

    pub fn set_scroll_reset(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.scroll_reset = Some(Box::new(hook));
    }

    pub fn current(&self) -> ViewState {
        self.current
    }

    /// Explicit navigation request.
    pub fn navigate(&mut self, target: ViewState, session: &Session) -> NavEffect {
        // Private views require an identity. While the first identity event
        // is still pending the display is suppressed entirely, so the
        // redirect only applies once loading has completed.
        if target.is_private() && !session.is_signed_in() && !session.loading {
            self.set_view(ViewState::Login);
            return NavEffect::None;
        }

        if target == ViewState::Landing && session.is_signed_in() {
            self.set_view(ViewState::Landing);
            return NavEffect::SignOut;
        }

        self.set_view(target);
        NavEffect::None
    }

    /// Reactive transition driven by a session change, not by an explicit
    /// navigation call.
    pub fn on_session_change(&mut self, session: &Session) {
        if session.loading {
            return;
        }

        if session.is_signed_in() {
            match self.current {
                ViewState::Landing | ViewState::Login => self.set_view(ViewState::DashboardHome),
                // Registration signs the user out right after account
                // creation; the confirmation screen must not be yanked into
                // the dashboard in between.
                ViewState::Register => {}
                ViewState::DashboardHome
                | ViewState::DashboardCalendar
                | ViewState::DashboardRanking
                | ViewState::DashboardPoints
                | ViewState::DashboardChat => {}
            }
        } else if self.current.is_private() {
            self.set_view(ViewState::Landing);
        }
    }

    fn set_view(&mut self, view: ViewState) {
        self.current = view;
        if let Some(reset) = &self.scroll_reset {
            reset();
        }
    }
}
