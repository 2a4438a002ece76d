//! View-state enumeration for the client router.

use serde::{Deserialize, Serialize};

/// The screen the UI is currently displaying.
///
/// Adding a variant forces every `match` over views to be revisited; the
/// router's dispatch is exhaustive on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewState {
    Landing,
    Login,
    Register,
    DashboardHome,
    DashboardCalendar,
    DashboardRanking,
    DashboardPoints,
    DashboardChat,
}

impl ViewState {
    /// Private views require an authenticated identity.
    pub fn is_private(&self) -> bool {
        match self {
            ViewState::Landing | ViewState::Login | ViewState::Register => false,
            ViewState::DashboardHome
            | ViewState::DashboardCalendar
            | ViewState::DashboardRanking
            | ViewState::DashboardPoints
            | ViewState::DashboardChat => true,
        }
    }
}
