//! Plain-text renderings of session state for the terminal front end.

pub mod response_panel;
pub mod sidebar;
