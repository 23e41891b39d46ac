//! egui panels for the chat client. Rendering only: panels read [`state::UiState`]
//! and hand user intent back to the app as action values.

pub mod state;
pub mod theme;
pub mod markup;
pub mod panels;
