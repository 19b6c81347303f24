//! End-to-end tests of the voice service against fake voice connections

pub mod countdown_flow;
pub mod voice_session;
