/// Phrase pool allocation and reshuffling.
pub mod allocator;
/// Game setup: team selection, pool allocation and session start.
pub mod game_service;
/// Notice fan-out to subscribed screens.
pub mod notice_events;
/// Single-writer session actor owning the state machine.
pub mod session;
/// Cancellable turn countdown.
pub mod timer;
