// Pure simulation steps. No I/O and no session-lifetime state.

pub mod physics;
