pub mod convergence;
pub mod game_log;
pub mod player;
pub mod snapshot;
