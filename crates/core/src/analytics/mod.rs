pub mod heat_ring;
pub mod spectrum;
pub mod timeline;
pub mod window;

pub use heat_ring::{compute_heat_ring, HeatRing, HeatRingAggregates, HeatRingGame, HeatRingRequest};
pub use spectrum::{compute_spectrum, PropSpectrum, SpectrumRequest};
pub use timeline::{build_game_log_timeline, Timeline, TimelinePoint, TimelineRequest};
pub use window::{avg_margin, hit_rate, window_stats, WindowStats};
