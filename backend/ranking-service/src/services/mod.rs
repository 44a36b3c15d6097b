pub mod ranking;

pub use ranking::RankingService;
