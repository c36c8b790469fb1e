pub mod boy18tube;
pub mod erome;
pub mod redgifs;

pub use boy18tube::Boy18TubeExtractor;
pub use erome::{EromeExtractor, EromeProfileExtractor};
pub use redgifs::{
    RedGifsApi, RedGifsExtractor, RedGifsNicheExtractor, RedGifsSearchExtractor,
    RedGifsUserExtractor,
};
