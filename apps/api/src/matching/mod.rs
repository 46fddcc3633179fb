// Scoring and deduplication pipeline: identity hashing, multi-factor match
// scoring, and threshold/rank/cap. Persistence lives in `store`.

pub mod fingerprint;
pub mod rank;
pub mod scorer;
