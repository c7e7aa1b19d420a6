//! Linguistic stemmers with a one-token-in, one-token-out contract: the
//! token is stemmed in place, and a token reduced to nothing is left empty
//! so the tokenisation pipeline drops it.

mod english;
mod german;

pub use crate::{english::stem_english, german::stem_german};
