pub mod lexicon;

pub use lexicon::{Atom, Lexicon, LexiconError};
