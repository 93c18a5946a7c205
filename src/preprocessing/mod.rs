pub use self::transition::TransitionVocab;
pub use self::vocab::*;

mod transition;
mod vocab;
