pub mod awards;
pub mod normalizer;
pub mod rule_book;
pub mod rules;

pub use awards::{derive_awards, NO_ONE, NO_WINNER};
pub use normalizer::{normalize, FillPolicy};
pub use rule_book::RuleBook;
pub use rules::{RuleKey, RuleTable};
