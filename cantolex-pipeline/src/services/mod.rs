//! External service interfaces and reference data
//!
//! Services are narrow traits so deterministic doubles can replace them in
//! tests without any live dependency.

pub mod lemmatizer;
pub mod lexicon;
pub mod translator;

pub use lemmatizer::{HttpLemmatizer, Lemmatizer, LemmatizerError, TokenAnnotation};
pub use lexicon::{FrequencyLexicon, ReferenceVocabulary, UNRANKED};
pub use translator::{HttpTranslator, Translator, TranslatorError};
