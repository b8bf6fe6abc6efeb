//! Normalisation of legal-domain classification datasets.
//!
//! Answers written as free-text category labels (`类别:婚姻家庭`,
//! `[类别]婚姻家庭<eoa>`, `正确答案：B、A。`, …) are mapped onto a letter
//! alphabet and rewritten as one canonical multiple-choice answer. The
//! binaries in this package are thin wrappers around [`batch`],
//! [`csv_export`] and [`structured`].

pub mod alphabet;
pub mod batch;
pub mod convert;
pub mod csv_export;
pub mod error;
pub mod extract;
pub mod logging;
pub mod scheme;
pub mod structured;

pub use alphabet::Alphabet;
pub use convert::{convert, CanonicalRecord, ConvertOptions, Record};
pub use error::{ConvertError, FormatError};
pub use extract::extract_letters;
pub use scheme::Scheme;
