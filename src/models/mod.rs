pub mod reference;
pub mod stream_entry;
pub mod verification;

pub use reference::{AreaRef, CategoryRef, LanguageRef};
pub use stream_entry::{StreamEntry, StreamEntryData, StreamRecord};
pub use verification::{
    RunCompletion, StatusSummary, VerificationOutcome, VerificationReport, VerificationStatus,
};
