pub mod error;
pub mod identity;
pub mod lead;
pub mod profile;

pub use error::{Error, ErrorKind, Result};
pub use identity::{Identity, ANONYMOUS_IDENTITY};
pub use lead::{AddNoteInput, CreateLeadInput, Lead, LeadId, LeadStatus, Time, UpdateStatusInput};
pub use profile::{UserProfile, UserRole};
