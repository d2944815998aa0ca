pub mod action_state;
pub mod capabilities;
pub mod identity;
pub mod post;
pub mod relationship;
pub mod saved_search;

pub use action_state::{reconcile, PostActionState, ReconcileOutcome};
pub use capabilities::{next_support, CapabilitySupport, SearchCapabilities, SearchScope};
pub use identity::PostId;
pub use post::{Attachment, AttachmentKind, Author, UnifiedPost};
pub use relationship::RelationshipState;
pub use saved_search::SavedSearch;
