//! Identifiers for core entities.

use slotmap::new_key_type;

new_key_type! {
    /// Generational handle to a job in a scheduler's arena.
    ///
    /// Ids stay unique across removal: a handle whose job has been removed
    /// fails arena lookups instead of aliasing a newer job in the same slot.
    pub struct JobId;
}
