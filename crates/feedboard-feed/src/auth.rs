//! Authorization capability consumed by the feed entry points
//!
//! The feeds know nothing about sessions or cookies. Callers pass an
//! [`AuthGate`] together with whatever identifies the caller; a `false` answer
//! refuses the attach before any feed state is touched.

/// Yes/no authorization check for a caller of type `C`
pub trait AuthGate<C: ?Sized>: Send + Sync {
    /// Whether `caller` may attach as a producer or subscriber
    fn is_authorized(&self, caller: &C) -> bool;
}

impl<C: ?Sized, F> AuthGate<C> for F
where
    F: Fn(&C) -> bool + Send + Sync,
{
    fn is_authorized(&self, caller: &C) -> bool {
        self(caller)
    }
}

/// Gate that admits everyone
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl<C: ?Sized> AuthGate<C> for AllowAll {
    fn is_authorized(&self, _caller: &C) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_gate() {
        let gate = |caller: &str| caller == "alice";
        assert!(gate.is_authorized("alice"));
        assert!(!AuthGate::<str>::is_authorized(&gate, "mallory"));
    }

    #[test]
    fn test_allow_all() {
        assert!(AuthGate::<str>::is_authorized(&AllowAll, "anyone"));
    }
}
