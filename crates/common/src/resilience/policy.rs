//! Transient-fault classification seam of the retry engine

use super::telemetry::DriverCode;

/// Decides whether a failed attempt may succeed if repeated unchanged
///
/// Implementors are usually static data (see the per-engine classifiers in
/// `polytx-core`) or one of the ready-made [`policies`].
pub trait TransientPolicy<E: ?Sized> {
    /// `true` when the error is worth another attempt
    fn is_transient(&self, error: &E) -> bool;

    /// Driver code to surface on retry telemetry, if the policy knows one
    fn error_code(&self, _error: &E) -> Option<DriverCode> {
        None
    }
}

impl<E: ?Sized, P: TransientPolicy<E> + ?Sized> TransientPolicy<E> for &P {
    fn is_transient(&self, error: &E) -> bool {
        (**self).is_transient(error)
    }

    fn error_code(&self, error: &E) -> Option<DriverCode> {
        (**self).error_code(error)
    }
}

/// Common transient policies
pub mod policies {
    use super::TransientPolicy;

    /// Treats every error as transient
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysTransient;

    impl<E: ?Sized> TransientPolicy<E> for AlwaysTransient {
        fn is_transient(&self, _error: &E) -> bool {
            true
        }
    }

    /// Treats every error as permanent; the operation runs exactly once
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverTransient;

    impl<E: ?Sized> TransientPolicy<E> for NeverTransient {
        fn is_transient(&self, _error: &E) -> bool {
            false
        }
    }

    /// Predicate-based policy
    #[derive(Debug, Clone)]
    pub struct Predicate<F> {
        predicate: F,
    }

    impl<F> Predicate<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E: ?Sized> TransientPolicy<E> for Predicate<F>
    where
        F: Fn(&E) -> bool,
    {
        fn is_transient(&self, error: &E) -> bool {
            (self.predicate)(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::policies::{AlwaysTransient, NeverTransient, Predicate};
    use super::*;

    #[test]
    fn test_always_and_never() {
        assert!(AlwaysTransient.is_transient("anything"));
        assert!(!NeverTransient.is_transient("anything"));
        assert_eq!(TransientPolicy::<str>::error_code(&AlwaysTransient, "x"), None);
    }

    /// Validates `Predicate` delegates to its closure.
    ///
    /// Assertions:
    /// - Errors matching the predicate are transient, others are not.
    #[test]
    fn test_predicate_policy() {
        let policy = Predicate::new(|code: &i32| *code == 1205);
        assert!(policy.is_transient(&1205));
        assert!(!policy.is_transient(&547));
    }

    #[test]
    fn test_reference_forwards() {
        let policy = Predicate::new(|code: &i32| *code < 0);
        let by_ref = &policy;
        assert!(by_ref.is_transient(&-2));
        assert!(!by_ref.is_transient(&2));
    }
}
