//! Thread-safe, append-only error aggregation.

use std::error::Error as StdError;
use std::fmt;

use parking_lot::RwLock;

use crate::error::BoxError;

/// Collects errors from several operations (possibly on different threads).
///
/// Pushing another `ErrorList` merges its errors into this one rather than
/// nesting the list, so the result is always flat.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: RwLock<Vec<BoxError>>,
}

impl ErrorList {
    /// Creates an empty error list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error. An `ErrorList` is flattened into this one.
    pub fn push<E>(&self, err: E)
    where
        E: Into<BoxError>,
    {
        let err: BoxError = err.into();
        match err.downcast::<ErrorList>() {
            Ok(list) => {
                let ErrorList { errors } = *list;
                self.errors.write().extend(errors.into_inner());
            }
            Err(err) => self.errors.write().push(err),
        }
    }

    /// Records the error of `result`, if any, and passes the value through.
    pub fn push_result<T, E>(&self, result: std::result::Result<T, E>) -> Option<T>
    where
        E: Into<BoxError>,
    {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push(err);
                None
            }
        }
    }

    /// Returns the number of collected errors.
    pub fn len(&self) -> usize {
        self.errors.read().len()
    }

    /// Returns true if no error has been pushed.
    pub fn is_empty(&self) -> bool {
        self.errors.read().is_empty()
    }

    /// Calls `f` for every collected error, in push order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&(dyn StdError + Send + Sync + 'static)),
    {
        for err in self.errors.read().iter() {
            f(err.as_ref());
        }
    }

    /// Converts the list into a result.
    ///
    /// Empty lists are `Ok`, a single error is returned as itself, and
    /// anything more is returned as the list.
    pub fn into_result(self) -> std::result::Result<(), BoxError> {
        let mut errors = self.errors.into_inner();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Box::new(ErrorList {
                errors: RwLock::new(errors),
            })),
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.read();
        match errors.as_slice() {
            [] => Ok(()),
            [only] => write!(f, "{only}"),
            all => {
                writeln!(f, "the following errors occurred:")?;
                for err in all {
                    writeln!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl StdError for ErrorList {}

impl<E> FromIterator<E> for ErrorList
where
    E: Into<BoxError>,
{
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let list = ErrorList::new();
        for err in iter {
            list.push(err);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FillcacheError;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_push_and_len() {
        let errors = ErrorList::new();
        assert!(errors.is_empty());

        errors.push("hello world");
        assert_eq!(errors.len(), 1);

        let mut seen = Vec::new();
        errors.for_each(|err| seen.push(err.to_string()));
        assert_eq!(seen, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_push_merges_lists() {
        let inner = ErrorList::new();
        inner.push("a");
        inner.push("b");

        let outer = ErrorList::new();
        outer.push("first");
        outer.push(inner);

        assert_eq!(outer.len(), 3);
        let mut seen = Vec::new();
        outer.for_each(|err| seen.push(err.to_string()));
        assert_eq!(seen, ["first", "a", "b"]);
    }

    #[test]
    fn test_into_result_empty_is_ok() {
        assert!(ErrorList::new().into_result().is_ok());
    }

    #[test]
    fn test_into_result_single_error_is_unwrapped() {
        let errors = ErrorList::new();
        errors.push(FillcacheError::Closed);

        let err = errors.into_result().unwrap_err();
        assert!(err.downcast_ref::<FillcacheError>().is_some());
    }

    #[test]
    fn test_into_result_many_errors_is_list() {
        let errors: ErrorList = ["one", "two"].into_iter().collect();

        let err = errors.into_result().unwrap_err();
        let list = err.downcast_ref::<ErrorList>().unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_display() {
        let errors = ErrorList::new();
        assert_eq!(errors.to_string(), "");

        errors.push("only");
        assert_eq!(errors.to_string(), "only");

        errors.push("second");
        assert_eq!(
            errors.to_string(),
            "the following errors occurred:\nonly\nsecond\n"
        );
    }

    #[test]
    fn test_push_result() {
        let errors = ErrorList::new();
        let ok: std::result::Result<u8, FillcacheError> = Ok(3);
        let bad: std::result::Result<u8, FillcacheError> = Err(FillcacheError::Closed);

        assert_eq!(errors.push_result(ok), Some(3));
        assert_eq!(errors.push_result(bad), None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_concurrent_push() {
        let errors = Arc::new(ErrorList::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let errors = Arc::clone(&errors);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        errors.push(format!("thread {i} error {j}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(errors.len(), 800);
    }

    proptest! {
        #[test]
        fn prop_nested_lists_flatten(sizes in proptest::collection::vec(0usize..5, 0..6)) {
            let outer = ErrorList::new();
            for (i, size) in sizes.iter().enumerate() {
                let inner = ErrorList::new();
                for j in 0..*size {
                    inner.push(format!("{i}-{j}"));
                }
                outer.push(inner);
            }
            prop_assert_eq!(outer.len(), sizes.iter().sum::<usize>());
        }
    }
}
