//! Combinators over groups of `Result` values.
//!
//! `std::result::Result` already is the two-variant sum type with `map`,
//! `and_then` and a panicking `unwrap`. What it lacks is a way to validate a
//! handful of independent inputs at once, so this module adds:
//!
//! - [`combine`]: fixed-size tuples with mixed success types, first error wins.
//! - [`combine_errors`]: same shape, but every error is reported.
//! - [`combine_all`] / [`combine_all_errors`]: the homogeneous, iterator forms.

/// A fixed-size group of results sharing one error type.
///
/// Implemented for tuples of one to eight `Result`s.
pub trait Combine {
    type Output;
    type Error;

    fn combine(self) -> Result<Self::Output, Self::Error>;

    fn combine_errors(self) -> Result<Self::Output, Vec<Self::Error>>;
}

/// `Ok` with every value in order, or the first `Err` in tuple order.
pub fn combine<C: Combine>(results: C) -> Result<C::Output, C::Error> {
    results.combine()
}

/// `Ok` with every value in order, or all errors in tuple order.
pub fn combine_errors<C: Combine>(results: C) -> Result<C::Output, Vec<C::Error>> {
    results.combine_errors()
}

/// Iterator form of [`combine`]. An empty input is `Ok(vec![])`.
pub fn combine_all<T, E, I>(results: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Result<T, E>>,
{
    results.into_iter().collect()
}

/// Iterator form of [`combine_errors`].
pub fn combine_all_errors<T, E, I>(results: I) -> Result<Vec<T>, Vec<E>>
where
    I: IntoIterator<Item = Result<T, E>>,
{
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

macro_rules! impl_combine {
    ($($T:ident $v:ident),+) => {
        impl<E, $($T),+> Combine for ($(Result<$T, E>,)+) {
            type Output = ($($T,)+);
            type Error = E;

            fn combine(self) -> Result<Self::Output, E> {
                let ($($v,)+) = self;
                // Tuple fields evaluate left to right, so `?` stops at the first error.
                Ok(($($v?,)+))
            }

            fn combine_errors(self) -> Result<Self::Output, Vec<E>> {
                let ($($v,)+) = self;
                let mut errors = Vec::new();
                $(
                    let $v = match $v {
                        Ok(value) => Some(value),
                        Err(err) => {
                            errors.push(err);
                            None
                        }
                    };
                )+
                match ($($v,)+) {
                    ($(Some($v),)+) => Ok(($($v,)+)),
                    _ => Err(errors),
                }
            }
        }
    };
}

impl_combine!(A a);
impl_combine!(A a, B b);
impl_combine!(A a, B b, C c);
impl_combine!(A a, B b, C c, D d);
impl_combine!(A a, B b, C c, D d, F f);
impl_combine!(A a, B b, C c, D d, F f, G g);
impl_combine!(A a, B b, C c, D d, F f, G g, H h);
impl_combine!(A a, B b, C c, D d, F f, G g, H h, I i);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ok(v: i32) -> Result<i32, &'static str> {
        Ok(v)
    }

    fn err(e: &'static str) -> Result<i32, &'static str> {
        Err(e)
    }

    #[test]
    fn combine_collects_all_values() {
        assert_eq!(combine((ok(1), ok(2), ok(3))), Ok((1, 2, 3)));
    }

    #[test]
    fn combine_returns_first_error() {
        assert_eq!(combine((ok(1), err("x"), ok(3))), Err("x"));
        assert_eq!(combine((err("first"), err("second"))), Err("first"));
    }

    #[test]
    fn combine_accepts_mixed_success_types() {
        let name: Result<String, &str> = Ok("alice".to_string());
        let age: Result<u8, &str> = Ok(30);
        assert_eq!(combine((name, age)), Ok(("alice".to_string(), 30)));
    }

    #[test]
    fn combine_errors_reports_every_error() {
        assert_eq!(
            combine_errors((ok(1), err("x"), err("y"))),
            Err(vec!["x", "y"])
        );
        assert_eq!(combine_errors((ok(1), ok(2))), Ok((1, 2)));
    }

    #[test]
    fn combine_all_handles_empty_and_failing_sequences() {
        let empty: Vec<Result<i32, &str>> = Vec::new();
        assert_eq!(combine_all(empty), Ok(vec![]));
        assert_eq!(combine_all(vec![ok(1), err("a"), err("b")]), Err("a"));
        assert_eq!(
            combine_all_errors(vec![ok(1), err("a"), err("b")]),
            Err(vec!["a", "b"])
        );
        assert_eq!(combine_all_errors(vec![ok(4), ok(2)]), Ok(vec![4, 2]));
    }

    #[test]
    #[should_panic]
    fn unwrap_on_err_panics() {
        let _ = err("boom").unwrap();
    }

    fn result_strategy() -> impl Strategy<Value = Result<i32, String>> {
        prop_oneof![any::<i32>().prop_map(Ok), "[a-z]{1,8}".prop_map(Err)]
    }

    fn halve(v: i32) -> Result<i32, String> {
        if v % 2 == 0 {
            Ok(v / 2)
        } else {
            Err(format!("{v} is odd"))
        }
    }

    proptest! {
        #[test]
        fn map_identity_is_noop(r in result_strategy()) {
            prop_assert_eq!(r.clone().map(|v| v), r);
        }

        #[test]
        fn and_then_on_ok_applies_function(v in any::<i32>()) {
            prop_assert_eq!(Ok::<i32, String>(v).and_then(halve), halve(v));
        }

        #[test]
        fn and_then_on_err_short_circuits(e in "[a-z]{1,8}") {
            prop_assert_eq!(Err::<i32, String>(e.clone()).and_then(halve), Err(e));
        }

        #[test]
        fn combine_errors_agrees_with_combine_on_success(a in any::<i32>(), b in any::<i32>()) {
            let pair = (Ok::<i32, String>(a), Ok::<i32, String>(b));
            prop_assert_eq!(combine(pair.clone()), Ok((a, b)));
            prop_assert_eq!(combine_errors(pair), Ok((a, b)));
        }
    }
}
