//! Test utilities shared between the workspace crates.

/// A result type useful in tests, that wraps any error implementation.
pub type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Shortcut for `<string>.parse().unwrap()`.
#[macro_export]
macro_rules! parse {
    ($string:literal) => {
        $string.parse().unwrap()
    };
}

/// Macro for creating parametrized *synchronous* tests.
///
/// The macro accepts the name of an existing function, followed by a list of
/// case names and their arguments, and expands to a module with a `#[test]`
/// function per case. The function may have a return type such as a
/// [`Result`], and individual cases may carry extra attributes like
/// `#[ignore]`.
///
/// # Examples
///
/// ```
/// # use test_utils::param_test;
/// #
/// param_test! {
///     test_hop_count: [
///         first_relay: (0, 1),
///         second_relay: (1, 2),
///     ]
/// }
/// fn test_hop_count(inner: u8, expected: u8) {
///     assert_eq!(inner + 1, expected);
/// }
/// ```
#[macro_export]
macro_rules! param_test {
    ($func_name:ident -> $return_ty:ty: [
        $( $(#[$outer:meta])* $case_name:ident: ( $($args:expr),+ )  ),+$(,)?
    ]) => {
        mod $func_name {
            use super::*;

            $(
                #[test]
                $(#[$outer])*
                fn $case_name() -> $return_ty {
                    $func_name($($args),+)
                }
            )*
        }
    };
    ($func_name:ident: [
        $( $(#[$outer:meta])* $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        param_test!($func_name -> (): [ $( $(#[$outer])* $case_name: ( $($args),+ ) ),+ ]);
    };
}

/// Macro for creating parametrized *asynchronous* tests.
///
/// Behaves like [`param_test`] for `async` functions: cases are expanded with
/// the `#[tokio::test]` attribute. When specifying additional attributes on
/// any case, `#[tokio::test]` must be restated for *every* case.
#[macro_export]
macro_rules! async_param_test {
    ($func_name:ident -> $return_ty:ty: [
        $( $(#[$outer:meta])+ $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        mod $func_name {
            use super::*;

            $(
                $(#[$outer])+
                async fn $case_name() -> $return_ty {
                    $func_name($($args),+).await
                }
            )*
        }
    };
    ($func_name:ident: [
        $( $(#[$outer:meta])+ $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        async_param_test!( $func_name -> (): [ $( $(#[$outer])+ $case_name: ($($args),+) ),* ] );
    };

    ($func_name:ident: [
        $( $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        async_param_test!( $func_name -> (): [ $( #[tokio::test] $case_name: ($($args),+) ),* ] );
    };
    ($func_name:ident -> $return_ty:ty: [
        $( $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        async_param_test!(
            $func_name -> $return_ty: [ $( #[tokio::test] $case_name: ( $($args),+ ) ),* ]
        );
    }
}
