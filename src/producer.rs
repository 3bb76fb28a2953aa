//! The production capability injected into a pool

use std::fmt::Display;

/// Produces one expensive item per call.
///
/// A producer may be slow and may fail. It is only ever invoked on a refill
/// worker thread, never on the thread that requests an item. Any closure
/// `Fn() -> Result<T, E>` is a producer.
///
/// # Examples
///
/// ```
/// use refill_objectpool::Produce;
///
/// struct Keypair;
///
/// impl Produce for Keypair {
///     type Item = [u8; 32];
///     type Error = String;
///
///     fn produce(&self) -> Result<Self::Item, Self::Error> {
///         Ok([7; 32])
///     }
/// }
///
/// assert_eq!(Keypair.produce().unwrap()[0], 7);
///
/// let closure = || Ok::<_, String>(42);
/// assert_eq!(closure.produce().unwrap(), 42);
/// ```
pub trait Produce: Send + Sync + 'static {
    type Item: Send + 'static;
    type Error: Display + Send + 'static;

    fn produce(&self) -> Result<Self::Item, Self::Error>;
}

impl<F, T, E> Produce for F
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    type Item = T;
    type Error = E;

    fn produce(&self) -> Result<T, E> {
        self()
    }
}
