//! # Invocation Bridge
//!
//! Purpose: Let command façades issue one driver call, hand its reply to the
//! connection's synchronizer and convert the raw value into a domain type,
//! without knowing whether the call blocks or is pipelined.
//!
//! ## Design Principles
//! 1. **One Resolution Routine**: Every entry point ends in
//!    `Synchronizer::invoke`; arity variants only differ in how the driver
//!    call is built.
//! 2. **Lazy Calls**: `from`/`from_many` keep the call until a terminal
//!    operation runs it, exactly once.
//! 3. **No Domain Knowledge**: The bridge never inspects values; absent
//!    single results reach the converter as-is, absent collections are empty.
//!
//! ## Call Shapes
//!
//! ```text
//! invoke().just(|d| d.geoadd(..))                    -> Reply<R>
//! invoke().from(|d| d.geodist(..)).get(conv)         -> Reply<T>
//! invoke().from_many(|d| d.geopos(..)).to_list(conv) -> Reply<Vec<T>>
//! invoke().from_many_with(D::geohash, (k, m)).to_set(conv)
//! ```

use std::hash::Hash;

use hkv_common::{ClientError, ClientResult, ConversionResult};
use indexmap::IndexSet;

use crate::driver::{AsyncCommands, CommandFuture};
use crate::reply::Reply;
use crate::synchronizer::Synchronizer;

/// A driver function callable with an argument tuple.
///
/// Implemented for every `FnOnce(&D, A1, .., An) -> CommandFuture<R>` with
/// `n` up to 8, so driver methods such as `D::geodist` can be passed by name.
pub trait CommandFn<D: ?Sized, Args, R> {
    fn call(self, driver: &D, args: Args) -> CommandFuture<R>;
}

macro_rules! impl_command_fn {
    ($($ty:ident),*) => {
        #[allow(non_snake_case)]
        impl<D, F, R, $($ty,)*> CommandFn<D, ($($ty,)*), R> for F
        where
            D: ?Sized,
            F: FnOnce(&D, $($ty,)*) -> CommandFuture<R>,
        {
            fn call(self, driver: &D, args: ($($ty,)*)) -> CommandFuture<R> {
                let ($($ty,)*) = args;
                self(driver, $($ty,)*)
            }
        }
    };
}

impl_command_fn!();
impl_command_fn!(T1);
impl_command_fn!(T1, T2);
impl_command_fn!(T1, T2, T3);
impl_command_fn!(T1, T2, T3, T4);
impl_command_fn!(T1, T2, T3, T4, T5);
impl_command_fn!(T1, T2, T3, T4, T5, T6);
impl_command_fn!(T1, T2, T3, T4, T5, T6, T7);
impl_command_fn!(T1, T2, T3, T4, T5, T6, T7, T8);

/// Raw driver values that represent a collection.
pub trait RawCollection {
    type Element;

    fn into_elements(self) -> Vec<Self::Element>;
}

impl<E> RawCollection for Vec<E> {
    type Element = E;

    fn into_elements(self) -> Vec<E> {
        self
    }
}

/// An absent collection is treated as empty.
impl<E> RawCollection for Option<Vec<E>> {
    type Element = E;

    fn into_elements(self) -> Vec<E> {
        self.unwrap_or_default()
    }
}

type DriverCall<'a, D, R> = Box<dyn FnOnce(&D) -> CommandFuture<R> + 'a>;

/// Entry point of the bridge, borrowed from a client.
pub struct Invoker<'a, D: ?Sized, S> {
    driver: &'a D,
    synchronizer: &'a S,
}

impl<'a, D: ?Sized, S> Clone for Invoker<'a, D, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, D: ?Sized, S> Copy for Invoker<'a, D, S> {}

impl<'a, D, S> Invoker<'a, D, S>
where
    D: AsyncCommands + ?Sized,
    S: Synchronizer,
{
    pub fn new(driver: &'a D, synchronizer: &'a S) -> Self {
        Invoker {
            driver,
            synchronizer,
        }
    }

    /// Issues `call` and returns the raw value unconverted.
    pub fn just<R, F>(&self, call: F) -> ClientResult<Reply<R>>
    where
        R: Send + 'static,
        F: FnOnce(&D) -> CommandFuture<R>,
    {
        let future = call(self.driver);
        self.synchronizer.invoke(future, |raw| Ok(raw))
    }

    /// [`just`](Self::just) for a driver function and its argument tuple.
    pub fn just_with<F, A, R>(&self, f: F, args: A) -> ClientResult<Reply<R>>
    where
        R: Send + 'static,
        F: CommandFn<D, A, R>,
    {
        self.just(move |driver: &D| f.call(driver, args))
    }

    /// Prepares a call whose single raw value is converted by
    /// [`SingleInvocation::get`].
    pub fn from<R, F>(&self, call: F) -> SingleInvocation<'a, D, S, R>
    where
        F: FnOnce(&D) -> CommandFuture<R> + 'a,
    {
        SingleInvocation {
            invoker: *self,
            call: Box::new(call),
        }
    }

    /// [`from`](Self::from) for a driver function and its argument tuple.
    pub fn from_with<F, A, R>(&self, f: F, args: A) -> SingleInvocation<'a, D, S, R>
    where
        F: CommandFn<D, A, R> + 'a,
        A: 'a,
    {
        self.from(move |driver: &D| f.call(driver, args))
    }

    /// Prepares a call whose raw collection is converted element-wise.
    pub fn from_many<C, F>(&self, call: F) -> ManyInvocation<'a, D, S, C>
    where
        C: RawCollection,
        F: FnOnce(&D) -> CommandFuture<C> + 'a,
    {
        ManyInvocation {
            invoker: *self,
            call: Box::new(call),
        }
    }

    /// [`from_many`](Self::from_many) for a driver function and its argument
    /// tuple.
    pub fn from_many_with<F, A, C>(&self, f: F, args: A) -> ManyInvocation<'a, D, S, C>
    where
        C: RawCollection,
        F: CommandFn<D, A, C> + 'a,
        A: 'a,
    {
        self.from_many(move |driver: &D| f.call(driver, args))
    }
}

/// A prepared call producing one raw value.
#[must_use = "the command is only sent once `get` is called"]
pub struct SingleInvocation<'a, D: ?Sized, S, R> {
    invoker: Invoker<'a, D, S>,
    call: DriverCall<'a, D, R>,
}

impl<'a, D, S, R> SingleInvocation<'a, D, S, R>
where
    D: AsyncCommands + ?Sized,
    S: Synchronizer,
    R: Send + 'static,
{
    /// Issues the call and converts its raw value, absent or not.
    pub fn get<T, C>(self, converter: C) -> ClientResult<Reply<T>>
    where
        T: Send + 'static,
        C: FnOnce(R) -> ConversionResult<T> + Send + 'static,
    {
        let future = (self.call)(self.invoker.driver);
        self.invoker
            .synchronizer
            .invoke(future, move |raw| converter(raw).map_err(ClientError::from))
    }
}

/// A prepared call producing a raw collection.
#[must_use = "the command is only sent once `to_list` or `to_set` is called"]
pub struct ManyInvocation<'a, D: ?Sized, S, C> {
    invoker: Invoker<'a, D, S>,
    call: DriverCall<'a, D, C>,
}

impl<'a, D, S, C> ManyInvocation<'a, D, S, C>
where
    D: AsyncCommands + ?Sized,
    S: Synchronizer,
    C: RawCollection + Send + 'static,
{
    /// Converts every element, keeping the driver's order.
    ///
    /// An empty or absent collection yields an empty list without calling
    /// `converter`.
    pub fn to_list<T, F>(self, converter: F) -> ClientResult<Reply<Vec<T>>>
    where
        T: Send + 'static,
        F: Fn(C::Element) -> ConversionResult<T> + Send + 'static,
    {
        let future = (self.call)(self.invoker.driver);
        self.invoker.synchronizer.invoke(future, move |raw: C| {
            raw.into_elements()
                .into_iter()
                .map(&converter)
                .collect::<ConversionResult<Vec<T>>>()
                .map_err(ClientError::from)
        })
    }

    /// Converts every element into an insertion-ordered set.
    ///
    /// Duplicates after conversion keep their first position.
    pub fn to_set<T, F>(self, converter: F) -> ClientResult<Reply<IndexSet<T>>>
    where
        T: Hash + Eq + Send + 'static,
        F: Fn(C::Element) -> ConversionResult<T> + Send + 'static,
    {
        let future = (self.call)(self.invoker.driver);
        self.invoker.synchronizer.invoke(future, move |raw: C| {
            let mut set = IndexSet::new();
            for element in raw.into_elements() {
                set.insert(converter(element)?);
            }
            Ok(set)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use hkv_common::ConversionError;

    use super::*;
    use crate::driver::{CommandArgs, DriverError, GeoUnit, ScriptedDriver};
    use crate::resp::RespValue;
    use crate::synchronizer::{BlockingSynchronizer, PipeliningSynchronizer};

    fn counted<T>(calls: &Arc<AtomicUsize>, value: T) -> impl Fn(Vec<u8>) -> ConversionResult<T> + Send + 'static
    where
        T: Clone + Send + 'static,
    {
        let calls = calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }
    }

    fn ping(driver: &ScriptedDriver) -> CommandFuture<RespValue> {
        driver.dispatch(CommandArgs::new("PING"))
    }

    fn echo(driver: &ScriptedDriver, message: &str) -> CommandFuture<RespValue> {
        driver.dispatch(CommandArgs::new("ECHO").arg(message))
    }

    #[test]
    fn just_returns_raw_value() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Integer(2));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let reply = invoker
            .just(|d| d.geoadd(b"places", 13.36, 38.11, b"Palermo"))
            .unwrap();
        assert_eq!(reply.into_value(), Ok(2));
        assert_eq!(
            driver.dispatched()[0].to_string(),
            "GEOADD places 13.36 38.11 Palermo"
        );
    }

    #[test]
    fn get_receives_absent_values() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Bulk(None));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let reply = invoker
            .from(|d| d.geodist(b"k", b"a", b"b", GeoUnit::Meters))
            .get(|raw| Ok(raw.is_none()))
            .unwrap();
        assert_eq!(reply.into_value(), Ok(true));
    }

    #[test]
    fn call_runs_exactly_once() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Integer(1));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);
        let calls = Cell::new(0);

        invoker
            .from(|d| {
                calls.set(calls.get() + 1);
                d.zrem(b"k", &[&b"a"[..]])
            })
            .get(Ok)
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(driver.dispatch_count(), 1);
    }

    #[test]
    fn to_list_skips_converter_for_empty_and_absent_collections() {
        let driver = ScriptedDriver::new();
        driver
            .reply(RespValue::array(Vec::new()))
            .reply(RespValue::Array(None));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);
        let calls = Arc::new(AtomicUsize::new(0));

        let empty = invoker
            .from_many(|d| d.georadius(b"k", 0.0, 0.0, 1.0, GeoUnit::Meters))
            .to_list(counted(&calls, 1))
            .unwrap();
        assert_eq!(empty.into_value(), Ok(Vec::new()));

        let absent = invoker
            .from_many(|d| {
                d.dispatch(CommandArgs::new("SMEMBERS").arg("k"))
                    .and_then(crate::driver::decode::optional_array)
            })
            .to_list(|_: RespValue| -> ConversionResult<i32> { panic!("converter must not run") })
            .unwrap();
        assert_eq!(absent.into_value(), Ok(Vec::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn to_list_preserves_order() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::array(vec![
            RespValue::bulk("c"),
            RespValue::bulk("a"),
            RespValue::bulk("b"),
        ]));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let list = invoker
            .from_many(|d| d.georadius(b"k", 0.0, 0.0, 1.0, GeoUnit::Meters))
            .to_list(|raw| String::from_utf8(raw).map_err(|_| ConversionError::InvalidUtf8("member")))
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(list, vec!["c", "a", "b"]);
    }

    #[test]
    fn to_set_keeps_first_occurrence() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::array(vec![
            RespValue::bulk("a"),
            RespValue::bulk("b"),
            RespValue::bulk("a"),
        ]));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);
        let calls = Arc::new(AtomicUsize::new(0));

        let set = invoker
            .from_many(|d| d.georadius(b"k", 0.0, 0.0, 1.0, GeoUnit::Meters))
            .to_set(counted(&calls, "x"))
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn driver_failure_never_reaches_converter() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Error(b"ERR boom".to_vec()));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let err = invoker
            .from(|d| d.geodist(b"k", b"a", b"b", GeoUnit::Meters))
            .get(|_| -> ConversionResult<f64> { panic!("converter must not run") })
            .unwrap_err();
        assert_eq!(err, ClientError::data_access("server error: ERR boom"));
    }

    #[test]
    fn conversion_failure_surfaces() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Integer(1));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let err = invoker
            .from(|d| d.zrem(b"k", &[&b"a"[..]]))
            .get(|raw| -> ConversionResult<u8> {
                Err(ConversionError::InvalidNumber(raw.to_string()))
            })
            .unwrap_err();
        assert_eq!(err, ClientError::Conversion(ConversionError::InvalidNumber("1".into())));
    }

    #[test]
    fn to_list_driver_failure_skips_converter() {
        let driver = ScriptedDriver::new();
        driver.fail(DriverError::Closed);
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let err = invoker
            .from_many(|d| d.geohash(b"k", &[&b"a"[..]]))
            .to_list(|_| -> ConversionResult<String> { panic!("converter must not run") })
            .unwrap_err();
        assert_eq!(err, ClientError::data_access("connection closed"));
    }

    #[test]
    fn to_set_error_reply_skips_converter() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Error(b"WRONGTYPE not a geo set".to_vec()));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let err = invoker
            .from_many(|d| d.geohash(b"k", &[&b"a"[..]]))
            .to_set(|_| -> ConversionResult<String> { panic!("converter must not run") })
            .unwrap_err();
        assert_eq!(err, ClientError::data_access("server error: WRONGTYPE not a geo set"));
    }

    #[test]
    fn to_set_conversion_failure_surfaces() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::array(vec![RespValue::bulk("u1"), RespValue::Bulk(None)]));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);

        let err = invoker
            .from_many(|d| d.geohash(b"k", &[&b"a"[..], &b"b"[..]]))
            .to_set(|hash: Option<String>| {
                hash.ok_or_else(|| ConversionError::UnexpectedShape {
                    expected: "geohash",
                    actual: "nil".into(),
                })
            })
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Conversion(ConversionError::UnexpectedShape {
                expected: "geohash",
                actual: "nil".into(),
            })
        );
    }

    #[test]
    fn driver_functions_accept_argument_tuples() {
        let driver = ScriptedDriver::new();
        driver
            .reply(RespValue::Simple(b"PONG".to_vec()))
            .reply(RespValue::bulk("hi"))
            .reply(RespValue::Integer(1))
            .reply(RespValue::array(vec![RespValue::Bulk(None)]))
            .reply(RespValue::bulk("1.5"))
            .reply(RespValue::array(vec![RespValue::bulk("m")]));
        let invoker = Invoker::new(&driver, &BlockingSynchronizer);
        let key = &b"k"[..];
        let members = [&b"a"[..]];

        let pong = invoker.just_with(ping, ()).unwrap().into_value().unwrap();
        assert_eq!(pong, RespValue::Simple(b"PONG".to_vec()));

        let echoed = invoker.just_with(echo, ("hi",)).unwrap().into_value().unwrap();
        assert_eq!(echoed, RespValue::bulk("hi"));

        let removed = invoker
            .from_with(ScriptedDriver::zrem, (key, &members[..]))
            .get(Ok)
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(removed, 1);

        let hashes = invoker
            .from_many_with(ScriptedDriver::geohash, (key, &members[..]))
            .to_list(Ok)
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(hashes, vec![None]);

        let dist = invoker
            .from_with(ScriptedDriver::geodist, (key, key, key, GeoUnit::Kilometers))
            .get(Ok)
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(dist, Some(1.5));

        let found = invoker
            .from_many_with(ScriptedDriver::georadius, (key, 1.0, 2.0, 3.0, GeoUnit::Meters))
            .to_list(Ok)
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(found, vec![b"m".to_vec()]);

        let commands: Vec<String> = driver.dispatched().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            commands,
            vec![
                "PING",
                "ECHO hi",
                "ZREM k a",
                "GEOHASH k a",
                "GEODIST k k k km",
                "GEORADIUS k 1 2 3 m",
            ]
        );
    }

    #[test]
    fn pipelined_invocations_defer_conversion() {
        let driver = ScriptedDriver::new();
        driver.reply(RespValue::Integer(1)).reply(RespValue::Integer(2));
        let sync = PipeliningSynchronizer::new();
        let invoker = Invoker::new(&driver, &sync);
        let calls = Arc::new(AtomicUsize::new(0));

        sync.open_pipeline().unwrap();
        let first = invoker.from(|d| d.zrem(b"k", &[&b"a"[..]])).get({
            let calls = calls.clone();
            move |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            }
        });
        let second = invoker.just(|d| d.zrem(b"k", &[&b"b"[..]]));

        let first = first.unwrap();
        let second = second.unwrap();
        assert!(!first.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(sync.close_pipeline(), Ok(2));
        assert_eq!(first.into_value(), Ok(1));
        assert_eq!(second.into_value(), Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
