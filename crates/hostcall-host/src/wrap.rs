//! Host handler wrapping.
//!
//! A wrapped handler always yields an envelope: the operation's result on
//! success, or the classified failure after it has been dispatched to the
//! [`ErrorHub`] exactly once. Panics inside the operation are caught and
//! treated like any other unclassified failure.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hostcall_protocol::{ClassifiedError, Envelope, ErrorCode, ErrorKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::fault::Fault;
use crate::hub::ErrorHub;

/// A wrapped operation, ready to be routed.
pub type Handler = Arc<dyn Fn(Args) -> BoxFuture<'static, Envelope<Value>> + Send + Sync>;

/// Wrap an async operation.
pub fn wrap<F, Fut, R>(hub: Arc<ErrorHub>, op: F) -> Handler
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Fault>> + Send + 'static,
    R: Serialize,
{
    let op = Arc::new(op);
    Arc::new(move |args: Args| {
        let hub = Arc::clone(&hub);
        let op = Arc::clone(&op);
        async move {
            // The call itself sits inside the guarded future so a panic before
            // the first await is caught too.
            let outcome = AssertUnwindSafe(async move { (*op)(args).await })
                .catch_unwind()
                .await;
            let result = outcome.unwrap_or_else(|panic| Err(Fault::from_panic(&*panic)));
            finish(&hub, result)
        }
        .boxed()
    })
}

/// Wrap a synchronous operation.
pub fn wrap_sync<F, R>(hub: Arc<ErrorHub>, op: F) -> Handler
where
    F: Fn(Args) -> Result<R, Fault> + Send + Sync + 'static,
    R: Serialize,
{
    let op = Arc::new(op);
    Arc::new(move |args: Args| {
        let hub = Arc::clone(&hub);
        let op = Arc::clone(&op);
        async move {
            let result = catch_unwind(AssertUnwindSafe(|| (*op)(args)))
                .unwrap_or_else(|panic| Err(Fault::from_panic(&*panic)));
            finish(&hub, result)
        }
        .boxed()
    })
}

fn finish<R: Serialize>(hub: &ErrorHub, result: Result<R, Fault>) -> Envelope<Value> {
    let result = result.and_then(|value| {
        serde_json::to_value(value).map_err(|err| {
            Fault::new(
                ErrorKind::System,
                ErrorCode::InternalError,
                format!("响应序列化失败: {err}"),
            )
        })
    });
    match result {
        Ok(value) => Envelope::ok(value),
        Err(fault) => reject(hub, fault.into_classified()),
    }
}

/// Dispatch `err` to the hub and turn it into an error envelope.
pub fn reject(hub: &ErrorHub, err: ClassifiedError) -> Envelope<Value> {
    hub.dispatch(&err);
    Envelope::from(&err)
}

/// Positional call arguments with validating accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(args: Vec<Value>) -> Self {
        Self(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// A non-empty string path argument.
    pub fn required_path(&self, index: usize) -> Result<String, Fault> {
        match self.get(index) {
            Some(Value::String(path)) if !path.is_empty() => Ok(path.clone()),
            _ => Err(invalid("文件路径参数无效")),
        }
    }

    /// A string argument (possibly empty). `what` names the argument in the
    /// error message.
    pub fn required_str(&self, index: usize, what: &str) -> Result<String, Fault> {
        match self.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(invalid(&format!("{what}参数无效"))),
        }
    }

    /// A typed argument that must be present.
    pub fn required<T: DeserializeOwned>(&self, index: usize) -> Result<T, Fault> {
        match self.get(index) {
            None | Some(Value::Null) => Err(Fault::new(
                ErrorKind::InvalidParams,
                ErrorCode::MissingParams,
                format!("缺少必要参数: 第{}个参数", index + 1),
            )),
            Some(value) => from_arg(value, index),
        }
    }

    /// A typed argument that may be missing or null.
    pub fn optional<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, Fault> {
        match self.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => from_arg(value, index).map(Some),
        }
    }
}

impl From<Vec<Value>> for Args {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

fn invalid(message: &str) -> Fault {
    Fault::new(ErrorKind::InvalidParams, ErrorCode::InvalidParams, message)
}

fn from_arg<T: DeserializeOwned>(value: &Value, index: usize) -> Result<T, Fault> {
    T::deserialize(value).map_err(|err| {
        Fault::new(
            ErrorKind::InvalidParams,
            ErrorCode::ParamsTypeError,
            format!("参数类型错误: 第{}个参数: {err}", index + 1),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn counting_hub() -> (Arc<ErrorHub>, Arc<Mutex<Vec<ClassifiedError>>>) {
        let hub = Arc::new(ErrorHub::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hub.add_listener(move |err| sink.lock().unwrap().push(err.clone()));
        (hub, seen)
    }

    #[tokio::test]
    async fn success_wraps_result() {
        let (hub, seen) = counting_hub();
        let handler = wrap(hub, |args: Args| async move {
            let n: i64 = args.required(0)?;
            Ok::<_, Fault>(n * 2)
        });
        let env = handler(Args::new(vec![json!(21)])).await;
        assert_eq!(env.data(), Some(&json!(42)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn classified_failure_dispatched_once() {
        let (hub, seen) = counting_hub();
        let handler = wrap(hub, |_args| async {
            Err::<(), _>(Fault::new(
                ErrorKind::NotFound,
                ErrorCode::FileNotFound,
                "文件不存在: /nope.txt",
            ))
        });
        let env = handler(Args::default()).await;
        assert_eq!(env.error_message(), Some("文件不存在: /nope.txt"));
        assert_eq!(env.error_code(), Some("E_FILE_NOT_FOUND"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unclassified_failure_becomes_unknown() {
        let (hub, seen) = counting_hub();
        let handler = wrap(hub, |_args| async {
            Err::<(), _>(Fault::from(std::io::Error::new(
                std::io::ErrorKind::Other,
                "device on fire",
            )))
        });
        let env = handler(Args::default()).await;
        assert_eq!(env.error_message(), Some("device on fire"));
        assert_eq!(env.error_code(), Some("E_UNKNOWN_ERROR"));
        assert_eq!(seen.lock().unwrap()[0].kind, ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn panic_never_escapes_async_wrapper() {
        let (hub, seen) = counting_hub();
        let handler = wrap(hub, |_args| async {
            if true {
                panic!("handler bug");
            }
            Ok::<(), Fault>(())
        });
        let env = handler(Args::default()).await;
        assert!(env.is_error());
        assert_eq!(env.error_code(), Some("E_UNKNOWN_ERROR"));
        assert!(env.error_message().unwrap().contains("handler bug"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn panic_never_escapes_sync_wrapper() {
        let (hub, seen) = counting_hub();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = wrap_sync(hub, move |_args| -> Result<(), Fault> {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("sync bug")
        });
        let env = handler(Args::default()).await;
        assert!(env.is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unit_result_has_null_data() {
        let (hub, _) = counting_hub();
        let handler = wrap_sync(hub, |_args| Ok::<_, Fault>(()));
        let env = handler(Args::default()).await;
        assert!(env.is_success());
        assert_eq!(env.data(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn unserializable_result_is_an_internal_error() {
        use std::collections::HashMap;

        let (hub, seen) = counting_hub();
        let handler = wrap_sync(hub, |_args| {
            // JSON object keys must be strings.
            let mut map = HashMap::new();
            map.insert((1u8, 2u8), "pair");
            Ok::<_, Fault>(map)
        });
        let env = handler(Args::default()).await;
        assert_eq!(env.error_code(), Some("E_INTERNAL_ERROR"));
        assert!(env.error_message().unwrap().starts_with("响应序列化失败: "));
        assert_eq!(seen.lock().unwrap()[0].kind, ErrorKind::System);
    }

    #[test]
    fn required_path_rejects_empty_and_non_strings() {
        let args = Args::new(vec![json!(""), json!(5), json!("/tmp/a")]);
        for index in [0, 1, 3] {
            let err = args.required_path(index).unwrap_err().into_classified();
            assert_eq!(err.kind, ErrorKind::InvalidParams);
            assert_eq!(err.code, ErrorCode::InvalidParams);
            assert_eq!(err.message, "文件路径参数无效");
        }
        assert_eq!(args.required_path(2).unwrap(), "/tmp/a");
    }

    #[test]
    fn required_str_allows_empty() {
        let args = Args::new(vec![json!(""), json!(1)]);
        assert_eq!(args.required_str(0, "文件内容").unwrap(), "");
        let err = args.required_str(1, "文件内容").unwrap_err().into_classified();
        assert_eq!(err.message, "文件内容参数无效");
    }

    #[test]
    fn typed_accessors() {
        let args = Args::new(vec![json!({"x": 1}), Value::Null, json!("nope")]);
        let map: serde_json::Map<String, Value> = args.required(0).unwrap();
        assert_eq!(map["x"], 1);

        let missing = args.required::<u32>(1).unwrap_err().into_classified();
        assert_eq!(missing.code, ErrorCode::MissingParams);

        let wrong = args.required::<u32>(2).unwrap_err().into_classified();
        assert_eq!(wrong.code, ErrorCode::ParamsTypeError);

        assert_eq!(args.optional::<u32>(1).unwrap(), None);
        assert_eq!(args.optional::<u32>(9).unwrap(), None);
        assert!(args.optional::<u32>(2).is_err());
    }
}
