//! Value model and operator dispatch for the escript runtime
//!
//! Scripts manipulate [`Value`]s through [`Handle`]s. A handle points at a
//! pooled value block that other handles may share; writes through a handle
//! detach it first, so aliasing is only observable where the language asks
//! for it (container elements, `foreach` bindings).
//!
//! ```
//! use escript_value::{BinaryOp, Runtime, Value};
//!
//! let rt = Runtime::new();
//! let sum = escript_value::binary(&rt, BinaryOp::Add, &Value::from(1), &Value::from(2.5));
//! assert_eq!(sum, Value::from(3.5));
//!
//! let greeting = rt.bind(Value::from("Hello"));
//! greeting.handle().apply_in_place(BinaryOp::Add, &Value::from(" world"));
//! assert_eq!(greeting.handle().value().to_string(), "Hello world");
//! ```

pub mod applic;
pub mod array;
pub mod codec;
pub mod error;
pub mod handle;
pub mod iter;
pub mod kind;
pub mod member;
pub mod method;
pub mod ops;
pub mod pool;
pub mod runtime;
pub mod value;

pub use applic::{ApplicObj, ApplicObjType, ApplicPtr, HostObject};
pub use array::ObjArray;
pub use error::{CallError, DecodeError, DecodeErrorKind, DecodeResult};
pub use handle::{Handle, Reference, ValueGuard};
pub use iter::ContIterator;
pub use kind::Kind;
pub use member::MemberId;
pub use method::{ArgList, Executor, MethodId};
pub use ops::{BinaryOp, Numeric, binary, bitnot, inverse};
pub use pool::{DEFAULT_CHUNK_BLOCKS, Pool, PoolStats, Pooled};
pub use runtime::{InstanceStats, Runtime, RuntimeConfig, ValuePtr};
pub use value::{ErrorValue, Value};
